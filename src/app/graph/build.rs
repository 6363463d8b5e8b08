use std::collections::{HashMap, HashSet};
use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};

use crate::peer::RawStore;

use super::super::highlight::SelectionFilter;
use super::super::physics::EdgeCurve;
use super::super::{
    Edge, EdgeVisual, GraphModel, GraphNode, MidpointNode, NodeVisual, ParticleRef, SimLink,
    ViewModel, edge_key,
};

const INITIAL_RADIUS: f32 = 10.0;

/// Deterministic spiral placement for a node that has no earlier position.
fn phyllotaxis(index: usize, center: Vec2) -> Vec2 {
    let initial_angle = PI * (3.0 - 5.0_f32.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * initial_angle;
    center + vec2(radius * angle.cos(), radius * angle.sin())
}

/// Builds the node/midpoint/link model for one rebuild.
///
/// Records are filtered by the selection, then capped in store order. Edges are
/// resolved against the filtered set only, so a reference to a peer that did not make
/// it in is dropped without a trace. Nodes that were already laid out keep their
/// position, velocity and pin.
pub(in crate::app) fn build_graph_model(
    store: &RawStore,
    selected: Option<&str>,
    previous: &[GraphNode],
    cap: Option<usize>,
    center: Vec2,
) -> GraphModel {
    let filter = SelectionFilter::new(store, selected);
    let included = store
        .iter()
        .filter(|record| filter.includes_record(record))
        .collect::<Vec<_>>();

    let limit = cap.unwrap_or(usize::MAX);
    let truncated = included.len().saturating_sub(limit);
    let previous_by_id = previous
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect::<HashMap<_, _>>();

    let nodes = included
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, record)| {
            let mut node = GraphNode {
                id: record.id.clone(),
                display_name: record.display_name.clone(),
                neighbor_ids: record.neighbor_ids.clone(),
                position: phyllotaxis(index, center),
                velocity: Vec2::ZERO,
                pin: None,
            };
            if let Some(prior) = previous_by_id.get(record.id.as_str()) {
                node.position = prior.position;
                node.velocity = prior.velocity;
                node.pin = prior.pin;
            }
            node
        })
        .collect::<Vec<_>>();

    let index_by_id = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect::<HashMap<_, _>>();

    let mut midpoints = Vec::new();
    let mut links = Vec::new();
    let mut edges = Vec::new();
    for (source, node) in nodes.iter().enumerate() {
        for neighbor in &node.neighbor_ids {
            let Some(&target) = index_by_id.get(neighbor.as_str()) else {
                continue;
            };

            let midpoint = midpoints.len();
            midpoints.push(MidpointNode {
                position: (node.position + nodes[target].position) * 0.5,
                velocity: Vec2::ZERO,
            });
            links.push(SimLink {
                from: ParticleRef::Node(source),
                to: ParticleRef::Midpoint(midpoint),
            });
            links.push(SimLink {
                from: ParticleRef::Midpoint(midpoint),
                to: ParticleRef::Node(target),
            });
            edges.push(Edge {
                source,
                midpoint,
                target,
            });
        }
    }

    GraphModel {
        nodes,
        midpoints,
        links,
        edges,
        truncated,
    }
}

impl ViewModel {
    pub(in crate::app) fn rebuild_render_graph(&mut self) {
        self.render_graph_revision = self.render_graph_revision.wrapping_add(1);

        let store = self.source.store();
        let selected = self.selected.as_deref();
        let model = build_graph_model(
            store,
            selected,
            self.simulation.nodes(),
            self.max_nodes,
            self.simulation.params().center,
        );
        let filter = SelectionFilter::new(store, selected);

        let node_items = model
            .nodes
            .iter()
            .map(|node| {
                (
                    node.id.clone(),
                    NodeVisual {
                        label: node.display_name.clone(),
                        selected: filter.is_selected(&node.id),
                        position: node.position,
                    },
                )
            })
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        let mut visible_edges = Vec::new();
        let mut edge_items = Vec::new();
        for edge in &model.edges {
            let source = &model.nodes[edge.source];
            let target = &model.nodes[edge.target];
            if !filter.shows_edge(source, target) {
                continue;
            }

            let key = edge_key(&source.id, &target.id);
            if !seen.insert(key.clone()) {
                continue;
            }
            edge_items.push((
                key.clone(),
                EdgeVisual {
                    emphasis: filter.edge_emphasis(source, target),
                    curve: EdgeCurve {
                        start: source.position,
                        control: model.midpoints[edge.midpoint].position,
                        end: target.position,
                    },
                },
            ));
            visible_edges.push((key, *edge));
        }

        let now = self.clock;
        let node_ops = self.node_binder.join(node_items, now);
        let edge_ops = self.edge_binder.join(edge_items, now);
        tracing::trace!(
            revision = self.render_graph_revision,
            nodes = model.nodes.len(),
            edges = visible_edges.len(),
            truncated = model.truncated,
            entered = node_ops.enter.len(),
            updated = node_ops.update.len(),
            exited = node_ops.exit.len(),
            edges_entered = edge_ops.enter.len(),
            edges_exited = edge_ops.exit.len(),
            "rebuilt render graph"
        );

        self.truncated_nodes = model.truncated;
        self.visible_edges = visible_edges;
        self.simulation
            .replace_topology(model.nodes, model.midpoints, model.links);
        self.simulation.restart(self.restart_policy);
        self.graph_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use crate::peer::NodeRecord;

    use super::*;

    fn record(id: &str, neighbors: &[&str]) -> NodeRecord {
        NodeRecord::new(id, id, neighbors.iter().map(|n| n.to_string()).collect())
    }

    fn abc() -> RawStore {
        [
            record("A", &["B"]),
            record("B", &["A", "C"]),
            record("C", &[]),
        ]
        .into_iter()
        .collect()
    }

    fn ids(model: &GraphModel) -> Vec<&str> {
        model.nodes.iter().map(|node| node.id.as_str()).collect()
    }

    fn edge_ids(model: &GraphModel) -> Vec<(&str, &str)> {
        model
            .edges
            .iter()
            .map(|edge| {
                (
                    model.nodes[edge.source].id.as_str(),
                    model.nodes[edge.target].id.as_str(),
                )
            })
            .collect()
    }

    fn build(store: &RawStore, selected: Option<&str>) -> GraphModel {
        build_graph_model(store, selected, &[], None, Vec2::ZERO)
    }

    fn laid_out(model: &ViewModel, id: &str) -> GraphNode {
        model
            .simulation
            .nodes()
            .iter()
            .find(|node| node.id == id)
            .cloned()
            .expect("node is laid out")
    }

    #[test]
    fn test_unselected_graph_has_every_node_and_a_midpoint_per_edge() {
        let model = build(&abc(), None);
        assert_eq!(ids(&model), vec!["A", "B", "C"]);
        assert_eq!(edge_ids(&model), vec![("A", "B"), ("B", "A"), ("B", "C")]);
        assert_eq!(model.midpoints.len(), 3);
        assert_eq!(model.links.len(), 6);
        assert_eq!(model.truncated, 0);
    }

    #[test]
    fn test_selecting_hub_keeps_everything() {
        let store = abc();
        let model = build(&store, Some("B"));
        assert_eq!(ids(&model), vec!["A", "B", "C"]);

        let filter = SelectionFilter::new(&store, Some("B"));
        let shown = model
            .edges
            .iter()
            .filter(|edge| {
                let source = &model.nodes[edge.source];
                filter.shows_edge(source, &model.nodes[edge.target])
            })
            .count();
        assert_eq!(shown, 3);
    }

    #[test]
    fn test_selecting_leaf_drops_unrelated_peer_and_its_edges() {
        let model = build(&abc(), Some("A"));
        assert_eq!(ids(&model), vec!["A", "B"]);
        assert_eq!(edge_ids(&model), vec![("A", "B"), ("B", "A")]);
        assert_eq!(model.midpoints.len(), 2);
    }

    #[test]
    fn test_edges_only_join_nodes_in_the_filtered_set() {
        let store: RawStore = [
            record("A", &["B", "ghost"]),
            record("B", &["C"]),
            record("C", &["A"]),
            record("D", &["A"]),
        ]
        .into_iter()
        .collect();

        for selected in [None, Some("A"), Some("C"), Some("ghost")] {
            let filter = SelectionFilter::new(&store, selected);
            let included = store
                .iter()
                .filter(|record| filter.includes_record(record))
                .map(|record| record.id.as_str())
                .collect::<HashSet<_>>();

            let model = build(&store, selected);
            assert_eq!(model.midpoints.len(), model.edges.len());
            for (source, target) in edge_ids(&model) {
                assert!(included.contains(source), "{source} is filtered out");
                assert!(included.contains(target), "{target} is filtered out");
                assert_ne!(target, "ghost");
            }
        }

        let everyone = build(&store, None);
        assert_eq!(
            edge_ids(&everyone),
            vec![("A", "B"), ("B", "C"), ("C", "A"), ("D", "A")]
        );
    }

    #[test]
    fn test_cap_keeps_the_first_records_in_store_order() {
        let store: RawStore = [
            record("c", &["a"]),
            record("a", &["b"]),
            record("b", &["c"]),
        ]
        .into_iter()
        .collect();
        let model = build_graph_model(&store, None, &[], Some(2), Vec2::ZERO);

        assert_eq!(ids(&model), vec!["c", "a"]);
        assert_eq!(edge_ids(&model), vec![("c", "a")]);
        assert_eq!(model.truncated, 1);
    }

    #[test]
    fn test_surviving_nodes_keep_their_motion() {
        let store = abc();
        let mut first = build(&store, None);
        first.nodes[1].position = vec2(42.0, -7.0);
        first.nodes[1].velocity = vec2(1.0, 2.0);
        first.nodes[1].pin = Some(vec2(42.0, -7.0));

        let second = build_graph_model(&store, Some("A"), &first.nodes, None, Vec2::ZERO);
        let b = &second.nodes[1];
        assert_eq!(b.id, "B");
        assert_eq!(b.position, vec2(42.0, -7.0));
        assert_eq!(b.velocity, vec2(1.0, 2.0));
        assert_eq!(b.pin, Some(vec2(42.0, -7.0)));
    }

    #[test]
    fn test_midpoints_start_between_their_endpoints() {
        let store = abc();
        let mut first = build(&store, None);
        first.nodes[0].position = vec2(0.0, 0.0);
        first.nodes[1].position = vec2(10.0, 20.0);

        let second = build_graph_model(&store, None, &first.nodes, None, Vec2::ZERO);
        assert_eq!(second.midpoints[0].position, vec2(5.0, 10.0));
        assert_eq!(second.midpoints[0].velocity, Vec2::ZERO);
    }

    #[test]
    fn test_self_loop_routes_through_its_own_midpoint() {
        let store: RawStore = [record("A", &["A"])].into_iter().collect();
        let model = build(&store, None);
        assert_eq!(edge_ids(&model), vec![("A", "A")]);
        assert_eq!(model.midpoints.len(), 1);
    }

    #[test]
    fn test_new_nodes_are_spread_around_the_center() {
        let model = build_graph_model(&abc(), None, &[], None, vec2(100.0, 100.0));
        let positions = model
            .nodes
            .iter()
            .map(|node| node.position)
            .collect::<Vec<_>>();
        assert_ne!(positions[0], positions[1]);
        assert_ne!(positions[1], positions[2]);
        for position in positions {
            assert!((position - vec2(100.0, 100.0)).length() < 30.0);
        }
    }

    #[test]
    fn test_selection_change_exits_dropped_peer_and_keeps_survivor_motion() {
        let mut model = ViewModel::with_dataset(abc(), None);
        model.rebuild_render_graph();
        assert_eq!(model.node_binder.len(), 3);
        for _ in 0..20 {
            model.simulation.tick();
        }
        let before = laid_out(&model, "B");

        model.clock = 1.0;
        model.set_selected(Some("A".to_string()));
        assert!(model.graph_dirty);
        model.rebuild_render_graph();

        let exiting = model
            .node_binder
            .exiting(1.0)
            .map(|(exiting, _)| exiting.key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(exiting, vec!["C"]);
        assert_eq!(model.node_binder.len(), 2);
        let edges = model
            .visible_edges
            .iter()
            .map(|(key, _)| key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(edges, vec!["A→B", "B→A"]);

        let after = laid_out(&model, "B");
        assert_eq!(after.position, before.position);
        assert_eq!(after.velocity, before.velocity);

        model.clock = 1.2;
        model.rebuild_render_graph();
        assert_eq!(model.node_binder.exiting(1.2).count(), 1);
        assert!(model.node_binder.retire(2.0).contains(&"C".to_string()));
    }

    #[test]
    fn test_held_pin_survives_rebuild() {
        let mut model = ViewModel::with_dataset(abc(), None);
        model.rebuild_render_graph();
        assert!(model.simulation.pin_start("B"));
        model.simulation.pin_move("B", vec2(50.0, 50.0));

        model.set_selected(Some("A".to_string()));
        model.rebuild_render_graph();
        assert_eq!(laid_out(&model, "B").pin, Some(vec2(50.0, 50.0)));

        model.simulation.tick();
        let b = laid_out(&model, "B");
        assert_eq!(b.position, vec2(50.0, 50.0));
        assert_eq!(b.velocity, Vec2::ZERO);
    }
}
