mod forces;
mod quadtree;

use std::collections::{HashMap, HashSet};

use eframe::egui::Vec2;

use super::{Edge, GraphNode, MidpointNode, ParticleRef, SimLink};
use forces::{ChargeParams, Spring, apply_centering, apply_charge, apply_springs};

const ALPHA_MIN: f32 = 0.001;
const DRAG_ALPHA_TARGET: f32 = 0.3;
const BARNES_HUT_THETA: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LayoutParams {
    pub(in crate::app) link_distance: f32,
    pub(in crate::app) link_strength: f32,
    pub(in crate::app) charge_strength: f32,
    pub(in crate::app) charge_distance_min: f32,
    pub(in crate::app) velocity_decay: f32,
    pub(in crate::app) center: Vec2,
}

impl LayoutParams {
    pub(in crate::app) fn for_static() -> Self {
        Self {
            link_distance: 5.0,
            link_strength: 0.9,
            charge_strength: -30.0,
            charge_distance_min: 1.0,
            velocity_decay: 0.4,
            center: Vec2::ZERO,
        }
    }

    pub(in crate::app) fn for_crawl() -> Self {
        Self {
            link_distance: 2.0,
            link_strength: 0.98,
            charge_strength: -25.0,
            ..Self::for_static()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum RestartPolicy {
    /// Energy is held at `floor` indefinitely.
    Continuous { floor: f32 },
    /// A full boost that decays back to rest.
    Decaying,
}

impl RestartPolicy {
    fn resting_target(self) -> f32 {
        match self {
            Self::Continuous { floor } => floor.clamp(0.0, 1.0),
            Self::Decaying => 0.0,
        }
    }
}

/// Quadratic curve through an edge's source, midpoint particle and target.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(in crate::app) struct EdgeCurve {
    pub(in crate::app) start: Vec2,
    pub(in crate::app) control: Vec2,
    pub(in crate::app) end: Vec2,
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
}

/// Force-directed layout over the current topology: real nodes followed by the
/// rebuild's midpoint particles. Topology only changes through
/// [`LayoutSimulation::replace_topology`].
pub(in crate::app) struct LayoutSimulation {
    params: LayoutParams,
    nodes: Vec<GraphNode>,
    midpoints: Vec<MidpointNode>,
    springs: Vec<Spring>,
    index_by_id: HashMap<String, usize>,
    alpha: f32,
    alpha_target: f32,
    alpha_decay: f32,
    resting_target: f32,
    running: bool,
    active_pins: HashSet<String>,
    scratch: PhysicsScratch,
}

impl LayoutSimulation {
    pub(in crate::app) fn new(params: LayoutParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            midpoints: Vec::new(),
            springs: Vec::new(),
            index_by_id: HashMap::new(),
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
            resting_target: 0.0,
            running: false,
            active_pins: HashSet::new(),
            scratch: PhysicsScratch::default(),
        }
    }

    pub(in crate::app) fn params(&self) -> LayoutParams {
        self.params
    }

    pub(in crate::app) fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub(in crate::app) fn midpoint_count(&self) -> usize {
        self.midpoints.len()
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub(in crate::app) fn is_running(&self) -> bool {
        self.running
    }

    /// Swaps in a complete particle/link set. Midpoints from the previous topology
    /// are dropped wholesale.
    pub(in crate::app) fn replace_topology(
        &mut self,
        nodes: Vec<GraphNode>,
        midpoints: Vec<MidpointNode>,
        links: Vec<SimLink>,
    ) {
        let node_count = nodes.len();
        let particle = |reference: ParticleRef| match reference {
            ParticleRef::Node(index) => index,
            ParticleRef::Midpoint(index) => node_count + index,
        };

        let particle_count = node_count + midpoints.len();
        let mut degree = vec![0usize; particle_count];
        let resolved = links
            .iter()
            .map(|link| (particle(link.from), particle(link.to)))
            .filter(|&(source, target)| source < particle_count && target < particle_count)
            .collect::<Vec<_>>();
        for &(source, target) in &resolved {
            degree[source] += 1;
            degree[target] += 1;
        }

        self.springs = resolved
            .into_iter()
            .map(|(source, target)| Spring {
                source,
                target,
                bias: degree[source] as f32 / (degree[source] + degree[target]) as f32,
            })
            .collect();

        self.index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        self.nodes = nodes;
        self.midpoints = midpoints;

        let before = self.active_pins.len();
        self.active_pins
            .retain(|id| self.index_by_id.contains_key(id.as_str()));
        if before > 0 && self.active_pins.is_empty() {
            self.alpha_target = self.resting_target;
        }

        tracing::trace!(
            nodes = self.nodes.len(),
            midpoints = self.midpoints.len(),
            springs = self.springs.len(),
            "replaced layout topology"
        );
    }

    pub(in crate::app) fn restart(&mut self, policy: RestartPolicy) {
        self.resting_target = policy.resting_target();
        self.alpha = 1.0;
        self.alpha_target = if self.active_pins.is_empty() {
            self.resting_target
        } else {
            self.drag_target()
        };
        self.running = true;
    }

    /// Advances one step. Returns whether the layout is still moving.
    pub(in crate::app) fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.step_particles();

        if self.alpha < ALPHA_MIN {
            self.running = false;
        }
        self.running
    }

    fn step_particles(&mut self) {
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.velocities.push(node.velocity);
        }
        for midpoint in &self.midpoints {
            scratch.positions.push(midpoint.position);
            scratch.velocities.push(midpoint.velocity);
        }

        let params = self.params;
        apply_springs(
            &self.springs,
            params.link_distance,
            params.link_strength,
            self.alpha,
            &scratch.positions,
            &mut scratch.velocities,
        );
        apply_charge(
            &scratch.positions,
            &mut scratch.velocities,
            ChargeParams {
                strength: params.charge_strength,
                theta_sq: BARNES_HUT_THETA * BARNES_HUT_THETA,
                distance_min_sq: params.charge_distance_min * params.charge_distance_min,
                alpha: self.alpha,
            },
        );
        apply_centering(&mut scratch.positions, params.center);

        let retain = 1.0 - params.velocity_decay;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if let Some(pin) = node.pin {
                node.position = pin;
                node.velocity = Vec2::ZERO;
            } else {
                node.velocity = scratch.velocities[index] * retain;
                node.position = scratch.positions[index] + node.velocity;
            }
        }

        let offset = self.nodes.len();
        for (index, midpoint) in self.midpoints.iter_mut().enumerate() {
            midpoint.velocity = scratch.velocities[offset + index] * retain;
            midpoint.position = scratch.positions[offset + index] + midpoint.velocity;
        }
    }

    pub(in crate::app) fn edge_curve(&self, edge: &Edge) -> Option<EdgeCurve> {
        Some(EdgeCurve {
            start: self.nodes.get(edge.source)?.position,
            control: self.midpoints.get(edge.midpoint)?.position,
            end: self.nodes.get(edge.target)?.position,
        })
    }

    /// A held pin never cools the layout below its resting energy.
    fn drag_target(&self) -> f32 {
        self.resting_target.max(DRAG_ALPHA_TARGET)
    }

    /// Freezes the node where it is and keeps the layout warm while any pin is held.
    pub(in crate::app) fn pin_start(&mut self, id: &str) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };

        if self.active_pins.is_empty() {
            self.alpha_target = self.drag_target();
            self.running = true;
        }
        self.active_pins.insert(id.to_string());

        let node = &mut self.nodes[index];
        node.pin = Some(node.position);
        true
    }

    pub(in crate::app) fn pin_move(&mut self, id: &str, position: Vec2) {
        if !self.active_pins.contains(id) {
            return;
        }
        if let Some(&index) = self.index_by_id.get(id) {
            self.nodes[index].pin = Some(position);
        }
    }

    pub(in crate::app) fn pin_end(&mut self, id: &str) {
        if let Some(&index) = self.index_by_id.get(id) {
            self.nodes[index].pin = None;
        }

        if self.active_pins.remove(id) && self.active_pins.is_empty() {
            self.alpha_target = self.resting_target;
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn node(id: &str, position: Vec2) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            display_name: id.to_string(),
            neighbor_ids: Vec::new(),
            position,
            velocity: Vec2::ZERO,
            pin: None,
        }
    }

    fn pair() -> LayoutSimulation {
        let mut simulation = LayoutSimulation::new(LayoutParams::for_static());
        simulation.replace_topology(
            vec![node("a", vec2(-40.0, 0.0)), node("b", vec2(40.0, 0.0))],
            vec![MidpointNode {
                position: vec2(0.0, 10.0),
                velocity: Vec2::ZERO,
            }],
            vec![
                SimLink {
                    from: ParticleRef::Node(0),
                    to: ParticleRef::Midpoint(0),
                },
                SimLink {
                    from: ParticleRef::Midpoint(0),
                    to: ParticleRef::Node(1),
                },
            ],
        );
        simulation
    }

    #[test]
    fn test_decaying_restart_eventually_sleeps() {
        let mut simulation = pair();
        simulation.restart(RestartPolicy::Decaying);
        let mut steps = 0;
        while simulation.tick() {
            steps += 1;
            assert!(steps < 1_000, "decaying layout never settled");
        }
        assert!(simulation.alpha() < ALPHA_MIN);
        assert!(!simulation.is_running());
    }

    #[test]
    fn test_continuous_restart_holds_energy_floor() {
        let mut simulation = pair();
        simulation.restart(RestartPolicy::Continuous { floor: 0.3 });
        for _ in 0..1_000 {
            assert!(simulation.tick());
        }
        assert!((simulation.alpha() - 0.3).abs() < 0.01);
    }

    #[test]
    fn test_stretched_edge_contracts() {
        let mut simulation = pair();
        simulation.restart(RestartPolicy::Decaying);
        for _ in 0..50 {
            simulation.tick();
        }
        let nodes = simulation.nodes();
        assert!((nodes[1].position - nodes[0].position).length() < 80.0);
    }

    #[test]
    fn test_pinned_node_tracks_pointer_and_heats_layout() {
        let mut simulation = pair();
        simulation.restart(RestartPolicy::Decaying);
        while simulation.tick() {}

        assert!(simulation.pin_start("a"));
        assert_eq!(simulation.alpha_target(), DRAG_ALPHA_TARGET);
        simulation.pin_move("a", vec2(100.0, 100.0));
        assert!(simulation.tick());
        assert_eq!(simulation.nodes()[0].position, vec2(100.0, 100.0));
        assert_eq!(simulation.nodes()[0].velocity, Vec2::ZERO);

        simulation.pin_end("a");
        assert_eq!(simulation.alpha_target(), 0.0);
        assert_eq!(simulation.nodes()[0].pin, None);
    }

    #[test]
    fn test_releasing_one_of_two_pins_keeps_layout_warm() {
        let mut simulation = pair();
        simulation.restart(RestartPolicy::Continuous { floor: 0.05 });
        simulation.pin_start("a");
        simulation.pin_start("b");
        simulation.pin_end("a");
        assert_eq!(simulation.alpha_target(), DRAG_ALPHA_TARGET);
        simulation.pin_end("b");
        assert_eq!(simulation.alpha_target(), 0.05);
    }

    #[test]
    fn test_pin_keeps_warm_static_layout_at_full_energy() {
        let mut simulation = pair();
        simulation.restart(RestartPolicy::Continuous { floor: 1.0 });
        assert!(simulation.pin_start("a"));
        assert_eq!(simulation.alpha_target(), 1.0);
        simulation.restart(RestartPolicy::Continuous { floor: 1.0 });
        assert_eq!(simulation.alpha_target(), 1.0);
        for _ in 0..50 {
            simulation.tick();
        }
        assert!(simulation.alpha() > 0.99);
        simulation.pin_end("a");
        assert_eq!(simulation.alpha_target(), 1.0);
    }

    #[test]
    fn test_pin_on_unknown_node_is_ignored() {
        let mut simulation = pair();
        assert!(!simulation.pin_start("missing"));
        simulation.pin_move("missing", vec2(1.0, 1.0));
        simulation.pin_end("missing");
        assert_eq!(simulation.alpha_target(), 0.0);
    }

    #[test]
    fn test_replace_topology_drops_pins_of_removed_nodes() {
        let mut simulation = pair();
        simulation.restart(RestartPolicy::Decaying);
        simulation.pin_start("a");
        simulation.replace_topology(vec![node("b", Vec2::ZERO)], Vec::new(), Vec::new());
        assert_eq!(simulation.alpha_target(), 0.0);
        assert_eq!(simulation.midpoint_count(), 0);
        assert!(!simulation.pin_start("a"));
    }

    #[test]
    fn test_edge_curve_runs_through_midpoint() {
        let simulation = pair();
        let curve = simulation
            .edge_curve(&Edge {
                source: 0,
                midpoint: 0,
                target: 1,
            })
            .expect("edge resolves");
        assert_eq!(curve.start, vec2(-40.0, 0.0));
        assert_eq!(curve.control, vec2(0.0, 10.0));
        assert_eq!(curve.end, vec2(40.0, 0.0));
    }
}
