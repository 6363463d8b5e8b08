use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::crawl::Crawler;
use crate::peer::RawStore;

use super::super::graph::diff::KeyedBinder;
use super::super::{GraphSource, LayoutParams, LayoutSimulation, RestartPolicy, ViewModel};

const DEFAULT_CRAWL_CAP: usize = 120;
const NODE_ENTER_SECS: f64 = 1.5;
const NODE_EXIT_SECS: f64 = 0.75;

impl ViewModel {
    fn from_source(
        source: GraphSource,
        params: LayoutParams,
        restart_policy: RestartPolicy,
        max_nodes: Option<usize>,
    ) -> Self {
        Self {
            source,
            selected: None,
            max_nodes,
            search: String::new(),
            root_input: String::new(),
            pan: Vec2::ZERO,
            zoom: 1.0,
            live_physics: true,
            graph_dirty: true,
            render_graph_revision: 0,
            simulation: LayoutSimulation::new(params),
            restart_policy,
            node_binder: KeyedBinder::new(NODE_ENTER_SECS, NODE_EXIT_SECS),
            edge_binder: KeyedBinder::new(0.0, 0.0),
            visible_edges: Vec::new(),
            truncated_nodes: 0,
            clock: 0.0,
            dragging: None,
        }
    }

    pub(in crate::app) fn with_dataset(store: RawStore, max_nodes: Option<usize>) -> Self {
        Self::from_source(
            GraphSource::Static(store),
            LayoutParams::for_static(),
            RestartPolicy::Continuous { floor: 1.0 },
            max_nodes,
        )
    }

    pub(in crate::app) fn crawling(crawler: Crawler, max_nodes: Option<usize>) -> Self {
        Self::from_source(
            GraphSource::Crawl(crawler),
            LayoutParams::for_crawl(),
            RestartPolicy::Decaying,
            Some(max_nodes.unwrap_or(DEFAULT_CRAWL_CAP)),
        )
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.clock = ctx.input(|input| input.time);

        if let GraphSource::Crawl(crawler) = &mut self.source {
            if crawler.drain() {
                self.graph_dirty = true;
            }
            crawler.pump();
            if !crawler.is_idle() {
                ctx.request_repaint();
            }
        }

        if self.graph_dirty {
            self.rebuild_render_graph();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("peergraph");
                    ui.separator();
                    match &self.source {
                        GraphSource::Static(store) => {
                            ui.label("dataset");
                            ui.label(format!("peers: {}", store.len()));
                            ui.label(format!("links: {}", store.edge_count()));
                        }
                        GraphSource::Crawl(crawler) => {
                            ui.label("crawl");
                            ui.label(format!("loaded: {}", crawler.loaded()));
                            ui.label(format!("in flight: {}", crawler.in_flight()));
                            ui.label(format!("queued: {}", crawler.queued()));
                        }
                    }
                    if ui.button("Reset view").clicked() {
                        self.reset_view();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_graph_text());
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }

    fn visible_graph_text(&self) -> String {
        let mut text = format!(
            "shown: {} nodes, {} edges",
            self.node_binder.len(),
            self.visible_edges.len()
        );
        if self.truncated_nodes > 0 {
            text.push_str(&format!(" ({} over cap)", self.truncated_nodes));
        }
        text
    }

    pub(in crate::app) fn reset_view(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Abandons the current crawl and starts over at the address in the root form.
    pub(in crate::app) fn submit_root(&mut self) {
        let root = self.root_input.trim().to_owned();
        if root.is_empty() {
            return;
        }

        let GraphSource::Crawl(crawler) = &mut self.source else {
            return;
        };
        tracing::info!(%root, "starting crawl");
        crawler.start(&root);
        self.selected = None;
        self.graph_dirty = true;
    }

    pub(in crate::app) fn clear_crawl(&mut self) {
        let GraphSource::Crawl(crawler) = &mut self.source else {
            return;
        };
        crawler.reset();
        self.selected = None;
        self.graph_dirty = true;
    }
}
