use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Vec2};

use crate::crawl::Crawler;
use crate::peer::{PortalFetcher, RawStore, load_dataset};

mod graph;
mod highlight;
mod physics;
mod render_utils;
mod ui;

use graph::diff::{KeyedBinder, Visual};
use highlight::EdgeEmphasis;
use physics::{EdgeCurve, LayoutParams, LayoutSimulation, RestartPolicy};

/// Where the viewer gets its peers from.
pub enum Launch {
    Dataset {
        path: PathBuf,
        max_nodes: Option<usize>,
    },
    Crawl {
        fetcher: Arc<dyn PortalFetcher>,
        root: Option<String>,
        max_nodes: Option<usize>,
    },
}

pub struct PeerGraphApp {
    launch: Launch,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<RawStore, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

enum GraphSource {
    Static(RawStore),
    Crawl(Crawler),
}

impl GraphSource {
    fn store(&self) -> &RawStore {
        match self {
            Self::Static(store) => store,
            Self::Crawl(crawler) => crawler.store(),
        }
    }
}

/// The single owner of every piece of mutable viewer state: data source,
/// selection, layout and the bound visuals.
struct ViewModel {
    source: GraphSource,
    selected: Option<String>,
    max_nodes: Option<usize>,
    search: String,
    root_input: String,
    pan: Vec2,
    zoom: f32,
    live_physics: bool,
    graph_dirty: bool,
    render_graph_revision: u64,
    simulation: LayoutSimulation,
    restart_policy: RestartPolicy,
    node_binder: KeyedBinder<NodeVisual>,
    edge_binder: KeyedBinder<EdgeVisual>,
    visible_edges: Vec<(String, Edge)>,
    truncated_nodes: usize,
    clock: f64,
    dragging: Option<String>,
}

#[derive(Clone, Debug)]
struct GraphNode {
    id: String,
    display_name: String,
    neighbor_ids: Vec<String>,
    position: Vec2,
    velocity: Vec2,
    pin: Option<Vec2>,
}

impl GraphNode {
    fn links_to(&self, id: &str) -> bool {
        self.neighbor_ids.iter().any(|neighbor| neighbor == id)
    }
}

/// Anonymous particle bending one directed edge. Lives for a single rebuild.
#[derive(Clone, Copy, Debug, Default)]
struct MidpointNode {
    position: Vec2,
    velocity: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParticleRef {
    Node(usize),
    Midpoint(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SimLink {
    from: ParticleRef,
    to: ParticleRef,
}

/// Rendered edge: indices into one rebuild's node and midpoint vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Edge {
    source: usize,
    midpoint: usize,
    target: usize,
}

struct GraphModel {
    nodes: Vec<GraphNode>,
    midpoints: Vec<MidpointNode>,
    links: Vec<SimLink>,
    edges: Vec<Edge>,
    truncated: usize,
}

fn edge_key(source: &str, target: &str) -> String {
    format!("{source}→{target}")
}

struct NodeVisual {
    label: String,
    selected: bool,
    position: Vec2,
}

impl Visual for NodeVisual {
    fn refresh(&mut self, next: Self) {
        self.label = next.label;
        self.selected = next.selected;
    }
}

struct EdgeVisual {
    emphasis: EdgeEmphasis,
    curve: EdgeCurve,
}

impl Visual for EdgeVisual {
    fn refresh(&mut self, next: Self) {
        self.emphasis = next.emphasis;
    }
}

impl PeerGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, launch: Launch) -> Self {
        let state = Self::start(&launch);
        Self { launch, state }
    }

    fn start(launch: &Launch) -> AppState {
        match launch {
            Launch::Dataset { path, .. } => AppState::Loading {
                rx: Self::spawn_load(path.clone()),
            },
            Launch::Crawl {
                fetcher,
                root,
                max_nodes,
            } => {
                let mut model = ViewModel::crawling(Crawler::new(Arc::clone(fetcher)), *max_nodes);
                if let Some(root) = root {
                    model.root_input = root.clone();
                    model.submit_root();
                }
                AppState::Ready(Box::new(model))
            }
        }
    }

    fn spawn_load(path: PathBuf) -> Receiver<Result<RawStore, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_dataset(&path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn dataset_cap(&self) -> Option<usize> {
        match &self.launch {
            Launch::Dataset { max_nodes, .. } => *max_nodes,
            Launch::Crawl { max_nodes, .. } => *max_nodes,
        }
    }
}

impl eframe::App for PeerGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let max_nodes = self.dataset_cap();

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(store)) => {
                        let model = ViewModel::with_dataset(store, max_nodes);
                        transition = Some(AppState::Ready(Box::new(model)));
                    }
                    Ok(Err(error)) => {
                        tracing::error!(%error, "dataset load failed");
                        transition = Some(AppState::Error(error));
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading peer graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load peer graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start(&self.launch));
                    }
                });
            }
            AppState::Ready(model) => model.show(ctx),
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}
