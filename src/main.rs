mod app;
mod crawl;
mod peer;
mod util;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::{Launch, PeerGraphApp};
use peer::{DEFAULT_PORTAL_PATH, SchemeFetcher};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Static dataset document; without it the viewer starts in crawl mode.
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Crawl root submitted at start-up.
    #[arg(long, conflicts_with = "dataset")]
    root: Option<String>,
    /// Maximum number of rendered peers (crawl default 120, dataset default uncapped).
    #[arg(long)]
    max_nodes: Option<usize>,
    /// Portal document path relative to a peer address.
    #[arg(long, default_value = DEFAULT_PORTAL_PATH)]
    portal_path: String,
    #[arg(long, default_value_t = 4)]
    fetch_timeout_secs: u64,
}

impl Args {
    fn launch(self) -> anyhow::Result<Launch> {
        if let Some(path) = self.dataset {
            return Ok(Launch::Dataset {
                path,
                max_nodes: self.max_nodes,
            });
        }

        let fetcher = SchemeFetcher::new(
            &self.portal_path,
            Duration::from_secs(self.fetch_timeout_secs),
        )?;
        Ok(Launch::Crawl {
            fetcher: Arc::new(fetcher),
            root: self.root,
            max_nodes: self.max_nodes,
        })
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("peergraph=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    tracing::info!(?args, "starting peergraph");
    let launch = args.launch().context("failed to prepare the peer source")?;

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "peergraph",
        options,
        Box::new(move |cc| Ok(Box::new(PeerGraphApp::new(cc, launch)))),
    )
    .map_err(|error| anyhow::anyhow!("viewer exited with an error: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_start_in_crawl_mode() {
        let args = Args::try_parse_from(["peergraph"]).expect("parse");
        assert_eq!(args.portal_path, "portal.json");
        assert_eq!(args.fetch_timeout_secs, 4);
        assert!(matches!(
            args.launch().expect("launch"),
            Launch::Crawl {
                root: None,
                max_nodes: None,
                ..
            }
        ));
    }

    #[test]
    fn test_dataset_flag_selects_static_mode() {
        let args = Args::try_parse_from([
            "peergraph",
            "--dataset",
            "peers.json",
            "--max-nodes",
            "50",
        ])
        .expect("parse");
        match args.launch().expect("launch") {
            Launch::Dataset { path, max_nodes } => {
                assert_eq!(path, PathBuf::from("peers.json"));
                assert_eq!(max_nodes, Some(50));
            }
            Launch::Crawl { .. } => panic!("expected dataset launch"),
        }
    }

    #[test]
    fn test_root_conflicts_with_dataset() {
        let parsed = Args::try_parse_from([
            "peergraph",
            "--dataset",
            "peers.json",
            "--root",
            "https://a.example/",
        ]);
        assert!(parsed.is_err());
    }
}
