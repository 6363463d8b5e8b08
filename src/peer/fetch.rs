//! Portal document retrieval.
//!
//! A peer address is a base URL; its portal document lives at a fixed relative path
//! under it. Fetchers are shared with crawl worker threads, so they must be
//! `Send + Sync`.

use std::fs;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use thiserror::Error;
use url::Url;

use super::parse::{canonical_address, parse_portal};
use super::record::NodeRecord;

pub const DEFAULT_PORTAL_PATH: &str = "portal.json";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid peer address {address}: {source}")]
    InvalidAddress {
        address: String,
        source: url::ParseError,
    },
    #[error("unsupported scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed portal document: {0}")]
    Document(#[from] serde_json::Error),
}

pub trait PortalFetcher: Send + Sync {
    fn fetch_portal(&self, address: &str) -> Result<NodeRecord, FetchError>;
}

impl<F> PortalFetcher for F
where
    F: Fn(&str) -> Result<NodeRecord, FetchError> + Send + Sync,
{
    fn fetch_portal(&self, address: &str) -> Result<NodeRecord, FetchError> {
        self(address)
    }
}

/// Resolves `<address><portal_path>` and dispatches on the URL scheme:
/// `http`/`https` go through a blocking client, `file` reads from disk.
pub struct SchemeFetcher {
    client: Client,
    portal_path: String,
}

impl SchemeFetcher {
    pub fn new(portal_path: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            portal_path: portal_path.trim_start_matches('/').to_string(),
        })
    }

    pub(super) fn portal_url(&self, address: &str) -> Result<Url, FetchError> {
        let base = canonical_address(address);
        Url::parse(&base)
            .and_then(|parsed| parsed.join(&self.portal_path))
            .map_err(|source| FetchError::InvalidAddress {
                address: base.clone(),
                source,
            })
    }

    fn fetch_http_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(FetchError::Network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        response.text().map_err(FetchError::Body)
    }

    fn fetch_file_text(url: &Url) -> Result<String, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|()| FetchError::UnsupportedScheme(url.scheme().to_string()))?;
        fs::read_to_string(&path).map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

impl PortalFetcher for SchemeFetcher {
    fn fetch_portal(&self, address: &str) -> Result<NodeRecord, FetchError> {
        let url = self.portal_url(address)?;
        let raw = match url.scheme() {
            "http" | "https" => self.fetch_http_text(&url)?,
            "file" => Self::fetch_file_text(&url)?,
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        };
        Ok(parse_portal(&raw, address)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> SchemeFetcher {
        SchemeFetcher::new(DEFAULT_PORTAL_PATH, Duration::from_secs(1)).expect("client builds")
    }

    #[test]
    fn test_portal_url_joins_fixed_path() {
        let url = fetcher()
            .portal_url("https://peer.example/site")
            .expect("valid");
        assert_eq!(url.as_str(), "https://peer.example/site/portal.json");
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let error = fetcher()
            .fetch_portal("gopher://peer.example/")
            .unwrap_err();
        assert!(matches!(error, FetchError::UnsupportedScheme(scheme) if scheme == "gopher"));
    }

    #[test]
    fn test_unparseable_address_is_rejected() {
        let error = fetcher().fetch_portal("not an address").unwrap_err();
        assert!(matches!(error, FetchError::InvalidAddress { .. }));
    }

    #[test]
    fn test_file_portal_is_read_and_parsed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("portal.json"),
            r#"{ "name": "local", "port": ["https://remote"] }"#,
        )
        .expect("write portal");
        let address = Url::from_directory_path(dir.path())
            .expect("directory url")
            .to_string();

        let record = fetcher().fetch_portal(&address).expect("file portal loads");
        assert_eq!(record.display_name, "local");
        assert_eq!(record.id, canonical_address(&address));
        assert_eq!(record.neighbor_ids, vec!["https://remote/"]);
    }

    #[test]
    fn test_missing_file_portal_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let address = Url::from_directory_path(dir.path())
            .expect("directory url")
            .to_string();
        let error = fetcher().fetch_portal(&address).unwrap_err();
        assert!(matches!(error, FetchError::Io { .. }));
    }
}
