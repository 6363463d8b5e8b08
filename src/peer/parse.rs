use std::fmt;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};

use super::record::{NodeRecord, RawStore};

/// The `{ name, port }` shape shared by portal documents and dataset entries.
#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawPortal {
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) port: Vec<String>,
}

impl RawPortal {
    fn into_record(self, id: String, canonicalize_ports: bool) -> NodeRecord {
        let display_name = self
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| id.clone());

        let neighbor_ids = self
            .port
            .into_iter()
            .map(|port| {
                if canonicalize_ports {
                    canonical_address(&port)
                } else {
                    port
                }
            })
            .collect();

        NodeRecord {
            id,
            display_name,
            neighbor_ids,
        }
    }
}

/// Trims whitespace, strips every trailing `/` and appends exactly one.
pub fn canonical_address(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    format!("{trimmed}/")
}

/// Parses a fetched portal document into the record for `address`.
pub(super) fn parse_portal(raw: &str, address: &str) -> serde_json::Result<NodeRecord> {
    let portal: RawPortal = serde_json::from_str(raw)?;
    Ok(portal.into_record(canonical_address(address), true))
}

struct OrderedDataset(RawStore);

impl<'de> Deserialize<'de> for OrderedDataset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DatasetVisitor;

        impl<'de> Visitor<'de> for DatasetVisitor {
            type Value = OrderedDataset;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of peer id to { name, port }")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut store = RawStore::new();
                while let Some((id, portal)) = access.next_entry::<String, RawPortal>()? {
                    store.insert(portal.into_record(id, false));
                }
                Ok(OrderedDataset(store))
            }
        }

        deserializer.deserialize_map(DatasetVisitor)
    }
}

/// Parses a static dataset document, keeping the document's key order.
pub(super) fn parse_dataset(raw: &str) -> serde_json::Result<RawStore> {
    let OrderedDataset(store) = serde_json::from_str(raw)?;
    Ok(store)
}
