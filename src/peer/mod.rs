mod collect;
mod fetch;
mod parse;
mod record;

pub use collect::load_dataset;
pub use fetch::{DEFAULT_PORTAL_PATH, FetchError, PortalFetcher, SchemeFetcher};
pub use parse::canonical_address;
pub use record::{NodeRecord, RawStore};
