//! sitesync-core: catalogue and reconciliation engine
//!
//! The persistent record of what a remote site contains, the diff between it
//! and the local tree, and the safety ordering of the resulting operations.
//! Pure apart from reading local files; all network I/O lives in
//! sitesync-transport.

pub mod attributes;
pub mod catalogue;
pub mod error;
pub mod order;
pub mod rules;
pub mod scan;
pub mod store;

pub use attributes::{join_key, PreparedFile, RemoteAttributes};
pub use catalogue::{Catalogue, CatalogueEntry, ChangeReason, DiffResult};
pub use error::{Error, Result};
pub use order::{asset_class, change_order, AssetClass};
pub use rules::{Directives, Rules, CONFIG_FILE};
pub use scan::ProjectScanner;
pub use store::{
    CURRENT_CATALOGUE_KEY, LEGACY_CATALOGUE_KEY, LEGACY_POISON, MAX_DB_SCHEMA_VERSION,
};
