//! Error types for the sitesync engine.

use std::path::PathBuf;

use thiserror::Error;

/// All possible errors from the sitesync engine and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote catalogue was written by a newer client. Never partially
    /// interpreted; the only fix is upgrading.
    #[error(
        "remote catalogue is version {found}, but this sitesync only reads up \
         to version {max}. Upgrade sitesync and re-run"
    )]
    UnsupportedCatalogueVersion { found: u32, max: u32 },

    /// The legacy flat-text catalogue could not be decoded. This is how the
    /// poison pill left behind by newer clients surfaces.
    #[error(
        "legacy catalogue object is not decodable ({0}). It was probably \
         written by a newer sitesync; upgrade sitesync and re-run"
    )]
    LegacyCatalogueUndecodable(String),

    /// Container encode/decode plumbing failure (gzip, SQLite, staging I/O).
    #[error("catalogue container error: {0}")]
    Catalogue(String),

    #[error("configuration error in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("cannot authenticate to the object store: {0}")]
    Credentials(String),

    /// Remote failure other than not-found. Not-found is `Ok(None)` at the
    /// object-store level, never an error.
    #[error("object store failure while {op} {key}: {reason}")]
    Transport {
        op: &'static str,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Catalogue(e.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
