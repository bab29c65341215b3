//! Remote catalogue persistence with format fallback.
//!
//! Reading walks three states: the current versioned container, then the
//! legacy flat-text export, then an empty catalogue for projects never
//! synced before. Decode failures in either format are fatal; only
//! not-found moves the read on to the next state.

use bytes::Bytes;
use tracing::{debug, info};

use sitesync_core::{join_key, store, Catalogue, RemoteAttributes, Result};

use crate::ObjectStore;

/// Which state the remote catalogue read ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCatalogueSource {
    /// Current versioned container.
    Current,
    /// First-generation flat-text export.
    Legacy,
    /// Neither object exists; the project has never been synced.
    Empty,
}

/// Reads and writes the catalogue objects at their well-known keys.
pub struct CatalogueStore<'a, S: ObjectStore> {
    store: &'a S,
    current_key: String,
    legacy_key: String,
}

impl<'a, S: ObjectStore> CatalogueStore<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, remote_prefix: Option<&str>) -> Self {
        Self {
            store,
            current_key: join_key(remote_prefix, store::CURRENT_CATALOGUE_KEY),
            legacy_key: join_key(remote_prefix, store::LEGACY_CATALOGUE_KEY),
        }
    }

    /// Key of the current versioned container object.
    #[must_use]
    pub fn current_key(&self) -> &str {
        &self.current_key
    }

    /// Key of the legacy flat-text object.
    #[must_use]
    pub fn legacy_key(&self) -> &str {
        &self.legacy_key
    }

    /// Fetch the remote catalogue, falling back from the current format to
    /// the legacy one, and to an empty catalogue when neither exists.
    ///
    /// # Errors
    /// Propagates transport failures and decode errors; a missing object is
    /// not an error.
    pub async fn fetch(&self) -> Result<(Catalogue, RemoteCatalogueSource)> {
        if let Some(bytes) = self.store.get(&self.current_key).await? {
            debug!(key = %self.current_key, "decoding versioned catalogue");
            return Ok((store::decode(&bytes)?, RemoteCatalogueSource::Current));
        }

        if let Some(bytes) = self.store.get(&self.legacy_key).await? {
            debug!(key = %self.legacy_key, "decoding legacy catalogue");
            return Ok((store::decode_legacy(&bytes)?, RemoteCatalogueSource::Legacy));
        }

        info!("no remote catalogue found; treating project as never synced");
        Ok((Catalogue::new(), RemoteCatalogueSource::Empty))
    }

    /// Persist the next remote catalogue.
    ///
    /// Writes the versioned container, then unconditionally overwrites the
    /// legacy object with the poison pill so old clients fail loudly rather
    /// than reading a stale catalogue. Callers invoke this only after every
    /// operation of the sync has completed.
    ///
    /// # Errors
    /// Propagates encode and transport failures.
    pub async fn persist(&self, catalogue: &Catalogue) -> Result<()> {
        let body = store::encode(catalogue)?;
        self.store
            .put(
                &self.current_key,
                Bytes::from(body),
                &RemoteAttributes::private("application/octet-stream"),
            )
            .await?;
        self.store
            .put(
                &self.legacy_key,
                Bytes::from_static(store::LEGACY_POISON),
                &RemoteAttributes::private("text/csv"),
            )
            .await?;
        Ok(())
    }
}
