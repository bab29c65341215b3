//! Local filesystem object store.
//!
//! Simulates the remote bucket in a directory tree, without any network.
//! Object bodies live under `objects/` and the last-written attributes under
//! `attributes/`, so tests can observe metadata rewrites.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use sitesync_core::{RemoteAttributes, Result};

use crate::ObjectStore;

/// Object store rooted in a local directory, for tests and offline runs.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at the given directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("objects"))?;
        std::fs::create_dir_all(root.join("attributes"))?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join("objects").join(key)
    }

    fn attributes_path(&self, key: &str) -> PathBuf {
        self.root.join("attributes").join(key)
    }

    /// The attributes last written for a key, as rendered pairs.
    ///
    /// # Errors
    /// Returns an error if the sidecar file cannot be read.
    pub fn recorded_attributes(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.attributes_path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_attributes(&self, key: &str, attributes: &RemoteAttributes) -> Result<()> {
        let path = self.attributes_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut rendered = String::new();
        for (name, value) in attributes.as_sorted_pairs() {
            rendered.push_str(&name);
            rendered.push_str(": ");
            rendered.push_str(&value);
            rendered.push('\n');
        }
        std::fs::write(path, rendered)?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match std::fs::read(self.object_path(key)) {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, body: Bytes, attributes: &RemoteAttributes) -> Result<()> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &body)?;
        self.write_attributes(key, attributes)
    }

    async fn copy_with_attributes(&self, key: &str, attributes: &RemoteAttributes) -> Result<()> {
        // Content untouched; only the sidecar changes.
        if !self.object_path(key).exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("cannot rewrite attributes of missing object {key}"),
            )
            .into());
        }
        self.write_attributes(key, attributes)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        for path in [self.object_path(key), self.attributes_path(key)] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
