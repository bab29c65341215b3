//! Project orchestration: one sync run from scan to persisted catalogue.

use std::path::{Path, PathBuf};

use humansize::{format_size, DECIMAL};
use tracing::info;

use sitesync_core::{
    change_order, Catalogue, ChangeReason, DiffResult, ProjectScanner, Result, Rules,
};
use sitesync_transport::{execute_changes, CatalogueStore, ObjectStore, RemoteCatalogueSource};

use crate::display;
use crate::progress::SyncProgress;

/// A loaded sitesync project: root directory plus parsed rules.
pub struct Project {
    root: PathBuf,
    rules: Rules,
}

impl Project {
    /// Load the project at `root`, parsing its rules file.
    ///
    /// # Errors
    /// Returns an error if the rules file is missing or invalid.
    pub fn load(root: &Path) -> Result<Self> {
        let rules = Rules::load(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            rules,
        })
    }

    #[must_use]
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Human-readable bucket location, e.g. `s3://bucket/staging/`.
    #[must_use]
    pub fn bucket_display(&self) -> String {
        match self.rules.remote_prefix() {
            Some(prefix) => format!("s3://{}/{}/", self.rules.aws.s3_bucket_name, prefix),
            None => format!("s3://{}/", self.rules.aws.s3_bucket_name),
        }
    }

    /// Build the fresh local catalogue for this run.
    ///
    /// # Errors
    /// Returns an error if scanning or hashing fails.
    pub fn local_catalogue(&self, no_delete: bool) -> Result<Catalogue> {
        let mut catalogue = ProjectScanner::new(&self.root, &self.rules).scan()?;
        if no_delete {
            catalogue.set_preserve_deleted_files(true);
        }
        Ok(catalogue)
    }

    /// Scan, fetch the remote catalogue, and diff the two.
    ///
    /// Returns the classification, the next remote catalogue to persist
    /// after a successful sync, and where the remote catalogue came from.
    ///
    /// # Errors
    /// Propagates scan, transport, and decode failures.
    pub async fn calculate_diff<S: ObjectStore>(
        &self,
        store: &S,
        no_delete: bool,
    ) -> Result<(DiffResult, Catalogue, RemoteCatalogueSource)> {
        let local = self.local_catalogue(no_delete)?;
        let catalogue_store = CatalogueStore::new(store, self.rules.remote_prefix());
        let (remote, source) = catalogue_store.fetch().await?;
        if source == RemoteCatalogueSource::Empty {
            info!("project not uploaded before (no catalogue found remotely)");
        }
        let (diff, next_remote) = local.diff(&remote);
        Ok((diff, next_remote, source))
    }

    /// Execute a full sync run: diff, apply the ordered operations, persist
    /// the new catalogue. With `dryrun` the remote store is never touched.
    ///
    /// # Errors
    /// Propagates any scan, transport, or persistence failure. On failure
    /// the previously persisted catalogue still describes the pre-sync
    /// state, so the run is safe to retry.
    pub async fn sync<S: ObjectStore>(
        &self,
        store: &S,
        dryrun: bool,
        no_delete: bool,
    ) -> Result<usize> {
        let progress = SyncProgress::new();

        let (diff, next_remote, _) = self.calculate_diff(store, no_delete).await?;
        let local_files = diff.new_files.len()
            + diff.content_changed.len()
            + diff.attributes_changed.len()
            + diff.unchanged.len();
        progress.scanned(local_files);
        display::print_diff_summary(&diff, false);

        if !diff.has_changes() {
            progress.unchanged();
            return Ok(0);
        }

        if dryrun {
            eprintln!("Not making any changes, this is a dryrun.");
            return Ok(diff.num_changes);
        }

        let ordered = change_order(&diff);
        let bar = progress.sync_bar(ordered.len() as u64);
        let outcome = execute_changes(store, &self.root, &self.rules, &ordered, |reason, file| {
            let (symbol, _, style) = display::reason_style(reason);
            let size_note = match reason {
                ChangeReason::NewFile | ChangeReason::ContentChanged => file
                    .size()
                    .map(|s| format!(" ({})", format_size(s, DECIMAL)))
                    .unwrap_or_default(),
                _ => String::new(),
            };
            bar.set_prefix(format!(
                "{} {}{size_note}",
                style.apply_to(symbol),
                file.remote_key()
            ));
            bar.inc(1);
        })
        .await?;
        bar.finish_and_clear();

        let catalogue_store = CatalogueStore::new(store, self.rules.remote_prefix());
        catalogue_store.persist(&next_remote).await?;

        progress.finish(outcome.total());
        Ok(outcome.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesync_transport::LocalObjectStore;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(root: &Path, extra_toml: &str) {
        fs::write(
            root.join("sitesync.toml"),
            format!("[aws]\ns3_bucket_name = 'www.test.com'\n{extra_toml}"),
        )
        .unwrap();
        fs::write(root.join("index.html"), "<html></html>").unwrap();
    }

    #[test]
    fn test_load_requires_rules_file() {
        let dir = TempDir::new().unwrap();
        assert!(Project::load(dir.path()).is_err());
    }

    #[test]
    fn test_bucket_display_with_prefix() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), "s3_project_root = 'staging'\n");
        let project = Project::load(dir.path()).unwrap();
        assert_eq!(project.bucket_display(), "s3://www.test.com/staging/");
    }

    #[tokio::test]
    async fn test_sync_roundtrip_is_idempotent() {
        let site = TempDir::new().unwrap();
        write_project(site.path(), "");
        let bucket = TempDir::new().unwrap();
        let store = LocalObjectStore::new(bucket.path()).unwrap();

        let project = Project::load(site.path()).unwrap();
        let first = project.sync(&store, false, false).await.unwrap();
        assert_eq!(first, 1);

        let second = project.sync(&store, false, false).await.unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_dryrun_leaves_remote_untouched() {
        let site = TempDir::new().unwrap();
        write_project(site.path(), "");
        let bucket = TempDir::new().unwrap();
        let store = LocalObjectStore::new(bucket.path()).unwrap();

        let project = Project::load(site.path()).unwrap();
        let planned = project.sync(&store, true, false).await.unwrap();
        assert_eq!(planned, 1);

        assert!(store.get("index.html").await.unwrap().is_none());
        assert!(store.get(".sitesync.cat").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_config_file_never_uploaded() {
        let site = TempDir::new().unwrap();
        write_project(site.path(), "");
        let bucket = TempDir::new().unwrap();
        let store = LocalObjectStore::new(bucket.path()).unwrap();

        let project = Project::load(site.path()).unwrap();
        project.sync(&store, false, false).await.unwrap();

        assert!(store.get("sitesync.toml").await.unwrap().is_none());
        assert!(store.get("index.html").await.unwrap().is_some());
    }
}
