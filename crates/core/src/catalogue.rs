//! Catalogue: the authoritative record of files and their hash fingerprints
//! for one side (local or remote) of a sync.

use std::collections::BTreeMap;

use serde::Serialize;

/// Why a path appears in a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    NewFile,
    ContentChanged,
    AttributesChanged,
    Deleted,
    DeletedProtected,
    Unchanged,
}

/// Hash fingerprints for one file. Both digests are opaque strings produced
/// by the file-attribute collaborator; the engine only compares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub content_hash: String,
    pub attributes_hash: String,
}

/// An ordered mapping from relative path to hash fingerprints.
///
/// Keys are unique (last write wins) and iteration is always lexicographic
/// by path, which makes persisted output deterministic and diffable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogue {
    entries: BTreeMap<String, CatalogueEntry>,
    preserve_deleted_files: bool,
}

impl Catalogue {
    /// Create an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, paths present remotely but absent locally are retained
    /// instead of being scheduled for deletion.
    pub fn set_preserve_deleted_files(&mut self, preserve: bool) {
        self.preserve_deleted_files = preserve;
    }

    #[must_use]
    pub fn preserve_deleted_files(&self) -> bool {
        self.preserve_deleted_files
    }

    /// Insert or overwrite an entry. Duplicate paths are not an error; the
    /// last write wins.
    pub fn add(
        &mut self,
        path: impl Into<String>,
        content_hash: impl ToString,
        attributes_hash: impl ToString,
    ) -> &mut Self {
        self.entries.insert(
            path.into(),
            CatalogueEntry {
                content_hash: content_hash.to_string(),
                attributes_hash: attributes_hash.to_string(),
            },
        );
        self
    }

    /// Entries as a path-sorted mapping. This is the only externally
    /// observable ordering contract of the type.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, CatalogueEntry> {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&CatalogueEntry> {
        self.entries.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diff this (local) catalogue against a remote one.
    ///
    /// Pure: neither input is mutated. Returns the classification result and
    /// the *next remote catalogue* — the local entries unioned with any
    /// protected-deletion survivors — which is what the remote store will
    /// contain after a successful sync and therefore what gets persisted.
    #[must_use]
    pub fn diff(&self, remote: &Catalogue) -> (DiffResult, Catalogue) {
        let mut result = DiffResult::default();
        let mut next_remote = Catalogue::new();

        for (path, entry) in &remote.entries {
            if !self.entries.contains_key(path) {
                if self.preserve_deleted_files {
                    result.deleted_protected.push(path.clone());
                    next_remote.entries.insert(path.clone(), entry.clone());
                } else {
                    result.deleted.push(path.clone());
                }
            }
        }

        for (path, entry) in &self.entries {
            match remote.entries.get(path) {
                None => result.new_files.push(path.clone()),
                // Content difference takes priority: a content change is
                // re-uploaded with fresh attributes anyway.
                Some(r) if entry.content_hash != r.content_hash => {
                    result.content_changed.push(path.clone());
                }
                Some(r) if entry.attributes_hash != r.attributes_hash => {
                    result.attributes_changed.push(path.clone());
                }
                Some(_) => result.unchanged.push(path.clone()),
            }
            next_remote.entries.insert(path.clone(), entry.clone());
        }

        result.num_changes = result.new_files.len()
            + result.content_changed.len()
            + result.attributes_changed.len()
            + result.deleted.len();

        (result, next_remote)
    }
}

/// Classification of every path in the union of two catalogues.
///
/// Each list is lexicographically ordered by path. Protected deletions and
/// unchanged paths are never counted as changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub num_changes: usize,
    pub new_files: Vec<String>,
    pub content_changed: Vec<String>,
    pub attributes_changed: Vec<String>,
    pub deleted: Vec<String>,
    pub deleted_protected: Vec<String>,
    pub unchanged: Vec<String>,
}

impl DiffResult {
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.num_changes > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &str, attrs: &str) -> CatalogueEntry {
        CatalogueEntry {
            content_hash: content.to_string(),
            attributes_hash: attrs.to_string(),
        }
    }

    #[test]
    fn test_add_last_write_wins() {
        let mut cat = Catalogue::new();
        cat.add("test/blah.img", "AABBCC", "XXYYZZ")
            .add("test/blah.img", "AABBCC", "112233");

        assert_eq!(cat.len(), 1);
        assert_eq!(cat.get("test/blah.img"), Some(&entry("AABBCC", "112233")));
    }

    #[test]
    fn test_entries_sorted_lexicographically() {
        let mut cat = Catalogue::new();
        cat.add("zebra.txt", "1", "1")
            .add("alpha.txt", "2", "2")
            .add("middle/file.txt", "3", "3");

        let paths: Vec<_> = cat.entries().keys().cloned().collect();
        assert_eq!(paths, vec!["alpha.txt", "middle/file.txt", "zebra.txt"]);
    }

    #[test]
    fn test_non_string_hashes_coerced() {
        let mut cat = Catalogue::new();
        cat.add("\u{266c} /music.fav.mp3", 200_010, "7A9 ");
        assert_eq!(
            cat.get("\u{266c} /music.fav.mp3"),
            Some(&entry("200010", "7A9 "))
        );
    }

    #[test]
    fn test_diff_new_project() {
        let mut local = Catalogue::new();
        local.add("a.txt", "H1", "A1");
        let remote = Catalogue::new();

        let (diff, next_remote) = local.diff(&remote);
        assert_eq!(diff.new_files, vec!["a.txt"]);
        assert_eq!(diff.num_changes, 1);
        assert_eq!(next_remote, local);
    }

    #[test]
    fn test_diff_classifies_every_path_once() {
        let mut local = Catalogue::new();
        local
            .add("index.html", "9J9J9J", "P2P2P2")
            .add("assets/blam/160-180.jpg", "A1A1A1", "B3B3B3")
            .add("\u{266c} /music.fav.mp3", 200_010, "7A9 ")
            .add("robots.txt", "4b4b4b", "929292")
            .add("consistent.html.html", "123", "123")
            .add("news_update.html", "4b4b4b", "929292");
        let mut remote = Catalogue::new();
        remote
            .add("assets/blam/160-180.jpg", "A1A1A1", "9S9S95")
            .add("consistent.html.html", "123", "123")
            .add("index.html", "282828", "P2P2P2")
            .add("\u{266c} /music.fav.mp3", 200_010, "7A9 ")
            .add("robots.txt", "asdfhl", "lkjfds")
            .add("tempfile.txt", "fj8fj8", "flwlfwl");

        let (diff, next_remote) = local.diff(&remote);

        assert_eq!(diff.new_files, vec!["news_update.html"]);
        assert_eq!(diff.content_changed, vec!["index.html", "robots.txt"]);
        assert_eq!(diff.attributes_changed, vec!["assets/blam/160-180.jpg"]);
        assert_eq!(diff.deleted, vec!["tempfile.txt"]);
        assert!(diff.deleted_protected.is_empty());
        assert_eq!(
            diff.unchanged,
            vec!["consistent.html.html", "\u{266c} /music.fav.mp3"]
        );
        assert_eq!(diff.num_changes, 5);

        // Every path in the union classified exactly once.
        let classified = diff.new_files.len()
            + diff.content_changed.len()
            + diff.attributes_changed.len()
            + diff.deleted.len()
            + diff.deleted_protected.len()
            + diff.unchanged.len();
        assert_eq!(classified, 7);

        // The dropped remote file must not survive into the next catalogue.
        assert!(next_remote.get("tempfile.txt").is_none());
        assert_eq!(next_remote.len(), local.len());
    }

    #[test]
    fn test_diff_content_takes_priority_over_attributes() {
        let mut local = Catalogue::new();
        local.add("a.txt", "H2", "A2");
        let mut remote = Catalogue::new();
        remote.add("a.txt", "H1", "A1");

        let (diff, _) = local.diff(&remote);
        assert_eq!(diff.content_changed, vec!["a.txt"]);
        assert!(diff.attributes_changed.is_empty());
    }

    #[test]
    fn test_diff_self_is_all_unchanged() {
        let mut cat = Catalogue::new();
        cat.add("a.txt", "1", "1").add("b/c.txt", "2", "2");

        let (diff, next_remote) = cat.diff(&cat);
        assert_eq!(diff.num_changes, 0);
        assert_eq!(diff.unchanged, vec!["a.txt", "b/c.txt"]);
        assert_eq!(next_remote, cat);
    }

    #[test]
    fn test_diff_protected_deletion() {
        let mut local = Catalogue::new();
        local.set_preserve_deleted_files(true);
        local.add("keep.html", "1", "1");
        let mut remote = Catalogue::new();
        remote
            .add("keep.html", "1", "1")
            .add("tempfile.txt", "fj8fj8", "flwlfwl");

        let (diff, next_remote) = local.diff(&remote);
        assert!(diff.deleted.is_empty());
        assert_eq!(diff.deleted_protected, vec!["tempfile.txt"]);
        assert_eq!(diff.num_changes, 0);

        // The protected entry survives with the remote side's hashes.
        assert_eq!(
            next_remote.get("tempfile.txt"),
            Some(&entry("fj8fj8", "flwlfwl"))
        );
    }

    #[test]
    fn test_diff_does_not_mutate_inputs() {
        let mut local = Catalogue::new();
        local.add("a.txt", "1", "1");
        let mut remote = Catalogue::new();
        remote.add("b.txt", "2", "2");

        let local_before = local.clone();
        let remote_before = remote.clone();
        let _ = local.diff(&remote);
        assert_eq!(local, local_before);
        assert_eq!(remote, remote_before);
    }
}
