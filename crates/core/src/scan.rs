//! Local catalogue construction by walking the project tree.
//!
//! Unlike a source-tree sync, a site upload publishes every file it finds:
//! hidden files are included and VCS ignore files carry no weight. The only
//! exclusion is the project's own config file.

use std::path::Path;

use ignore::WalkBuilder;

use crate::attributes::PreparedFile;
use crate::catalogue::Catalogue;
use crate::error::Result;
use crate::rules::{Rules, CONFIG_FILE};

/// Builds a fresh local catalogue for one sync run.
pub struct ProjectScanner<'a> {
    root: &'a Path,
    rules: &'a Rules,
}

impl<'a> ProjectScanner<'a> {
    #[must_use]
    pub fn new(root: &'a Path, rules: &'a Rules) -> Self {
        Self { root, rules }
    }

    /// Walk the project root and hash every file into a catalogue.
    ///
    /// # Errors
    /// Returns an error if directory traversal or file reading fails.
    pub fn scan(&self) -> Result<Catalogue> {
        let mut catalogue = Catalogue::new();
        catalogue.set_preserve_deleted_files(self.rules.preserve_deleted_files);

        let mut builder = WalkBuilder::new(self.root);
        builder
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .require_git(false);

        for result in builder.build() {
            let entry = result.map_err(std::io::Error::other)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let rel_path = path
                .strip_prefix(self.root)
                .map_err(std::io::Error::other)?
                .to_string_lossy()
                .into_owned();
            if rel_path == CONFIG_FILE {
                continue;
            }

            let prepared = PreparedFile::new(self.root, &rel_path, self.rules);
            let (content_hash, attributes_hash) = prepared.hashes()?;
            catalogue.add(rel_path, content_hash, attributes_hash);
        }

        Ok(catalogue)
    }
}
