//! Safety ordering for sync operations.
//!
//! Turns a [`DiffResult`] into one ordered operation list that is safe to
//! execute sequentially against an eventually-consistent object store
//! serving live traffic: metadata rewrites first, uploads ordered so that a
//! page never goes live before the assets it references, deletions last.

use std::cmp::Ordering;
use std::path::Path;

use crate::catalogue::{ChangeReason, DiffResult};

/// Upload ordering class, derived purely from the file extension.
///
/// The ordinal order is the upload order: plain assets land first and
/// HTML documents last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetClass {
    Other,
    Stylesheet,
    Script,
    Html,
}

/// Classify a path by case-insensitive extension match. Paths without a
/// recognised extension are `Other`.
#[must_use]
pub fn asset_class(path: &str) -> AssetClass {
    let ext = match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return AssetClass::Other,
    };
    match ext.as_str() {
        "css" => AssetClass::Stylesheet,
        "js" => AssetClass::Script,
        "html" | "htm" | "xhtml" => AssetClass::Html,
        _ => AssetClass::Other,
    }
}

fn depth(path: &str) -> usize {
    path.matches('/').count()
}

fn upload_order(a: &str, b: &str) -> Ordering {
    // Within an asset class, deeper paths first; lexicographic on ties.
    asset_class(a)
        .cmp(&asset_class(b))
        .then_with(|| depth(b).cmp(&depth(a)))
        .then_with(|| a.cmp(b))
}

/// Produce the ordered `(reason, path)` operation list for a diff.
///
/// Three fixed priority bands: attribute-only changes, then new-file and
/// content-changed uploads (sub-ordered by [`asset_class`] and depth), then
/// deletions. Protected deletions and unchanged paths never appear. The
/// output is a stable total order: the same diff always yields an identical
/// list.
#[must_use]
pub fn change_order(diff: &DiffResult) -> Vec<(ChangeReason, String)> {
    let mut ops = Vec::with_capacity(diff.num_changes);

    for path in &diff.attributes_changed {
        ops.push((ChangeReason::AttributesChanged, path.clone()));
    }

    let mut uploads: Vec<(ChangeReason, &str)> = diff
        .new_files
        .iter()
        .map(|p| (ChangeReason::NewFile, p.as_str()))
        .chain(
            diff.content_changed
                .iter()
                .map(|p| (ChangeReason::ContentChanged, p.as_str())),
        )
        .collect();
    uploads.sort_by(|a, b| upload_order(a.1, b.1));
    ops.extend(uploads.into_iter().map(|(r, p)| (r, p.to_string())));

    for path in &diff.deleted {
        ops.push((ChangeReason::Deleted, path.clone()));
    }

    ops
}
