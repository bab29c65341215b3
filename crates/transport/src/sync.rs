//! Executes an ordered change list against an object store.
//!
//! Operations are applied strictly in list order; the ordering produced by
//! the reconciler is what keeps live traffic from seeing pages whose assets
//! have not landed yet. The caller persists the new remote catalogue only
//! after this function returns success.

use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use sitesync_core::{ChangeReason, PreparedFile, Result, Rules};

use crate::ObjectStore;

/// Counts of operations applied by one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub uploaded: usize,
    pub attributes_rewritten: usize,
    pub deleted: usize,
}

impl SyncOutcome {
    #[must_use]
    pub fn total(&self) -> usize {
        self.uploaded + self.attributes_rewritten + self.deleted
    }
}

/// Apply every operation in the ordered change list, in order.
///
/// `on_progress` is called before each operation with its reason and the
/// prepared file, so callers can render per-item progress.
///
/// # Errors
/// Stops at the first failing operation and propagates its error; already
/// applied operations are not rolled back, which is safe because the
/// persisted catalogue still describes the pre-sync state.
pub async fn execute_changes<S, F>(
    store: &S,
    root: &Path,
    rules: &Rules,
    changes: &[(ChangeReason, String)],
    mut on_progress: F,
) -> Result<SyncOutcome>
where
    S: ObjectStore,
    F: FnMut(ChangeReason, &PreparedFile),
{
    let mut outcome = SyncOutcome::default();

    for (reason, path) in changes {
        let prepared = PreparedFile::new(root, path, rules);
        on_progress(*reason, &prepared);

        match reason {
            ChangeReason::NewFile | ChangeReason::ContentChanged => {
                let body = prepared.content()?;
                store
                    .put(prepared.remote_key(), Bytes::from(body), prepared.attributes())
                    .await?;
                outcome.uploaded += 1;
            }
            ChangeReason::AttributesChanged => {
                store
                    .copy_with_attributes(prepared.remote_key(), prepared.attributes())
                    .await?;
                outcome.attributes_rewritten += 1;
            }
            ChangeReason::Deleted => {
                store.delete(prepared.remote_key()).await?;
                outcome.deleted += 1;
            }
            ChangeReason::DeletedProtected | ChangeReason::Unchanged => {
                // The reconciler never emits these; nothing to do.
                debug!(path = %path, "skipping non-operation in change list");
            }
        }
    }

    Ok(outcome)
}
