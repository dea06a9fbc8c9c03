//! Bulk deletion of everything a space or a user owns.
//!
//! Each collection is cleaned on its own: a failure is recorded in the
//! [`CleanupReport`] and the run moves on to the next collection. Nothing is
//! rolled back. Documents are re-selected by query on every run, so running
//! again after a partial failure only touches what is left.

mod memory;

pub use self::memory::{Document, MemoryDocumentStore};

use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::types::space::SpaceId;

/// Most deletes a single batch commit may carry.
pub const MAX_BATCH_OPS: usize = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CleanupError {
    #[error("Batch of {size} operations exceeds the per-commit limit")]
    BatchTooLarge { size: usize },

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

/// Which documents a cleanup run selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentFilter {
    Space(String),
    Owner(String),
}

/// Backend the cleanup routines delete from.
pub trait DocumentStore: Send + Sync {
    fn list_documents(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> impl Future<Output = Result<Vec<DocumentRef>, CleanupError>> + Send;

    /// Delete every document in `batch` atomically. Returns how many existed.
    fn commit_deletes(
        &self,
        batch: &[DocumentRef],
    ) -> impl Future<Output = Result<usize, CleanupError>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub collection: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub processed: usize,
    pub failed: usize,
    pub deleted: usize,
    pub errors: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    fn fail(&mut self, collection: &str, err: CleanupError) {
        error!("Cleanup of {} failed: {}", collection, err);
        self.failed += 1;
        self.errors.push(CleanupFailure {
            collection: collection.to_string(),
            message: err.to_string(),
        });
    }
}

/// Delete every document in `collections` that belongs to `space`.
pub async fn delete_space_data<S: DocumentStore>(
    store: &S,
    space: &SpaceId,
    collections: &[&str],
) -> CleanupReport {
    if space.is_sentinel() {
        warn!("Refusing to bulk delete sentinel space {}", space);
        return CleanupReport::default();
    }
    info!("Deleting data of space {} across {} collections", space, collections.len());
    delete_matching(store, collections, &DocumentFilter::Space(space.to_string())).await
}

/// Delete every document in `collections` owned by `user_id`.
pub async fn delete_user_data<S: DocumentStore>(
    store: &S,
    user_id: &str,
    collections: &[&str],
) -> CleanupReport {
    info!("Deleting data of user {} across {} collections", user_id, collections.len());
    delete_matching(store, collections, &DocumentFilter::Owner(user_id.to_string())).await
}

pub async fn delete_matching<S: DocumentStore>(
    store: &S,
    collections: &[&str],
    filter: &DocumentFilter,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    for &collection in collections {
        report.processed += 1;

        let docs = match store.list_documents(collection, filter).await {
            Ok(docs) => docs,
            Err(e) => {
                report.fail(collection, e);
                continue;
            }
        };

        let mut deleted_here = 0;
        let mut failed = false;
        for batch in docs.chunks(MAX_BATCH_OPS) {
            match store.commit_deletes(batch).await {
                Ok(n) => deleted_here += n,
                Err(e) => {
                    report.fail(collection, e);
                    failed = true;
                    break;
                }
            }
        }

        report.deleted += deleted_here;
        if !failed {
            info!("Cleaned {}: {} documents", collection, deleted_here);
        }
    }

    info!(
        "Cleanup finished: {} collections, {} failed, {} documents deleted",
        report.processed, report.failed, report.deleted
    );
    report
}
