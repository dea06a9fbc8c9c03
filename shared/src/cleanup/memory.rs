use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use super::{CleanupError, DocumentFilter, DocumentRef, DocumentStore, MAX_BATCH_OPS};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    pub space_id: Option<String>,
    pub owner_id: Option<String>,
}

impl Document {
    pub fn in_space(space_id: &str, owner_id: &str) -> Self {
        Self {
            space_id: Some(space_id.to_string()),
            owner_id: Some(owner_id.to_string()),
        }
    }

    fn matches(&self, filter: &DocumentFilter) -> bool {
        match filter {
            DocumentFilter::Space(space) => self.space_id.as_deref() == Some(space),
            DocumentFilter::Owner(owner) => self.owner_id.as_deref() == Some(owner),
        }
    }
}

/// In-process [`DocumentStore`]. Collections can be marked failing so every
/// commit touching them errors, which is how partial runs are exercised.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    failing: RwLock<HashSet<String>>,
    commits: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: &str, id: &str, doc: Document) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub async fn fail_collection(&self, collection: &str) {
        self.failing.write().await.insert(collection.to_string());
    }

    pub async fn heal_collection(&self, collection: &str) {
        self.failing.write().await.remove(collection);
    }

    /// Successful batch commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn list_documents(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRef>, CleanupError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, doc)| doc.matches(filter))
            .map(|(id, _)| DocumentRef {
                collection: collection.to_string(),
                id: id.clone(),
            })
            .collect())
    }

    async fn commit_deletes(&self, batch: &[DocumentRef]) -> Result<usize, CleanupError> {
        if batch.len() > MAX_BATCH_OPS {
            return Err(CleanupError::BatchTooLarge { size: batch.len() });
        }
        {
            let failing = self.failing.read().await;
            if let Some(bad) = batch.iter().find(|r| failing.contains(&r.collection)) {
                return Err(CleanupError::Backend(format!(
                    "commit rejected for {}/{}",
                    bad.collection, bad.id
                )));
            }
        }

        let mut collections = self.collections.write().await;
        let removed = batch
            .iter()
            .filter(|r| {
                collections
                    .get_mut(&r.collection)
                    .and_then(|docs| docs.remove(&r.id))
                    .is_some()
            })
            .count();
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(removed)
    }
}
