//! Catalog reconciliation against the object store.
//!
//! Lists what actually lives in the bucket and brings the catalog in step:
//! objects missing from the catalog are inserted with a derived
//! classification, and records whose folder drifted from the canonical one
//! for their kind are corrected. Individual object failures are collected
//! in the report instead of aborting the pass.

use std::collections::HashMap;

use async_trait::async_trait;
use quill_postgres::types::MediaKind;
use quill_storage::{RemoteObject, StorageResult};
use uuid::Uuid;

use crate::error::MediaResult;
use crate::mime;

/// Tracing target for reconciliation operations.
const TRACING_TARGET: &str = "quill_media::sync";

/// Read access to the remote bucket, as reconciliation needs it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lists objects under a prefix, bounded by the backend's listing cap.
    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<RemoteObject>>;
}

/// A catalog row as reconciliation sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub storage_key: String,
    pub folder_path: String,
    pub kind: MediaKind,
}

/// A row reconciliation wants to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogEntry {
    pub storage_key: String,
    pub kind: MediaKind,
    pub folder_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Catalog access, as reconciliation needs it.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Loads every cataloged entry under a key prefix, in one query.
    async fn list_entries_under_prefix(&self, prefix: &str) -> MediaResult<Vec<CatalogEntry>>;

    /// Inserts an entry unless one already exists for the key.
    ///
    /// Returns whether a row was inserted; a concurrent insert of the
    /// same key is not an error.
    async fn insert_entry_if_absent(&self, entry: NewCatalogEntry) -> MediaResult<bool>;

    /// Moves an entry to a folder.
    async fn set_entry_folder(&self, id: Uuid, folder_path: &str) -> MediaResult<()>;
}

/// Outcome counters for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Objects newly cataloged.
    pub inserted: u64,
    /// Records moved to their canonical folder.
    pub corrected: u64,
    /// Objects examined, including failures.
    pub total_processed: u64,
    /// Per-object failures. Never aborts the pass.
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Whether the pass changed nothing and hit no failures.
    pub fn is_clean_noop(&self) -> bool {
        self.inserted == 0 && self.corrected == 0 && self.failures.is_empty()
    }
}

/// One object that could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub storage_key: String,
    pub message: String,
}

enum Outcome {
    Inserted,
    Corrected,
    Unchanged,
}

/// Reconciles the catalog with the remote bucket.
///
/// Generic over its two dependencies so the pass can be exercised against
/// in-memory fakes.
pub struct ReconciliationEngine<S, C> {
    remote: S,
    catalog: C,
}

impl<S: RemoteStore, C: MediaCatalog> ReconciliationEngine<S, C> {
    /// Creates an engine over the given remote store and catalog.
    pub fn new(remote: S, catalog: C) -> Self {
        Self { remote, catalog }
    }

    /// Runs one reconciliation pass over the given prefix.
    ///
    /// A failed listing on either side is fatal; per-object failures are
    /// reported and skipped. Running the pass twice in a row yields a
    /// clean no-op the second time.
    pub async fn run(&self, prefix: &str) -> MediaResult<SyncReport> {
        let objects = self.remote.list_objects(prefix).await?;

        let known: HashMap<String, CatalogEntry> = self
            .catalog
            .list_entries_under_prefix(prefix)
            .await?
            .into_iter()
            .map(|entry| (entry.storage_key.clone(), entry))
            .collect();

        tracing::info!(
            target: TRACING_TARGET,
            prefix = %prefix,
            objects = objects.len(),
            cataloged = known.len(),
            "Starting reconciliation pass"
        );

        let mut report = SyncReport::default();

        for object in objects {
            report.total_processed += 1;

            match self.reconcile_object(&object, known.get(&object.key)).await {
                Ok(Outcome::Inserted) => report.inserted += 1,
                Ok(Outcome::Corrected) => report.corrected += 1,
                Ok(Outcome::Unchanged) => {}
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        key = %object.key,
                        error = %err,
                        "Failed to reconcile object"
                    );
                    report.failures.push(SyncFailure {
                        storage_key: object.key.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            target: TRACING_TARGET,
            inserted = report.inserted,
            corrected = report.corrected,
            failures = report.failures.len(),
            total = report.total_processed,
            "Reconciliation pass complete"
        );

        Ok(report)
    }

    async fn reconcile_object(
        &self,
        object: &RemoteObject,
        entry: Option<&CatalogEntry>,
    ) -> MediaResult<Outcome> {
        // For cataloged rows the stored classification is the source of
        // truth; the key's extension only classifies new discoveries.
        if let Some(entry) = entry {
            let canonical_folder = entry.kind.folder_path();
            if entry.folder_path != canonical_folder {
                tracing::debug!(
                    target: TRACING_TARGET,
                    key = %object.key,
                    from = %entry.folder_path,
                    to = %canonical_folder,
                    "Correcting record folder"
                );
                self.catalog
                    .set_entry_folder(entry.id, canonical_folder)
                    .await?;
                return Ok(Outcome::Corrected);
            }
            return Ok(Outcome::Unchanged);
        }

        let (kind, mime_type) = mime::classify_key(&object.key);
        let inserted = self
            .catalog
            .insert_entry_if_absent(NewCatalogEntry {
                storage_key: object.key.clone(),
                kind,
                folder_path: kind.folder_path().to_owned(),
                mime_type: mime_type.to_owned(),
                size_bytes: object.size.unwrap_or(0) as i64,
            })
            .await?;

        // Lost insert race: someone else cataloged it first.
        if inserted {
            Ok(Outcome::Inserted)
        } else {
            Ok(Outcome::Unchanged)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::error::MediaError;

    struct FakeRemote {
        objects: Vec<RemoteObject>,
    }

    #[async_trait]
    impl RemoteStore for FakeRemote {
        async fn list_objects(&self, _prefix: &str) -> StorageResult<Vec<RemoteObject>> {
            Ok(self.objects.clone())
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        entries: Mutex<HashMap<String, CatalogEntry>>,
        // Keys whose catalog operations fail, to test failure isolation.
        poisoned: Vec<String>,
    }

    impl FakeCatalog {
        fn seed(&self, key: &str, folder_path: &str, kind: MediaKind) -> Uuid {
            let id = Uuid::new_v4();
            self.entries.lock().unwrap().insert(
                key.to_owned(),
                CatalogEntry {
                    id,
                    storage_key: key.to_owned(),
                    folder_path: folder_path.to_owned(),
                    kind,
                },
            );
            id
        }

        fn folder_of(&self, key: &str) -> Option<String> {
            self.entries
                .lock()
                .unwrap()
                .get(key)
                .map(|e| e.folder_path.clone())
        }

        fn check_poisoned(&self, key: &str) -> MediaResult<()> {
            if self.poisoned.iter().any(|k| k == key) {
                return Err(MediaError::thumbnail(key, "injected failure"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MediaCatalog for FakeCatalog {
        async fn list_entries_under_prefix(&self, prefix: &str) -> MediaResult<Vec<CatalogEntry>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .values()
                .filter(|e| e.storage_key.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn insert_entry_if_absent(&self, entry: NewCatalogEntry) -> MediaResult<bool> {
            self.check_poisoned(&entry.storage_key)?;
            let mut entries = self.entries.lock().unwrap();
            if entries.contains_key(&entry.storage_key) {
                return Ok(false);
            }
            entries.insert(
                entry.storage_key.clone(),
                CatalogEntry {
                    id: Uuid::new_v4(),
                    storage_key: entry.storage_key,
                    folder_path: entry.folder_path,
                    kind: entry.kind,
                },
            );
            Ok(true)
        }

        async fn set_entry_folder(&self, id: Uuid, folder_path: &str) -> MediaResult<()> {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .values_mut()
                .find(|e| e.id == id)
                .expect("unknown entry id");
            let key = entry.storage_key.clone();
            self.check_poisoned(&key)?;
            entry.folder_path = folder_path.to_owned();
            Ok(())
        }
    }

    fn object(key: &str) -> RemoteObject {
        RemoteObject {
            key: key.to_owned(),
            size: Some(1024),
        }
    }

    #[tokio::test]
    async fn uncataloged_objects_are_inserted_with_classification() {
        let remote = FakeRemote {
            objects: vec![
                object("uploads/photo.png"),
                object("uploads/clip.mp4"),
                object("uploads/notes.pdf"),
                object("uploads/blob.xyz"),
            ],
        };
        let engine = ReconciliationEngine::new(remote, FakeCatalog::default());

        let report = engine.run("uploads/").await.unwrap();

        assert_eq!(report.inserted, 4);
        assert_eq!(report.corrected, 0);
        assert_eq!(report.total_processed, 4);
        assert!(report.failures.is_empty());

        let catalog = &engine.catalog;
        assert_eq!(
            catalog.folder_of("uploads/photo.png").as_deref(),
            Some("/images")
        );
        assert_eq!(
            catalog.folder_of("uploads/clip.mp4").as_deref(),
            Some("/videos")
        );
        assert_eq!(
            catalog.folder_of("uploads/notes.pdf").as_deref(),
            Some("/documents")
        );
        assert_eq!(
            catalog.folder_of("uploads/blob.xyz").as_deref(),
            Some("/documents")
        );
    }

    #[tokio::test]
    async fn drifted_folders_are_corrected() {
        let catalog = FakeCatalog::default();
        catalog.seed("uploads/photo.png", "/misc", MediaKind::Image);

        let remote = FakeRemote {
            objects: vec![object("uploads/photo.png")],
        };
        let engine = ReconciliationEngine::new(remote, catalog);

        let report = engine.run("uploads/").await.unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.corrected, 1);
        assert_eq!(
            engine.catalog.folder_of("uploads/photo.png").as_deref(),
            Some("/images")
        );
    }

    #[tokio::test]
    async fn stored_classification_wins_over_key_extension() {
        // Uploaded with a declared MIME, so the key carries no extension.
        let catalog = FakeCatalog::default();
        catalog.seed("uploads/photo", "/images", MediaKind::Image);

        let remote = FakeRemote {
            objects: vec![object("uploads/photo")],
        };
        let engine = ReconciliationEngine::new(remote, catalog);

        let report = engine.run("uploads/").await.unwrap();

        assert_eq!(report.corrected, 0);
        assert_eq!(
            engine.catalog.folder_of("uploads/photo").as_deref(),
            Some("/images")
        );
    }

    #[tokio::test]
    async fn a_second_pass_is_a_clean_noop() {
        let remote = FakeRemote {
            objects: vec![object("uploads/photo.png"), object("uploads/notes.pdf")],
        };
        let engine = ReconciliationEngine::new(remote, FakeCatalog::default());

        let first = engine.run("uploads/").await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = engine.run("uploads/").await.unwrap();
        assert!(second.is_clean_noop());
        assert_eq!(second.total_processed, 2);
    }

    #[tokio::test]
    async fn object_failures_do_not_abort_the_pass() {
        let catalog = FakeCatalog {
            poisoned: vec!["uploads/bad.png".to_owned()],
            ..FakeCatalog::default()
        };
        let remote = FakeRemote {
            objects: vec![
                object("uploads/good.png"),
                object("uploads/bad.png"),
                object("uploads/also-good.pdf"),
            ],
        };
        let engine = ReconciliationEngine::new(remote, catalog);

        let report = engine.run("uploads/").await.unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.total_processed, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].storage_key, "uploads/bad.png");
    }
}
