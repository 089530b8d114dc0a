//! End-to-end backup and restore through [`BackupService`]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use repovault::backup::{
    BackupErrorCode, BackupFileNaming, BackupOptions, BackupReader, ChangeSummary, JsonCodec,
    ProblemLog, RestoreOptions, CHANGE_AREA_DIR,
};
use repovault::cache::{EnumerationConfig, StaticCluster};
use repovault::observability::{Diagnostics, Logger};
use repovault::repository::{
    BinaryKey, BinaryStore, DocumentStore, MemoryBinaryStore, MemoryDocumentStore, NodeDocument,
    NodeKey, DEFAULT_METADATA_KEY,
};
use repovault::service::BackupService;
use repovault::usage::{ChangeSet, MemoryChangeBus};

struct Repository {
    documents: Arc<MemoryDocumentStore>,
    binaries: Arc<MemoryBinaryStore>,
    bus: Arc<MemoryChangeBus>,
}

impl Repository {
    fn new(documents: MemoryDocumentStore) -> Self {
        Self {
            documents: Arc::new(documents),
            binaries: Arc::new(MemoryBinaryStore::new()),
            bus: Arc::new(MemoryChangeBus::new()),
        }
    }

    fn service(&self) -> BackupService {
        BackupService::new(self.documents.clone(), self.binaries.clone(), self.bus.clone())
    }

    fn document(&self, key: &str) -> Option<NodeDocument> {
        self.documents.get(&NodeKey::new(key)).unwrap()
    }
}

fn node_keys(count: usize) -> Vec<NodeKey> {
    (0..count).map(|i| NodeKey::new(format!("node-{:03}", i))).collect()
}

fn seed(repo: &Repository, keys: &[NodeKey]) {
    for key in keys {
        repo.documents
            .put(NodeDocument::new(key.clone(), json!({ "name": key.as_str() })))
            .unwrap();
    }
    repo.documents
        .put(NodeDocument::new(DEFAULT_METADATA_KEY, json!({ "workspaces": ["default"] })))
        .unwrap();
}

fn plain(documents_per_file: u64) -> BackupOptions {
    BackupOptions {
        documents_per_file,
        compress: false,
        ..BackupOptions::default()
    }
}

fn read_area(dir: &Path) -> Vec<NodeDocument> {
    BackupReader::new(
        dir,
        BackupFileNaming::default(),
        JsonCodec::<NodeDocument>::new(),
        ProblemLog::new(),
    )
    .into_documents()
    .collect()
}

#[tokio::test]
async fn test_backup_then_restore_into_empty_repository() {
    let temp = TempDir::new().unwrap();
    let backup_dir = temp.path().join("backup");

    let source = Repository::new(MemoryDocumentStore::new());
    seed(&source, &node_keys(25));
    let photo = source.binaries.store(b"photo bytes").unwrap();
    let report = source.binaries.store(b"report bytes").unwrap();

    let problems = source
        .service()
        .backup_repository(&backup_dir, &BackupOptions {
            documents_per_file: 10,
            ..BackupOptions::default()
        })
        .await
        .unwrap();
    assert!(problems.is_empty(), "{:?}", problems.problems());
    assert!(backup_dir.join("documents_000001.bin.gz").is_file());
    assert!(backup_dir.join("documents_000003.bin.gz").is_file());
    assert!(!backup_dir.join("documents_000004.bin.gz").exists());
    assert!(ChangeSummary::read_from(&backup_dir.join(CHANGE_AREA_DIR)).unwrap().is_some());

    let target = Repository::new(MemoryDocumentStore::new());
    let problems = target
        .service()
        .restore_repository(&backup_dir, &RestoreOptions::default())
        .await
        .unwrap();
    assert!(problems.is_empty(), "{:?}", problems.problems());

    assert_eq!(target.documents.keys(), source.documents.keys());
    assert_eq!(target.document("node-007"), source.document("node-007"));
    assert_eq!(target.binaries.read(&photo).unwrap(), b"photo bytes");
    assert_eq!(target.binaries.read(&report).unwrap(), b"report bytes");
    assert!(!target.binaries.is_unused(&photo));
}

#[tokio::test]
async fn test_metadata_document_written_last() {
    let temp = TempDir::new().unwrap();
    let repo = Repository::new(MemoryDocumentStore::new());
    // The metadata key sorts between these two
    seed(&repo, &[NodeKey::new("zz-last-by-name"), NodeKey::new("aa-first")]);

    let problems = repo.service().backup_repository(temp.path(), &plain(2)).await.unwrap();
    assert!(problems.is_empty());

    let documents = read_area(temp.path());
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[2].key, NodeKey::new(DEFAULT_METADATA_KEY));
}

#[tokio::test]
async fn test_restore_replaces_existing_documents() {
    let temp = TempDir::new().unwrap();
    let source = Repository::new(MemoryDocumentStore::new());
    seed(&source, &node_keys(5));
    source.service().backup_repository(temp.path(), &plain(2)).await.unwrap();

    for documents in [MemoryDocumentStore::new(), MemoryDocumentStore::new().without_clear()] {
        let target = Repository::new(documents);
        target
            .documents
            .put(NodeDocument::new("stale", json!({"left": "over"})))
            .unwrap();
        target
            .documents
            .put(NodeDocument::new("node-001", json!({"old": true})))
            .unwrap();

        let problems = target
            .service()
            .restore_repository(temp.path(), &RestoreOptions::default())
            .await
            .unwrap();
        assert!(problems.is_empty(), "{:?}", problems.problems());

        assert!(target.document("stale").is_none());
        assert_eq!(target.document("node-001"), source.document("node-001"));
        assert_eq!(target.documents.len(), 6);
    }
}

#[tokio::test]
async fn test_partitioned_store_backs_up_every_document() {
    let temp = TempDir::new().unwrap();
    let keys = node_keys(40);
    let mut all_keys = keys.clone();
    all_keys.push(NodeKey::new(DEFAULT_METADATA_KEY));

    let cluster = StaticCluster::partitioned(all_keys, 3);
    let source = Repository::new(MemoryDocumentStore::new().with_cluster(Arc::new(cluster)));
    seed(&source, &keys);

    let problems = source
        .service()
        .with_enumeration(EnumerationConfig { poll_interval_ms: 10 })
        .backup_repository(temp.path(), &plain(7))
        .await
        .unwrap();
    assert!(problems.is_empty(), "{:?}", problems.problems());

    let documents = read_area(temp.path());
    assert_eq!(documents.len(), 41);
    assert_eq!(documents[40].key, NodeKey::new(DEFAULT_METADATA_KEY));

    let target = Repository::new(MemoryDocumentStore::new());
    target
        .service()
        .restore_repository(temp.path(), &RestoreOptions::default())
        .await
        .unwrap();
    assert_eq!(target.documents.keys(), source.documents.keys());
}

#[tokio::test]
async fn test_changes_during_backup_are_captured() {
    let temp = TempDir::new().unwrap();
    let keys = node_keys(3);
    let cluster = StaticCluster::new()
        .member("n1", vec![keys[0].clone(), keys[1].clone()])
        .slow_member(
            "n2",
            vec![keys[2].clone(), NodeKey::new(DEFAULT_METADATA_KEY)],
            Duration::from_millis(200),
        );
    let source = Repository::new(MemoryDocumentStore::new().with_cluster(Arc::new(cluster)));
    seed(&source, &keys);
    let retired = source.binaries.store(b"old attachment").unwrap();

    let (logger, buffer) = Logger::buffered();
    let service = source
        .service()
        .with_diagnostics(Diagnostics::new(logger))
        .with_enumeration(EnumerationConfig { poll_interval_ms: 20 });

    let edit = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        source
            .documents
            .put(NodeDocument::new(keys[1].clone(), json!({"name": "edited"})))
            .unwrap();
        let added = source.binaries.store(b"new attachment").unwrap();
        source.bus.publish(
            &ChangeSet::new()
                .binary_used(added.clone())
                .binary_unused(retired.clone())
                .node_changed(keys[1].clone()),
        );
        added
    };

    let options = plain(10);
    let (problems, added) = tokio::join!(service.backup_repository(temp.path(), &options), edit);
    let problems = problems.unwrap();
    assert!(problems.is_empty(), "{:?}", problems.problems());
    assert_eq!(source.bus.listener_count(), 0);
    assert_eq!(buffer.events_named("USAGE_WINDOW_CLOSED").len(), 1);

    let change_dir = temp.path().join(CHANGE_AREA_DIR);
    let changed = read_area(&change_dir);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].content, json!({"name": "edited"}));

    let summary = ChangeSummary::read_from(&change_dir).unwrap().unwrap();
    assert_eq!(summary.unused_binary_keys, vec![retired.clone()]);
    assert_eq!(summary.used_binary_keys, vec![added.clone()]);

    // Changes published after the window closed are not tracked
    source
        .bus
        .publish(&ChangeSet::new().node_changed(keys[0].clone()));
    assert_eq!(read_area(&change_dir).len(), 1);

    let target = Repository::new(MemoryDocumentStore::new());
    let problems = target
        .service()
        .restore_repository(temp.path(), &RestoreOptions::default())
        .await
        .unwrap();
    assert!(problems.is_empty(), "{:?}", problems.problems());

    assert_eq!(target.document("node-001").unwrap().content, json!({"name": "edited"}));
    assert!(target.binaries.contains(&added));
    assert!(!target.binaries.is_unused(&added));
    assert!(target.binaries.is_unused(&retired));
}

#[tokio::test]
async fn test_restore_without_binaries_leaves_binary_store_alone() {
    let temp = TempDir::new().unwrap();
    let source = Repository::new(MemoryDocumentStore::new());
    seed(&source, &node_keys(2));
    source.binaries.store(b"attachment").unwrap();
    source
        .service()
        .backup_repository(temp.path(), &BackupOptions::default())
        .await
        .unwrap();

    let target = Repository::new(MemoryDocumentStore::new());
    let kept = target.binaries.store(b"already here").unwrap();
    target
        .service()
        .restore_repository(
            temp.path(),
            &RestoreOptions {
                include_binaries: false,
                ..RestoreOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(target.documents.len(), 3);
    assert_eq!(target.binaries.len(), 1);
    assert!(!target.binaries.is_unused(&kept));
    assert!(!target.binaries.contains(&BinaryKey::for_content(b"attachment")));
}

#[tokio::test]
async fn test_existing_binaries_marked_unused_on_restore() {
    let temp = TempDir::new().unwrap();
    let source = Repository::new(MemoryDocumentStore::new());
    seed(&source, &node_keys(1));
    let backed_up = source.binaries.store(b"backed up").unwrap();
    source
        .service()
        .backup_repository(temp.path(), &BackupOptions::default())
        .await
        .unwrap();

    let target = Repository::new(MemoryDocumentStore::new());
    let local = target.binaries.store(b"only in target").unwrap();
    target
        .service()
        .restore_repository(temp.path(), &RestoreOptions::default())
        .await
        .unwrap();

    assert!(target.binaries.is_unused(&local));
    assert!(!target.binaries.is_unused(&backed_up));
}

#[tokio::test]
async fn test_invalid_options_rejected() {
    let temp = TempDir::new().unwrap();
    let repo = Repository::new(MemoryDocumentStore::new());

    let err = repo
        .service()
        .backup_repository(temp.path(), &plain(0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), BackupErrorCode::RepovaultBackupInvalidArgument);
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_restore_from_missing_directory_is_a_problem() {
    let temp = TempDir::new().unwrap();
    let repo = Repository::new(MemoryDocumentStore::new());
    seed(&repo, &node_keys(2));

    let problems = repo
        .service()
        .restore_repository(&temp.path().join("absent"), &RestoreOptions::default())
        .await
        .unwrap();

    assert!(problems.contains(BackupErrorCode::RepovaultBackupReadFailed));
    assert_eq!(repo.documents.len(), 3);
}

#[tokio::test]
async fn test_clear_fallback_survives_failed_member() {
    let temp = TempDir::new().unwrap();
    let cluster = StaticCluster::new()
        .member("a", vec![NodeKey::new("stale")])
        .failing_member("b", "member left");
    let repo = Repository::new(
        MemoryDocumentStore::new()
            .without_clear()
            .with_cluster(Arc::new(cluster)),
    );
    repo.documents
        .put(NodeDocument::new("stale", json!({"left": "over"})))
        .unwrap();

    let problems = repo
        .service()
        .with_enumeration(EnumerationConfig { poll_interval_ms: 10 })
        .restore_repository(temp.path(), &RestoreOptions::default())
        .await
        .unwrap();

    assert!(repo.document("stale").is_none());
    assert_eq!(problems.len(), 1);
    assert!(problems.contains(BackupErrorCode::RepovaultBackupEnumeration));
}
