mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeSigner, ScriptedLoader, drain, signatures};
use dave_core::{
    Archive, ArchiveAccess, ArchiveRef, DataAccess, FileMetadata, Notices, Severity,
    StructureUpdate, TaggedUpdate,
};
use dave_vault::{LoadPhase, VaultError, VaultStore, spawn_listener, update_channel};
use tokio::sync::Notify;
use tokio_test::assert_ok;

fn docs_scenario() -> Vec<StructureUpdate> {
    vec![
        StructureUpdate::IndividualFiles {
            files: vec![FileMetadata::new("fileA").loaded()],
        },
        StructureUpdate::ArchiveLoading {
            loading_archive: ArchiveRef::new("Docs", ArchiveAccess::Public("d0c5".into())),
        },
        StructureUpdate::ArchiveLoaded {
            archive: Archive::new("Docs", ArchiveAccess::Public("d0c5".into()))
                .with_files(vec![FileMetadata::new("x/y.txt")]),
        },
        StructureUpdate::Complete,
    ]
}

#[tokio::test]
async fn test_streamed_structure_builds_tree() {
    let (tx, rx) = update_channel();
    let loader = Arc::new(ScriptedLoader::new(tx, docs_scenario()));
    let store = Arc::new(VaultStore::new(
        signatures(FakeSigner::ok()),
        loader,
        Notices::new(),
    ));
    let _listener = spawn_listener(store.clone(), rx);
    let mut state_rx = store.subscribe();

    store.start_load().await.unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        state_rx.wait_for(|state| state.phase == LoadPhase::Complete),
    )
    .await
    .unwrap()
    .unwrap();

    store.with_state(|state| {
        let tree = state.tree.as_ref().unwrap();
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 2);
        assert!(tree.get(tree.find("fileA").unwrap()).unwrap().is_file());
        assert!(tree.get(tree.find("Docs").unwrap()).unwrap().is_archive_root());
        assert!(tree.get(tree.find("Docs/x").unwrap()).unwrap().is_folder());
        assert!(tree.find("Docs/x/y.txt").is_some());

        assert_eq!(state.current_directory, Some(root));
        assert!(state.loading_archives.is_empty());
        assert!(state.failed_archives().is_empty());
        assert_eq!(state.files.len(), 2);
        assert!(!state.pending);
    });
}

#[tokio::test]
async fn test_stale_updates_are_dropped() {
    let (tx, mut rx) = update_channel();
    let loader = Arc::new(ScriptedLoader::new(tx, docs_scenario()));
    let store = VaultStore::new(signatures(FakeSigner::ok()), loader, Notices::new());

    let stale = store.start_load().await.unwrap();
    let active = store.start_load().await.unwrap();
    assert_ne!(stale, active);

    // Only the second load's updates apply.
    let applied = drain(&mut rx, |update| store.apply_update(update));
    assert_eq!(applied, docs_scenario().len());

    let mut state_rx = store.subscribe();
    state_rx.borrow_and_update();
    let changed = store.apply_update(TaggedUpdate::new(
        &stale,
        StructureUpdate::IndividualFiles {
            files: vec![FileMetadata::new("intruder")],
        },
    ));
    assert!(!changed);
    assert!(!state_rx.has_changed().unwrap());
    store.with_state(|state| {
        assert!(state.file("intruder").is_none());
        assert_eq!(state.token.as_ref(), Some(&active));
    });

    // Untagged updates belong to no load.
    assert!(!store.apply_update(TaggedUpdate {
        token: None,
        update: StructureUpdate::Complete,
    }));
}

#[tokio::test]
async fn test_load_superseded_while_signing() {
    let gate = Arc::new(Notify::new());
    let signer = FakeSigner::gated(gate.clone());
    let (tx, _rx) = update_channel();
    let loader = Arc::new(ScriptedLoader::new(tx, vec![StructureUpdate::Complete]));
    let store = Arc::new(VaultStore::new(
        signatures(signer.clone()),
        loader.clone(),
        Notices::new(),
    ));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.start_load().await }
    });
    while signer.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    let first_token = store.with_state(|state| state.token.clone());

    let second = tokio::spawn({
        let store = store.clone();
        async move { store.start_load().await }
    });
    while store.with_state(|state| state.token.clone()) == first_token {
        tokio::task::yield_now().await;
    }

    gate.notify_one();

    assert!(matches!(first.await.unwrap(), Err(VaultError::Superseded)));
    let second_token = second.await.unwrap().unwrap();
    assert_eq!(loader.tokens.lock().await.as_slice(), &[second_token]);
    assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_signature_failure_notifies() {
    let notices = Notices::new();
    let mut notice_rx = notices.subscribe();
    let (tx, _rx) = update_channel();
    let loader = Arc::new(ScriptedLoader::new(tx, vec![]));
    let store = VaultStore::new(signatures(FakeSigner::rejecting()), loader, notices);

    let err = store.start_load().await.unwrap_err();
    assert!(matches!(err, VaultError::Core(_)));

    store.with_state(|state| {
        assert_eq!(state.phase, LoadPhase::Failed);
        assert!(!state.pending);
    });

    let notice = notice_rx.recv().await.unwrap();
    assert_eq!(notice.severity, Severity::Error);
    assert_eq!(notice.summary, "Failed to get vault structure");
}

#[tokio::test]
async fn test_single_file_resolution() {
    let (tx, mut rx) = update_channel();
    let mut loader = ScriptedLoader::new(
        tx,
        vec![StructureUpdate::IndividualFiles {
            files: vec![FileMetadata::new("notes.md").with_size(12)],
        }],
    );
    loader.single_file = Some(
        FileMetadata::new("notes.md")
            .with_size(12)
            .with_access(DataAccess::Public("abcd".into())),
    );
    let store = VaultStore::new(signatures(FakeSigner::ok()), Arc::new(loader), Notices::new());

    store.start_load().await.unwrap();
    drain(&mut rx, |update| store.apply_update(update));

    let listed = store.with_state(|state| state.file("notes.md").unwrap().file.clone());
    let file = store.load_single_file_data(&listed).await.unwrap();
    assert!(file.is_loaded);

    store.with_state(|state| {
        let entry = state.file("notes.md").unwrap();
        assert!(entry.file.is_loaded);
        assert!(!entry.is_loading);
        assert!(!entry.load_error);
        assert_eq!(
            entry.file.access_data,
            Some(DataAccess::Public("abcd".into()))
        );
        assert!(state.structure.files[0].is_loaded);
    });

    assert!(matches!(
        store.load_single_file_data(&FileMetadata::new("missing.md")).await,
        Err(VaultError::UnknownFile { .. })
    ));
}

#[tokio::test]
async fn test_single_file_resolution_is_per_archive() {
    let (tx, mut rx) = update_channel();
    let archive = |name: &str, addr: &str| StructureUpdate::ArchiveLoaded {
        archive: Archive::new(name, ArchiveAccess::Public(addr.into()))
            .with_files(vec![FileMetadata::new("shared/readme.md")]),
    };
    let loader = ScriptedLoader::new(tx, vec![archive("A", "aa"), archive("B", "bb")]);
    let store = VaultStore::new(signatures(FakeSigner::ok()), Arc::new(loader), Notices::new());

    store.start_load().await.unwrap();
    drain(&mut rx, |update| store.apply_update(update));

    let in_b = store.with_state(|state| state.file_in("B", "shared/readme.md").unwrap().file.clone());
    // The loader has nothing to resolve, so only B's entry is flagged.
    assert!(store.load_single_file_data(&in_b).await.is_err());

    store.with_state(|state| {
        assert!(state.file_in("B", "shared/readme.md").unwrap().load_error);
        assert!(!state.file_in("A", "shared/readme.md").unwrap().load_error);
    });
}

#[tokio::test]
async fn test_single_file_failure_sets_load_error() {
    let notices = Notices::new();
    let mut notice_rx = notices.subscribe();
    let (tx, mut rx) = update_channel();
    let loader = ScriptedLoader::new(
        tx,
        vec![StructureUpdate::IndividualFiles {
            files: vec![FileMetadata::new("broken.bin")],
        }],
    );
    let store = VaultStore::new(signatures(FakeSigner::ok()), Arc::new(loader), notices);

    store.start_load().await.unwrap();
    drain(&mut rx, |update| store.apply_update(update));

    assert!(store.load_single_file_data(&FileMetadata::new("broken.bin")).await.is_err());
    store.with_state(|state| {
        let entry = state.file("broken.bin").unwrap();
        assert!(entry.load_error);
        assert!(!entry.is_loading);
        assert!(!entry.file.is_loaded);
    });
    assert_eq!(notice_rx.recv().await.unwrap().summary, "Failed to load file");
}

#[tokio::test]
async fn test_navigation() {
    let (tx, mut rx) = update_channel();
    let loader = Arc::new(ScriptedLoader::new(tx, docs_scenario()));
    let store = VaultStore::new(signatures(FakeSigner::ok()), loader, Notices::new());

    store.start_load().await.unwrap();
    drain(&mut rx, |update| store.apply_update(update));

    let (docs, x, file_a) = store.with_state(|state| {
        let tree = state.tree.as_ref().unwrap();
        (
            tree.find("Docs").unwrap(),
            tree.find("Docs/x").unwrap(),
            tree.find("fileA").unwrap(),
        )
    });

    store.change_directory(x).unwrap();
    store.with_state(|state| {
        let children = state.current_directory_children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].1.name(), "y.txt");
    });

    assert!(store.parent_directory());
    store.with_state(|state| assert_eq!(state.current_directory, Some(docs)));
    assert!(store.parent_directory());
    assert!(!store.parent_directory());

    assert!(matches!(
        store.change_directory(file_a),
        Err(VaultError::NotAFolder { .. })
    ));
}

#[tokio::test]
async fn test_disconnect_clears_state() {
    let (tx, mut rx) = update_channel();
    let signer = FakeSigner::ok();
    let loader = Arc::new(ScriptedLoader::new(tx, docs_scenario()));
    let store = VaultStore::new(signatures(signer.clone()), loader, Notices::new());

    store.start_load().await.unwrap();
    drain(&mut rx, |update| store.apply_update(update));
    store.disconnect().await;

    store.with_state(|state| {
        assert_eq!(state.phase, LoadPhase::Idle);
        assert!(state.tree.is_none());
        assert!(state.token.is_none());
    });

    store.start_load().await.unwrap();
    assert_eq!(signer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_wire_events_from_loader_json() {
    let (tx, _rx) = update_channel();
    let loader = Arc::new(ScriptedLoader::new(tx, vec![]));
    let store = VaultStore::new(signatures(FakeSigner::ok()), loader, Notices::new());
    let token = assert_ok!(store.start_load().await);

    let big = r#"{"name":"Big","archive_access":{"Private":"ab12"}}"#;
    let events = [
        format!(r#"{{"temp_code":"{token}","update_type":"ArchiveLoading","loading_archive":{big}}}"#),
        format!(r#"{{"temp_code":"{token}","update_type":"ArchiveFailed","failed_archive":{big}}}"#),
        format!(r#"{{"temp_code":"{token}","update_type":"Complete"}}"#),
    ];
    for event in &events {
        let update: TaggedUpdate = assert_ok!(serde_json::from_str(event));
        assert!(store.apply_update(update));
    }

    store.with_state(|state| {
        assert!(state.loading_archives.is_empty());
        assert_eq!(state.failed_archives().len(), 1);
        assert_eq!(state.failed_archives()[0].name, "Big");
        assert!(state.failed_archives()[0].access.is_private());
        assert_eq!(state.phase, LoadPhase::Complete);
        // Failed archives are not rendered.
        assert!(state.tree.as_ref().is_none_or(|tree| tree.find("Big").is_none()));
    });
}
