//! Full sync passes over in-memory trees

use std::sync::Arc;

use gdmirror_core::domain::LocalFolderRecord;
use gdmirror_sync::events::SyncEvent;

use crate::common::{drain, engine, names, sample_tree, test_config, FakeDrive};

#[tokio::test]
async fn test_tree_is_mirrored_and_manifest_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path()).build();
    let root = config.sync.download_root.clone();
    let drive = Arc::new(sample_tree());
    let engine = engine(config, drive.clone());

    engine.initialize().await.unwrap();
    let report = engine.sync().await.unwrap();

    assert_eq!(report.roots.len(), 1);
    let a = &report.roots[0];
    assert_eq!(a.name, "A");
    assert_eq!(a.path, root.join("A"));
    assert_eq!(a.files.len(), 1);
    assert_eq!(a.files[0].name, "x.txt");
    assert_eq!(a.files[0].path, root.join("A").join("x.txt"));

    let b = a.folder("B").unwrap();
    assert_eq!(b.path, root.join("A").join("B"));
    assert_eq!(b.files.len(), 1);
    assert_eq!(b.files[0].name, "y.txt");
    assert!(b.folders.is_empty());

    assert_eq!(std::fs::read(root.join("A/x.txt")).unwrap(), vec![b'x'; 10]);
    assert_eq!(std::fs::read(root.join("A/B/y.txt")).unwrap(), vec![b'y'; 20]);
    assert!(!root.join("A/x.txt.tmp").exists());

    assert_eq!(report.files_downloaded, 2);
    assert_eq!(report.files_skipped, 0);
    assert_eq!(report.files_failed, 0);
    assert!(report.errors.is_empty());

    let manifest: Vec<LocalFolderRecord> =
        serde_json::from_slice(&std::fs::read(&report.manifest_path).unwrap()).unwrap();
    assert_eq!(manifest, report.roots);
}

#[tokio::test]
async fn test_second_run_downloads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let drive = Arc::new(sample_tree());

    let first = engine(test_config(dir.path()).build(), drive.clone());
    first.initialize().await.unwrap();
    let first_report = first.sync().await.unwrap();
    assert_eq!(drive.total_content_calls(), 2);

    // A fresh engine reads the cache persisted by the first one
    let second = engine(test_config(dir.path()).build(), drive.clone());
    second.initialize().await.unwrap();
    let second_report = second.sync().await.unwrap();

    assert_eq!(drive.total_content_calls(), 2);
    assert_eq!(second_report.files_skipped, 2);
    assert_eq!(second_report.files_downloaded, 0);
    assert_eq!(second_report.roots, first_report.roots);
}

#[tokio::test]
async fn test_changed_file_is_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();

    let first = engine(test_config(dir.path()).build(), Arc::new(sample_tree()));
    first.initialize().await.unwrap();
    first.sync().await.unwrap();

    let changed = Arc::new(
        FakeDrive::new()
            .folder("fA", "A", None)
            .file("fx", "x.txt", "fA", &[b'X'; 11])
            .folder("fB", "B", Some("fA"))
            .file("fy", "y.txt", "fB", &[b'y'; 20]),
    );
    let second = engine(test_config(dir.path()).build(), changed.clone());
    second.initialize().await.unwrap();
    let report = second.sync().await.unwrap();

    assert_eq!(changed.content_calls("fx"), 1);
    assert_eq!(changed.content_calls("fy"), 0);
    assert_eq!(report.files_downloaded, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(
        std::fs::read(dir.path().join("data/A/x.txt")).unwrap(),
        vec![b'X'; 11]
    );
}

#[tokio::test]
async fn test_failed_file_is_left_out_of_its_batch() {
    let dir = tempfile::tempdir().unwrap();
    let drive = Arc::new(
        FakeDrive::new()
            .folder("fA", "A", None)
            .file("f1", "one.bin", "fA", b"111")
            .file("f2", "two.bin", "fA", b"222")
            .file("fz", "z.bin", "fA", b"zzz")
            .file("f3", "three.bin", "fA", b"333")
            .file("f4", "four.bin", "fA", b"444")
            .failing("fz"),
    );
    let engine = engine(test_config(dir.path()).sync_batch_size(5).build(), drive.clone());
    let mut rx = engine.events().channel();

    engine.initialize().await.unwrap();
    let report = engine.sync().await.unwrap();

    let names_in_record: Vec<&str> = report.roots[0].files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names_in_record, vec!["one.bin", "two.bin", "three.bin", "four.bin"]);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("fz"));
    assert!(!dir.path().join("data/A/z.bin").exists());
    assert!(!dir.path().join("data/A/z.bin.tmp").exists());

    let events = drain(&mut rx);
    let download_errors: Vec<&SyncEvent> = events
        .iter()
        .filter(|e| matches!(e, SyncEvent::FileDownloadError { .. }))
        .collect();
    assert_eq!(download_errors.len(), 1);
    assert!(matches!(
        download_errors[0],
        SyncEvent::FileDownloadError { file_id, .. } if file_id == "fz"
    ));

    // The queued retries for z.bin all ran before sync returned
    assert!(names(&events).contains(&"retry_dropped"));
}

#[tokio::test]
async fn test_batches_of_two_keep_listing_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut drive = FakeDrive::new().folder("fA", "A", None);
    for i in 0..5 {
        drive = drive.file(&format!("f{i}"), &format!("file{i}.txt"), "fA", b"data");
    }
    let engine = engine(test_config(dir.path()).sync_batch_size(2).build(), Arc::new(drive));

    engine.initialize().await.unwrap();
    let report = engine.sync().await.unwrap();

    let files: Vec<&str> = report.roots[0].files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(files, vec!["file0.txt", "file1.txt", "file2.txt", "file3.txt", "file4.txt"]);
}

#[tokio::test]
async fn test_unlistable_subfolder_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let drive = Arc::new(
        FakeDrive::new()
            .folder("fA", "A", None)
            .folder("fLocked", "Locked", Some("fA"))
            .folder("fC", "C", Some("fA"))
            .file("fc", "c.txt", "fC", b"ccc")
            .unlistable("fLocked"),
    );
    let engine = engine(test_config(dir.path()).build(), drive);
    let mut rx = engine.events().channel();

    engine.initialize().await.unwrap();
    let report = engine.sync().await.unwrap();

    let a = &report.roots[0];
    assert!(a.folder("Locked").is_none());
    assert_eq!(a.folder("C").unwrap().files.len(), 1);
    assert_eq!(report.folders_failed, 1);
    assert!(names(&drain(&mut rx)).contains(&"folder_error"));
}

#[tokio::test]
async fn test_roots_include_folders_whose_parent_is_not_visible() {
    let dir = tempfile::tempdir().unwrap();
    let drive = Arc::new(
        FakeDrive::new()
            .folder("fMine", "Mine", None)
            .folder("fShared", "Shared", Some("notVisible"))
            .folder("fInner", "Inner", Some("fShared"))
            .file("fs", "s.txt", "fInner", b"shared"),
    );
    let engine = engine(test_config(dir.path()).build(), drive);

    engine.initialize().await.unwrap();
    let report = engine.sync().await.unwrap();

    let roots: Vec<&str> = report.roots.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(roots, vec!["Mine", "Shared"]);
    assert!(dir.path().join("data/Shared/Inner/s.txt").exists());
}

#[tokio::test]
async fn test_native_documents_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let drive = Arc::new(
        FakeDrive::new()
            .folder("fA", "A", None)
            .typed_file("fdoc", "Notes", "fA", "application/vnd.google-apps.document", b"")
            .file("fx", "x.txt", "fA", b"plain"),
    );
    let engine = engine(test_config(dir.path()).build(), drive.clone());
    let mut rx = engine.events().channel();

    engine.initialize().await.unwrap();
    let report = engine.sync().await.unwrap();

    assert_eq!(drive.content_calls("fdoc"), 0);
    assert_eq!(report.files_unsupported, 1);
    assert_eq!(report.roots[0].files.len(), 1);
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        SyncEvent::FileUnsupported { file_id, .. } if file_id == "fdoc"
    )));
}

#[tokio::test]
async fn test_remote_names_cannot_escape_their_folder() {
    let dir = tempfile::tempdir().unwrap();
    let drive = Arc::new(
        FakeDrive::new()
            .folder("fA", "A", None)
            .file("fx", "../escape.txt", "fA", b"nope"),
    );
    let engine = engine(test_config(dir.path()).build(), drive);

    engine.initialize().await.unwrap();
    let report = engine.sync().await.unwrap();

    let file = &report.roots[0].files[0];
    assert_eq!(file.name, "../escape.txt");
    assert_eq!(file.path, dir.path().join("data/A/.._escape.txt"));
    assert!(!dir.path().join("data/escape.txt").exists());
}

#[tokio::test]
async fn test_sync_events_bracket_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(test_config(dir.path()).build(), Arc::new(sample_tree()));
    engine.initialize().await.unwrap();
    let mut rx = engine.events().channel();

    engine.sync().await.unwrap();

    let events = drain(&mut rx);
    let names = names(&events);
    assert_eq!(names.first(), Some(&"sync_started"));
    assert_eq!(names.last(), Some(&"sync_completed"));
    assert!(matches!(
        events.last().unwrap(),
        SyncEvent::SyncCompleted { roots: 1, files_downloaded: 2, .. }
    ));
    assert_eq!(names.iter().filter(|n| **n == "file_verified").count(), 2);
    assert_eq!(names.iter().filter(|n| **n == "folder_downloaded").count(), 2);
}
