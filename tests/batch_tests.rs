mod common;

use common::{sample_content, write_disguised, write_truncated};
use restorer::batch::{BatchObserver, Progress};
use restorer::{
    AlphabetTable, BatchDriver, CancelFlag, RestoreError, RestoreOptions, Restored, RootReport,
    restore_all,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

fn driver(options: RestoreOptions) -> BatchDriver<'static> {
    BatchDriver::new(AlphabetTable::deployed(), options)
}

#[test]
fn test_end_to_end_scenario() {
    let dir = tempdir().unwrap();
    let original: Vec<u8> = (0u8..10).collect();
    write_disguised(dir.path(), "a.encrypted", &original, "a.bin");
    let b = write_truncated(dir.path(), "b.encrypted", &sample_content(30, 9), "b.bin");
    let b_before = fs::read(&b).unwrap();

    let report = driver(RestoreOptions::default()).scan_root(dir.path(), &());

    assert_eq!(report.restored, 1);
    assert_eq!(report.discovered, 2);
    assert_eq!(report.folders, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, b);
    assert_eq!(report.failures[0].kind, "decode");
    assert!(!report.cancelled);

    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.bin", "b.encrypted"]);
    assert_eq!(fs::read(dir.path().join("a.bin")).unwrap(), original);
    assert_eq!(fs::read(&b).unwrap(), b_before);
}

#[test]
fn test_failure_in_the_middle_is_isolated() {
    let dir = tempdir().unwrap();
    let first = sample_content(200, 1);
    let third = sample_content(300, 3);
    let f1 = write_disguised(dir.path(), "1.encrypted", &first, "one.bin");
    let f2 = write_truncated(dir.path(), "2.encrypted", &sample_content(250, 2), "two.bin");
    let f3 = write_disguised(dir.path(), "3.encrypted", &third, "three.bin");

    let report = driver(RestoreOptions::default()).scan_root(dir.path(), &());

    assert_eq!(report.restored, 2);
    assert_eq!(report.discovered, 3);
    assert_eq!(report.sources_removed, 2);
    assert_eq!(report.bytes_restored, 500);
    assert!(!f1.exists());
    assert!(f2.exists());
    assert!(!f3.exists());
    assert!(!dir.path().join("two.bin").exists());
    assert_eq!(fs::read(dir.path().join("one.bin")).unwrap(), first);
    assert_eq!(fs::read(dir.path().join("three.bin")).unwrap(), third);
}

#[test]
fn test_nested_folders_restore_in_place() {
    let dir = tempdir().unwrap();
    let deep = dir.path().join("a/b/c");
    fs::create_dir_all(&deep).unwrap();
    write_disguised(dir.path(), "top.encrypted", b"top", "top.txt");
    write_disguised(&deep, "deep.encrypted", b"deep", "deep.txt");
    fs::write(dir.path().join("a/plain.txt"), b"untouched").unwrap();

    let report = driver(RestoreOptions::default()).scan_root(dir.path(), &());

    assert_eq!(report.folders, 4);
    assert_eq!(report.restored, 2);
    assert_eq!(fs::read(deep.join("deep.txt")).unwrap(), b"deep");
    assert_eq!(fs::read(dir.path().join("top.txt")).unwrap(), b"top");
    assert_eq!(fs::read(dir.path().join("a/plain.txt")).unwrap(), b"untouched");
}

#[test]
fn test_custom_suffix() {
    let dir = tempdir().unwrap();
    write_disguised(dir.path(), "a.locked", b"abc", "a.txt");
    write_disguised(dir.path(), "b.encrypted", b"def", "b.txt");

    let report = driver(RestoreOptions::default().with_suffix(".locked")).scan_root(dir.path(), &());

    assert_eq!(report.discovered, 1);
    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.encrypted").exists());
}

#[test]
fn test_parallel_counts_match_sequential() {
    let make_tree = || {
        let dir = tempdir().unwrap();
        for i in 0..40u32 {
            let name = format!("{i:02}.encrypted");
            let original = format!("{i:02}.bin");
            if i % 7 == 3 {
                write_truncated(dir.path(), &name, &sample_content(64, i), &original);
            } else {
                write_disguised(dir.path(), &name, &sample_content(64, i), &original);
            }
        }
        dir
    };

    let seq_dir = make_tree();
    let par_dir = make_tree();
    let sequential = driver(RestoreOptions::default()).scan_root(seq_dir.path(), &());
    let parallel = driver(RestoreOptions::default().with_workers(4)).scan_root(par_dir.path(), &());

    assert_eq!(sequential.restored, 34);
    assert_eq!(sequential.failed, 6);
    assert_eq!(parallel.restored, sequential.restored);
    assert_eq!(parallel.failed, sequential.failed);
    assert_eq!(parallel.bytes_restored, sequential.bytes_restored);

    let failed_names = |report: &RootReport| -> Vec<String> {
        report
            .failures
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    };
    assert_eq!(failed_names(&parallel), failed_names(&sequential));
}

#[test]
fn test_cancelled_before_start_touches_nothing() {
    let dir = tempdir().unwrap();
    let source = write_disguised(dir.path(), "a.encrypted", b"abc", "a.txt");
    let cancel = CancelFlag::new();
    cancel.cancel();

    let driver = driver(RestoreOptions::default()).with_cancel_flag(cancel);
    let report = driver.run_all(&[dir.path().to_path_buf()], &());

    assert!(report.cancelled);
    assert!(report.roots.is_empty());
    assert!(source.exists());
    assert!(!dir.path().join("a.txt").exists());
}

struct CancelAfterFirst {
    cancel: CancelFlag,
    finished: AtomicUsize,
}

impl BatchObserver for CancelAfterFirst {
    fn file_finished(&self, _path: &Path, _outcome: Result<&Restored, &RestoreError>) {
        self.finished.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

#[test]
fn test_cancel_stops_at_file_boundary() {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        write_disguised(
            dir.path(),
            &format!("{i}.encrypted"),
            &sample_content(32, i),
            &format!("{i}.bin"),
        );
    }
    let observer = CancelAfterFirst {
        cancel: CancelFlag::new(),
        finished: AtomicUsize::new(0),
    };

    let driver = driver(RestoreOptions::default()).with_cancel_flag(observer.cancel.clone());
    let report = driver.run_all(&[dir.path().to_path_buf(), dir.path().to_path_buf()], &observer);

    assert_eq!(observer.finished.load(Ordering::SeqCst), 1);
    assert_eq!(report.roots.len(), 1);
    assert_eq!(report.roots[0].restored, 1);
    assert_eq!(report.roots[0].skipped(), 4);
    assert!(report.roots[0].cancelled);
    assert!(report.cancelled);
    assert!(dir.path().join("0.bin").exists());
    assert!(dir.path().join("1.encrypted").exists());
}

#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    finished: AtomicUsize,
    progress: AtomicUsize,
    roots_finished: AtomicUsize,
}

impl BatchObserver for Counting {
    fn root_started(&self, _root: &Path, _discovered: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn file_finished(&self, _path: &Path, _outcome: Result<&Restored, &RestoreError>) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    fn progress(&self, progress: &Progress) {
        assert!(progress.processed <= progress.total);
        self.progress.fetch_add(1, Ordering::SeqCst);
    }

    fn root_finished(&self, _report: &RootReport) {
        self.roots_finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_observer_and_progress_interval() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        write_disguised(
            dir.path(),
            &format!("{i}.encrypted"),
            b"abc",
            &format!("{i}.txt"),
        );
    }
    let observer = Counting::default();

    driver(RestoreOptions::default().with_progress_interval(3)).run_all(&[dir.path().to_path_buf()], &observer);

    assert_eq!(observer.started.load(Ordering::SeqCst), 1);
    assert_eq!(observer.finished.load(Ordering::SeqCst), 10);
    assert_eq!(observer.progress.load(Ordering::SeqCst), 3);
    assert_eq!(observer.roots_finished.load(Ordering::SeqCst), 1);
}

#[test]
fn test_run_all_aggregates_roots() {
    let first = tempdir().unwrap();
    let empty = tempdir().unwrap();
    let second = tempdir().unwrap();
    write_disguised(first.path(), "a.encrypted", b"aaa", "a.txt");
    write_disguised(second.path(), "b.encrypted", b"bbbb", "b.txt");
    write_truncated(second.path(), "c.encrypted", &sample_content(40, 5), "c.txt");
    let missing = PathBuf::from(first.path()).join("does-not-exist");

    let roots = vec![
        first.path().to_path_buf(),
        empty.path().to_path_buf(),
        missing.clone(),
        second.path().to_path_buf(),
    ];
    let report = restore_all(&roots);

    assert_eq!(report.roots.len(), 4);
    assert_eq!(
        report.roots.iter().map(|r| r.root.clone()).collect::<Vec<_>>(),
        roots
    );
    assert_eq!(report.totals.roots_with_candidates, 2);
    assert_eq!(report.totals.discovered, 3);
    assert_eq!(report.totals.restored, 2);
    assert_eq!(report.totals.failed, 1);
    assert_eq!(report.totals.bytes_restored, 7);
    assert!(report.roots[2].scan_error.is_some());
    assert_eq!(report.roots[2].restored, 0);
    assert!(!report.cancelled);
}

#[test]
fn test_report_serializes_to_json() {
    let dir = tempdir().unwrap();
    write_disguised(dir.path(), "a.encrypted", b"abc", "a.txt");
    write_truncated(dir.path(), "b.encrypted", &sample_content(20, 1), "b.txt");

    let report = restore_all(&[dir.path().to_path_buf()]);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["totals"]["restored"], 1);
    assert_eq!(json["totals"]["failed"], 1);
    assert_eq!(json["roots"][0]["failures"][0]["kind"], "decode");
    assert!(json["roots"][0]["elapsed_secs"].is_f64());
}

#[cfg(unix)]
#[test]
fn test_undeletable_source_is_not_counted_as_removed() {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let dir = tempdir().unwrap();
    if fs::metadata(dir.path()).unwrap().uid() == 0 {
        return;
    }
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_disguised(dir.path(), "a.encrypted", b"free", "a.txt");
    let stuck = write_disguised(&locked, "b.encrypted", b"stuck", "b.txt");
    fs::write(locked.join("b.txt"), b"").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    let report = driver(RestoreOptions::default()).scan_root(dir.path(), &());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.restored, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.sources_removed, report.restored - 1);
    assert!(stuck.exists());
    assert_eq!(fs::read(locked.join("b.txt")).unwrap(), b"stuck");
    assert!(!dir.path().join("a.encrypted").exists());
}
