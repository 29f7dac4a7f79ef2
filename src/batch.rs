//! Batch restoration over one or more storage roots.
//!
//! Each root is walked for candidate files first, then every candidate is
//! restored in isolation: a failing file is counted and logged and the batch
//! moves on. Cancellation is only observed between files, never inside one.

use crate::alphabet::AlphabetTable;
use crate::error::RestoreError;
use crate::options::RestoreOptions;
use crate::restore::{Restored, Restorer};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Shared stop request, checked before each file starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Hooks for a presentation layer. Every method defaults to a no-op.
pub trait BatchObserver: Sync {
    fn root_started(&self, _root: &Path, _discovered: usize) {}

    fn file_finished(&self, _path: &Path, _outcome: Result<&Restored, &RestoreError>) {}

    fn progress(&self, _progress: &Progress) {}

    fn root_finished(&self, _report: &RootReport) {}
}

impl BatchObserver for () {}

#[derive(Debug, Clone)]
pub struct Progress {
    pub root: PathBuf,
    pub processed: usize,
    pub total: usize,
    pub files_per_second: f64,
}

/// Candidates found under one root
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    pub folders: usize,
    /// Set when the walk stopped early; `files` holds what was found before.
    pub scan_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RootReport {
    pub root: PathBuf,
    pub folders: usize,
    pub discovered: usize,
    pub restored: usize,
    pub failed: usize,
    pub sources_removed: usize,
    pub bytes_restored: u64,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub failures: Vec<FileFailure>,
    pub scan_error: Option<String>,
    pub cancelled: bool,
}

impl RootReport {
    pub fn files_per_second(&self) -> f64 {
        rate(self.restored + self.failed, self.elapsed)
    }

    /// Candidates never attempted because the run was cancelled.
    pub fn skipped(&self) -> usize {
        self.discovered - self.restored - self.failed
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Totals {
    /// Roots with at least one candidate file
    pub roots_with_candidates: usize,
    pub folders: usize,
    pub discovered: usize,
    pub restored: usize,
    pub failed: usize,
    pub sources_removed: usize,
    pub bytes_restored: u64,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub roots: Vec<RootReport>,
    pub totals: Totals,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn from_roots(roots: Vec<RootReport>) -> Self {
        let mut totals = Totals::default();
        for root in &roots {
            if root.discovered > 0 {
                totals.roots_with_candidates += 1;
            }
            totals.folders += root.folders;
            totals.discovered += root.discovered;
            totals.restored += root.restored;
            totals.failed += root.failed;
            totals.sources_removed += root.sources_removed;
            totals.bytes_restored += root.bytes_restored;
            totals.elapsed += root.elapsed;
        }
        let cancelled = roots.iter().any(|r| r.cancelled);
        Self {
            roots,
            totals,
            cancelled,
        }
    }
}

fn as_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

fn rate(files: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        files as f64 / secs
    } else {
        0.0
    }
}

/// Walks `root` without following links, in file-name order, counting every
/// directory visited and collecting files whose name ends with `suffix`.
pub fn discover(root: &Path, suffix: &str) -> Discovery {
    let mut discovery = Discovery::default();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("error scanning {}: {}", root.display(), e);
                discovery.scan_error = Some(e.to_string());
                break;
            }
        };

        if entry.file_type().is_dir() {
            discovery.folders += 1;
        } else if entry.depth() > 0
            && !links_to_dir(&entry)
            && entry.file_name().to_string_lossy().ends_with(suffix)
        {
            discovery.files.push(entry.into_path());
        }
    }

    discovery
}

/// Links are not followed, but a link to a directory is still not a file.
fn links_to_dir(entry: &walkdir::DirEntry) -> bool {
    entry.path_is_symlink() && entry.path().is_dir()
}

#[derive(Default)]
struct Tally {
    processed: AtomicUsize,
    restored: AtomicUsize,
    failed: AtomicUsize,
    sources_removed: AtomicUsize,
    bytes_restored: AtomicU64,
    failures: Mutex<Vec<FileFailure>>,
}

impl Tally {
    /// Returns the number of files processed so far, this one included.
    fn record(&self, path: &Path, outcome: &Result<Restored, RestoreError>) -> usize {
        match outcome {
            Ok(restored) => {
                self.restored.fetch_add(1, Ordering::Relaxed);
                self.bytes_restored
                    .fetch_add(restored.bytes_written, Ordering::Relaxed);
                if restored.source_removed() {
                    self.sources_removed.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("failed to restore {}: {}", path.display(), e);
                self.failures.lock().push(FileFailure {
                    path: path.to_path_buf(),
                    kind: e.kind(),
                    reason: e.to_string(),
                });
            }
        }
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub struct BatchDriver<'t> {
    restorer: Restorer<'t>,
    options: RestoreOptions,
    pool: Option<rayon::ThreadPool>,
    cancel: CancelFlag,
}

impl<'t> BatchDriver<'t> {
    pub fn new(table: &'t AlphabetTable, options: RestoreOptions) -> Self {
        let pool = if options.workers > 1 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(options.workers)
                .thread_name(|i| format!("restore-{}", i))
                .build()
                .map_err(|e| tracing::warn!("falling back to sequential restore: {}", e))
                .ok()
        } else {
            None
        };

        Self {
            restorer: Restorer::new(table, &options),
            options,
            pool,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn options(&self) -> &RestoreOptions {
        &self.options
    }

    pub fn restorer(&self) -> &Restorer<'t> {
        &self.restorer
    }

    pub fn scan_root(&self, root: &Path, observer: &dyn BatchObserver) -> RootReport {
        tracing::info!("scanning {} for *{} files", root.display(), self.options.suffix);

        let discovery = discover(root, &self.options.suffix);
        let total = discovery.files.len();
        if total == 0 {
            tracing::info!("no candidate files under {}", root.display());
        } else {
            tracing::info!(
                "found {} candidate files in {} folders under {}",
                total,
                discovery.folders,
                root.display()
            );
        }
        observer.root_started(root, total);

        let tally = Tally::default();
        let start = Instant::now();
        let interval = self.options.progress_interval;

        let process = |path: &PathBuf| {
            if self.cancel.is_cancelled() {
                return;
            }
            let outcome = self.restorer.restore(path);
            let processed = tally.record(path, &outcome);
            observer.file_finished(path, outcome.as_ref());

            if interval > 0 && processed % interval == 0 && processed < total {
                let progress = Progress {
                    root: root.to_path_buf(),
                    processed,
                    total,
                    files_per_second: rate(processed, start.elapsed()),
                };
                tracing::info!(
                    "progress: {}/{} files ({:.1} files/sec)",
                    progress.processed,
                    progress.total,
                    progress.files_per_second
                );
                observer.progress(&progress);
            }
        };

        match &self.pool {
            Some(pool) => pool.install(|| discovery.files.par_iter().for_each(process)),
            None => discovery.files.iter().for_each(process),
        }

        let mut failures = tally.failures.into_inner();
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        let processed = tally.processed.into_inner();

        let report = RootReport {
            root: root.to_path_buf(),
            folders: discovery.folders,
            discovered: total,
            restored: tally.restored.into_inner(),
            failed: tally.failed.into_inner(),
            sources_removed: tally.sources_removed.into_inner(),
            bytes_restored: tally.bytes_restored.into_inner(),
            elapsed: start.elapsed(),
            failures,
            scan_error: discovery.scan_error,
            cancelled: processed < total,
        };

        if total > 0 {
            tracing::info!(
                "{} completed: {}/{} files restored in {:.2}s",
                root.display(),
                report.restored,
                report.discovered,
                report.elapsed.as_secs_f64()
            );
        }
        if report.cancelled {
            tracing::warn!(
                "{}: cancelled with {} files not attempted",
                root.display(),
                report.skipped()
            );
        }
        observer.root_finished(&report);

        report
    }

    /// Scans roots in the given order. Once cancelled, no further root is
    /// started.
    pub fn run_all(&self, roots: &[PathBuf], observer: &dyn BatchObserver) -> BatchReport {
        let mut reports = Vec::with_capacity(roots.len());
        for root in roots {
            if self.cancel.is_cancelled() {
                tracing::warn!("cancelled before {}", root.display());
                break;
            }
            reports.push(self.scan_root(root, observer));
        }

        let mut report = BatchReport::from_roots(reports);
        report.cancelled |= self.cancel.is_cancelled() && report.roots.len() < roots.len();
        report
    }
}

/// Restores every candidate under `roots` with the deployed table and default
/// options.
pub fn restore_all(roots: &[PathBuf]) -> BatchReport {
    BatchDriver::new(AlphabetTable::deployed(), RestoreOptions::default()).run_all(roots, &())
}
