//! Restore options

/// Marker suffix of files produced by the disguising tool.
pub const DEFAULT_SUFFIX: &str = ".encrypted";

/// How many files pass between two progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// How the `ORIGINAL_NAME` header may be used as a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// Accept only a plain file name that stays inside the source folder and
    /// does not resolve to the source file itself.
    #[default]
    Strict,
    /// Join the header value onto the source folder as-is.
    Legacy,
}

/// Options for restoring files
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// File name suffix that marks a restoration candidate
    pub suffix: String,
    /// Destination name policy
    pub name_policy: NamePolicy,
    /// Re-read each written file and compare digests before deleting the source
    pub verify: bool,
    /// Worker threads per root (1 = sequential)
    pub workers: usize,
    /// Files between progress reports (0 disables them)
    pub progress_interval: usize,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            name_policy: NamePolicy::Strict,
            verify: true,
            workers: 1,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl RestoreOptions {
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn with_name_policy(mut self, policy: NamePolicy) -> Self {
        self.name_policy = policy;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Sets the worker count; zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }
}
