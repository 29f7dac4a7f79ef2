use crate::payload::PayloadError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while restoring a single disguised file
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("payload of {path} is not valid base64: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: PayloadError,
    },

    #[error("refusing unsafe original name {name:?} in {path}")]
    UnsafeName { path: PathBuf, name: String },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read-back of {path} does not match the decoded content")]
    Verify { path: PathBuf },

    /// Only reported through [`crate::restore::Restored::cleanup`]; the
    /// restored file itself is intact.
    #[error("restored, but cannot remove {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RestoreError {
    /// Short stable label used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            RestoreError::Read { .. } => "read",
            RestoreError::Decode { .. } => "decode",
            RestoreError::UnsafeName { .. } => "unsafe-name",
            RestoreError::Write { .. } => "write",
            RestoreError::Verify { .. } => "verify",
            RestoreError::Delete { .. } => "delete",
        }
    }
}
