//! Restoration of a single disguised file.
//!
//! Read, parse, substitute back, base64-decode, write next to the source,
//! then remove the source. Nothing on disk changes until the destination is
//! written, and the source is only removed once that write (and the optional
//! read-back check) succeeded.

use crate::alphabet::AlphabetTable;
use crate::container::Container;
use crate::error::RestoreError;
use crate::options::{NamePolicy, RestoreOptions};
use crate::{payload, substitution};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Outcome of a successful restoration
#[derive(Debug)]
pub struct Restored {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub original_name: String,
    pub type_tag: String,
    pub bytes_written: u64,
    /// Hex SHA-256 of the restored content
    pub sha256: String,
    /// Set when the content was restored but the source could not be removed.
    pub cleanup: Option<RestoreError>,
}

impl Restored {
    pub fn source_removed(&self) -> bool {
        self.cleanup.is_none()
    }
}

pub struct Restorer<'t> {
    table: &'t AlphabetTable,
    name_policy: NamePolicy,
    verify: bool,
}

impl<'t> Restorer<'t> {
    pub fn new(table: &'t AlphabetTable, options: &RestoreOptions) -> Self {
        Self {
            table,
            name_policy: options.name_policy,
            verify: options.verify,
        }
    }

    pub fn table(&self) -> &'t AlphabetTable {
        self.table
    }

    pub fn restore(&self, path: &Path) -> Result<Restored, RestoreError> {
        let raw = fs::read_to_string(path).map_err(|source| RestoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let container = Container::parse(&raw);
        if !container.has_sentinel {
            tracing::debug!("{}: no DATA: line, decoding whole file", path.display());
        }

        let base64_text = substitution::decode(&container.payload, self.table.decode_map());
        let bytes = payload::decode(&base64_text).map_err(|source| RestoreError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let destination = self.destination(path, &container.original_name)?;
        let digest = Sha256::digest(&bytes);

        write_file(&destination, &bytes).map_err(|source| RestoreError::Write {
            path: destination.clone(),
            source,
        })?;

        if self.verify {
            verify_written(&destination, &digest)?;
        }

        let cleanup = match fs::remove_file(path) {
            Ok(()) => None,
            Err(source) => {
                tracing::warn!(
                    "restored {} but could not remove {}: {}",
                    destination.display(),
                    path.display(),
                    source
                );
                Some(RestoreError::Delete {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        tracing::debug!(
            "restored {} -> {} ({} bytes)",
            path.display(),
            destination.display(),
            bytes.len()
        );

        Ok(Restored {
            source: path.to_path_buf(),
            destination,
            original_name: container.original_name,
            type_tag: container.type_tag,
            bytes_written: bytes.len() as u64,
            sha256: hex::encode(digest),
            cleanup,
        })
    }

    fn destination(&self, source: &Path, name: &str) -> Result<PathBuf, RestoreError> {
        let folder = source.parent().unwrap_or(Path::new(""));
        let destination = folder.join(name);

        // Writing over the source would delete the only restored copy.
        let unsafe_name = destination == source
            || (self.name_policy == NamePolicy::Strict && !is_plain_file_name(name));
        if unsafe_name {
            return Err(RestoreError::UnsafeName {
                path: source.to_path_buf(),
                name: name.to_string(),
            });
        }
        Ok(destination)
    }
}

/// True for a single normal path component without separators.
pub fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Re-reads `destination` and compares it against the SHA-256 of the bytes
/// that were meant to be written.
fn verify_written(destination: &Path, digest: &[u8]) -> Result<(), RestoreError> {
    let written = fs::read(destination).map_err(|source| RestoreError::Write {
        path: destination.to_path_buf(),
        source,
    })?;
    if Sha256::digest(&written).as_slice() != digest {
        return Err(RestoreError::Verify {
            path: destination.to_path_buf(),
        });
    }
    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut out = File::create(path)?;
    out.write_all(data)?;
    out.sync_all()
}
