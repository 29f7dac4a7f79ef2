//! Storage roots to scan. Every function here returns an empty list rather
//! than an error when the platform cannot be queried.

use std::path::{Path, PathBuf};

pub fn default_protected() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    return vec![PathBuf::from("C:\\")];

    #[cfg(not(target_os = "windows"))]
    return ["/", "/boot", "/home"].iter().map(PathBuf::from).collect();
}

pub fn list_roots(protected: &[PathBuf]) -> Vec<PathBuf> {
    #[cfg(target_os = "linux")]
    return list_linux_roots(protected);

    #[cfg(target_os = "windows")]
    return list_windows_roots(protected);

    #[cfg(target_os = "macos")]
    return list_macos_roots(protected);

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        let _ = protected;
        Vec::new()
    }
}

fn is_protected(path: &Path, protected: &[PathBuf]) -> bool {
    protected.iter().any(|p| {
        if cfg!(windows) {
            p.to_string_lossy()
                .eq_ignore_ascii_case(&path.to_string_lossy())
        } else {
            p == path
        }
    })
}

fn is_virtual_filesystem(fstype: &str) -> bool {
    matches!(
        fstype,
        "proc"
            | "sysfs"
            | "devtmpfs"
            | "devpts"
            | "tmpfs"
            | "ramfs"
            | "cgroup"
            | "cgroup2"
            | "securityfs"
            | "pstore"
            | "efivarfs"
            | "bpf"
            | "debugfs"
            | "tracefs"
            | "configfs"
            | "fusectl"
            | "mqueue"
            | "hugetlbfs"
            | "autofs"
            | "binfmt_misc"
            | "rpc_pipefs"
            | "nsfs"
            | "squashfs"
            | "overlay"
    ) || fstype.starts_with("fuse.")
}

fn is_optical_filesystem(fstype: &str) -> bool {
    matches!(fstype, "iso9660" | "udf")
}

/// Mount tables escape blanks in paths as three-digit octal (`\040`).
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Mount points from a `/proc/self/mounts` style table, in table order,
/// without pseudo filesystems, optical media, protected roots or repeats.
pub fn parse_mount_table(table: &str, protected: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();

    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let (Some(device), Some(mount_point), Some(fstype)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        if device == "none" || is_virtual_filesystem(fstype) || is_optical_filesystem(fstype) {
            continue;
        }

        let path = PathBuf::from(unescape_mount_field(mount_point));
        if is_protected(&path, protected) || roots.contains(&path) {
            continue;
        }
        roots.push(path);
    }

    roots
}

#[cfg(target_os = "linux")]
fn list_linux_roots(protected: &[PathBuf]) -> Vec<PathBuf> {
    match std::fs::read_to_string("/proc/self/mounts") {
        Ok(table) => parse_mount_table(&table, protected),
        Err(e) => {
            tracing::warn!("cannot read mount table: {}", e);
            Vec::new()
        }
    }
}

#[cfg(target_os = "macos")]
fn list_macos_roots(protected: &[PathBuf]) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir("/Volumes") else {
        return Vec::new();
    };

    let mut roots = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        // The boot volume shows up here as a link back to "/".
        let resolved = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if is_protected(&path, protected) || is_protected(&resolved, protected) {
            continue;
        }
        roots.push(path);
    }
    roots.sort();
    roots
}

#[cfg(target_os = "windows")]
fn list_windows_roots(protected: &[PathBuf]) -> Vec<PathBuf> {
    use windows_sys::Win32::Storage::FileSystem::{GetDriveTypeW, GetLogicalDrives};

    const DRIVE_NO_ROOT_DIR: u32 = 1;
    const DRIVE_CDROM: u32 = 5;

    // SAFETY: takes no arguments and only returns a bitmask.
    let mask = unsafe { GetLogicalDrives() };
    if mask == 0 {
        return fallback_windows_roots(protected);
    }

    let mut roots = Vec::new();
    for (bit, letter) in (b'A'..=b'Z').enumerate() {
        if mask & (1 << bit) == 0 {
            continue;
        }
        let root = format!("{}:\\", letter as char);
        let wide: Vec<u16> = root.encode_utf16().chain(std::iter::once(0)).collect();
        // SAFETY: `wide` is a NUL-terminated UTF-16 string that outlives the call.
        let drive_type = unsafe { GetDriveTypeW(wide.as_ptr()) };
        if drive_type == DRIVE_NO_ROOT_DIR || drive_type == DRIVE_CDROM {
            continue;
        }
        let path = PathBuf::from(root);
        if !is_protected(&path, protected) {
            roots.push(path);
        }
    }
    roots
}

#[cfg(target_os = "windows")]
fn fallback_windows_roots(protected: &[PathBuf]) -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|path| path.exists() && !is_protected(path, protected))
        .collect()
}
