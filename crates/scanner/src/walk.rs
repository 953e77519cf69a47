use std::path::{Path, PathBuf};
use tracing::debug;

/// Video container extensions recognized during discovery and matching.
pub static VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "wmv", "mov", "ts", "flv", "m4v", "rmvb", "rm", "mpg", "mpeg", "webm",
    "iso",
];

/// Sidecar extension.
pub static NFO_EXTENSIONS: &[&str] = &["nfo"];

/// Does the path's final component carry one of the extensions (case-insensitive)?
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| {
            let lower = ext.to_string_lossy().to_lowercase();
            extensions.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Walk a set of root directories depth-first and collect files matching the
/// extension set. Unreadable directories are skipped, not fatal; per-directory
/// entries are visited in name order so an unchanged tree enumerates the same
/// way every time.
pub fn scan_files(roots: &[PathBuf], extensions: &[&str]) -> Vec<PathBuf> {
    let mut results = Vec::new();
    for root in roots {
        walk_recursive(root, extensions, &mut results);
    }
    results
}

pub fn scan_video_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    scan_files(roots, VIDEO_EXTENSIONS)
}

pub fn scan_nfo_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    scan_files(roots, NFO_EXTENSIONS)
}

fn walk_recursive(dir: &Path, extensions: &[&str], results: &mut Vec<PathBuf>) {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "cannot read directory, skipping");
            return;
        }
    };

    let mut entries: Vec<_> = read_dir.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };
        if file_type.is_dir() {
            walk_recursive(&path, extensions, results);
        } else if file_type.is_file() && has_extension(&path, extensions) {
            results.push(path);
        }
    }
}

/// Read-permission probe used by pre-flight checks, so a run can fail fast
/// with a clear error instead of discovering inaccessibility mid-scan.
pub fn is_dir_accessible(path: &Path) -> bool {
    std::fs::read_dir(path).is_ok()
}
