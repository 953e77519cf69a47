//! Sidecar-to-video matching by filename convention: a sidecar belongs to
//! the video sharing its basename. The sidecar's own directory is checked
//! first; only then is the wider candidate pool searched, so two videos with
//! the same basename in different directories resolve to the local one. When
//! no local file exists, the first pool hit in traversal order wins — a
//! documented heuristic limitation, not resolved further.

use std::path::{Path, PathBuf};

use crate::walk;

/// Find the video file a sidecar describes. `candidates` is the wider pool
/// (catalogued paths plus freshly walked video roots); the sidecar's own
/// directory takes precedence over it.
pub fn find_video_for_nfo(nfo_path: &Path, candidates: &[PathBuf]) -> Option<PathBuf> {
    let base = lowercase_stem(nfo_path)?;

    if let Some(dir) = nfo_path.parent() {
        if let Some(local) = find_video_in_dir(dir, &base) {
            return Some(local);
        }
    }

    candidates
        .iter()
        .find(|candidate| lowercase_stem(candidate).as_deref() == Some(base.as_str()))
        .cloned()
}

fn find_video_in_dir(dir: &Path, base: &str) -> Option<PathBuf> {
    let read_dir = std::fs::read_dir(dir).ok()?;
    let mut entries: Vec<_> = read_dir.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    entries
        .into_iter()
        .map(|e| e.path())
        .filter(|p| p.is_file() && walk::is_video_file(p))
        .find(|p| lowercase_stem(p).as_deref() == Some(base))
}

fn lowercase_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
}
