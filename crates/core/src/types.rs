use serde::{Deserialize, Serialize};

/// Role of a configured source directory, stored in `directories.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryKind {
    Nfo,
    Video,
}

impl DirectoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nfo => "nfo",
            Self::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nfo" => Some(Self::Nfo),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase tag carried by every progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Scanning,
    Parsing,
    Saving,
    Done,
    Cancelled,
    Error,
}

impl ScanPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Parsing => "parsing",
            Self::Saving => "saving",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running counters for one scan or import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Immutable progress snapshot broadcast to observers during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub current: usize,
    pub total: usize,
    pub current_file: String,
    pub stats: ScanStats,
}

/// A video that already carries imported metadata, now facing a second
/// candidate sidecar. Held in memory only; resolved by a follow-up forced
/// import or discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConflict {
    pub movie_id: i64,
    pub title: String,
    pub file_path: String,
    pub nfo_path: String,
}

/// One `<actor>` entry from a sidecar, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfoActor {
    pub name: String,
    pub role: String,
    pub thumb: String,
    pub sort_order: i64,
}

/// External identifier from a `<uniqueid type="…">` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueId {
    pub scheme: String,
    pub value: String,
}

/// Normalized record produced by parsing one NFO sidecar file.
///
/// `nfo_path` is always present; every other field may be empty or absent —
/// a sidecar missing optional fields still parses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedNfo {
    pub title: String,
    pub original_title: String,
    pub sort_title: String,
    pub year: Option<i64>,
    pub plot: String,
    pub runtime: Option<i64>,
    pub studio: String,
    pub director: String,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub actors: Vec<NfoActor>,
    pub rating: Option<f64>,
    pub unique_ids: Vec<UniqueId>,
    pub poster_path: String,
    pub fanart_path: String,
    pub nfo_path: String,
}

/// Outcome of one NFO import pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub conflicts: Vec<ScanConflict>,
}
