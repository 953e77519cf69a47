//! Scan manager: orchestrates discovery, parsing, matching, conflict
//! detection and the transactional apply for a whole run. One run may be
//! active at a time; progress is broadcast to subscribers as immutable
//! snapshots; cancellation is cooperative and polled once per item.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use cinelog_core::types::{
    DirectoryKind, ImportReport, ScanConflict, ScanPhase, ScanProgress, ScanStats,
};
use cinelog_db::repo;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{matcher, nfo, walk};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    AlreadyRunning,
    #[error("directories not accessible: {}", .0.join(", "))]
    InaccessibleDirectories(Vec<String>),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Owns the state of the ingestion pipeline: the single-run flag, the
/// cancellation flag, and the progress broadcast channel.
pub struct ScanManager {
    pool: SqlitePool,
    events: broadcast::Sender<ScanProgress>,
    running: AtomicBool,
    cancel: AtomicBool,
}

impl ScanManager {
    pub fn new(pool: SqlitePool) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            pool,
            events,
            running: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
        }
    }

    /// Register a progress observer. Delivery is best-effort; a receiver
    /// that lags simply misses older snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request cancellation of the active run. Idempotent; a no-op when
    /// nothing is running. The run stops at its next per-item poll.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn begin_run(&self) -> Result<RunGuard<'_>, ScanError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ScanError::AlreadyRunning);
        }
        self.cancel.store(false, Ordering::SeqCst);
        Ok(RunGuard { mgr: self })
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn emit(
        &self,
        phase: ScanPhase,
        current: usize,
        total: usize,
        current_file: &str,
        stats: ScanStats,
    ) {
        let _ = self.events.send(ScanProgress {
            phase,
            current,
            total,
            current_file: current_file.to_string(),
            stats,
        });
    }

    /// Walk the configured video directories and register every new video
    /// file as a bare catalog entry (title = file stem). Metadata arrives
    /// later via [`Self::import_nfo`].
    pub async fn scan_videos(&self) -> Result<ScanStats, ScanError> {
        let _guard = self.begin_run()?;

        let mut stats = ScanStats::default();
        let result = self.scan_videos_inner(&mut stats).await;
        if let Err(e) = &result {
            self.emit(ScanPhase::Error, 0, 0, &e.to_string(), stats);
        }
        result.map(|_| stats)
    }

    async fn scan_videos_inner(&self, stats: &mut ScanStats) -> Result<(), ScanError> {
        let video_dirs = repo::directories::list(&self.pool, Some(DirectoryKind::Video)).await?;
        check_accessible(video_dirs.iter().map(|d| d.path.as_str()))?;

        self.emit(ScanPhase::Scanning, 0, 0, "", *stats);

        let roots: Vec<PathBuf> = video_dirs.iter().map(|d| PathBuf::from(&d.path)).collect();
        let video_files = walk::scan_video_files(&roots);
        let existing = repo::movies::existing_video_paths(&self.pool).await?;

        let new_videos: Vec<String> = video_files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .filter(|p| !existing.contains(p))
            .collect();
        let total = new_videos.len();
        stats.skipped = video_files.len() - total;

        if total == 0 {
            self.emit(ScanPhase::Done, 0, 0, "", *stats);
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for (i, video_path) in new_videos.iter().enumerate() {
            if self.cancel_requested() {
                self.emit(ScanPhase::Cancelled, i, total, "", *stats);
                tx.commit().await?;
                info!(registered = stats.added, "video scan cancelled");
                return Ok(());
            }

            self.emit(ScanPhase::Saving, i + 1, total, video_path, *stats);

            match repo::movies::insert_from_video(&mut *tx, video_path).await {
                Ok(_) => stats.added += 1,
                Err(e) => {
                    warn!(path = %video_path, error = %e, "failed to register video");
                    stats.failed += 1;
                }
            }
        }
        tx.commit().await?;

        self.emit(ScanPhase::Done, total, total, "", *stats);
        info!(added = stats.added, skipped = stats.skipped, "video scan completed");
        Ok(())
    }

    /// Import sidecar metadata from the configured NFO directories.
    ///
    /// Without a force list, entries whose video already carries imported
    /// metadata become conflicts for the caller to resolve; a follow-up call
    /// naming their ids applies the override. NFO directories are single-use
    /// and are deregistered once a run ends with no unresolved conflicts.
    pub async fn import_nfo(&self, force_ids: Option<&[i64]>) -> Result<ImportReport, ScanError> {
        let _guard = self.begin_run()?;

        let mut report = ImportReport::default();
        let mut stats = ScanStats::default();
        let result = self
            .import_nfo_inner(force_ids, &mut report, &mut stats)
            .await;
        if let Err(e) = &result {
            self.emit(ScanPhase::Error, 0, 0, &e.to_string(), stats);
        }
        result.map(|_| report)
    }

    async fn import_nfo_inner(
        &self,
        force_ids: Option<&[i64]>,
        report: &mut ImportReport,
        stats: &mut ScanStats,
    ) -> Result<(), ScanError> {
        let force_set: Option<HashSet<i64>> =
            force_ids.map(|ids| ids.iter().copied().collect());

        let nfo_dirs = repo::directories::list(&self.pool, Some(DirectoryKind::Nfo)).await?;
        if nfo_dirs.is_empty() {
            return Ok(());
        }
        let video_dirs = repo::directories::list(&self.pool, Some(DirectoryKind::Video)).await?;

        check_accessible(
            nfo_dirs
                .iter()
                .chain(video_dirs.iter())
                .map(|d| d.path.as_str()),
        )?;

        self.emit(ScanPhase::Scanning, 0, 0, "", *stats);

        let nfo_roots: Vec<PathBuf> = nfo_dirs.iter().map(|d| PathBuf::from(&d.path)).collect();
        let nfo_paths = walk::scan_nfo_files(&nfo_roots);
        if nfo_paths.is_empty() {
            self.emit(ScanPhase::Done, 0, 0, "", *stats);
            return Ok(());
        }

        // Incremental discovery: sidecars already in the catalog are skipped,
        // not reprocessed.
        let known_nfo = repo::movies::existing_nfo_paths(&self.pool).await?;
        let new_sidecars: Vec<PathBuf> = nfo_paths
            .into_iter()
            .filter(|p| {
                let known = known_nfo.contains(p.to_string_lossy().as_ref());
                if known {
                    report.skipped += 1;
                    stats.skipped += 1;
                }
                !known
            })
            .collect();
        let total = new_sidecars.len();

        // Candidate videos: catalogued paths first, then a fresh walk of the
        // configured video roots.
        let mut seen = HashSet::new();
        let mut candidates: Vec<PathBuf> = Vec::new();
        for path in repo::movies::existing_video_paths(&self.pool).await? {
            let path = PathBuf::from(path);
            if seen.insert(path.clone()) {
                candidates.push(path);
            }
        }
        let video_roots: Vec<PathBuf> =
            video_dirs.iter().map(|d| PathBuf::from(&d.path)).collect();
        for path in walk::scan_video_files(&video_roots) {
            if seen.insert(path.clone()) {
                candidates.push(path);
            }
        }

        let mut import_state = repo::movies::nfo_import_state(&self.pool).await?;

        let mut tx = self.pool.begin().await?;
        for (i, nfo_path) in new_sidecars.iter().enumerate() {
            let label = nfo_path.to_string_lossy();
            self.emit(ScanPhase::Parsing, i + 1, total, &label, *stats);

            if self.cancel_requested() {
                self.emit(ScanPhase::Cancelled, i, total, "", *stats);
                tx.commit().await?;
                info!(applied = report.applied, "NFO import cancelled");
                return Ok(());
            }

            let parsed = match nfo::parse_nfo_file(nfo_path) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(path = %label, error = %e, "sidecar parse failed");
                    report.failed += 1;
                    stats.failed += 1;
                    continue;
                }
            };

            // Metadata with no corresponding video is not actionable
            let Some(video) = matcher::find_video_for_nfo(nfo_path, &candidates) else {
                report.skipped += 1;
                stats.skipped += 1;
                continue;
            };
            let video_key = video.to_string_lossy().to_string();

            match import_state.get(&video_key) {
                None => {
                    let movie_id = repo::movies::insert_from_video(&mut *tx, &video_key).await?;
                    repo::movies::apply_nfo(&mut *tx, movie_id, &parsed).await?;
                    import_state.insert(
                        video_key,
                        repo::movies::MovieImportState {
                            id: movie_id,
                            title: parsed.title.clone(),
                            nfo_imported: true,
                        },
                    );
                    report.applied += 1;
                    stats.added += 1;
                }
                Some(state) if state.nfo_imported => match &force_set {
                    None => {
                        report.conflicts.push(ScanConflict {
                            movie_id: state.id,
                            title: state.title.clone(),
                            file_path: video_key.clone(),
                            nfo_path: parsed.nfo_path.clone(),
                        });
                    }
                    Some(force) if force.contains(&state.id) => {
                        repo::movies::apply_nfo(&mut *tx, state.id, &parsed).await?;
                        report.applied += 1;
                        stats.updated += 1;
                    }
                    Some(_) => {
                        report.skipped += 1;
                        stats.skipped += 1;
                    }
                },
                Some(state) => {
                    let movie_id = state.id;
                    repo::movies::apply_nfo(&mut *tx, movie_id, &parsed).await?;
                    if let Some(state) = import_state.get_mut(&video_key) {
                        state.nfo_imported = true;
                    }
                    report.applied += 1;
                    stats.updated += 1;
                }
            }
        }
        tx.commit().await?;

        // NFO directories are single-use; retire them once every sidecar has
        // been resolved. Unresolved conflicts keep them registered so a
        // follow-up forced run can reach the same files.
        if report.conflicts.is_empty() {
            for dir in &nfo_dirs {
                repo::directories::remove(&self.pool, dir.id).await?;
            }
        }

        self.emit(ScanPhase::Done, total, total, "", *stats);
        info!(
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            conflicts = report.conflicts.len(),
            "NFO import completed"
        );
        Ok(())
    }
}

struct RunGuard<'a> {
    mgr: &'a ScanManager,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.mgr.running.store(false, Ordering::SeqCst);
        self.mgr.cancel.store(false, Ordering::SeqCst);
    }
}

fn check_accessible<'a>(paths: impl Iterator<Item = &'a str>) -> Result<(), ScanError> {
    let inaccessible: Vec<String> = paths
        .filter(|p| !walk::is_dir_accessible(std::path::Path::new(p)))
        .map(|p| p.to_string())
        .collect();
    if inaccessible.is_empty() {
        Ok(())
    } else {
        Err(ScanError::InaccessibleDirectories(inaccessible))
    }
}
