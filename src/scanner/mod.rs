//! Scan orchestrator.
//!
//! Walks the source volume in deterministic order, dispatches each
//! discovered file through classification, metadata extraction, and asset
//! generation, and accumulates fully-populated records plus run counters.
//! Per-file failures are isolated: only systemic errors (missing tools,
//! unwritable output, cancellation) abort the run.

pub mod assets;
pub mod extract;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use mediadex_av::{FrameSource, MediaProber};
use mediadex_core::media::{portable_relative_path, record_id};
use mediadex_core::{DriveLink, Error, MediaKind, MediaRecord, ScanConfig, ScanSummary};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use walkdir::WalkDir;

use assets::AssetGenerator;
use extract::Extraction;

/// System folders never descended into during traversal.
const SKIP_DIRS: &[&str] = &[
    ".Trash",
    ".Spotlight-V100",
    ".fseventsd",
    ".DocumentRevisions-V100",
    ".TemporaryItems",
    "System Volume Information",
    "$RECYCLE.BIN",
];

/// Result of a full scan run.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Fully-populated records, in the order workers finished. The index
    /// writer re-sorts them for deterministic output.
    pub records: Vec<MediaRecord>,
    pub summary: ScanSummary,
}

/// One classified file awaiting processing.
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    rel: PathBuf,
    kind: MediaKind,
}

/// Outcome of processing a single candidate.
enum FileOutcome {
    Catalogued {
        record: Box<MediaRecord>,
        degraded: bool,
    },
    Skipped,
    Cancelled,
}

/// Scanner for discovering and cataloguing media files.
pub struct Scanner {
    config: ScanConfig,
    prober: Arc<dyn MediaProber>,
    generator: AssetGenerator,
    cancel: CancellationToken,
}

impl Scanner {
    /// Create a new scanner with its external collaborators.
    pub fn new(
        config: ScanConfig,
        prober: Arc<dyn MediaProber>,
        frames: Arc<dyn FrameSource>,
        cancel: CancellationToken,
    ) -> Self {
        let generator = AssetGenerator::new(
            config.thumbnails_dir(),
            config.thumbnail_width,
            config.video_frame_count,
            frames,
        );
        Self {
            config,
            prober,
            generator,
            cancel,
        }
    }

    /// Scan the configured volume to completion.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the configuration is unusable.
    /// - [`Error::Cancelled`] if the run was interrupted; no index is
    ///   written and previously generated assets are left intact.
    pub async fn scan(&self) -> mediadex_core::Result<ScanOutcome> {
        if !self.config.source_volume.is_dir() {
            return Err(Error::Validation(format!(
                "source volume is not a directory: {}",
                self.config.source_volume.display()
            )));
        }
        if self.config.video_frame_count < 1 {
            return Err(Error::Validation(
                "video_frame_count must be at least 1".into(),
            ));
        }
        if self.config.thumbnail_width < 1 {
            return Err(Error::Validation("thumbnail_width must be at least 1".into()));
        }

        std::fs::create_dir_all(self.config.thumbnails_dir())?;

        info!("Starting scan of {}", self.config.source_volume.display());
        let (candidates, mut summary) = self.discover()?;
        info!(
            "Discovered {} media files ({} seen, {} unsupported)",
            candidates.len(),
            summary.files_seen,
            summary.unsupported
        );

        let outcomes: Vec<FileOutcome> = futures::stream::iter(
            candidates
                .into_iter()
                .map(|candidate| self.process_file(candidate)),
        )
        .buffer_unordered(self.config.effective_workers())
        .collect()
        .await;

        if self.cancel.is_cancelled() {
            warn!("Scan cancelled; leaving existing index untouched");
            return Err(Error::Cancelled);
        }

        let mut records = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Catalogued { record, degraded } => {
                    summary.catalogued += 1;
                    if degraded {
                        summary.degraded += 1;
                    }
                    records.push(*record);
                }
                FileOutcome::Skipped => summary.skipped += 1,
                // Unreachable given the cancellation check above, but a
                // dispatched-then-cancelled task must not count as skipped.
                FileOutcome::Cancelled => {}
            }
        }

        Ok(ScanOutcome { records, summary })
    }

    /// Enumerate all candidate files under the volume root in lexicographic
    /// path order, classifying as we go.
    fn discover(&self) -> mediadex_core::Result<(Vec<Candidate>, ScanSummary)> {
        let root = &self.config.source_volume;
        let mut candidates = Vec::new();
        let mut summary = ScanSummary::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_name(e.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read directory entry: {e}");
                    summary.skipped += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            summary.files_seen += 1;

            let path = entry.path().to_path_buf();
            let Some(kind) = MediaKind::classify(&path) else {
                summary.unsupported += 1;
                continue;
            };

            let rel = path
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .map_err(|_| Error::Internal(format!("path escaped root: {}", path.display())))?;

            candidates.push(Candidate { path, rel, kind });
        }

        Ok((candidates, summary))
    }

    /// Process one candidate: extract metadata, generate assets, assemble
    /// the record. Never returns an error; failures degrade or skip.
    async fn process_file(&self, candidate: Candidate) -> FileOutcome {
        if self.cancel.is_cancelled() {
            return FileOutcome::Cancelled;
        }

        let Candidate { path, rel, kind } = candidate;
        info!("Processing {kind}: {}", rel.display());

        // An unreadable source is the one case that excludes a file.
        let fs_meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Skipping unreadable file {}: {e}", rel.display());
                return FileOutcome::Skipped;
            }
        };

        let (metadata, extraction_degraded) =
            match extract::extract_metadata(kind, &path, &fs_meta, self.prober.as_ref()).await {
                Extraction::Complete(metadata) => (metadata, false),
                Extraction::Degraded(metadata) => (metadata, true),
                Extraction::Corrupt(reason) => {
                    warn!("Skipping corrupt file {}: {reason}", rel.display());
                    return FileOutcome::Skipped;
                }
            };

        let id = record_id(&rel);
        let generated = self
            .generator
            .generate(kind, &path, &rel, &id, metadata.duration)
            .await;

        let record = MediaRecord {
            id,
            kind,
            relative_path: portable_relative_path(&rel),
            file_name: rel
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            metadata,
            thumbnails: generated.thumbnails,
            // Populated by the index writer from the previous document;
            // never fabricated here.
            google_drive: DriveLink::default(),
        };

        FileOutcome::Catalogued {
            record: Box::new(record),
            degraded: extraction_degraded || generated.degraded,
        }
    }
}

/// Whether a directory or file name is excluded from traversal: hidden
/// entries and well-known system folders.
fn is_skipped_name(name: &std::ffi::OsStr) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    if name.starts_with('.') && name.len() > 1 {
        return true;
    }
    SKIP_DIRS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn skips_hidden_and_system_names() {
        assert!(is_skipped_name(OsStr::new(".Trash")));
        assert!(is_skipped_name(OsStr::new(".hidden")));
        assert!(is_skipped_name(OsStr::new("System Volume Information")));
        assert!(is_skipped_name(OsStr::new("$RECYCLE.BIN")));
    }

    #[test]
    fn keeps_ordinary_names() {
        assert!(!is_skipped_name(OsStr::new("Photos")));
        assert!(!is_skipped_name(OsStr::new("a.jpg")));
        // A lone dot is the current directory, not a hidden entry.
        assert!(!is_skipped_name(OsStr::new(".")));
    }
}
