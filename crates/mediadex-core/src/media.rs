//! Catalogue data model: media classification, per-file records, and the
//! index document consumed by the presentation layer.
//!
//! Records serialize with camelCase field names; the schema is the interchange
//! contract with the browser and must stay stable across releases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Supported image file extensions.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "heic", "heif",
];

/// Supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "m4v", "wmv", "flv", "webm", "mpeg", "mpg", "3gp",
];

/// Supported audio file extensions.
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "m4a", "aac", "ogg", "wma", "opus",
];

/// The closed set of media kinds the pipeline catalogues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Classify a path by its extension, case-insensitively.
    ///
    /// Returns `None` for unsupported files. Classification never looks at
    /// file content.
    pub fn classify(path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    /// Stable lowercase tag matching the serialized `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Get the list of supported image extensions.
#[must_use]
pub fn image_extensions() -> &'static [&'static str] {
    IMAGE_EXTENSIONS
}

/// Get the list of supported video extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Get the list of supported audio extensions.
#[must_use]
pub fn audio_extensions() -> &'static [&'static str] {
    AUDIO_EXTENSIONS
}

// ---------------------------------------------------------------------------
// Identifiers and paths
// ---------------------------------------------------------------------------

/// Normalize a relative path to the forward-slash form stored in the
/// document, regardless of the scanning platform's separator.
pub fn portable_relative_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Derive the stable record identifier for a relative path.
///
/// First 16 hex characters of the SHA-256 of the portable path string, so
/// unchanged files keep their id across re-runs and distinct paths do not
/// collide in practice.
pub fn record_id(rel: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(portable_relative_path(rel).as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

// ---------------------------------------------------------------------------
// Per-file record
// ---------------------------------------------------------------------------

/// Pixel dimensions of an image or video stream. Both fields zero means
/// "not recovered", never a real zero-sized asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether real dimensions were recovered.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Extracted metadata for one catalogued file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// Best-known creation time, or `None` if unrecoverable.
    pub creation_date: Option<DateTime<Utc>>,
    /// Size of the source file in bytes; always present.
    pub file_size: u64,
    /// Pixel dimensions; zeros when inapplicable or not recovered.
    pub resolution: Resolution,
    /// Duration in seconds for video/audio; `None` for images or when the
    /// probe could not recover it.
    pub duration: Option<f64>,
    /// Lowercased source extension, e.g. "jpg", "mp4".
    pub format: String,
}

/// Paths of the derived preview assets, relative to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnails {
    /// Primary preview image, or `None` if generation failed or was skipped.
    pub main: Option<String>,
    /// Evenly-spaced video preview frames, timestamp-ascending. Empty for
    /// non-video records and for videos whose frame generation was skipped.
    #[serde(default)]
    pub frames: Vec<String>,
}

/// Optional cross-reference to a cloud copy, populated by a separate
/// enrichment step. The scanner preserves it across re-runs and never
/// fabricates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveLink {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub file_id: String,
}

impl DriveLink {
    /// Whether the enrichment step has populated anything worth carrying.
    pub fn is_populated(&self) -> bool {
        !self.url.is_empty() || !self.file_id.is_empty()
    }
}

/// One entry per discovered, successfully classified file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Stable identifier derived from the relative path; unique per document.
    pub id: String,
    /// Media kind tag.
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Path relative to the scanned volume root, forward-slash separated.
    /// This is the interchange key used for search matching.
    pub relative_path: String,
    /// Base name of the source file.
    pub file_name: String,
    pub metadata: MediaMetadata,
    pub thumbnails: Thumbnails,
    pub google_drive: DriveLink,
}

// ---------------------------------------------------------------------------
// Index document
// ---------------------------------------------------------------------------

/// Per-kind record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStats {
    pub images: u64,
    pub videos: u64,
    pub audio: u64,
}

impl MediaStats {
    /// Count one record of the given kind.
    pub fn add(&mut self, kind: MediaKind) {
        match kind {
            MediaKind::Image => self.images += 1,
            MediaKind::Video => self.videos += 1,
            MediaKind::Audio => self.audio += 1,
        }
    }

    /// Tally counts over a set of records.
    pub fn from_records(records: &[MediaRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.add(record.kind);
        }
        stats
    }

    pub fn total(&self) -> u64 {
        self.images + self.videos + self.audio
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    /// When this document was generated.
    pub generated_at: DateTime<Utc>,
    /// Identifier of the scanned volume.
    pub source_volume: String,
    /// Number of catalogued files; equals `files.len()`.
    pub total_files: u64,
    pub stats: MediaStats,
}

/// The single persisted artifact consumed by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDocument {
    pub metadata: IndexMetadata,
    pub files: Vec<MediaRecord>,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Aggregate counts for one scan run, reported to the user at completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Regular files encountered during traversal.
    pub files_seen: u64,
    /// Files excluded by classification; not an error.
    pub unsupported: u64,
    /// Records that made it into the document.
    pub catalogued: u64,
    /// Files excluded as unreadable or corrupt.
    pub skipped: u64,
    /// Records included with degraded fields (failed probe, missing
    /// thumbnails).
    pub degraded: u64,
}
