//! Per-type metadata extraction.
//!
//! Extraction is best-effort: a failed field degrades to null/zero rather
//! than aborting the file. The only unrecoverable case is a source file
//! whose content cannot be read or decoded at all, which the orchestrator
//! excludes from the document.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use exif::{In, Tag};
use mediadex_av::MediaProber;
use mediadex_core::{MediaKind, MediaMetadata, Resolution};
use tracing::{debug, warn};

/// Result of extracting metadata for one file.
pub enum Extraction {
    /// Every applicable field was recovered.
    Complete(MediaMetadata),
    /// The file is usable but one or more fields could not be recovered.
    Degraded(MediaMetadata),
    /// The source content itself is unreadable or undecodable; the file is
    /// excluded from the document.
    Corrupt(String),
}

/// Extract metadata for a classified file.
///
/// File size and the modification-time fallback come from the already
/// fetched `fs_meta`; video/audio fields come from the probing collaborator.
pub async fn extract_metadata(
    kind: MediaKind,
    path: &Path,
    fs_meta: &std::fs::Metadata,
    prober: &dyn MediaProber,
) -> Extraction {
    let file_size = fs_meta.len();
    let modified = fs_meta.modified().ok().map(DateTime::<Utc>::from);
    let format = extension_tag(path);

    match kind {
        MediaKind::Image => extract_image(path.to_path_buf(), file_size, modified, format).await,
        MediaKind::Video | MediaKind::Audio => {
            extract_av(kind, path, file_size, modified, format, prober).await
        }
    }
}

/// Lowercased source extension recorded as the `format` field.
fn extension_tag(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

async fn extract_image(
    path: PathBuf,
    file_size: u64,
    modified: Option<DateTime<Utc>>,
    format: String,
) -> Extraction {
    // Header parsing and EXIF reads are synchronous file I/O.
    let handle = tokio::task::spawn_blocking(move || {
        let dimensions = image::image_dimensions(&path);
        let exif_date = read_exif_date(&path);
        (dimensions, exif_date)
    });

    let (dimensions, exif_date) = match handle.await {
        Ok(result) => result,
        Err(e) => return Extraction::Corrupt(format!("image task failed: {e}")),
    };

    let (width, height) = match dimensions {
        Ok(dims) => dims,
        // No dimensions means we cannot decode this file at all; treat it
        // as corrupt rather than cataloguing an unrenderable entry.
        Err(e) => return Extraction::Corrupt(format!("undecodable image: {e}")),
    };

    let creation_date = exif_date.or(modified);

    Extraction::Complete(MediaMetadata {
        creation_date,
        file_size,
        resolution: Resolution::new(width, height),
        duration: None,
        format,
    })
}

/// Read the EXIF `DateTimeOriginal` tag, if present and well-formed.
fn read_exif_date(path: &Path) -> Option<DateTime<Utc>> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;

    let exif::Value::Ascii(groups) = &field.value else {
        return None;
    };
    let raw = groups.first()?;
    let dt = exif::DateTime::from_ascii(raw).ok()?;

    let date = NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?;
    let time = date.and_hms_opt(
        u32::from(dt.hour),
        u32::from(dt.minute),
        u32::from(dt.second),
    )?;
    Some(time.and_utc())
}

// ---------------------------------------------------------------------------
// Video / audio
// ---------------------------------------------------------------------------

async fn extract_av(
    kind: MediaKind,
    path: &Path,
    file_size: u64,
    modified: Option<DateTime<Utc>>,
    format: String,
    prober: &dyn MediaProber,
) -> Extraction {
    match prober.probe(path).await {
        Ok(probe) => {
            debug!(
                "{} probe for {}: duration={:?} {}x{}",
                prober.name(),
                path.display(),
                probe.duration,
                probe.width,
                probe.height
            );

            // Audio containers sometimes report embedded cover art as a
            // video stream; resolution only applies to real video.
            let resolution = match kind {
                MediaKind::Video => Resolution::new(probe.width, probe.height),
                _ => Resolution::default(),
            };

            let metadata = MediaMetadata {
                creation_date: probe.creation_time.or(modified),
                file_size,
                resolution,
                duration: probe.duration,
                format,
            };

            // A probe that ran but recovered no duration (and, for video,
            // no dimensions) is a partial result.
            let partial = metadata.duration.is_none()
                || (kind == MediaKind::Video && !metadata.resolution.is_known());
            if partial {
                Extraction::Degraded(metadata)
            } else {
                Extraction::Complete(metadata)
            }
        }
        Err(e) => {
            warn!("Probe failed for {}: {e}", path.display());
            Extraction::Degraded(MediaMetadata {
                creation_date: modified,
                file_size,
                resolution: Resolution::default(),
                duration: None,
                format,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadex_av::MediaProbe;

    struct CannedProber(mediadex_core::Result<MediaProbe>);

    #[async_trait::async_trait]
    impl MediaProber for CannedProber {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn probe(&self, _path: &Path) -> mediadex_core::Result<MediaProbe> {
            match &self.0 {
                Ok(probe) => Ok(probe.clone()),
                Err(_) => Err(mediadex_core::Error::tool("canned", "probe refused")),
            }
        }
    }

    fn write_test_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 40, 200]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn extension_tag_lowercases() {
        assert_eq!(extension_tag(Path::new("clip.MP4")), "mp4");
        assert_eq!(extension_tag(Path::new("noext")), "");
    }

    #[tokio::test]
    async fn image_dimensions_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_jpeg(dir.path(), "a.jpg", 64, 32);
        let fs_meta = std::fs::metadata(&path).unwrap();
        let prober = CannedProber(Ok(MediaProbe::default()));

        let extraction =
            extract_metadata(MediaKind::Image, &path, &fs_meta, &prober).await;
        let Extraction::Complete(meta) = extraction else {
            panic!("expected complete extraction");
        };
        assert_eq!(meta.resolution, Resolution::new(64, 32));
        assert!(meta.duration.is_none());
        // No EXIF in a synthetic JPEG; mtime fallback applies.
        assert!(meta.creation_date.is_some());
        assert_eq!(meta.format, "jpg");
    }

    #[tokio::test]
    async fn garbage_image_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let fs_meta = std::fs::metadata(&path).unwrap();
        let prober = CannedProber(Ok(MediaProbe::default()));

        let extraction =
            extract_metadata(MediaKind::Image, &path, &fs_meta, &prober).await;
        assert!(matches!(extraction, Extraction::Corrupt(_)));
    }

    #[tokio::test]
    async fn video_probe_populates_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"opaque container bytes").unwrap();
        let fs_meta = std::fs::metadata(&path).unwrap();
        let prober = CannedProber(Ok(MediaProbe {
            duration: Some(20.0),
            width: 1280,
            height: 720,
            creation_time: Some("2023-05-01T00:00:00Z".parse().unwrap()),
        }));

        let extraction =
            extract_metadata(MediaKind::Video, &path, &fs_meta, &prober).await;
        let Extraction::Complete(meta) = extraction else {
            panic!("expected complete extraction");
        };
        assert_eq!(meta.duration, Some(20.0));
        assert_eq!(meta.resolution, Resolution::new(1280, 720));
        assert_eq!(
            meta.creation_date.unwrap().to_rfc3339(),
            "2023-05-01T00:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn failed_probe_degrades_but_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"opaque container bytes").unwrap();
        let fs_meta = std::fs::metadata(&path).unwrap();
        let prober = CannedProber(Err(mediadex_core::Error::tool("canned", "probe refused")));

        let extraction =
            extract_metadata(MediaKind::Video, &path, &fs_meta, &prober).await;
        let Extraction::Degraded(meta) = extraction else {
            panic!("expected degraded extraction");
        };
        assert!(meta.duration.is_none());
        assert!(!meta.resolution.is_known());
        assert_eq!(meta.file_size, fs_meta.len());
        // Creation date falls back to mtime even when probing fails.
        assert!(meta.creation_date.is_some());
    }

    #[tokio::test]
    async fn audio_ignores_cover_art_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"opaque audio bytes").unwrap();
        let fs_meta = std::fs::metadata(&path).unwrap();
        let prober = CannedProber(Ok(MediaProbe {
            duration: Some(180.0),
            width: 500, // embedded cover art
            height: 500,
            creation_time: None,
        }));

        let extraction =
            extract_metadata(MediaKind::Audio, &path, &fs_meta, &prober).await;
        let Extraction::Complete(meta) = extraction else {
            panic!("expected complete extraction");
        };
        assert!(!meta.resolution.is_known());
        assert_eq!(meta.duration, Some(180.0));
    }
}
