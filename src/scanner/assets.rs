//! Derived-asset generation: still thumbnails, video preview frames, and
//! audio waveform images.
//!
//! Output paths mirror the source's relative directory under the thumbnail
//! root, with the record id embedded in every file name so that distinct
//! sources never collide and re-runs reproduce identical paths. Any
//! generation failure yields an empty thumbnail set for that file and never
//! blocks other files.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::ImageFormat;
use mediadex_av::FrameSource;
use mediadex_core::config::THUMBNAILS_DIR_NAME;
use mediadex_core::{MediaKind, Thumbnails};
use tracing::{debug, warn};

/// Derived assets for one file, plus whether generation fell short.
#[derive(Debug, Default)]
pub struct GeneratedAssets {
    pub thumbnails: Thumbnails,
    pub degraded: bool,
}

/// Produces preview images under a deterministic output tree.
pub struct AssetGenerator {
    /// Absolute root of the thumbnail tree.
    thumbs_dir: PathBuf,
    /// Target width in pixels for every generated still.
    width: u32,
    /// Number of preview frames per video.
    frame_count: u32,
    frames: Arc<dyn FrameSource>,
}

impl AssetGenerator {
    pub fn new(
        thumbs_dir: PathBuf,
        width: u32,
        frame_count: u32,
        frames: Arc<dyn FrameSource>,
    ) -> Self {
        Self {
            thumbs_dir,
            width,
            frame_count,
            frames,
        }
    }

    /// Generate the derived assets for one classified file.
    ///
    /// Returns empty thumbnails (flagged degraded) instead of an error when
    /// generation fails; the record is still catalogued.
    pub async fn generate(
        &self,
        kind: MediaKind,
        source: &Path,
        rel: &Path,
        id: &str,
        duration: Option<f64>,
    ) -> GeneratedAssets {
        let result = match kind {
            MediaKind::Image => self.image_thumbnail(source, rel, id).await,
            MediaKind::Video => return self.video_frames(source, rel, id, duration).await,
            MediaKind::Audio => self.audio_waveform(source, rel, id).await,
        };

        match result {
            Ok(main) => GeneratedAssets {
                thumbnails: Thumbnails {
                    main: Some(main),
                    frames: Vec::new(),
                },
                degraded: false,
            },
            Err(e) => {
                warn!("Asset generation failed for {}: {e}", rel.display());
                GeneratedAssets {
                    thumbnails: Thumbnails::default(),
                    degraded: true,
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Per-kind generation
    // -----------------------------------------------------------------------

    async fn image_thumbnail(
        &self,
        source: &Path,
        rel: &Path,
        id: &str,
    ) -> mediadex_core::Result<String> {
        let file_name = asset_file_name(rel, id, "");
        let dest = self.asset_abs_path(rel, &file_name);
        let source = source.to_path_buf();
        let width = self.width;

        tokio::task::spawn_blocking(move || {
            let img = image::open(&source)
                .map_err(|e| mediadex_core::Error::asset(format!("decode failed: {e}")))?;
            write_thumbnail(img, width, &dest)
        })
        .await
        .map_err(|e| mediadex_core::Error::Internal(format!("thumbnail task failed: {e}")))??;

        Ok(asset_rel_path(rel, &file_name))
    }

    async fn video_frames(
        &self,
        source: &Path,
        rel: &Path,
        id: &str,
        duration: Option<f64>,
    ) -> GeneratedAssets {
        // Unknown or zero duration: frame generation is skipped entirely, a
        // recorded degradation rather than an error.
        let Some(duration) = duration.filter(|d| *d > 0.0) else {
            debug!("Skipping frames for {}: duration unknown", rel.display());
            return GeneratedAssets {
                thumbnails: Thumbnails::default(),
                degraded: true,
            };
        };

        let mut frame_paths = Vec::with_capacity(self.frame_count as usize);
        for (idx, at_secs) in frame_timestamps(duration, self.frame_count)
            .into_iter()
            .enumerate()
        {
            let file_name = asset_file_name(rel, id, &format!("_frame_{idx}"));
            match self.extract_one_frame(source, rel, at_secs, &file_name).await {
                Ok(()) => frame_paths.push(asset_rel_path(rel, &file_name)),
                Err(e) => {
                    // The document promises all-or-nothing frames; a single
                    // miss voids the whole set.
                    warn!(
                        "Frame extraction failed for {} at {at_secs:.3}s: {e}",
                        rel.display()
                    );
                    return GeneratedAssets {
                        thumbnails: Thumbnails::default(),
                        degraded: true,
                    };
                }
            }
        }

        // The middle frame is the most representative main thumbnail.
        let main = frame_paths.get(frame_paths.len() / 2).cloned();
        GeneratedAssets {
            thumbnails: Thumbnails {
                main,
                frames: frame_paths,
            },
            degraded: false,
        }
    }

    async fn extract_one_frame(
        &self,
        source: &Path,
        rel: &Path,
        at_secs: f64,
        file_name: &str,
    ) -> mediadex_core::Result<()> {
        let bytes = self.frames.extract_frame(source, at_secs).await?;
        let dest = self.asset_abs_path(rel, file_name);
        let width = self.width;

        tokio::task::spawn_blocking(move || {
            let img = image::load_from_memory(&bytes)
                .map_err(|e| mediadex_core::Error::asset(format!("frame decode failed: {e}")))?;
            write_thumbnail(img, width, &dest)
        })
        .await
        .map_err(|e| mediadex_core::Error::Internal(format!("frame task failed: {e}")))?
    }

    async fn audio_waveform(
        &self,
        source: &Path,
        rel: &Path,
        id: &str,
    ) -> mediadex_core::Result<String> {
        let file_name = asset_file_name(rel, id, "_waveform");
        let bytes = self
            .frames
            .render_waveform(source, self.width, self.width / 2)
            .await?;
        let dest = self.asset_abs_path(rel, &file_name);

        tokio::task::spawn_blocking(move || {
            let img = image::load_from_memory(&bytes)
                .map_err(|e| mediadex_core::Error::asset(format!("waveform decode failed: {e}")))?;
            // Already rendered at target size; encode without resizing.
            write_thumbnail(img, u32::MAX, &dest)
        })
        .await
        .map_err(|e| mediadex_core::Error::Internal(format!("waveform task failed: {e}")))??;

        Ok(asset_rel_path(rel, &file_name))
    }

    /// Absolute destination path for an asset of the given source file.
    fn asset_abs_path(&self, rel: &Path, file_name: &str) -> PathBuf {
        match rel.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                self.thumbs_dir.join(parent).join(file_name)
            }
            _ => self.thumbs_dir.join(file_name),
        }
    }
}

// ---------------------------------------------------------------------------
// Path derivation and encoding
// ---------------------------------------------------------------------------

/// File name for a derived asset: `{stem}_{id}{suffix}.jpg`.
///
/// Embedding the record id keeps names collision-free when two sources in
/// the same directory share a stem (e.g. `a.jpg` and `a.png`).
fn asset_file_name(rel: &Path, id: &str, suffix: &str) -> String {
    let stem = rel
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "asset".to_string());
    format!("{stem}_{id}{suffix}.jpg")
}

/// Document-relative path for an asset: `thumbnails/<rel dir>/<file name>`,
/// forward-slash separated.
fn asset_rel_path(rel: &Path, file_name: &str) -> String {
    let mut parts = vec![THUMBNAILS_DIR_NAME.to_string()];
    if let Some(parent) = rel.parent() {
        for component in parent.components() {
            parts.push(component.as_os_str().to_string_lossy().to_string());
        }
    }
    parts.push(file_name.to_string());
    parts.join("/")
}

/// Evenly-spaced frame timestamps across `(0, duration)`, excluding both
/// endpoints: `duration * i / (count + 1)` for `i` in `1..=count`.
fn frame_timestamps(duration: f64, count: u32) -> Vec<f64> {
    (1..=count)
        .map(|i| duration * f64::from(i) / f64::from(count + 1))
        .collect()
}

/// Resize (only if wider than `target_width`), convert to RGB, and write a
/// JPEG to `dest`, creating parent directories as needed.
fn write_thumbnail(
    img: image::DynamicImage,
    target_width: u32,
    dest: &Path,
) -> mediadex_core::Result<()> {
    let img = if img.width() > target_width {
        img.resize(target_width, u32::MAX, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel.
    let img = image::DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| mediadex_core::Error::asset(format!("JPEG encode failed: {e}")))?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, buf.into_inner())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_evenly_spaced_and_open() {
        let ts = frame_timestamps(20.0, 5);
        assert_eq!(ts.len(), 5);
        // 20 * i / 6 for i in 1..=5
        let expected = [3.333, 6.667, 10.0, 13.333, 16.667];
        for (got, want) in ts.iter().zip(expected) {
            assert!((got - want).abs() < 0.001, "{got} vs {want}");
        }
        assert!(ts[0] > 0.0);
        assert!(*ts.last().unwrap() < 20.0);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn timestamps_single_frame_is_midpoint() {
        let ts = frame_timestamps(10.0, 1);
        assert_eq!(ts, vec![5.0]);
    }

    #[test]
    fn file_name_embeds_id_and_suffix() {
        let rel = Path::new("trips/beach.mp4");
        assert_eq!(
            asset_file_name(rel, "abc123", "_frame_0"),
            "beach_abc123_frame_0.jpg"
        );
        assert_eq!(asset_file_name(rel, "abc123", ""), "beach_abc123.jpg");
    }

    #[test]
    fn same_stem_different_extension_do_not_collide() {
        let a = asset_file_name(Path::new("x/a.jpg"), "id1", "");
        let b = asset_file_name(Path::new("x/a.png"), "id2", "");
        assert_ne!(a, b);
    }

    #[test]
    fn rel_path_mirrors_source_directory() {
        assert_eq!(
            asset_rel_path(Path::new("trips/2023/beach.jpg"), "beach_x.jpg"),
            "thumbnails/trips/2023/beach_x.jpg"
        );
        assert_eq!(
            asset_rel_path(Path::new("top.jpg"), "top_x.jpg"),
            "thumbnails/top_x.jpg"
        );
    }

    #[test]
    fn write_thumbnail_resizes_only_wider_images() {
        let dir = tempfile::tempdir().unwrap();

        let wide = image::DynamicImage::ImageRgb8(image::RgbImage::new(400, 100));
        let dest = dir.path().join("wide.jpg");
        write_thumbnail(wide, 200, &dest).unwrap();
        let (w, h) = image::image_dimensions(&dest).unwrap();
        assert_eq!((w, h), (200, 50));

        let narrow = image::DynamicImage::ImageRgb8(image::RgbImage::new(100, 80));
        let dest = dir.path().join("narrow.jpg");
        write_thumbnail(narrow, 200, &dest).unwrap();
        let (w, h) = image::image_dimensions(&dest).unwrap();
        assert_eq!((w, h), (100, 80));
    }

    #[test]
    fn write_thumbnail_flattens_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let rgba = image::DynamicImage::ImageRgba8(image::RgbaImage::new(10, 10));
        let dest = dir.path().join("alpha.jpg");
        write_thumbnail(rgba, 200, &dest).unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn write_thumbnail_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let dest = dir.path().join("nested/deep/t.jpg");
        write_thumbnail(img, 200, &dest).unwrap();
        assert!(dest.exists());
    }
}
