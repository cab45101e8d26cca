//! Scan configuration types.
//!
//! The top-level [`ScanConfig`] struct is deserialized from JSON and passed
//! explicitly into the orchestrator at invocation time; nothing is read from
//! ambient process-wide state. Every field defaults sensibly so a completely
//! empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Name of the index document inside the output directory.
pub const INDEX_FILE_NAME: &str = "media_index.json";

/// Name of the derived-asset directory inside the output directory.
pub const THUMBNAILS_DIR_NAME: &str = "thumbnails";

/// Root scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Root of the volume to scan.
    pub source_volume: PathBuf,
    /// Directory receiving the index document and thumbnail tree.
    pub output_dir: PathBuf,
    /// Target width in pixels for generated thumbnails.
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,
    /// Number of evenly-spaced preview frames per video.
    #[serde(default = "default_video_frame_count")]
    pub video_frame_count: u32,
    /// Bound on concurrent per-file workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// External tool path overrides.
    pub tools: ToolsConfig,
}

fn default_thumbnail_width() -> u32 {
    800
}

fn default_video_frame_count() -> u32 {
    5
}

fn default_workers() -> usize {
    num_cpus::get()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            source_volume: PathBuf::new(),
            output_dir: PathBuf::from("./public"),
            thumbnail_width: default_thumbnail_width(),
            video_frame_count: default_video_frame_count(),
            workers: default_workers(),
            tools: ToolsConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Deserialize a `ScanConfig` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    ///
    /// Hard requirements (source volume present, frame count >= 1) are
    /// enforced by the orchestrator; these are advisory only.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.workers == 0 {
            warnings.push("workers is 0; a single worker will be used".into());
        }

        if self.thumbnail_width > 4096 {
            warnings.push(format!(
                "thumbnail_width {} is unusually large; thumbnails may be slow to generate",
                self.thumbnail_width
            ));
        }

        if !self.source_volume.as_os_str().is_empty()
            && self.output_dir.starts_with(&self.source_volume)
        {
            warnings.push(
                "output_dir is inside source_volume; generated assets would be re-scanned".into(),
            );
        }

        warnings
    }

    /// Path of the index document under the output directory.
    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join(INDEX_FILE_NAME)
    }

    /// Root of the thumbnail tree under the output directory.
    pub fn thumbnails_dir(&self) -> PathBuf {
        self.output_dir.join(THUMBNAILS_DIR_NAME)
    }

    /// Worker bound, never zero.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}

/// Paths to external CLI tools, overriding `PATH` lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.thumbnail_width, 800);
        assert_eq!(cfg.video_frame_count, 5);
        assert!(cfg.workers >= 1);
        assert_eq!(cfg.output_dir, PathBuf::from("./public"));
        assert!(cfg.tools.ffmpeg_path.is_none());
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"source_volume": "/mnt/media", "thumbnail_width": 640}"#;
        let cfg = ScanConfig::from_json(json).unwrap();
        assert_eq!(cfg.source_volume, PathBuf::from("/mnt/media"));
        assert_eq!(cfg.thumbnail_width, 640);
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.video_frame_count, 5);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = ScanConfig::from_json("{}").unwrap();
        assert_eq!(cfg.thumbnail_width, 800);
    }

    #[test]
    fn parse_invalid_json_errors() {
        assert!(ScanConfig::from_json("not json").is_err());
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = ScanConfig::load_or_default(None);
        assert_eq!(cfg.video_frame_count, 5);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = ScanConfig::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.thumbnail_width, 800);
    }

    #[test]
    fn zero_workers_warns_and_clamps() {
        let mut cfg = ScanConfig::default();
        cfg.workers = 0;
        assert!(cfg.validate().iter().any(|w| w.contains("workers")));
        assert_eq!(cfg.effective_workers(), 1);
    }

    #[test]
    fn output_inside_source_warns() {
        let mut cfg = ScanConfig::default();
        cfg.source_volume = PathBuf::from("/mnt/media");
        cfg.output_dir = PathBuf::from("/mnt/media/public");
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.contains("inside source_volume")));
    }

    #[test]
    fn derived_paths() {
        let mut cfg = ScanConfig::default();
        cfg.output_dir = PathBuf::from("/out");
        assert_eq!(cfg.index_path(), PathBuf::from("/out/media_index.json"));
        assert_eq!(cfg.thumbnails_dir(), PathBuf::from("/out/thumbnails"));
    }

    #[test]
    fn tools_config_roundtrip() {
        let json = r#"{"tools": {"ffprobe_path": "/opt/ffprobe"}}"#;
        let cfg = ScanConfig::from_json(json).unwrap();
        assert_eq!(cfg.tools.ffprobe_path, Some(PathBuf::from("/opt/ffprobe")));
        assert!(cfg.tools.ffmpeg_path.is_none());
    }
}
