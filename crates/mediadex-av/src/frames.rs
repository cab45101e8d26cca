//! Still-frame extraction and waveform rendering through the `ffmpeg` CLI.
//!
//! Both operations pipe a single PNG image to stdout (`-f image2pipe`), so
//! no temporary files are involved and the caller decides how to resize,
//! re-encode, and place the result. The [`FrameSource`] trait exists so
//! tests can substitute canned image bytes for real subprocess calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::ToolCommand;

/// Frame extraction timeout. Seeking in large files on slow volumes can
/// take a while; a hung ffmpeg must not stall the whole scan.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

/// Waveform bar color, matching the presentation layer's accent.
const WAVEFORM_COLOR: &str = "0x3b82f6";

/// Narrow collaborator interface over the external frame/waveform tool.
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Extract one still frame at the given timestamp, returned as encoded
    /// image bytes (PNG from the real backend).
    async fn extract_frame(&self, path: &Path, at_secs: f64) -> mediadex_core::Result<Vec<u8>>;

    /// Render a waveform visualization of an audio file at the given pixel
    /// size, returned as encoded image bytes.
    async fn render_waveform(
        &self,
        path: &Path,
        width: u32,
        height: u32,
    ) -> mediadex_core::Result<Vec<u8>>;
}

/// A frame source backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    /// Path to the ffmpeg binary.
    ffmpeg_path: PathBuf,
}

impl FfmpegFrameSource {
    /// Create a new frame source using the given ffmpeg path.
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }
}

#[async_trait::async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn extract_frame(&self, path: &Path, at_secs: f64) -> mediadex_core::Result<Vec<u8>> {
        // -ss before -i seeks on the demuxer, which is much faster than
        // decoding up to the timestamp.
        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.args(["-v", "error", "-ss"]);
        cmd.arg(format_secs(at_secs));
        cmd.arg("-i");
        cmd.arg(path.to_string_lossy().as_ref());
        cmd.args(["-frames:v", "1", "-f", "image2pipe", "-c:v", "png", "-"]);
        cmd.timeout(EXTRACT_TIMEOUT);

        let output = cmd.execute().await?;
        if output.stdout.is_empty() {
            return Err(mediadex_core::Error::tool(
                "ffmpeg",
                format!("no frame produced at {}s for {}", at_secs, path.display()),
            ));
        }
        Ok(output.stdout)
    }

    async fn render_waveform(
        &self,
        path: &Path,
        width: u32,
        height: u32,
    ) -> mediadex_core::Result<Vec<u8>> {
        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.args(["-v", "error", "-i"]);
        cmd.arg(path.to_string_lossy().as_ref());
        cmd.arg("-filter_complex");
        cmd.arg(format!(
            "showwavespic=s={width}x{height}:colors={WAVEFORM_COLOR}"
        ));
        cmd.args(["-frames:v", "1", "-f", "image2pipe", "-c:v", "png", "-"]);
        cmd.timeout(EXTRACT_TIMEOUT);

        let output = cmd.execute().await?;
        if output.stdout.is_empty() {
            return Err(mediadex_core::Error::tool(
                "ffmpeg",
                format!("no waveform produced for {}", path.display()),
            ));
        }
        Ok(output.stdout)
    }
}

/// Format a seek offset the way ffmpeg expects: seconds with millisecond
/// precision, never scientific notation.
fn format_secs(secs: f64) -> String {
    format!("{:.3}", secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_secs_millisecond_precision() {
        assert_eq!(format_secs(0.0), "0.000");
        assert_eq!(format_secs(3.3333333), "3.333");
        assert_eq!(format_secs(19.99999), "20.000");
    }

    #[test]
    fn format_secs_clamps_negative() {
        assert_eq!(format_secs(-1.5), "0.000");
    }

    #[test]
    fn format_secs_large_values_stay_decimal() {
        assert_eq!(format_secs(86400.5), "86400.500");
    }
}
