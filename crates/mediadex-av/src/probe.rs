//! Media probing through the `ffprobe` CLI.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format
//! -show_streams` and maps the JSON output into the narrow [`MediaProbe`]
//! the catalogue needs: duration, creation time, and pixel dimensions.
//! The [`MediaProber`] trait exists so tests can substitute a canned
//! implementation without invoking a real subprocess.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::command::ToolCommand;

/// Probe timeout; generous enough for slow network volumes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// The subset of probed metadata the catalogue records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    /// Duration in seconds, if recoverable.
    pub duration: Option<f64>,
    /// Width of the primary video stream; zero for audio-only files.
    pub width: u32,
    /// Height of the primary video stream; zero for audio-only files.
    pub height: u32,
    /// Embedded creation time, if the container carries one.
    pub creation_time: Option<DateTime<Utc>>,
}

/// Narrow collaborator interface over the external probing utility.
#[async_trait::async_trait]
pub trait MediaProber: Send + Sync {
    /// Backend name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Probe a media file. A failure here is recoverable for the caller:
    /// the file is catalogued with degraded fields, not excluded.
    async fn probe(&self, path: &Path) -> mediadex_core::Result<MediaProbe>;
}

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }
}

#[async_trait::async_trait]
impl MediaProber for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> mediadex_core::Result<MediaProbe> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"]);
        cmd.arg(path.to_string_lossy().as_ref());
        cmd.timeout(PROBE_TIMEOUT);

        let output = cmd.execute().await?;
        let ff: FfprobeOutput = serde_json::from_str(&output.stdout_utf8())
            .map_err(|e| mediadex_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

        Ok(parse_ffprobe_output(ff))
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    creation_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_ffprobe_output(output: FfprobeOutput) -> MediaProbe {
    // The primary video stream is the first one reporting a width; audio
    // files have none.
    let video_stream = output.streams.iter().find(|s| s.width.is_some());

    let width = video_stream.and_then(|s| s.width).unwrap_or(0);
    let height = video_stream.and_then(|s| s.height).unwrap_or(0);

    // Stream duration wins over container duration when both are present.
    let duration = video_stream
        .and_then(|s| s.duration.as_deref())
        .or(output.format.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let creation_time = output
        .format
        .tags
        .creation_time
        .as_deref()
        .and_then(parse_creation_time);

    MediaProbe {
        duration,
        width,
        height,
        creation_time,
    }
}

/// Parse the `creation_time` tag ffprobe reports.
///
/// Containers usually carry RFC 3339 (`2023-05-01T10:30:00.000000Z`); some
/// encoders write a space-separated variant instead.
fn parse_creation_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> MediaProbe {
        parse_ffprobe_output(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn video_with_stream_duration() {
        let probe = parse(
            r#"{
                "streams": [
                    {"width": 1920, "height": 1080, "duration": "20.500000"},
                    {"duration": "20.480000"}
                ],
                "format": {"duration": "20.520000"}
            }"#,
        );
        assert_eq!(probe.width, 1920);
        assert_eq!(probe.height, 1080);
        assert_eq!(probe.duration, Some(20.5));
    }

    #[test]
    fn duration_falls_back_to_format() {
        let probe = parse(
            r#"{
                "streams": [{"width": 640, "height": 480}],
                "format": {"duration": "12.000000"}
            }"#,
        );
        assert_eq!(probe.duration, Some(12.0));
    }

    #[test]
    fn audio_only_has_no_dimensions() {
        let probe = parse(
            r#"{
                "streams": [{"duration": "180.000000"}],
                "format": {"duration": "180.000000"}
            }"#,
        );
        assert_eq!(probe.width, 0);
        assert_eq!(probe.height, 0);
        assert_eq!(probe.duration, Some(180.0));
    }

    #[test]
    fn creation_time_rfc3339() {
        let probe = parse(
            r#"{
                "streams": [],
                "format": {"tags": {"creation_time": "2023-05-01T10:30:00.000000Z"}}
            }"#,
        );
        let dt = probe.creation_time.unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-05-01T10:30:00+00:00");
    }

    #[test]
    fn creation_time_space_separated() {
        assert!(parse_creation_time("2021-12-24 18:00:00").is_some());
    }

    #[test]
    fn creation_time_malformed_is_none() {
        assert!(parse_creation_time("not a date").is_none());
        let probe = parse(
            r#"{"streams": [], "format": {"tags": {"creation_time": "garbage"}}}"#,
        );
        assert!(probe.creation_time.is_none());
    }

    #[test]
    fn empty_output_degrades_to_default() {
        let probe = parse(r#"{}"#);
        assert_eq!(probe, MediaProbe::default());
    }

    #[test]
    fn unparseable_duration_is_none() {
        let probe = parse(r#"{"streams": [], "format": {"duration": "N/A"}}"#);
        assert!(probe.duration.is_none());
    }

    #[test]
    fn zero_duration_is_treated_as_unknown() {
        let probe = parse(r#"{"streams": [], "format": {"duration": "0.000000"}}"#);
        assert!(probe.duration.is_none());
    }
}
