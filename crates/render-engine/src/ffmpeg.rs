//! ffmpeg/ffprobe-backed media collaborators.
//!
//! Probing shells out to `ffprobe` synchronously (clip construction is
//! synchronous). Frame extraction runs `ffmpeg` asynchronously, asking for
//! a single PNG on stdout which is then decoded with the `image` crate.

use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;

use montage_common::{MontageError, MontageResult};
use montage_project_model::media::{AssetLocation, AssetSource, MediaInfo, MediaProbe};

use crate::decoder::{still_to_image, DecodedFrame, FrameDecoder};

/// Media probe and frame decoder backed by the ffmpeg command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Check if both binaries are on `PATH`.
    pub fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg) && command_exists(&self.ffprobe)
    }

    fn frame_args(uri: &str, local_time_secs: f64) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{local_time_secs:.6}"),
            "-i".to_string(),
            uri.to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "-vcodec".to_string(),
            "png".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    format_name: Option<String>,
}

/// Demuxers that only ever yield a single still frame.
const STILL_FORMATS: &[&str] = &["image2", "png_pipe", "jpeg_pipe", "webp_pipe", "bmp_pipe"];

fn parse_probe_output(json: &str) -> MontageResult<MediaInfo> {
    let output: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| MontageError::resource(format!("unreadable ffprobe output: {e}")))?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    if video.is_none() && !has_audio {
        return Err(MontageError::resource("source has no audio or video streams"));
    }

    let is_still = output
        .format
        .as_ref()
        .and_then(|f| f.format_name.as_deref())
        .is_some_and(|name| name.split(',').any(|n| STILL_FORMATS.contains(&n)));

    let duration_secs = if is_still {
        None
    } else {
        output
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
    };

    Ok(MediaInfo {
        duration_secs,
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
        preferred_volume: None,
    })
}

impl MediaProbe for FfmpegBackend {
    fn probe(&self, uri: &str) -> MontageResult<MediaInfo> {
        if !Path::new(uri).exists() {
            return Err(MontageError::resource(format!("source not found: {uri}")));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration,format_name:stream=codec_type,width,height",
                "-of",
                "json",
            ])
            .arg(uri)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| MontageError::resource(format!("failed to run {}: {e}", self.ffprobe)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MontageError::resource(format!(
                "ffprobe rejected {uri}: {}",
                stderr.trim()
            )));
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(
            %uri,
            duration = ?info.duration_secs,
            width = info.width,
            height = info.height,
            "Probed source"
        );
        Ok(info)
    }
}

#[async_trait::async_trait]
impl FrameDecoder for FfmpegBackend {
    async fn decode_frame(
        &self,
        source: &AssetSource,
        local_time_secs: f64,
    ) -> MontageResult<DecodedFrame> {
        let uri = match &source.location {
            AssetLocation::Memory(frame) => {
                return Ok(DecodedFrame {
                    image: still_to_image(frame)?,
                    actual_time_secs: local_time_secs,
                });
            }
            AssetLocation::Uri(uri) => uri,
        };

        let args = Self::frame_args(uri, local_time_secs);
        tracing::debug!(
            args = ?args,
            generation = source.generation,
            "Running ffmpeg frame extraction"
        );

        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                MontageError::decoder_unavailable(format!("failed to start {}: {e}", self.ffmpeg))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MontageError::not_decodable(format!(
                "ffmpeg could not decode {uri} at {local_time_secs:.3}s: {}",
                stderr.trim()
            )));
        }

        // ffmpeg exits cleanly but writes nothing when seeking past the end.
        if output.stdout.is_empty() {
            return Err(MontageError::out_of_range(format!(
                "no frame at {local_time_secs:.3}s in {uri}"
            )));
        }

        let image = image::load_from_memory(&output.stdout)
            .map_err(|e| MontageError::not_decodable(format!("invalid frame from ffmpeg: {e}")))?
            .to_rgba8();

        Ok(DecodedFrame {
            image,
            actual_time_secs: local_time_secs,
        })
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Check if a binary resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_probe() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "12.480000", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration_secs, Some(12.48));
        assert_eq!((info.width, info.height), (1920, 1080));
    }

    #[test]
    fn test_parse_still_image_probe_has_no_duration() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 480}],
            "format": {"duration": "0.040000", "format_name": "png_pipe"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration_secs, None);
        assert_eq!(info.width, 640);
    }

    #[test]
    fn test_parse_rejects_streamless_source() {
        let err = parse_probe_output(r#"{"streams": [], "format": {}}"#).unwrap_err();
        assert!(matches!(err, MontageError::Resource { .. }));
        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn test_probe_missing_file_is_resource_error() {
        let backend = FfmpegBackend::default();
        let err = backend.probe("/definitely/not/here.mp4").unwrap_err();
        assert!(matches!(err, MontageError::Resource { .. }));
    }

    #[test]
    fn test_frame_args_seek_before_input() {
        let args = FfmpegBackend::frame_args("clip.mp4", 1.5);
        let seek = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(seek < input);
        assert_eq!(args[seek + 1], "1.500000");
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn test_command_exists_for_shell() {
        assert!(command_exists("sh"));
        assert!(!command_exists("montage-no-such-binary"));
    }
}
