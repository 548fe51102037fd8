use super::{VideoProbe, VideoProperties};
use crate::error::{LabelError, Result};
use ffmpeg_next::ffi;
use std::path::Path;

/// In-process probe backed by FFmpeg via ffmpeg-next.
pub struct FfmpegProbe;

impl FfmpegProbe {
    pub fn new() -> Result<Self> {
        ffmpeg_next::init().map_err(|e| LabelError::Probe {
            path: "ffmpeg".into(),
            message: format!("Failed to initialize FFmpeg: {}", e),
        })?;
        Ok(Self)
    }
}

impl VideoProbe for FfmpegProbe {
    fn probe(&self, path: &Path) -> Result<VideoProperties> {
        let probe_error = |message: String| LabelError::Probe {
            path: path.to_path_buf(),
            message,
        };

        if !path.exists() {
            return Err(LabelError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "video file not found"),
            ));
        }

        let input_ctx = ffmpeg_next::format::input(&path)
            .map_err(|e| probe_error(format!("Failed to open video file: {}", e)))?;

        let video_stream = input_ctx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| probe_error("No video stream found".to_string()))?;

        let rational_fps = video_stream.avg_frame_rate();
        if rational_fps.denominator() <= 0 || rational_fps.numerator() <= 0 {
            return Err(probe_error("could not determine frame rate".to_string()));
        }
        let fps = rational_fps.numerator() as f64 / rational_fps.denominator() as f64;

        let duration_secs = input_ctx.duration() as f64 / ffi::AV_TIME_BASE as f64;
        if duration_secs <= 0.0 {
            return Err(probe_error("could not determine duration".to_string()));
        }

        tracing::debug!(
            "FfmpegProbe: {:?} fps={:.3} duration={:.2}s stream_frames={}",
            path,
            fps,
            duration_secs,
            video_stream.frames()
        );

        Ok(VideoProperties { fps, duration_secs })
    }
}
