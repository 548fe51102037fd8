// Video metadata probing

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_probe;
pub mod ffprobe;
pub mod frames_info;

use crate::error::{LabelError, Result};
use std::path::Path;

/// Stream properties needed to build the frame-rate table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub fps: f64,
    pub duration_secs: f64,
}

impl VideoProperties {
    /// Whole frames in the video: fps × duration, truncated.
    pub fn num_frames(&self) -> u64 {
        (self.fps * self.duration_secs) as u64
    }
}

pub trait VideoProbe {
    fn probe(&self, path: &Path) -> Result<VideoProperties>;
}

/// Picks a probe backend by name.
pub fn probe_for_backend(backend: &str) -> Result<Box<dyn VideoProbe>> {
    match backend {
        "ffprobe" => Ok(Box::new(ffprobe::FfprobeProbe::default())),
        #[cfg(feature = "ffmpeg")]
        "ffmpeg" => Ok(Box::new(ffmpeg_probe::FfmpegProbe::new()?)),
        _ => Err(LabelError::UnsupportedBackend(backend.to_string())),
    }
}

/// Parses an `N/D` frame rate; `None` for a zero or missing denominator.
pub(crate) fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = match value.split_once('/') {
        Some((num, den)) => (num.trim().parse::<f64>().ok()?, den.trim().parse::<f64>().ok()?),
        None => (value.trim().parse::<f64>().ok()?, 1.0),
    };
    if den > 0.0 && num > 0.0 {
        Some(num / den)
    } else {
        None
    }
}
