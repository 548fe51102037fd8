// Frames-per-second and frame counts for a list of raw videos

use super::VideoProbe;
use crate::dataset::frame_rates::FrameRateRecord;
use crate::error::{LabelError, Result};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads newline-separated video paths, ignoring blank lines.
pub fn read_video_list(path: &Path) -> Result<Vec<PathBuf>> {
    let content = fs::read_to_string(path).map_err(|e| LabelError::io(path, e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Frame-rate table key for a video path: the file name without extension.
pub fn video_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| LabelError::invalid_path(path, "invalid video name"))
}

pub fn collect_frames_info(
    video_paths: &[PathBuf],
    probe: &dyn VideoProbe,
    pb: &ProgressBar,
) -> Result<Vec<FrameRateRecord>> {
    let mut records = Vec::with_capacity(video_paths.len());

    for path in video_paths {
        let props = probe.probe(path)?;
        records.push(FrameRateRecord {
            video: video_name(path)?,
            fps: props.fps,
            num_frames: Some(props.num_frames()),
        });
        pb.inc(1);
    }

    Ok(records)
}
