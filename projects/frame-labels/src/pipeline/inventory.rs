// Frame image inventory: `<root>/<split>/<video_name>/frame<NNNN>.png`

use crate::error::{LabelError, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Directory a frame was dumped under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }

    pub fn partition(&self) -> Partition {
        match self {
            Split::Train | Split::Val => Partition::TrainVal,
            Split::Test => Partition::Test,
        }
    }
}

/// Output container a split's label matrices go to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    TrainVal,
    Test,
}

/// Splits `<...>/<video_name>/frame<NNNN>.png` into the video name and its
/// 1-based frame number.
pub fn parse_frame_path(path: &Path) -> Result<(String, u32)> {
    let invalid = |message: &str| LabelError::invalid_path(path, message);

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| invalid("frame path has no file name"))?;

    let digits = file_name
        .strip_prefix("frame")
        .and_then(|rest| rest.strip_suffix(".png"))
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| invalid("expected a file named frame<NNNN>.png"))?;

    let frame_number: u32 = digits
        .parse()
        .map_err(|_| invalid("frame number out of range"))?;
    if frame_number == 0 {
        return Err(invalid("frame numbers start at 1"));
    }

    let video_name = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
        .ok_or_else(|| invalid("frame path has no video directory"))?;

    Ok((video_name.to_string(), frame_number))
}

/// Frame counts per video, grouped by output partition.
#[derive(Debug, Default)]
pub struct FrameInventory {
    partitions: BTreeMap<Partition, BTreeMap<String, usize>>,
}

impl FrameInventory {
    /// Walks `train/`, `val/` and `test/` under `frames_root`.
    pub fn scan(frames_root: &Path, pb: &ProgressBar) -> Result<Self> {
        if !frames_root.is_dir() {
            return Err(LabelError::io(
                frames_root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "frames root is not a directory"),
            ));
        }

        let mut inventory = Self::default();

        for split in Split::ALL {
            let split_dir = frames_root.join(split.dir_name());
            if !split_dir.is_dir() {
                tracing::warn!("No {} frames: {:?} does not exist", split.dir_name(), split_dir);
                continue;
            }

            tracing::info!("Collecting {} paths.", split.dir_name());
            let mut collected = 0usize;
            for entry in WalkDir::new(&split_dir).min_depth(2).max_depth(2) {
                let entry = entry.map_err(|e| {
                    let path = e.path().unwrap_or(&split_dir).to_path_buf();
                    LabelError::io(path, e.into())
                })?;
                if !entry.file_type().is_file() || !is_png(entry.path()) {
                    continue;
                }

                let (video_name, _) = parse_frame_path(entry.path())?;
                inventory.add_frame(split.partition(), video_name);
                collected += 1;
                pb.inc(1);
            }
            tracing::info!("Collected {} {} paths.", collected, split.dir_name());
        }

        Ok(inventory)
    }

    fn add_frame(&mut self, partition: Partition, video_name: String) {
        *self
            .partitions
            .entry(partition)
            .or_default()
            .entry(video_name)
            .or_insert(0) += 1;
    }

    /// Videos in `partition` with their frame counts, sorted by name.
    pub fn videos(&self, partition: Partition) -> impl Iterator<Item = (&str, usize)> {
        self.partitions
            .get(&partition)
            .into_iter()
            .flat_map(|videos| videos.iter().map(|(name, &count)| (name.as_str(), count)))
    }

    pub fn video_count(&self, partition: Partition) -> usize {
        self.partitions.get(&partition).map_or(0, |videos| videos.len())
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}
