// Frame-rate table: `video,fps[,num_frames]` CSV

use super::{csv_error, require_columns};
use crate::error::{LabelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// One row of the frame-rate CSV
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameRateRecord {
    /// File stem of the video (no directory, no extension)
    pub video: String,
    pub fps: f64,
    #[serde(default)]
    pub num_frames: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoFrameInfo {
    pub fps: f64,
    pub num_frames: Option<u64>,
}

/// Read-only video → frame rate lookup
#[derive(Debug, Clone, Default)]
pub struct FrameRateTable {
    videos: HashMap<String, VideoFrameInfo>,
}

impl FrameRateTable {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| LabelError::io(path, e))?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        require_columns(&mut rdr, source_name, &["video", "fps"])?;

        let mut videos = HashMap::new();
        for record in rdr.deserialize::<FrameRateRecord>() {
            let record = record.map_err(|e| csv_error(source_name, e))?;
            videos.insert(
                record.video,
                VideoFrameInfo {
                    fps: record.fps,
                    num_frames: record.num_frames,
                },
            );
        }

        tracing::debug!("Loaded frame rates for {} videos from {}", videos.len(), source_name);
        Ok(Self { videos })
    }

    pub fn get(&self, video: &str) -> Option<&VideoFrameInfo> {
        self.videos.get(video)
    }

    /// Frame rate of `video`; an unknown video is a data-integrity failure.
    pub fn fps(&self, video: &str) -> Result<f64> {
        self.get(video)
            .map(|info| info.fps)
            .ok_or_else(|| LabelError::UnknownVideo(video.to_string()))
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }
}

/// Writes frame-rate rows with a `video,fps,num_frames` header.
pub fn write_records<W: Write>(writer: W, records: &[FrameRateRecord]) -> Result<()> {
    let csv_err = |e| LabelError::Csv {
        source_name: "frame-rate output".to_string(),
        source: e,
    };

    let mut wtr = csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serialize() emits the header with the first row only
        wtr.write_record(["video", "fps", "num_frames"])
            .map_err(csv_err)?;
    }
    for record in records {
        wtr.serialize(record).map_err(csv_err)?;
    }
    wtr.flush()
        .map_err(|e| LabelError::io("frame-rate output", e))?;
    Ok(())
}
