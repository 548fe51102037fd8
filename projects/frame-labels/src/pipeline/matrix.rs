// Label matrices: dense (frames × labels) binary targets per video

use crate::dataset::annotations::FrameAnnotation;
use crate::dataset::classes::LabelIndex;
use crate::error::{LabelError, Result};
use crate::pipeline::inventory::{FrameInventory, Partition};
use crate::pipeline::labels::collect_labels;
use indicatif::ProgressBar;
use ndarray::Array2;
use ndarray_npy::NpzWriter;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Keyed binary store of label matrices (NumPy `.npz`, one array per video).
///
/// Arrays are staged in `<path>.partial`; the archive only appears at `path`
/// once `finish` succeeds.
pub struct LabelContainer {
    path: PathBuf,
    staging_path: PathBuf,
    writer: NpzWriter<File>,
    frame_counts: BTreeMap<String, usize>,
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

impl LabelContainer {
    pub fn create(path: &Path) -> Result<Self> {
        let staging_path = staging_path(path);
        let file = File::create(&staging_path).map_err(|e| LabelError::io(&staging_path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            staging_path,
            writer: NpzWriter::new_compressed(file),
            frame_counts: BTreeMap::new(),
        })
    }

    pub fn write(&mut self, video_name: &str, matrix: &Array2<u8>) -> Result<()> {
        self.writer
            .add_array(video_name, matrix)
            .map_err(|e| self.npz_error(e))?;
        self.frame_counts
            .insert(video_name.to_string(), matrix.nrows());
        Ok(())
    }

    /// Finalizes the archive and moves it into place; returns the frame count
    /// of every stored video.
    pub fn finish(self) -> Result<BTreeMap<String, usize>> {
        let Self {
            path,
            staging_path,
            writer,
            frame_counts,
        } = self;
        writer
            .finish()
            .map_err(|source| LabelError::Npz {
                path: staging_path.clone(),
                source,
            })?;
        fs::rename(&staging_path, &path).map_err(|e| LabelError::io(&path, e))?;
        Ok(frame_counts)
    }

    /// Drops an unfinished archive without leaving anything on disk.
    pub fn discard(self) {
        let Self {
            staging_path,
            writer,
            ..
        } = self;
        drop(writer);
        if let Err(e) = fs::remove_file(&staging_path) {
            tracing::warn!("Failed to remove {:?}: {}", staging_path, e);
        }
    }

    fn npz_error(&self, source: ndarray_npy::WriteNpzError) -> LabelError {
        LabelError::Npz {
            path: self.staging_path.clone(),
            source,
        }
    }
}

/// Builds label matrices from per-video annotations at a fixed sample rate.
pub struct LabelMatrixBuilder<'a> {
    annotations: &'a HashMap<String, Vec<FrameAnnotation>>,
    index: &'a LabelIndex,
    sample_frame_rate: f64,
}

impl<'a> LabelMatrixBuilder<'a> {
    pub fn new(
        annotations: &'a HashMap<String, Vec<FrameAnnotation>>,
        index: &'a LabelIndex,
        sample_frame_rate: f64,
    ) -> Self {
        Self {
            annotations,
            index,
            sample_frame_rate,
        }
    }

    /// Resolves every annotation category against the label index, so a
    /// mismatch fails before any container is created.
    pub fn check_categories(&self) -> Result<()> {
        for annotations in self.annotations.values() {
            for annotation in annotations {
                self.index.column(&annotation.category)?;
            }
        }
        Ok(())
    }

    /// `(num_frames, num_labels)` matrix for `video_name`; row `i` is the
    /// 0-based frame `i` at the sample rate. Videos without annotations get
    /// an all-zero matrix.
    pub fn build(&self, video_name: &str, num_frames: usize) -> Result<Array2<u8>> {
        let mut matrix = Array2::<u8>::zeros((num_frames, self.index.len()));
        let annotations = self
            .annotations
            .get(video_name)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for frame in 0..num_frames {
            for category in collect_labels(annotations, frame as i64, self.sample_frame_rate) {
                matrix[[frame, self.index.column(category)?]] = 1;
            }
        }

        Ok(matrix)
    }

    /// Builds and writes one matrix per video of `partition`, one at a time.
    pub fn write_partition(
        &self,
        inventory: &FrameInventory,
        partition: Partition,
        container: &mut LabelContainer,
        pb: &ProgressBar,
    ) -> Result<()> {
        for (video_name, num_frames) in inventory.videos(partition) {
            if num_frames == 0 {
                continue;
            }
            let matrix = self.build(video_name, num_frames)?;
            container.write(video_name, &matrix)?;
            tracing::debug!(
                "{}: {} frames, {} positive labels",
                video_name,
                num_frames,
                matrix.iter().filter(|&&v| v == 1).count()
            );
            pb.inc(1);
        }
        Ok(())
    }
}
