// Per-frame label lookup

use crate::dataset::annotations::FrameAnnotation;
use crate::pipeline::timing::resample_frame_offset;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// The annotation's `[start_frame, end_frame]` window expressed at `frames_per_second`.
///
/// Bounds are recorded at the video's native rate and mapped onto the query
/// rate; the query frame itself is never rescaled.
pub fn frame_window(annotation: &FrameAnnotation, frames_per_second: f64) -> RangeInclusive<i64> {
    let native = annotation.frames_per_second;
    let start = resample_frame_offset(annotation.start_frame, native, frames_per_second);
    let end = resample_frame_offset(annotation.end_frame, native, frames_per_second);
    start..=end
}

/// Distinct categories of `annotations` active at `frame_number`, a 0-based
/// frame index sampled at `frames_per_second`.
pub fn collect_labels(
    annotations: &[FrameAnnotation],
    frame_number: i64,
    frames_per_second: f64,
) -> BTreeSet<&str> {
    annotations
        .iter()
        .filter(|a| frame_window(a, frames_per_second).contains(&frame_number))
        .map(|a| a.category.as_str())
        .collect()
}
