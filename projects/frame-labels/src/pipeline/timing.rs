// Time ↔ frame index conversions

/// Absorbs float error when a rescaled offset lands on an exact frame.
const FRAME_EPSILON: f64 = 1e-9;

/// First frame whose time window touches `seconds`.
pub fn start_frame(seconds: f64, frames_per_second: f64) -> i64 {
    (seconds * frames_per_second).floor() as i64
}

/// Frame index just past `seconds`, so a partially covered last frame counts.
pub fn end_frame(seconds: f64, frames_per_second: f64) -> i64 {
    (seconds * frames_per_second).ceil() as i64
}

/// Frame index `frame_offset` at `original_fps` expressed at `sampled_fps`.
///
/// The result is the sampled frame whose window contains the start of the
/// original frame, i.e. the rescaled offset rounded down.
///
/// ```text
/// resample_frame_offset(3, 10.0, 1.0) == 0
/// resample_frame_offset(3, 5.0, 1.0)  == 0
/// resample_frame_offset(3, 3.0, 1.0)  == 1
/// ```
pub fn resample_frame_offset(frame_offset: i64, original_fps: f64, sampled_fps: f64) -> i64 {
    let scaled = frame_offset as f64 * sampled_fps / original_fps;
    (scaled + FRAME_EPSILON).floor() as i64
}
