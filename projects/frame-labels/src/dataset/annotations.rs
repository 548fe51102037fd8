// Temporal annotations: raw per-video CSV rows → frame-indexed records
//
// Raw rows list action instances in seconds (`c092 11.90 21.20;c147 0.00 12.60`).
// Each instance becomes one FrameAnnotation at the video's native frame rate.

use super::classes::{ClassMapping, LabelFormat};
use super::frame_rates::FrameRateTable;
use super::{csv_error, require_columns};
use crate::error::{LabelError, Result};
use crate::pipeline::timing;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Columns the annotation CSV must carry; anything else is ignored.
const REQUIRED_COLUMNS: [&str; 5] = ["id", "subject", "quality", "verified", "actions"];

#[derive(Deserialize)]
struct AnnotationCsvRow {
    id: String,
    subject: String,
    quality: String,
    verified: String,
    actions: String,
}

/// One video's row from the annotation CSV
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotationRow {
    pub id: String,
    pub subject: String,
    pub verified: bool,
    /// -1 when the source leaves it blank
    pub quality: i32,
    /// `;`-separated instances, unparsed
    pub actions: Vec<String>,
    /// Line in the source CSV, for diagnostics
    pub line: usize,
}

/// A labeled interval within a video, in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct ActionInstance {
    pub class_id: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl FromStr for ActionInstance {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split(' ').collect();
        let [class_id, start, end] = tokens.as_slice() else {
            return Err(format!(
                "expected '<class_id> <start_seconds> <end_seconds>', got '{}'",
                s
            ));
        };

        let parse_seconds = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| format!("invalid seconds '{}' in action '{}'", value, s))
        };

        Ok(Self {
            class_id: class_id.to_string(),
            start_seconds: parse_seconds(*start)?,
            end_seconds: parse_seconds(*end)?,
        })
    }
}

/// An action instance resolved to frame indices at the video's native rate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameAnnotation {
    pub filename: String,
    pub subject: String,
    pub verified: bool,
    pub quality: i32,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub start_frame: i64,
    pub end_frame: i64,
    pub frames_per_second: f64,
    pub category: String,
}

impl FrameAnnotation {
    pub fn new(
        row: &RawAnnotationRow,
        instance: &ActionInstance,
        frames_per_second: f64,
        category: String,
    ) -> Self {
        Self {
            filename: row.id.clone(),
            subject: row.subject.clone(),
            verified: row.verified,
            quality: row.quality,
            start_seconds: instance.start_seconds,
            end_seconds: instance.end_seconds,
            start_frame: timing::start_frame(instance.start_seconds, frames_per_second),
            end_frame: timing::end_frame(instance.end_seconds, frames_per_second),
            frames_per_second,
            category,
        }
    }
}

/// Only the exact string "Yes" counts as verified.
pub fn parse_verified(value: &str) -> bool {
    value == "Yes"
}

pub fn parse_quality(value: &str) -> std::result::Result<i32, std::num::ParseIntError> {
    if value.is_empty() {
        Ok(-1)
    } else {
        value.parse()
    }
}

pub fn read_raw_rows(path: &Path) -> Result<Vec<RawAnnotationRow>> {
    let file = File::open(path).map_err(|e| LabelError::io(path, e))?;
    raw_rows_from_reader(file, &path.display().to_string())
}

pub fn raw_rows_from_reader<R: Read>(reader: R, source_name: &str) -> Result<Vec<RawAnnotationRow>> {
    // Field values are taken verbatim; only header names are trimmed
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    require_columns(&mut rdr, source_name, &REQUIRED_COLUMNS)?;

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    let headers = rdr.headers().map_err(|e| csv_error(source_name, e))?.clone();

    while rdr
        .read_record(&mut record)
        .map_err(|e| csv_error(source_name, e))?
    {
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let row: AnnotationCsvRow = record
            .deserialize(Some(&headers))
            .map_err(|e| LabelError::parse(source_name, line, e.to_string()))?;

        let quality = parse_quality(&row.quality).map_err(|_| {
            LabelError::parse(source_name, line, format!("invalid quality '{}'", row.quality))
        })?;

        let actions = if row.actions.is_empty() {
            Vec::new()
        } else {
            row.actions.split(';').map(str::to_string).collect()
        };

        rows.push(RawAnnotationRow {
            id: row.id,
            subject: row.subject,
            verified: parse_verified(&row.verified),
            quality,
            actions,
            line,
        });
    }

    tracing::debug!("Read {} annotation rows from {}", rows.len(), source_name);
    Ok(rows)
}

/// Converts raw rows into frame annotations.
///
/// Rows without actions are skipped. A video missing from `frame_rates`, a
/// malformed action instance, or a class id absent from `classes` aborts the
/// whole conversion.
pub fn parse_annotations(
    rows: &[RawAnnotationRow],
    frame_rates: &FrameRateTable,
    classes: &ClassMapping,
    format: LabelFormat,
    source_name: &str,
) -> Result<Vec<FrameAnnotation>> {
    let mut annotations = Vec::new();

    for row in rows {
        if row.actions.is_empty() {
            continue;
        }

        let frames_per_second = frame_rates.fps(&row.id)?;

        for action in &row.actions {
            let instance: ActionInstance = action
                .parse()
                .map_err(|message| LabelError::parse(source_name, row.line, message))?;
            let category = classes.category(&instance.class_id, format)?;
            annotations.push(FrameAnnotation::new(
                row,
                &instance,
                frames_per_second,
                category,
            ));
        }
    }

    Ok(annotations)
}

/// Reads and converts one annotation CSV.
pub fn load_frame_annotations(
    path: &Path,
    frame_rates: &FrameRateTable,
    classes: &ClassMapping,
    format: LabelFormat,
) -> Result<Vec<FrameAnnotation>> {
    let rows = read_raw_rows(path)?;
    let annotations = parse_annotations(
        &rows,
        frame_rates,
        classes,
        format,
        &path.display().to_string(),
    )?;
    tracing::info!(
        "Parsed {} action instances from {} rows in {:?}",
        annotations.len(),
        rows.len(),
        path
    );
    Ok(annotations)
}

pub fn write_json(path: &Path, annotations: &[FrameAnnotation]) -> Result<()> {
    let file = File::create(path).map_err(|e| LabelError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, annotations).map_err(|e| LabelError::Json {
        source_name: path.display().to_string(),
        source: e,
    })?;
    writer.flush().map_err(|e| LabelError::io(path, e))
}

pub fn read_json(path: &Path) -> Result<Vec<FrameAnnotation>> {
    let file = File::open(path).map_err(|e| LabelError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| LabelError::Json {
        source_name: path.display().to_string(),
        source: e,
    })
}

/// Groups annotations by video, preserving input order within each video.
pub fn group_by_video(
    annotations: impl IntoIterator<Item = FrameAnnotation>,
) -> HashMap<String, Vec<FrameAnnotation>> {
    let mut by_video: HashMap<String, Vec<FrameAnnotation>> = HashMap::new();
    for annotation in annotations {
        by_video
            .entry(annotation.filename.clone())
            .or_default()
            .push(annotation);
    }
    by_video
}
