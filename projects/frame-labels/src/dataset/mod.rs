// Dataset inputs: class table, frame-rate table, temporal annotations

pub mod annotations;
pub mod classes;
pub mod frame_rates;

use crate::error::LabelError;
use std::io::Read;

/// Fails with `MissingField` for the first required header not present.
pub(crate) fn require_columns<R: Read>(
    rdr: &mut csv::Reader<R>,
    source_name: &str,
    columns: &[&'static str],
) -> Result<(), LabelError> {
    let headers = rdr.headers().map_err(|e| csv_error(source_name, e))?;
    for &field in columns {
        if !headers.iter().any(|h| h == field) {
            return Err(LabelError::MissingField {
                source_name: source_name.to_string(),
                field,
            });
        }
    }
    Ok(())
}

/// Maps a csv failure to a line-numbered parse error where the record is known.
pub(crate) fn csv_error(source_name: &str, err: csv::Error) -> LabelError {
    let located = match err.kind() {
        csv::ErrorKind::Deserialize { pos: Some(pos), err } => {
            Some((pos.line() as usize, err.to_string()))
        }
        _ => None,
    };

    match located {
        Some((line, message)) => LabelError::parse(source_name, line, message),
        None => LabelError::Csv {
            source_name: source_name.to_string(),
            source: err,
        },
    }
}
