use super::{parse_rational, VideoProbe, VideoProperties};
use crate::error::{LabelError, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Deserialize, Debug)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize, Debug)]
struct ProbeStream {
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probes videos by running the `ffprobe` executable.
pub struct FfprobeProbe {
    program: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            program: "ffprobe".to_string(),
        }
    }
}

impl VideoProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<VideoProperties> {
        if !path.exists() {
            return Err(LabelError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "video file not found"),
            ));
        }

        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=avg_frame_rate,r_frame_rate:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| LabelError::io(&self.program, e))?;

        if !output.status.success() {
            return Err(LabelError::Probe {
                path: path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let props = parse_probe_output(&output.stdout).map_err(|message| LabelError::Probe {
            path: path.to_path_buf(),
            message,
        })?;

        tracing::debug!(
            "ffprobe: {:?} fps={:.3} duration={:.2}s",
            path,
            props.fps,
            props.duration_secs
        );
        Ok(props)
    }
}

fn parse_probe_output(stdout: &[u8]) -> std::result::Result<VideoProperties, String> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("unreadable ffprobe output: {}", e))?;

    let stream = output
        .streams
        .first()
        .ok_or_else(|| "no video stream".to_string())?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rational))
        .ok_or_else(|| "could not determine frame rate".to_string())?;

    let duration_secs = output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| "could not determine duration".to_string())?;

    Ok(VideoProperties { fps, duration_secs })
}
