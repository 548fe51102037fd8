mod cli;
mod dataset;
mod error;
mod pipeline;
mod run_artifacts;
mod video;

use anyhow::Result;
use cli::{Args, Command};
use pipeline::orchestrator;

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();

    match &args.command {
        Command::ParseAnnotations(parse) => orchestrator::run_parse_annotations(parse)?,
        Command::BuildLabels(build) => orchestrator::run_build_labels(build)?,
        Command::FramesInfo(info) => orchestrator::run_frames_info(info)?,
    }

    Ok(())
}
