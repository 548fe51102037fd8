use crate::dataset::classes::LabelFormat;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse temporal annotations into frame-indexed JSON records
    ParseAnnotations(ParseAnnotationsArgs),
    /// Convert temporal annotations to per-frame label matrices
    BuildLabels(BuildLabelsArgs),
    /// Output frames per second and number of frames for each video
    FramesInfo(FramesInfoArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ParseAnnotationsArgs {
    /// Raw annotation CSV (id, subject, quality, verified, actions, ...)
    #[arg(long)]
    pub input_annotations: PathBuf,

    /// File containing lines "<class_id> <class_description>"
    #[arg(long, env = "FRAME_LABELS_CLASS_MAPPING")]
    pub class_mapping: PathBuf,

    /// CSV of format video,fps[,num_frames]
    #[arg(long, env = "FRAME_LABELS_VIDEO_FRAMES_INFO")]
    pub video_frames_info: PathBuf,

    #[arg(long)]
    pub output_annotation_json: PathBuf,

    /// How class ids become category names
    #[arg(long, value_enum, default_value_t = LabelFormat::Prefixed)]
    pub label_format: LabelFormat,
}

#[derive(ClapArgs, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["annotations", "annotation_json"])))]
pub struct BuildLabelsArgs {
    /// Directory holding the train and test annotation CSVs
    #[arg(long, env = "FRAME_LABELS_ANNOTATIONS")]
    pub annotations: Option<PathBuf>,

    /// Previously parsed frame-annotation JSON, instead of --annotations
    #[arg(long)]
    pub annotation_json: Option<PathBuf>,

    /// Name of the training annotation CSV inside --annotations
    #[arg(long, default_value = "Charades_v1_train.csv")]
    pub train_csv_name: String,

    /// Name of the test annotation CSV inside --annotations
    #[arg(long, default_value = "Charades_v1_test.csv")]
    pub test_csv_name: String,

    /// Root containing train/, val/ and test/, each holding <video_name>/frame%04d.png
    /// starting at frame0001.png
    #[arg(long, env = "FRAME_LABELS_FRAMES_ROOT")]
    pub frames_root: PathBuf,

    /// CSV of format video,fps[,num_frames]
    #[arg(long, env = "FRAME_LABELS_VIDEO_FRAMES_INFO")]
    pub video_frames_info: PathBuf,

    /// File containing lines "<class_id> <class_name>"; line order is label column order
    #[arg(long, env = "FRAME_LABELS_CLASS_MAPPING")]
    pub class_mapping: PathBuf,

    /// Frame rate the frame images were dumped at; labels are emitted at this rate
    #[arg(long, default_value_t = 10.0)]
    pub sample_frame_rate: f64,

    /// How class ids become category names
    #[arg(long, value_enum, default_value_t = LabelFormat::Prefixed)]
    pub label_format: LabelFormat,

    /// Output container for train+val label matrices (.npz)
    #[arg(long)]
    pub output_trainval: PathBuf,

    /// Output container for test label matrices (.npz)
    #[arg(long)]
    pub output_test: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct FramesInfoArgs {
    /// File containing new-line separated paths to videos
    pub video_list: PathBuf,

    pub output_csv: PathBuf,

    /// Probe backend: ffprobe, or ffmpeg when built with the `ffmpeg` feature
    #[arg(long, default_value = "ffprobe")]
    pub backend: String,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_labels_defaults() {
        let args = Args::try_parse_from([
            "frame-labels",
            "build-labels",
            "--annotations",
            "/data/annotations",
            "--frames-root",
            "/data/frames",
            "--video-frames-info",
            "/data/info.csv",
            "--class-mapping",
            "/data/classes.txt",
            "--output-trainval",
            "/out/trainval.npz",
            "--output-test",
            "/out/test.npz",
        ])
        .unwrap();

        let Command::BuildLabels(build) = args.command else {
            panic!("expected build-labels");
        };
        assert_eq!(build.sample_frame_rate, 10.0);
        assert_eq!(build.label_format, LabelFormat::Prefixed);
        assert_eq!(build.train_csv_name, "Charades_v1_train.csv");
        assert!(build.annotation_json.is_none());
    }

    #[test]
    fn test_build_labels_requires_an_annotation_source() {
        let result = Args::try_parse_from([
            "frame-labels",
            "build-labels",
            "--frames-root",
            "/data/frames",
            "--video-frames-info",
            "/data/info.csv",
            "--class-mapping",
            "/data/classes.txt",
            "--output-trainval",
            "/out/trainval.npz",
            "--output-test",
            "/out/test.npz",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_annotations_label_format() {
        let args = Args::try_parse_from([
            "frame-labels",
            "parse-annotations",
            "--input-annotations",
            "train.csv",
            "--class-mapping",
            "classes.txt",
            "--video-frames-info",
            "info.csv",
            "--output-annotation-json",
            "out.json",
            "--label-format",
            "stripped",
        ])
        .unwrap();

        let Command::ParseAnnotations(parse) = args.command else {
            panic!("expected parse-annotations");
        };
        assert_eq!(parse.label_format, LabelFormat::Stripped);
    }

    #[test]
    fn test_frames_info_positional_args() {
        let args =
            Args::try_parse_from(["frame-labels", "frames-info", "videos.txt", "info.csv"]).unwrap();
        let Command::FramesInfo(info) = args.command else {
            panic!("expected frames-info");
        };
        assert_eq!(info.backend, "ffprobe");
        assert_eq!(info.output_csv, PathBuf::from("info.csv"));
    }
}
