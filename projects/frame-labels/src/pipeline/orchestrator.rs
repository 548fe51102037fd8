// Pipeline orchestrator: runs each tool end to end
//
// Loads the lookup tables once, threads them through every stage, and
// writes outputs only after all inputs have parsed cleanly.

use crate::cli::{BuildLabelsArgs, FramesInfoArgs, ParseAnnotationsArgs};
use crate::dataset::annotations::{self, FrameAnnotation};
use crate::dataset::classes::ClassMapping;
use crate::dataset::frame_rates::{self, FrameRateTable};
use crate::pipeline::inventory::{FrameInventory, Partition};
use crate::pipeline::matrix::{LabelContainer, LabelMatrixBuilder};
use crate::run_artifacts::{manifest_path, write_manifest, LabelManifest};
use crate::video::{frames_info, probe_for_backend};
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Frames of slack allowed between dumped and expected frame counts
const FRAME_COUNT_TOLERANCE: i64 = 2;

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1.yellow}, {eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}: {pos}")?,
    );
    pb.set_message(message);
    Ok(pb)
}

fn load_tables(class_mapping: &Path, video_frames_info: &Path) -> Result<(ClassMapping, FrameRateTable)> {
    let classes = ClassMapping::load(class_mapping)
        .with_context(|| format!("Failed to load class mapping {:?}", class_mapping))?;
    let frame_rates = FrameRateTable::load(video_frames_info)
        .with_context(|| format!("Failed to load video frames info {:?}", video_frames_info))?;
    anyhow::ensure!(!classes.is_empty(), "Class mapping {:?} is empty", class_mapping);

    tracing::info!(
        "Loaded {} classes and frame rates for {} videos",
        classes.len(),
        frame_rates.len()
    );
    Ok((classes, frame_rates))
}

/// Warns about videos whose dumped frame count disagrees with the count
/// implied by the frame-rate table at `sample_frame_rate`.
fn check_frame_counts(inventory: &FrameInventory, frame_rates: &FrameRateTable, sample_frame_rate: f64) {
    for partition in [Partition::TrainVal, Partition::Test] {
        for (video_name, found) in inventory.videos(partition) {
            let Some(info) = frame_rates.get(video_name) else {
                tracing::warn!("{}: frames on disk but no frame-rate entry", video_name);
                continue;
            };
            let Some(num_frames) = info.num_frames else {
                continue;
            };
            let expected = (num_frames as f64 * sample_frame_rate / info.fps).round() as i64;
            if (expected - found as i64).abs() > FRAME_COUNT_TOLERANCE {
                tracing::warn!(
                    "{}: found {} frames, expected about {} at {} fps",
                    video_name,
                    found,
                    expected,
                    sample_frame_rate
                );
            }
        }
    }
}

pub fn run_parse_annotations(args: &ParseAnnotationsArgs) -> Result<()> {
    let (classes, frame_rates) = load_tables(&args.class_mapping, &args.video_frames_info)?;

    let annotations = annotations::load_frame_annotations(
        &args.input_annotations,
        &frame_rates,
        &classes,
        args.label_format,
    )
    .with_context(|| format!("Failed to parse annotations {:?}", args.input_annotations))?;

    annotations::write_json(&args.output_annotation_json, &annotations)?;
    tracing::info!(
        "Wrote {} frame annotations to {:?}",
        annotations.len(),
        args.output_annotation_json
    );
    Ok(())
}

fn load_build_annotations(
    args: &BuildLabelsArgs,
    classes: &ClassMapping,
    frame_rates: &FrameRateTable,
) -> Result<Vec<FrameAnnotation>> {
    if let Some(json_path) = &args.annotation_json {
        let annotations = annotations::read_json(json_path)
            .with_context(|| format!("Failed to read annotation JSON {:?}", json_path))?;
        tracing::info!("Loaded {} frame annotations from {:?}", annotations.len(), json_path);
        return Ok(annotations);
    }

    let dir = args
        .annotations
        .as_ref()
        .context("Either --annotations or --annotation-json is required")?;

    let mut all = Vec::new();
    for name in [&args.train_csv_name, &args.test_csv_name] {
        let path = dir.join(name);
        let parsed = annotations::load_frame_annotations(&path, frame_rates, classes, args.label_format)
            .with_context(|| format!("Failed to parse annotations {:?}", path))?;
        all.extend(parsed);
    }
    Ok(all)
}

pub fn run_build_labels(args: &BuildLabelsArgs) -> Result<()> {
    anyhow::ensure!(
        args.sample_frame_rate > 0.0,
        "--sample-frame-rate must be positive, got {}",
        args.sample_frame_rate
    );
    anyhow::ensure!(
        args.output_trainval != args.output_test,
        "--output-trainval and --output-test must differ, both are {:?}",
        args.output_trainval
    );
    for (container, other) in [
        (&args.output_trainval, &args.output_test),
        (&args.output_test, &args.output_trainval),
    ] {
        anyhow::ensure!(
            manifest_path(container) != *other,
            "Manifest for {:?} would overwrite {:?}",
            container,
            other
        );
    }

    let (classes, frame_rates) = load_tables(&args.class_mapping, &args.video_frames_info)?;
    let index = classes.label_index(args.label_format);
    tracing::info!("{} labels, sampled at {} fps", index.len(), args.sample_frame_rate);

    let by_video = annotations::group_by_video(load_build_annotations(args, &classes, &frame_rates)?);

    let builder = LabelMatrixBuilder::new(&by_video, &index, args.sample_frame_rate);
    builder
        .check_categories()
        .context("Annotation categories do not match the class mapping and label format")?;

    let scan_pb = spinner("Collecting frame paths")?;
    let inventory = FrameInventory::scan(&args.frames_root, &scan_pb)
        .with_context(|| format!("Failed to scan frames under {:?}", args.frames_root))?;
    scan_pb.finish();
    check_frame_counts(&inventory, &frame_rates, args.sample_frame_rate);

    for (partition, output) in [
        (Partition::TrainVal, &args.output_trainval),
        (Partition::Test, &args.output_test),
    ] {
        tracing::info!(
            "Processing {:?} frames for {} videos.",
            partition,
            inventory.video_count(partition)
        );

        let pb = progress_bar(inventory.video_count(partition) as u64)?;
        let mut container = LabelContainer::create(output)?;
        if let Err(e) = builder.write_partition(&inventory, partition, &mut container, &pb) {
            container.discard();
            return Err(e).with_context(|| format!("Failed to write {:?}", output));
        }
        let videos = container.finish()?;
        pb.finish_with_message("Done");

        let manifest = LabelManifest {
            created_at: Utc::now(),
            partition,
            sample_frame_rate: args.sample_frame_rate,
            label_format: args.label_format,
            labels: index.names().to_vec(),
            videos,
        };
        let manifest_file = write_manifest(output, &manifest)?;
        tracing::info!(
            "Wrote {} label matrices to {:?} (manifest {:?})",
            manifest.videos.len(),
            output,
            manifest_file
        );
    }

    Ok(())
}

pub fn run_frames_info(args: &FramesInfoArgs) -> Result<()> {
    let probe = probe_for_backend(&args.backend)?;
    let video_paths = frames_info::read_video_list(&args.video_list)?;
    tracing::info!("Probing {} videos with {}", video_paths.len(), args.backend);

    let pb = progress_bar(video_paths.len() as u64)?;
    let records = frames_info::collect_frames_info(&video_paths, probe.as_ref(), &pb)?;
    pb.finish_with_message("Done");

    let file = File::create(&args.output_csv)
        .with_context(|| format!("Failed to create {:?}", args.output_csv))?;
    frame_rates::write_records(BufWriter::new(file), &records)?;
    tracing::info!("Wrote {} rows to {:?}", records.len(), args.output_csv);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::classes::LabelFormat;
    use ndarray::Array2;
    use ndarray_npy::NpzReader;
    use std::fs;

    const HEADER: &str = "id,subject,scene,quality,relevance,verified,script,objects,descriptions,actions,length";

    fn touch_frames(root: &Path, split: &str, video: &str, count: u32) {
        let dir = root.join(split).join(video);
        fs::create_dir_all(&dir).unwrap();
        for i in 1..=count {
            fs::write(dir.join(format!("frame{:04}.png", i)), b"").unwrap();
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();

            fs::write(root.join("classes.txt"), "157 someone is eating\n092 Holding some clothes\n").unwrap();
            fs::write(root.join("info.csv"), "video,fps,num_frames\nvideo1,25.0,100\nvideo2,30.0,90\n").unwrap();

            let annotations = root.join("annotations");
            fs::create_dir_all(&annotations).unwrap();
            fs::write(
                annotations.join("Charades_v1_train.csv"),
                format!("{HEADER}\nvideo1,S1,,6,,Yes,,,,157 1.0 3.0;092 0.0 0.5,4\n"),
            )
            .unwrap();
            fs::write(
                annotations.join("Charades_v1_test.csv"),
                format!("{HEADER}\nvideo2,S2,,,,No,,,,092 1.0 2.0,3\nvideo3,S3,,,,No,,,,,3\n"),
            )
            .unwrap();

            let frames = root.join("frames");
            touch_frames(&frames, "train", "video1", 40);
            touch_frames(&frames, "test", "video2", 30);

            Self { dir }
        }

        fn path(&self, name: &str) -> std::path::PathBuf {
            self.dir.path().join(name)
        }

        fn build_args(&self) -> BuildLabelsArgs {
            BuildLabelsArgs {
                annotations: Some(self.path("annotations")),
                annotation_json: None,
                train_csv_name: "Charades_v1_train.csv".to_string(),
                test_csv_name: "Charades_v1_test.csv".to_string(),
                frames_root: self.path("frames"),
                video_frames_info: self.path("info.csv"),
                class_mapping: self.path("classes.txt"),
                sample_frame_rate: 10.0,
                label_format: LabelFormat::Prefixed,
                output_trainval: self.path("trainval.npz"),
                output_test: self.path("test.npz"),
            }
        }
    }

    fn read_matrix(path: &Path, video: &str) -> Array2<u8> {
        let mut npz = NpzReader::new(File::open(path).unwrap()).unwrap();
        npz.by_name(&format!("{video}.npy")).unwrap()
    }

    #[test]
    fn test_parse_annotations_writes_json() {
        let fixture = Fixture::new();
        let args = ParseAnnotationsArgs {
            input_annotations: fixture.path("annotations").join("Charades_v1_train.csv"),
            class_mapping: fixture.path("classes.txt"),
            video_frames_info: fixture.path("info.csv"),
            output_annotation_json: fixture.path("out.json"),
            label_format: LabelFormat::Prefixed,
        };
        run_parse_annotations(&args).unwrap();

        let parsed = annotations::read_json(&fixture.path("out.json")).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].start_frame, 25);
        assert_eq!(parsed[0].end_frame, 75);
        assert_eq!(parsed[0].frames_per_second, 25.0);
        assert_eq!(parsed[1].category, "092-Holding some clothes");
    }

    #[test]
    fn test_build_labels_end_to_end() {
        let fixture = Fixture::new();
        run_build_labels(&fixture.build_args()).unwrap();

        // video1: eating 1.0s..3.0s → rows 10..=30; clothes 0.0s..0.5s → rows 0..=5
        let trainval = read_matrix(&fixture.path("trainval.npz"), "video1");
        assert_eq!(trainval.dim(), (40, 2));
        assert_eq!(trainval[[10, 0]], 1);
        assert_eq!(trainval[[30, 0]], 1);
        assert_eq!(trainval[[31, 0]], 0);
        assert_eq!(trainval[[9, 0]], 0);
        assert_eq!(trainval[[5, 1]], 1);
        assert_eq!(trainval[[6, 1]], 0);

        // video2: clothes 1.0s..2.0s → rows 10..=20
        let test = read_matrix(&fixture.path("test.npz"), "video2");
        assert_eq!(test.dim(), (30, 2));
        assert_eq!(test.column(1).iter().filter(|&&v| v == 1).count(), 11);
        assert!(test.column(0).iter().all(|&v| v == 0));

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(fixture.path("trainval.npz.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["labels"][0], "157-someone is eating");
        assert_eq!(manifest["videos"]["video1"], 40);
    }

    #[test]
    fn test_build_labels_from_annotation_json() {
        let fixture = Fixture::new();
        let parse_args = ParseAnnotationsArgs {
            input_annotations: fixture.path("annotations").join("Charades_v1_train.csv"),
            class_mapping: fixture.path("classes.txt"),
            video_frames_info: fixture.path("info.csv"),
            output_annotation_json: fixture.path("train.json"),
            label_format: LabelFormat::Prefixed,
        };
        run_parse_annotations(&parse_args).unwrap();

        let mut args = fixture.build_args();
        args.annotations = None;
        args.annotation_json = Some(fixture.path("train.json"));
        run_build_labels(&args).unwrap();

        let trainval = read_matrix(&fixture.path("trainval.npz"), "video1");
        assert_eq!(trainval[[20, 0]], 1);
        // test annotations were not part of the JSON
        let test = read_matrix(&fixture.path("test.npz"), "video2");
        assert!(test.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_build_labels_unknown_video_aborts() {
        let fixture = Fixture::new();
        fs::write(fixture.path("info.csv"), "video,fps\nvideo1,25.0\n").unwrap();

        let err = run_build_labels(&fixture.build_args()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("video2"), "{message}");
        assert!(!fixture.path("trainval.npz").exists());
    }

    #[test]
    fn test_category_mismatch_aborts_before_any_output() {
        let fixture = Fixture::new();
        // "someone is eating" is the stripped rendering; the build uses prefixed
        let parsed = vec![
            FrameAnnotation {
                filename: "video1".to_string(),
                subject: "S1".to_string(),
                verified: true,
                quality: 6,
                start_seconds: 1.0,
                end_seconds: 3.0,
                start_frame: 25,
                end_frame: 75,
                frames_per_second: 25.0,
                category: "157-someone is eating".to_string(),
            },
            FrameAnnotation {
                filename: "video2".to_string(),
                subject: "S2".to_string(),
                verified: false,
                quality: -1,
                start_seconds: 1.0,
                end_seconds: 2.0,
                start_frame: 30,
                end_frame: 60,
                frames_per_second: 30.0,
                category: "someone is eating".to_string(),
            },
        ];
        annotations::write_json(&fixture.path("mixed.json"), &parsed).unwrap();

        let mut args = fixture.build_args();
        args.annotations = None;
        args.annotation_json = Some(fixture.path("mixed.json"));

        let err = run_build_labels(&args).unwrap_err();
        assert!(format!("{err:#}").contains("someone is eating"));
        for name in [
            "trainval.npz",
            "trainval.npz.partial",
            "trainval.npz.json",
            "test.npz",
            "test.npz.partial",
        ] {
            assert!(!fixture.path(name).exists(), "{name} should not exist");
        }
    }

    #[test]
    fn test_outputs_sharing_a_stem_keep_separate_manifests() {
        let fixture = Fixture::new();
        let mut args = fixture.build_args();
        args.output_trainval = fixture.path("labels.npz");
        args.output_test = fixture.path("labels.npy");
        run_build_labels(&args).unwrap();

        let trainval: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(fixture.path("labels.npz.json")).unwrap())
                .unwrap();
        let test: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(fixture.path("labels.npy.json")).unwrap())
                .unwrap();
        assert_eq!(trainval["partition"], "trainval");
        assert_eq!(test["partition"], "test");
    }

    #[test]
    fn test_identical_outputs_are_rejected() {
        let fixture = Fixture::new();
        let mut args = fixture.build_args();
        args.output_test = args.output_trainval.clone();

        assert!(run_build_labels(&args).is_err());
        assert!(!fixture.path("trainval.npz").exists());

        let mut args = fixture.build_args();
        args.output_test = fixture.path("trainval.npz.json");
        let err = run_build_labels(&args).unwrap_err();
        assert!(err.to_string().contains("would overwrite"));
    }

    #[test]
    fn test_missing_class_mapping_names_file() {
        let fixture = Fixture::new();
        let mut args = fixture.build_args();
        args.class_mapping = fixture.path("missing.txt");

        let err = run_build_labels(&args).unwrap_err();
        assert!(format!("{err:#}").contains("missing.txt"));
    }
}
