//! Batch orchestration of the two-stage pipeline.
//!
//! The orchestrator discovers sample directories, drives each one through
//! geometry resolution, segmentation, and annotation, and isolates
//! failures at the sample boundary: one bad sample is recorded and the run
//! proceeds to the next. No retries are performed; re-running the batch is
//! the retry mechanism.

use crate::core::config::{find_config_file, SampleConfig};
use crate::core::errors::{CollaboratorStage, PipelineError, PipelineResult};
use crate::core::traits::{CellAnnotator, CellSegmenter, VolumeReader};
use crate::domain::SampleRecord;
use crate::pipeline::summary::PipelineRunSummary;
use crate::pipeline::tables::{population_summary, write_cell_type_table, write_population_table};
use crate::processors::{build_composite, select_channel_planes};
use crate::utils::{write_channel_preview, write_mask_tiff};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Orchestrator options.
///
/// An explicit value object rather than ambient globals, passed in by the
/// caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Process samples in parallel across a rayon worker pool. Per-sample
    /// semantics are unchanged: output directories never collide and a
    /// failing worker does not cancel the others.
    pub parallel: bool,
}

/// Lists the sample directories under an input root.
///
/// Samples are the immediate sub-directories of `input_root`, ordered
/// lexicographically by directory name so that repeated runs visit them in
/// the same order and produce reproducible partial-failure reports.
///
/// # Arguments
///
/// * `input_root` - The dataset root directory.
///
/// # Returns
///
/// The ordered sample directories, or an IO error if the root cannot be
/// listed (the one condition that aborts a batch).
pub fn discover_samples(input_root: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut samples: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(input_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            samples.push(entry.path());
        }
    }
    samples.sort();
    Ok(samples)
}

/// The two-stage batch pipeline over pluggable collaborators.
#[derive(Debug)]
pub struct BatchPipeline<R, S, A> {
    reader: R,
    segmenter: S,
    annotator: A,
    options: PipelineOptions,
}

impl<R, S, A> BatchPipeline<R, S, A>
where
    R: VolumeReader + Sync,
    S: CellSegmenter + Sync,
    A: CellAnnotator + Sync,
{
    /// Creates a pipeline over the given collaborators with default options.
    ///
    /// # Arguments
    ///
    /// * `reader` - Volume reader collaborator.
    /// * `segmenter` - Segmentation collaborator.
    /// * `annotator` - Annotation collaborator.
    pub fn new(reader: R, segmenter: S, annotator: A) -> Self {
        Self {
            reader,
            segmenter,
            annotator,
            options: PipelineOptions::default(),
        }
    }

    /// Replaces the orchestrator options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Processes one sample directory end to end.
    ///
    /// Every failure inside the stages is caught here and recorded on the
    /// returned record; this function never propagates a per-sample error.
    /// Files written before a failure stay on disk, but the failed status
    /// marks them as not trustworthy.
    ///
    /// # Arguments
    ///
    /// * `sample_dir` - The sample's input directory.
    /// * `output_root` - Root directory for per-sample output bundles.
    ///
    /// # Returns
    ///
    /// The sample's record in a terminal state.
    pub fn process_sample(&self, sample_dir: &Path, output_root: &Path) -> SampleRecord {
        let sample_id = sample_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| sample_dir.display().to_string());
        let output_dir = output_root.join(&sample_id);
        let mut record = SampleRecord::pending(sample_id, sample_dir, output_dir);

        info!(sample = %record.sample_id, "processing sample");
        match self.run_stages(&mut record) {
            Ok(()) => {
                record.mark_annotated();
                info!(sample = %record.sample_id, status = %record.status, "sample complete");
            }
            Err(err) => {
                let message = err.to_string();
                error!(sample = %record.sample_id, error = %message, "sample failed");
                record.mark_failed(message);
            }
        }
        record
    }

    /// Runs the segmentation and annotation stages for one sample,
    /// propagating the first error to the sample boundary.
    fn run_stages(&self, record: &mut SampleRecord) -> PipelineResult<()> {
        let config_path = find_config_file(&record.input_dir)?;
        let config = SampleConfig::load(&config_path)?;
        let markers = config.marker_names().map_err(PipelineError::from)?;

        let image_path = record.input_dir.join(&config.image_path);
        let volume = self.reader.read_volume(&image_path)?;
        info!(
            sample = %record.sample_id,
            shape = ?volume.shape(),
            "volume loaded"
        );

        let primary = config.primary_channel();
        let secondary = config.secondary_channel();
        info!(
            sample = %record.sample_id,
            primary = %primary.name,
            primary_index = primary.number,
            secondary = %secondary.name,
            secondary_index = secondary.number,
            "selected channels"
        );

        let planes = select_channel_planes(&volume, &[primary.number, secondary.number])?;
        let composite = build_composite(&planes[0], &planes[1])?;

        fs::create_dir_all(&record.output_dir)?;
        write_channel_preview(
            &planes[0],
            &planes[1],
            &record
                .output_dir
                .join(format!("{}_channel_preview.png", record.sample_id)),
        )?;

        let mask = self
            .segmenter
            .segment(&composite, config.use_wsi)
            .map_err(|e| as_collaborator(CollaboratorStage::Segmentation, e))?;
        if mask.dimensions() != composite.dimensions() {
            return Err(PipelineError::collaborator(
                CollaboratorStage::Segmentation,
                format!(
                    "mask dimensions {:?} do not match composite {:?}",
                    mask.dimensions(),
                    composite.dimensions()
                ),
            ));
        }

        let mask_path = record
            .output_dir
            .join(format!("{}_segmentation_mask.tiff", record.sample_id));
        write_mask_tiff(&mask, &mask_path)?;
        record.mark_segmented();
        info!(
            sample = %record.sample_id,
            status = %record.status,
            cells = mask.cell_count(),
            "segmentation mask written"
        );

        let labels = self
            .annotator
            .annotate(&volume, &mask, &markers, config.mpp)
            .map_err(|e| as_collaborator(CollaboratorStage::Annotation, e))?;
        if labels.len() as u32 != mask.cell_count() {
            warn!(
                sample = %record.sample_id,
                labels = labels.len(),
                cells = mask.cell_count(),
                "annotator returned a different number of labels than mask cells"
            );
        }

        write_cell_type_table(
            &labels,
            &record
                .output_dir
                .join(format!("{}_cell_type_labels.csv", record.sample_id)),
        )?;
        write_population_table(
            &population_summary(&labels),
            &record
                .output_dir
                .join(format!("{}_population_summary.csv", record.sample_id)),
        )?;

        Ok(())
    }

    /// Runs the pipeline over every sample under the input root.
    ///
    /// The run never aborts early: an error in one sample is recorded in
    /// the summary and the remaining samples are still attempted. Only a
    /// missing or unreadable input root fails the whole batch.
    ///
    /// # Arguments
    ///
    /// * `input_root` - The dataset root directory.
    /// * `output_root` - Root directory for per-sample output bundles.
    ///
    /// # Returns
    ///
    /// The aggregate run summary.
    pub fn run_batch(
        &self,
        input_root: &Path,
        output_root: &Path,
    ) -> PipelineResult<PipelineRunSummary> {
        let samples = discover_samples(input_root)?;
        fs::create_dir_all(output_root)?;
        info!(samples = samples.len(), parallel = self.options.parallel, "starting batch");

        let records: Vec<SampleRecord> = if self.options.parallel {
            samples
                .par_iter()
                .map(|dir| self.process_sample(dir, output_root))
                .collect()
        } else {
            samples
                .iter()
                .map(|dir| self.process_sample(dir, output_root))
                .collect()
        };

        let mut summary = PipelineRunSummary::new();
        for record in &records {
            summary.record(record);
        }
        Ok(summary)
    }
}

/// Wraps a collaborator-raised error, preserving an already-typed
/// collaborator error and capturing any other message verbatim.
fn as_collaborator(stage: CollaboratorStage, error: PipelineError) -> PipelineError {
    match error {
        already @ PipelineError::Collaborator { .. } => already,
        other => PipelineError::collaborator(stage, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellMask, ImageVolume, SampleStatus};
    use crate::processors::CompositeImage;
    use crate::utils::TiffVolumeReader;
    use ndarray::Array2;
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use tempfile::TempDir;
    use tiff::encoder::{colortype, TiffEncoder};

    /// Segmenter double: labels the top-left quadrant 1 and the rest 2.
    struct QuadrantSegmenter;

    impl CellSegmenter for QuadrantSegmenter {
        fn segment(&self, composite: &CompositeImage, _use_wsi: bool) -> PipelineResult<CellMask> {
            let (height, width) = composite.dimensions();
            let labels = Array2::from_shape_fn((height, width), |(y, x)| {
                if y < height / 2 && x < width / 2 {
                    1
                } else {
                    2
                }
            });
            Ok(CellMask::new(labels))
        }
    }

    /// Annotator double: alternates two fixed type names by cell id.
    struct AlternatingAnnotator;

    impl CellAnnotator for AlternatingAnnotator {
        fn annotate(
            &self,
            _volume: &ImageVolume,
            mask: &CellMask,
            _markers: &[String],
            _mpp: f64,
        ) -> PipelineResult<Vec<String>> {
            Ok((1..=mask.cell_count())
                .map(|id| {
                    if id % 2 == 1 {
                        "Epithelial".to_string()
                    } else {
                        "Immune".to_string()
                    }
                })
                .collect())
        }
    }

    struct FailingSegmenter;

    impl CellSegmenter for FailingSegmenter {
        fn segment(&self, _composite: &CompositeImage, _use_wsi: bool) -> PipelineResult<CellMask> {
            Err(PipelineError::collaborator(
                CollaboratorStage::Segmentation,
                "model exploded",
            ))
        }
    }

    const CONFIG: &str = "\
image_path: image.ome.tiff
use_wsi: false
MPP: 0.5
channels:
  - name: Hoechst1
    number: 0
  - name: Cytokeratin
    number: 2
markers:
  - CD4
";

    /// Writes a 4-channel, 8x8 grayscale multi-page TIFF.
    fn write_test_volume(path: &Path) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(BufWriter::new(file)).unwrap();
        for channel in 0u16..4 {
            let samples: Vec<u16> = (0..64).map(|i| channel * 100 + i).collect();
            encoder
                .write_image::<colortype::Gray16>(8, 8, &samples)
                .unwrap();
        }
    }

    fn write_sample(root: &Path, name: &str, config: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let mut file = File::create(dir.join("config.yaml")).unwrap();
        file.write_all(config.as_bytes()).unwrap();
        write_test_volume(&dir.join("image.ome.tiff"));
    }

    fn pipeline() -> BatchPipeline<TiffVolumeReader, QuadrantSegmenter, AlternatingAnnotator> {
        BatchPipeline::new(TiffVolumeReader::new(), QuadrantSegmenter, AlternatingAnnotator)
    }

    #[test]
    fn process_sample_writes_the_output_bundle() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_sample(input.path(), "sample1", CONFIG);

        let record = pipeline().process_sample(&input.path().join("sample1"), output.path());
        assert_eq!(record.status, SampleStatus::Annotated);
        assert!(record.error.is_none());

        let bundle = output.path().join("sample1");
        assert!(bundle.join("sample1_segmentation_mask.tiff").exists());
        assert!(bundle.join("sample1_channel_preview.png").exists());
        assert!(bundle.join("sample1_cell_type_labels.csv").exists());
        assert!(bundle.join("sample1_population_summary.csv").exists());

        let cells =
            fs::read_to_string(bundle.join("sample1_cell_type_labels.csv")).unwrap();
        assert!(cells.starts_with("Cell_ID,Cell_Name\n1,Epithelial\n2,Immune\n"));
    }

    #[test]
    fn process_sample_is_idempotent() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_sample(input.path(), "sample1", CONFIG);

        let pipeline = pipeline();
        pipeline.process_sample(&input.path().join("sample1"), output.path());
        let bundle = output.path().join("sample1");
        let cells_first = fs::read(bundle.join("sample1_cell_type_labels.csv")).unwrap();
        let pop_first = fs::read(bundle.join("sample1_population_summary.csv")).unwrap();

        pipeline.process_sample(&input.path().join("sample1"), output.path());
        assert_eq!(
            cells_first,
            fs::read(bundle.join("sample1_cell_type_labels.csv")).unwrap()
        );
        assert_eq!(
            pop_first,
            fs::read(bundle.join("sample1_population_summary.csv")).unwrap()
        );
    }

    #[test]
    fn failed_segmentation_is_contained_in_the_record() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_sample(input.path(), "sample1", CONFIG);

        let pipeline =
            BatchPipeline::new(TiffVolumeReader::new(), FailingSegmenter, AlternatingAnnotator);
        let record = pipeline.process_sample(&input.path().join("sample1"), output.path());

        assert_eq!(record.status, SampleStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("model exploded"));
    }

    #[test]
    fn discovery_is_sorted_and_deterministic() {
        let input = TempDir::new().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            fs::create_dir(input.path().join(name)).unwrap();
        }
        File::create(input.path().join("stray_file")).unwrap();

        let first = discover_samples(input.path()).unwrap();
        let second = discover_samples(input.path()).unwrap();
        assert_eq!(first, second);

        let names: Vec<_> = first
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn one_bad_sample_does_not_halt_the_batch() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        for name in ["s1", "s2", "s4", "s5"] {
            write_sample(input.path(), name, CONFIG);
        }
        // s3's configuration is malformed: only one channel.
        write_sample(
            input.path(),
            "s3",
            "channels:\n  - name: DAPI\n    number: 0\n",
        );

        let summary = pipeline().run_batch(input.path(), output.path()).unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].sample_id, "s3");
        assert!(summary.failed[0].error.contains("at least two channels"));

        // Samples after the bad one were still attempted.
        assert!(output
            .path()
            .join("s4")
            .join("s4_segmentation_mask.tiff")
            .exists());
        assert!(output
            .path()
            .join("s5")
            .join("s5_segmentation_mask.tiff")
            .exists());
    }

    #[test]
    fn ambiguous_config_fails_only_that_sample() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        write_sample(input.path(), "s1", CONFIG);
        write_sample(input.path(), "s2", CONFIG);
        File::create(input.path().join("s2").join("extraConfig.json")).unwrap();

        let summary = pipeline().run_batch(input.path(), output.path()).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed[0].sample_id, "s2");
        assert!(summary.failed[0].error.contains("expected exactly one"));
    }

    #[test]
    fn missing_input_root_aborts_the_batch() {
        let output = TempDir::new().unwrap();
        let result = pipeline().run_batch(Path::new("/nonexistent/input"), output.path());
        assert!(result.is_err());
    }

    #[test]
    fn parallel_mode_preserves_summary_and_isolation() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        for name in ["s1", "s2", "s3"] {
            write_sample(input.path(), name, CONFIG);
        }
        fs::remove_file(input.path().join("s2").join("config.yaml")).unwrap();

        let summary = pipeline()
            .with_options(PipelineOptions { parallel: true })
            .run_batch(input.path(), output.path())
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed[0].sample_id, "s2");
    }

    #[test]
    fn geometry_failure_is_reported_per_sample() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        // Channel index 40 exceeds every axis of the 4x8x8 test volume.
        let config = "\
image_path: image.ome.tiff
channels:
  - name: A
    number: 0
  - name: B
    number: 40
";
        write_sample(input.path(), "s1", config);

        let summary = pipeline().run_batch(input.path(), output.path()).unwrap();
        assert_eq!(summary.succeeded, 0);
        assert!(summary.failed[0].error.contains("cannot locate channel axis"));
    }
}
