// ========================================================================================
//                        Cohort batch driver & per-file pipeline
// ========================================================================================
//
// Each cohort file is an independent unit of work: read -> filter -> index ->
// assemble -> write, sharing nothing with other cohorts except the read-only
// annotation. A failing cohort is logged and counted; it never takes the rest
// of the batch down with it, whether the batch runs inline or fanned out
// across a worker pool.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::index::CohortIndex;
use crate::io::{
    AnnotationError, CohortError, cohort_label, discover_cohorts, read_annotation, read_segments,
};
use crate::matrix::write_matrix;
use crate::samples::retain_primary_tumors;
use crate::types::Gene;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error("failed to scan input directory '{}': {source}", path.display())]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create output directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub annotation: PathBuf,
    pub output_dir: PathBuf,
    /// 0 processes cohorts sequentially in the calling thread; N > 0 runs one
    /// cohort per task on a pool of exactly N workers.
    pub workers: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Runs the whole batch. Only run-level problems (unreadable annotation,
/// unusable directories, pool construction) are errors here; per-cohort
/// failures are folded into the summary.
pub fn run_batch(config: &BatchConfig) -> Result<BatchSummary, BatchError> {
    let genes = read_annotation(&config.annotation)?;
    info!("annotation: {} genes with a resolvable location", genes.len());

    let cohorts =
        discover_cohorts(&config.input_dir).map_err(|source| BatchError::InputDir {
            path: config.input_dir.clone(),
            source,
        })?;
    if cohorts.is_empty() {
        info!("no cohort files found in '{}'", config.input_dir.display());
    }

    fs::create_dir_all(&config.output_dir).map_err(|source| BatchError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    let failed: usize = if config.workers == 0 {
        cohorts
            .iter()
            .map(|infile| usize::from(run_one(infile, &genes, &config.output_dir)))
            .sum()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()?;
        pool.install(|| {
            cohorts
                .par_iter()
                .map(|infile| usize::from(run_one(infile, &genes, &config.output_dir)))
                .sum()
        })
    };

    Ok(BatchSummary {
        processed: cohorts.len() - failed,
        failed,
    })
}

/// Returns true if the cohort failed. Failure isolation lives here: the
/// error is consumed, logged with the offending file, and reduced to a count.
fn run_one(infile: &Path, genes: &[Gene], output_dir: &Path) -> bool {
    match process_cohort(infile, genes, output_dir) {
        Ok(out_path) => {
            info!("wrote {}", out_path.display());
            false
        }
        Err(err) => {
            error!("skipping '{}': {err}", infile.display());
            true
        }
    }
}

/// The full pipeline for one cohort file.
pub fn process_cohort(
    infile: &Path,
    genes: &[Gene],
    output_dir: &Path,
) -> Result<PathBuf, CohortError> {
    let label = cohort_label(infile);

    let segments = retain_primary_tumors(read_segments(infile)?);
    let total_segments = segments.len();
    let index = CohortIndex::build(segments);
    info!(
        "{label}: indexed {total_segments} segments across {} patients",
        index.num_patients()
    );

    let out_path = output_dir.join(format!("{label}.cnv.csv"));
    write_matrix(&out_path, genes, &index)?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SEGMENT_HEADER: &str = "Sample\tChromosome\tStart\tEnd\tSegment_Mean\n";
    const ANNOTATION: &str = "Approved Symbol,Chromosome,txStart\nGENE_A,1,50\n";

    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        let input_dir = dir.join("segments");
        let output_dir = dir.join("out");
        let annotation = dir.join("annotation.csv");
        fs::create_dir(&input_dir).expect("create input dir");
        fs::write(&annotation, ANNOTATION).expect("write annotation");
        (input_dir, output_dir, annotation)
    }

    #[test]
    fn corrupt_cohort_does_not_disturb_the_rest() {
        let tmp = tempdir().expect("tempdir");
        let (input_dir, output_dir, annotation) = write_inputs(tmp.path());

        fs::write(
            input_dir.join("GOOD.seg.txt"),
            format!("{SEGMENT_HEADER}P1\t1\t0\t100\t1.0\n"),
        )
        .expect("write good cohort");
        // Inverted range: this cohort must abort before producing output.
        fs::write(
            input_dir.join("BAD.seg.txt"),
            format!("{SEGMENT_HEADER}P1\t1\t500\t100\t1.0\n"),
        )
        .expect("write bad cohort");

        let summary = run_batch(&BatchConfig {
            input_dir,
            annotation,
            output_dir: output_dir.clone(),
            workers: 0,
        })
        .expect("run batch");

        assert_eq!(
            summary,
            BatchSummary {
                processed: 1,
                failed: 1
            }
        );
        assert!(output_dir.join("GOOD.cnv.csv").exists());
        assert!(!output_dir.join("BAD.cnv.csv").exists());
        assert!(!output_dir.join("BAD.cnv.csv.tmp").exists());
    }

    #[test]
    fn worker_pool_produces_the_same_outputs() {
        let tmp = tempdir().expect("tempdir");
        let (input_dir, output_dir, annotation) = write_inputs(tmp.path());

        for cohort in ["ACC", "BRCA", "LUAD"] {
            fs::write(
                input_dir.join(format!("{cohort}.seg.txt")),
                format!("{SEGMENT_HEADER}P1\t1\t0\t100\t1.5\n"),
            )
            .expect("write cohort");
        }

        let summary = run_batch(&BatchConfig {
            input_dir,
            annotation,
            output_dir: output_dir.clone(),
            workers: 2,
        })
        .expect("run batch");

        assert_eq!(
            summary,
            BatchSummary {
                processed: 3,
                failed: 0
            }
        );
        for cohort in ["ACC", "BRCA", "LUAD"] {
            let contents = fs::read_to_string(output_dir.join(format!("{cohort}.cnv.csv")))
                .expect("read output");
            assert_eq!(
                contents,
                "Symbol,Chromosome,Location,P1\n'GENE_A,1,50,1.5\n"
            );
        }
    }

    #[test]
    fn unreadable_annotation_is_fatal_for_the_run() {
        let tmp = tempdir().expect("tempdir");
        let (input_dir, output_dir, _) = write_inputs(tmp.path());

        let err = run_batch(&BatchConfig {
            input_dir,
            annotation: tmp.path().join("nope.csv"),
            output_dir,
            workers: 0,
        })
        .unwrap_err();
        assert!(matches!(err, BatchError::Annotation(_)));
    }

    #[test]
    fn empty_input_directory_is_an_empty_run() {
        let tmp = tempdir().expect("tempdir");
        let (input_dir, output_dir, annotation) = write_inputs(tmp.path());

        let summary = run_batch(&BatchConfig {
            input_dir,
            annotation,
            output_dir,
            workers: 0,
        })
        .expect("run batch");
        assert_eq!(summary, BatchSummary::default());
    }
}
