// ========================================================================================
//
//                            The batch orchestrator: genecn
//
// ========================================================================================
//
// The binary owns the application lifecycle: argument parsing, logger setup,
// and driving the batch over the input directory. All real work lives in the
// library; this file decides what to run and what the process exit code says
// about it.

use clap::Parser;
use genecn::batch::{BatchConfig, run_batch};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

// ========================================================================================
//                         Command-line interface definition
// ========================================================================================

#[derive(Parser, Debug)]
#[clap(
    name = "genecn",
    version,
    about = "Per-gene copy-number matrices from segmented copy-number calls."
)]
struct Args {
    /// Directory of cohort segment files (tab-delimited, one file per cancer type).
    #[clap(short = 'i', long, value_name = "DIR")]
    input_dir: PathBuf,

    /// Gene annotation table with Approved Symbol, Chromosome, and txStart columns.
    #[clap(short = 'a', long, value_name = "FILE")]
    annotation: PathBuf,

    /// Directory for the per-cohort .cnv.csv outputs.
    #[clap(short = 'o', long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Worker threads for cohort-level parallelism (0 = process files sequentially).
    #[clap(short = 'w', long, default_value_t = 0)]
    workers: usize,
}

// ========================================================================================
//                           The main orchestration logic
// ========================================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let start_time = Instant::now();
    let args = Args::parse();

    let config = BatchConfig {
        input_dir: args.input_dir,
        annotation: args.annotation,
        output_dir: args.output_dir,
        workers: args.workers,
    };

    let summary = match run_batch(&config) {
        Ok(summary) => summary,
        Err(err) => {
            log::error!("{err}");
            process::exit(1);
        }
    };

    log::info!(
        "{} cohorts written, {} failed, in {:.2?}",
        summary.processed,
        summary.failed,
        start_time.elapsed()
    );
    if summary.failed > 0 {
        process::exit(1);
    }
}
