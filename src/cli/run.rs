use affold::runner::{compress_output_folder, run_job, RunConfig};
use affold::{build_job, parse_seeds, write_job_file, SessionSpec};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, trace, warn};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Path to the job session file (JSON)
    #[arg(short, long)]
    session: PathBuf,

    /// AlphaFold input directory that will receive fold_input.json
    #[arg(short, long = "input-dir")]
    input_dir: PathBuf,

    /// AlphaFold output directory
    #[arg(short, long = "output-dir")]
    output_dir: PathBuf,

    /// Model parameters directory
    #[arg(short, long = "model-dir")]
    model_dir: PathBuf,

    /// Genetic databases directory
    #[arg(short, long = "db-dir")]
    db_dir: PathBuf,

    /// Skip the (CPU-bound, time-consuming) data pipeline phase
    #[arg(long = "no-data-pipeline", default_value_t = false)]
    no_data_pipeline: bool,

    /// Skip the (GPU-bound) inference phase
    #[arg(long = "no-inference", default_value_t = false)]
    no_inference: bool,

    /// Custom compilation bucket sizes (comma-separated), e.g. 256,512,1024
    #[arg(short, long)]
    buckets: Option<String>,

    /// Write a ZIP archive of the job's output directory to this path
    #[arg(short = 'a', long)]
    archive: Option<PathBuf>,
}

pub(crate) fn run(args: &Args) {
    trace!("{args:?}");

    let session = match SessionSpec::from_file(&args.session) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to load the session file: {e:#}");
            return;
        }
    };

    let spec = match build_job(&session) {
        Ok(spec) => spec,
        Err(e) => {
            error!("Failed to build the job document: {e:#}");
            return;
        }
    };
    if let Err(e) = write_job_file(&spec, &args.input_dir) {
        error!("Error saving the job document: {e:#}");
        return;
    }

    // Bucket strings follow the seed convention: non-digit tokens dropped,
    // an empty result rejects the argument.
    let buckets: Vec<u32> = match &args.buckets {
        Some(raw) => {
            let buckets: Vec<u32> = parse_seeds(raw).iter().map(|&b| b as u32).collect();
            if buckets.is_empty() {
                error!("Please provide at least one valid bucket size.");
                return;
            }
            buckets
        }
        None => vec![],
    };

    let config = RunConfig {
        input_dir: args.input_dir.clone(),
        output_dir: args.output_dir.clone(),
        model_dir: args.model_dir.clone(),
        db_dir: args.db_dir.clone(),
        run_data_pipeline: !args.no_data_pipeline,
        run_inference: !args.no_inference,
        buckets,
    };

    info!("AlphaFold 3 is running...");
    let outcome = match run_job(&config, &session.name, None) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed to run the prediction: {e:#}");
            return;
        }
    };
    info!("AlphaFold 3 execution completed.");

    if !outcome.artifacts_present {
        error!(
            "AlphaFold 3 execution did not complete successfully (no output at {}). Please check the logs.",
            outcome.artifacts_dir.display()
        );
        return;
    }
    info!("Results are saved in: {}", outcome.artifacts_dir.display());

    if let Some(archive) = &args.archive {
        match compress_output_folder(&outcome.artifacts_dir) {
            Ok(bytes) => match std::fs::write(archive, bytes) {
                Ok(()) => info!("Results archive written to {}", archive.display()),
                Err(e) => error!("Failed to write the results archive: {e}"),
            },
            Err(e) => warn!("Failed to compress the output folder: {e:#}"),
        }
    }
}
