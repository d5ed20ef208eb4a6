use affold::{build_job, write_job_file, SessionSpec};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, info, trace};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Path to the job session file (JSON)
    #[arg(short, long)]
    session: PathBuf,

    /// AlphaFold input directory that will receive fold_input.json
    #[arg(short, long = "input-dir")]
    input_dir: PathBuf,
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
    info!("Job name set to: {}", session.name);

    let spec = match build_job(&session) {
        Ok(spec) => spec,
        Err(e) => {
            error!("Failed to build the job document: {e:#}");
            return;
        }
    };
    if let Ok(json) = spec.to_json() {
        debug!("Generated JSON:\n{json}");
    }

    if let Err(e) = write_job_file(&spec, &args.input_dir) {
        error!("Error saving the job document: {e:#}");
    }
}
