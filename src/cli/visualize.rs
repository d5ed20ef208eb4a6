use affold::confidence::{
    extract_residue_confidence, extract_summary_confidences, load_structure, unique_chain_ids,
    PaeMatrix,
};
use affold::render::render_report;
use affold::summary::partition_summary;
use affold::utils::{find_file_by_suffix, write_df_to_file, DataFrameFileType};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace, warn};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Job output directory searched for the result artifacts
    #[arg(short, long = "results-dir")]
    results_dir: Option<PathBuf>,

    /// Path to the model.cif structure file (overrides the search)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Path to the confidences.json document (overrides the search)
    #[arg(short, long)]
    confidences: Option<PathBuf>,

    /// Path to the summary_confidences.json document (overrides the search)
    #[arg(short = 'u', long)]
    summary: Option<PathBuf>,

    /// Output directory for the report and metric tables
    #[arg(short, long)]
    output: PathBuf,

    /// Job name shown in the report header
    #[arg(short, long, default_value_t = String::from("AlphaFold 3 prediction"))]
    name: String,

    /// Output file type for the metric tables
    #[arg(short = 't', long, value_enum, default_value_t = DataFrameFileType::Csv)]
    output_format: DataFrameFileType,
}

/// Resolve one required artifact: an explicit path wins, otherwise the
/// results directory is searched by filename suffix.
fn resolve_artifact(
    explicit: &Option<PathBuf>,
    results_dir: &Option<PathBuf>,
    suffix: &str,
) -> Option<PathBuf> {
    explicit
        .clone()
        .or_else(|| find_file_by_suffix(results_dir.as_deref()?, suffix))
}

pub(crate) fn run(args: &Args) {
    trace!("{args:?}");

    let mut missing: Vec<&str> = Vec::new();
    let model = resolve_artifact(&args.model, &args.results_dir, "model.cif");
    let confidences = resolve_artifact(&args.confidences, &args.results_dir, "confidences.json");
    let summary = resolve_artifact(&args.summary, &args.results_dir, "summary_confidences.json");
    if model.is_none() {
        missing.push("model.cif");
    }
    if confidences.is_none() {
        missing.push("confidences.json");
    }
    if summary.is_none() {
        missing.push("summary_confidences.json");
    }
    if !missing.is_empty() {
        error!("Missing files: {}", missing.join(", "));
        return;
    }
    let (model, confidences, summary) = (model.unwrap(), confidences.unwrap(), summary.unwrap());
    debug!("Using artifacts {model:?}, {confidences:?}, {summary:?}");

    let cif_content = match std::fs::read_to_string(&model) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read {}: {e}", model.display());
            return;
        }
    };
    let (residues, ligands) = match load_structure(&model.to_string_lossy()) {
        Ok((pdb, pdb_warnings)) => {
            for e in &pdb_warnings {
                match e.level() {
                    pdbtbx::ErrorLevel::BreakingError => error!("{e}"),
                    pdbtbx::ErrorLevel::InvalidatingError => error!("{e}"),
                    _ => warn!("{e}"),
                }
            }
            extract_residue_confidence(&pdb)
        }
        Err(e) => {
            error!("Failed to extract atom data: {e:#}");
            return;
        }
    };

    // Parse failures on the JSON artifacts degrade to empty data so the
    // rest of the report still renders.
    let pae = match PaeMatrix::from_file(&confidences) {
        Ok(pae) => pae,
        Err(e) => {
            error!("Failed to read the PAE data: {e:#}");
            PaeMatrix::default()
        }
    };
    let summary_data = match extract_summary_confidences(&summary) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to read the summary metrics: {e:#}");
            serde_json::Map::new()
        }
    };

    let chain_ids = unique_chain_ids(&pae.token_chain_ids);
    let tables = partition_summary(&summary_data, &chain_ids);

    if let Err(e) = std::fs::create_dir_all(&args.output) {
        error!("Failed to create output directory {}: {e}", args.output.display());
        return;
    }
    write_tables(&tables, &args.output, args.output_format);

    let report = render_report(&args.name, &residues, &ligands, &cif_content, &pae, &tables);
    let report_path = args.output.join("report.html");
    match std::fs::write(&report_path, report) {
        Ok(()) => info!("Report saved to {}", report_path.display()),
        Err(e) => error!("Failed to write the report: {e}"),
    }
}

fn write_tables(tables: &affold::SummaryTables, output: &Path, format: DataFrameFileType) {
    for (name, df) in &tables.per_chain {
        let mut df = df.clone();
        if let Err(e) = write_df_to_file(&mut df, &output.join(name), format) {
            error!("Failed to write the {name} table: {e:#}");
        }
    }
    for (name, df) in &tables.per_pair {
        let mut df = df.clone();
        if let Err(e) = write_df_to_file(&mut df, &output.join(name), format) {
            error!("Failed to write the {name} table: {e:#}");
        }
    }
    let mut scalars = tables.scalars.clone();
    if let Err(e) = write_df_to_file(&mut scalars, &output.join("summary_metrics"), format) {
        error!("Failed to write the summary metrics table: {e:#}");
    }
}
