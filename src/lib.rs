#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

//! # Affold Library
//!
//! This library covers the three stages of an AlphaFold 3 prediction
//! workflow: assembling the `fold_input.json` job document from a session
//! description, running the prediction container and probing its output,
//! and extracting/rendering the confidence data of a finished prediction.
//!
//! The prediction itself is entirely delegated to the external AlphaFold 3
//! container; nothing in this crate models structures.

pub mod bonds;
pub mod confidence;
pub mod entities;
pub mod jobspec;
pub mod render;
pub mod runner;
pub mod session;
pub mod summary;
pub mod utils;

// Re-export key public types
pub use bonds::{collect_bond, Bond, BondAtom};
pub use confidence::{
    extract_residue_confidence, extract_summary_confidences, load_structure,
    unique_chain_ids, LigandAtomConfidence, PaeMatrix, ResidueConfidence,
    ResidueConfidenceMap,
};
pub use entities::{collector_for, SequenceEntry};
pub use jobspec::{build_job, parse_seeds, write_job_file, JobSpecification};
pub use render::{chain_boundaries, pae_svg, plddt_color, render_report};
pub use runner::{compress_output_folder, job_output_dir, run_job, PredictionOutcome, RunConfig};
pub use session::{EntityKind, SessionSpec};
pub use summary::{partition_summary, SummaryTables};
pub use utils::{find_file_by_suffix, slugify, write_df_to_file, DataFrameFileType};
