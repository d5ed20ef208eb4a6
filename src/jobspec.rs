//! Assembly and serialization of the AlphaFold 3 job document.
//!
//! The document's top-level key order is fixed by struct field order:
//! `name`, `modelSeeds`, `sequences`, `dialect`, `version`, then
//! `bondedAtomPairs` and `userCCD` only when present. Serializing and
//! re-parsing a built document yields an identical structure.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::bonds::{collect_bond, Bond};
use crate::entities::{collector_for, SequenceEntry};
use crate::session::SessionSpec;

/// Input dialect constant expected by the AlphaFold 3 runtime.
pub const DIALECT: &str = "alphafold3";
/// Input schema version constant.
pub const VERSION: u32 = 1;
/// Fixed filename of the job document inside the input directory.
pub const JOB_FILENAME: &str = "fold_input.json";

/// The serialized job document handed to AlphaFold 3.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobSpecification {
    /// Descriptive job name
    pub name: String,
    /// Integer model seeds, at least one
    pub model_seeds: Vec<i64>,
    /// Entity entries, one per copy, each wrapped under its kind
    pub sequences: Vec<SequenceEntry>,
    /// Always [`DIALECT`]
    pub dialect: String,
    /// Always [`VERSION`]
    pub version: u32,
    /// Covalent bonds between entities, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bonded_atom_pairs: Option<Vec<Bond>>,
    /// User-provided CCD text, omitted when empty
    #[serde(rename = "userCCD", skip_serializing_if = "Option::is_none", default)]
    pub user_ccd: Option<String>,
}

impl JobSpecification {
    /// Serialize to the pretty-printed JSON handed to the container.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize job document")
    }
}

/// Parse a comma separated seed string into integers, discarding non-digit
/// tokens. An empty result is the caller's hard validation error.
pub fn parse_seeds(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(|tok| tok.trim())
        .filter(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|tok| tok.parse::<i64>().ok())
        .collect()
}

/// Split a comma separated id list, trimming whitespace around each id.
fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Assemble the job document from a session.
///
/// Invalid entities and bonds are logged and excluded while the rest of the
/// session is still processed; an empty seed list or an empty sequence list
/// is a hard error.
pub fn build_job(session: &SessionSpec) -> anyhow::Result<JobSpecification> {
    let model_seeds = parse_seeds(&session.model_seeds);
    if model_seeds.is_empty() {
        bail!("please provide at least one valid model seed");
    }
    debug!("Model seeds: {model_seeds:?}");

    let mut sequences: Vec<SequenceEntry> = Vec::new();
    for (i, entity) in session.entities.iter().enumerate() {
        let Some(entry) = collector_for(entity.kind)(entity) else {
            error!("Entity {} failed validation and was skipped.", i + 1);
            continue;
        };

        let ids = split_ids(&entity.ids);
        if ids.is_empty() {
            error!("Entity {} is missing its id and was skipped.", i + 1);
            continue;
        }
        if ids.len() != entity.copies as usize {
            error!(
                "Entity {}: {} id(s) provided for {} copies; entity skipped.",
                i + 1,
                ids.len(),
                entity.copies
            );
            continue;
        }

        for id in &ids {
            sequences.push(entry.with_id(id));
        }
    }
    if sequences.is_empty() {
        bail!("no valid entities in the session");
    }

    let bonded_atom_pairs: Vec<Bond> = session.bonds.iter().filter_map(collect_bond).collect();

    Ok(JobSpecification {
        name: session.name.clone(),
        model_seeds,
        sequences,
        dialect: DIALECT.to_string(),
        version: VERSION,
        bonded_atom_pairs: (!bonded_atom_pairs.is_empty()).then_some(bonded_atom_pairs),
        user_ccd: (!session.user_ccd.is_empty()).then(|| session.user_ccd.clone()),
    })
}

/// Write the job document to `<input_dir>/fold_input.json`, creating the
/// directory if needed. Failures are returned to the caller for reporting
/// and never abort the process.
pub fn write_job_file(spec: &JobSpecification, input_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(input_dir)
        .with_context(|| format!("failed to create input directory {}", input_dir.display()))?;
    let path = input_dir.join(JOB_FILENAME);
    std::fs::write(&path, spec.to_json()?)
        .with_context(|| format!("failed to write job document {}", path.display()))?;
    info!("Job document saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(json: &str) -> SessionSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn seed_parsing() {
        assert_eq!(parse_seeds("1,2,3"), vec![1, 2, 3]);
        assert_eq!(parse_seeds("1,a,3"), vec![1, 3]);
        assert_eq!(parse_seeds(" 42 "), vec![42]);
        assert!(parse_seeds("").is_empty());
        assert!(parse_seeds("a,b").is_empty());
    }

    #[test]
    fn empty_seed_list_is_a_hard_error() {
        let session = session(
            r#"{"modelSeeds": "a,b",
                "entities": [{"kind": "protein", "ids": "A", "sequence": "ACDE"}]}"#,
        );
        assert!(build_job(&session).is_err());
    }

    #[test]
    fn minimal_protein_job_matches_expected_document() {
        let session = session(
            r#"{"name": "My job", "modelSeeds": "1,2",
                "entities": [{"kind": "protein", "copies": 1, "ids": "A", "sequence": "ACDE"}]}"#,
        );
        let spec = build_job(&session).unwrap();
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            serde_json::json!({
                "name": "My job",
                "modelSeeds": [1, 2],
                "sequences": [{"protein": {"sequence": "ACDE", "id": "A"}}],
                "dialect": "alphafold3",
                "version": 1
            })
        );
    }

    #[test]
    fn top_level_key_order_is_fixed() {
        let session = session(
            r#"{"name": "My job", "modelSeeds": "1",
                "entities": [{"kind": "protein", "ids": "A", "sequence": "ACDE"}]}"#,
        );
        let json = build_job(&session).unwrap().to_json().unwrap();
        let keys: Vec<usize> = ["\"name\"", "\"modelSeeds\"", "\"sequences\"", "\"dialect\"", "\"version\""]
            .iter()
            .map(|k| json.find(k).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn document_round_trips() {
        let session = session(
            r#"{"name": "Complex", "modelSeeds": "7",
                "entities": [
                  {"kind": "protein", "copies": 2, "ids": "A,B", "sequence": "ACDE", "msa": "none"},
                  {"kind": "ligand", "ids": "Z", "ccdCodes": "MG"}
                ],
                "bonds": [{"entityId1": "A", "residueId1": 1, "atomName1": "CA",
                           "entityId2": "Z", "residueId2": 1, "atomName2": "MG"}],
                "userCcd": "data_MY-LIG"}"#,
        );
        let spec = build_job(&session).unwrap();
        let parsed: JobSpecification = serde_json::from_str(&spec.to_json().unwrap()).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn copies_expand_into_one_entry_per_id() {
        let session = session(
            r#"{"modelSeeds": "1",
                "entities": [{"kind": "dna", "copies": 2, "ids": "C, D", "sequence": "GATTACA"}]}"#,
        );
        let spec = build_job(&session).unwrap();
        assert_eq!(spec.sequences.len(), 2);
        assert_eq!(
            serde_json::to_value(&spec.sequences[1]).unwrap(),
            serde_json::json!({"dna": {"sequence": "GATTACA", "id": "D"}})
        );
    }

    #[test]
    fn id_count_mismatch_skips_entity() {
        let session = session(
            r#"{"modelSeeds": "1",
                "entities": [
                  {"kind": "dna", "copies": 2, "ids": "C", "sequence": "GATTACA"},
                  {"kind": "dna", "copies": 1, "ids": "D", "sequence": "GATTACA"}
                ]}"#,
        );
        let spec = build_job(&session).unwrap();
        assert_eq!(spec.sequences.len(), 1);
    }

    #[test]
    fn invalid_ligand_is_excluded_but_job_continues() {
        let session = session(
            r#"{"modelSeeds": "1",
                "entities": [
                  {"kind": "ligand", "ids": "X", "ccdCodes": "MG", "smiles": "CCO"},
                  {"kind": "protein", "ids": "A", "sequence": "ACDE"}
                ]}"#,
        );
        let spec = build_job(&session).unwrap();
        assert_eq!(spec.sequences.len(), 1);
    }

    #[test]
    fn optional_keys_are_absent_when_empty() {
        let session = session(
            r#"{"modelSeeds": "1",
                "entities": [{"kind": "protein", "ids": "A", "sequence": "ACDE"}],
                "bonds": [{"entityId1": "", "atomName1": "", "entityId2": "", "atomName2": ""}]}"#,
        );
        let json = build_job(&session).unwrap().to_json().unwrap();
        assert!(!json.contains("bondedAtomPairs"));
        assert!(!json.contains("userCCD"));
    }

    #[test]
    fn job_file_is_written_under_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let input_dir = dir.path().join("af_input");
        let session = session(
            r#"{"modelSeeds": "1",
                "entities": [{"kind": "protein", "ids": "A", "sequence": "ACDE"}]}"#,
        );
        let spec = build_job(&session).unwrap();
        let path = write_job_file(&spec, &input_dir).unwrap();
        assert_eq!(path.file_name().unwrap(), JOB_FILENAME);
        let parsed: JobSpecification =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, spec);
    }
}
