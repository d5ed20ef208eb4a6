//! Extraction of confidence data from AlphaFold 3 result artifacts: the
//! structural model (per-atom pLDDT stored in the B-factor column), the
//! per-token PAE matrix, and the open-schema summary metrics.

use anyhow::{anyhow, bail, Context};
use pdbtbx::*;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Canonical name of the PAE field in the confidences document.
pub const PAE_FIELD: &str = "pae";
/// Legacy field name emitted by older pipelines, read as a fallback.
pub const PAE_FIELD_LEGACY: &str = "predicted_aligned_error";
/// Field holding one chain id per token, parallel to the PAE matrix.
pub const TOKEN_CHAIN_IDS_FIELD: &str = "token_chain_ids";

/// Average pLDDT of one standard residue.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueConfidence {
    /// Residue name, e.g. "ALA"
    pub resn: String,
    /// Average of the residue's atom pLDDT scores (0-100)
    pub avg_plddt: f64,
}

/// Unaveraged pLDDT of one ligand (heteroatom) atom.
#[derive(Debug, Clone, PartialEq)]
pub struct LigandAtomConfidence {
    /// Chain id
    pub chain: String,
    /// Residue sequence number
    pub resi: isize,
    /// Residue name
    pub resn: String,
    /// Atom name
    pub atomn: String,
    /// pLDDT score of this atom (0-100)
    pub plddt: f64,
}

/// Residue confidences keyed by (chain id, residue sequence number).
pub type ResidueConfidenceMap = BTreeMap<(String, isize), ResidueConfidence>;

/// Open an atomic data file with [`pdbtbx::open`], keeping heteroatom
/// (ligand) residues in the model.
pub fn load_structure(input_file: &str) -> anyhow::Result<(PDB, Vec<PDBError>)> {
    pdbtbx::ReadOptions::default()
        .set_only_atomic_coords(true)
        .set_level(pdbtbx::StrictnessLevel::Loose)
        .read(input_file)
        .map_err(|errors| {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            anyhow!("failed to parse structure {input_file}:\n{joined}")
        })
}

/// Walk every atom of every residue of every chain in the first model,
/// averaging pLDDT per standard residue and keeping heteroatom scores
/// per atom.
///
/// Residues without any standard atom never enter the residue map.
pub fn extract_residue_confidence(
    pdb: &PDB,
) -> (ResidueConfidenceMap, Vec<LigandAtomConfidence>) {
    let mut residues = ResidueConfidenceMap::new();
    let mut ligands = Vec::new();

    let Some(model) = pdb.models().next() else {
        return (residues, ligands);
    };

    for chain in model.chains() {
        for residue in chain.residues() {
            let (resi, _) = residue.id();
            let resn = residue.name().unwrap_or("").to_string();

            let mut plddts: Vec<f64> = Vec::new();
            for atom in residue.atoms() {
                if atom.hetero() {
                    ligands.push(LigandAtomConfidence {
                        chain: chain.id().to_string(),
                        resi,
                        resn: resn.clone(),
                        atomn: atom.name().to_string(),
                        plddt: atom.b_factor(),
                    });
                } else {
                    plddts.push(atom.b_factor());
                }
            }

            if !plddts.is_empty() {
                let avg_plddt = plddts.iter().sum::<f64>() / plddts.len() as f64;
                residues.insert(
                    (chain.id().to_string(), resi),
                    ResidueConfidence { resn, avg_plddt },
                );
            }
        }
    }

    (residues, ligands)
}

/// The per-token error matrix and its parallel chain-id list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaeMatrix {
    /// Square matrix of predicted aligned errors, one row/column per token.
    /// Values are narrowed to f32: the artifact encodes PAE at 0.25 Å steps
    /// capped at 31.75, so nothing is lost.
    pub values: Vec<Vec<f32>>,
    /// One chain id per token
    pub token_chain_ids: Vec<String>,
}

impl PaeMatrix {
    /// Number of tokens (matrix rows).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the confidences document held no PAE data.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a confidences document. A missing PAE or chain-id field yields
    /// empty data rather than an error; malformed JSON is an error for the
    /// caller to report.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let data: Value =
            serde_json::from_str(raw).context("failed to parse the confidences document")?;

        let field = if data.get(PAE_FIELD).is_some() {
            PAE_FIELD
        } else {
            debug!("No '{PAE_FIELD}' field, falling back to '{PAE_FIELD_LEGACY}'");
            PAE_FIELD_LEGACY
        };
        let values: Vec<Vec<f32>> = match data.get(field).and_then(Value::as_array) {
            Some(rows) => rows
                .iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| {
                            cells
                                .iter()
                                .filter_map(Value::as_f64)
                                .map(|v| v as f32)
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect(),
            None => {
                warn!("Confidences document has no PAE matrix");
                vec![]
            }
        };

        let token_chain_ids: Vec<String> =
            match data.get(TOKEN_CHAIN_IDS_FIELD).and_then(Value::as_array) {
                Some(ids) => ids
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.to_string())
                    .collect(),
                None => {
                    warn!("Confidences document has no '{TOKEN_CHAIN_IDS_FIELD}' field");
                    vec![]
                }
            };

        Ok(PaeMatrix {
            values,
            token_chain_ids,
        })
    }

    /// Read and parse a confidences document from disk.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

/// Read the summary confidences document. The schema is open; values pass
/// through as parsed JSON (numeric arrays are already plain nested lists).
pub fn extract_summary_confidences(
    path: &Path,
) -> anyhow::Result<serde_json::Map<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let data: Value =
        serde_json::from_str(&raw).context("failed to parse the summary confidences document")?;
    match data {
        Value::Object(map) => Ok(map),
        _ => bail!("summary confidences document is not a JSON object"),
    }
}

/// Sorted, deduplicated chain ids from the per-token chain-id list.
pub fn unique_chain_ids(token_chain_ids: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = token_chain_ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}
