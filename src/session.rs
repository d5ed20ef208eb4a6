//! The job session document: a declarative description of everything the user
//! wants folded, loaded from a JSON file.
//!
//! A session is the raw, unvalidated input side of the pipeline. Comma
//! separated fields (`modelSeeds`, `ids`, `ccdCodes`, template indices) are
//! kept as strings here and only parsed when the job document is assembled,
//! so a bad token in one entity never invalidates the rest of the session.
//!
//! ```json
//! {
//!   "name": "My AlphaFold Job",
//!   "modelSeeds": "1,2,3",
//!   "entities": [
//!     { "kind": "protein", "copies": 2, "ids": "A,B", "sequence": "MVLSPADKTN" },
//!     { "kind": "ligand", "ids": "Z", "ccdCodes": "MG" }
//!   ],
//!   "bonds": [
//!     { "entityId1": "A", "residueId1": 1, "atomName1": "CA",
//!       "entityId2": "Z", "residueId2": 1, "atomName2": "MG" }
//!   ]
//! }
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// The closed set of entity kinds accepted by the prediction job.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Amino acid chain
    #[default]
    Protein,
    /// Ribonucleic acid chain
    Rna,
    /// Deoxyribonucleic acid chain
    Dna,
    /// Small molecule, described by CCD codes or a SMILES string
    Ligand,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityKind::Protein => write!(f, "protein"),
            EntityKind::Rna => write!(f, "rna"),
            EntityKind::Dna => write!(f, "dna"),
            EntityKind::Ligand => write!(f, "ligand"),
        }
    }
}

/// How the MSA for a protein or RNA entity should be obtained.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MsaChoice {
    /// Let the data pipeline generate the MSA (the fields are omitted from
    /// the job document entirely).
    #[default]
    Auto,
    /// Run without an MSA (the fields are emitted as empty strings).
    None,
    /// Use the MSA text supplied in the session.
    Upload,
}

/// A chemical modification at a given residue/base position.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModificationInput {
    /// Modification type, e.g. a PTM CCD code for proteins
    #[serde(rename = "type")]
    pub mod_type: String,
    /// One-based position of the modified residue or base
    #[serde(default)]
    pub position: u32,
}

/// A structural template for a protein entity.
///
/// Index lists are comma separated strings; parse failures are reported and
/// result in empty index lists rather than dropping the template.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInput {
    /// Template structure in mmCIF format
    #[serde(default)]
    pub mmcif: String,
    /// Comma separated query residue indices
    #[serde(default)]
    pub query_indices: String,
    /// Comma separated template residue indices
    #[serde(default)]
    pub template_indices: String,
}

/// One entity block of the session.
///
/// Only the fields relevant to `kind` are consulted; the rest are ignored.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntityInput {
    /// Entity kind selecting the collector that handles this block
    #[serde(default)]
    pub kind: EntityKind,
    /// Number of copies of this entity in the complex
    #[serde(default = "default_copies")]
    pub copies: u32,
    /// Comma separated entity ids, one per copy
    #[serde(default)]
    pub ids: String,
    /// Sequence text (protein, RNA and DNA entities)
    #[serde(default)]
    pub sequence: String,
    /// Residue/base modifications
    #[serde(default)]
    pub modifications: Vec<ModificationInput>,
    /// MSA handling (protein and RNA entities)
    #[serde(default)]
    pub msa: MsaChoice,
    /// Unpaired MSA text, used when `msa` is `upload`
    #[serde(default)]
    pub unpaired_msa: String,
    /// Paired MSA text, used when `msa` is `upload` (protein only)
    #[serde(default)]
    pub paired_msa: String,
    /// Structural templates (protein only)
    #[serde(default)]
    pub templates: Vec<TemplateInput>,
    /// Comma separated CCD codes (ligand only, exclusive with `smiles`)
    #[serde(default)]
    pub ccd_codes: String,
    /// SMILES string (ligand only, exclusive with `ccdCodes`)
    #[serde(default)]
    pub smiles: String,
}

fn default_copies() -> u32 {
    1
}

/// One covalent bond between two entities, six scalar fields.
///
/// Residue ids keep their numeric default of 1 when unspecified; the four
/// identifier fields must be non-empty for the bond to be accepted.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BondInput {
    /// Entity id of the first atom
    #[serde(default)]
    pub entity_id1: String,
    /// Residue id of the first atom
    #[serde(default = "default_residue_id")]
    pub residue_id1: i64,
    /// Atom name of the first atom
    #[serde(default)]
    pub atom_name1: String,
    /// Entity id of the second atom
    #[serde(default)]
    pub entity_id2: String,
    /// Residue id of the second atom
    #[serde(default = "default_residue_id")]
    pub residue_id2: i64,
    /// Atom name of the second atom
    #[serde(default)]
    pub atom_name2: String,
}

fn default_residue_id() -> i64 {
    1
}

/// The full session document.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionSpec {
    /// Descriptive job name; also determines the output directory slug
    #[serde(default = "default_job_name")]
    pub name: String,
    /// Comma separated integer seeds
    #[serde(default = "default_seeds")]
    pub model_seeds: String,
    /// Entities to fold
    #[serde(default)]
    pub entities: Vec<EntityInput>,
    /// Optional covalent bonds between entities
    #[serde(default)]
    pub bonds: Vec<BondInput>,
    /// Optional user-provided CCD text in mmCIF format
    #[serde(default)]
    pub user_ccd: String,
}

fn default_job_name() -> String {
    "My AlphaFold Job".to_string()
}

fn default_seeds() -> String {
    "1".to_string()
}

impl SessionSpec {
    /// Load a session from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON in session file {}", path.display()))
    }
}
