//! Canonical sequence entries for the job document, and the per-kind
//! collectors that build them from session input.
//!
//! Each collector has the same signature and is looked up through
//! [`collector_for`], so adding a kind never touches the assembly loop. A
//! collector returns `None` when the entity fails validation; the failure is
//! logged and the entity is excluded while the rest of the job proceeds.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::session::{EntityInput, EntityKind, MsaChoice, TemplateInput};

/// A protein residue modification, keyed the way AlphaFold 3 expects.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PtmModification {
    /// PTM CCD code
    #[serde(rename = "ptmType")]
    pub ptm_type: String,
    /// One-based residue position
    #[serde(rename = "ptmPosition")]
    pub ptm_position: u32,
}

/// A nucleic acid base modification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BaseModification {
    /// Modification CCD code
    #[serde(rename = "modificationType")]
    pub modification_type: String,
    /// One-based base position
    #[serde(rename = "basePosition")]
    pub base_position: u32,
}

/// A structural template attached to a protein entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Template {
    /// Template structure in mmCIF format
    pub mmcif: String,
    /// Query residue indices covered by the template
    #[serde(rename = "queryIndices")]
    pub query_indices: Vec<i64>,
    /// Template residue indices aligned to the query indices
    #[serde(rename = "templateIndices")]
    pub template_indices: Vec<i64>,
}

/// A protein entity entry.
///
/// Field order fixes the serialized key order; `id` is applied last, once per
/// copy, by the job builder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProteinEntry {
    /// Amino acid sequence
    pub sequence: String,
    /// Residue modifications, omitted when empty
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub modifications: Vec<PtmModification>,
    /// Unpaired MSA text; absent means auto-generate
    #[serde(rename = "unpairedMsa", skip_serializing_if = "Option::is_none", default)]
    pub unpaired_msa: Option<String>,
    /// Paired MSA text; absent means auto-generate
    #[serde(rename = "pairedMsa", skip_serializing_if = "Option::is_none", default)]
    pub paired_msa: Option<String>,
    /// Structural templates; absent means auto-search
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub templates: Option<Vec<Template>>,
    /// Entity id, set per copy
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

/// An RNA entity entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RnaEntry {
    /// Nucleotide sequence
    pub sequence: String,
    /// Base modifications, omitted when empty
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub modifications: Vec<BaseModification>,
    /// Unpaired MSA text; absent means auto-generate
    #[serde(rename = "unpairedMsa", skip_serializing_if = "Option::is_none", default)]
    pub unpaired_msa: Option<String>,
    /// Entity id, set per copy
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

/// A DNA entity entry. DNA carries no MSA or template handling.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DnaEntry {
    /// Nucleotide sequence
    pub sequence: String,
    /// Base modifications, omitted when empty
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub modifications: Vec<BaseModification>,
    /// Entity id, set per copy
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

/// A ligand entity entry. Exactly one of `ccd_codes`/`smiles` is set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LigandEntry {
    /// CCD codes identifying the ligand
    #[serde(rename = "ccdCodes", skip_serializing_if = "Option::is_none", default)]
    pub ccd_codes: Option<Vec<String>>,
    /// SMILES string identifying the ligand
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub smiles: Option<String>,
    /// Entity id, set per copy
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

/// One element of the job document's `sequences` list, serialized as a
/// single-key map keyed by its kind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum SequenceEntry {
    /// Protein entity
    #[serde(rename = "protein")]
    Protein(ProteinEntry),
    /// RNA entity
    #[serde(rename = "rna")]
    Rna(RnaEntry),
    /// DNA entity
    #[serde(rename = "dna")]
    Dna(DnaEntry),
    /// Ligand entity
    #[serde(rename = "ligand")]
    Ligand(LigandEntry),
}

impl SequenceEntry {
    /// Clone this entry with the given per-copy id applied.
    pub fn with_id(&self, id: &str) -> SequenceEntry {
        let mut entry = self.clone();
        match &mut entry {
            SequenceEntry::Protein(e) => e.id = Some(id.to_string()),
            SequenceEntry::Rna(e) => e.id = Some(id.to_string()),
            SequenceEntry::Dna(e) => e.id = Some(id.to_string()),
            SequenceEntry::Ligand(e) => e.id = Some(id.to_string()),
        }
        entry
    }
}

/// Uniform signature shared by all entity collectors.
pub type Collector = fn(&EntityInput) -> Option<SequenceEntry>;

/// Look up the collector handling the given entity kind.
pub fn collector_for(kind: EntityKind) -> Collector {
    match kind {
        EntityKind::Protein => collect_protein,
        EntityKind::Rna => collect_rna,
        EntityKind::Dna => collect_dna,
        EntityKind::Ligand => collect_ligand,
    }
}

/// Parse a comma separated index list. A malformed token fails the whole
/// list so templates are never built from partially parsed indices.
fn parse_index_list(raw: &str) -> Result<Vec<i64>, std::num::ParseIntError> {
    raw.split(',')
        .map(|tok| tok.trim())
        .filter(|tok| !tok.is_empty())
        .map(|tok| tok.parse::<i64>())
        .collect()
}

fn collect_templates(inputs: &[TemplateInput]) -> Vec<Template> {
    inputs
        .iter()
        .map(|t| {
            let (query_indices, template_indices) =
                match (parse_index_list(&t.query_indices), parse_index_list(&t.template_indices)) {
                    (Ok(q), Ok(ti)) => (q, ti),
                    _ => {
                        error!("Indices lists should be integers separated by commas.");
                        (vec![], vec![])
                    }
                };
            Template {
                mmcif: t.mmcif.clone(),
                query_indices,
                template_indices,
            }
        })
        .collect()
}

/// Build a protein entry.
///
/// When any of modifications, explicit MSA text, the no-MSA choice, or
/// templates is present, the MSA fields default to empty strings and
/// `templates` defaults to an empty list so the emitted document keeps a
/// stable shape.
pub fn collect_protein(input: &EntityInput) -> Option<SequenceEntry> {
    let (mut unpaired_msa, mut paired_msa) = match input.msa {
        MsaChoice::Upload => (
            Some(input.unpaired_msa.clone()),
            Some(input.paired_msa.clone()),
        ),
        MsaChoice::None => (Some(String::new()), Some(String::new())),
        MsaChoice::Auto => (None, None),
    };

    let templates = collect_templates(&input.templates);
    let templates = if !templates.is_empty() || unpaired_msa.is_some() || paired_msa.is_some() {
        unpaired_msa.get_or_insert_with(String::new);
        paired_msa.get_or_insert_with(String::new);
        Some(templates)
    } else {
        None
    };

    let modifications = input
        .modifications
        .iter()
        .map(|m| PtmModification {
            ptm_type: m.mod_type.clone(),
            ptm_position: m.position,
        })
        .collect();

    Some(SequenceEntry::Protein(ProteinEntry {
        sequence: input.sequence.clone(),
        modifications,
        unpaired_msa,
        paired_msa,
        templates,
        id: None,
    }))
}

/// Build an RNA entry. Same MSA defaulting as proteins, without templates.
pub fn collect_rna(input: &EntityInput) -> Option<SequenceEntry> {
    let unpaired_msa = match input.msa {
        MsaChoice::Upload => Some(input.unpaired_msa.clone()),
        MsaChoice::None => Some(String::new()),
        MsaChoice::Auto => None,
    };

    let modifications = input
        .modifications
        .iter()
        .map(|m| BaseModification {
            modification_type: m.mod_type.clone(),
            base_position: m.position,
        })
        .collect();

    Some(SequenceEntry::Rna(RnaEntry {
        sequence: input.sequence.clone(),
        modifications,
        unpaired_msa,
        id: None,
    }))
}

/// Build a DNA entry.
pub fn collect_dna(input: &EntityInput) -> Option<SequenceEntry> {
    let modifications = input
        .modifications
        .iter()
        .map(|m| BaseModification {
            modification_type: m.mod_type.clone(),
            base_position: m.position,
        })
        .collect();

    Some(SequenceEntry::Dna(DnaEntry {
        sequence: input.sequence.clone(),
        modifications,
        id: None,
    }))
}

/// Build a ligand entry. Exactly one of CCD codes or SMILES must be given;
/// both or neither is a validation failure.
pub fn collect_ligand(input: &EntityInput) -> Option<SequenceEntry> {
    let ccd_codes = input.ccd_codes.trim();
    let smiles = input.smiles.trim();

    if !ccd_codes.is_empty() && !smiles.is_empty() {
        error!("Ligand provided both CCD codes and a SMILES string.");
        return None;
    }
    if ccd_codes.is_empty() && smiles.is_empty() {
        error!("Ligand requires either CCD codes or a SMILES string.");
        return None;
    }

    let entry = if !ccd_codes.is_empty() {
        let codes: Vec<String> = ccd_codes
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        debug!("Ligand CCD codes: {codes:?}");
        LigandEntry {
            ccd_codes: Some(codes),
            smiles: None,
            id: None,
        }
    } else {
        debug!("Ligand SMILES: {smiles}");
        LigandEntry {
            ccd_codes: None,
            smiles: Some(smiles.to_string()),
            id: None,
        }
    };

    Some(SequenceEntry::Ligand(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ModificationInput;

    fn ligand_input(ccd_codes: &str, smiles: &str) -> EntityInput {
        EntityInput {
            kind: EntityKind::Ligand,
            ccd_codes: ccd_codes.to_string(),
            smiles: smiles.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn ligand_with_ccd_codes() {
        let entry = collect_ligand(&ligand_input("MG", "")).unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"ligand": {"ccdCodes": ["MG"]}})
        );
    }

    #[test]
    fn ligand_ccd_codes_are_split_and_trimmed() {
        let entry = collect_ligand(&ligand_input("ATP, MG", "")).unwrap();
        let SequenceEntry::Ligand(ligand) = entry else {
            panic!("expected a ligand entry");
        };
        assert_eq!(ligand.ccd_codes, Some(vec!["ATP".to_string(), "MG".to_string()]));
        assert_eq!(ligand.smiles, None);
    }

    #[test]
    fn ligand_with_both_identifiers_is_rejected() {
        assert!(collect_ligand(&ligand_input("MG", "CCO")).is_none());
    }

    #[test]
    fn ligand_with_neither_identifier_is_rejected() {
        assert!(collect_ligand(&ligand_input("", "")).is_none());
    }

    #[test]
    fn protein_with_auto_msa_omits_msa_keys() {
        let input = EntityInput {
            kind: EntityKind::Protein,
            sequence: "ACDE".to_string(),
            ..Default::default()
        };
        let entry = collect_protein(&input).unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"protein": {"sequence": "ACDE"}})
        );
    }

    #[test]
    fn protein_without_msa_keeps_stable_shape() {
        let input = EntityInput {
            kind: EntityKind::Protein,
            sequence: "ACDE".to_string(),
            msa: MsaChoice::None,
            ..Default::default()
        };
        let entry = collect_protein(&input).unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"protein": {
                "sequence": "ACDE",
                "unpairedMsa": "",
                "pairedMsa": "",
                "templates": []
            }})
        );
    }

    #[test]
    fn protein_templates_force_msa_defaults() {
        let input = EntityInput {
            kind: EntityKind::Protein,
            sequence: "ACDE".to_string(),
            templates: vec![TemplateInput {
                mmcif: "data_test".to_string(),
                query_indices: "0, 1, 2".to_string(),
                template_indices: "0,1,2".to_string(),
            }],
            ..Default::default()
        };
        let SequenceEntry::Protein(protein) = collect_protein(&input).unwrap() else {
            panic!("expected a protein entry");
        };
        assert_eq!(protein.unpaired_msa, Some(String::new()));
        assert_eq!(protein.paired_msa, Some(String::new()));
        let templates = protein.templates.unwrap();
        assert_eq!(templates[0].query_indices, vec![0, 1, 2]);
        assert_eq!(templates[0].template_indices, vec![0, 1, 2]);
    }

    #[test]
    fn bad_template_indices_become_empty_lists() {
        let templates = collect_templates(&[TemplateInput {
            mmcif: String::new(),
            query_indices: "1,x,3".to_string(),
            template_indices: "1,2,3".to_string(),
        }]);
        assert!(templates[0].query_indices.is_empty());
        assert!(templates[0].template_indices.is_empty());
    }

    #[test]
    fn rna_modifications_use_base_keys() {
        let input = EntityInput {
            kind: EntityKind::Rna,
            sequence: "ACGU".to_string(),
            modifications: vec![ModificationInput {
                mod_type: "2MG".to_string(),
                position: 1,
            }],
            ..Default::default()
        };
        let entry = collect_rna(&input).unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"rna": {
                "sequence": "ACGU",
                "modifications": [{"modificationType": "2MG", "basePosition": 1}]
            }})
        );
    }

    #[test]
    fn dna_has_no_msa_handling() {
        let input = EntityInput {
            kind: EntityKind::Dna,
            sequence: "GATTACA".to_string(),
            msa: MsaChoice::None,
            ..Default::default()
        };
        let entry = collect_dna(&input).unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"dna": {"sequence": "GATTACA"}})
        );
    }

    #[test]
    fn collector_dispatch_covers_all_kinds() {
        for kind in [
            EntityKind::Protein,
            EntityKind::Rna,
            EntityKind::Dna,
            EntityKind::Ligand,
        ] {
            // Only checks that dispatch resolves; ligand validation still applies.
            let _ = collector_for(kind);
        }
    }
}
