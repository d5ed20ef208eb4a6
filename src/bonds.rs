//! Bonded atom pairs: covalent bonds between entities, encoded on the wire
//! as a pair of `[entityId, residueId, atomName]` triples.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::session::BondInput;

/// One bond endpoint: entity id, residue id, atom name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BondAtom(pub String, pub i64, pub String);

/// An ordered pair of bonded atoms.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bond(pub BondAtom, pub BondAtom);

/// Validate a bond description and build the wire representation.
///
/// The two entity ids and two atom names must all be non-empty; residue ids
/// are allowed to stay at their numeric default. An invalid bond is logged
/// and dropped, and the remaining bonds are still processed.
pub fn collect_bond(input: &BondInput) -> Option<Bond> {
    if input.entity_id1.is_empty()
        || input.atom_name1.is_empty()
        || input.entity_id2.is_empty()
        || input.atom_name2.is_empty()
    {
        error!("All identifier fields are required for defining a bond.");
        return None;
    }

    let bond = Bond(
        BondAtom(
            input.entity_id1.clone(),
            input.residue_id1,
            input.atom_name1.clone(),
        ),
        BondAtom(
            input.entity_id2.clone(),
            input.residue_id2,
            input.atom_name2.clone(),
        ),
    );
    debug!("Bond defined as: {bond:?}");
    Some(bond)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bond_input() -> BondInput {
        serde_json::from_str(
            r#"{"entityId1": "A", "residueId1": 5, "atomName1": "SG",
                "entityId2": "B", "residueId2": 10, "atomName2": "SG"}"#,
        )
        .unwrap()
    }

    #[test]
    fn valid_bond_is_collected() {
        let bond = collect_bond(&bond_input()).unwrap();
        assert_eq!(
            serde_json::to_value(&bond).unwrap(),
            serde_json::json!([["A", 5, "SG"], ["B", 10, "SG"]])
        );
    }

    #[test]
    fn missing_identifier_field_rejects_bond() {
        let mut input = bond_input();
        input.atom_name2 = String::new();
        assert!(collect_bond(&input).is_none());

        let mut input = bond_input();
        input.entity_id1 = String::new();
        assert!(collect_bond(&input).is_none());
    }

    #[test]
    fn default_residue_ids_are_accepted() {
        let input: BondInput = serde_json::from_str(
            r#"{"entityId1": "A", "atomName1": "CA", "entityId2": "B", "atomName2": "N"}"#,
        )
        .unwrap();
        let bond = collect_bond(&input).unwrap();
        assert_eq!(bond.0 .1, 1);
        assert_eq!(bond.1 .1, 1);
    }
}
