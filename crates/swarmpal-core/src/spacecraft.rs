//! Spacecraft -> magnetic low-rate collection lookup.

use once_cell::sync::Lazy;

use crate::error::{PalError, Result};

/// Known spacecraft and their MAG LR collection templates. Swarm
/// collections carry a `{grade}` slot (`OPER` or `FAST`); the other
/// missions publish a single collection and ignore the grade.
pub static SPACECRAFT_TO_MAGLR_DATASET: Lazy<Vec<(&'static str, &'static str)>> =
    Lazy::new(|| {
        vec![
            ("Swarm-A", "SW_{grade}_MAGA_LR_1B"),
            ("Swarm-B", "SW_{grade}_MAGB_LR_1B"),
            ("Swarm-C", "SW_{grade}_MAGC_LR_1B"),
            ("GOCE", "GO_MAG_ACAL_CORR"),
            ("GRACE-FO-1", "GF1_MAG_ACAL_CORR"),
            ("GRACE-FO-2", "GF2_MAG_ACAL_CORR"),
            ("CryoSat-2", "CS_MAG"),
        ]
    });

pub const GRADES: [&str; 2] = ["OPER", "FAST"];

/// Spacecraft identifiers in table order.
pub fn spacecraft_names() -> Vec<&'static str> {
    SPACECRAFT_TO_MAGLR_DATASET
        .iter()
        .map(|(name, _)| *name)
        .collect()
}

/// Resolve the concrete MAG LR collection for a spacecraft and grade.
pub fn maglr_collection(spacecraft: &str, grade: &str) -> Result<String> {
    if !GRADES.contains(&grade) {
        return Err(PalError::UnknownGrade(grade.to_string()));
    }
    let template = SPACECRAFT_TO_MAGLR_DATASET
        .iter()
        .find(|(name, _)| *name == spacecraft)
        .map(|(_, template)| *template)
        .ok_or_else(|| PalError::UnknownSpacecraft(spacecraft.to_string()))?;
    Ok(template.replace("{grade}", grade))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_swarm_collections_per_grade() {
        assert_eq!(
            maglr_collection("Swarm-A", "OPER").unwrap(),
            "SW_OPER_MAGA_LR_1B"
        );
        assert_eq!(
            maglr_collection("Swarm-B", "FAST").unwrap(),
            "SW_FAST_MAGB_LR_1B"
        );
    }

    #[test]
    fn non_swarm_missions_ignore_grade() {
        assert_eq!(maglr_collection("GOCE", "OPER").unwrap(), "GO_MAG_ACAL_CORR");
    }

    #[test]
    fn unknown_inputs_are_typed_errors() {
        assert!(matches!(
            maglr_collection("Sputnik", "OPER"),
            Err(PalError::UnknownSpacecraft(_))
        ));
        assert!(matches!(
            maglr_collection("Swarm-A", "SLOW"),
            Err(PalError::UnknownGrade(_))
        ));
    }

    #[test]
    fn names_preserve_table_order() {
        let names = spacecraft_names();
        assert_eq!(names.first(), Some(&"Swarm-A"));
        assert!(names.contains(&"CryoSat-2"));
    }
}
