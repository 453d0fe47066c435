//! Processes: named, parameterized transforms applied to a tree of
//! datasets. A chain of processes is applied as a strict left fold, each
//! consuming and returning the tree.

mod fac;
mod offset;
mod residual;
mod scale;

pub use fac::{FacSingleSatParams, FacSingleSatProcess};
pub use offset::{OffsetParams, OffsetProcess};
pub use residual::{ResidualParams, ResidualProcess};
pub use scale::{ScaleParams, ScaleProcess};

use swarmpal_tree::DataTree;

use crate::config::{from_mapping, ProcessSpec};
use crate::error::{PalError, Result};

/// A transform of tree-in, tree-out.
pub trait PalProcess {
    fn name(&self) -> &'static str;
    fn apply(&self, tree: DataTree) -> Result<DataTree>;
}

pub const PROCESS_NAMES: [&str; 4] = [
    "generic.scale",
    "generic.offset",
    "mag.residual",
    "fac.single_sat",
];

/// Instantiate a process from its dotted name and parameter mapping.
pub fn make_process(spec: &ProcessSpec) -> Result<Box<dyn PalProcess>> {
    match spec.name.as_str() {
        "generic.scale" => Ok(Box::new(ScaleProcess::new(from_mapping(&spec.params)?))),
        "generic.offset" => Ok(Box::new(OffsetProcess::new(from_mapping(&spec.params)?))),
        "mag.residual" => Ok(Box::new(ResidualProcess::new(from_mapping(&spec.params)?))),
        "fac.single_sat" => Ok(Box::new(FacSingleSatProcess::new(from_mapping(
            &spec.params,
        )?))),
        other => Err(PalError::UnknownProcess(other.to_string())),
    }
}

pub(crate) fn default_active_tree() -> String {
    "/".to_string()
}

/// Resolve the subtree a process acts on.
pub(crate) fn active_node<'t>(
    tree: &'t mut DataTree,
    active_tree: &str,
    process: &str,
) -> Result<&'t mut DataTree> {
    tree.get_mut(active_tree)
        .ok_or_else(|| PalError::process(process, format!("no subtree at '{active_tree}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;

    #[test]
    fn unknown_process_is_a_typed_error() {
        let spec = ProcessSpec {
            name: "dsecs.analysis".to_string(),
            params: Mapping::new(),
        };
        match make_process(&spec) {
            Err(PalError::UnknownProcess(name)) => assert_eq!(name, "dsecs.analysis"),
            Err(other) => panic!("expected UnknownProcess, got {other:?}"),
            Ok(process) => panic!("expected UnknownProcess, got process '{}'", process.name()),
        }
    }

    #[test]
    fn every_registered_name_instantiates_with_required_params() {
        for (name, params) in [
            ("generic.scale", "factor: 2.0"),
            ("generic.offset", "offset: 1.0"),
            ("mag.residual", ""),
            ("fac.single_sat", ""),
        ] {
            let params: Mapping = if params.is_empty() {
                Mapping::new()
            } else {
                serde_yaml::from_str(params).unwrap()
            };
            let spec = ProcessSpec {
                name: name.to_string(),
                params,
            };
            let process = make_process(&spec).unwrap();
            assert_eq!(process.name(), name);
        }
    }
}
