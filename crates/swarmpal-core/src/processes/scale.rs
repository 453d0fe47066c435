use serde::{Deserialize, Serialize};
use swarmpal_tree::{DataTree, Dataset, Values};

use super::{active_node, default_active_tree, PalProcess};
use crate::error::Result;
use crate::metadata::record_process;

/// Multiply numeric data variables by a constant factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleParams {
    pub factor: f64,
    /// Restrict to these variables; all data variables when absent.
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    #[serde(default = "default_active_tree")]
    pub active_tree: String,
}

pub struct ScaleProcess {
    params: ScaleParams,
}

impl ScaleProcess {
    pub fn new(params: ScaleParams) -> Self {
        Self { params }
    }

    fn scale_dataset(&self, dataset: &mut Dataset) {
        let coords: Vec<String> = dataset.coord_names().map(String::from).collect();
        for (name, variable) in dataset.variables_mut() {
            if coords.iter().any(|c| c == name) {
                continue;
            }
            if let Some(selection) = &self.params.variables {
                if !selection.iter().any(|s| s == name) {
                    continue;
                }
            }
            match &mut variable.values {
                Values::F64(array) => array.mapv_inplace(|v| v * self.params.factor),
                Values::I64(array) => {
                    let factor = self.params.factor;
                    array.mapv_inplace(|v| ((v as f64) * factor).round() as i64);
                }
                Values::Str(_) => {}
            }
        }
    }
}

impl PalProcess for ScaleProcess {
    fn name(&self) -> &'static str {
        "generic.scale"
    }

    fn apply(&self, mut tree: DataTree) -> Result<DataTree> {
        let node = active_node(&mut tree, &self.params.active_tree, self.name())?;
        node.for_each_dataset_mut(&mut |dataset| self.scale_dataset(dataset));
        record_process(node, self.name(), serde_json::to_value(&self.params)?)?;
        Ok(tree)
    }
}
