use serde::{Deserialize, Serialize};
use swarmpal_tree::{DataTree, Dataset, Values};

use super::{active_node, default_active_tree, PalProcess};
use crate::error::Result;
use crate::metadata::record_process;

/// Add a constant to numeric data variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetParams {
    pub offset: f64,
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    #[serde(default = "default_active_tree")]
    pub active_tree: String,
}

pub struct OffsetProcess {
    params: OffsetParams,
}

impl OffsetProcess {
    pub fn new(params: OffsetParams) -> Self {
        Self { params }
    }

    fn offset_dataset(&self, dataset: &mut Dataset) {
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
                Values::F64(array) => array.mapv_inplace(|v| v + self.params.offset),
                Values::I64(array) => {
                    let offset = self.params.offset.round() as i64;
                    array.mapv_inplace(|v| v + offset);
                }
                Values::Str(_) => {}
            }
        }
    }
}

impl PalProcess for OffsetProcess {
    fn name(&self) -> &'static str {
        "generic.offset"
    }

    fn apply(&self, mut tree: DataTree) -> Result<DataTree> {
        let node = active_node(&mut tree, &self.params.active_tree, self.name())?;
        node.for_each_dataset_mut(&mut |dataset| self.offset_dataset(dataset));
        record_process(node, self.name(), serde_json::to_value(&self.params)?)?;
        Ok(tree)
    }
}
