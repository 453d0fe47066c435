use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use swarmpal_tree::{read_tree, AttrValue, Dataset};

use super::DataFetcher;
use crate::config::from_mapping;
use crate::error::{PalError, Result};

/// Parameters for loading a dataset from a tree container file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileParameters {
    pub filename: PathBuf,
    /// Group (tree path) within the file; the root dataset when absent.
    #[serde(default)]
    pub group: Option<String>,
    /// Overrides the tree label of the loaded dataset.
    #[serde(default)]
    pub dataset_name: Option<String>,
}

pub struct FileProvider {
    params: FileParameters,
}

impl FileProvider {
    pub fn from_config(config: &Mapping) -> Result<Self> {
        Self::new(from_mapping(config)?)
    }

    pub fn new(params: FileParameters) -> Result<Self> {
        if !params.filename.exists() {
            return Err(PalError::Provider(format!(
                "file not found: {}",
                params.filename.display()
            )));
        }
        Ok(Self { params })
    }
}

impl DataFetcher for FileProvider {
    fn source(&self) -> &'static str {
        "file"
    }

    fn dataset_name(&self) -> String {
        if let Some(name) = &self.params.dataset_name {
            return name.clone();
        }
        if let Some(group) = &self.params.group {
            return group.trim_matches('/').to_string();
        }
        self.params
            .filename
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string())
    }

    fn fetch_data(&self) -> Result<Dataset> {
        let tree = read_tree(&self.params.filename)?;
        let node = match &self.params.group {
            Some(group) => tree.get(group).ok_or_else(|| {
                PalError::Tree(swarmpal_tree::TreeError::MissingGroup {
                    group: group.clone(),
                    path: self.params.filename.display().to_string(),
                })
            })?,
            None => &tree,
        };
        let mut dataset = node.dataset().clone();
        if dataset.attr("Sources").is_none() {
            let source = self
                .params
                .filename
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            dataset.set_attr("Sources", AttrValue::TextList(vec![source]));
        }
        Ok(dataset)
    }
}
