//! Batch configuration loading.
//!
//! The batch file is a YAML mapping from dataset name to a spec with a
//! required `data` list (provider fetches) and an optional `processes`
//! list. Document order is preserved: datasets are processed, and the
//! checksum registry written, in the order they appear in the file.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{PalError, Result};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    datasets: Vec<(String, DatasetSpec)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSpec {
    pub data: Vec<FetchSpec>,
    #[serde(default)]
    pub processes: Vec<ProcessSpec>,
}

/// One provider fetch: the provider name plus its provider-specific
/// configuration mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSpec {
    pub provider: String,
    #[serde(default)]
    pub config: Mapping,
}

/// One process application: the dotted process name; all other keys are
/// passed through as parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    #[serde(flatten)]
    pub params: Mapping,
}

impl BatchConfig {
    pub fn from_str(text: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(text)?;
        let mapping = doc.as_mapping().ok_or_else(|| {
            PalError::Config("top level must be a mapping of dataset name to spec".to_string())
        })?;

        let mut datasets = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| {
                    PalError::Config(format!("dataset names must be strings, got {key:?}"))
                })?
                .to_string();
            let spec: DatasetSpec = serde_yaml::from_value(value.clone())
                .map_err(|err| PalError::Config(format!("dataset '{name}': {err}")))?;
            datasets.push((name, spec));
        }
        Ok(Self { datasets })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    pub fn datasets(&self) -> impl Iterator<Item = (&str, &DatasetSpec)> {
        self.datasets.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

/// Deserialize a provider/process parameter struct out of a YAML mapping.
pub fn from_mapping<T: DeserializeOwned>(mapping: &Mapping) -> Result<T> {
    Ok(serde_yaml::from_value(Value::Mapping(mapping.clone()))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
alpha:
  data:
    - provider: manual
      config:
        name: one
  processes:
    - name: generic.scale
      factor: 2.0
beta:
  data:
    - provider: manual
      config:
        name: two
"#;

    #[test]
    fn preserves_document_order() {
        let config = BatchConfig::from_str(CONFIG).unwrap();
        let names: Vec<&str> = config.datasets().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn missing_processes_defaults_to_empty() {
        let config = BatchConfig::from_str(CONFIG).unwrap();
        let (_, beta) = config.datasets().nth(1).unwrap();
        assert!(beta.processes.is_empty());
        assert_eq!(beta.data.len(), 1);
    }

    #[test]
    fn process_params_are_flattened() {
        let config = BatchConfig::from_str(CONFIG).unwrap();
        let (_, alpha) = config.datasets().next().unwrap();
        let spec = &alpha.processes[0];
        assert_eq!(spec.name, "generic.scale");
        assert_eq!(
            spec.params.get(Value::from("factor")),
            Some(&Value::from(2.0))
        );
    }

    #[test]
    fn rejects_non_mapping_top_level() {
        let err = BatchConfig::from_str("- just\n- a\n- list\n").unwrap_err();
        assert!(matches!(err, PalError::Config(_)));
    }

    #[test]
    fn rejects_missing_data_key() {
        let err = BatchConfig::from_str("demo:\n  processes: []\n").unwrap_err();
        assert!(matches!(err, PalError::Config(_)));
    }

    #[test]
    fn rejects_invalid_yaml() {
        assert!(BatchConfig::from_str("a: [unclosed").is_err());
    }
}
