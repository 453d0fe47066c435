use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use swarmpal_tree::Dataset;

use super::DataFetcher;
use crate::config::from_mapping;
use crate::error::Result;
use crate::hapi::HapiClient;
use crate::metadata::set_analysis_window;
use crate::window::{PadTimes, TimeWindow};

pub const DEFAULT_VIRES_SERVER: &str = "https://vires.services/hapi";

/// Parameters controlling a VirES collection fetch.
///
/// VirES exposes its collections over HAPI, so this is a thin layer over
/// the HAPI client: measurements, model values, and auxiliaries are
/// combined into one parameter selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViresParameters {
    pub collection: String,
    #[serde(default)]
    pub measurements: Vec<String>,
    /// Model expressions, e.g. `"IGRF"` or `"Model = CHAOS-Core + CHAOS-Static"`.
    /// Model values are served as `B_NEC_<name>` parameters.
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub auxiliaries: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub pad_times: Option<PadTimes>,
}

fn default_server_url() -> String {
    DEFAULT_VIRES_SERVER.to_string()
}

/// Name under which a model expression's values are exposed:
/// the part before `=`, or the whole trimmed expression without one.
fn model_name(expression: &str) -> &str {
    expression
        .split_once('=')
        .map(|(name, _)| name)
        .unwrap_or(expression)
        .trim()
}

pub struct ViresProvider {
    params: ViresParameters,
    window: TimeWindow,
    fetch_window: TimeWindow,
}

impl ViresProvider {
    pub fn from_config(config: &Mapping) -> Result<Self> {
        let params: ViresParameters = from_mapping(config)?;
        Self::new(params)
    }

    pub fn new(params: ViresParameters) -> Result<Self> {
        let window = TimeWindow::parse(&params.start_time, &params.end_time)?;
        let fetch_window = match &params.pad_times {
            Some(pad) => {
                let (before, after) = pad.durations()?;
                window.pad(before, after)
            }
            None => window,
        };
        Ok(Self {
            params,
            window,
            fetch_window,
        })
    }

    fn parameter_selection(&self) -> Option<String> {
        let mut names: Vec<String> = self.params.measurements.clone();
        names.extend(
            self.params
                .models
                .iter()
                .map(|expr| format!("B_NEC_{}", model_name(expr))),
        );
        names.extend(self.params.auxiliaries.iter().cloned());
        if names.is_empty() {
            None
        } else {
            Some(names.join(","))
        }
    }
}

impl DataFetcher for ViresProvider {
    fn source(&self) -> &'static str {
        "vires"
    }

    fn dataset_name(&self) -> String {
        self.params.collection.clone()
    }

    fn fetch_data(&self) -> Result<Dataset> {
        let (start, stop) = self.fetch_window.iso_pair();
        let client = HapiClient::new(&self.params.server_url);
        let selection = self.parameter_selection();
        let mut dataset = client.fetch_dataset(
            &self.params.collection,
            selection.as_deref(),
            &start,
            &stop,
        )?;
        set_analysis_window(&mut dataset, &self.window)?;
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_measurements_models_and_auxiliaries() {
        let config: Mapping = serde_yaml::from_str(
            r#"
collection: SW_OPER_MAGA_LR_1B
measurements: [F, B_NEC]
models: ["Model = CHAOS-Core + CHAOS-Static", "IGRF"]
auxiliaries: [QDLat]
start_time: "2016-01-01T00:00:00"
end_time: "2016-01-01T03:00:00"
"#,
        )
        .unwrap();
        let provider = ViresProvider::from_config(&config).unwrap();
        assert_eq!(
            provider.parameter_selection().unwrap(),
            "F,B_NEC,B_NEC_Model,B_NEC_IGRF,QDLat"
        );
        assert_eq!(provider.params.server_url, DEFAULT_VIRES_SERVER);
    }

    #[test]
    fn empty_selection_requests_everything() {
        let config: Mapping = serde_yaml::from_str(
            r#"
collection: SW_OPER_MAGA_LR_1B
start_time: "2016-01-01T00:00:00"
end_time: "2016-01-01T03:00:00"
"#,
        )
        .unwrap();
        let provider = ViresProvider::from_config(&config).unwrap();
        assert!(provider.parameter_selection().is_none());
    }
}
