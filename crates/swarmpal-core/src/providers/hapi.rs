use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use swarmpal_tree::Dataset;

use super::DataFetcher;
use crate::config::from_mapping;
use crate::error::Result;
use crate::hapi::HapiClient;
use crate::metadata::set_analysis_window;
use crate::window::{PadTimes, TimeWindow};

/// Parameters controlling a HAPI fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HapiParameters {
    pub server: String,
    pub dataset: String,
    /// Comma-separated parameter names; empty requests all of them.
    #[serde(default)]
    pub parameters: String,
    pub start: String,
    pub stop: String,
    #[serde(default)]
    pub pad_times: Option<PadTimes>,
}

pub struct HapiProvider {
    params: HapiParameters,
    /// Requested window, before padding.
    window: TimeWindow,
    /// Window actually fetched.
    fetch_window: TimeWindow,
}

impl HapiProvider {
    pub fn from_config(config: &Mapping) -> Result<Self> {
        let params: HapiParameters = from_mapping(config)?;
        Self::new(params)
    }

    pub fn new(params: HapiParameters) -> Result<Self> {
        let window = TimeWindow::parse(&params.start, &params.stop)?;
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

    fn parameter_selection(&self) -> Option<&str> {
        if self.params.parameters.is_empty() {
            None
        } else {
            Some(self.params.parameters.as_str())
        }
    }
}

impl DataFetcher for HapiProvider {
    fn source(&self) -> &'static str {
        "hapi"
    }

    fn dataset_name(&self) -> String {
        self.params.dataset.clone()
    }

    fn fetch_data(&self) -> Result<Dataset> {
        let (start, stop) = self.fetch_window.iso_pair();
        let client = HapiClient::new(&self.params.server);
        let mut dataset = client.fetch_dataset(
            &self.params.dataset,
            self.parameter_selection(),
            &start,
            &stop,
        )?;
        set_analysis_window(&mut dataset, &self.window)?;
        Ok(dataset)
    }
}
