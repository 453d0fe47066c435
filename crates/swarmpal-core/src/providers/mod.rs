//! Data providers: named sources of labelled array datasets.
//!
//! `get_data` dispatches on the provider name from a [`FetchSpec`] and
//! returns an *item* tree holding the fetched dataset as a single child
//! keyed by the dataset name, ready to be merged into a batch tree.

mod file;
mod hapi;
mod manual;
mod vires;

pub use file::{FileParameters, FileProvider};
pub use hapi::{HapiParameters, HapiProvider};
pub use manual::{ManualParameters, ManualProvider};
pub use vires::{ViresParameters, ViresProvider, DEFAULT_VIRES_SERVER};

use swarmpal_tree::{DataTree, Dataset};

use crate::config::FetchSpec;
use crate::error::{PalError, Result};

/// Interface with an external data source.
pub trait DataFetcher {
    /// Identifies the data source type (e.g. `"vires"`, `"hapi"`).
    fn source(&self) -> &'static str;

    /// Name used as the fetched dataset's tree label.
    fn dataset_name(&self) -> String;

    /// Retrieve the data as a dataset.
    fn fetch_data(&self) -> Result<Dataset>;
}

pub const PROVIDER_NAMES: [&str; 4] = ["hapi", "vires", "file", "manual"];

fn build_fetcher(spec: &FetchSpec) -> Result<Box<dyn DataFetcher>> {
    match spec.provider.as_str() {
        "hapi" => Ok(Box::new(HapiProvider::from_config(&spec.config)?)),
        "vires" => Ok(Box::new(ViresProvider::from_config(&spec.config)?)),
        "file" => Ok(Box::new(FileProvider::from_config(&spec.config)?)),
        "manual" => Ok(Box::new(ManualProvider::from_config(&spec.config)?)),
        other => Err(PalError::UnknownProvider(other.to_string())),
    }
}

/// Fetch one provider spec into an item tree.
pub fn get_data(spec: &FetchSpec) -> Result<DataTree> {
    let fetcher = build_fetcher(spec)?;
    tracing::info!(
        provider = fetcher.source(),
        dataset = %fetcher.dataset_name(),
        "fetching data"
    );
    let dataset = fetcher.fetch_data()?;
    let mut item = DataTree::new();
    item.set_child(&fetcher.dataset_name(), DataTree::from_dataset(dataset));
    Ok(item)
}
