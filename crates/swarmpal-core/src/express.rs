//! Express one-call workflows wrapping the provider and process layers.

use std::path::Path;

use swarmpal_tree::{write_tree, DataTree};

use crate::error::Result;
use crate::processes::{
    FacSingleSatParams, FacSingleSatProcess, PalProcess, ResidualParams, ResidualProcess,
};
use crate::providers::{DataFetcher, ViresParameters, ViresProvider};
use crate::queries::hapi_server;
use crate::spacecraft::maglr_collection;

/// Fetch magnetic low-rate data for one spacecraft, compute the model
/// residual and the single-satellite FAC estimate, and write the result.
pub fn fac_single_sat(
    spacecraft: &str,
    time_start: &str,
    time_end: &str,
    grade: &str,
    out_file: &Path,
) -> Result<()> {
    let collection = maglr_collection(spacecraft, grade)?;
    tracing::info!(spacecraft, %collection, "running FAC single-satellite processor");

    let provider = ViresProvider::new(ViresParameters {
        collection: collection.clone(),
        measurements: vec!["B_NEC".to_string()],
        models: vec!["CHAOS".to_string()],
        auxiliaries: Vec::new(),
        start_time: time_start.to_string(),
        end_time: time_end.to_string(),
        server_url: hapi_server(),
        pad_times: None,
    })?;

    let dataset = provider.fetch_data()?;
    let mut tree = DataTree::new();
    tree.set_child(&collection, DataTree::from_dataset(dataset));

    let tree = ResidualProcess::new(ResidualParams {
        model: Some("CHAOS".to_string()),
        active_tree: "/".to_string(),
    })
    .apply(tree)?;
    let tree = FacSingleSatProcess::new(FacSingleSatParams {
        velocity: 7600.0,
        active_tree: "/".to_string(),
    })
    .apply(tree)?;

    write_tree(&tree, out_file)?;
    tracing::info!(file = %out_file.display(), "wrote FAC output");
    Ok(())
}
