//! PAL metadata: a JSON object serialized into the `PAL_meta` attribute
//! of tree nodes, recording the analysis window of fetched data and the
//! configuration of every process applied to a subtree.

use serde_json::{Map, Value};
use swarmpal_tree::{AttrValue, DataTree, Dataset};

use crate::error::Result;
use crate::window::TimeWindow;

pub const PAL_META_ATTR: &str = "PAL_meta";

/// Deserialize a node's PAL metadata, treating a missing or non-string
/// attribute as empty.
pub fn read_pal_meta(tree: &DataTree) -> Map<String, Value> {
    tree.attrs()
        .get(PAL_META_ATTR)
        .and_then(AttrValue::as_str)
        .and_then(|text| serde_json::from_str::<Value>(text).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}

pub fn write_pal_meta(tree: &mut DataTree, meta: &Map<String, Value>) -> Result<()> {
    let text = serde_json::to_string(meta)?;
    tree.set_attr(PAL_META_ATTR, text);
    Ok(())
}

/// Record an applied process and its configuration on a subtree root.
pub fn record_process(tree: &mut DataTree, name: &str, config: Value) -> Result<()> {
    let mut meta = read_pal_meta(tree);
    if meta.contains_key(name) {
        tracing::warn!(process = name, "rerunning process: may overwrite existing data");
    }
    meta.insert(name.to_string(), config);
    write_pal_meta(tree, &meta)
}

/// Stamp a fetched dataset with its (unpadded) analysis window.
pub fn set_analysis_window(dataset: &mut Dataset, window: &TimeWindow) -> Result<()> {
    let (start, end) = window.iso_pair();
    let meta = serde_json::json!({ "analysis_window": [start, end] });
    dataset.set_attr(PAL_META_ATTR, serde_json::to_string(&meta)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_processes_cumulatively() {
        let mut tree = DataTree::new();
        record_process(&mut tree, "generic.scale", serde_json::json!({"factor": 2.0})).unwrap();
        record_process(&mut tree, "generic.offset", serde_json::json!({"offset": 1.0})).unwrap();
        let meta = read_pal_meta(&tree);
        assert_eq!(meta.len(), 2);
        assert_eq!(meta["generic.scale"]["factor"], 2.0);
        assert_eq!(meta["generic.offset"]["offset"], 1.0);
    }

    #[test]
    fn missing_meta_reads_as_empty() {
        let tree = DataTree::new();
        assert!(read_pal_meta(&tree).is_empty());
    }
}
