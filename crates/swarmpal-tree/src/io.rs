//! Single-file container for [`DataTree`]s.
//!
//! Layout: 8-byte magic, little-endian u64 header length, JSON header
//! describing the node hierarchy and variable metadata, then a raw payload
//! region holding the array bytes. Output is deterministic for a given
//! tree so file checksums are reproducible.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::errors::TreeError;
use crate::model::{AttrMap, Dataset, Values, Variable};
use crate::tree::DataTree;

const MAGIC: &[u8; 8] = b"SWTREE01";

#[derive(Debug, Serialize, Deserialize)]
struct NodeHeader {
    #[serde(default)]
    attrs: AttrMap,
    #[serde(default)]
    variables: Vec<VarHeader>,
    #[serde(default)]
    coords: Vec<String>,
    #[serde(default)]
    children: BTreeMap<String, NodeHeader>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VarHeader {
    name: String,
    dims: Vec<String>,
    dtype: String,
    shape: Vec<usize>,
    #[serde(default)]
    attrs: AttrMap,
    offset: u64,
    nbytes: u64,
}

/// Write a tree to a container file, replacing any existing file.
pub fn write_tree(tree: &DataTree, path: &Path) -> Result<(), TreeError> {
    let mut payload = Vec::new();
    let header = encode_node(tree, &mut payload);
    let header_bytes = serde_json::to_vec(&header)?;

    let mut out = Vec::with_capacity(MAGIC.len() + 8 + header_bytes.len() + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(header_bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&payload);
    fs::write(path, out)?;
    Ok(())
}

/// Read a tree back from a container file.
pub fn read_tree(path: &Path) -> Result<DataTree, TreeError> {
    let bytes = fs::read(path)?;
    let display = path.display().to_string();
    if bytes.len() < MAGIC.len() + 8 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(TreeError::BadMagic { path: display });
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[MAGIC.len()..MAGIC.len() + 8]);
    let header_len = u64::from_le_bytes(len_bytes) as usize;
    let header_start = MAGIC.len() + 8;
    let payload_start = header_start + header_len;
    if bytes.len() < payload_start {
        return Err(TreeError::Truncated(format!(
            "{display}: header claims {header_len} bytes"
        )));
    }
    let header: NodeHeader = serde_json::from_slice(&bytes[header_start..payload_start])
        .map_err(|err| TreeError::Header(err.to_string()))?;
    decode_node(&header, &bytes[payload_start..])
}

fn encode_node(node: &DataTree, payload: &mut Vec<u8>) -> NodeHeader {
    let mut variables = Vec::new();
    for (name, variable) in node.dataset().variables() {
        let offset = payload.len() as u64;
        encode_values(&variable.values, payload);
        variables.push(VarHeader {
            name: name.to_string(),
            dims: variable.dims.clone(),
            dtype: variable.values.dtype().to_string(),
            shape: variable.values.shape().to_vec(),
            attrs: variable.attrs.clone(),
            offset,
            nbytes: payload.len() as u64 - offset,
        });
    }
    let mut children = BTreeMap::new();
    for (name, child) in node.children() {
        children.insert(name.to_string(), encode_node(child, payload));
    }
    NodeHeader {
        attrs: node.attrs().clone(),
        variables,
        coords: node.dataset().coord_names().map(String::from).collect(),
        children,
    }
}

fn encode_values(values: &Values, payload: &mut Vec<u8>) {
    match values {
        Values::F64(array) => {
            for v in array.iter() {
                payload.extend_from_slice(&v.to_le_bytes());
            }
        }
        Values::I64(array) => {
            for v in array.iter() {
                payload.extend_from_slice(&v.to_le_bytes());
            }
        }
        Values::Str(array) => {
            for v in array.iter() {
                payload.extend_from_slice(&(v.len() as u32).to_le_bytes());
                payload.extend_from_slice(v.as_bytes());
            }
        }
    }
}

fn decode_node(header: &NodeHeader, payload: &[u8]) -> Result<DataTree, TreeError> {
    let mut dataset = Dataset::new();
    dataset.attrs = header.attrs.clone();
    for var in &header.variables {
        let values = decode_values(var, payload)?;
        let mut variable = Variable::new(var.dims.clone(), values)?;
        variable.attrs = var.attrs.clone();
        dataset.insert(&var.name, variable);
    }
    for coord in &header.coords {
        dataset.set_coord(coord)?;
    }
    let mut node = DataTree::from_dataset(dataset);
    for (name, child) in &header.children {
        node.set_child(name, decode_node(child, payload)?);
    }
    Ok(node)
}

fn decode_values(var: &VarHeader, payload: &[u8]) -> Result<Values, TreeError> {
    let start = var.offset as usize;
    let end = start.checked_add(var.nbytes as usize).ok_or_else(|| {
        TreeError::Truncated(format!(
            "variable '{}' extent {start}+{} overflows",
            var.name, var.nbytes
        ))
    })?;
    if end > payload.len() {
        return Err(TreeError::Truncated(format!(
            "variable '{}' needs bytes {start}..{end}, payload has {}",
            var.name,
            payload.len()
        )));
    }
    let bytes = &payload[start..end];
    let count = var
        .shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| {
            TreeError::Header(format!(
                "variable '{}' shape {:?} overflows",
                var.name, var.shape
            ))
        })?;
    let shape = IxDyn(&var.shape);

    match var.dtype.as_str() {
        "f64" => {
            if count.checked_mul(8) != Some(bytes.len()) {
                return Err(TreeError::Truncated(format!(
                    "variable '{}' expects {count} f64 values",
                    var.name
                )));
            }
            let data: Vec<f64> = bytes
                .chunks_exact(8)
                .map(|chunk| f64::from_le_bytes(chunk.try_into().expect("chunk of 8")))
                .collect();
            ArrayD::from_shape_vec(shape, data)
                .map(Values::F64)
                .map_err(|err| TreeError::Header(err.to_string()))
        }
        "i64" => {
            if count.checked_mul(8) != Some(bytes.len()) {
                return Err(TreeError::Truncated(format!(
                    "variable '{}' expects {count} i64 values",
                    var.name
                )));
            }
            let data: Vec<i64> = bytes
                .chunks_exact(8)
                .map(|chunk| i64::from_le_bytes(chunk.try_into().expect("chunk of 8")))
                .collect();
            ArrayD::from_shape_vec(shape, data)
                .map(Values::I64)
                .map_err(|err| TreeError::Header(err.to_string()))
        }
        "str" => {
            let mut data = Vec::with_capacity(count);
            let mut cursor = 0usize;
            for _ in 0..count {
                if cursor + 4 > bytes.len() {
                    return Err(TreeError::Truncated(format!(
                        "variable '{}' string length prefix out of range",
                        var.name
                    )));
                }
                let len =
                    u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().expect("4 bytes"))
                        as usize;
                cursor += 4;
                if cursor + len > bytes.len() {
                    return Err(TreeError::Truncated(format!(
                        "variable '{}' string data out of range",
                        var.name
                    )));
                }
                let text = std::str::from_utf8(&bytes[cursor..cursor + len])
                    .map_err(|err| TreeError::Header(err.to_string()))?;
                data.push(text.to_string());
                cursor += len;
            }
            ArrayD::from_shape_vec(shape, data)
                .map(Values::Str)
                .map_err(|err| TreeError::Header(err.to_string()))
        }
        other => Err(TreeError::UnsupportedDtype(other.to_string())),
    }
}
