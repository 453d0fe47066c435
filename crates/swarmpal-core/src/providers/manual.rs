use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use swarmpal_tree::{model::AttrMap, Dataset, Values, Variable};

use super::DataFetcher;
use crate::config::from_mapping;
use crate::error::{PalError, Result};

/// An inline dataset literal, spelled out directly in the batch config.
/// Mainly useful for tests and local experimentation.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualParameters {
    pub name: String,
    #[serde(default)]
    pub variables: BTreeMap<String, ManualVariable>,
    #[serde(default)]
    pub coords: Vec<String>,
    #[serde(default)]
    pub attrs: AttrMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualVariable {
    pub dims: Vec<String>,
    /// Scalar or (arbitrarily nested, rectangular) list of scalars.
    pub values: Value,
    #[serde(default)]
    pub attrs: AttrMap,
}

pub struct ManualProvider {
    params: ManualParameters,
}

impl ManualProvider {
    pub fn from_config(config: &Mapping) -> Result<Self> {
        Ok(Self {
            params: from_mapping(config)?,
        })
    }
}

impl DataFetcher for ManualProvider {
    fn source(&self) -> &'static str {
        "manual"
    }

    fn dataset_name(&self) -> String {
        self.params.name.clone()
    }

    fn fetch_data(&self) -> Result<Dataset> {
        let mut dataset = Dataset::new();
        for (name, spec) in &self.params.variables {
            let values = values_from_yaml(&spec.values)
                .map_err(|err| PalError::Config(format!("manual variable '{name}': {err}")))?;
            let mut variable = Variable::new(spec.dims.clone(), values)?;
            variable.attrs = spec.attrs.clone();
            dataset.insert(name, variable);
        }
        for coord in &self.params.coords {
            dataset.set_coord(coord)?;
        }
        dataset.attrs = self.params.attrs.clone();
        Ok(dataset)
    }
}

enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

fn collect(
    value: &Value,
    depth: usize,
    shape: &mut Vec<usize>,
    out: &mut Vec<Scalar>,
) -> std::result::Result<(), String> {
    match value {
        Value::Sequence(items) => {
            if shape.len() == depth {
                shape.push(items.len());
            } else if shape[depth] != items.len() {
                return Err(format!(
                    "ragged nesting: expected {} elements at depth {depth}, found {}",
                    shape[depth],
                    items.len()
                ));
            }
            for item in items {
                collect(item, depth + 1, shape, out)?;
            }
            Ok(())
        }
        Value::Number(n) => {
            if depth != shape.len() {
                return Err("ragged nesting: scalar at unexpected depth".to_string());
            }
            if let Some(i) = n.as_i64() {
                out.push(Scalar::Int(i));
            } else {
                out.push(Scalar::Float(n.as_f64().ok_or("non-finite number")?));
            }
            Ok(())
        }
        Value::String(s) => {
            if depth != shape.len() {
                return Err("ragged nesting: scalar at unexpected depth".to_string());
            }
            out.push(Scalar::Text(s.clone()));
            Ok(())
        }
        other => Err(format!("unsupported value {other:?}")),
    }
}

/// Convert a (nested) YAML list into an array, inferring the dtype:
/// all-integer input becomes i64, any float promotes to f64, and any
/// string makes the whole array a string array.
fn values_from_yaml(value: &Value) -> std::result::Result<Values, String> {
    let mut shape = Vec::new();
    let mut scalars = Vec::new();
    collect(value, 0, &mut shape, &mut scalars)?;

    let any_text = scalars.iter().any(|s| matches!(s, Scalar::Text(_)));
    let any_float = scalars.iter().any(|s| matches!(s, Scalar::Float(_)));
    let shape = IxDyn(&shape);

    if any_text {
        let data: Vec<String> = scalars
            .into_iter()
            .map(|s| match s {
                Scalar::Text(t) => t,
                Scalar::Int(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
            })
            .collect();
        ArrayD::from_shape_vec(shape, data)
            .map(Values::Str)
            .map_err(|err| err.to_string())
    } else if any_float {
        let data: Vec<f64> = scalars
            .into_iter()
            .map(|s| match s {
                Scalar::Float(f) => f,
                Scalar::Int(i) => i as f64,
                Scalar::Text(_) => unreachable!("text handled above"),
            })
            .collect();
        ArrayD::from_shape_vec(shape, data)
            .map(Values::F64)
            .map_err(|err| err.to_string())
    } else {
        let data: Vec<i64> = scalars
            .into_iter()
            .map(|s| match s {
                Scalar::Int(i) => i,
                _ => unreachable!("only ints left"),
            })
            .collect();
        ArrayD::from_shape_vec(shape, data)
            .map(Values::I64)
            .map_err(|err| err.to_string())
    }
}
