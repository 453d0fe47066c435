use std::collections::{BTreeMap, BTreeSet};

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::errors::TreeError;

/// Attribute value attached to a dataset, variable, or tree node.
///
/// Variant order matters: serde tries them top to bottom when
/// deserializing untagged data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    TextList(Vec<String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

pub type AttrMap = BTreeMap<String, AttrValue>;

/// Array payload of a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    F64(ArrayD<f64>),
    I64(ArrayD<i64>),
    Str(ArrayD<String>),
}

impl Values {
    pub fn dtype(&self) -> &'static str {
        match self {
            Values::F64(_) => "f64",
            Values::I64(_) => "i64",
            Values::Str(_) => "str",
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Values::F64(a) => a.shape(),
            Values::I64(a) => a.shape(),
            Values::Str(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named-dimension array with attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub values: Values,
    pub attrs: AttrMap,
}

impl Variable {
    /// Build a variable, checking that the dimension names match the
    /// array's dimensionality.
    pub fn new<S: Into<String>>(dims: Vec<S>, values: Values) -> Result<Self, TreeError> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != values.ndim() {
            return Err(TreeError::DimMismatch {
                name: dims.join(","),
                dims: dims.len(),
                ndim: values.ndim(),
            });
        }
        Ok(Self {
            dims,
            values,
            attrs: AttrMap::new(),
        })
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// 1-D f64 variable over a single named dimension.
    pub fn f64_1d(dim: &str, data: Vec<f64>) -> Self {
        let array = ArrayD::from_shape_vec(ndarray::IxDyn(&[data.len()]), data)
            .expect("1-D shape always matches data length");
        Self {
            dims: vec![dim.to_string()],
            values: Values::F64(array),
            attrs: AttrMap::new(),
        }
    }

    /// 1-D i64 variable over a single named dimension.
    pub fn i64_1d(dim: &str, data: Vec<i64>) -> Self {
        let array = ArrayD::from_shape_vec(ndarray::IxDyn(&[data.len()]), data)
            .expect("1-D shape always matches data length");
        Self {
            dims: vec![dim.to_string()],
            values: Values::I64(array),
            attrs: AttrMap::new(),
        }
    }
}

/// A labelled collection of variables, a subset of which are coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    variables: BTreeMap<String, Variable>,
    coords: BTreeSet<String>,
    pub attrs: AttrMap,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a data variable.
    pub fn insert(&mut self, name: &str, variable: Variable) {
        self.variables.insert(name.to_string(), variable);
    }

    /// Insert or replace a variable and mark it as a coordinate.
    pub fn insert_coord(&mut self, name: &str, variable: Variable) {
        self.variables.insert(name.to_string(), variable);
        self.coords.insert(name.to_string());
    }

    /// Mark an existing variable as a coordinate.
    pub fn set_coord(&mut self, name: &str) -> Result<(), TreeError> {
        if !self.variables.contains_key(name) {
            return Err(TreeError::UnknownCoordinate(name.to_string()));
        }
        self.coords.insert(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn is_coord(&self, name: &str) -> bool {
        self.coords.contains(name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn variables_mut(&mut self) -> impl Iterator<Item = (&str, &mut Variable)> {
        self.variables.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn coord_names(&self) -> impl Iterator<Item = &str> {
        self.coords.iter().map(String::as_str)
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn variable_rejects_dim_count_mismatch() {
        let array = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![0.0; 6]).unwrap();
        let err = Variable::new(vec!["time"], Values::F64(array)).unwrap_err();
        assert!(matches!(err, TreeError::DimMismatch { dims: 1, ndim: 2, .. }));
    }

    #[test]
    fn coords_must_reference_variables() {
        let mut ds = Dataset::new();
        ds.insert("F", Variable::f64_1d("time", vec![1.0, 2.0]));
        assert!(ds.set_coord("Timestamp").is_err());
        ds.insert_coord("Timestamp", Variable::i64_1d("time", vec![0, 1]));
        assert!(ds.is_coord("Timestamp"));
        assert!(!ds.is_coord("F"));
    }

    #[test]
    fn attr_values_deserialize_untagged() {
        let attrs: AttrMap = serde_json::from_str(
            r#"{"units": "nT", "count": 3, "ratio": 0.5, "flags": ["a", "b"], "ok": true}"#,
        )
        .unwrap();
        assert_eq!(attrs["units"], AttrValue::Text("nT".into()));
        assert_eq!(attrs["count"], AttrValue::Int(3));
        assert_eq!(attrs["ratio"], AttrValue::Float(0.5));
        assert_eq!(attrs["flags"], AttrValue::TextList(vec!["a".into(), "b".into()]));
        assert_eq!(attrs["ok"], AttrValue::Bool(true));
    }
}
