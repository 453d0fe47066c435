use serde::{Deserialize, Serialize};
use swarmpal_tree::{DataTree, Dataset, Values, Variable};

use super::{active_node, default_active_tree, PalProcess};
use crate::error::{PalError, Result};
use crate::metadata::record_process;

pub const RESIDUAL_VAR: &str = "B_NEC_res";

/// Magnetic data-model residual in the NEC frame:
/// `B_NEC_res = B_NEC - B_NEC_<model>` on every dataset holding both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualParams {
    /// Model name; inferred when the dataset carries exactly one
    /// `B_NEC_<model>` variable.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_active_tree")]
    pub active_tree: String,
}

pub struct ResidualProcess {
    params: ResidualParams,
}

impl ResidualProcess {
    pub fn new(params: ResidualParams) -> Self {
        Self { params }
    }

    fn model_variable(&self, dataset: &Dataset) -> Result<String> {
        if let Some(model) = &self.params.model {
            let name = format!("B_NEC_{model}");
            if !dataset.contains(&name) {
                return Err(PalError::process(
                    self.name(),
                    format!("one of B_NEC or {name} is not available"),
                ));
            }
            return Ok(name);
        }
        let candidates: Vec<String> = dataset
            .variable_names()
            .filter(|name| name.starts_with("B_NEC_") && *name != RESIDUAL_VAR)
            .map(String::from)
            .collect();
        match candidates.as_slice() {
            [] => Err(PalError::process(self.name(), "no models identified")),
            [single] => Ok(single.clone()),
            _ => Err(PalError::process(
                self.name(),
                format!("more than one model available: {}", candidates.join(", ")),
            )),
        }
    }

    fn residual_for(&self, dataset: &mut Dataset) -> Result<()> {
        let model_var = self.model_variable(dataset)?;
        let measured = match &dataset.get("B_NEC").expect("checked by caller").values {
            Values::F64(a) => a.clone(),
            other => {
                return Err(PalError::process(
                    self.name(),
                    format!("B_NEC has dtype {}, expected f64", other.dtype()),
                ))
            }
        };
        let model = match &dataset.get(&model_var).expect("checked above").values {
            Values::F64(a) => a.clone(),
            other => {
                return Err(PalError::process(
                    self.name(),
                    format!("{model_var} has dtype {}, expected f64", other.dtype()),
                ))
            }
        };
        if measured.shape() != model.shape() {
            return Err(PalError::process(
                self.name(),
                format!(
                    "shape mismatch: B_NEC {:?} vs {model_var} {:?}",
                    measured.shape(),
                    model.shape()
                ),
            ));
        }
        let dims = dataset.get("B_NEC").expect("checked").dims.clone();
        let residual = Variable::new(dims, Values::F64(measured - model))?
            .with_attr("units", "nT")
            .with_attr(
                "description",
                "Magnetic field vector data-model residual, NEC frame",
            );
        dataset.insert(RESIDUAL_VAR, residual);
        Ok(())
    }
}

impl PalProcess for ResidualProcess {
    fn name(&self) -> &'static str {
        "mag.residual"
    }

    fn apply(&self, mut tree: DataTree) -> Result<DataTree> {
        let node = active_node(&mut tree, &self.params.active_tree, self.name())?;
        let mut touched = 0usize;
        let mut failure = None;
        node.for_each_dataset_mut(&mut |dataset| {
            if failure.is_some() || !dataset.contains("B_NEC") {
                return;
            }
            match self.residual_for(dataset) {
                Ok(()) => touched += 1,
                Err(err) => failure = Some(err),
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        if touched == 0 {
            return Err(PalError::process(
                self.name(),
                "no dataset in the active tree has a B_NEC variable",
            ));
        }
        record_process(node, self.name(), serde_json::to_value(&self.params)?)?;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn mag_dataset(model_names: &[&str]) -> Dataset {
        let mut ds = Dataset::new();
        let measured = ArrayD::from_shape_vec(
            IxDyn(&[2, 3]),
            vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0],
        )
        .unwrap();
        ds.insert(
            "B_NEC",
            Variable::new(vec!["Timestamp", "NEC"], Values::F64(measured)).unwrap(),
        );
        for name in model_names {
            let model =
                ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
                    .unwrap();
            ds.insert(
                &format!("B_NEC_{name}"),
                Variable::new(vec!["Timestamp", "NEC"], Values::F64(model)).unwrap(),
            );
        }
        ds
    }

    fn apply(params: ResidualParams, ds: Dataset) -> Result<DataTree> {
        let mut tree = DataTree::new();
        tree.insert("mag", DataTree::from_dataset(ds));
        ResidualProcess::new(params).apply(tree)
    }

    #[test]
    fn computes_residual_with_inferred_model() {
        let out = apply(
            ResidualParams {
                model: None,
                active_tree: "/".to_string(),
            },
            mag_dataset(&["IGRF"]),
        )
        .unwrap();
        let res = out.get("mag").unwrap().dataset().get(RESIDUAL_VAR).unwrap();
        match &res.values {
            Values::F64(a) => {
                assert_eq!(a[[0, 0]], 9.0);
                assert_eq!(a[[1, 2]], 54.0);
            }
            other => panic!("unexpected dtype {}", other.dtype()),
        }
        assert_eq!(res.attrs["units"], "nT".into());
    }

    #[test]
    fn ambiguous_models_are_rejected() {
        let err = apply(
            ResidualParams {
                model: None,
                active_tree: "/".to_string(),
            },
            mag_dataset(&["IGRF", "CHAOS"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than one model"));
    }

    #[test]
    fn explicit_model_must_exist() {
        let err = apply(
            ResidualParams {
                model: Some("CHAOS".to_string()),
                active_tree: "/".to_string(),
            },
            mag_dataset(&["IGRF"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("B_NEC_CHAOS"));
    }

    #[test]
    fn missing_b_nec_everywhere_is_an_error() {
        let err = apply(
            ResidualParams {
                model: None,
                active_tree: "/".to_string(),
            },
            Dataset::new(),
        )
        .unwrap_err();
        assert!(matches!(err, PalError::Process { .. }));
    }
}
