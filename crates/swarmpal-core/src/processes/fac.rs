use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use swarmpal_tree::{DataTree, Dataset, Values, Variable};

use super::{active_node, default_active_tree, PalProcess};
use crate::error::{PalError, Result};
use crate::metadata::record_process;
use crate::processes::residual::RESIDUAL_VAR;

const MU0: f64 = 4.0e-7 * std::f64::consts::PI;

/// Simplified single-satellite field-aligned current estimate.
///
/// Takes the time derivative of the residual's east component (central
/// differences, one-sided at the ends) and converts it to a current
/// density via `j = dB_E/dt / (2 * mu0 * v)` with `v` the along-track
/// spacecraft speed. Requires `B_NEC_res` (see `mag.residual`) with a
/// time coordinate as its first dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacSingleSatParams {
    /// Along-track speed in m/s.
    #[serde(default = "default_velocity")]
    pub velocity: f64,
    #[serde(default = "default_active_tree")]
    pub active_tree: String,
}

fn default_velocity() -> f64 {
    7600.0
}

pub struct FacSingleSatProcess {
    params: FacSingleSatParams,
}

impl FacSingleSatProcess {
    pub fn new(params: FacSingleSatParams) -> Self {
        Self { params }
    }

    fn time_seconds(&self, dataset: &Dataset, time_name: &str) -> Result<Vec<f64>> {
        let time = dataset.get(time_name).ok_or_else(|| {
            PalError::process(
                self.name(),
                format!("no time variable '{time_name}' alongside {RESIDUAL_VAR}"),
            )
        })?;
        Ok(match &time.values {
            // i64 time follows the crate convention: microseconds since epoch
            Values::I64(a) => a.iter().map(|us| *us as f64 / 1e6).collect(),
            Values::F64(a) => a.iter().copied().collect(),
            other => {
                return Err(PalError::process(
                    self.name(),
                    format!("time variable '{time_name}' has dtype {}", other.dtype()),
                ))
            }
        })
    }

    fn fac_for(&self, dataset: &mut Dataset) -> Result<()> {
        let residual = dataset.get(RESIDUAL_VAR).expect("checked by caller");
        let time_name = residual
            .dims
            .first()
            .cloned()
            .ok_or_else(|| PalError::process(self.name(), "residual has no dimensions"))?;
        let east: Vec<f64> = match &residual.values {
            Values::F64(a) if a.ndim() == 2 && a.shape()[1] == 3 => {
                (0..a.shape()[0]).map(|i| a[[i, 1]]).collect()
            }
            _ => {
                return Err(PalError::process(
                    self.name(),
                    format!("{RESIDUAL_VAR} must be an f64 array of shape (time, 3)"),
                ))
            }
        };
        let t = self.time_seconds(dataset, &time_name)?;
        let n = east.len();
        if t.len() != n {
            return Err(PalError::process(
                self.name(),
                format!(
                    "time variable '{time_name}' has {} samples, {RESIDUAL_VAR} has {n} rows",
                    t.len()
                ),
            ));
        }
        if n < 2 {
            return Err(PalError::process(
                self.name(),
                "needs at least two samples to differentiate",
            ));
        }
        if t.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(PalError::process(
                self.name(),
                format!("time variable '{time_name}' must be strictly increasing"),
            ));
        }

        let mut db_dt = vec![0.0; n];
        db_dt[0] = (east[1] - east[0]) / (t[1] - t[0]);
        db_dt[n - 1] = (east[n - 1] - east[n - 2]) / (t[n - 1] - t[n - 2]);
        for i in 1..n - 1 {
            db_dt[i] = (east[i + 1] - east[i - 1]) / (t[i + 1] - t[i - 1]);
        }

        // nT/s -> T/s, A/m^2 -> uA/m^2
        let scale = 1e-9 / (2.0 * MU0 * self.params.velocity) * 1e6;
        let fac: Vec<f64> = db_dt.into_iter().map(|v| v * scale).collect();
        let array = ArrayD::from_shape_vec(IxDyn(&[n]), fac)
            .map_err(|err| PalError::process(self.name(), err.to_string()))?;
        let variable = Variable::new(vec![time_name], Values::F64(array))?
            .with_attr("units", "uA/m2")
            .with_attr(
                "description",
                "Field-aligned current estimate, single-satellite method",
            );
        dataset.insert("FAC", variable);
        Ok(())
    }
}

impl PalProcess for FacSingleSatProcess {
    fn name(&self) -> &'static str {
        "fac.single_sat"
    }

    fn apply(&self, mut tree: DataTree) -> Result<DataTree> {
        let node = active_node(&mut tree, &self.params.active_tree, self.name())?;
        let mut touched = 0usize;
        let mut failure = None;
        node.for_each_dataset_mut(&mut |dataset| {
            if failure.is_some() || !dataset.contains(RESIDUAL_VAR) {
                return;
            }
            match self.fac_for(dataset) {
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
                format!("no dataset in the active tree has {RESIDUAL_VAR}; run mag.residual first"),
            ));
        }
        record_process(node, self.name(), serde_json::to_value(&self.params)?)?;
        Ok(tree)
    }
}
