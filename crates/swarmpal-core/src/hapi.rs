//! Minimal HAPI client: `info` metadata requests and CSV data requests,
//! assembled into a [`Dataset`].
//!
//! Only the slice of the protocol the providers need is implemented.
//! Query parameters are sent in both HAPI 2 (`id`, `time.min`) and HAPI 3
//! (`dataset`, `start`) spellings so either server generation answers.

use ndarray::{ArrayD, IxDyn};
use serde::Deserialize;
use swarmpal_tree::{Dataset, Values, Variable};

use crate::error::{PalError, Result};
use crate::window::parse_time;

pub const TIME_UNITS: &str = "microseconds since 1970-01-01T00:00:00Z";

#[derive(Debug, Clone, Deserialize)]
pub struct HapiInfo {
    #[serde(default)]
    pub parameters: Vec<HapiParameterInfo>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(rename = "stopDate", default)]
    pub stop_date: Option<String>,
    #[serde(default)]
    pub status: Option<HapiStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HapiStatus {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HapiParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub units: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: Option<Vec<usize>>,
}

impl HapiParameterInfo {
    /// Number of flattened CSV columns this parameter occupies.
    fn ncols(&self) -> usize {
        self.size
            .as_ref()
            .map(|size| size.iter().product())
            .unwrap_or(1)
    }

    fn units_text(&self) -> Option<String> {
        match self.units.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            _ => None,
        }
    }
}

pub struct HapiClient {
    server: String,
    http: reqwest::blocking::Client,
}

impl HapiClient {
    pub fn new(server: &str) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("swarmpal/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            server: server.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn info(&self, dataset: &str, parameters: Option<&str>) -> Result<HapiInfo> {
        let url = format!("{}/info", self.server);
        let mut query: Vec<(&str, String)> = vec![
            ("id", dataset.to_string()),
            ("dataset", dataset.to_string()),
        ];
        if let Some(parameters) = parameters {
            query.push(("parameters", parameters.to_string()));
        }
        let info: HapiInfo = self
            .http
            .get(url)
            .query(&query)
            .send()?
            .error_for_status()?
            .json()?;
        if let Some(status) = &info.status {
            if status.code != 1200 {
                return Err(PalError::Provider(format!(
                    "HAPI server '{}' returned status {} {}",
                    self.server, status.code, status.message
                )));
            }
        }
        Ok(info)
    }

    pub fn data_csv(
        &self,
        dataset: &str,
        parameters: Option<&str>,
        start: &str,
        stop: &str,
    ) -> Result<String> {
        let url = format!("{}/data", self.server);
        let mut query: Vec<(&str, String)> = vec![
            ("id", dataset.to_string()),
            ("dataset", dataset.to_string()),
            ("time.min", start.to_string()),
            ("time.max", stop.to_string()),
            ("start", start.to_string()),
            ("stop", stop.to_string()),
            ("format", "csv".to_string()),
        ];
        if let Some(parameters) = parameters {
            query.push(("parameters", parameters.to_string()));
        }
        Ok(self
            .http
            .get(url)
            .query(&query)
            .send()?
            .error_for_status()?
            .text()?)
    }

    /// Fetch parameter metadata and data, assembled into a dataset.
    pub fn fetch_dataset(
        &self,
        dataset: &str,
        parameters: Option<&str>,
        start: &str,
        stop: &str,
    ) -> Result<Dataset> {
        let info = self.info(dataset, parameters)?;
        let csv_text = self.data_csv(dataset, parameters, start, stop)?;
        dataset_from_csv(&info, &csv_text)
    }
}

/// Assemble a dataset from a HAPI info response and CSV data.
///
/// The first parameter is the time variable (ISO 8601 converted to i64
/// microseconds since the epoch, marked as a coordinate); the remaining
/// parameters become variables dimensioned over time plus one
/// `<name>_dim<k>` dimension per entry in their `size` metadata.
pub fn dataset_from_csv(info: &HapiInfo, csv_text: &str) -> Result<Dataset> {
    let (time_param, data_params) = info
        .parameters
        .split_first()
        .ok_or_else(|| PalError::Provider("HAPI info lists no parameters".to_string()))?;

    let expected_cols: usize = 1 + data_params.iter().map(HapiParameterInfo::ncols).sum::<usize>();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut times_us: Vec<i64> = Vec::new();
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); expected_cols - 1];
    for record in reader.records() {
        let record = record.map_err(|err| PalError::Provider(format!("HAPI CSV: {err}")))?;
        if record.is_empty() || (record.len() == 1 && record[0].is_empty()) {
            continue;
        }
        if record.len() != expected_cols {
            return Err(PalError::Provider(format!(
                "HAPI CSV row has {} columns, info describes {expected_cols}",
                record.len()
            )));
        }
        times_us.push(parse_time(&record[0])?.timestamp_micros());
        for (slot, value) in columns.iter_mut().zip(record.iter().skip(1)) {
            slot.push(value.to_string());
        }
    }
    let ntime = times_us.len();

    let mut dataset = Dataset::new();
    let time_name = time_param.name.as_str();
    let mut time_var = Variable::i64_1d(time_name, times_us).with_attr("units", TIME_UNITS);
    if let Some(description) = &time_param.description {
        time_var = time_var.with_attr("description", description.as_str());
    }
    dataset.insert_coord(time_name, time_var);

    let mut col = 0usize;
    for param in data_params {
        let ncols = param.ncols();
        let mut shape = vec![ntime];
        let mut dims = vec![time_name.to_string()];
        if let Some(size) = &param.size {
            for (k, extent) in size.iter().enumerate() {
                shape.push(*extent);
                dims.push(format!("{}_dim{}", param.name, k + 1));
            }
        }

        // Row-major: each row contributes this parameter's ncols columns
        let values = match param.kind.as_str() {
            "double" => {
                let mut data = Vec::with_capacity(ntime * ncols);
                for row in 0..ntime {
                    for c in 0..ncols {
                        let raw = &columns[col + c][row];
                        data.push(raw.parse::<f64>().map_err(|_| {
                            PalError::Provider(format!(
                                "HAPI CSV: '{raw}' is not a double for parameter '{}'",
                                param.name
                            ))
                        })?);
                    }
                }
                Values::F64(
                    ArrayD::from_shape_vec(IxDyn(&shape), data)
                        .map_err(|err| PalError::Provider(err.to_string()))?,
                )
            }
            "integer" => {
                let mut data = Vec::with_capacity(ntime * ncols);
                for row in 0..ntime {
                    for c in 0..ncols {
                        let raw = &columns[col + c][row];
                        data.push(raw.parse::<i64>().map_err(|_| {
                            PalError::Provider(format!(
                                "HAPI CSV: '{raw}' is not an integer for parameter '{}'",
                                param.name
                            ))
                        })?);
                    }
                }
                Values::I64(
                    ArrayD::from_shape_vec(IxDyn(&shape), data)
                        .map_err(|err| PalError::Provider(err.to_string()))?,
                )
            }
            _ => {
                let mut data = Vec::with_capacity(ntime * ncols);
                for row in 0..ntime {
                    for c in 0..ncols {
                        data.push(columns[col + c][row].clone());
                    }
                }
                Values::Str(
                    ArrayD::from_shape_vec(IxDyn(&shape), data)
                        .map_err(|err| PalError::Provider(err.to_string()))?,
                )
            }
        };

        let mut variable = Variable::new(dims, values)?;
        if let Some(units) = param.units_text() {
            variable = variable.with_attr("units", units);
        }
        if let Some(description) = &param.description {
            variable = variable.with_attr("description", description.as_str());
        }
        dataset.insert(&param.name, variable);
        col += ncols;
    }

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmpal_tree::AttrValue;

    const INFO: &str = r#"{
        "HAPI": "3.0",
        "status": {"code": 1200, "message": "OK"},
        "startDate": "2013-11-25T11:02:52Z",
        "stopDate": "2024-01-01T00:00:00Z",
        "parameters": [
            {"name": "Timestamp", "type": "isotime", "length": 24, "units": "UTC"},
            {"name": "F", "type": "double", "units": "nT", "description": "Field intensity"},
            {"name": "B_NEC", "type": "double", "units": "nT", "size": [3]},
            {"name": "Flags_B", "type": "integer", "units": null}
        ]
    }"#;

    const CSV: &str = "\
2016-01-01T00:00:00.000Z,53000.1,20000.0,-3000.5,44000.0,0
2016-01-01T00:00:01.000Z,53001.2,20001.0,-3001.5,44001.0,1
";

    fn info() -> HapiInfo {
        serde_json::from_str(INFO).unwrap()
    }

    #[test]
    fn assembles_dataset_from_csv() {
        let ds = dataset_from_csv(&info(), CSV).unwrap();

        assert!(ds.is_coord("Timestamp"));
        let time = ds.get("Timestamp").unwrap();
        assert_eq!(time.attrs["units"], AttrValue::Text(TIME_UNITS.into()));
        match &time.values {
            Values::I64(a) => {
                assert_eq!(a.shape(), &[2]);
                assert_eq!(a[[0]], 1_451_606_400_000_000);
                assert_eq!(a[[1]] - a[[0]], 1_000_000);
            }
            other => panic!("unexpected dtype {}", other.dtype()),
        }

        let b_nec = ds.get("B_NEC").unwrap();
        assert_eq!(b_nec.dims, vec!["Timestamp", "B_NEC_dim1"]);
        match &b_nec.values {
            Values::F64(a) => {
                assert_eq!(a.shape(), &[2, 3]);
                assert_eq!(a[[0, 1]], -3000.5);
                assert_eq!(a[[1, 2]], 44001.0);
            }
            other => panic!("unexpected dtype {}", other.dtype()),
        }

        let f = ds.get("F").unwrap();
        assert_eq!(f.attrs["units"], AttrValue::Text("nT".into()));
        assert_eq!(
            f.attrs["description"],
            AttrValue::Text("Field intensity".into())
        );

        match &ds.get("Flags_B").unwrap().values {
            Values::I64(a) => assert_eq!(a[[1]], 1),
            other => panic!("unexpected dtype {}", other.dtype()),
        }
    }

    #[test]
    fn rejects_column_count_mismatch() {
        let err = dataset_from_csv(&info(), "2016-01-01T00:00:00Z,1.0,2.0\n").unwrap_err();
        assert!(matches!(err, PalError::Provider(_)));
    }

    #[test]
    fn empty_body_yields_empty_dataset() {
        let ds = dataset_from_csv(&info(), "").unwrap();
        match &ds.get("F").unwrap().values {
            Values::F64(a) => assert_eq!(a.shape(), &[0]),
            other => panic!("unexpected dtype {}", other.dtype()),
        }
    }
}
