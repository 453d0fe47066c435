//! Collection-freshness queries against the VirES HAPI endpoint.

use chrono::{DateTime, Utc};

use crate::error::{PalError, Result};
use crate::hapi::HapiClient;
use crate::providers::DEFAULT_VIRES_SERVER;
use crate::window::parse_time;

/// Server consulted for freshness queries; override with the
/// `SWARMPAL_HAPI_SERVER` environment variable.
pub fn hapi_server() -> String {
    std::env::var("SWARMPAL_HAPI_SERVER").unwrap_or_else(|_| DEFAULT_VIRES_SERVER.to_string())
}

/// UTC of the last available data for a collection,
/// e.g. `SW_FAST_MAGA_LR_1B`.
pub fn last_available_time(collection: &str) -> Result<DateTime<Utc>> {
    let server = hapi_server();
    let info = HapiClient::new(&server).info(collection, None)?;
    let stop_date = info.stop_date.ok_or_else(|| {
        PalError::Provider(format!(
            "HAPI server '{server}' reports no stopDate for '{collection}'"
        ))
    })?;
    parse_time(&stop_date)
}
