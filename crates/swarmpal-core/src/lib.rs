//! SwarmPAL core: YAML-driven batch orchestration, data providers, and
//! dataset processes for Swarm geomagnetic data.

pub mod batch;
pub mod config;
pub mod error;
pub mod express;
pub mod hapi;
pub mod metadata;
pub mod processes;
pub mod providers;
pub mod queries;
pub mod spacecraft;
pub mod window;

pub use batch::run_batch;
pub use config::BatchConfig;
pub use error::{PalError, Result};
pub use processes::make_process;
pub use providers::get_data;
