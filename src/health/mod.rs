// src/health/mod.rs
mod check;
mod result;
mod store;

pub use check::{run_probe, FnCheck, HealthCheck};
pub use result::{HealthResult, ResultSnapshot};
pub use store::{ResultStore, StoredResult};
