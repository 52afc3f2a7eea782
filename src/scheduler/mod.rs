// src/scheduler/mod.rs
mod registry;
mod worker;

pub use registry::{Scheduler, TestInfo};
