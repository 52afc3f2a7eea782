// src/lib.rs
pub mod aggregate;
pub mod alert;
pub mod config;
pub mod health;
pub mod metrics;
pub mod probes;
pub mod publish;
pub mod scheduler;
pub mod server;
