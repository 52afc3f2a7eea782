// src/aggregate/mod.rs
mod aggregator;

pub use aggregator::Aggregator;
