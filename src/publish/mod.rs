// src/publish/mod.rs
mod publisher;

pub use publisher::{PublishError, ResultPublisher, ResultsPayload};
