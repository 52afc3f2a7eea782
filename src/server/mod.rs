pub mod api;
pub mod builder;
pub mod handler;
pub mod listener;

pub use api::{ApiError, MonitorApi};
pub use builder::ServerBuilder;
pub use handler::RequestHandler;
