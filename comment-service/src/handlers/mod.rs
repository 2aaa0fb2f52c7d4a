pub mod comments;
pub mod error;
pub mod extract;
pub mod health;
pub mod resource;
pub mod users;

pub use health::{health_check, metrics_endpoint, readiness_check};
