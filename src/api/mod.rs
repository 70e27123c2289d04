//! API layer - HTTP endpoint handlers.

mod health;
mod history;
mod metrics;
mod routes;

pub use health::{health, stats};
pub use history::recent_messages;
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
