//! MongoDB connection management and health checks

mod config;
mod connector;
mod health;

pub use config::{DEFAULT_COLLECTION, DEFAULT_DATABASE, MongoConfig};
pub use connector::{MongoError, client_options, connect_from_config};
pub use health::{HealthStatus, check_health};

// Re-export MongoDB types for convenience
pub use mongodb::{Client, Collection, Database};
