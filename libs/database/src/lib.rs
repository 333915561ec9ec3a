//! Database connectors shared by the services in this workspace.
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB client configuration, connection and health checks
//! - `config` - Load configuration through `core_config::FromEnv`
//!
//! # Example
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::mongodb::{MongoConfig, connect_from_config};
//!
//! let config = MongoConfig::from_env()?;
//! let client = connect_from_config(&config).await?;
//! let users = client
//!     .database(config.database())
//!     .collection::<mongodb::bson::Document>(config.collection());
//! ```

#[cfg(feature = "mongodb")]
pub mod mongodb;
