//! Org Relay - backend relay between a dashboard and a GitHub organization.
//!
//! Holds the organization's credentials, fans requests out to GitHub's REST
//! and GraphQL APIs, and memoizes the expensive results in process.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::RelayConfig;
pub use error::AppError;
