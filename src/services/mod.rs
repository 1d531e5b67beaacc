//! Relay services.
//!
//! The GitHub client sits behind the [`GitHubApi`] trait so the relay logic
//! and the HTTP routes can run against a fake in tests.

pub mod github_client;
pub mod graphql;
pub mod oauth;
pub mod ownership;
pub mod pagination;
pub mod relay;
pub mod relay_api;
pub mod relay_server;
pub mod response_cache;
pub mod reviewers;

pub use github_client::{GitHubApi, GitHubClient, GitHubClientConfig};
pub use oauth::OAuthClient;
pub use relay::Relay;
pub use relay_api::{relay_routes, RelayState, TRUNCATED_HEADER};
pub use relay_server::{build_router, run, start_relay_server, RelayServerHandle};
pub use response_cache::{CacheKey, ResponseCache};
