//! Relay HTTP server.
//!
//! Serves the relay routes with permissive CORS so the dashboard can call it
//! from any origin. Binds to 0.0.0.0 on the configured port.

use crate::config::RelayConfig;
use crate::error::AppError;
use crate::services::github_client::{GitHubApi, GitHubClient, GitHubClientConfig};
use crate::services::oauth::OAuthClient;
use crate::services::relay::Relay;
use crate::services::relay_api::{relay_routes, RelayState};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Handle to control a running relay server.
pub struct RelayServerHandle {
    cancel_token: CancellationToken,
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl RelayServerHandle {
    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Token that stops the server when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop accepting connections and wait for in-flight requests to drain.
    pub async fn stop(self) {
        log::info!("[relay] Stopping server on {}", self.addr);
        self.cancel_token.cancel();
        self.wait().await;
    }

    /// Wait until the server task exits.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            log::error!("[relay] Server task failed: {}", e);
        }
    }
}

/// Build the full router for a relay state.
pub fn build_router<A: GitHubApi>(state: RelayState<A>) -> Router {
    relay_routes()
        .with_state(state)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

/// Serve `app` on an already bound listener until the returned handle is
/// stopped.
pub fn start_relay_server(listener: TcpListener, app: Router) -> Result<RelayServerHandle, AppError> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Failed to read listener address: {}", e)))?;

    let cancel_token = CancellationToken::new();
    let cancel_clone = cancel_token.clone();

    log::info!("[relay] Server starting on http://{}", addr);

    let task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            cancel_clone.cancelled().await;
        });

        if let Err(e) = server.await {
            log::error!("[relay] Server error: {}", e);
        }

        log::info!("[relay] Server stopped");
    });

    Ok(RelayServerHandle {
        cancel_token,
        addr,
        task,
    })
}

/// Wire the production GitHub client into a relay state.
pub fn relay_state(config: &RelayConfig) -> Result<RelayState<GitHubClient>, AppError> {
    let api = GitHubClient::new(GitHubClientConfig::from(config))?;
    let oauth = OAuthClient::new(config)?;

    Ok(RelayState {
        relay: Arc::new(Relay::from_config(api, config)),
        oauth: Arc::new(oauth),
        allow_adhoc_graphql: config.allow_adhoc_graphql,
    })
}

/// Bind the configured port and serve until `shutdown` is cancelled.
pub async fn run(config: RelayConfig, shutdown: CancellationToken) -> Result<(), AppError> {
    let state = relay_state(&config)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::configuration(format!("Failed to bind to port {}: {}", config.port, e)))?;

    log::info!(
        "[relay] Relaying organization {} via {}",
        config.organization,
        config.api_url
    );
    if !config.allow_adhoc_graphql {
        log::info!("[relay] Ad-hoc GraphQL queries are disabled");
    }

    let handle = start_relay_server(listener, build_router(state))?;

    shutdown.cancelled().await;
    handle.stop().await;
    Ok(())
}
