//! HTTP routes of the relay.
//!
//! Handlers never turn upstream failures into error statuses: they answer
//! 200 with empty, `null`, `false` or partial bodies. Only malformed request
//! bodies and refused operations produce 4xx responses.

use crate::error::AppError;
use crate::models::{InviteRequest, InviteResponse, ReviewerBatchItem, ReviewerRequest};
use crate::services::github_client::GitHubApi;
use crate::services::oauth::{render_callback_page, OAuthClient, OAuthSession};
use crate::services::pagination::PageCollection;
use crate::services::relay::Relay;
use crate::services::reviewers::{request_reviewer, request_reviewers_batch};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Response header set when a paginated body was cut short by an upstream
/// failure or a listing page ceiling.
pub const TRUNCATED_HEADER: &str = "x-relay-truncated";

/// Shared state for the relay's axum routes.
pub struct RelayState<A> {
    pub relay: Arc<Relay<A>>,
    pub oauth: Arc<OAuthClient>,
    /// Whether `/gql-query` runs caller-supplied GraphQL.
    pub allow_adhoc_graphql: bool,
}

impl<A> Clone for RelayState<A> {
    fn clone(&self) -> Self {
        Self {
            relay: self.relay.clone(),
            oauth: self.oauth.clone(),
            allow_adhoc_graphql: self.allow_adhoc_graphql,
        }
    }
}

// ── Error handling ───────────────────────────────────────────────────────────

/// JSON error body for the few requests the relay refuses.
#[derive(Serialize)]
struct ApiError {
    code: String,
    message: String,
}

/// Wrapper to make AppError usable as an axum error response.
pub struct ApiErr(AppError);

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            AppError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        (
            status,
            Json(ApiError {
                code: code.to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

#[derive(Deserialize)]
struct GraphqlQueryBody {
    query: String,
}

/// JSON array of the collected items, flagged with [`TRUNCATED_HEADER`] when
/// the collection stopped on an error.
fn page_response<T: Serialize>(collection: PageCollection<T>) -> Response {
    let truncated = collection.truncated;
    let mut response = Json(collection.items).into_response();
    if truncated {
        response
            .headers_mut()
            .insert(TRUNCATED_HEADER, HeaderValue::from_static("true"));
    }
    response
}

// ── Route builder ────────────────────────────────────────────────────────────

/// Build the relay routes.
pub fn relay_routes<A: GitHubApi>() -> Router<RelayState<A>> {
    Router::new()
        .route("/", get(health))
        .route("/oauth", get(oauth_session::<A>))
        .route("/oauth/callback", get(oauth_callback::<A>))
        .route("/invite", post(invite::<A>))
        .route("/users", get(list_users::<A>))
        .route("/repos", get(list_repos::<A>))
        .route("/request-reviewer", post(request_single_reviewer::<A>))
        .route("/request-reviewers", post(request_many_reviewers::<A>))
        .route("/events", get(list_events::<A>))
        .route("/events/repo-created", get(list_repo_created_events::<A>))
        .route("/limit", get(rate_limit::<A>))
        .route("/gql", get(organization_overview::<A>))
        .route("/gql-query", post(run_graphql_query::<A>))
        .route("/clear-cache", get(clear_cache::<A>))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /: liveness.
async fn health() -> &'static str {
    "OK"
}

/// GET /oauth: start a login handshake.
async fn oauth_session<A: GitHubApi>(State(state): State<RelayState<A>>) -> Json<OAuthSession> {
    Json(state.oauth.new_session())
}

/// GET /oauth/callback?code=X&state=Y: exchange the code, hand the token to
/// the opener window.
async fn oauth_callback<A: GitHubApi>(
    State(state): State<RelayState<A>>,
    Query(params): Query<CallbackQuery>,
) -> Html<String> {
    let token = match params.code.as_deref() {
        Some(code) => state
            .oauth
            .exchange_code(code, params.state.as_deref())
            .await
            .map_err(|e| log::warn!("[oauth] code exchange failed: {}", e))
            .ok(),
        None => {
            log::warn!("[oauth] callback without a code");
            None
        }
    };

    Html(render_callback_page(token.as_deref()))
}

/// POST /invite: invite a user, optionally provisioning their repository.
async fn invite<A: GitHubApi>(
    State(state): State<RelayState<A>>,
    Json(request): Json<InviteRequest>,
) -> Json<InviteResponse> {
    Json(state.relay.invite(&request).await)
}

/// GET /users: organization members.
async fn list_users<A: GitHubApi>(State(state): State<RelayState<A>>) -> Response {
    page_response(state.relay.members().await)
}

/// GET /repos: repositories with owner and pull requests.
async fn list_repos<A: GitHubApi>(State(state): State<RelayState<A>>) -> Response {
    page_response(state.relay.repositories().await)
}

/// POST /request-reviewer: request one review.
async fn request_single_reviewer<A: GitHubApi>(
    State(state): State<RelayState<A>>,
    Json(request): Json<ReviewerRequest>,
) -> Json<bool> {
    Json(
        request_reviewer(
            state.relay.api(),
            &request.username,
            request.pull_request.url(),
        )
        .await,
    )
}

/// POST /request-reviewers: request reviews sequentially; always `true`.
async fn request_many_reviewers<A: GitHubApi>(
    State(state): State<RelayState<A>>,
    Json(items): Json<Vec<ReviewerBatchItem>>,
) -> Json<bool> {
    request_reviewers_batch(state.relay.api(), &items).await;
    Json(true)
}

/// GET /events: organization events, up to four pages.
async fn list_events<A: GitHubApi>(State(state): State<RelayState<A>>) -> Response {
    page_response(state.relay.events().await)
}

/// GET /events/repo-created: `CreateEvent`s only.
async fn list_repo_created_events<A: GitHubApi>(State(state): State<RelayState<A>>) -> Response {
    page_response(state.relay.repository_created_events().await)
}

/// GET /limit: raw rate-limit payload.
async fn rate_limit<A: GitHubApi>(State(state): State<RelayState<A>>) -> Json<Option<Value>> {
    Json(state.relay.rate_limit().await)
}

/// GET /gql: curated repository/pull request/reviewer overview.
async fn organization_overview<A: GitHubApi>(State(state): State<RelayState<A>>) -> Response {
    page_response(state.relay.organization_overview().await)
}

/// POST /gql-query: run a caller-supplied GraphQL query with the relay's
/// credentials, following its first connection.
async fn run_graphql_query<A: GitHubApi>(
    State(state): State<RelayState<A>>,
    Json(body): Json<GraphqlQueryBody>,
) -> Result<Response, ApiErr> {
    if !state.allow_adhoc_graphql {
        return Err(AppError::forbidden("ad-hoc GraphQL queries are disabled").into());
    }
    if body.query.trim().is_empty() {
        return Err(AppError::invalid_input_field("query must not be empty", "query").into());
    }

    Ok(page_response(state.relay.run_query(&body.query).await))
}

/// GET /clear-cache: drop every memoized response.
async fn clear_cache<A: GitHubApi>(State(state): State<RelayState<A>>) -> &'static str {
    state.relay.clear_cache();
    "OK"
}
