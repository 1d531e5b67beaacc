//! Shared fixtures for the integration tests: an in-memory GitHub and helpers
//! to drive the relay router without a socket.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use org_relay_lib::config::{RelayConfig, TemplateRepository};
use org_relay_lib::error::AppError;
use org_relay_lib::models::{Account, Commit, Event, PullRequest, Repository};
use org_relay_lib::services::ownership::OwnerBlocklist;
use org_relay_lib::services::{build_router, GitHubApi, OAuthClient, Relay, RelayState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const API_BASE: &str = "https://api.github.com";

/// In-memory stand-in for GitHub. Every call is recorded as `"<op>"` or
/// `"<op>:<arg>"` so tests can count upstream traffic.
#[derive(Default)]
pub struct FakeGitHub {
    pub events: Vec<Value>,
    /// 1-based event page that answers with an error.
    pub failing_event_page: Option<u32>,
    pub members: Vec<Account>,
    /// 1-based member page that answers with an error.
    pub failing_member_page: Option<u32>,
    pub repositories: Vec<Repository>,
    /// 1-based repository page that answers with an error.
    pub failing_repository_page: Option<u32>,
    pub commits: HashMap<String, Vec<Commit>>,
    pub pulls: HashMap<String, Vec<PullRequest>>,
    /// Status the invitation endpoint fails with; `None` accepts.
    pub invite_failure: Option<u16>,
    /// Reviewers whose review request fails with 422.
    pub rejected_reviewers: Vec<String>,
    /// GraphQL `data` by cursor; the first page is stored under `""`.
    pub graphql_pages: HashMap<String, Value>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeGitHub {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Number of recorded calls for an operation.
    pub fn calls(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == op || c.starts_with(&format!("{}:", op)))
            .count()
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn unprocessable(endpoint: &str) -> AppError {
    AppError::github_api_full("Validation Failed", 422, endpoint)
}

/// GitHub-style 1-based page of `items`.
fn paged<T: Clone>(items: &[T], page: u32, per_page: u32) -> Vec<T> {
    let start = ((page - 1) * per_page) as usize;
    let end = (start + per_page as usize).min(items.len());
    items.get(start..end).unwrap_or_default().to_vec()
}

impl GitHubApi for FakeGitHub {
    async fn list_org_events(&self, page: u32, per_page: u32) -> Result<Vec<Event>, AppError> {
        self.record(format!("events:{}", page));
        if self.failing_event_page == Some(page) {
            return Err(AppError::github_api_full("Server Error", 502, "/orgs/acme/events"));
        }

        Ok(paged(&self.events, page, per_page)
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect())
    }

    async fn list_members(&self, page: u32, per_page: u32) -> Result<Vec<Account>, AppError> {
        self.record(format!("members:{}", page));
        if self.failing_member_page == Some(page) {
            return Err(AppError::github_api_full("Server Error", 502, "/orgs/acme/members"));
        }
        Ok(paged(&self.members, page, per_page))
    }

    async fn list_repositories(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>, AppError> {
        self.record(format!("repositories:{}", page));
        if self.failing_repository_page == Some(page) {
            return Err(AppError::github_api_full("Server Error", 502, "/orgs/acme/repos"));
        }
        Ok(paged(&self.repositories, page, per_page))
    }

    async fn list_commits(&self, repo: &str) -> Result<Vec<Commit>, AppError> {
        self.record(format!("commits:{}", repo));
        Ok(self.commits.get(repo).cloned().unwrap_or_default())
    }

    async fn list_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>, AppError> {
        self.record(format!("pulls:{}", repo));
        Ok(self.pulls.get(repo).cloned().unwrap_or_default())
    }

    async fn invite_member(&self, user_id: i64) -> Result<Value, AppError> {
        self.record(format!("invite:{}", user_id));
        match self.invite_failure {
            Some(status) => Err(AppError::github_api_full(
                "Invitation rejected",
                status,
                "/orgs/acme/invitations",
            )),
            None => Ok(json!({ "id": 1, "invitee": { "id": user_id } })),
        }
    }

    async fn request_reviewers(
        &self,
        pull_api_url: &str,
        reviewers: &[String],
    ) -> Result<u16, AppError> {
        self.record(format!("review:{}:{}", reviewers.join(","), pull_api_url));
        if reviewers.iter().any(|r| self.rejected_reviewers.contains(r)) {
            return Err(unprocessable(pull_api_url));
        }
        Ok(201)
    }

    async fn rate_limit(&self) -> Result<Value, AppError> {
        self.record("rate_limit");
        Ok(json!({ "resources": { "core": { "limit": 5000, "remaining": 4999 } } }))
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Account, AppError> {
        self.record(format!("user:{}", user_id));
        Ok(account(&format!("user{}", user_id)))
    }

    async fn generate_repository(
        &self,
        template: &TemplateRepository,
        name: &str,
    ) -> Result<Repository, AppError> {
        self.record(format!("generate:{}/{}:{}", template.owner, template.name, name));
        Ok(repository(99, name))
    }

    async fn add_collaborator(&self, repo: &str, login: &str) -> Result<(), AppError> {
        self.record(format!("collaborator:{}:{}", repo, login));
        Ok(())
    }

    async fn graphql(&self, _query: &str, variables: Value) -> Result<Value, AppError> {
        let cursor = variables
            .get("cursor")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.record(format!("graphql:{}", cursor));
        self.graphql_pages
            .get(&cursor)
            .cloned()
            .ok_or_else(|| AppError::github_api("Something went wrong"))
    }

    fn api_base(&self) -> &str {
        API_BASE
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn account(login: &str) -> Account {
    serde_json::from_value(json!({ "login": login, "type": "User" })).unwrap()
}

pub fn repository(id: i64, name: &str) -> Repository {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "full_name": format!("acme/{}", name),
        "html_url": format!("https://github.com/acme/{}", name),
    }))
    .unwrap()
}

pub fn commit_by(login: &str) -> Commit {
    serde_json::from_value(json!({
        "sha": format!("sha-{}", login),
        "author": { "login": login },
        "commit": { "message": "work", "author": { "name": login, "email": format!("{}@example.com", login) } },
        "html_url": "https://github.com/acme/x/commit/1",
    }))
    .unwrap()
}

pub fn event(id: usize, kind: &str) -> Value {
    json!({ "id": id.to_string(), "type": kind, "actor": { "login": "octocat" } })
}

pub fn config() -> RelayConfig {
    RelayConfig::from_lookup(|name| {
        match name {
            "ORGANIZATION" => Some("acme"),
            "USERNAME" => Some("relay-bot"),
            "PRIVATE_KEY" => Some("ghp_secret"),
            "CLIENT_ID" => Some("Iv1.client"),
            "CLIENT_SECRET" => Some("shh"),
            _ => None,
        }
        .map(String::from)
    })
    .unwrap()
}

pub fn template() -> TemplateRepository {
    TemplateRepository::parse("acme/starter").unwrap()
}

// ── Router harness ───────────────────────────────────────────────────────────

pub struct Harness {
    pub app: Router,
    pub relay: Arc<Relay<FakeGitHub>>,
}

impl Harness {
    pub fn new(fake: FakeGitHub) -> Self {
        Self::with_options(fake, None, true)
    }

    pub fn with_options(
        fake: FakeGitHub,
        template: Option<TemplateRepository>,
        allow_adhoc_graphql: bool,
    ) -> Self {
        let relay = Arc::new(Relay::new(fake, "acme", template, OwnerBlocklist::default()));
        let state = RelayState {
            relay: relay.clone(),
            oauth: Arc::new(OAuthClient::new(&config()).unwrap()),
            allow_adhoc_graphql,
        };
        Self {
            app: build_router(state),
            relay,
        }
    }

    pub fn fake(&self) -> &FakeGitHub {
        self.relay.api()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
