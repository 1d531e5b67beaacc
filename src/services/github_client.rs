//! GitHub API client.
//!
//! REST calls authenticate with the configured basic-auth pair, GraphQL calls
//! with the same secret as a bearer token. Every method performs exactly one
//! HTTP request; nothing is retried.

use crate::config::{RelayConfig, TemplateRepository};
use crate::error::AppError;
use crate::models::{Account, Commit, Event, PullRequest, Repository};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// Upstream operations the relay needs from GitHub.
///
/// Implemented by [`GitHubClient`] for real traffic; tests provide fakes.
pub trait GitHubApi: Send + Sync + 'static {
    /// One page of organization events (`page` is GitHub's 1-based number).
    fn list_org_events(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<Event>, AppError>> + Send;

    /// One page of organization members.
    fn list_members(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<Account>, AppError>> + Send;

    /// One page of organization repositories.
    fn list_repositories(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<Repository>, AppError>> + Send;

    /// Most recent commits of an organization repository, newest first.
    fn list_commits(&self, repo: &str)
        -> impl Future<Output = Result<Vec<Commit>, AppError>> + Send;

    fn list_pull_requests(
        &self,
        repo: &str,
    ) -> impl Future<Output = Result<Vec<PullRequest>, AppError>> + Send;

    /// Invite a user to the organization by numeric id.
    fn invite_member(&self, user_id: i64) -> impl Future<Output = Result<Value, AppError>> + Send;

    /// Request reviews on a pull request given its API URL; returns the
    /// upstream status code of a successful call.
    fn request_reviewers(
        &self,
        pull_api_url: &str,
        reviewers: &[String],
    ) -> impl Future<Output = Result<u16, AppError>> + Send;

    fn rate_limit(&self) -> impl Future<Output = Result<Value, AppError>> + Send;

    fn get_user_by_id(&self, user_id: i64) -> impl Future<Output = Result<Account, AppError>> + Send;

    /// Create `{org}/{name}` from a template repository.
    fn generate_repository(
        &self,
        template: &TemplateRepository,
        name: &str,
    ) -> impl Future<Output = Result<Repository, AppError>> + Send;

    fn add_collaborator(
        &self,
        repo: &str,
        login: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Run a GraphQL document and return its `data` object.
    fn graphql(
        &self,
        query: &str,
        variables: Value,
    ) -> impl Future<Output = Result<Value, AppError>> + Send;

    /// Base URL of the REST API, used to validate pull request URLs.
    fn api_base(&self) -> &str;
}

/// GitHub API client configuration.
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// Base URL of the API (e.g., `https://api.github.com`).
    pub base_url: String,

    /// Organization every org-scoped call targets.
    pub organization: String,

    /// Basic-auth username.
    pub username: String,

    /// Basic-auth secret, also used as the GraphQL bearer token.
    pub private_key: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            organization: String::new(),
            username: String::new(),
            private_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl From<&RelayConfig> for GitHubClientConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            base_url: config.api_url.clone(),
            organization: config.organization.clone(),
            username: config.username.clone(),
            private_key: config.private_key.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(config: GitHubClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("org-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the absolute URL for an API path.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn org_path(&self, suffix: &str) -> String {
        format!(
            "/orgs/{}{}",
            urlencoding::encode(&self.config.organization),
            suffix
        )
    }

    fn repo_path(&self, repo: &str, suffix: &str) -> String {
        format!(
            "/repos/{}/{}{}",
            urlencoding::encode(&self.config.organization),
            urlencoding::encode(repo),
            suffix
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.config.username, Some(&self.config.private_key))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .basic_auth(&self.config.username, Some(&self.config.private_key))
    }

    /// Turn a response into its JSON body, or an error carrying the status.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)))
        } else {
            Err(Self::error_from_response(response, endpoint).await)
        }
    }

    async fn error_from_response(response: Response, endpoint: &str) -> AppError {
        let status = response.status();
        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        // GitHub returns errors as {"message": "...", "errors": [...]}
        let body_message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(String::from));

        let message = match (status, &body_message) {
            (StatusCode::UNAUTHORIZED, _) => "Bad credentials".to_string(),
            (StatusCode::NOT_FOUND, _) => "Resource not found".to_string(),
            (StatusCode::TOO_MANY_REQUESTS, _) => "Rate limit exceeded".to_string(),
            (_, Some(msg)) => msg.clone(),
            _ => format!("Request failed ({}): {}", status_code, body),
        };

        AppError::github_api_full(message, status_code, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = self.api_url(endpoint);
        let response = self.get(&url).query(query).send().await?;
        self.handle_response(response, endpoint).await
    }
}

impl GitHubApi for GitHubClient {
    async fn list_org_events(&self, page: u32, per_page: u32) -> Result<Vec<Event>, AppError> {
        let endpoint = self.org_path("/events");
        self.get_json(
            &endpoint,
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    async fn list_members(&self, page: u32, per_page: u32) -> Result<Vec<Account>, AppError> {
        let endpoint = self.org_path("/members");
        self.get_json(
            &endpoint,
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    async fn list_repositories(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>, AppError> {
        let endpoint = self.org_path("/repos");
        self.get_json(
            &endpoint,
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    async fn list_commits(&self, repo: &str) -> Result<Vec<Commit>, AppError> {
        let endpoint = self.repo_path(repo, "/commits");
        match self.get_json(&endpoint, &[]).await {
            // An empty repository answers 409 "Git Repository is empty."
            Err(e) if e.status_code() == Some(409) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn list_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>, AppError> {
        let endpoint = self.repo_path(repo, "/pulls");
        self.get_json(&endpoint, &[("per_page", "100".to_string())])
            .await
    }

    async fn invite_member(&self, user_id: i64) -> Result<Value, AppError> {
        let endpoint = self.org_path("/invitations");
        let url = self.api_url(&endpoint);
        let response = self
            .post(&url)
            .json(&serde_json::json!({ "invitee_id": user_id }))
            .send()
            .await?;
        self.handle_response(response, &endpoint).await
    }

    async fn request_reviewers(
        &self,
        pull_api_url: &str,
        reviewers: &[String],
    ) -> Result<u16, AppError> {
        let url = format!("{}/requested_reviewers", pull_api_url.trim_end_matches('/'));
        let response = self
            .post(&url)
            .json(&serde_json::json!({ "reviewers": reviewers }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(Self::error_from_response(response, &url).await)
        }
    }

    async fn rate_limit(&self) -> Result<Value, AppError> {
        self.get_json("/rate_limit", &[]).await
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Account, AppError> {
        let endpoint = format!("/user/{}", user_id);
        self.get_json(&endpoint, &[]).await
    }

    async fn generate_repository(
        &self,
        template: &TemplateRepository,
        name: &str,
    ) -> Result<Repository, AppError> {
        let endpoint = format!(
            "/repos/{}/{}/generate",
            urlencoding::encode(&template.owner),
            urlencoding::encode(&template.name)
        );
        let url = self.api_url(&endpoint);
        let response = self
            .post(&url)
            .json(&serde_json::json!({
                "owner": self.config.organization,
                "name": name,
                "private": true,
            }))
            .send()
            .await?;
        self.handle_response(response, &endpoint).await
    }

    async fn add_collaborator(&self, repo: &str, login: &str) -> Result<(), AppError> {
        let endpoint = self.repo_path(repo, &format!("/collaborators/{}", urlencoding::encode(login)));
        let url = self.api_url(&endpoint);
        let response = self
            .client
            .put(&url)
            .basic_auth(&self.config.username, Some(&self.config.private_key))
            .json(&serde_json::json!({ "permission": "push" }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response, &endpoint).await)
        }
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, AppError> {
        let endpoint = "/graphql";
        let url = self.api_url(endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.private_key)
            .json(&GraphqlRequest {
                query,
                variables: &variables,
            })
            .send()
            .await?;

        let body: Value = self.handle_response(response, endpoint).await?;
        graphql_data(body)
    }

    fn api_base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

/// Extract `data` from a GraphQL response body.
///
/// A body with `errors` and no usable `data` is an upstream failure; partial
/// data alongside errors is returned as-is.
pub fn graphql_data(mut body: Value) -> Result<Value, AppError> {
    let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
    if !data.is_null() {
        return Ok(data);
    }

    let message = body
        .get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("GraphQL response carried no data");

    Err(AppError::github_api(message))
}
