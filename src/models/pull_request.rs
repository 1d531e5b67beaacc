//! Pull request model (`GET /repos/:owner/:repo/pulls`).

use super::Account;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub state: String,
    /// API URL, accepted as-is by the reviewer endpoints.
    pub url: String,
    pub html_url: String,
    #[serde(default)]
    pub user: Option<Account>,
    #[serde(default)]
    pub requested_reviewers: Vec<Account>,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
