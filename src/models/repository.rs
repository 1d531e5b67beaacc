//! Organization repository model (`GET /orgs/:org/repos`).

use super::{Account, PullRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub open_issues_count: i64,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Repository as served by `/repos`: the upstream record plus the inferred
/// owner and its open pull requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedRepository {
    #[serde(flatten)]
    pub repository: Repository,

    /// Best-guess owner; `null` when the history gave no signal.
    pub owner: Option<Account>,

    pub pulls: Vec<PullRequest>,
}
