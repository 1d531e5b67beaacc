//! Request bodies of the reviewer endpoints.

use serde::Deserialize;

/// Pull request reference: either a bare URL or an object carrying `url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PullRequestRef {
    Url(String),
    Object { url: String },
}

impl PullRequestRef {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) | Self::Object { url } => url,
        }
    }
}

/// Body of `POST /request-reviewer`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerRequest {
    pub username: String,
    pub pull_request: PullRequestRef,
}

/// One entry of `POST /request-reviewers`; both client generations' shapes
/// are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReviewerBatchItem {
    Short { reviewer: String, pr: PullRequestRef },
    Long(ReviewerRequest),
}

impl ReviewerBatchItem {
    pub fn reviewer(&self) -> &str {
        match self {
            Self::Short { reviewer, .. } => reviewer,
            Self::Long(req) => &req.username,
        }
    }

    pub fn pull_request_url(&self) -> &str {
        match self {
            Self::Short { pr, .. } => pr.url(),
            Self::Long(req) => req.pull_request.url(),
        }
    }
}
