//! Repository commit model (`GET /repos/:owner/:repo/commits`).

use super::Account;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,

    /// Linked GitHub account; `null` when the commit email matches no account.
    #[serde(default)]
    pub author: Option<Account>,

    pub commit: CommitDetail,

    #[serde(default)]
    pub html_url: Option<String>,
}

/// Raw git data of a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<GitSignature>,

    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSignature {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}
