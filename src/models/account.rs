//! GitHub account model.

use serde::{Deserialize, Serialize};

/// A GitHub account, or an account synthesized from raw git metadata.
///
/// Synthesized accounts have no `id`; their `login` is the git author name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,

    /// Account type reported by GitHub (`User`, `Bot`, `Organization`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Account {
    /// Build an account from git author metadata, using the name as login.
    pub fn from_git_author(name: &str, email: Option<&str>) -> Self {
        Self {
            login: name.to_string(),
            id: None,
            avatar_url: None,
            html_url: None,
            kind: None,
            name: Some(name.to_string()),
            email: email.map(String::from),
        }
    }
}
