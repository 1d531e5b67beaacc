//! Best-guess repository owners from commit and pull request history.

use crate::models::{Account, Commit};
use serde_json::Value;

/// Service accounts whose commits say nothing about ownership.
pub const SERVICE_ACCOUNTS: &[&str] = &[
    "web-flow",
    "ghost",
    "actions-user",
    "github-actions[bot]",
    "dependabot[bot]",
    "renovate[bot]",
    "github-classroom[bot]",
];

/// Number of default-branch commits inspected by the GraphQL variant.
pub const HISTORY_WINDOW: usize = 5;

/// Logins skipped when inferring ownership.
#[derive(Debug, Clone)]
pub struct OwnerBlocklist {
    logins: Vec<String>,
}

impl OwnerBlocklist {
    /// Built-in service accounts plus `extra`.
    pub fn new(extra: &[String]) -> Self {
        let logins = SERVICE_ACCOUNTS
            .iter()
            .map(|s| s.to_string())
            .chain(extra.iter().cloned())
            .collect();
        Self { logins }
    }

    pub fn contains(&self, login: &str) -> bool {
        self.logins.iter().any(|l| l.eq_ignore_ascii_case(login))
    }
}

impl Default for OwnerBlocklist {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// Owner from REST commit history: the author of the most recent commit that
/// has one, preferring the linked GitHub account over raw git metadata.
pub fn owner_from_commits(commits: &[Commit]) -> Option<Account> {
    commits.iter().find_map(|commit| match (&commit.author, &commit.commit.author) {
        (Some(account), _) => Some(account.clone()),
        (None, Some(git)) => Some(Account::from_git_author(&git.name, git.email.as_deref())),
        (None, None) => None,
    })
}

/// Owner login from a GraphQL repository node.
///
/// Expects `defaultBranchRef.target.history.nodes[].author.user.login` and
/// `pullRequests.nodes[].author.login`.
pub fn owner_from_graphql(repository: &Value, blocklist: &OwnerBlocklist) -> Option<String> {
    let from_commits = repository
        .pointer("/defaultBranchRef/target/history/nodes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .take(HISTORY_WINDOW)
        .filter_map(|commit| commit.pointer("/author/user/login").and_then(Value::as_str))
        .find(|login| !blocklist.contains(login));

    from_commits
        .or_else(|| {
            repository
                .pointer("/pullRequests/nodes")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .find_map(|pr| pr.pointer("/author/login").and_then(Value::as_str))
        })
        .map(String::from)
}
