//! Curated organization overview built from one fixed GraphQL query.

use crate::services::ownership::{owner_from_graphql, OwnerBlocklist};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Repositories with their open pull requests, reviewers and enough history
/// to infer an owner. Paginated over `repositories` through `$cursor`.
pub const ORGANIZATION_OVERVIEW_QUERY: &str = r#"
query OrganizationOverview($organization: String!, $cursor: String) {
  organization(login: $organization) {
    repositories(first: 50, after: $cursor, orderBy: {field: UPDATED_AT, direction: DESC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        name
        nameWithOwner
        url
        defaultBranchRef {
          target {
            ... on Commit {
              history(first: 5) {
                nodes { author { user { login } } }
              }
            }
          }
        }
        pullRequests(first: 20, states: OPEN, orderBy: {field: UPDATED_AT, direction: DESC}) {
          nodes {
            number
            title
            url
            author { login }
            reviewRequests(first: 10) {
              nodes { requestedReviewer { ... on User { login } } }
            }
            reviews(first: 20) {
              nodes { author { login } state }
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryOverview {
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub owner: Option<String>,
    pub pull_requests: Vec<PullRequestOverview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestOverview {
    pub number: i64,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub requested_reviewers: Vec<String>,
    pub reviews: Vec<ReviewOverview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOverview {
    pub author: Option<String>,
    pub state: String,
}

// GraphQL node shapes. List entries may be null.

#[derive(Debug, Deserialize)]
struct NodeList<T> {
    // A plain `default` would demand `T: Default`.
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> NodeList<T> {
    fn into_items(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Deserialize)]
struct Login {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    name: String,
    name_with_owner: String,
    url: String,
    #[serde(default)]
    pull_requests: Option<NodeList<PullRequestNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    number: i64,
    title: String,
    url: String,
    #[serde(default)]
    author: Option<Login>,
    #[serde(default)]
    review_requests: Option<NodeList<ReviewRequestNode>>,
    #[serde(default)]
    reviews: Option<NodeList<ReviewNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequestNode {
    /// Teams match no fragment and arrive as `{}`.
    #[serde(default)]
    requested_reviewer: Option<RequestedReviewer>,
}

#[derive(Debug, Deserialize)]
struct RequestedReviewer {
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewNode {
    #[serde(default)]
    author: Option<Login>,
    state: String,
}

impl From<PullRequestNode> for PullRequestOverview {
    fn from(node: PullRequestNode) -> Self {
        Self {
            number: node.number,
            title: node.title,
            url: node.url,
            author: node.author.map(|a| a.login),
            requested_reviewers: node
                .review_requests
                .map(|list| {
                    list.into_items()
                        .filter_map(|r| r.requested_reviewer?.login)
                        .collect()
                })
                .unwrap_or_default(),
            reviews: node
                .reviews
                .map(|list| {
                    list.into_items()
                        .map(|r| ReviewOverview {
                            author: r.author.map(|a| a.login),
                            state: r.state,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Turn raw repository nodes into the curated overview.
pub fn curate_overview(nodes: &[Value], blocklist: &OwnerBlocklist) -> Vec<RepositoryOverview> {
    nodes
        .iter()
        .filter(|node| !node.is_null())
        .filter_map(|node| {
            let owner = owner_from_graphql(node, blocklist);
            match serde_json::from_value::<RepositoryNode>(node.clone()) {
                Ok(repo) => Some(RepositoryOverview {
                    name: repo.name,
                    full_name: repo.name_with_owner,
                    url: repo.url,
                    owner,
                    pull_requests: repo
                        .pull_requests
                        .map(|list| list.into_items().map(PullRequestOverview::from).collect())
                        .unwrap_or_default(),
                }),
                Err(e) => {
                    log::warn!("[graphql] skipping malformed repository node: {}", e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_curate_overview() {
        let nodes = vec![
            json!({
                "name": "api",
                "nameWithOwner": "acme/api",
                "url": "https://github.com/acme/api",
                "defaultBranchRef": { "target": { "history": { "nodes": [
                    { "author": { "user": { "login": "dependabot[bot]" } } },
                    { "author": { "user": { "login": "alice" } } }
                ]}}},
                "pullRequests": { "nodes": [{
                    "number": 7,
                    "title": "Add endpoint",
                    "url": "https://github.com/acme/api/pull/7",
                    "author": { "login": "bob" },
                    "reviewRequests": { "nodes": [
                        { "requestedReviewer": { "login": "carol" } },
                        { "requestedReviewer": {} },
                        null
                    ]},
                    "reviews": { "nodes": [{ "author": { "login": "dave" }, "state": "APPROVED" }] }
                }]}
            }),
            Value::Null,
            json!({ "name": "broken" }),
        ];

        let overview = curate_overview(&nodes, &OwnerBlocklist::default());
        assert_eq!(overview.len(), 1);

        let repo = &overview[0];
        assert_eq!(repo.full_name, "acme/api");
        assert_eq!(repo.owner.as_deref(), Some("alice"));
        assert_eq!(repo.pull_requests.len(), 1);

        let pr = &repo.pull_requests[0];
        assert_eq!(pr.author.as_deref(), Some("bob"));
        assert_eq!(pr.requested_reviewers, vec!["carol"]);
        assert_eq!(
            pr.reviews,
            vec![ReviewOverview {
                author: Some("dave".to_string()),
                state: "APPROVED".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_node_lists_are_empty() {
        let nodes = vec![json!({
            "name": "quiet",
            "nameWithOwner": "acme/quiet",
            "url": "https://github.com/acme/quiet",
            "pullRequests": { "nodes": [{
                "number": 1,
                "title": "Draft",
                "url": "https://github.com/acme/quiet/pull/1",
                "reviewRequests": {},
                "reviews": { "nodes": [] }
            }]}
        })];

        let overview = curate_overview(&nodes, &OwnerBlocklist::default());
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].owner, None);

        let pr = &overview[0].pull_requests[0];
        assert_eq!(pr.author, None);
        assert!(pr.requested_reviewers.is_empty());
        assert!(pr.reviews.is_empty());
    }

    #[test]
    fn test_overview_serializes_camel_case() {
        let repo = RepositoryOverview {
            name: "api".to_string(),
            full_name: "acme/api".to_string(),
            url: "https://github.com/acme/api".to_string(),
            owner: None,
            pull_requests: vec![],
        };
        let json = serde_json::to_value(&repo).unwrap();
        assert_eq!(json["fullName"], "acme/api");
        assert!(json["owner"].is_null());
        assert_eq!(json["pullRequests"], json!([]));
    }
}
