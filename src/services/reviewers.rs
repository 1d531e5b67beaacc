//! Review requests on organization pull requests.

use crate::error::AppError;
use crate::models::ReviewerBatchItem;
use crate::services::github_client::GitHubApi;

const WEB_BASE: &str = "https://github.com/";

/// Rewrite a pull request URL into its REST API form.
///
/// Accepts `https://github.com/o/r/pull/n`, `.../issues/n`, trailing segments
/// such as `/files`, and URLs already in API form under `api_base`. Returns
/// `None` for anything that does not land on `api_base`.
pub fn normalize_pull_request_url(url: &str, api_base: &str) -> Option<String> {
    let api_base = api_base.trim_end_matches('/');
    let url = url
        .trim()
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    let absolute = match url.strip_prefix(WEB_BASE) {
        Some(rest) => format!("{}/repos/{}", api_base, rest),
        None => url.to_string(),
    };

    let path = absolute.strip_prefix(api_base)?.strip_prefix("/repos/")?;
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    // Only the kind segment is rewritten; owner and repository stay verbatim.
    match segments.as_slice() {
        [owner, repo, "pull" | "pulls" | "issues", number, ..]
            if number.chars().all(|c| c.is_ascii_digit()) =>
        {
            Some(format!("{}/repos/{}/{}/pulls/{}", api_base, owner, repo, number))
        }
        _ => None,
    }
}

/// Ask `reviewer` to review the pull request at `pull_request_url`.
///
/// Only a 201 counts as success; every failure is logged and reported as
/// `false`.
pub async fn request_reviewer<A: GitHubApi>(api: &A, reviewer: &str, pull_request_url: &str) -> bool {
    let Some(api_url) = normalize_pull_request_url(pull_request_url, api.api_base()) else {
        log::warn!(
            "[reviewers] {}",
            AppError::invalid_input_field(
                format!("not a pull request URL: {}", pull_request_url),
                "pullRequest.url"
            )
        );
        return false;
    };

    match api.request_reviewers(&api_url, &[reviewer.to_string()]).await {
        Ok(201) => {
            log::info!("[reviewers] requested {} on {}", reviewer, api_url);
            true
        }
        Ok(status) => {
            log::warn!(
                "[reviewers] unexpected status {} requesting {} on {}",
                status,
                reviewer,
                api_url
            );
            false
        }
        Err(e) => {
            log::warn!("[reviewers] failed to request {} on {}: {}", reviewer, api_url, e);
            false
        }
    }
}

/// Apply review requests one after another, in order.
///
/// Returns the per-item outcomes; the HTTP endpoint reports overall success
/// regardless of them.
pub async fn request_reviewers_batch<A: GitHubApi>(api: &A, items: &[ReviewerBatchItem]) -> Vec<bool> {
    let mut outcomes = Vec::with_capacity(items.len());
    for item in items {
        outcomes.push(request_reviewer(api, item.reviewer(), item.pull_request_url()).await);
    }

    let failed = outcomes.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        log::warn!("[reviewers] {} of {} review requests failed", failed, items.len());
    }
    outcomes
}
