//! Relay operations behind the HTTP surface.
//!
//! Upstream failures are recovered here: callers get empty lists, `None`,
//! partial pages or outcome enums, and the failure is logged.

use crate::config::{RelayConfig, TemplateRepository};
use crate::error::AppError;
use crate::models::{
    Account, AnnotatedRepository, Commit, Event, InviteOutcome, InviteRequest, InviteResponse,
    Repository,
};
use crate::services::github_client::GitHubApi;
use crate::services::graphql::{curate_overview, RepositoryOverview, ORGANIZATION_OVERVIEW_QUERY};
use crate::services::ownership::{owner_from_commits, OwnerBlocklist};
use crate::services::pagination::{
    collect_cursor_pages, collect_listing, collect_pages, PageCollection, EVENTS_MAX_PAGES,
    EVENTS_PAGE_SIZE, LISTING_MAX_PAGES, LISTING_PAGE_SIZE,
};
use crate::services::response_cache::{CacheKey, ResponseCache};
use futures::future::join_all;
use serde_json::{Map, Value};

pub struct Relay<A> {
    api: A,
    cache: ResponseCache,
    organization: String,
    template: Option<TemplateRepository>,
    blocklist: OwnerBlocklist,
}

impl<A: GitHubApi> Relay<A> {
    pub fn new(
        api: A,
        organization: impl Into<String>,
        template: Option<TemplateRepository>,
        blocklist: OwnerBlocklist,
    ) -> Self {
        Self {
            api,
            cache: ResponseCache::new(),
            organization: organization.into(),
            template,
            blocklist,
        }
    }

    pub fn from_config(api: A, config: &RelayConfig) -> Self {
        Self::new(
            api,
            config.organization.clone(),
            config.template_repository.clone(),
            OwnerBlocklist::new(&config.owner_blocklist),
        )
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// The organization event feed, at most four pages of 100.
    pub async fn events(&self) -> PageCollection<Event> {
        let per_page = EVENTS_PAGE_SIZE as u32;
        collect_pages(EVENTS_PAGE_SIZE, EVENTS_MAX_PAGES, |page| {
            self.api.list_org_events(page + 1, per_page)
        })
        .await
    }

    /// Events signalling a newly created repository.
    pub async fn repository_created_events(&self) -> PageCollection<Event> {
        let mut events = self.events().await;
        events.items.retain(Event::is_repository_created);
        events
    }

    /// Organization members, page by page.
    pub async fn members(&self) -> PageCollection<Account> {
        let per_page = LISTING_PAGE_SIZE as u32;
        collect_listing(LISTING_PAGE_SIZE, LISTING_MAX_PAGES, |page| {
            self.api.list_members(page + 1, per_page)
        })
        .await
    }

    async fn list_repositories(&self) -> PageCollection<Repository> {
        let per_page = LISTING_PAGE_SIZE as u32;
        collect_listing(LISTING_PAGE_SIZE, LISTING_MAX_PAGES, |page| {
            self.api.list_repositories(page + 1, per_page)
        })
        .await
    }

    pub async fn rate_limit(&self) -> Option<Value> {
        self.api
            .rate_limit()
            .await
            .map_err(|e| log::warn!("[relay] failed to read rate limit: {}", e))
            .ok()
    }

    /// Commit history of a repository, memoized by repository name.
    pub async fn commits(&self, repo: &str) -> Result<Vec<Commit>, AppError> {
        self.cache
            .get_or_fetch_as(CacheKey::commits(repo), || self.api.list_commits(repo))
            .await
    }

    /// Best-guess owner of a repository from its commit history.
    pub async fn infer_owner(&self, repo: &str) -> Option<Account> {
        match self.commits(repo).await {
            Ok(commits) => owner_from_commits(&commits),
            Err(e) => {
                log::warn!("[owners] no commit history for {}: {}", repo, e);
                None
            }
        }
    }

    async fn annotate(&self, repository: Repository) -> AnnotatedRepository {
        let (owner, pulls) = futures::join!(
            self.infer_owner(&repository.name),
            self.api.list_pull_requests(&repository.name)
        );

        let pulls = pulls.unwrap_or_else(|e| {
            log::warn!("[relay] failed to list pulls for {}: {}", repository.name, e);
            Vec::new()
        });

        AnnotatedRepository {
            repository,
            owner,
            pulls,
        }
    }

    /// Organization repositories annotated with owner and pull requests.
    ///
    /// A complete listing is memoized under the `repos` key. An incomplete
    /// one is annotated and returned flagged, but not stored, so the next
    /// request lists again.
    pub async fn repositories(&self) -> PageCollection<AnnotatedRepository> {
        let mut pages_fetched = 0;
        let mut incomplete = None;
        let (fetched_out, incomplete_out) = (&mut pages_fetched, &mut incomplete);

        let cached = self
            .cache
            .get_or_fetch_as(CacheKey::Repos, move || async move {
                let listing = self.list_repositories().await;
                *fetched_out = listing.pages_fetched;
                log::info!(
                    "[relay] annotating {} repositories of {}",
                    listing.items.len(),
                    self.organization
                );

                let annotated =
                    join_all(listing.items.into_iter().map(|r| self.annotate(r))).await;
                if listing.truncated {
                    *incomplete_out = Some(annotated);
                    return Err(AppError::github_api("repository listing is incomplete"));
                }
                Ok(annotated)
            })
            .await;

        match (cached, incomplete) {
            (Ok(items), _) => PageCollection {
                items,
                pages_fetched,
                truncated: false,
            },
            (Err(_), Some(items)) => PageCollection {
                items,
                pages_fetched,
                truncated: true,
            },
            (Err(e), None) => {
                log::warn!("[relay] failed to list repositories: {}", e);
                PageCollection {
                    truncated: true,
                    ..PageCollection::default()
                }
            }
        }
    }

    /// Invite a user to the organization, then optionally provision their
    /// personal repository from the template.
    pub async fn invite(&self, request: &InviteRequest) -> InviteResponse {
        let message = match self.api.invite_member(request.user_id).await {
            Ok(_) => {
                log::info!("[invite] invited user {} to {}", request.user_id, self.organization);
                InviteOutcome::Success
            }
            Err(e) if e.status_code() == Some(422) => {
                log::info!("[invite] user {} is already a member", request.user_id);
                InviteOutcome::AlreadyMember
            }
            Err(e) => {
                log::warn!("[invite] failed to invite user {}: {}", request.user_id, e);
                InviteOutcome::Error
            }
        };

        let repository = match (&request.canvas_username, message) {
            (Some(name), InviteOutcome::Success | InviteOutcome::AlreadyMember) => {
                Some(self.provision_repository(request.user_id, name).await)
            }
            _ => None,
        };

        InviteResponse {
            message,
            repository,
        }
    }

    /// Generate `{org}/{name}` from the template and add the user as a
    /// collaborator. Returns the repository URL.
    async fn provision_repository(&self, user_id: i64, name: &str) -> Option<String> {
        let Some(template) = &self.template else {
            log::warn!("[invite] repository {} requested but no template is configured", name);
            return None;
        };

        let result = async {
            let repository = self.api.generate_repository(template, name).await?;
            let user = self.api.get_user_by_id(user_id).await?;
            self.api.add_collaborator(&repository.name, &user.login).await?;
            Ok::<_, AppError>(repository.html_url)
        }
        .await;

        result
            .map_err(|e| log::warn!("[invite] failed to provision {}: {}", name, e))
            .ok()
    }

    /// Repositories, pull requests and reviewers from the fixed overview
    /// query, with owners inferred from default-branch history.
    pub async fn organization_overview(&self) -> PageCollection<RepositoryOverview> {
        let mut variables = Map::new();
        variables.insert(
            "organization".to_string(),
            Value::String(self.organization.clone()),
        );

        let nodes = collect_cursor_pages(
            &self.cache,
            ORGANIZATION_OVERVIEW_QUERY,
            &variables,
            |vars| self.api.graphql(ORGANIZATION_OVERVIEW_QUERY, vars),
        )
        .await;

        PageCollection {
            items: curate_overview(&nodes.items, &self.blocklist),
            pages_fetched: nodes.pages_fetched,
            truncated: nodes.truncated,
        }
    }

    /// Run a caller-supplied GraphQL query to the end of its first
    /// connection.
    pub async fn run_query(&self, query: &str) -> PageCollection<Value> {
        collect_cursor_pages(&self.cache, query, &Map::new(), |vars| {
            self.api.graphql(query, vars)
        })
        .await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
