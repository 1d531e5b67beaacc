//! Bounded page-by-page fetching.
//!
//! Both drivers stop on the first failed page and hand back whatever was
//! collected so far, flagged as truncated, instead of an error.

use crate::error::AppError;
use crate::services::response_cache::{CacheKey, ResponseCache};
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;

/// Page size used for the organization event feed.
pub const EVENTS_PAGE_SIZE: usize = 100;

/// Hard ceiling on event pages (400 events).
pub const EVENTS_MAX_PAGES: u32 = 4;

/// Ceiling on GraphQL connection pages for one query.
pub const GRAPHQL_MAX_PAGES: u32 = 100;

/// Page size for member and repository listings.
pub const LISTING_PAGE_SIZE: usize = 100;

/// Ceiling on member and repository listing pages (5000 entries).
pub const LISTING_MAX_PAGES: u32 = 50;

/// Items accumulated by a paginated fetch.
#[derive(Debug, Clone, Serialize)]
pub struct PageCollection<T> {
    pub items: Vec<T>,
    pub pages_fetched: u32,
    /// Set when a page failed and the remaining pages were not requested.
    pub truncated: bool,
}

impl<T> Default for PageCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages_fetched: 0,
            truncated: false,
        }
    }
}

/// Fetch numbered pages until one comes back short or `max_pages` is hit.
///
/// `fetch_page` receives the zero-based page counter.
pub async fn collect_pages<T, F, Fut>(
    page_size: usize,
    max_pages: u32,
    mut fetch_page: F,
) -> PageCollection<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, AppError>>,
{
    let mut collection = PageCollection::default();

    for page in 0..max_pages {
        match fetch_page(page).await {
            Ok(items) => {
                let full = items.len() == page_size;
                collection.items.extend(items);
                collection.pages_fetched += 1;
                if !full {
                    break;
                }
            }
            Err(e) => {
                log::warn!(
                    "[pagination] page {} failed, returning {} items: {}",
                    page,
                    collection.items.len(),
                    e
                );
                collection.truncated = true;
                break;
            }
        }
    }

    collection
}

/// Like [`collect_pages`], for listings that are meant to be complete: a
/// full page at the ceiling means more entries exist, so the result is
/// flagged as truncated.
pub async fn collect_listing<T, F, Fut>(
    page_size: usize,
    max_pages: u32,
    fetch_page: F,
) -> PageCollection<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, AppError>>,
{
    let mut collection = collect_pages(page_size, max_pages, fetch_page).await;
    let all_full = collection.items.len() == page_size * max_pages as usize;
    if collection.pages_fetched == max_pages && all_full {
        log::warn!(
            "[pagination] listing stopped at the {}-page ceiling with {} items",
            max_pages,
            collection.items.len()
        );
        collection.truncated = true;
    }
    collection
}

/// A GraphQL connection located inside a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub nodes: Vec<Value>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Find the first object carrying both `pageInfo` and `nodes`, depth-first.
pub fn find_connection(value: &Value) -> Option<Connection> {
    match value {
        Value::Object(map) => {
            if let (Some(page_info), Some(Value::Array(nodes))) =
                (map.get("pageInfo"), map.get("nodes"))
            {
                return Some(Connection {
                    nodes: nodes.clone(),
                    has_next_page: page_info
                        .get("hasNextPage")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    end_cursor: page_info
                        .get("endCursor")
                        .and_then(Value::as_str)
                        .map(String::from),
                });
            }
            map.values().find_map(find_connection)
        }
        Value::Array(items) => items.iter().find_map(find_connection),
        _ => None,
    }
}

/// Follow a cursor-paginated GraphQL query to the end of its first
/// connection. Every page is memoized under its query+cursor hash.
///
/// The query receives `$cursor` (absent on the first page) on top of
/// `variables`. A response without a connection is returned as a single
/// node.
pub async fn collect_cursor_pages<F, Fut>(
    cache: &ResponseCache,
    query: &str,
    variables: &Map<String, Value>,
    run_query: F,
) -> PageCollection<Value>
where
    F: Fn(Value) -> Fut,
    Fut: Future<Output = Result<Value, AppError>>,
{
    let mut collection = PageCollection::default();
    let mut cursor: Option<String> = None;

    while collection.pages_fetched < GRAPHQL_MAX_PAGES {
        let mut vars = variables.clone();
        if let Some(c) = &cursor {
            vars.insert("cursor".to_string(), Value::String(c.clone()));
        }

        let key = CacheKey::graphql(query, cursor.as_deref());
        let page = match cache
            .get_or_fetch(key, || run_query(Value::Object(vars)))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                log::warn!(
                    "[graphql] page {} failed, returning {} nodes: {}",
                    collection.pages_fetched,
                    collection.items.len(),
                    e
                );
                collection.truncated = true;
                break;
            }
        };
        collection.pages_fetched += 1;

        let Some(connection) = find_connection(&page) else {
            collection.items.push(page);
            break;
        };
        collection.items.extend(connection.nodes);

        match connection.end_cursor {
            Some(next) if connection.has_next_page && cursor.as_deref() != Some(next.as_str()) => {
                cursor = Some(next);
            }
            _ => break,
        }
    }

    collection
}
