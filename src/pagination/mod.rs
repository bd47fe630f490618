//! Link-header pagination.

use crate::client::{GitHubClient, QueryParams};
use crate::errors::{GitHubError, GitHubResult};
use futures::stream::{self, Stream};
use reqwest::header::{HeaderMap, LINK};
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// Parses a `Link` header (`<url>; rel="name", ...`) into `rel -> url`.
///
/// Segments that do not match the `<url>; rel="name"` shape are skipped, so
/// an empty or malformed header yields an empty map. A repeated relation
/// keeps its last URL.
pub fn parse_link_header(header_value: &str) -> HashMap<String, String> {
    let mut links = HashMap::new();
    for part in header_value.split(',') {
        if let Some((url, rel)) = parse_link_segment(part.trim()) {
            links.insert(rel.to_string(), url.to_string());
        }
    }
    links
}

fn parse_link_segment(segment: &str) -> Option<(&str, &str)> {
    let rest = segment.strip_prefix('<')?;
    let (url, rest) = rest.split_once('>')?;
    if url.is_empty() {
        return None;
    }
    let rest = rest.trim_start().strip_prefix(';')?.trim_start();
    let rest = rest.strip_prefix("rel=\"")?;
    let (rel, _) = rest.split_once('"')?;
    if rel.is_empty() {
        return None;
    }
    Some((url, rel))
}

/// Pagination links parsed from a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// URL for the next page.
    pub next: Option<String>,
    /// URL for the previous page.
    pub prev: Option<String>,
    /// URL for the first page.
    pub first: Option<String>,
    /// URL for the last page.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Parses pagination links from a `Link` header value.
    pub fn from_header(header_value: &str) -> Self {
        let mut rels = parse_link_header(header_value);
        Self {
            next: rels.remove("next"),
            prev: rels.remove("prev"),
            first: rels.remove("first"),
            last: rels.remove("last"),
        }
    }

    /// Parses pagination links from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_header)
            .unwrap_or_default()
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// A single page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items in this page, in upstream order.
    pub items: Vec<T>,
    /// Pagination links.
    pub links: PaginationLinks,
}

impl<T> Page<T> {
    /// Creates a new page.
    pub fn new(items: Vec<T>, links: PaginationLinks) -> Self {
        Self { items, links }
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.links.has_next()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the page and returns the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Lazy item sequence over a list endpoint.
///
/// Pages are fetched one at a time, only once every item of the previous
/// page has been handed out. Query parameters apply to the first page only;
/// later pages use the self-contained `next` URL. A sequence stops for good
/// after the last page or the first error; call `paginate` again to restart.
pub struct Paginator<'a> {
    client: &'a GitHubClient,
    next_url: Option<String>,
    params: Option<QueryParams>,
    buffer: VecDeque<Value>,
    pages_fetched: u32,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator starting at `path`.
    pub fn new(client: &'a GitHubClient, path: impl Into<String>, params: Option<QueryParams>) -> Self {
        Self {
            client,
            next_url: Some(path.into()),
            params,
            buffer: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Fetches the next item, requesting a new page when the buffer is empty.
    ///
    /// Returns `Ok(None)` once the last page has been drained.
    pub async fn next(&mut self) -> GitHubResult<Option<Value>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            match self.next_page().await? {
                Some(page) => self.buffer.extend(page.items),
                None => return Ok(None),
            }
        }
    }

    /// Fetches the next whole page, bypassing the item buffer.
    pub async fn next_page(&mut self) -> GitHubResult<Option<Page<Value>>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        let params = self.params.take();

        let response = self
            .client
            .execute(Method::GET, &url, params.as_ref(), None)
            .await?;
        self.pages_fetched += 1;

        let links = response.links();
        let items = match response.json() {
            Some(Value::Array(items)) => items,
            other => {
                return Err(GitHubError::unexpected_format(
                    response.status().as_u16(),
                    "Expected list response for paginated endpoint.",
                    other.unwrap_or(Value::Null),
                )
                .with_request_id_opt(response.request_id()));
            }
        };

        tracing::debug!(
            url = %crate::observability::loggable_url(&url),
            page = self.pages_fetched,
            items = items.len(),
            has_next = links.has_next(),
            "Fetched page"
        );

        self.next_url = links.next.clone();
        Ok(Some(Page::new(items, links)))
    }

    /// Collects all remaining items into a `Vec`.
    pub async fn collect_all(mut self) -> GitHubResult<Vec<Value>> {
        let mut all = Vec::new();
        while let Some(item) = self.next().await? {
            all.push(item);
        }
        Ok(all)
    }

    /// Turns the paginator into a `Stream` of items.
    pub fn into_stream(self) -> impl Stream<Item = GitHubResult<Value>> + 'a {
        stream::try_unfold(self, |mut paginator| async move {
            Ok(paginator.next().await?.map(|item| (item, paginator)))
        })
    }
}
