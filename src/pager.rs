//! Turns the page-based listing endpoints into one flat stream of items.
//!
//! A [`Pager`] requests page after page, hands out the items of each page
//! one at a time and stops when
//! - the configured [`Limit`] is reached (possibly mid-page),
//! - a page comes back with fewer items than requested, or
//! - the server answers with a non-success status.
//!
//! Nothing is prefetched: a page is only requested once the consumer asks
//! for an item past the end of the previous one, and dropping the stream
//! stops all further requests.

use std::collections::VecDeque;

use crate::{
    client::{ApiRequest, Transport},
    error::Error,
    result::Result,
    search::Limit,
};
use futures::{stream, Stream};
use reqwest::Method;
use serde_json::Value;

/// The listing endpoints reachable from a [`Search`].
///
/// [`Search`]: crate::search::Search
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Listing {
    /// Image search.
    Images,
    /// Comment search.
    Comments,
    /// Tag search.
    Tags,
    /// Gallery search.
    Galleries,
    /// Forum post search.
    Posts,
    /// All forums.
    Forums,
    /// Topics of a forum, by its short name.
    Topics {
        /// Forum short name, e.g. `dis`.
        forum: String,
    },
    /// Posts of a topic.
    TopicPosts {
        /// Forum short name.
        forum: String,
        /// Topic slug.
        topic: String,
    },
    /// Filters provided by the site.
    SystemFilters,
    /// Filters of the key owner.
    UserFilters,
}

impl Listing {
    /// Endpoint path below `/api/v1/json/`.
    pub fn path(&self) -> String {
        match self {
            Listing::Images => "search/images".to_string(),
            Listing::Comments => "search/comments".to_string(),
            Listing::Tags => "search/tags".to_string(),
            Listing::Galleries => "search/galleries".to_string(),
            Listing::Posts => "search/posts".to_string(),
            Listing::Forums => "forums".to_string(),
            Listing::Topics { forum } => format!("forums/{forum}/topics"),
            Listing::TopicPosts { forum, topic } => format!("forums/{forum}/topics/{topic}/posts"),
            Listing::SystemFilters => "filters/system".to_string(),
            Listing::UserFilters => "filters/user".to_string(),
        }
    }

    /// Key of the item array in a page response.
    pub fn items_key(&self) -> &'static str {
        match self {
            Listing::Images => "images",
            Listing::Comments => "comments",
            Listing::Tags => "tags",
            Listing::Galleries => "galleries",
            Listing::Posts | Listing::TopicPosts { .. } => "posts",
            Listing::Forums => "forums",
            Listing::Topics { .. } => "topics",
            Listing::SystemFilters | Listing::UserFilters => "filters",
        }
    }
}

/// Everything the pager needs to walk one listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// HTTP method.
    pub method: Method,
    /// Endpoint URL.
    pub url: String,
    /// Query pairs sent with every page, without `page`.
    pub params: Vec<(String, String)>,
    /// Key of the item array in each response.
    pub items_key: String,
    /// Requested page size; shorter pages end the listing.
    pub per_page: u32,
    /// Page to start from.
    pub first_page: u32,
    /// Yield status errors instead of ending quietly.
    pub strict: bool,
}

impl PageRequest {
    fn for_page(&self, page: u32) -> ApiRequest {
        let mut query = self.params.clone();
        // reverse search is a POST without paging on its first request
        if self.method != Method::POST || page > self.first_page {
            query.push(("page".to_string(), page.to_string()));
        }
        ApiRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            query,
        }
    }
}

/// Lazy, forward-only cursor over a paginated listing.
#[derive(Debug)]
pub struct Pager<'a, T: ?Sized> {
    transport: &'a T,
    request: PageRequest,
    next_page: u32,
    buffer: VecDeque<Value>,
    remaining: Option<usize>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<'a, T: Transport + ?Sized> Pager<'a, T> {
    /// A pager that has not requested anything yet.
    pub fn new(transport: &'a T, request: PageRequest, limit: Limit) -> Self {
        let next_page = request.first_page;
        Self {
            transport,
            request,
            next_page,
            buffer: VecDeque::new(),
            remaining: limit.into(),
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Number of page requests issued so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Pulls the next item, fetching a page first when needed.
    ///
    /// Returns `None` once the listing is done. An `Err` is yielded at most
    /// once and ends the listing.
    pub async fn next_item(&mut self) -> Option<Result<Value>> {
        loop {
            if self.remaining == Some(0) {
                return None;
            }

            if let Some(item) = self.buffer.pop_front() {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(Ok(item));
            }

            if self.exhausted {
                return None;
            }

            if let Err(err) = self.fetch_page().await {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let page = self.next_page;
        let request = self.request.for_page(page);
        self.pages_fetched += 1;

        let body = match self.transport.fetch_json(&request).await {
            Ok(body) => body,
            Err(Error::UnexpectedStatus(code)) if !self.request.strict => {
                log::warn!("page {page} of {} answered {code}, ending results", self.request.url);
                self.exhausted = true;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let items = match body {
            Value::Object(mut map) => match map.remove(&self.request.items_key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            },
            _ => None,
        };
        let Some(items) = items else {
            self.exhausted = true;
            if self.request.strict {
                return Err(Error::MissingKey(self.request.items_key.clone()));
            }
            log::warn!("page {page} has no `{}` array, ending results", self.request.items_key);
            return Ok(());
        };

        log::debug!("page {page} returned {} items", items.len());
        if items.len() < self.request.per_page as usize {
            self.exhausted = true;
        }
        match self.next_page.checked_add(1) {
            Some(next) => self.next_page = next,
            None => {
                log::warn!("page {page} is the last addressable page, ending results");
                self.exhausted = true;
            }
        }
        self.buffer.extend(items);
        Ok(())
    }

    /// Exposes the pager as a stream of raw items.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> + 'a {
        stream::unfold(self, |mut pager| async move {
            let item = pager.next_item().await?;
            Some((item, pager))
        })
    }
}
