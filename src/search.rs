//! Immutable search queries.
//!
//! A [`Search`] is a plain value. Every method that changes a setting takes
//! `&self` and hands back a new `Search`, so a query can be reused, branched
//! and shared between tasks without surprises.
//!
//! # Example: the ten best images of the week
//! ```ignore
//! use derpibooru::{search::{Limit, Search, SortField}, Client};
//! use futures::TryStreamExt;
//!
//! let client = Client::new();
//! let best = Search::new()
//!     .with_query(["safe", "first_seen_at.gt:7 days ago"])
//!     .with_sort(SortField::Score)
//!     .with_limit(Limit::At(10));
//!
//! let images: Vec<_> = best.images(&client).try_collect().await?;
//! ```

use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::{
    client::{Transport, DEFAULT_HOST},
    comment::Comment,
    error::ConfigurationError,
    image::Image,
    pager::{Listing, PageRequest, Pager},
    record::Record,
    result::Result,
    scrape,
};
use futures::{Stream, TryStreamExt};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

/// Largest page size the API accepts.
pub const MAX_PER_PAGE: u32 = 50;

/// Filter that hides nothing, used when a lookup must see every image.
pub const EVERYTHING_FILTER: u32 = 56027;

const DEFAULT_PER_PAGE: u32 = 25;
const DEFAULT_LIMIT: usize = 50;
const WEB_TOPIC_PAGE_SIZE: u32 = 25;

/// Fields images can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    FirstSeenAt,
    AspectRatio,
    Faves,
    Upvotes,
    Downvotes,
    Score,
    WilsonScore,
    Relevance,
    Width,
    Height,
    Comments,
    TagCount,
    Pixels,
    Size,
    Duration,
    Random,
}

impl SortField {
    /// Every sort field, in declaration order.
    pub const ALL: [SortField; 18] = [
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::FirstSeenAt,
        SortField::AspectRatio,
        SortField::Faves,
        SortField::Upvotes,
        SortField::Downvotes,
        SortField::Score,
        SortField::WilsonScore,
        SortField::Relevance,
        SortField::Width,
        SortField::Height,
        SortField::Comments,
        SortField::TagCount,
        SortField::Pixels,
        SortField::Size,
        SortField::Duration,
        SortField::Random,
    ];

    /// The value sent as `sf`.
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::FirstSeenAt => "first_seen_at",
            SortField::AspectRatio => "aspect_ratio",
            SortField::Faves => "faves",
            SortField::Upvotes => "upvotes",
            SortField::Downvotes => "downvotes",
            SortField::Score => "score",
            SortField::WilsonScore => "wilson_score",
            SortField::Relevance => "_score",
            SortField::Width => "width",
            SortField::Height => "height",
            SortField::Comments => "comment_count",
            SortField::TagCount => "tag_count",
            SortField::Pixels => "pixels",
            SortField::Size => "size",
            SortField::Duration => "duration",
            SortField::Random => "random",
        }
    }
}

impl FromStr for SortField {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownSortField(s.to_string()))
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

impl SortDirection {
    /// The value sent as `sd`.
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Ascending),
            "desc" => Ok(SortDirection::Descending),
            other => Err(ConfigurationError::UnknownSortDirection(other.to_string())),
        }
    }
}

/// Upper bound on the number of items a search yields.
///
/// Independent from the page size: the pager stops as soon as the bound is
/// reached, even in the middle of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// Stop after this many items. `At(0)` yields nothing.
    At(usize),
    /// Keep paging until the results run out.
    Unbounded,
}

impl Default for Limit {
    fn default() -> Self {
        Limit::At(DEFAULT_LIMIT)
    }
}

impl From<usize> for Limit {
    fn from(n: usize) -> Self {
        Limit::At(n)
    }
}

impl From<Option<usize>> for Limit {
    fn from(n: Option<usize>) -> Self {
        n.map_or(Limit::Unbounded, Limit::At)
    }
}

impl From<Limit> for Option<usize> {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::At(n) => Some(n),
            Limit::Unbounded => None,
        }
    }
}

/// Whether to restrict results to, or exclude, one of the key owner's lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserOption {
    /// Only images on the list.
    Only,
    /// Only images not on the list.
    Not,
}

/// Per-user image lists addressable with `my:` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MyList {
    Faves,
    Upvotes,
    Uploads,
    Watched,
}

impl MyList {
    fn tag(self) -> &'static str {
        match self {
            MyList::Faves => "my:faves",
            MyList::Upvotes => "my:upvotes",
            MyList::Uploads => "my:uploads",
            MyList::Watched => "my:watched",
        }
    }
}

/// Target of a reverse image search.
#[derive(Debug, Clone, PartialEq)]
pub struct Reverse {
    url: String,
    distance: f64,
}

impl Reverse {
    /// URL of the image to match.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Match distance.
    pub fn distance(&self) -> f64 {
        self.distance
    }
}

/// The raw option surface of a search, as strings and numbers.
///
/// Useful for loading queries from configuration files. Converting into a
/// [`Search`] validates every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// API key, empty for anonymous access.
    pub key: String,
    /// Query tags.
    pub q: Vec<String>,
    /// Sort field.
    pub sf: String,
    /// Sort direction, `asc` or `desc`.
    pub sd: String,
    /// Numeric filter id, empty for the key owner's current filter.
    pub filter_id: String,
    /// Items requested per page, clamped to `1..=50`.
    pub per_page: u32,
    /// First page to request.
    pub page: u32,
    /// Overall item limit, `None` for unbounded.
    pub limit: Option<usize>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            key: String::new(),
            q: Vec::new(),
            sf: SortField::default().as_str().to_string(),
            sd: SortDirection::default().as_str().to_string(),
            filter_id: String::new(),
            per_page: DEFAULT_PER_PAGE,
            page: 1,
            limit: Some(DEFAULT_LIMIT),
        }
    }
}

/// An immutable image search.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    key: String,
    query: BTreeSet<String>,
    sort_field: SortField,
    sort_direction: SortDirection,
    filter_id: Option<u32>,
    per_page: u32,
    page: u32,
    limit: Limit,
    reverse: Option<Reverse>,
    strict: bool,
}

impl Default for Search {
    fn default() -> Self {
        Self {
            key: String::new(),
            query: BTreeSet::new(),
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            filter_id: None,
            per_page: DEFAULT_PER_PAGE,
            page: 1,
            limit: Limit::default(),
            reverse: None,
            strict: false,
        }
    }
}

impl TryFrom<SearchParams> for Search {
    type Error = ConfigurationError;

    fn try_from(params: SearchParams) -> std::result::Result<Self, Self::Error> {
        if params.page == 0 {
            return Err(ConfigurationError::InvalidPage(params.page));
        }
        Ok(Self {
            key: params.key,
            query: tag_set(params.q),
            sort_field: params.sf.parse()?,
            sort_direction: params.sd.parse()?,
            filter_id: parse_filter(&params.filter_id)?,
            per_page: clamp_per_page(params.per_page),
            page: params.page,
            limit: params.limit.into(),
            reverse: None,
            strict: false,
        })
    }
}

impl Search {
    /// The first 25 images of the front page, at most 50 in total.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts the search back into its raw option surface.
    pub fn parameters(&self) -> SearchParams {
        SearchParams {
            key: self.key.clone(),
            q: self.query.iter().cloned().collect(),
            sf: self.sort_field.as_str().to_string(),
            sd: self.sort_direction.as_str().to_string(),
            filter_id: self.filter_id.map(|id| id.to_string()).unwrap_or_default(),
            per_page: self.per_page,
            page: self.page,
            limit: self.limit.into(),
        }
    }

    /// API key in use, empty when anonymous.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The query tags.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.query
    }

    /// Sort field.
    pub fn sort_field(&self) -> SortField {
        self.sort_field
    }

    /// Sort direction.
    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    /// Filter id, `None` for the key owner's current filter.
    pub fn filter_id(&self) -> Option<u32> {
        self.filter_id
    }

    /// Items requested per page.
    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// First page requested.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Overall item limit.
    pub fn limit(&self) -> Limit {
        self.limit
    }

    /// Reverse search target, if this is a reverse search.
    pub fn reverse_target(&self) -> Option<&Reverse> {
        self.reverse.as_ref()
    }

    /// Whether status errors are surfaced instead of ending the results.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Uses an API key, which applies the owner's content settings.
    #[must_use]
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..self.clone()
        }
    }

    /// Replaces the query tags.
    #[must_use]
    pub fn with_query<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: tag_set(tags),
            ..self.clone()
        }
    }

    /// Adds tags to the query.
    #[must_use]
    pub fn append_tags<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = self.query.clone();
        query.extend(tag_set(tags));
        Self {
            query,
            ..self.clone()
        }
    }

    /// Removes tags from the query.
    #[must_use]
    pub fn remove_tags<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let removed = tag_set(tags);
        Self {
            query: self.query.difference(&removed).cloned().collect(),
            ..self.clone()
        }
    }

    /// Sorts by `field`.
    #[must_use]
    pub fn with_sort(&self, field: SortField) -> Self {
        Self {
            sort_field: field,
            ..self.clone()
        }
    }

    /// Sorts by a field given by its API name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownSortField`] for unknown names.
    pub fn sort_by(&self, field: &str) -> std::result::Result<Self, ConfigurationError> {
        Ok(self.with_sort(field.parse()?))
    }

    /// Sets the sort direction.
    #[must_use]
    pub fn with_direction(&self, direction: SortDirection) -> Self {
        Self {
            sort_direction: direction,
            ..self.clone()
        }
    }

    /// Smallest first.
    #[must_use]
    pub fn ascending(&self) -> Self {
        self.with_direction(SortDirection::Ascending)
    }

    /// Largest first. This is the default.
    #[must_use]
    pub fn descending(&self) -> Self {
        self.with_direction(SortDirection::Descending)
    }

    /// Applies a filter by id, or the key owner's current filter for `None`.
    #[must_use]
    pub fn with_filter(&self, filter_id: Option<u32>) -> Self {
        Self {
            filter_id,
            ..self.clone()
        }
    }

    /// Starts at `page`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidPage`] for page 0.
    pub fn with_page(&self, page: u32) -> std::result::Result<Self, ConfigurationError> {
        if page == 0 {
            return Err(ConfigurationError::InvalidPage(page));
        }
        Ok(Self {
            page,
            ..self.clone()
        })
    }

    /// Requests `per_page` items per page, clamped to `1..=50`.
    #[must_use]
    pub fn with_per_page(&self, per_page: u32) -> Self {
        Self {
            per_page: clamp_per_page(per_page),
            ..self.clone()
        }
    }

    /// Caps the number of yielded items.
    #[must_use]
    pub fn with_limit(&self, limit: Limit) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }

    /// Surfaces non-success statuses as errors instead of ending the results.
    #[must_use]
    pub fn strict(&self, strict: bool) -> Self {
        Self {
            strict,
            ..self.clone()
        }
    }

    /// Turns this into a reverse image search for the image at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidDistance`] unless `distance` is in `(0, 1]`.
    pub fn reverse(
        &self,
        url: impl Into<String>,
        distance: f64,
    ) -> std::result::Result<Self, ConfigurationError> {
        if !(distance.is_finite() && distance > 0.0 && distance <= 1.0) {
            return Err(ConfigurationError::InvalidDistance(distance));
        }
        Ok(Self {
            reverse: Some(Reverse {
                url: url.into(),
                distance,
            }),
            ..self.clone()
        })
    }

    /// Restricts results by one of the key owner's lists.
    ///
    /// Without a key, or with `None`, both `my:` forms are dropped.
    #[must_use]
    pub fn my_list(&self, list: MyList, option: Option<UserOption>) -> Self {
        let only = list.tag();
        let not = format!("-{only}");
        match (self.key.is_empty(), option) {
            (false, Some(UserOption::Only)) => self.remove_tags([not]).append_tags([only]),
            (false, Some(UserOption::Not)) => self.remove_tags([only]).append_tags([not]),
            _ => self.remove_tags([only.to_string(), not]),
        }
    }

    /// See [`Search::my_list`] with [`MyList::Faves`].
    #[must_use]
    pub fn faves(&self, option: Option<UserOption>) -> Self {
        self.my_list(MyList::Faves, option)
    }

    /// See [`Search::my_list`] with [`MyList::Upvotes`].
    #[must_use]
    pub fn upvotes(&self, option: Option<UserOption>) -> Self {
        self.my_list(MyList::Upvotes, option)
    }

    /// See [`Search::my_list`] with [`MyList::Uploads`].
    #[must_use]
    pub fn uploads(&self, option: Option<UserOption>) -> Self {
        self.my_list(MyList::Uploads, option)
    }

    /// See [`Search::my_list`] with [`MyList::Watched`].
    #[must_use]
    pub fn watched(&self, option: Option<UserOption>) -> Self {
        self.my_list(MyList::Watched, option)
    }

    /// Trending images: best scored among those first seen in the last 3 days.
    #[must_use]
    pub fn top(&self) -> Self {
        self.with_sort(SortField::Score)
            .with_query(["first_seen_at.gt:3 days ago"])
    }

    /// Excludes images by id.
    #[must_use]
    pub fn exclude_ids(&self, ids: &[u64]) -> Self {
        self.remove_tags(ids.iter().map(|id| format!("id:{id}")))
            .append_tags(ids.iter().map(|id| format!("-id:{id}")))
    }

    /// The `q` parameter: tags joined with `, `, or `*` for everything.
    pub fn query_string(&self) -> String {
        if self.query.is_empty() {
            "*".to_string()
        } else {
            self.query.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        }
    }

    /// Query pairs sent to list endpoints. `page` is added per request.
    pub fn api_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(6);
        if !self.key.is_empty() {
            params.push(("key".to_string(), self.key.clone()));
        }
        params.push(("q".to_string(), self.query_string()));
        params.push(("sf".to_string(), self.sort_field.as_str().to_string()));
        params.push(("sd".to_string(), self.sort_direction.as_str().to_string()));
        if let Some(id) = self.filter_id {
            params.push(("filter_id".to_string(), id.to_string()));
        }
        params.push(("per_page".to_string(), self.per_page.to_string()));
        params
    }

    /// A browsable search URL on [`DEFAULT_HOST`], for display and sharing.
    ///
    /// The API key is never part of it.
    pub fn build_url(&self) -> String {
        self.build_url_on(DEFAULT_HOST)
    }

    /// A browsable search URL on `host`.
    pub fn build_url_on(&self, host: &str) -> String {
        self.build_listing_url_on(host, &Listing::Images)
    }

    /// The web page showing `listing` for this search, on [`DEFAULT_HOST`].
    pub fn build_listing_url(&self, listing: &Listing) -> String {
        self.build_listing_url_on(DEFAULT_HOST, listing)
    }

    /// The web page showing `listing` for this search, on `host`.
    ///
    /// Comment and tag searches name their query `qc` and `tq` on the
    /// site. Topic posts are shown 25 to a page, so the page number is
    /// converted to the web page holding the first post of the API page.
    pub fn build_listing_url_on(&self, host: &str, listing: &Listing) -> String {
        let host = host.trim_end_matches('/');
        let (path, pairs) = match listing {
            Listing::Images => ("/search".to_string(), self.display_pairs("q")),
            Listing::Comments => ("/comments".to_string(), self.display_pairs("qc")),
            Listing::Tags => ("/tags".to_string(), self.display_pairs("tq")),
            Listing::Galleries => ("/galleries".to_string(), self.display_pairs("q")),
            Listing::Posts => ("/posts".to_string(), self.display_pairs("q")),
            Listing::Forums => ("/forums".to_string(), self.paging_pairs()),
            Listing::Topics { forum } => (format!("/forums/{forum}"), self.paging_pairs()),
            Listing::TopicPosts { forum, topic } => {
                let first_post = u64::from(self.page - 1) * u64::from(self.per_page) + 1;
                let web_page = first_post.div_ceil(u64::from(WEB_TOPIC_PAGE_SIZE));
                let pairs = if web_page == 1 {
                    Vec::new()
                } else {
                    vec![("page", web_page.to_string())]
                };
                (format!("/forums/{forum}/topics/{topic}"), pairs)
            }
            Listing::SystemFilters | Listing::UserFilters => ("/filters".to_string(), Vec::new()),
        };
        display_url(&format!("{host}{path}"), &pairs)
    }

    /// The related-images page of `image_id`, on [`DEFAULT_HOST`].
    pub fn build_related_url(&self, image_id: u64) -> String {
        self.build_related_url_on(DEFAULT_HOST, image_id)
    }

    /// The related-images page of `image_id`, on `host`.
    pub fn build_related_url_on(&self, host: &str, image_id: u64) -> String {
        let base = format!("{}/images/{image_id}/related", host.trim_end_matches('/'));
        display_url(&base, &self.display_pairs("q"))
    }

    fn display_pairs(&self, query_key: &'static str) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (query_key, self.query_string()),
            ("sf", self.sort_field.as_str().to_string()),
            ("sd", self.sort_direction.as_str().to_string()),
        ];
        if let Some(id) = self.filter_id {
            pairs.push(("filter_id", id.to_string()));
        }
        pairs.extend(self.paging_pairs());
        pairs
    }

    fn paging_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.page != 1 {
            pairs.push(("page", self.page.to_string()));
        }
        if self.per_page != DEFAULT_PER_PAGE {
            pairs.push(("per_page", self.per_page.to_string()));
        }
        pairs
    }

    /// Describes one listing of this search for the pager.
    pub fn page_request<T: Transport + ?Sized>(&self, transport: &T, listing: &Listing) -> PageRequest {
        let host = transport.host();
        match (&self.reverse, listing) {
            (Some(target), Listing::Images) => PageRequest {
                method: Method::POST,
                url: format!("{host}/api/v1/json/search/reverse"),
                params: vec![
                    ("url".to_string(), target.url.clone()),
                    ("distance".to_string(), target.distance.to_string()),
                ],
                items_key: listing.items_key().to_string(),
                per_page: MAX_PER_PAGE,
                first_page: 1,
                strict: self.strict,
            },
            _ => PageRequest {
                method: Method::GET,
                url: format!("{host}/api/v1/json/{}", listing.path()),
                params: self.api_params(),
                items_key: listing.items_key().to_string(),
                per_page: self.per_page,
                first_page: self.page,
                strict: self.strict,
            },
        }
    }

    /// Raw items of any listing, bounded by this search's limit.
    pub fn raw<'a, T: Transport + ?Sized>(
        &self,
        transport: &'a T,
        listing: &Listing,
    ) -> impl Stream<Item = Result<serde_json::Value>> + 'a {
        let request = self.page_request(transport, listing);
        Pager::new(transport, request, self.limit).into_stream()
    }

    /// Generic records of any listing.
    pub fn records<'a, T: Transport + ?Sized>(
        &self,
        transport: &'a T,
        listing: &Listing,
    ) -> impl Stream<Item = Result<Record>> + 'a {
        self.raw(transport, listing)
            .and_then(|value| futures::future::ready(Record::from_value(value)))
    }

    /// Images matching the search (or the reverse search target).
    pub fn images<'a, T: Transport + ?Sized>(
        &self,
        transport: &'a T,
    ) -> impl Stream<Item = Result<Image>> + 'a {
        let host = transport.host().to_string();
        self.records(transport, &Listing::Images)
            .map_ok(move |record| Image::new(record, &host))
    }

    /// Comments matching the search.
    pub fn comments<'a, T: Transport + ?Sized>(
        &self,
        transport: &'a T,
    ) -> impl Stream<Item = Result<Comment>> + 'a {
        let host = transport.host().to_string();
        self.records(transport, &Listing::Comments)
            .map_ok(move |record| Comment::new(record, &host))
    }

    /// Images related to `image_id`, most relevant first.
    ///
    /// The related ids come from the markup fallback; when it yields
    /// nothing the stream is empty and no search is issued.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from fetching the related page.
    pub async fn related<'a, T: Transport + ?Sized>(
        &self,
        transport: &'a T,
        image_id: u64,
    ) -> Result<impl Stream<Item = Result<Image>> + 'a> {
        let ids = scrape::related_ids(transport, image_id).await?;
        log::debug!("{} related images found for {image_id}", ids.len());

        let search = if ids.is_empty() {
            self.with_limit(Limit::At(0))
        } else {
            let query = ids
                .iter()
                .map(|id| format!("id:{id}"))
                .collect::<Vec<_>>()
                .join(" || ");
            self.with_query([query])
                .with_sort(SortField::Relevance)
                .descending()
        };
        Ok(search.images(transport))
    }

    /// Whether the key owner upvoted `image_id`.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn is_upvoted<T: Transport + ?Sized>(&self, transport: &T, image_id: u64) -> Result<bool> {
        let search = self
            .with_filter(Some(EVERYTHING_FILTER))
            .with_limit(Limit::At(1))
            .with_query([format!("id:{image_id}"), "my:upvotes".to_string()]);
        let mut hits = Box::pin(search.raw(transport, &Listing::Images));
        Ok(hits.try_next().await?.is_some())
    }
}

fn display_url(base: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return base.to_string();
    }
    match Url::parse_with_params(base, pairs) {
        Ok(url) => url.into(),
        // a malformed host still gets a readable link
        Err(_) => {
            let query = pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            format!("{base}?{query}")
        }
    }
}

fn tag_set<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter()
        .map(Into::into)
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn clamp_per_page(per_page: u32) -> u32 {
    per_page.clamp(1, MAX_PER_PAGE)
}

fn parse_filter(raw: &str) -> std::result::Result<Option<u32>, ConfigurationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| ConfigurationError::InvalidFilter(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockTransport;
    use futures::TryStreamExt;

    #[test]
    fn mutators_leave_the_receiver_alone() {
        let base = Search::new().with_query(["safe"]).with_key("k");
        let snapshot = base.clone();

        let _ = base.with_key("other");
        let _ = base.append_tags(["pony"]);
        let _ = base.remove_tags(["safe"]);
        let _ = base.with_sort(SortField::Random);
        let _ = base.ascending();
        let _ = base.with_filter(Some(100_073));
        let _ = base.with_page(3).unwrap();
        let _ = base.with_per_page(50);
        let _ = base.with_limit(Limit::Unbounded);
        let _ = base.faves(Some(UserOption::Only));
        let _ = base.top();
        let _ = base.strict(true);
        let _ = base.reverse("https://example.com/a.png", 0.25).unwrap();

        assert_eq!(base, snapshot);
    }

    #[test]
    fn append_then_remove_restores_tags() {
        let base = Search::new().with_query(["safe", "pony"]);
        let round = base.append_tags(["a"]).remove_tags(["a"]);
        assert_eq!(round.tags(), base.tags());
        assert!(base.append_tags(["a"]).tags().contains("a"));
    }

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(Search::new().query_string(), "*");
        let search = Search::new().with_query(["safe", "  ", "pony"]);
        assert_eq!(search.query_string(), "pony, safe");
    }

    #[test]
    fn params_are_validated() {
        let bad_sort = SearchParams {
            sf: "popularity".to_string(),
            ..SearchParams::default()
        };
        assert_eq!(
            Search::try_from(bad_sort),
            Err(ConfigurationError::UnknownSortField("popularity".to_string()))
        );

        let bad_direction = SearchParams {
            sd: "up".to_string(),
            ..SearchParams::default()
        };
        assert!(matches!(
            Search::try_from(bad_direction),
            Err(ConfigurationError::UnknownSortDirection(_))
        ));

        let bad_filter = SearchParams {
            filter_id: "everything".to_string(),
            ..SearchParams::default()
        };
        assert!(matches!(
            Search::try_from(bad_filter),
            Err(ConfigurationError::InvalidFilter(_))
        ));

        let bad_page = SearchParams {
            page: 0,
            ..SearchParams::default()
        };
        assert_eq!(Search::try_from(bad_page), Err(ConfigurationError::InvalidPage(0)));
        assert!(Search::new().with_page(0).is_err());
        assert!(Search::new().sort_by("wilson_score").is_ok());
    }

    #[test]
    fn per_page_is_clamped() {
        assert_eq!(Search::new().with_per_page(0).per_page(), 1);
        assert_eq!(Search::new().with_per_page(500).per_page(), 50);
        let params = SearchParams {
            per_page: 75,
            ..SearchParams::default()
        };
        assert_eq!(Search::try_from(params).unwrap().per_page(), 50);
    }

    #[test]
    fn parameters_round_trip() {
        let search = Search::new()
            .with_key("secret")
            .with_query(["safe"])
            .with_sort(SortField::Score)
            .ascending()
            .with_filter(Some(56027))
            .with_limit(Limit::Unbounded);
        let params = search.parameters();
        assert_eq!(params.filter_id, "56027");
        assert_eq!(params.limit, None);
        assert_eq!(Search::try_from(params).unwrap(), search);
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: SearchParams = serde_json::from_str(r#"{"q": ["safe"], "sf": "score"}"#).unwrap();
        let search = Search::try_from(params).unwrap();
        assert_eq!(search.sort_field(), SortField::Score);
        assert_eq!(search.per_page(), 25);
        assert_eq!(search.limit(), Limit::At(50));
    }

    #[test]
    fn user_lists_need_a_key() {
        let anonymous = Search::new().faves(Some(UserOption::Only));
        assert!(anonymous.tags().is_empty());

        let keyed = Search::new().with_key("k");
        let only = keyed.faves(Some(UserOption::Only));
        assert!(only.tags().contains("my:faves"));

        let not = only.faves(Some(UserOption::Not));
        assert!(not.tags().contains("-my:faves"));
        assert!(!not.tags().contains("my:faves"));

        assert!(not.faves(None).tags().is_empty());
        assert!(keyed.watched(Some(UserOption::Only)).tags().contains("my:watched"));
    }

    #[test]
    fn exclude_ids_flips_inclusions() {
        let search = Search::new().with_query(["id:1", "safe"]).exclude_ids(&[1, 2]);
        let tags: Vec<_> = search.tags().iter().cloned().collect();
        assert_eq!(tags, ["-id:1", "-id:2", "safe"]);
    }

    #[test]
    fn build_url_is_encoded_and_keyless() {
        let url = Search::new().with_key("secret").build_url();
        assert!(url.starts_with("https://derpibooru.org/search?"));
        assert!(url.contains("sf=created_at"));
        assert!(url.contains("sd=desc"));
        assert!(!url.contains("secret"));

        let url = Search::new()
            .with_query(["artist:foo bar", "safe"])
            .with_filter(Some(1))
            .with_page(2)
            .unwrap()
            .build_url_on("https://trixiebooru.org/");
        assert!(url.starts_with("https://trixiebooru.org/search?q=artist%3Afoo+bar%2C+safe"));
        assert!(url.contains("filter_id=1"));
        assert!(url.contains("page=2"));
    }

    #[test]
    fn listing_urls_follow_the_site_layout() {
        let search = Search::new().with_query(["safe"]);
        let comments = search.build_listing_url(&Listing::Comments);
        assert!(comments.starts_with("https://derpibooru.org/comments?qc=safe&sf="));

        let tags = search.build_listing_url(&Listing::Tags);
        assert!(tags.starts_with("https://derpibooru.org/tags?tq=safe&"));

        let galleries = search.build_listing_url_on("https://trixiebooru.org/", &Listing::Galleries);
        assert!(galleries.starts_with("https://trixiebooru.org/galleries?q=safe&"));

        let topics = search.with_page(3).unwrap().build_listing_url(&Listing::Topics {
            forum: "dis".to_string(),
        });
        assert_eq!(topics, "https://derpibooru.org/forums/dis?page=3");
        assert_eq!(
            search.build_listing_url(&Listing::UserFilters),
            "https://derpibooru.org/filters"
        );
        assert_eq!(
            search.build_listing_url(&Listing::Images),
            search.build_url()
        );
    }

    #[test]
    fn topic_post_urls_use_web_pages() {
        let topic = Listing::TopicPosts {
            forum: "dis".to_string(),
            topic: "ask-the-mods".to_string(),
        };
        let base = "https://derpibooru.org/forums/dis/topics/ask-the-mods";

        assert_eq!(Search::new().build_listing_url(&topic), base);

        let third = Search::new().with_per_page(50).with_page(3).unwrap();
        assert_eq!(third.build_listing_url(&topic), format!("{base}?page=5"));

        let second = Search::new().with_per_page(10).with_page(2).unwrap();
        assert_eq!(second.build_listing_url(&topic), base);
    }

    #[test]
    fn related_url_carries_the_search() {
        let url = Search::new()
            .with_key("secret")
            .with_sort(SortField::Score)
            .build_related_url(42);
        assert!(url.starts_with("https://derpibooru.org/images/42/related?q=*&sf=score&sd=desc"));
        assert!(!url.contains("secret"));
    }

    #[test]
    fn api_params_skip_unset_values() {
        let params = Search::new().api_params();
        let keys: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["q", "sf", "sd", "per_page"]);

        let keyed = Search::new().with_key("k").with_filter(Some(7)).api_params();
        assert!(keyed.contains(&("key".to_string(), "k".to_string())));
        assert!(keyed.contains(&("filter_id".to_string(), "7".to_string())));
    }

    #[test]
    fn reverse_distance_is_validated() {
        assert!(Search::new().reverse("u", 0.0).is_err());
        assert!(Search::new().reverse("u", 1.5).is_err());
        assert!(Search::new().reverse("u", f64::NAN).is_err());
        assert!(Search::new().reverse("u", 1.0).is_ok());
    }

    #[tokio::test]
    async fn reverse_search_posts_only_url_and_distance() {
        let backend = MockTransport::with_pages("images", &[3]);
        let search = Search::new()
            .with_key("k")
            .with_query(["safe"])
            .reverse("https://example.com/a.png", 0.25)
            .unwrap();

        let images: Vec<_> = search.images(&backend).try_collect().await.unwrap();
        assert_eq!(images.len(), 3);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert!(requests[0].url.ends_with("/api/v1/json/search/reverse"));
        let keys: Vec<_> = requests[0].query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["url", "distance"]);
    }

    #[tokio::test]
    async fn related_searches_scraped_ids() {
        let backend = MockTransport::with_pages("images", &[2]).with_html(
            "https://derpibooru.org/images/10/related",
            r#"<div class="media-box" data-image-id="11"></div><div class="media-box" data-image-id="12"></div>"#,
        );

        let related = Search::new().related(&backend, 10).await.unwrap();
        let images: Vec<_> = related.try_collect().await.unwrap();
        assert_eq!(images.len(), 2);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .query
            .contains(&("q".to_string(), "id:11 || id:12".to_string())));
        assert!(requests[0]
            .query
            .contains(&("sf".to_string(), "_score".to_string())));
    }

    #[tokio::test]
    async fn related_without_ids_issues_no_search() {
        let backend = MockTransport::with_pages("images", &[2]);
        let related = Search::new().related(&backend, 10).await.unwrap();
        let images: Vec<_> = related.try_collect().await.unwrap();
        assert!(images.is_empty());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn upvote_check_runs_a_single_item_search() {
        let backend = MockTransport::with_pages("images", &[1]);
        assert!(Search::new().with_key("k").is_upvoted(&backend, 42).await.unwrap());

        let request = &backend.requests()[0];
        assert!(request.query.contains(&("filter_id".to_string(), "56027".to_string())));
        assert!(request
            .query
            .contains(&("q".to_string(), "id:42, my:upvotes".to_string())));

        let empty = MockTransport::with_pages("images", &[0]);
        assert!(!Search::new().with_key("k").is_upvoted(&empty, 42).await.unwrap());
    }
}
