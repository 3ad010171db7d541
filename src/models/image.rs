//! Images and their derived views.

use std::{collections::BTreeMap, ops::Deref};

use crate::{
    client::Transport,
    comment::Comment,
    lookup,
    models::{absolute_url, macros::passthrough, parse_time},
    record::Record,
    result::Result,
    scrape,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

const FAVED_BY: &str = "favourited_by_users";
const COMMENTS: &str = "comments";

const RATINGS: [&str; 7] = [
    "safe",
    "suggestive",
    "questionable",
    "explicit",
    "semi-grimdark",
    "grimdark",
    "grotesque",
];

const SPECIES: [&str; 41] = [
    "pony",
    "earth pony",
    "pegasus",
    "unicorn",
    "alicorn",
    "zebra",
    "zebrasus",
    "zebracorn",
    "zebra alicorn",
    "zony",
    "bat pony",
    "bat unicorn",
    "bat alicorn",
    "dragon",
    "changeling",
    "changeling queen",
    "changedling",
    "breezie",
    "yak",
    "hippogriff",
    "griffon",
    "seapony",
    "seapony (g4)",
    "merpony",
    "dracony",
    "demon pony",
    "tatzlpony",
    "kirin",
    "abyssinian",
    "semi-anthro",
    "anthro",
    "unguligrade anthro",
    "plantigrade anthro",
    "digitigrade anthro",
    "anthro centaur",
    "centaur",
    "human",
    "humanized",
    "mermaid",
    "hybrid",
    "original species",
];

/// Tags crediting someone without naming them.
const UNNAMED_ARTISTS: [&str; 2] = ["artist needed", "anonymous artist"];

/// Tag prefixes that credit a person.
const CREDIT_PREFIXES: [&str; 3] = ["artist:", "editor:", "colorist:"];

/// A list that may be missing from the initial payload.
#[derive(Debug, Clone, PartialEq)]
enum Lazy<T> {
    /// Not looked at yet.
    Unchecked,
    /// Found in the payload the image was built from.
    Present(Vec<T>),
    /// Fetched, scraped, or known to be empty.
    Resolved(Vec<T>),
}

impl<T> Lazy<T> {
    fn as_slice(&self) -> &[T] {
        match self {
            Lazy::Unchecked => &[],
            Lazy::Present(items) | Lazy::Resolved(items) => items,
        }
    }
}

/// An image, wrapping the raw record returned by the API.
///
/// Apart from [`Image::faved_by`] and [`Image::comments`], which may
/// replace the payload once with a freshly fetched copy, the data never
/// changes after construction.
#[derive(Debug, Clone)]
pub struct Image {
    record: Record,
    host: String,
    refreshed: bool,
    faved_by: Lazy<String>,
    comments: Lazy<Comment>,
}

impl Deref for Image {
    type Target = Record;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

#[cfg(feature = "display")]
impl std::fmt::Display for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Image({})", self.id())
    }
}

impl Image {
    /// Wraps `record`; `host` is used for permalinks and refreshes.
    pub fn new(record: Record, host: &str) -> Self {
        Self {
            record,
            host: host.trim_end_matches('/').to_string(),
            refreshed: false,
            faved_by: Lazy::Unchecked,
            comments: Lazy::Unchecked,
        }
    }

    /// Fetches an image by id. See [`lookup::image`].
    ///
    /// # Errors
    ///
    /// Propagates transport and decoding failures.
    pub async fn fetch<T: Transport + ?Sized>(transport: &T, id: u64) -> Result<Option<Self>> {
        lookup::image(transport, id).await
    }

    /// Fetches the featured image. See [`lookup::featured_image`].
    ///
    /// # Errors
    ///
    /// Propagates transport and decoding failures.
    pub async fn featured<T: Transport + ?Sized>(transport: &T) -> Result<Option<Self>> {
        lookup::featured_image(transport).await
    }

    /// Numeric id, 0 if the payload lacks one.
    pub fn id(&self) -> u64 {
        self.record.id().unwrap_or_default()
    }

    passthrough! {
        /// Upvotes minus downvotes.
        score: i64,
        /// Number of upvotes.
        upvotes: u64,
        /// Number of downvotes.
        downvotes: u64,
        /// Number of users who faved the image.
        faves: u64,
        /// Number of comments.
        comment_count: u64,
        /// Number of tags.
        tag_count: u64,
        /// Width in pixels.
        width: u64,
        /// Height in pixels.
        height: u64,
        /// Width divided by height.
        aspect_ratio: f64,
        /// Lower bound of the Wilson score interval.
        wilson_score: f64,
        /// Length in seconds, for animated images and videos.
        duration: f64,
        /// File size in bytes.
        size: u64,
        /// Display name of the uploader, absent for anonymous uploads.
        uploader: str,
        /// Id of the uploader.
        uploader_id: u64,
        /// Description in markup form.
        description: str,
        /// MIME type, e.g. `image/png`.
        mime_type: str,
        /// File format, e.g. `png`.
        format: str,
        /// Original file name.
        name: str,
        /// SHA-512 of the file as served.
        sha512_hash: str,
        /// SHA-512 of the file as uploaded.
        orig_sha512_hash: str,
        /// Whether the image is spoilered by the current filter.
        spoilered: bool,
        /// Whether the image is hidden from users.
        hidden_from_users: bool,
        /// Whether thumbnails have been generated.
        thumbnails_generated: bool,
    }

    /// Upload time.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_time(self.record.get("created_at").and_then(Value::as_str))
    }

    /// Last modification time.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_time(self.record.get("updated_at").and_then(Value::as_str))
    }

    /// When the image first appeared publicly.
    pub fn first_seen_at(&self) -> Option<DateTime<Utc>> {
        parse_time(self.record.get("first_seen_at").and_then(Value::as_str))
    }

    /// Tags, split out of the comma separated `tags` field.
    ///
    /// Newer API versions send `tags` as an array, which is accepted too.
    pub fn tags(&self) -> Vec<String> {
        match self.record.get("tags") {
            Some(Value::String(tags)) => tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(ToString::to_string)
                .collect(),
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Credited people: artists, editors and colorists, prefix stripped.
    pub fn artists(&self) -> Vec<String> {
        self.tags()
            .into_iter()
            .filter_map(|tag| {
                if UNNAMED_ARTISTS.contains(&tag.as_str()) {
                    return Some(tag);
                }
                CREDIT_PREFIXES
                    .iter()
                    .find_map(|prefix| tag.strip_prefix(prefix))
                    .map(ToString::to_string)
            })
            .collect()
    }

    /// Content rating tags.
    pub fn rating(&self) -> Vec<String> {
        self.tags_in(&RATINGS)
    }

    /// Species tags.
    pub fn species(&self) -> Vec<String> {
        self.tags_in(&SPECIES)
    }

    fn tags_in(&self, known: &[&str]) -> Vec<String> {
        self.tags()
            .into_iter()
            .filter(|tag| known.contains(&tag.as_str()))
            .collect()
    }

    /// Size name to absolute URL, e.g. `thumb` → `https://derpicdn.net/...`.
    pub fn representations(&self) -> BTreeMap<String, String> {
        self.record
            .get("representations")
            .and_then(Value::as_object)
            .map(|sizes| {
                sizes
                    .iter()
                    .filter_map(|(size, url)| Some((size.clone(), absolute_url(url.as_str()?))))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Absolute URL of one size variant.
    pub fn representation(&self, size: &str) -> Option<String> {
        self.record
            .get("representations")
            .and_then(|sizes| sizes.get(size))
            .and_then(Value::as_str)
            .map(absolute_url)
    }

    /// 250×250 thumbnail.
    pub fn thumb(&self) -> Option<String> {
        self.representation("thumb")
    }

    /// 50×50 thumbnail.
    pub fn thumb_tiny(&self) -> Option<String> {
        self.representation("thumb_tiny")
    }

    /// 150×150 thumbnail.
    pub fn thumb_small(&self) -> Option<String> {
        self.representation("thumb_small")
    }

    /// 320×240 rendition.
    pub fn small(&self) -> Option<String> {
        self.representation("small")
    }

    /// 800×600 rendition.
    pub fn medium(&self) -> Option<String> {
        self.representation("medium")
    }

    /// 1280×1024 rendition.
    pub fn large(&self) -> Option<String> {
        self.representation("large")
    }

    /// 1024 wide rendition for tall images.
    pub fn tall(&self) -> Option<String> {
        self.representation("tall")
    }

    /// The full-size file.
    pub fn full(&self) -> Option<String> {
        self.representation("full")
    }

    /// Direct URL of the file.
    pub fn view_url(&self) -> Option<String> {
        self.record
            .get("view_url")
            .or_else(|| self.record.get("image"))
            .and_then(Value::as_str)
            .map(absolute_url)
    }

    /// Permalink of the image page.
    pub fn url(&self) -> String {
        format!("{}/images/{}", self.host, self.id())
    }

    /// Where the image came from, or the permalink when no source is set.
    pub fn source(&self) -> String {
        let single = self.record.get("source_url").and_then(Value::as_str);
        let first = self
            .record
            .get("source_urls")
            .and_then(Value::as_array)
            .and_then(|urls| urls.first())
            .and_then(Value::as_str);

        single
            .or(first)
            .filter(|url| !url.is_empty())
            .map_or_else(|| self.url(), ToString::to_string)
    }

    /// Names of the users who faved the image.
    ///
    /// When the payload lacks the list and the image has faves, the image
    /// is fetched again once; if the list is still missing, the favourites
    /// page is scraped. The result is kept for later calls.
    ///
    /// # Errors
    ///
    /// Propagates transport failures of the supplementary requests. A
    /// failed call leaves nothing cached, so the next call tries again.
    pub async fn faved_by<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<Vec<String>> {
        if self.faved_by == Lazy::Unchecked {
            self.faved_by = self.resolve_faved_by(transport).await?;
        }
        Ok(self.faved_by.as_slice().to_vec())
    }

    async fn resolve_faved_by<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<Lazy<String>> {
        if let Some(users) = self.string_list(FAVED_BY) {
            return Ok(Lazy::Present(users));
        }
        if self.faves().unwrap_or_default() == 0 {
            return Ok(Lazy::Resolved(Vec::new()));
        }

        self.refresh(transport).await?;
        if let Some(users) = self.string_list(FAVED_BY) {
            return Ok(Lazy::Resolved(users));
        }
        let users = scrape::favorites(transport, self.id()).await?;
        Ok(Lazy::Resolved(users))
    }

    /// Comments on the image.
    ///
    /// When the payload lacks them and `comment_count` is non-zero, the
    /// image is fetched again once. The result is kept for later calls.
    ///
    /// # Errors
    ///
    /// Propagates transport failures of the supplementary request. A
    /// failed call leaves nothing cached, so the next call tries again.
    pub async fn comments<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<Vec<Comment>> {
        if matches!(self.comments, Lazy::Unchecked) {
            self.comments = self.resolve_comments(transport).await?;
        }
        Ok(self.comments.as_slice().to_vec())
    }

    async fn resolve_comments<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<Lazy<Comment>> {
        if let Some(comments) = self.comment_list() {
            return Ok(Lazy::Present(comments));
        }
        if self.comment_count().unwrap_or_default() == 0 {
            return Ok(Lazy::Resolved(Vec::new()));
        }

        self.refresh(transport).await?;
        Ok(Lazy::Resolved(self.comment_list().unwrap_or_default()))
    }

    /// Replaces the payload with a fresh copy, at most once per image.
    ///
    /// An answered request counts, even a non-success status. Transport
    /// failures do not, and leave the refresh available.
    async fn refresh<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<()> {
        if self.refreshed {
            return Ok(());
        }

        let id = self.id().to_string();
        log::debug!("refreshing image {id} for missing fields");
        let fresh = lookup::image_record(transport, &id).await?;
        self.refreshed = true;
        if let Some(fresh) = fresh {
            self.record.replace(fresh);
        }
        Ok(())
    }

    fn string_list(&self, field: &str) -> Option<Vec<String>> {
        let items = self.record.get(field)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect(),
        )
    }

    fn comment_list(&self) -> Option<Vec<Comment>> {
        let items = self.record.get(COMMENTS)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|item| Record::from_value(item.clone()).ok())
                .map(|record| Comment::new(record, &self.host))
                .collect(),
        )
    }
}
