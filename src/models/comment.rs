//! Comments on images.

use std::ops::Deref;

use crate::{
    client::Transport,
    lookup,
    models::{absolute_url, macros::passthrough, parse_time},
    record::Record,
    result::Result,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A comment on an image.
#[derive(Debug, Clone)]
pub struct Comment {
    record: Record,
    host: String,
}

impl Deref for Comment {
    type Target = Record;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

#[cfg(feature = "display")]
impl std::fmt::Display for Comment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Comment({})", self.id())
    }
}

impl Comment {
    /// Wraps `record`; `host` is used for permalinks.
    pub fn new(record: Record, host: &str) -> Self {
        Self {
            record,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches a comment by id. See [`lookup::comment`].
    ///
    /// # Errors
    ///
    /// Propagates transport and decoding failures.
    pub async fn fetch<T: Transport + ?Sized>(transport: &T, id: u64) -> Result<Option<Self>> {
        lookup::comment(transport, id).await
    }

    /// Numeric id, 0 if the payload lacks one.
    pub fn id(&self) -> u64 {
        self.record.id().unwrap_or_default()
    }

    passthrough! {
        /// Id of the image the comment is on.
        image_id: u64,
        /// Display name of the author.
        author: str,
        /// Comment text in markup form.
        body: str,
        /// Id of the author, absent for anonymous comments.
        user_id: u64,
        /// Reason given for the last edit.
        edit_reason: str,
    }

    /// Absolute URL of the author's avatar.
    pub fn avatar(&self) -> Option<String> {
        self.record
            .get("avatar")
            .and_then(Value::as_str)
            .map(absolute_url)
    }

    /// Posting time.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_time(self.record.get("created_at").and_then(Value::as_str))
    }

    /// Last modification time.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_time(self.record.get("updated_at").and_then(Value::as_str))
    }

    /// Last edit time, if the comment was edited.
    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        parse_time(self.record.get("edited_at").and_then(Value::as_str))
    }

    /// Permalink of the comment on its image page.
    pub fn url(&self) -> String {
        format!(
            "{}/images/{}#comment_{}",
            self.host,
            self.image_id().unwrap_or_default(),
            self.id()
        )
    }
}
