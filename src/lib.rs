#![deny(clippy::all, clippy::pedantic)]
#![deny(missing_docs)]
#![allow(clippy::must_use_candidate)]
//! # derpibooru
//!
//! derpibooru is a convenient wrapper library around the Derpibooru
//! (Philomena) JSON API.
//!
//! This library can search and fetch:
//! - [`Image`]s, including reverse image search and related images
//! - [`Comment`]s
//! - tags, galleries, forums, topics, posts, filters and users as [`Record`]s
//!
//! Searches are immutable [`Search`] values. Results arrive as a lazy
//! stream that requests one page at a time and stops at the search's
//! limit or when the results run out.
//!
//! ## Example: Printing the top images of the last three days.
//!
//! ```rust,no_run
//! # type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
//! use derpibooru::{search::{Limit, Search}, Client};
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new();
//!     let top = Search::new().top().with_limit(Limit::At(5));
//!
//!     let mut images = Box::pin(top.images(&client));
//!     while let Some(image) = images.try_next().await? {
//!         println!("{} by {:?}: {}", image.id(), image.artists(), image.url());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`Image`]:   crate::image::Image
//! [`Comment`]: crate::comment::Comment
//! [`Record`]:  crate::record::Record
//! [`Search`]:  crate::search::Search

/// Client module contains [`Client`] and the [`Transport`] seam.
///
/// [`Transport`]: crate::client::Transport
pub mod client;

/// Contains [`Error`]s that can be thrown by the libary.
///
/// [`Error`]: crate::error::Error
pub mod error;

/// Single items fetched by id.
pub mod lookup;

pub(crate) mod models;

/// Pagination over the listing endpoints.
pub mod pager;

pub(crate) mod result;

/// Markup fallbacks.
pub mod scrape;

pub mod search;

#[cfg(test)]
pub(crate) mod test_util;

pub use client::Client;
pub use models::*;
