//! Best-effort markup fallbacks for data without a JSON endpoint.
//!
//! The parsers pick elements out of the page with CSS selectors. They never
//! fail: markup they do not recognise simply yields nothing. Every fetch
//! goes through [`Transport::fetch_html`], so a [`Client`] built with
//! `scraping(false)` turns all of this off.
//!
//! [`Client`]: crate::Client

use std::sync::LazyLock;

use crate::{client::Transport, result::Result};
use scraper::{ElementRef, Html, Selector};

const CONVERSATION_LINK: &str = "/conversations?with=";

static HEADING: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("h5").ok());

static MEDIA_BOX: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("div.media-box[data-image-id]").ok());

static MESSAGE_LINK: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse(r#"a[href^="/conversations?with="]"#).ok());

/// Names of the users who faved an image, from its favourites page.
///
/// The names are the links following the last `h5` heading.
pub fn parse_favorites(html: &str) -> Vec<String> {
    let Some(heading) = HEADING.as_ref() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let Some(heading) = document.select(heading).last() else {
        return Vec::new();
    };

    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "a")
        .map(|link| link.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Image ids listed on a related-images page.
pub fn parse_related_ids(html: &str) -> Vec<u64> {
    let Some(media_box) = MEDIA_BOX.as_ref() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let ids = document
        .select(media_box)
        .filter_map(|element| element.value().attr("data-image-id"))
        .filter_map(|id| id.trim().parse().ok())
        .collect();
    ids
}

/// Numeric user id from a profile page.
pub fn parse_profile_id(html: &str) -> Option<u64> {
    let document = Html::parse_document(html);
    let link = document.select(MESSAGE_LINK.as_ref()?).next()?;
    let id = link.value().attr("href")?.strip_prefix(CONVERSATION_LINK)?;
    let id = id.split('&').next()?;
    id.parse().ok()
}

/// Users who faved `image_id`.
///
/// # Errors
///
/// Propagates transport failures.
pub async fn favorites<T: Transport + ?Sized>(transport: &T, image_id: u64) -> Result<Vec<String>> {
    let url = format!("{}/images/{image_id}/favorites", transport.host());
    Ok(transport
        .fetch_html(&url)
        .await?
        .map(|html| parse_favorites(&html))
        .unwrap_or_default())
}

/// Ids of the images related to `image_id`.
///
/// # Errors
///
/// Propagates transport failures.
pub async fn related_ids<T: Transport + ?Sized>(transport: &T, image_id: u64) -> Result<Vec<u64>> {
    let url = format!("{}/images/{image_id}/related", transport.host());
    Ok(transport
        .fetch_html(&url)
        .await?
        .map(|html| parse_related_ids(&html))
        .unwrap_or_default())
}

/// Numeric id of the user called `name`.
///
/// # Errors
///
/// Propagates transport failures.
pub async fn profile_id<T: Transport + ?Sized>(transport: &T, name: &str) -> Result<Option<u64>> {
    let url = format!("{}/profiles/{}", transport.host(), name.replace(' ', "+"));
    Ok(transport
        .fetch_html(&url)
        .await?
        .and_then(|html| parse_profile_id(&html)))
}
