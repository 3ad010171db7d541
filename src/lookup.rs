//! Single items fetched by id.
//!
//! Every lookup returns `Ok(None)` when the server answers with a
//! non-success status, the same way listings treat such answers as the end
//! of results.

use crate::{
    client::{ApiRequest, Transport},
    comment::Comment,
    error::Error,
    image::Image,
    record::Record,
    result::Result,
    scrape,
};
use serde_json::Value;

/// Duplicate chains longer than this are not followed.
const MAX_DUPLICATE_HOPS: usize = 8;

/// Fetches `/api/v1/json/{path}` and unwraps the object under `key`.
pub(crate) async fn item<T: Transport + ?Sized>(transport: &T, path: &str, key: &str) -> Result<Option<Record>> {
    let request = ApiRequest::get(format!("{}/api/v1/json/{path}", transport.host()));
    let body = match transport.fetch_json(&request).await {
        Ok(body) => body,
        Err(Error::UnexpectedStatus(code)) => {
            log::warn!("{} answered {code}", request.url);
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    match body {
        Value::Object(mut body) => {
            let inner = body.remove(key).ok_or_else(|| Error::MissingKey(key.to_string()))?;
            Record::from_value(inner).map(Some)
        }
        other => Record::from_value(other).map(Some),
    }
}

/// The raw record of an image, following `duplicate_of` redirects.
pub(crate) async fn image_record<T: Transport + ?Sized>(transport: &T, id: &str) -> Result<Option<Record>> {
    let mut path = format!("images/{id}");
    for _ in 0..MAX_DUPLICATE_HOPS {
        let Some(record) = item(transport, &path, "image").await? else {
            return Ok(None);
        };
        match record.get("duplicate_of").and_then(Value::as_u64) {
            Some(target) => {
                log::debug!("{path} is a duplicate of {target}");
                path = format!("images/{target}");
            }
            None => return Ok(Some(record)),
        }
    }
    log::warn!("gave up following duplicates at {path}");
    Ok(None)
}

/// An image by id.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn image<T: Transport + ?Sized>(transport: &T, id: u64) -> Result<Option<Image>> {
    let record = image_record(transport, &id.to_string()).await?;
    Ok(record.map(|record| Image::new(record, transport.host())))
}

/// The currently featured image.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn featured_image<T: Transport + ?Sized>(transport: &T) -> Result<Option<Image>> {
    let record = image_record(transport, "featured").await?;
    Ok(record.map(|record| Image::new(record, transport.host())))
}

/// A comment by id.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn comment<T: Transport + ?Sized>(transport: &T, id: u64) -> Result<Option<Comment>> {
    let record = item(transport, &format!("comments/{id}"), "comment").await?;
    Ok(record.map(|record| Comment::new(record, transport.host())))
}

/// A tag by slug, e.g. `artist-colon-example`.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn tag<T: Transport + ?Sized>(transport: &T, slug: &str) -> Result<Option<Record>> {
    item(transport, &format!("tags/{slug}"), "tag").await
}

/// A user profile by id.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn user<T: Transport + ?Sized>(transport: &T, id: u64) -> Result<Option<Record>> {
    item(transport, &format!("profiles/{id}"), "user").await
}

/// A user profile by name.
///
/// The id is read off the profile page, so this depends on the markup
/// fallbacks being enabled.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn user_by_name<T: Transport + ?Sized>(transport: &T, name: &str) -> Result<Option<Record>> {
    match scrape::profile_id(transport, name).await? {
        Some(id) => user(transport, id).await,
        None => Ok(None),
    }
}

/// A filter by id.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn filter<T: Transport + ?Sized>(transport: &T, id: u32) -> Result<Option<Record>> {
    item(transport, &format!("filters/{id}"), "filter").await
}

/// A forum by short name.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn forum<T: Transport + ?Sized>(transport: &T, short_name: &str) -> Result<Option<Record>> {
    item(transport, &format!("forums/{short_name}"), "forum").await
}

/// A topic of a forum.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn topic<T: Transport + ?Sized>(
    transport: &T,
    forum: &str,
    slug: &str,
) -> Result<Option<Record>> {
    item(transport, &format!("forums/{forum}/topics/{slug}"), "topic").await
}

/// A forum post by id.
///
/// # Errors
///
/// Propagates transport and decoding failures.
pub async fn post<T: Transport + ?Sized>(transport: &T, id: u64) -> Result<Option<Record>> {
    item(transport, &format!("posts/{id}"), "post").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockTransport;
    use reqwest::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn duplicates_are_followed() {
        let backend = MockTransport::new()
            .push_json(json!({ "image": { "id": 1, "duplicate_of": 2 } }))
            .push_json(json!({ "image": { "id": 2, "duplicate_of": null, "tags": "safe" } }));

        let image = image(&backend, 1).await.unwrap().unwrap();
        assert_eq!(image.id(), 2);

        let urls: Vec<_> = backend.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            [
                "https://derpibooru.org/api/v1/json/images/1",
                "https://derpibooru.org/api/v1/json/images/2"
            ]
        );
    }

    #[tokio::test]
    async fn error_status_means_not_found() {
        let backend = MockTransport::new().push_status(StatusCode::NOT_FOUND);
        assert!(comment(&backend, 5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let backend = MockTransport::new().push_json(json!({ "tags": [] }));
        assert!(matches!(
            tag(&backend, "safe").await,
            Err(Error::MissingKey(key)) if key == "tag"
        ));
    }

    #[tokio::test]
    async fn user_by_name_resolves_the_profile_id() {
        let backend = MockTransport::new()
            .with_html(
                "https://derpibooru.org/profiles/Some+Body",
                r#"<a href="/conversations?with=42">Send message</a>"#,
            )
            .push_json(json!({ "user": { "id": 42, "name": "Some Body" } }));

        let user = user_by_name(&backend, "Some Body").await.unwrap().unwrap();
        assert_eq!(user.id(), Some(42));
        assert!(backend.requests()[0].url.ends_with("/api/v1/json/profiles/42"));
    }

    #[tokio::test]
    async fn forum_paths() {
        let backend = MockTransport::new()
            .push_json(json!({ "topic": { "slug": "rules" } }))
            .push_json(json!({ "featured": null }));

        let topic = topic(&backend, "dis", "rules").await.unwrap().unwrap();
        assert_eq!(topic.get_or("slug", String::new()), "rules");
        assert!(post(&backend, 1).await.is_err());
        assert!(backend.requests()[0].url.ends_with("/forums/dis/topics/rules"));
    }
}
