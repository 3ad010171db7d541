pub mod comment;
pub mod image;
pub mod record;

use chrono::{DateTime, Utc};

/// Makes protocol-relative paths (`//host/path`) absolute.
pub(crate) fn absolute_url(path: &str) -> String {
    if path.starts_with("//") {
        format!("https:{path}")
    } else {
        path.to_string()
    }
}

/// Parses an RFC 3339 timestamp as sent by the API.
pub(crate) fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(time) => Some(time.with_timezone(&Utc)),
        Err(err) => {
            log::debug!("unparseable timestamp {raw:?}: {err}");
            None
        }
    }
}

pub(crate) mod macros {
    /// Typed passthrough accessors over a wrapper that derefs to `Record`.
    macro_rules! passthrough {
        ($( $(#[$doc:meta])* $name:ident: $kind:ident ),* $(,)?) => {
            $(
                $(#[$doc])*
                pub fn $name(&self) -> Option<passthrough!(@ty $kind)> {
                    passthrough!(@get self, stringify!($name), $kind)
                }
            )*
        };
        (@ty str) => { &str };
        (@ty u64) => { u64 };
        (@ty i64) => { i64 };
        (@ty f64) => { f64 };
        (@ty bool) => { bool };
        (@get $self:ident, $key:expr, str) => { $self.get($key).and_then(serde_json::Value::as_str) };
        (@get $self:ident, $key:expr, u64) => { $self.get($key).and_then(serde_json::Value::as_u64) };
        (@get $self:ident, $key:expr, i64) => { $self.get($key).and_then(serde_json::Value::as_i64) };
        (@get $self:ident, $key:expr, f64) => { $self.get($key).and_then(serde_json::Value::as_f64) };
        (@get $self:ident, $key:expr, bool) => { $self.get($key).and_then(serde_json::Value::as_bool) };
    }

    pub(crate) use passthrough;
}
