use std::{collections::HashMap, time::Duration};

use crate::{
    error::{ConfigurationError, Error},
    result::Result,
};
use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client as ReqwestClient, Method, Proxy};
use serde_json::Value;

/// The host every request goes to unless another one is configured.
pub const DEFAULT_HOST: &str = "https://derpibooru.org";

const DEFAULT_USER_AGENT: &str = "DerpibooruClient/0.1";

/// A single JSON API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method, `GET` for everything except reverse search.
    pub method: Method,
    /// Absolute endpoint URL without a query string.
    pub url: String,
    /// Query pairs appended to the URL.
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    /// A `GET` request for `url` with no query pairs.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
        }
    }
}

/// The HTTP seam between the library and the API.
///
/// [`Client`] is the production implementation. Anything else that can
/// answer JSON and markup requests (a mock backend, a recording proxy) can
/// be plugged into [`Search`] and the lookups instead.
///
/// [`Search`]: crate::search::Search
#[async_trait]
pub trait Transport: Send + Sync {
    /// Host that endpoint URLs are built against, e.g. `https://derpibooru.org`.
    fn host(&self) -> &str {
        DEFAULT_HOST
    }

    /// Sends `request` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedStatus`] for non-success responses and
    /// propagates transport or decoding failures.
    async fn fetch_json(&self, request: &ApiRequest) -> Result<Value>;

    /// Fetches a web page for the markup fallbacks.
    ///
    /// Returns `None` when scraping is disabled or the page could not be
    /// retrieved with a success status.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    async fn fetch_html(&self, url: &str) -> Result<Option<String>>;
}

/// The reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct Client {
    http: ReqwestClient,
    host: String,
    user_agent: String,
    scraping: bool,
}

impl Client {
    /// A client for [`DEFAULT_HOST`] with default settings.
    pub fn new() -> Client {
        Client {
            http: ReqwestClient::new(),
            host: DEFAULT_HOST.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            scraping: true,
        }
    }

    /// Starts configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Whether the markup fallbacks are enabled.
    pub fn scraping(&self) -> bool {
        self.scraping
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for Client {
    fn host(&self) -> &str {
        &self.host
    }

    async fn fetch_json(&self, request: &ApiRequest) -> Result<Value> {
        let response = {
            let builder = self
                .http
                .request(request.method.clone(), &request.url)
                .header(USER_AGENT, &self.user_agent)
                .query(&request.query);
            log::info!("{} request for {} dispatched", request.method, request.url);
            builder.send().await?
        };

        let status = response.status();
        log::debug!("response status: {status}");

        if status.is_success() {
            response.json::<Value>().await.map_err(Into::into)
        } else {
            Err(Error::UnexpectedStatus(status))
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<Option<String>> {
        if !self.scraping {
            log::debug!("scraping disabled, skipping {url}");
            return Ok(None);
        }

        log::info!("page request for {url} dispatched");
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(Some(response.text().await?))
        } else {
            log::warn!("page {url} answered {status}, ignoring");
            Ok(None)
        }
    }
}

/// Configures a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    host: String,
    user_agent: String,
    timeout: Option<Duration>,
    proxies: HashMap<String, String>,
    scraping: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            proxies: HashMap::new(),
            scraping: true,
        }
    }
}

impl ClientBuilder {
    /// Points the client at another Philomena instance.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        let host: String = host.into();
        self.host = host.trim_end_matches('/').to_string();
        self
    }

    /// Overrides the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Routes requests through proxies.
    ///
    /// Keys are `http`, `https` or `all`; values are proxy URLs.
    #[must_use]
    pub fn proxies(mut self, proxies: HashMap<String, String>) -> Self {
        self.proxies = proxies;
        self
    }

    /// Enables or disables the markup fallbacks.
    #[must_use]
    pub fn scraping(mut self, enabled: bool) -> Self {
        self.scraping = enabled;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownProxyScheme`] for an unknown
    /// proxy key, and propagates reqwest errors for malformed proxy URLs or
    /// TLS backend failures.
    pub fn build(self) -> Result<Client> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        for (scheme, url) in &self.proxies {
            let proxy = match scheme.as_str() {
                "http" => Proxy::http(url)?,
                "https" => Proxy::https(url)?,
                "all" => Proxy::all(url)?,
                other => return Err(ConfigurationError::UnknownProxyScheme(other.to_string()).into()),
            };
            builder = builder.proxy(proxy);
        }

        Ok(Client {
            http: builder.build()?,
            host: self.host,
            user_agent: self.user_agent,
            scraping: self.scraping,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_host() {
        let client = Client::builder()
            .host("https://trixiebooru.org/")
            .build()
            .unwrap();
        assert_eq!(client.host(), "https://trixiebooru.org");
    }

    #[test]
    fn unknown_proxy_scheme_is_rejected() {
        let proxies = HashMap::from([("socks".to_string(), "socks5://127.0.0.1:9050".to_string())]);
        let err = Client::builder().proxies(proxies).build().unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::UnknownProxyScheme(s)) if s == "socks"
        ));
    }

    #[test]
    fn scraping_can_be_disabled() {
        let client = Client::builder().scraping(false).build().unwrap();
        assert!(!client.scraping());
        assert!(Client::new().scraping());
    }
}
