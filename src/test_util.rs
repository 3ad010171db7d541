use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use crate::{
    client::{ApiRequest, Transport},
    error::Error,
    result::Result,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};

/// Scripted backend: answers JSON requests in order and records them.
///
/// Once the script runs out every request gets a 404.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<Value>>>,
    pages: HashMap<String, String>,
    requests: Mutex<Vec<ApiRequest>>,
    page_requests: Mutex<Vec<String>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// One response per entry of `sizes`, each holding that many `{"id": n}` items.
    pub(crate) fn with_pages(key: &str, sizes: &[usize]) -> Self {
        let mut next_id = 1;
        let mut mock = Self::new();
        for &size in sizes {
            let items: Vec<Value> = (next_id..next_id + size).map(|id| json!({ "id": id })).collect();
            next_id += size;
            let mut body = Map::new();
            body.insert(key.to_string(), Value::Array(items));
            mock = mock.push_json(Value::Object(body));
        }
        mock
    }

    pub(crate) fn push_json(self, body: Value) -> Self {
        self.responses.lock().unwrap().push_back(Ok(body));
        self
    }

    pub(crate) fn push_status(self, status: StatusCode) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(Error::UnexpectedStatus(status)));
        self
    }

    pub(crate) fn push_error(self, error: Error) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn with_html(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn page_requests(&self) -> Vec<String> {
        self.page_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_json(&self, request: &ApiRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(Error::UnexpectedStatus(StatusCode::NOT_FOUND)))
    }

    async fn fetch_html(&self, url: &str) -> Result<Option<String>> {
        self.page_requests.lock().unwrap().push(url.to_string());
        Ok(self.pages.get(url).cloned())
    }
}
