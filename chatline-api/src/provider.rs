use crate::config::BackendConfig;
use chatline_client::Request;
use http::Method;
use http::header::HeaderMap;
use std::time::Duration;

/// HTTP endpoint configuration for a concrete service deployment.
#[derive(Debug, Clone)]
pub struct Provider {
    pub base_url: String,
    pub headers: HeaderMap,
    pub stream_idle_timeout: Duration,
}

impl Provider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: HeaderMap::new(),
            stream_idle_timeout: crate::config::DEFAULT_STREAM_IDLE_TIMEOUT,
        }
    }

    /// Returns `None` when the config has no base URL.
    pub fn from_config(config: &BackendConfig) -> Option<Self> {
        let base_url = config.base_url.clone()?;
        Some(Self {
            base_url,
            headers: HeaderMap::new(),
            stream_idle_timeout: config.stream_idle_timeout,
        })
    }

    pub fn url_for_path(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn build_request(&self, method: Method, path: &str) -> Request {
        let mut req = Request::new(method, self.url_for_path(path));
        req.headers = self.headers.clone();
        req
    }
}
