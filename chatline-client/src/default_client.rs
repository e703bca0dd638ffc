use reqwest::IntoUrl;
use reqwest::Method;
use reqwest::Response;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Headers the service uses to correlate a request with server-side logs.
const CORRELATION_HEADERS: [&str; 3] = ["x-request-id", "x-chat-id", "cf-ray"];

#[derive(Clone, Debug)]
pub struct ChatlineHttpClient {
    inner: reqwest::Client,
}

impl ChatlineHttpClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    pub fn request<U>(&self, method: Method, url: U) -> ChatlineRequestBuilder
    where
        U: IntoUrl,
    {
        let url_str = url.as_str().to_string();
        ChatlineRequestBuilder {
            builder: self.inner.request(method.clone(), url),
            method,
            url: url_str,
        }
    }
}

#[must_use = "requests are not sent unless `send` is awaited"]
#[derive(Debug)]
pub struct ChatlineRequestBuilder {
    builder: reqwest::RequestBuilder,
    method: Method,
    url: String,
}

impl ChatlineRequestBuilder {
    fn map(self, f: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder) -> Self {
        Self {
            builder: f(self.builder),
            method: self.method,
            url: self.url,
        }
    }

    pub fn headers(self, headers: HeaderMap) -> Self {
        self.map(|builder| builder.headers(headers))
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|builder| builder.timeout(timeout))
    }

    pub fn json<T>(self, value: &T) -> Self
    where
        T: ?Sized + Serialize,
    {
        self.map(|builder| builder.json(value))
    }

    pub async fn send(self) -> Result<Response, reqwest::Error> {
        match self.builder.send().await {
            Ok(response) => {
                tracing::debug!(
                    method = %self.method,
                    url = %self.url,
                    status = %response.status(),
                    correlation = ?correlation_ids(response.headers()),
                    content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
                    "Request completed"
                );
                Ok(response)
            }
            Err(error) => {
                tracing::debug!(
                    method = %self.method,
                    url = %self.url,
                    status = error.status().map(|s| s.as_u16()),
                    error = %error,
                    "Request failed"
                );
                Err(error)
            }
        }
    }
}

fn correlation_ids(headers: &HeaderMap) -> HashMap<&'static str, String> {
    CORRELATION_HEADERS
        .iter()
        .filter_map(|&name| {
            let value = headers.get(HeaderName::from_static(name))?;
            Some((name, value.to_str().ok()?.to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderValue;

    #[test]
    fn correlation_ids_skip_missing_and_non_ascii_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-chat-id", HeaderValue::from_static("chat-1"));
        headers.insert(
            "x-request-id",
            HeaderValue::from_bytes(b"\xffbad").unwrap_or_else(|err| panic!("{err}")),
        );

        let ids = correlation_ids(&headers);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids.get("x-chat-id").map(String::as_str), Some("chat-1"));
    }
}
