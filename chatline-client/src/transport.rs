use crate::default_client::ChatlineHttpClient;
use crate::default_client::ChatlineRequestBuilder;
use crate::error::TransportError;
use crate::request::Request;
use crate::request::Response;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use http::HeaderMap;
use http::Method;
use http::StatusCode;
use tracing::Level;
use tracing::enabled;
use tracing::trace;

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// A response whose body has not been read yet.
///
/// Unlike [`HttpTransport::execute`], streaming never turns a non-success
/// status into an error: the caller decides how to report status, missing
/// body and content type. `bytes` is `None` when the server sent no body.
pub struct StreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Option<ByteStream>,
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("has_body", &self.bytes.is_some())
            .finish()
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, req: Request) -> Result<Response, TransportError>;
    async fn stream(&self, req: Request) -> Result<StreamResponse, TransportError>;
}

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ChatlineHttpClient,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client: ChatlineHttpClient::new(client),
        }
    }

    fn build(&self, req: Request) -> ChatlineRequestBuilder {
        let Request {
            method,
            url,
            headers,
            body,
            timeout,
        } = req;

        let mut builder = self.client.request(method, &url);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let builder = builder.headers(headers);
        match body {
            Some(body) => builder.json(&body),
            None => builder,
        }
    }

    fn map_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Build(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }

    fn trace_request(req: &Request) {
        if enabled!(Level::TRACE) {
            trace!(
                "{} to {}: {}",
                req.method,
                req.url,
                req.body.as_ref().map(ToString::to_string).unwrap_or_default()
            );
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, req: Request) -> Result<Response, TransportError> {
        Self::trace_request(&req);

        let url = req.url.clone();
        let resp = self.build(req).send().await.map_err(Self::map_error)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(Self::map_error)?;
        if !status.is_success() {
            let body = String::from_utf8(bytes.to_vec()).ok();
            return Err(TransportError::Http {
                status,
                url: Some(url),
                headers: Some(headers),
                body,
            });
        }
        Ok(Response {
            status,
            headers,
            body: bytes,
        })
    }

    async fn stream(&self, req: Request) -> Result<StreamResponse, TransportError> {
        Self::trace_request(&req);

        let is_head = req.method == Method::HEAD;
        let resp = self.build(req).send().await.map_err(Self::map_error)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = if is_head || is_null_body_status(status) {
            None
        } else {
            let stream = resp
                .bytes_stream()
                .map(|result| result.map_err(Self::map_error));
            Some(Box::pin(stream) as ByteStream)
        };
        Ok(StreamResponse {
            status,
            headers,
            bytes,
        })
    }
}

/// Statuses that never carry a body. Any other status gets a stream, even
/// when it turns out to be empty.
fn is_null_body_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT | StatusCode::NOT_MODIFIED
    )
}
