use crate::auth::AuthProvider;
use crate::auth::add_auth_headers;
use crate::common::MessageStream;
use crate::error::ApiError;
use crate::error::Result;
use crate::provider::Provider;
use crate::sse::EVENT_STREAM_CONTENT_TYPE;
use crate::sse::ingest;
use chatline_async_utils::CancelErr;
use chatline_async_utils::OrCancelExt;
use chatline_client::HttpTransport;
use chatline_client::Request;
use chatline_client::Response;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub(crate) struct EndpointSession<T: HttpTransport, A: AuthProvider> {
    transport: T,
    provider: Provider,
    auth: A,
}

impl<T: HttpTransport, A: AuthProvider> EndpointSession<T, A> {
    pub(crate) fn new(transport: T, provider: Provider, auth: A) -> Self {
        Self {
            transport,
            provider,
            auth,
        }
    }

    fn make_request(
        &self,
        method: &Method,
        path: &str,
        extra_headers: &HeaderMap,
        body: Option<&Value>,
    ) -> Request {
        let mut req = self.provider.build_request(method.clone(), path);
        req.headers.extend(extra_headers.clone());
        if let Some(body) = body {
            req.headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            req.body = Some(body.clone());
        }
        add_auth_headers(&self.auth, req)
    }

    pub(crate) async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response> {
        let req = self.make_request(&method, path, &HeaderMap::new(), body.as_ref());
        Ok(self.transport.execute(req).await?)
    }

    pub(crate) async fn execute_json<R: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<R> {
        let response = self.execute(method, path, body).await?;
        serde_json::from_slice(&response.body)
            .map_err(|err| ApiError::invalid_response(endpoint, err))
    }

    /// POSTs `body` and ingests the event-stream reply. The token covers both
    /// the request itself and every subsequent chunk read.
    pub(crate) async fn stream(
        &self,
        path: &str,
        extra_headers: HeaderMap,
        body: Value,
        cancel: CancellationToken,
    ) -> Result<MessageStream> {
        let mut req = self.make_request(&Method::POST, path, &extra_headers, Some(&body));
        req.headers.insert(
            http::header::ACCEPT,
            HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE),
        );

        let response = self
            .transport
            .stream(req)
            .or_cancel(&cancel)
            .await
            .map_err(|CancelErr::Cancelled| ApiError::Cancelled)??;
        ingest(response, self.provider.stream_idle_timeout, cancel).await
    }
}

pub(crate) fn to_body<B: serde::Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|err| ApiError::Codec(err.to_string()))
}
