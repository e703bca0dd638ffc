use crate::auth::AuthProvider;
use crate::common::MessageStream;
use crate::endpoint::session::EndpointSession;
use crate::endpoint::session::to_body;
use crate::error::Result;
use crate::provider::Provider;
use crate::services::RunStreamRequest;
use crate::services::RunsApi;
use async_trait::async_trait;
use chatline_client::HttpTransport;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub struct RunsClient<T: HttpTransport, A: AuthProvider> {
    session: EndpointSession<T, A>,
}

impl<T: HttpTransport, A: AuthProvider> RunsClient<T, A> {
    pub fn new(transport: T, provider: Provider, auth: A) -> Self {
        Self {
            session: EndpointSession::new(transport, provider, auth),
        }
    }
}

#[async_trait]
impl<T: HttpTransport, A: AuthProvider> RunsApi for RunsClient<T, A> {
    #[instrument(
        name = "runs.stream",
        level = "debug",
        skip_all,
        fields(thread_id = %request.thread_id, assistant_id = %request.assistant_id)
    )]
    async fn stream(
        &self,
        request: RunStreamRequest,
        cancel: CancellationToken,
    ) -> Result<MessageStream> {
        self.session
            .stream("v1/runs/stream", HeaderMap::new(), to_body(&request)?, cancel)
            .await
    }
}
