use crate::auth::AuthProvider;
use crate::common::MessageStream;
use crate::endpoint::session::EndpointSession;
use crate::endpoint::session::to_body;
use crate::error::Result;
use crate::provider::Provider;
use crate::requests::build_chat_headers;
use crate::services::LoadApi;
use async_trait::async_trait;
use chatline_client::HttpTransport;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadRequest<'a> {
    chat_id: &'a str,
    message: &'a str,
}

/// Sends a user message for a chat and streams the service's reply.
pub struct LoadClient<T: HttpTransport, A: AuthProvider> {
    session: EndpointSession<T, A>,
}

impl<T: HttpTransport, A: AuthProvider> LoadClient<T, A> {
    pub fn new(transport: T, provider: Provider, auth: A) -> Self {
        Self {
            session: EndpointSession::new(transport, provider, auth),
        }
    }
}

#[async_trait]
impl<T: HttpTransport, A: AuthProvider> LoadApi for LoadClient<T, A> {
    #[instrument(name = "load", level = "debug", skip(self, message, cancel))]
    async fn load_chat_message(
        &self,
        chat_id: &str,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<MessageStream> {
        let body = to_body(&LoadRequest { chat_id, message })?;
        self.session
            .stream("v1/load", build_chat_headers(Some(chat_id)), body, cancel)
            .await
    }
}
