use crate::auth::AuthProvider;
use crate::codec::StoredMessage;
use crate::endpoint::session::EndpointSession;
use crate::endpoint::session::to_body;
use crate::error::Result;
use crate::provider::Provider;
use crate::services::CreateMessageRequest;
use crate::services::CreateMessageResponse;
use crate::services::MessagesApi;
use async_trait::async_trait;
use chatline_client::HttpTransport;
use http::Method;
use serde::Deserialize;

pub struct MessagesClient<T: HttpTransport, A: AuthProvider> {
    session: EndpointSession<T, A>,
}

#[derive(Deserialize)]
struct MessageList {
    messages: Vec<StoredMessage>,
}

impl<T: HttpTransport, A: AuthProvider> MessagesClient<T, A> {
    pub fn new(transport: T, provider: Provider, auth: A) -> Self {
        Self {
            session: EndpointSession::new(transport, provider, auth),
        }
    }

    fn path(thread_id: &str) -> String {
        format!("v1/threads/{thread_id}/messages")
    }
}

#[async_trait]
impl<T: HttpTransport, A: AuthProvider> MessagesApi for MessagesClient<T, A> {
    async fn create(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> Result<CreateMessageResponse> {
        self.session
            .execute_json(
                "messages.create",
                Method::POST,
                &Self::path(thread_id),
                Some(to_body(&request)?),
            )
            .await
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<StoredMessage>> {
        let list: MessageList = self
            .session
            .execute_json("messages.list", Method::GET, &Self::path(thread_id), None)
            .await?;
        Ok(list.messages)
    }
}
