use crate::auth::AuthProvider;
use crate::endpoint::session::EndpointSession;
use crate::endpoint::session::to_body;
use crate::error::Result;
use crate::provider::Provider;
use crate::services::CreateThreadRequest;
use crate::services::CreateThreadResponse;
use crate::services::RemoteThread;
use crate::services::ThreadsApi;
use crate::services::UpdateThreadRequest;
use async_trait::async_trait;
use chatline_client::HttpTransport;
use http::Method;
use serde::Deserialize;

const THREADS_PATH: &str = "v1/threads";

pub struct ThreadsClient<T: HttpTransport, A: AuthProvider> {
    session: EndpointSession<T, A>,
}

#[derive(Deserialize)]
struct ThreadList {
    threads: Vec<RemoteThread>,
}

impl<T: HttpTransport, A: AuthProvider> ThreadsClient<T, A> {
    pub fn new(transport: T, provider: Provider, auth: A) -> Self {
        Self {
            session: EndpointSession::new(transport, provider, auth),
        }
    }

    fn thread_path(thread_id: &str) -> String {
        format!("{THREADS_PATH}/{thread_id}")
    }
}

#[async_trait]
impl<T: HttpTransport, A: AuthProvider> ThreadsApi for ThreadsClient<T, A> {
    async fn create(&self, request: CreateThreadRequest) -> Result<CreateThreadResponse> {
        self.session
            .execute_json(
                "threads.create",
                Method::POST,
                THREADS_PATH,
                Some(to_body(&request)?),
            )
            .await
    }

    async fn update(&self, thread_id: &str, request: UpdateThreadRequest) -> Result<()> {
        self.session
            .execute(
                Method::PATCH,
                &Self::thread_path(thread_id),
                Some(to_body(&request)?),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        self.session
            .execute(Method::DELETE, &Self::thread_path(thread_id), None)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RemoteThread>> {
        let list: ThreadList = self
            .session
            .execute_json("threads.list", Method::GET, THREADS_PATH, None)
            .await?;
        Ok(list.threads)
    }
}
