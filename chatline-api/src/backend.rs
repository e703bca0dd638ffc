use crate::auth::ApiKeyAuth;
use crate::config::BackendConfig;
use crate::endpoint::LoadClient;
use crate::endpoint::MessagesClient;
use crate::endpoint::RunsClient;
use crate::endpoint::ThreadsClient;
use crate::history::ThreadHistorySync;
use crate::id_resolver::IdResolver;
use crate::local::LocalBackend;
use crate::provider::Provider;
use crate::services::LoadApi;
use crate::services::MessagesApi;
use crate::services::RunsApi;
use crate::services::ThreadsApi;
use crate::thread::ThreadHandle;
use crate::thread_list::ThreadDescriptor;
use crate::thread_list::ThreadListAdapter;
use crate::thread_list::ThreadListOptions;
use chatline_client::HttpTransport;
use chatline_client::ReqwestTransport;
use std::sync::Arc;
use tracing::info;

/// The service implementations one client session talks to, plus the id
/// table every thread and message of that session shares.
#[derive(Clone)]
pub struct Backend {
    threads: Arc<dyn ThreadsApi>,
    messages: Arc<dyn MessagesApi>,
    runs: Arc<dyn RunsApi>,
    load: Arc<dyn LoadApi>,
    resolver: IdResolver,
    local: bool,
}

impl Backend {
    /// HTTP clients when a base URL is configured, the in-memory backend
    /// with its fixture threads otherwise.
    pub fn from_config(config: &BackendConfig) -> Self {
        match Provider::from_config(config) {
            Some(provider) => {
                info!(base_url = %provider.base_url, "using remote conversation service");
                Self::remote(
                    ReqwestTransport::new(reqwest::Client::new()),
                    provider,
                    ApiKeyAuth::new(config.api_key.clone()),
                )
            }
            None => {
                info!("no backend base URL configured; using local fixture threads");
                Self::local(LocalBackend::with_fixture_threads())
            }
        }
    }

    pub fn remote<T>(transport: T, provider: Provider, auth: ApiKeyAuth) -> Self
    where
        T: HttpTransport + Clone + 'static,
    {
        Self {
            threads: Arc::new(ThreadsClient::new(
                transport.clone(),
                provider.clone(),
                auth.clone(),
            )),
            messages: Arc::new(MessagesClient::new(
                transport.clone(),
                provider.clone(),
                auth.clone(),
            )),
            runs: Arc::new(RunsClient::new(
                transport.clone(),
                provider.clone(),
                auth.clone(),
            )),
            load: Arc::new(LoadClient::new(transport, provider, auth)),
            resolver: IdResolver::new(),
            local: false,
        }
    }

    pub fn local(backend: LocalBackend) -> Self {
        let backend = Arc::new(backend);
        Self {
            threads: Arc::clone(&backend) as Arc<dyn ThreadsApi>,
            messages: Arc::clone(&backend) as Arc<dyn MessagesApi>,
            runs: Arc::clone(&backend) as Arc<dyn RunsApi>,
            load: backend,
            resolver: IdResolver::new(),
            local: true,
        }
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn resolver(&self) -> &IdResolver {
        &self.resolver
    }

    pub fn loader(&self) -> Arc<dyn LoadApi> {
        Arc::clone(&self.load)
    }

    pub fn thread_list(&self, options: ThreadListOptions) -> ThreadListAdapter {
        ThreadListAdapter::new(Arc::clone(&self.threads), Arc::clone(&self.runs), options)
    }

    pub fn new_thread(&self, adapter: &ThreadListAdapter) -> ThreadHandle {
        ThreadHandle::new(adapter.clone(), self.resolver.clone())
    }

    pub fn open_thread(
        &self,
        adapter: &ThreadListAdapter,
        descriptor: &ThreadDescriptor,
    ) -> ThreadHandle {
        ThreadHandle::existing(adapter.clone(), self.resolver.clone(), descriptor)
    }

    pub fn history(&self, thread: &ThreadHandle) -> ThreadHistorySync {
        ThreadHistorySync::new(thread.clone(), Arc::clone(&self.messages))
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::LocalMessageRecord;
    use crate::common::Role;
    use crate::common::ThreadMessage;
    use pretty_assertions::assert_eq;

    #[test]
    fn picks_backend_from_base_url() {
        assert!(Backend::from_config(&BackendConfig::default()).is_local());
        let remote = BackendConfig::default().with_base_url("http://127.0.0.1:9");
        assert!(!Backend::from_config(&remote).is_local());
    }

    #[tokio::test]
    async fn local_session_round_trips_history() {
        let backend = Backend::from_config(&BackendConfig::default());
        let adapter = backend.thread_list(ThreadListOptions::default());
        let thread = backend.new_thread(&adapter);
        let history = backend.history(&thread);

        history
            .append(LocalMessageRecord::new(
                None,
                ThreadMessage::text("local-1", Role::User, "hello"),
            ))
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        history
            .append(LocalMessageRecord::new(
                Some("local-1".to_string()),
                ThreadMessage::text("local-2", Role::Assistant, "hi there"),
            ))
            .await
            .unwrap_or_else(|err| panic!("{err}"));

        let loaded = history.load().await.unwrap_or_else(|err| panic!("{err}"));
        let texts: Vec<_> = loaded
            .messages
            .iter()
            .map(|m| m.message.text_content())
            .collect();
        assert_eq!(texts, vec!["hello", "hi there"]);
        assert_eq!(
            loaded.messages[1].parent_id,
            Some(loaded.messages[0].message.id.clone())
        );

        let listed = adapter.list().await.unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(listed.threads.len(), 3);
    }
}
