use crate::codec;
use crate::codec::AUI_V0_FORMAT;
use crate::codec::ExportedMessage;
use crate::common::LocalMessageRecord;
use crate::error::Result;
use crate::id_resolver::IdResolver;
use crate::services::CreateMessageRequest;
use crate::services::MessagesApi;
use crate::thread::ThreadHandle;
use crate::thread::ThreadState;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// Thread history, oldest message first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPayload {
    pub messages: Vec<ExportedMessage>,
}

/// Persists the messages of one thread and reads them back.
#[derive(Clone)]
pub struct ThreadHistorySync {
    thread: ThreadHandle,
    messages: Arc<dyn MessagesApi>,
    resolver: IdResolver,
}

impl ThreadHistorySync {
    pub fn new(thread: ThreadHandle, messages: Arc<dyn MessagesApi>) -> Self {
        let resolver = thread.resolver().clone();
        Self {
            thread,
            messages,
            resolver,
        }
    }

    pub fn thread(&self) -> &ThreadHandle {
        &self.thread
    }

    /// Submits `record` to the service.
    ///
    /// The record's local id is registered when this is called, so a child
    /// appended right after its parent waits for the parent's remote id
    /// instead of racing ahead. Appending the same local id again returns the
    /// first submission's outcome without a second request. A deleted
    /// thread fails right away and registers nothing.
    pub fn append(&self, record: LocalMessageRecord) -> BoxFuture<'static, Result<()>> {
        if self.thread.state() == ThreadState::Deleted {
            return futures::future::ready(Err(self.thread.deleted())).boxed();
        }
        let this = self.clone();
        let local_id = record.local_id.clone();
        let submission = self
            .resolver
            .resolve_or_register(&local_id, move || async move { this.submit(record).await });
        submission.map(|result| result.map(|_| ())).boxed()
    }

    async fn submit(&self, record: LocalMessageRecord) -> Result<String> {
        let thread_id = self.thread.initialize().await?.remote_id;
        let parent_id = match &record.parent_local_id {
            Some(parent_local_id) => Some(self.resolver.resolve(parent_local_id).await?),
            None => None,
        };
        let content = codec::encode(&record.message)?;

        let created = self
            .messages
            .create(
                &thread_id,
                CreateMessageRequest {
                    parent_id,
                    format: AUI_V0_FORMAT.to_string(),
                    content,
                },
            )
            .await?;
        debug!(
            local_id = %record.local_id,
            remote_id = %created.message_id,
            %thread_id,
            "message appended"
        );
        Ok(created.message_id)
    }

    /// Reads the thread's stored messages. A thread that was never created
    /// remotely has an empty history and costs no request.
    pub async fn load(&self) -> Result<HistoryPayload> {
        if self.thread.state() == ThreadState::Deleted {
            return Err(self.thread.deleted());
        }
        let Some(thread_id) = self.thread.remote_id() else {
            return Ok(HistoryPayload::default());
        };

        let stored = self.messages.list(&thread_id).await?;
        let total = stored.len();
        let mut messages = stored
            .into_iter()
            .filter(codec::is_supported)
            .map(codec::decode)
            .collect::<Result<Vec<_>>>()?;
        let skipped = total - messages.len();
        if skipped > 0 {
            debug!(%thread_id, skipped, "skipped messages in unsupported formats");
        }

        messages.reverse();
        Ok(HistoryPayload { messages })
    }
}

impl std::fmt::Debug for ThreadHistorySync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadHistorySync")
            .field("thread", &self.thread.local_id())
            .finish_non_exhaustive()
    }
}
