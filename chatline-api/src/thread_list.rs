use crate::common::MessageStream;
use crate::common::ThreadMessage;
use crate::error::Result;
use crate::services::CoreMessage;
use crate::services::CreateThreadRequest;
use crate::services::RemoteThread;
use crate::services::RunStreamRequest;
use crate::services::RunsApi;
use crate::services::ThreadsApi;
use crate::services::UpdateThreadRequest;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Assistant the service reserves for title generation.
pub const TITLE_ASSISTANT_ID: &str = "system/thread_title";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Regular,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadDescriptor {
    pub remote_id: String,
    pub external_id: Option<String>,
    pub title: String,
    pub status: ThreadStatus,
}

impl From<RemoteThread> for ThreadDescriptor {
    fn from(thread: RemoteThread) -> Self {
        Self {
            remote_id: thread.id,
            external_id: thread.external_id,
            title: thread.title,
            status: if thread.is_archived {
                ThreadStatus::Archived
            } else {
                ThreadStatus::Regular
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThreadListResponse {
    pub threads: Vec<ThreadDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeResult {
    pub external_id: Option<String>,
    pub remote_id: String,
}

/// Local work wrapped around remote thread mutations.
///
/// Failures should be reported as [`crate::ApiError::LocalHook`]; they abort
/// the remote call that would have followed.
#[async_trait]
pub trait ThreadLifecycleHooks: Send + Sync {
    /// Runs before the remote thread is created. The returned id is stored
    /// with the thread as its external id.
    async fn before_create(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Local cleanup run before the remote delete.
    async fn before_delete(&self, _remote_id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct ThreadListOptions {
    pub hooks: Option<Arc<dyn ThreadLifecycleHooks>>,
}

impl ThreadListOptions {
    pub fn with_hooks(hooks: Arc<dyn ThreadLifecycleHooks>) -> Self {
        Self { hooks: Some(hooks) }
    }
}

/// Thread CRUD plus title generation against the conversation service.
#[derive(Clone)]
pub struct ThreadListAdapter {
    threads: Arc<dyn ThreadsApi>,
    runs: Arc<dyn RunsApi>,
    options: ThreadListOptions,
}

impl std::fmt::Debug for ThreadListAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadListAdapter")
            .field("hooks", &self.options.hooks.is_some())
            .finish_non_exhaustive()
    }
}

impl ThreadListAdapter {
    pub fn new(
        threads: Arc<dyn ThreadsApi>,
        runs: Arc<dyn RunsApi>,
        options: ThreadListOptions,
    ) -> Self {
        Self {
            threads,
            runs,
            options,
        }
    }

    pub async fn list(&self) -> Result<ThreadListResponse> {
        let threads = self.threads.list().await?;
        Ok(ThreadListResponse {
            threads: threads.into_iter().map(ThreadDescriptor::from).collect(),
        })
    }

    /// Creates the remote thread for the locally created `local_id`, first
    /// giving the `before_create` hook the chance to supply an external id.
    pub async fn initialize(&self, local_id: &str) -> Result<InitializeResult> {
        let external_id = match &self.options.hooks {
            Some(hooks) => hooks.before_create().await?,
            None => None,
        };
        let created = self
            .threads
            .create(CreateThreadRequest {
                last_message_at: Utc::now(),
                external_id: external_id.clone(),
            })
            .await?;
        debug!(%local_id, remote_id = %created.thread_id, ?external_id, "thread created");

        Ok(InitializeResult {
            external_id,
            remote_id: created.thread_id,
        })
    }

    pub async fn rename(&self, remote_id: &str, title: &str) -> Result<()> {
        self.threads
            .update(
                remote_id,
                UpdateThreadRequest {
                    title: Some(title.to_string()),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn archive(&self, remote_id: &str) -> Result<()> {
        self.set_archived(remote_id, true).await
    }

    pub async fn unarchive(&self, remote_id: &str) -> Result<()> {
        self.set_archived(remote_id, false).await
    }

    async fn set_archived(&self, remote_id: &str, is_archived: bool) -> Result<()> {
        self.threads
            .update(
                remote_id,
                UpdateThreadRequest {
                    is_archived: Some(is_archived),
                    ..Default::default()
                },
            )
            .await
    }

    /// Runs the `before_delete` hook, then deletes remotely. A failing hook
    /// leaves the remote thread untouched.
    pub async fn delete(&self, remote_id: &str) -> Result<()> {
        if let Some(hooks) = &self.options.hooks {
            hooks.before_delete(remote_id).await?;
        }
        self.threads.delete(remote_id).await
    }

    pub async fn generate_title(
        &self,
        remote_id: &str,
        messages: &[ThreadMessage],
        cancel: CancellationToken,
    ) -> Result<MessageStream> {
        self.runs
            .stream(
                RunStreamRequest {
                    thread_id: remote_id.to_string(),
                    assistant_id: TITLE_ASSISTANT_ID.to_string(),
                    messages: messages.iter().map(CoreMessage::from).collect(),
                },
                cancel,
            )
            .await
    }
}
