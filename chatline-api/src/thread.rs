use crate::error::ApiError;
use crate::error::Result;
use crate::id_resolver::IdResolver;
use crate::id_resolver::IdState;
use crate::thread_list::InitializeResult;
use crate::thread_list::ThreadDescriptor;
use crate::thread_list::ThreadListAdapter;
use crate::thread_list::ThreadStatus;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Uninitialized,
    Initializing,
    Ready,
    Archived,
    Deleted,
}

#[derive(Debug)]
struct HandleState {
    state: ThreadState,
    external_id: Option<String>,
}

/// One conversation thread as the client sees it.
///
/// A new handle has only a local id. The remote thread is created on the
/// first [`ThreadHandle::initialize`] and that creation happens at most once
/// per handle, however many callers race on it. After a delete every
/// operation fails with [`ApiError::ThreadDeleted`].
#[derive(Debug, Clone)]
pub struct ThreadHandle {
    local_id: String,
    adapter: ThreadListAdapter,
    resolver: IdResolver,
    inner: Arc<Mutex<HandleState>>,
}

impl ThreadHandle {
    pub fn new(adapter: ThreadListAdapter, resolver: IdResolver) -> Self {
        Self {
            local_id: format!("local-thread-{}", Uuid::new_v4()),
            adapter,
            resolver,
            inner: Arc::new(Mutex::new(HandleState {
                state: ThreadState::Uninitialized,
                external_id: None,
            })),
        }
    }

    /// Handle for a thread that already exists remotely, e.g. one returned
    /// by [`ThreadListAdapter::list`]. Its local id is the remote id.
    pub fn existing(
        adapter: ThreadListAdapter,
        resolver: IdResolver,
        descriptor: &ThreadDescriptor,
    ) -> Self {
        resolver.register_resolved(&descriptor.remote_id, &descriptor.remote_id);
        let state = match descriptor.status {
            ThreadStatus::Regular => ThreadState::Ready,
            ThreadStatus::Archived => ThreadState::Archived,
        };
        Self {
            local_id: descriptor.remote_id.clone(),
            adapter,
            resolver,
            inner: Arc::new(Mutex::new(HandleState {
                state,
                external_id: descriptor.external_id.clone(),
            })),
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn state(&self) -> ThreadState {
        self.lock().state
    }

    pub fn external_id(&self) -> Option<String> {
        self.lock().external_id.clone()
    }

    /// The remote id, once creation has completed.
    pub fn remote_id(&self) -> Option<String> {
        match self.resolver.lookup(&self.local_id) {
            Some(IdState::Resolved(remote_id)) => Some(remote_id),
            _ => None,
        }
    }

    pub(crate) fn resolver(&self) -> &IdResolver {
        &self.resolver
    }

    /// Creates the remote thread if that has not happened yet and returns
    /// its identity. A failed creation is not retried.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let creation_failed = matches!(
            self.resolver.lookup(&self.local_id),
            Some(IdState::Failed(_))
        );
        {
            let mut inner = self.lock();
            match inner.state {
                ThreadState::Deleted => return Err(self.deleted()),
                // A failed creation is final; stay uninitialized and let the
                // resolver report the failure.
                ThreadState::Uninitialized if !creation_failed => {
                    inner.state = ThreadState::Initializing;
                }
                ThreadState::Uninitialized
                | ThreadState::Initializing
                | ThreadState::Ready
                | ThreadState::Archived => {}
            }
        }

        let adapter = self.adapter.clone();
        let inner = Arc::clone(&self.inner);
        let local_id = self.local_id.clone();
        let creation = self.resolver.resolve_or_register(&self.local_id, move || async move {
            let created = adapter.initialize(&local_id).await;
            let mut state = inner.lock().unwrap_or_else(PoisonError::into_inner);
            match created {
                Ok(created) => {
                    if state.state == ThreadState::Initializing {
                        state.state = ThreadState::Ready;
                    }
                    state.external_id = created.external_id;
                    Ok(created.remote_id)
                }
                Err(err) => {
                    if state.state == ThreadState::Initializing {
                        state.state = ThreadState::Uninitialized;
                    }
                    Err(err)
                }
            }
        });

        let remote_id = creation.await?;
        Ok(InitializeResult {
            external_id: self.external_id(),
            remote_id,
        })
    }

    pub async fn rename(&self, title: &str) -> Result<()> {
        let remote_id = self.initialize().await?.remote_id;
        self.adapter.rename(&remote_id, title).await
    }

    pub async fn archive(&self) -> Result<()> {
        let remote_id = self.initialize().await?.remote_id;
        self.adapter.archive(&remote_id).await?;
        self.transition(ThreadState::Ready, ThreadState::Archived);
        Ok(())
    }

    pub async fn unarchive(&self) -> Result<()> {
        let remote_id = self.initialize().await?.remote_id;
        self.adapter.unarchive(&remote_id).await?;
        self.transition(ThreadState::Archived, ThreadState::Ready);
        Ok(())
    }

    /// Deletes the thread. A thread that was never created remotely, or
    /// whose creation failed, is only marked deleted.
    pub async fn delete(&self) -> Result<()> {
        if self.state() == ThreadState::Deleted {
            return Err(self.deleted());
        }
        let remote_id = match self.resolver.lookup(&self.local_id) {
            None | Some(IdState::Failed(_)) => None,
            Some(IdState::Pending | IdState::Resolved(_)) => {
                Some(self.initialize().await?.remote_id)
            }
        };
        if let Some(remote_id) = remote_id {
            self.adapter.delete(&remote_id).await?;
        }
        self.lock().state = ThreadState::Deleted;
        debug!(local_id = %self.local_id, "thread deleted");
        Ok(())
    }

    fn transition(&self, from: ThreadState, to: ThreadState) {
        let mut inner = self.lock();
        if inner.state == from {
            inner.state = to;
        }
    }

    pub(crate) fn deleted(&self) -> ApiError {
        ApiError::ThreadDeleted {
            local_id: self.local_id.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HandleState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
