use crate::error::ApiError;
use crate::error::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::Weak;
use tracing::debug;
use tracing::warn;

type SharedResolution = Shared<BoxFuture<'static, std::result::Result<String, Arc<ApiError>>>>;
type Entries = Mutex<HashMap<String, IdEntry>>;

#[derive(Clone)]
enum IdEntry {
    Pending(SharedResolution),
    Resolved(String),
    Failed(Arc<ApiError>),
}

/// Snapshot of a mapping entry, see [`IdResolver::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdState {
    Pending,
    Resolved(String),
    Failed(String),
}

/// Maps locally minted ids to the ids the service assigned.
///
/// Each local id has at most one in-flight resolution: every caller that
/// needs the id awaits the same shared future, so the request behind it runs
/// once. Entries are never removed; a pending entry becomes `Resolved` or
/// `Failed` exactly once, at the moment its future completes.
#[derive(Clone, Default)]
pub struct IdResolver {
    entries: Arc<Entries>,
}

impl IdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resolved(&self, local_id: impl Into<String>, remote_id: impl Into<String>) {
        let local_id = local_id.into();
        let remote_id = remote_id.into();
        let mut entries = self.lock();
        match entries.get(&local_id) {
            Some(IdEntry::Resolved(existing)) if existing != &remote_id => {
                warn!(%local_id, %existing, %remote_id, "ignoring conflicting id registration");
            }
            Some(IdEntry::Failed(_)) => {
                warn!(%local_id, "ignoring registration for a failed id");
            }
            _ => {
                entries.insert(local_id, IdEntry::Resolved(remote_id));
            }
        }
    }

    /// Installs a pending resolution. When `local_id` already has an entry
    /// the existing resolution is kept and `resolution` is dropped unpolled.
    pub fn register_pending<F>(
        &self,
        local_id: impl Into<String>,
        resolution: F,
    ) -> BoxFuture<'static, Result<String>>
    where
        F: Future<Output = Result<String>> + Send + 'static,
    {
        let local_id = local_id.into();
        let entry = {
            let mut entries = self.lock();
            if entries.contains_key(&local_id) {
                warn!(%local_id, "id already registered; keeping the existing resolution");
            }
            self.entry_or_insert(&mut entries, &local_id, || resolution.boxed())
        };
        Self::wait_for(local_id, entry)
    }

    /// Returns the resolution for `local_id`, calling `make` to start one only
    /// when there is no entry yet.
    pub fn resolve_or_register<F, Fut>(
        &self,
        local_id: &str,
        make: F,
    ) -> BoxFuture<'static, Result<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let entry = {
            let mut entries = self.lock();
            self.entry_or_insert(&mut entries, local_id, || make().boxed())
        };
        Self::wait_for(local_id.to_string(), entry)
    }

    /// Resolves `local_id` to its remote id.
    ///
    /// The entry is looked up when this is called, not when the returned
    /// future is first polled. Ids with no entry are returned unchanged: they
    /// are taken to be remote ids already.
    pub fn resolve(&self, local_id: &str) -> BoxFuture<'static, Result<String>> {
        let entry = self.lock().get(local_id).cloned();
        match entry {
            Some(entry) => Self::wait_for(local_id.to_string(), entry),
            None => futures::future::ready(Ok(local_id.to_string())).boxed(),
        }
    }

    pub fn lookup(&self, local_id: &str) -> Option<IdState> {
        self.lock().get(local_id).map(|entry| match entry {
            IdEntry::Pending(_) => IdState::Pending,
            IdEntry::Resolved(remote_id) => IdState::Resolved(remote_id.clone()),
            IdEntry::Failed(err) => IdState::Failed(err.to_string()),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, IdEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry_or_insert(
        &self,
        entries: &mut HashMap<String, IdEntry>,
        local_id: &str,
        make: impl FnOnce() -> BoxFuture<'static, Result<String>>,
    ) -> IdEntry {
        if let Some(entry) = entries.get(local_id) {
            return entry.clone();
        }
        let entry = IdEntry::Pending(Self::settling(
            Arc::downgrade(&self.entries),
            local_id.to_string(),
            make(),
        ));
        entries.insert(local_id.to_string(), entry.clone());
        entry
    }

    /// Wraps `resolution` so the table entry is updated as soon as it
    /// completes, whichever awaiter happens to drive it.
    fn settling(
        entries: Weak<Entries>,
        local_id: String,
        resolution: BoxFuture<'static, Result<String>>,
    ) -> SharedResolution {
        async move {
            let result = resolution.await.map_err(Arc::new);
            if let Some(entries) = entries.upgrade() {
                let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
                if matches!(entries.get(&local_id), Some(IdEntry::Pending(_))) {
                    let settled = match &result {
                        Ok(remote_id) => {
                            debug!(%local_id, %remote_id, "id resolved");
                            IdEntry::Resolved(remote_id.clone())
                        }
                        Err(err) => {
                            warn!(%local_id, error = %err, "id resolution failed");
                            IdEntry::Failed(Arc::clone(err))
                        }
                    };
                    entries.insert(local_id, settled);
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    fn wait_for(local_id: String, entry: IdEntry) -> BoxFuture<'static, Result<String>> {
        async move {
            match entry {
                IdEntry::Resolved(remote_id) => Ok(remote_id),
                IdEntry::Failed(source) => Err(ApiError::ResolutionFailed { local_id, source }),
                IdEntry::Pending(resolution) => resolution
                    .await
                    .map_err(|source| ApiError::ResolutionFailed { local_id, source }),
            }
        }
        .boxed()
    }
}

impl std::fmt::Debug for IdResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdResolver")
            .field("entries", &self.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn unknown_id_resolves_to_itself() {
        let resolver = IdResolver::new();
        let id = resolver
            .resolve("remote-123")
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(id, "remote-123");
        assert_eq!(resolver.lookup("remote-123"), None);
    }

    #[tokio::test]
    async fn concurrent_resolutions_share_one_request() {
        let resolver = IdResolver::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<String>();
        let rx = rx.shared();

        let make = |calls: Arc<AtomicUsize>, rx: futures::future::Shared<oneshot::Receiver<String>>| {
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { rx.await.map_err(|err| ApiError::Codec(err.to_string())) }
            }
        };

        let first = resolver.resolve_or_register("local-1", make(Arc::clone(&calls), rx.clone()));
        let second = resolver.resolve_or_register("local-1", make(Arc::clone(&calls), rx.clone()));
        let third = resolver.resolve("local-1");
        assert_eq!(resolver.lookup("local-1"), Some(IdState::Pending));

        let _ = tx.send("remote-1".to_string());
        let (first, second, third) = tokio::join!(first, second, third);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in [first, second, third] {
            assert_eq!(result.unwrap_or_else(|err| panic!("{err}")), "remote-1");
        }
        assert_eq!(
            resolver.lookup("local-1"),
            Some(IdState::Resolved("remote-1".to_string()))
        );
    }

    #[tokio::test]
    async fn resolve_waits_for_pending_registration() {
        let resolver = IdResolver::new();
        let (tx, rx) = oneshot::channel::<String>();
        let _registration = resolver.register_pending("parent", async move {
            rx.await.map_err(|err| ApiError::Codec(err.to_string()))
        });

        let waiter = tokio::spawn(resolver.resolve("parent"));
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        let _ = tx.send("remote-parent".to_string());
        let id = waiter
            .await
            .unwrap_or_else(|err| panic!("join: {err}"))
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(id, "remote-parent");
    }

    #[tokio::test]
    async fn failure_reaches_every_waiter_and_is_not_retried() {
        let resolver = IdResolver::new();
        let registration = resolver.register_pending("local-9", async {
            Err(ApiError::LocalHook("create failed".to_string()))
        });
        let child = resolver.resolve("local-9");

        let (registration, child) = tokio::join!(registration, child);
        assert_matches!(registration, Err(ApiError::ResolutionFailed { ref local_id, .. }) if local_id == "local-9");
        assert_matches!(child, Err(ApiError::ResolutionFailed { source, .. })
            if matches!(*source, ApiError::LocalHook(_)));
        assert_matches!(resolver.lookup("local-9"), Some(IdState::Failed(_)));

        let calls = AtomicUsize::new(0);
        let retry = resolver.resolve_or_register("local-9", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok("never".to_string()) }
        });
        assert_matches!(retry.await, Err(ApiError::ResolutionFailed { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolved_values_are_not_overwritten() {
        let resolver = IdResolver::new();
        resolver.register_resolved("local-1", "remote-a");
        resolver.register_resolved("local-1", "remote-b");
        let _ignored = resolver.register_pending("local-1", async { Ok("remote-c".to_string()) });

        assert_eq!(
            resolver
                .resolve("local-1")
                .await
                .unwrap_or_else(|err| panic!("{err}")),
            "remote-a"
        );
    }
}
