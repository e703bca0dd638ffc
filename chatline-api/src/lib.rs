pub mod auth;
mod backend;
pub mod codec;
pub mod common;
pub mod config;
pub mod endpoint;
pub mod error;
mod history;
pub mod id_resolver;
pub mod local;
pub mod provider;
pub mod requests;
pub mod services;
pub mod sse;
mod thread;
mod thread_list;

pub use crate::auth::ApiKeyAuth;
pub use crate::auth::AuthProvider;
pub use crate::backend::Backend;
pub use crate::codec::AUI_V0_FORMAT;
pub use crate::codec::ExportedMessage;
pub use crate::codec::StoredMessage;
pub use crate::common::ContentPart;
pub use crate::common::LocalMessageRecord;
pub use crate::common::MessageStream;
pub use crate::common::MetricPayload;
pub use crate::common::RemoteMessage;
pub use crate::common::Role;
pub use crate::common::TextPayload;
pub use crate::common::ThreadMessage;
pub use crate::config::BackendConfig;
pub use crate::endpoint::LoadClient;
pub use crate::endpoint::MessagesClient;
pub use crate::endpoint::RunsClient;
pub use crate::endpoint::ThreadsClient;
pub use crate::error::ApiError;
pub use crate::error::Result;
pub use crate::history::HistoryPayload;
pub use crate::history::ThreadHistorySync;
pub use crate::id_resolver::IdResolver;
pub use crate::id_resolver::IdState;
pub use crate::local::LocalBackend;
pub use crate::provider::Provider;
pub use crate::services::LoadApi;
pub use crate::services::MessagesApi;
pub use crate::services::RunsApi;
pub use crate::services::ThreadsApi;
pub use crate::thread::ThreadHandle;
pub use crate::thread::ThreadState;
pub use crate::thread_list::InitializeResult;
pub use crate::thread_list::TITLE_ASSISTANT_ID;
pub use crate::thread_list::ThreadDescriptor;
pub use crate::thread_list::ThreadLifecycleHooks;
pub use crate::thread_list::ThreadListAdapter;
pub use crate::thread_list::ThreadListOptions;
pub use crate::thread_list::ThreadListResponse;
pub use crate::thread_list::ThreadStatus;
