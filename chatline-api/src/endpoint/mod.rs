pub mod load;
pub mod messages;
pub mod runs;
pub(crate) mod session;
pub mod threads;

pub use load::LoadClient;
pub use messages::MessagesClient;
pub use runs::RunsClient;
pub use threads::ThreadsClient;
