pub mod event_stream;

pub use event_stream::DATA_PREFIX;
pub use event_stream::DONE_SENTINEL;
pub use event_stream::EVENT_STREAM_CONTENT_TYPE;
pub use event_stream::event_stream;
pub use event_stream::ingest;
