pub(crate) mod headers;

pub use headers::CHAT_ID_HEADER;
pub use headers::build_chat_headers;
