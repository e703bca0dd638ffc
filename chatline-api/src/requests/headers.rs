use http::HeaderMap;
use http::HeaderValue;

pub const CHAT_ID_HEADER: &str = "x-chat-id";

/// Headers correlating a streaming request with its chat.
pub fn build_chat_headers(chat_id: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(id) = chat_id {
        insert_header(&mut headers, CHAT_ID_HEADER, id);
    }
    headers
}

pub(crate) fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(header_name), Ok(header_value)) = (
        name.parse::<http::HeaderName>(),
        HeaderValue::from_str(value),
    ) {
        headers.insert(header_name, header_value);
    }
}
