use crate::common::MessageStream;
use crate::common::RemoteMessage;
use crate::error::ApiError;
use bytes::BytesMut;
use chatline_async_utils::CancelErr;
use chatline_async_utils::OrCancelExt;
use chatline_client::ByteStream;
use chatline_client::StreamResponse;
use futures::Stream;
use futures::StreamExt;
use futures::TryStreamExt;
use http::HeaderMap;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Validates a streaming response and turns its body into a [`MessageStream`].
///
/// Fails before yielding anything when the body is missing, the status is
/// not a success, or the server did not answer with an event stream. In the
/// last case the body is read as JSON to recover the server's error message.
pub async fn ingest(
    response: StreamResponse,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> Result<MessageStream, ApiError> {
    let StreamResponse {
        status,
        headers,
        bytes,
    } = response;

    let Some(bytes) = bytes else {
        return Err(ApiError::EmptyBody);
    };
    if !status.is_success() {
        return Err(ApiError::http_status(status));
    }
    if !is_event_stream(&headers) {
        let body = read_body(bytes, &cancel).await?;
        return Err(ApiError::NonStreamingResponse {
            server_message: server_error_message(&body),
        });
    }

    Ok(MessageStream::new(
        event_stream(bytes, idle_timeout, cancel).boxed(),
    ))
}

/// Decodes `data: ` lines from a raw byte stream.
///
/// Chunk boundaries are irrelevant: bytes after the last newline are carried
/// over to the next chunk. The stream ends at the `[DONE]` sentinel, at the
/// end of the body, or right after yielding the first error.
pub fn event_stream(
    mut bytes: ByteStream,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<RemoteMessage, ApiError>> + Send + 'static {
    async_stream::stream! {
        let mut cursor = StreamCursor::default();
        loop {
            let read = timeout(idle_timeout, bytes.next()).or_cancel(&cancel).await;
            let finished = match read {
                Err(CancelErr::Cancelled) => {
                    debug!("event stream cancelled");
                    yield Err(ApiError::Cancelled);
                    return;
                }
                Ok(Err(_)) => {
                    yield Err(ApiError::IdleTimeout);
                    return;
                }
                Ok(Ok(Some(Err(err)))) => {
                    yield Err(ApiError::from(err));
                    return;
                }
                Ok(Ok(Some(Ok(chunk)))) => {
                    cursor.push(&chunk);
                    false
                }
                Ok(Ok(None)) => {
                    cursor.finish();
                    true
                }
            };

            while let Some(line) = cursor.next_line() {
                match parse_line(&line) {
                    Ok(Line::Ignored) => {}
                    Ok(Line::Done) => return,
                    Ok(Line::Message(message)) => yield Ok(message),
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }

            if finished {
                return;
            }
        }
    }
}

/// Carry-over state of one ingestion: bytes received after the last newline.
#[derive(Debug, Default)]
pub(crate) struct StreamCursor {
    buf: BytesMut,
}

impl StreamCursor {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Splits off the next complete line, without its `\n`.
    pub(crate) fn next_line(&mut self) -> Option<BytesMut> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        Some(line)
    }

    /// End of input: an unterminated tail becomes the final line.
    pub(crate) fn finish(&mut self) {
        if !self.buf.is_empty() {
            self.buf.extend_from_slice(b"\n");
        }
    }
}

#[derive(Debug)]
enum Line {
    Ignored,
    Done,
    Message(RemoteMessage),
}

fn parse_line(line: &[u8]) -> Result<Line, ApiError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX.as_bytes()) else {
        return Ok(Line::Ignored);
    };
    let payload = std::str::from_utf8(payload).map_err(|err| ApiError::MalformedEvent {
        line: String::from_utf8_lossy(payload).into_owned(),
        reason: err.to_string(),
    })?;
    let payload = payload.trim();
    trace!("SSE event: {payload}");

    if payload == DONE_SENTINEL {
        return Ok(Line::Done);
    }
    serde_json::from_str(payload)
        .map(Line::Message)
        .map_err(|err| ApiError::MalformedEvent {
            line: payload.to_string(),
            reason: err.to_string(),
        })
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(EVENT_STREAM_CONTENT_TYPE))
}

async fn read_body(bytes: ByteStream, cancel: &CancellationToken) -> Result<Vec<u8>, ApiError> {
    let chunks: Vec<bytes::Bytes> = bytes
        .try_collect::<Vec<_>>()
        .or_cancel(cancel)
        .await
        .map_err(|CancelErr::Cancelled| ApiError::Cancelled)??;
    Ok(chunks.concat())
}

/// Extracts `error` (or `error.message`) from a JSON error body, falling back
/// to the raw text.
fn server_error_message(body: &[u8]) -> String {
    let value = serde_json::from_slice::<serde_json::Value>(body).ok();
    let error = value.as_ref().and_then(|value| value.get("error"));
    let message = error.and_then(|error| {
        error
            .as_str()
            .or_else(|| error.get("message").and_then(|m| m.as_str()))
    });
    match message {
        Some(message) => message.to_string(),
        None => String::from_utf8_lossy(body).trim().to_string(),
    }
}
