//! Streaming support for server-sent completion responses

use super::error::{TransportError, TransportResult};
use crate::protocol::{ChatStreamChunk, StreamChunk};
use eventsource_stream::Eventsource;
use futures::future;
use futures::{Stream, StreamExt, TryStreamExt};
use std::fmt;
use std::pin::Pin;

/// Lazy, finite, non-restartable sequence of stream chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = TransportResult<StreamChunk>> + Send>>;

/// Sentinel data payload closing an OpenAI-style event stream
const DONE_MARKER: &str = "[DONE]";

/// Parse a Server-Sent Events byte stream into stream chunks
///
/// The stream ends at the `[DONE]` event or when the body ends, whichever
/// comes first. Events whose payload is not a valid chunk end the stream with
/// an error.
pub fn parse_stream<S, B, E>(stream: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let events = stream
        .eventsource()
        .try_filter(|event| future::ready(!event.data.trim().is_empty()))
        .take_while(|result| {
            let done = matches!(result, Ok(event) if event.data.trim() == DONE_MARKER);
            future::ready(!done)
        });

    Box::pin(events.map(|result| match result {
        Ok(event) => serde_json::from_str::<ChatStreamChunk>(&event.data)
            .map(StreamChunk::from)
            .map_err(|e| TransportError::Stream(format!("invalid chunk payload: {}", e))),
        Err(e) => Err(TransportError::Stream(e.to_string())),
    }))
}

/// Fold a chunk stream into the assembled completion text
///
/// Present fragments are appended in arrival order with no separator; chunks
/// without a fragment are skipped. The first error aborts the fold and no
/// partial text is returned.
pub async fn collect_fragments<S>(stream: S) -> TransportResult<String>
where
    S: Stream<Item = TransportResult<StreamChunk>>,
{
    stream
        .try_fold(String::new(), |mut text, chunk| async move {
            if let Some(fragment) = chunk.fragment {
                text.push_str(&fragment);
            }
            Ok(text)
        })
        .await
}
