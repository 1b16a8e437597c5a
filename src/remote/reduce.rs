//! Reduction of a remote call's envelope stream to a single answer.

use futures::{Stream, StreamExt};

use super::{CallEnvelope, RemoteLocation};
use crate::error::BridgeResult;

/// Wait for the first non-loading envelope and return its locations.
///
/// Loading envelopes are skipped. Nothing after the terminal envelope is
/// pulled from the stream. A terminal envelope without a result, or a stream
/// that completes before producing one, yields an empty list.
pub async fn reduce_to_first_result<S>(mut stream: S) -> BridgeResult<Vec<RemoteLocation>>
where
    S: Stream<Item = BridgeResult<CallEnvelope>> + Unpin,
{
    let mut loading = 0usize;

    while let Some(envelope) = stream.next().await {
        let envelope = envelope?;
        if envelope.is_loading {
            loading += 1;
            continue;
        }
        log::trace!(
            target: "repolink::remote::reduce",
            "First result after {} loading envelope(s)",
            loading
        );
        return Ok(envelope.result.unwrap_or_default());
    }

    log::warn!(
        target: "repolink::remote::reduce",
        "Result stream completed without a terminal envelope ({} loading envelope(s) seen)",
        loading
    );
    Ok(Vec::new())
}
