//! Go-to-definition for repository-backed documents.
//!
//! [`DefinitionBridge`] composes the address translator, the scoped remote
//! handle and the stream reduction into one cancellable call:
//!
//! ```text
//! Idle -> Translating -> Awaiting -> Reducing -> TranslatingResult -> Done
//!   \__________\____________\__________\_______________\__-> Failed
//! ```
//!
//! Calls are independent. The bridge keeps no per-call state once a call
//! returns, and every remote handle a call acquires is released before the
//! call settles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tower_lsp_server::ls_types::{Location, Position, Uri};

use crate::address::{AddressTranslator, RepoFileSystem};
use crate::error::{BridgeError, BridgeResult};
use crate::remote::{
    CallEnvelope, EnvelopeStream, QueryLocation, RemoteChannel, RemoteLocation,
    reduce_to_first_result, with_remote_handle,
};

/// Progress of a single definition call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Translating,
    Awaiting,
    Reducing,
    TranslatingResult,
    Done,
    Failed,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Idle => "idle",
            CallState::Translating => "translating",
            CallState::Awaiting => "awaiting",
            CallState::Reducing => "reducing",
            CallState::TranslatingResult => "translating-result",
            CallState::Done => "done",
            CallState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Debug trace of one call's state transitions.
struct CallTrace {
    id: u64,
    state: CallState,
}

impl CallTrace {
    fn new(id: u64) -> Self {
        Self {
            id,
            state: CallState::Idle,
        }
    }

    fn advance(&mut self, next: CallState) {
        log::debug!(
            target: "repolink::definition",
            "call {}: {} -> {}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    fn fail(&mut self, error: &BridgeError) {
        log::debug!(
            target: "repolink::definition",
            "call {}: {} -> {} ({})",
            self.id,
            self.state,
            CallState::Failed,
            error
        );
        self.state = CallState::Failed;
    }
}

/// Resolves definitions by asking the remote code-intelligence service.
pub struct DefinitionBridge<C, F> {
    channel: Arc<C>,
    translator: AddressTranslator<F>,
    next_call_id: AtomicU64,
}

impl<C: RemoteChannel, F: RepoFileSystem> DefinitionBridge<C, F> {
    pub fn new(channel: Arc<C>, file_system: F) -> Self {
        Self {
            channel,
            translator: AddressTranslator::new(file_system),
            next_call_id: AtomicU64::new(1),
        }
    }

    pub fn translator(&self) -> &AddressTranslator<F> {
        &self.translator
    }

    /// Resolve the definition sites of the symbol at `position` in `document`.
    ///
    /// Settles with `Cancelled` as soon as `cancel` fires; the remote handle,
    /// if one was acquired, is released before this returns. No remote call is
    /// made when `cancel` has already fired or the document address is
    /// malformed.
    pub async fn resolve_definition(
        &self,
        document: &Uri,
        position: Position,
        cancel: &CancellationToken,
    ) -> BridgeResult<Vec<Location>> {
        let mut trace = CallTrace::new(self.next_call_id.fetch_add(1, Ordering::Relaxed));

        if cancel.is_cancelled() {
            trace.fail(&BridgeError::Cancelled);
            return Err(BridgeError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BridgeError::Cancelled),
            result = self.run(document, position, &mut trace) => result,
        };

        match &outcome {
            Ok(_) => trace.advance(CallState::Done),
            Err(e) => trace.fail(e),
        }
        outcome
    }

    async fn run(
        &self,
        document: &Uri,
        position: Position,
        trace: &mut CallTrace,
    ) -> BridgeResult<Vec<Location>> {
        trace.advance(CallState::Translating);
        let resource = self.translator.to_repo_resource_address(document)?;
        let query = QueryLocation::new(resource, position).to_query();

        trace.advance(CallState::Awaiting);
        let awaiting = &mut *trace;
        let remote_locations = with_remote_handle(self.channel.open_definition(query), |stream| {
            reduce_to_first_result(mark_terminal(stream, awaiting))
        })
        .await?;

        trace.advance(CallState::TranslatingResult);
        Ok(self.to_editor_locations(remote_locations))
    }

    /// Translate remote results, dropping any whose address cannot be parsed.
    fn to_editor_locations(&self, remote_locations: Vec<RemoteLocation>) -> Vec<Location> {
        remote_locations
            .into_iter()
            .filter_map(|remote| {
                let translated = remote
                    .address()
                    .and_then(|address| self.translator.to_editor_location(&address, remote.range));
                match translated {
                    Ok(location) => Some(location),
                    Err(e) => {
                        log::warn!(
                            target: "repolink::definition",
                            "Dropping remote location {}: {}",
                            remote.uri,
                            e
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Editor-facing variant of [`resolve_definition`](Self::resolve_definition).
    ///
    /// Remote failures become "no answer" (`Ok(None)`). Malformed document
    /// addresses and cancellation stay errors.
    pub async fn provide_definition(
        &self,
        document: &Uri,
        position: Position,
        cancel: &CancellationToken,
    ) -> BridgeResult<Option<Vec<Location>>> {
        match self.resolve_definition(document, position, cancel).await {
            Ok(locations) => Ok(Some(locations)),
            Err(e) if e.is_remote_failure() => {
                log::warn!(
                    target: "repolink::definition",
                    "No definition answer for {}: {}",
                    document.as_str(),
                    e
                );
                Ok(None)
            }
            Err(e @ BridgeError::MalformedAddress { .. }) => {
                log::error!(
                    target: "repolink::definition",
                    "Cannot resolve definition: {}",
                    e
                );
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

/// Advance `trace` to `Reducing` when the terminal envelope arrives.
fn mark_terminal<'a>(
    stream: EnvelopeStream,
    trace: &'a mut CallTrace,
) -> impl Stream<Item = BridgeResult<CallEnvelope>> + Unpin + 'a {
    stream.inspect(move |envelope| {
        if matches!(envelope, Ok(e) if !e.is_loading) && trace.state == CallState::Awaiting {
            trace.advance(CallState::Reducing);
        }
    })
}
