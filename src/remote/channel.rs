//! The seam between the definition bridge and a concrete remote transport.

use std::future::Future;
use std::pin::Pin;

use futures::Stream;

use super::{CallEnvelope, DefinitionQuery, ScopedProxy};
use crate::error::BridgeResult;

/// Emissions of one remote call, in order.
pub type EnvelopeStream = Pin<Box<dyn Stream<Item = BridgeResult<CallEnvelope>> + Send>>;

/// A connection to the remote code-intelligence service.
pub trait RemoteChannel: Send + Sync + 'static {
    /// Start a definition query and hand back its result stream.
    ///
    /// The returned proxy owns the remote handle backing the stream; dropping
    /// or releasing it tells the remote to discard the handle. Fails with
    /// `ChannelUnavailable` when the service cannot be reached or refuses the
    /// call, in which case no handle exists and nothing needs releasing.
    fn open_definition(
        &self,
        query: DefinitionQuery,
    ) -> impl Future<Output = BridgeResult<ScopedProxy<EnvelopeStream>>> + Send;
}
