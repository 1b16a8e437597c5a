//! Remote code-intelligence service access.
//!
//! # Module Structure
//!
//! - `envelope` - wire types: queries, `CallEnvelope` emissions, remote locations
//! - `proxy` - scoped acquisition of remote handles (`with_remote_handle`)
//! - `reduce` - reduction of an envelope stream to its first result
//! - `channel` - the `RemoteChannel` seam the orchestrator calls through
//! - `rpc` - JSON-RPC implementation of `RemoteChannel` over a child process

mod channel;
mod envelope;
mod proxy;
mod reduce;
pub mod rpc;

pub use channel::{EnvelopeStream, RemoteChannel};
pub use envelope::{CallEnvelope, DefinitionQuery, DocumentRef, QueryLocation, RemoteLocation};
pub use proxy::{ProxyId, ReleaseGuard, ScopedProxy, with_remote_handle};
pub use reduce::reduce_to_first_result;
pub use rpc::RpcChannel;
