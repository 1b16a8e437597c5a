//! Remote go-to-definition for repository-backed editor documents.
//!
//! The editor asks for the definition of a symbol in a document whose content
//! lives in a remote repository. The request is translated to a repository
//! address, answered by a remote code-intelligence service over JSON-RPC, and
//! the answer is translated back into editor locations.

pub mod address;
pub mod config;
pub mod definition;
pub mod error;
pub mod lsp;
pub mod remote;

pub use definition::{CallState, DefinitionBridge};
pub use error::{BridgeError, BridgeResult};
pub use lsp::RepolinkServer;
