//! Wire types exchanged with the remote code-intelligence service.

use serde::{Deserialize, Serialize};
use tower_lsp_server::ls_types::{Position, Range};

use crate::address::{
    PinnedRepoResourceAddress, RepoResourceAddress, make_repo_git_uri, parse_repo_git_uri,
};
use crate::error::BridgeResult;

/// A zero-based position inside a repository document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLocation {
    pub document: RepoResourceAddress,
    pub line: u32,
    pub character: u32,
}

impl QueryLocation {
    pub fn new(document: RepoResourceAddress, position: Position) -> Self {
        Self {
            document,
            line: position.line,
            character: position.character,
        }
    }

    /// The `getDefinition` parameters for this location.
    pub fn to_query(&self) -> DefinitionQuery {
        DefinitionQuery {
            text_document: DocumentRef {
                uri: make_repo_git_uri(&self.document),
            },
            position: Position {
                line: self.line,
                character: self.character,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub uri: String,
}

/// Parameters of the remote `getDefinition` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionQuery {
    pub text_document: DocumentRef,
    pub position: Position,
}

/// One candidate definition site, addressed by repository git URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub uri: String,
    pub range: Range,
}

impl RemoteLocation {
    pub fn address(&self) -> BridgeResult<PinnedRepoResourceAddress> {
        parse_repo_git_uri(&self.uri).map(|parsed| parsed.into_pinned())
    }
}

/// One emission of the remote call's result stream.
///
/// `result` is only meaningful when `is_loading` is false. A terminal envelope
/// with a missing or null result means "no definition found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEnvelope {
    pub is_loading: bool,
    #[serde(default)]
    pub result: Option<Vec<RemoteLocation>>,
}

impl CallEnvelope {
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            result: None,
        }
    }

    pub fn done(result: Vec<RemoteLocation>) -> Self {
        Self {
            is_loading: false,
            result: Some(result),
        }
    }
}
