//! Bidirectional translation between editor documents and repository addresses.

use tower_lsp_server::ls_types::{Location, Range, Uri};

use super::{PinnedRepoResourceAddress, RepoFileSystem, RepoResourceAddress, VirtualDocumentAddress};
use crate::error::BridgeResult;

/// Pure address translator over a filesystem grammar.
///
/// Holds no mutable state, so a single instance can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct AddressTranslator<F> {
    fs: F,
}

impl<F: RepoFileSystem> AddressTranslator<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    /// Editor document URI to repository address.
    ///
    /// Fails with `MalformedAddress` when the URI does not follow the
    /// filesystem's grammar.
    pub fn to_repo_resource_address(&self, document: &Uri) -> BridgeResult<RepoResourceAddress> {
        let address = VirtualDocumentAddress::from_lsp_uri(document)?;
        self.fs.parse_address(&address)
    }

    /// Result address to an editor location, pinned to the commit when known.
    pub fn to_editor_location(
        &self,
        address: &PinnedRepoResourceAddress,
        range: Range,
    ) -> BridgeResult<Location> {
        let uri = self.fs.format_address(&address.resolve()).to_lsp_uri()?;
        Ok(Location { uri, range })
    }
}
