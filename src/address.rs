//! Address translation between editor URIs and repository addresses.
//!
//! Three forms of the same location exist:
//!
//! - `VirtualDocumentAddress`: what the editor holds
//!   (`repolink://sourcegraph.com/github.com/foo/bar@main/-/blob/src/lib.rs`)
//! - `RepoResourceAddress`: the structured `{repository, revision, path}` triple
//! - the repository git URI sent to the remote service
//!   (`git://github.com/foo/bar?main#src/lib.rs`)
//!
//! Everything here is pure value conversion: no I/O and no shared state.

mod git_uri;
mod repo_resource;
mod translator;
mod virtual_document;

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

pub use git_uri::{ParsedRepoGitUri, make_repo_git_uri, parse_repo_git_uri};
pub use repo_resource::{PinnedRepoResourceAddress, RepoResourceAddress};
pub use translator::AddressTranslator;
pub use virtual_document::{
    DEFAULT_AUTHORITY, DEFAULT_SCHEME, RepoFileSystem, RepoUriScheme, VirtualDocumentAddress,
};

/// Characters left unescaped inside a single path segment.
///
/// Matches `encodeURIComponent`, which is what the remote service uses when it
/// produces repository URIs.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode each `/`-separated segment, keeping the separators.
fn encode_segments(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-decode a URI component. `None` if the bytes are not UTF-8.
fn decode_component(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}
