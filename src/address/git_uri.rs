//! Repository git URIs, the address form spoken by the remote service.
//!
//! Format: `git://{repository}[?{revision}][#{file path}]`, each component
//! percent-encoded per path segment.

use url::Url;

use super::{PinnedRepoResourceAddress, RepoResourceAddress, decode_component, encode_segments};
use crate::error::{BridgeError, BridgeResult};

const GIT_SCHEME: &str = "git";

/// Components of a parsed repository git URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRepoGitUri {
    pub repo_name: String,
    pub revision: Option<String>,
    /// Set when the revision is a full 40-character commit SHA.
    pub commit_id: Option<String>,
    pub file_path: Option<String>,
}

impl ParsedRepoGitUri {
    /// Convert into a result address, defaulting a missing path to `""`.
    pub fn into_pinned(self) -> PinnedRepoResourceAddress {
        PinnedRepoResourceAddress {
            repository_name: self.repo_name,
            commit_id: self.commit_id,
            revision: self.revision,
            file_path: self.file_path.unwrap_or_default(),
        }
    }
}

/// Build the git URI the remote service expects for a document.
pub fn make_repo_git_uri(resource: &RepoResourceAddress) -> String {
    let mut uri = format!("{GIT_SCHEME}://{}", encode_segments(&resource.repository_name));
    if !resource.revision.is_empty() {
        uri.push('?');
        uri.push_str(&encode_segments(&resource.revision));
    }
    if !resource.file_path.is_empty() {
        uri.push('#');
        uri.push_str(&encode_segments(&resource.file_path));
    }
    uri
}

/// Parse a git URI returned by the remote service.
pub fn parse_repo_git_uri(uri: &str) -> BridgeResult<ParsedRepoGitUri> {
    let url = Url::parse(uri).map_err(|e| BridgeError::malformed(uri, e.to_string()))?;

    if url.scheme() != GIT_SCHEME {
        return Err(BridgeError::malformed(
            uri,
            format!("expected {GIT_SCHEME}:// scheme, got {}:", url.scheme()),
        ));
    }

    let host = url.host_str().unwrap_or_default();
    if host.is_empty() {
        return Err(BridgeError::malformed(uri, "missing repository name"));
    }

    let decode = |raw: &str| {
        decode_component(raw)
            .ok_or_else(|| BridgeError::malformed(uri, "component is not valid UTF-8"))
    };

    let repo_name = decode(&format!("{host}{}", url.path().trim_end_matches('/')))?;

    let revision = match url.query().filter(|q| !q.is_empty()) {
        Some(raw) => Some(decode(raw)?),
        None => None,
    };
    let commit_id = revision.as_deref().filter(|r| is_commit_id(r)).map(str::to_string);

    let file_path = match url.fragment().filter(|f| !f.is_empty()) {
        Some(raw) => Some(decode(raw)?),
        None => None,
    };

    Ok(ParsedRepoGitUri {
        repo_name,
        revision,
        commit_id,
        file_path,
    })
}

fn is_commit_id(revision: &str) -> bool {
    revision.len() == 40 && revision.bytes().all(|b| b.is_ascii_hexdigit())
}
