//! Editor-side addresses of repository-backed virtual documents.
//!
//! The virtual filesystem owns the address grammar. The bridge only consumes it
//! through [`RepoFileSystem`]; [`RepoUriScheme`] is the grammar used by the
//! repolink filesystem provider:
//!
//! `{scheme}://{authority}/{repository}[@{revision}]/-/blob/{file path}`

use tower_lsp_server::ls_types::Uri;
use url::Url;

use super::{RepoResourceAddress, decode_component, encode_segments};
use crate::error::{BridgeError, BridgeResult};

/// Default editor URI scheme for repository-backed documents.
pub const DEFAULT_SCHEME: &str = "repolink";

/// Default code host instance used when formatting result addresses.
pub const DEFAULT_AUTHORITY: &str = "sourcegraph.com";

/// Marks the end of the repository part of a virtual document path.
const VIEW_SEPARATOR: &str = "/-/";

/// The editor's handle for an open, remotely backed document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualDocumentAddress {
    pub scheme: String,
    pub authority: String,
    /// URI path, percent-encoded, starting with `/`.
    pub path: String,
}

impl VirtualDocumentAddress {
    /// Split a URI string into scheme, authority and path.
    pub fn parse(uri: &str) -> BridgeResult<Self> {
        let url = Url::parse(uri).map_err(|e| BridgeError::malformed(uri, e.to_string()))?;

        let host = url.host_str().unwrap_or_default();
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority,
            path: url.path().to_string(),
        })
    }

    pub fn from_lsp_uri(uri: &Uri) -> BridgeResult<Self> {
        Self::parse(uri.as_str())
    }

    pub fn to_uri_string(&self) -> String {
        format!("{}://{}{}", self.scheme, self.authority, self.path)
    }

    pub fn to_lsp_uri(&self) -> BridgeResult<Uri> {
        let uri = self.to_uri_string();
        uri.parse::<Uri>()
            .map_err(|e| BridgeError::malformed(&uri, e.to_string()))
    }
}

/// The virtual filesystem collaborator, authoritative for the address grammar.
pub trait RepoFileSystem: Send + Sync {
    /// Extract repository, revision and file path from an editor address.
    fn parse_address(&self, address: &VirtualDocumentAddress) -> BridgeResult<RepoResourceAddress>;

    /// Produce the editor address for a repository resource.
    fn format_address(&self, resource: &RepoResourceAddress) -> VirtualDocumentAddress;
}

/// Address grammar of the repolink virtual filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUriScheme {
    scheme: String,
    authority: String,
}

impl RepoUriScheme {
    pub fn new(scheme: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            authority: authority.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }
}

impl Default for RepoUriScheme {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME, DEFAULT_AUTHORITY)
    }
}

impl RepoFileSystem for RepoUriScheme {
    fn parse_address(&self, address: &VirtualDocumentAddress) -> BridgeResult<RepoResourceAddress> {
        let malformed = |reason: &str| BridgeError::malformed(address.to_uri_string(), reason);

        if address.scheme != self.scheme {
            return Err(malformed(&format!(
                "expected {}:// scheme, got {}:",
                self.scheme, address.scheme
            )));
        }

        let path = address.path.strip_prefix('/').unwrap_or(&address.path);
        let Some((repo_part, view)) = path.split_once(VIEW_SEPARATOR) else {
            return Err(malformed("missing /-/ view separator"));
        };
        let Some(file_part) = view
            .strip_prefix("blob/")
            .or_else(|| view.strip_prefix("tree/"))
        else {
            return Err(malformed("expected a blob or tree view"));
        };

        let (repo_raw, revision_raw) = split_revision(repo_part);
        let decode = |raw: &str| {
            decode_component(raw).ok_or_else(|| malformed("component is not valid UTF-8"))
        };

        let repository_name = decode(repo_raw)?;
        if repository_name.is_empty() {
            return Err(malformed("missing repository name"));
        }
        let file_path = decode(file_part)?;
        if file_path.is_empty() {
            return Err(malformed("missing file path"));
        }

        Ok(RepoResourceAddress {
            repository_name,
            revision: decode(revision_raw)?,
            file_path,
        })
    }

    fn format_address(&self, resource: &RepoResourceAddress) -> VirtualDocumentAddress {
        let mut path = format!("/{}", encode_segments(&resource.repository_name));
        if !resource.revision.is_empty() {
            path.push('@');
            path.push_str(&encode_segments(&resource.revision));
        }
        path.push_str(VIEW_SEPARATOR);
        path.push_str("blob/");
        path.push_str(&encode_segments(&resource.file_path));

        VirtualDocumentAddress {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path,
        }
    }
}

/// Split `repository[@revision]`, accepting the separator percent-encoded.
///
/// Editors that re-serialize URIs (VS Code among them) write `@` in paths as
/// `%40`.
fn split_revision(repo_part: &str) -> (&str, &str) {
    let literal = repo_part.find('@').map(|at| (at, 1));
    let encoded = repo_part
        .as_bytes()
        .windows(3)
        .position(|window| window == b"%40")
        .map(|at| (at, 3));

    match literal.into_iter().chain(encoded).min() {
        Some((at, len)) => (&repo_part[..at], &repo_part[at + len..]),
        None => (repo_part, ""),
    }
}
