//! Repository-qualified resource addresses.

use std::fmt;

/// The canonical remote addressing unit.
///
/// `revision` is a symbolic ref (branch, tag) or the empty string when the
/// document was opened without one. It is never absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoResourceAddress {
    pub repository_name: String,
    pub revision: String,
    pub file_path: String,
}

impl RepoResourceAddress {
    pub fn new(
        repository_name: impl Into<String>,
        revision: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            repository_name: repository_name.into(),
            revision: revision.into(),
            file_path: file_path.into(),
        }
    }
}

impl fmt::Display for RepoResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.revision.is_empty() {
            write!(f, "{}/{}", self.repository_name, self.file_path)
        } else {
            write!(
                f,
                "{}@{}/{}",
                self.repository_name, self.revision, self.file_path
            )
        }
    }
}

/// A result address that may carry the exact commit it was computed against.
///
/// Results navigate to the commit when it is known so that the target stays
/// reproducible after the symbolic revision moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinnedRepoResourceAddress {
    pub repository_name: String,
    pub commit_id: Option<String>,
    pub revision: Option<String>,
    pub file_path: String,
}

impl PinnedRepoResourceAddress {
    /// The revision to show the user: `commit_id`, else `revision`, else `""`.
    pub fn pinned_revision(&self) -> &str {
        self.commit_id
            .as_deref()
            .or(self.revision.as_deref())
            .unwrap_or("")
    }

    /// Collapse into a plain address using [`Self::pinned_revision`].
    pub fn resolve(&self) -> RepoResourceAddress {
        RepoResourceAddress {
            repository_name: self.repository_name.clone(),
            revision: self.pinned_revision().to_string(),
            file_path: self.file_path.clone(),
        }
    }
}
