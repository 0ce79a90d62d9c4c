//! Action references as they appear after `uses:` in a workflow file.

use crate::version::LooseVersion;
use std::fmt;

/// Length of a full git commit SHA-1 in hex.
pub const COMMIT_SHA_LEN: usize = 40;

/// An `owner/repo[/path]@ref` token.
///
/// `path` is the sub-directory (or workflow file) after the repository name,
/// without its leading slash. It plays no part in resolution: two references
/// that differ only in `path` resolve to the same commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionReference {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub ref_or_sha: String,
}

impl ActionReference {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        path: impl Into<String>,
        ref_or_sha: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: path.into(),
            ref_or_sha: ref_or_sha.into(),
        }
    }

    /// True when the ref is already a full commit SHA.
    pub fn has_commit_sha(&self) -> bool {
        is_commit_sha(&self.ref_or_sha)
    }

    /// Reusable workflows name a file, so the last path segment carries an
    /// extension (`.github/workflows/build.yml`). Composite actions point at a
    /// directory. A dot in an intermediate directory does not count.
    pub fn is_reusable_workflow(&self) -> bool {
        if self.path.is_empty() {
            return false;
        }
        self.path
            .rsplit('/')
            .next()
            .is_some_and(|last| last.contains('.'))
    }

    /// The ref parsed as a (possibly partial) version, if it looks like one.
    pub fn version_tag(&self) -> Option<LooseVersion> {
        LooseVersion::parse(&self.ref_or_sha).ok()
    }

    /// `owner/repo`, the form used by the repository ignore list.
    pub fn repo_key(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// The reference with its ref replaced, e.g. by a resolved commit SHA.
    pub fn with_ref(&self, ref_or_sha: impl Into<String>) -> Self {
        Self {
            ref_or_sha: ref_or_sha.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for ActionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if !self.path.is_empty() {
            write!(f, "/{}", self.path)?;
        }
        write!(f, "@{}", self.ref_or_sha)
    }
}

/// 40 hex digits, either case.
pub fn is_commit_sha(value: &str) -> bool {
    value.len() == COMMIT_SHA_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}
