//! Remote sources of tags and refs.
//!
//! The resolver talks to a [`TagSource`] rather than to an HTTP client, so a
//! primary (often a GitHub Enterprise Server) and a public fallback can be
//! swapped in and out freely. Failures carry a distinct [`SourceError::NotFound`]
//! variant because that is the only failure class that triggers the fallback.

pub mod github;

pub use github::GitHubSource;

use thiserror::Error;

/// Tags requested per page when listing.
pub const TAGS_PER_PAGE: u32 = 100;

/// A tag and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTag {
    pub name: String,
    pub commit_sha: String,
}

impl RemoteTag {
    pub fn new(name: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commit_sha: commit_sha.into(),
        }
    }
}

/// One page of a tag listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPage {
    pub tags: Vec<RemoteTag>,
    /// Page to request next, `None` on the last page.
    pub next_page: Option<u32>,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("request to {url} failed with HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("token contains characters not allowed in an HTTP header")]
    InvalidToken,

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

/// Read-only lookups against a repository host. Both calls are idempotent.
pub trait TagSource {
    /// Short label for logs, e.g. the API base URL.
    fn name(&self) -> &str;

    /// One page of tags, pages numbered from 1. Tags are returned as the
    /// host lists them; non-version names are the caller's problem.
    fn list_tags(&self, owner: &str, repo: &str, page: u32) -> Result<TagPage, SourceError>;

    /// The commit a branch or tag name currently points at.
    fn resolve_ref(&self, owner: &str, repo: &str, reference: &str)
        -> Result<String, SourceError>;
}
