//! gha-pin: pin GitHub Actions references to commit SHAs
//!
//! Workflow files reference third-party actions by mutable tags or branches
//! (`actions/checkout@v4`). This crate rewrites those references to the
//! commit they currently point at and keeps the human-readable version in a
//! trailing comment:
//!
//! ```text
//! - uses: actions/checkout@v4
//! - uses: actions/checkout@11bd71901bbe5b1630ceea73d27597364c9af683 # v4.2.2
//! ```
//!
//! # Architecture
//!
//! Rewriting is line-oriented. [`parse::parse_line`] recognizes `uses:` lines
//! and everything else passes through byte for byte. [`Pinner`] applies the
//! ignore policy and asks a [`VersionResolver`] for the commit. The resolver
//! maps a version like `v4` to the highest matching release tag, caches
//! results for the run, and falls back from a GitHub Enterprise Server to
//! github.com when the enterprise instance does not know a repository.
//!
//! # Example
//!
//! ```no_run
//! use gha_pin::{GitHubSource, PinOptions, Pinner, VersionResolver};
//!
//! let base = "https://api.github.com/".parse().unwrap();
//! let source = GitHubSource::new(base, "ghp_token").unwrap();
//! let mut pinner = Pinner::new(VersionResolver::new(Box::new(source)), PinOptions::default());
//!
//! let (updated, changed) = pinner.apply("      - uses: actions/checkout@v4\n").unwrap();
//! assert!(changed);
//! println!("{updated}");
//! ```

pub mod action;
pub mod config;
pub mod parse;
pub mod pin;
pub mod resolver;
pub mod rewrite;
pub mod source;
pub mod version;

// Re-exports
pub use action::{is_commit_sha, ActionReference};
pub use config::{load_from_path, load_from_str, ConfigError, PinConfig, Settings, SourcePlan};
pub use pin::{unpinned_references, PinError, PinOptions, Pinner, Resolve};
pub use resolver::{find_latest_tag, MatchError, ResolveError, ResolvedVersion, VersionResolver};
pub use rewrite::{find_workflow_files, rewrite, RewriteError, RewriteOptions, RewriteSummary};
pub use source::{GitHubSource, RemoteTag, SourceError, TagPage, TagSource};
pub use version::{LooseVersion, VersionError};
