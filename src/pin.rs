//! The pin policy: which references get rewritten, and how the rewritten line
//! looks.

use crate::action::ActionReference;
use crate::parse::{parse_line, ParsedLine};
use crate::resolver::{ResolveError, ResolvedVersion, VersionResolver};
use thiserror::Error;
use tracing::debug;

/// Anything that can turn a reference into a commit SHA.
///
/// [`VersionResolver`] is the real implementation; the seam exists so the
/// policy can be exercised without a remote source.
pub trait Resolve {
    fn resolve(&mut self, reference: &ActionReference) -> Result<ResolvedVersion, ResolveError>;
}

impl Resolve for VersionResolver {
    fn resolve(&mut self, reference: &ActionReference) -> Result<ResolvedVersion, ResolveError> {
        VersionResolver::resolve(self, reference)
    }
}

/// Exemptions applied before any lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinOptions {
    /// Owners whose references are left alone.
    pub ignore_owners: Vec<String>,
    /// Exact `owner/repo` entries that are left alone.
    pub ignore_repos: Vec<String>,
    /// GitHub's August 2025 SHA pinning enforcement: composite actions must
    /// be pinned even when their owner is ignored. Reusable workflows still
    /// honour `ignore_owners`.
    pub strict_pinning: bool,
}

impl PinOptions {
    /// True when policy says this reference stays as written.
    pub fn exempts(&self, reference: &ActionReference) -> bool {
        let owner_rule_applies = !self.strict_pinning || reference.is_reusable_workflow();
        if owner_rule_applies && self.ignore_owners.iter().any(|o| *o == reference.owner) {
            return true;
        }

        let repo_key = reference.repo_key();
        self.ignore_repos.iter().any(|r| *r == repo_key)
    }

    /// True when the reference is neither pinned nor exempt.
    pub fn needs_pin(&self, reference: &ActionReference) -> bool {
        !reference.has_commit_sha() && !self.exempts(reference)
    }
}

#[derive(Error, Debug)]
pub enum PinError {
    #[error("failed to resolve version for {owner}/{repo}@{reference}")]
    Resolve {
        owner: String,
        repo: String,
        reference: String,
        #[source]
        source: ResolveError,
    },
}

/// Rewrites `uses:` lines to commit SHAs.
pub struct Pinner<R = VersionResolver> {
    resolver: R,
    options: PinOptions,
}

impl<R: Resolve> Pinner<R> {
    pub fn new(resolver: R, options: PinOptions) -> Self {
        Self { resolver, options }
    }

    /// Rewrite a whole file. Returns the new content and whether any line
    /// changed.
    ///
    /// The first resolution failure aborts the file; nothing partial is
    /// returned.
    pub fn apply(&mut self, input: &str) -> Result<(String, bool), PinError> {
        let mut changed = false;
        let mut output = Vec::new();

        for line in input.split('\n') {
            // Keep CRLF files CRLF: the pattern would otherwise swallow the \r.
            let (body, cr) = match line.strip_suffix('\r') {
                Some(body) => (body, "\r"),
                None => (line, ""),
            };

            match self.replace_line(body)? {
                Some(new_line) => {
                    changed = true;
                    output.push(format!("{new_line}{cr}"));
                }
                None => output.push(line.to_string()),
            }
        }

        Ok((output.join("\n"), changed))
    }

    /// Rewrite a single line. `None` means the line stays as it is.
    pub fn replace_line(&mut self, line: &str) -> Result<Option<String>, PinError> {
        let Some(parsed) = parse_line(line) else {
            return Ok(None);
        };
        let reference = &parsed.reference;

        if !self.options.needs_pin(reference) {
            debug!(reference = %reference, "skipping");
            return Ok(None);
        }

        let resolved = match self.resolver.resolve(reference) {
            Ok(resolved) => resolved,
            Err(ResolveError::AlreadyPinned) => return Ok(None),
            Err(source) => {
                return Err(PinError::Resolve {
                    owner: reference.owner.clone(),
                    repo: reference.repo.clone(),
                    reference: reference.ref_or_sha.clone(),
                    source,
                })
            }
        };

        Ok(Some(render_pinned(&parsed, &resolved)))
    }
}

fn render_pinned(parsed: &ParsedLine, resolved: &ResolvedVersion) -> String {
    let pinned = parsed.reference.with_ref(&resolved.commit_sha);
    parsed.render(&pinned, &resolved.ref_comment)
}

/// References in `input` that the policy would rewrite, with 1-based line
/// numbers. Makes no remote calls.
pub fn unpinned_references(input: &str, options: &PinOptions) -> Vec<(usize, ActionReference)> {
    input
        .split('\n')
        .enumerate()
        .filter_map(|(idx, line)| {
            let parsed = parse_line(line.strip_suffix('\r').unwrap_or(line))?;
            options
                .needs_pin(&parsed.reference)
                .then_some((idx + 1, parsed.reference))
        })
        .collect()
}
