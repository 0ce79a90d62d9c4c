//! Version resolution: turn a branch name or a (partial) version tag into the
//! commit SHA it currently points at.
//!
//! A [`VersionResolver`] is built once per run. It memoizes every successful
//! lookup by `(owner, repo, ref)` so a reference repeated across lines and
//! files costs a single round-trip, and it retries against an optional
//! fallback source when the primary reports that a repository or ref does not
//! exist. Any other failure is returned as is.

use crate::action::ActionReference;
use crate::source::{RemoteTag, SourceError, TagSource};
use crate::version::LooseVersion;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// A commit SHA plus the label written next to it in the trailing comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub commit_sha: String,
    /// Branch name as written, or the concrete tag that matched (`v4` -> `v4.2.2`).
    pub ref_comment: String,
}

/// Why no tag could be chosen for a requested version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("repository has no tags")]
    NoTagsFound,

    #[error("no matching tags found for version {version}")]
    NoMatchingTag { version: String },
}

#[derive(Error, Debug)]
pub enum ResolveError {
    /// The ref is already a commit SHA. Callers treat this as "nothing to do".
    #[error("already pinned to a commit SHA")]
    AlreadyPinned,

    #[error("failed to get commit SHA for {owner}/{repo}@{reference}")]
    Ref {
        owner: String,
        repo: String,
        reference: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to list tags for {owner}/{repo}")]
    Tags {
        owner: String,
        repo: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to resolve version {reference} for {owner}/{repo}")]
    Match {
        owner: String,
        repo: String,
        reference: String,
        #[source]
        source: MatchError,
    },
}

impl ResolveError {
    /// The underlying remote failure, if this error came from a source.
    pub fn source_error(&self) -> Option<&SourceError> {
        match self {
            ResolveError::Ref { source, .. } | ResolveError::Tags { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    owner: String,
    repo: String,
    ref_or_sha: String,
}

impl CacheKey {
    fn of(reference: &ActionReference) -> Self {
        Self {
            owner: reference.owner.clone(),
            repo: reference.repo.clone(),
            ref_or_sha: reference.ref_or_sha.clone(),
        }
    }
}

/// A tag whose name parsed as a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemverTag {
    pub tag: RemoteTag,
    pub version: LooseVersion,
}

impl SemverTag {
    /// `None` when the tag name is not a version (`latest`, `nightly-2024`...).
    pub fn from_remote(tag: RemoteTag) -> Option<Self> {
        let version = LooseVersion::parse(&tag.name).ok()?;
        Some(Self { tag, version })
    }
}

/// Resolves action refs against a primary source and an optional fallback.
pub struct VersionResolver {
    primary: Box<dyn TagSource>,
    fallback: Option<Box<dyn TagSource>>,
    cache: HashMap<CacheKey, ResolvedVersion>,
}

impl VersionResolver {
    /// A resolver with no fallback: every failure is final.
    pub fn new(primary: Box<dyn TagSource>) -> Self {
        Self {
            primary,
            fallback: None,
            cache: HashMap::new(),
        }
    }

    /// A resolver that retries on `fallback` when `primary` answers "not found".
    pub fn with_fallback(primary: Box<dyn TagSource>, fallback: Box<dyn TagSource>) -> Self {
        Self {
            primary,
            fallback: Some(fallback),
            cache: HashMap::new(),
        }
    }

    /// Number of distinct references resolved so far.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn resolve(&mut self, reference: &ActionReference) -> Result<ResolvedVersion, ResolveError> {
        if reference.has_commit_sha() {
            return Err(ResolveError::AlreadyPinned);
        }

        let key = CacheKey::of(reference);
        if let Some(cached) = self.cache.get(&key) {
            debug!(reference = %reference, "resolved from cache");
            return Ok(cached.clone());
        }

        let resolved = match reference.version_tag() {
            // Not version-shaped, so treat it as a branch name.
            None => self.resolve_branch(reference)?,
            Some(version) => self.resolve_tag(reference, &version)?,
        };

        info!(
            action = %format!("{}/{}", reference.owner, reference.repo),
            reference = %reference.ref_or_sha,
            sha = %resolved.commit_sha,
            tag = %resolved.ref_comment,
            "resolved"
        );
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    fn resolve_branch(&self, reference: &ActionReference) -> Result<ResolvedVersion, ResolveError> {
        let ActionReference {
            owner,
            repo,
            ref_or_sha,
            ..
        } = reference;
        debug!(owner = %owner, repo = %repo, reference = %ref_or_sha, "fetching commit SHA for branch");

        let sha = self
            .with_fallback_on_not_found(|source| source.resolve_ref(owner, repo, ref_or_sha))
            .map_err(|source| ResolveError::Ref {
                owner: owner.clone(),
                repo: repo.clone(),
                reference: ref_or_sha.clone(),
                source,
            })?;

        Ok(ResolvedVersion {
            commit_sha: sha,
            ref_comment: ref_or_sha.clone(),
        })
    }

    fn resolve_tag(
        &self,
        reference: &ActionReference,
        version: &LooseVersion,
    ) -> Result<ResolvedVersion, ResolveError> {
        let tags = self.list_semver_tags(&reference.owner, &reference.repo)?;
        let latest = find_latest_tag(version, &tags).map_err(|source| ResolveError::Match {
            owner: reference.owner.clone(),
            repo: reference.repo.clone(),
            reference: reference.ref_or_sha.clone(),
            source,
        })?;

        Ok(ResolvedVersion {
            commit_sha: latest.tag.commit_sha.clone(),
            ref_comment: latest.tag.name.clone(),
        })
    }

    /// Every tag of the repository whose name is a version, in listing order.
    pub fn list_semver_tags(&self, owner: &str, repo: &str) -> Result<Vec<SemverTag>, ResolveError> {
        let tags = self
            .list_tags_all(owner, repo)
            .map_err(|source| ResolveError::Tags {
                owner: owner.to_string(),
                repo: repo.to_string(),
                source,
            })?;
        Ok(tags.into_iter().filter_map(SemverTag::from_remote).collect())
    }

    fn list_tags_all(&self, owner: &str, repo: &str) -> Result<Vec<RemoteTag>, SourceError> {
        let mut fallback_active = false;
        let mut page = 1;
        let mut all_tags = Vec::new();

        loop {
            let source = match (fallback_active, self.fallback.as_deref()) {
                (true, Some(fallback)) => fallback,
                _ => self.primary.as_ref(),
            };
            debug!(owner, repo, page, source = source.name(), "fetching tags for version resolution");

            let listed = match source.list_tags(owner, repo, page) {
                Err(err) if err.is_not_found() && !fallback_active => {
                    let Some(fallback) = self.fallback.as_deref() else {
                        return Err(err);
                    };
                    // Once the primary has disowned the repository the
                    // remaining pages come from the fallback as well.
                    debug!(owner, repo, page, fallback = fallback.name(), "falling back");
                    fallback_active = true;
                    fallback.list_tags(owner, repo, page)?
                }
                other => other?,
            };

            all_tags.extend(listed.tags);
            match listed.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(all_tags)
    }

    /// Run `call` against the primary; repeat it once against the fallback
    /// if the primary says "not found" and a fallback is configured.
    fn with_fallback_on_not_found<T>(
        &self,
        call: impl Fn(&dyn TagSource) -> Result<T, SourceError>,
    ) -> Result<T, SourceError> {
        match call(self.primary.as_ref()) {
            Err(err) if err.is_not_found() => match self.fallback.as_deref() {
                Some(fallback) => {
                    debug!(primary = self.primary.name(), fallback = fallback.name(), "falling back");
                    call(fallback)
                }
                None => Err(err),
            },
            result => result,
        }
    }
}

/// Pick the newest release tag compatible with `requested`.
///
/// - `v4` matches the latest `4.y.z`
/// - `v4.1` matches the latest `4.1.z`
/// - `v4.1.2` matches `4.1.2` only
///
/// Pre-releases never match. A zero minor in the request is treated as
/// unspecified, so `v4.0` behaves like `v4`. Among tags of equal precedence
/// (`v4.2.0` and `4.2.0`) the `v`-prefixed spelling wins, then listing order.
pub fn find_latest_tag<'a>(
    requested: &LooseVersion,
    tags: &'a [SemverTag],
) -> Result<&'a SemverTag, MatchError> {
    if tags.is_empty() {
        return Err(MatchError::NoTagsFound);
    }

    let wanted = requested.version();
    let exact_patch = requested.pins_patch();

    let matching = tags.iter().filter(|tag| {
        let candidate = tag.version.version();
        !tag.version.is_prerelease()
            && candidate.major == wanted.major
            && (wanted.minor == 0 || candidate.minor == wanted.minor)
            && (!exact_patch || candidate.patch == wanted.patch)
    });

    let mut best: Option<&SemverTag> = None;
    for tag in matching {
        best = match best {
            None => Some(tag),
            Some(current) => match tag.version.cmp_precedence(&current.version) {
                Ordering::Greater => Some(tag),
                Ordering::Equal if tag.version.has_v_prefix() && !current.version.has_v_prefix() => {
                    Some(tag)
                }
                _ => Some(current),
            },
        };
    }

    best.ok_or_else(|| MatchError::NoMatchingTag {
        version: requested.original().to_string(),
    })
}
