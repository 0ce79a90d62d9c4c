//! Loose semantic versions for git tags and `uses:` refs
//!
//! Tags in the wild are rarely strict semver: `v4`, `v4.1`, `4.2.0` and
//! `v2.1.0-rc.1` all show up. A [`LooseVersion`] accepts an optional leading
//! `v` and one to three numeric components, fills the missing ones with zero,
//! and remembers the original spelling so callers can tell `v4` from `v4.0.0`.

use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static LOOSE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?([0-9]+)(?:\.([0-9]+))?(?:\.([0-9]+))?(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("loose version pattern is valid")
});

/// Errors while reading a loose version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Text does not have the shape of a version (e.g., "main")
    InvalidVersion { value: String },
    /// Shape is right but a component is out of range or malformed
    InvalidComponent { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value } => {
                write!(f, "'{}' is not a version", value)
            }
            VersionError::InvalidComponent { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// A version parsed from a tag name or ref, with its original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseVersion {
    version: Version,
    original: String,
}

impl LooseVersion {
    /// Parse `value` leniently.
    ///
    /// # Examples
    ///
    /// ```
    /// use gha_pin::version::LooseVersion;
    ///
    /// let v = LooseVersion::parse("v4.1").unwrap();
    /// assert_eq!(v.version().to_string(), "4.1.0");
    /// assert!(!v.pins_patch());
    ///
    /// assert!(LooseVersion::parse("main").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, VersionError> {
        let caps = LOOSE_VERSION
            .captures(value)
            .ok_or_else(|| VersionError::InvalidVersion {
                value: value.to_string(),
            })?;

        let number = |idx: usize| -> Result<u64, VersionError> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u64>()
                    .map_err(|e| VersionError::InvalidComponent {
                        value: value.to_string(),
                        source: e.to_string(),
                    }),
                None => Ok(0),
            }
        };

        let pre = match caps.get(4) {
            Some(m) => Prerelease::new(m.as_str()).map_err(|e| VersionError::InvalidComponent {
                value: value.to_string(),
                source: e.to_string(),
            })?,
            None => Prerelease::EMPTY,
        };
        let build = match caps.get(5) {
            Some(m) => {
                BuildMetadata::new(m.as_str()).map_err(|e| VersionError::InvalidComponent {
                    value: value.to_string(),
                    source: e.to_string(),
                })?
            }
            None => BuildMetadata::EMPTY,
        };

        Ok(Self {
            version: Version {
                major: number(1)?,
                minor: number(2)?,
                patch: number(3)?,
                pre,
                build,
            },
            original: value.to_string(),
        })
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// The text this version was parsed from.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// True when the original text spells out a patch component, so only
    /// that exact patch release is acceptable.
    pub fn pins_patch(&self) -> bool {
        self.original.split('.').count() >= 3
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    pub fn has_v_prefix(&self) -> bool {
        self.original.starts_with('v')
    }

    /// Semver precedence: build metadata does not participate.
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        self.version.cmp_precedence(&other.version)
    }
}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
