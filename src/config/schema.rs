use crate::config::endpoints::normalize_api_base_url;
use serde::Deserialize;
use std::fmt;

/// Contents of a `.gha-pin.toml` file. Every key is optional.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PinConfig {
    /// Directory names skipped during workflow discovery.
    pub ignore_dirs: Option<Vec<String>>,
    pub pin: PinSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PinSection {
    pub ignore_owners: Vec<String>,
    pub ignore_repos: Vec<String>,
    pub strict_pinning_202508: bool,
    pub api_server: Option<String>,
    pub github_token: Option<String>,
    pub ghes_github_token: Option<String>,
}

impl PinConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        for dir in self.ignore_dirs.iter().flatten() {
            if dir.trim().is_empty() {
                issues.push(ValidationIssue::EmptyEntry {
                    field: "ignore-dirs",
                });
            } else if dir.contains('/') || dir.contains('\\') {
                issues.push(ValidationIssue::InvalidDirName { value: dir.clone() });
            }
        }

        for owner in &self.pin.ignore_owners {
            if owner.trim().is_empty() {
                issues.push(ValidationIssue::EmptyEntry {
                    field: "pin.ignore-owners",
                });
            }
        }

        for repo in &self.pin.ignore_repos {
            if !is_owner_repo(repo) {
                issues.push(ValidationIssue::InvalidRepo { value: repo.clone() });
            }
        }

        if let Some(server) = self.pin.api_server.as_deref() {
            if !server.trim().is_empty() {
                if let Err(err) = normalize_api_base_url(server) {
                    issues.push(ValidationIssue::InvalidApiServer {
                        value: server.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

fn is_owner_repo(value: &str) -> bool {
    match value.split_once('/') {
        Some((owner, repo)) => !owner.is_empty() && !repo.is_empty() && !repo.contains('/'),
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyEntry { field: &'static str },
    InvalidDirName { value: String },
    InvalidRepo { value: String },
    InvalidApiServer { value: String, message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyEntry { field } => {
                write!(f, "'{field}' contains an empty entry")
            }
            ValidationIssue::InvalidDirName { value } => {
                write!(f, "ignore-dirs entry '{value}' must be a directory name, not a path")
            }
            ValidationIssue::InvalidRepo { value } => {
                write!(f, "pin.ignore-repos entry '{value}' must have the form owner/repo")
            }
            ValidationIssue::InvalidApiServer { value, message } => {
                write!(f, "pin.api-server '{value}' is invalid: {message}")
            }
        }
    }
}
