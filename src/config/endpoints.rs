//! Which API servers to talk to, and with which tokens.
//!
//! Against github.com there is a single source. Against any other server
//! (GitHub Enterprise Server) that server is the primary and github.com is the
//! fallback for actions the enterprise instance does not mirror.

use crate::resolver::VersionResolver;
use crate::source::{GitHubSource, SourceError};
use url::Url;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com/";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid API server URL: {0}")]
    InvalidUrl(String),

    #[error("API server URL must be absolute")]
    NotAbsolute,

    #[error("API server URL scheme must be http or https")]
    UnsupportedScheme,

    #[error("GITHUB_TOKEN is required for GitHub.com API calls; use --github-token, the GITHUB_TOKEN environment variable, or pin.github-token in the config file")]
    MissingGitHubToken,

    #[error("GHES_GITHUB_TOKEN is required when the API server is not {DEFAULT_API_BASE_URL}; use --ghes-github-token, the GHES_GITHUB_TOKEN environment variable, or pin.ghes-github-token in the config file")]
    MissingGhesToken,

    #[error("GITHUB_TOKEN is required for the GitHub.com fallback when the API server is not {DEFAULT_API_BASE_URL}")]
    MissingFallbackToken,
}

/// Trim, add a trailing slash, and require an absolute http(s) URL.
pub fn normalize_api_base_url(raw: &str) -> Result<Url, EndpointError> {
    let mut text = raw.trim().to_string();
    if !text.ends_with('/') {
        text.push('/');
    }

    let url = match Url::parse(&text) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => return Err(EndpointError::NotAbsolute),
        Err(err) => return Err(EndpointError::InvalidUrl(err.to_string())),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Err(EndpointError::UnsupportedScheme);
    }
    Ok(url)
}

/// An API base URL together with the token used against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: Url,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePlan {
    pub primary: Endpoint,
    pub fallback: Option<Endpoint>,
}

impl SourcePlan {
    /// Decide endpoints from the configured API server and tokens. Blank
    /// values count as unset.
    pub fn new(
        api_server: Option<&str>,
        github_token: Option<&str>,
        ghes_github_token: Option<&str>,
    ) -> Result<Self, EndpointError> {
        let default_url = normalize_api_base_url(DEFAULT_API_BASE_URL)?;
        let base_url = match api_server.filter(|s| !s.trim().is_empty()) {
            Some(server) => normalize_api_base_url(server)?,
            None => default_url.clone(),
        };
        let github_token = non_blank(github_token);
        let ghes_github_token = non_blank(ghes_github_token);

        if base_url == default_url {
            let token = github_token.ok_or(EndpointError::MissingGitHubToken)?;
            return Ok(Self {
                primary: Endpoint { base_url, token },
                fallback: None,
            });
        }

        let primary_token = ghes_github_token.ok_or(EndpointError::MissingGhesToken)?;
        let fallback_token = github_token.ok_or(EndpointError::MissingFallbackToken)?;
        Ok(Self {
            primary: Endpoint {
                base_url,
                token: primary_token,
            },
            fallback: Some(Endpoint {
                base_url: default_url,
                token: fallback_token,
            }),
        })
    }

    /// Build the resolver this plan describes.
    pub fn build_resolver(&self) -> Result<VersionResolver, SourceError> {
        let primary = GitHubSource::new(self.primary.base_url.clone(), &self.primary.token)?;
        debug!(api = %self.primary.base_url, "primary source");
        match &self.fallback {
            Some(fallback) => {
                debug!(api = %fallback.base_url, "fallback source");
                let fallback = GitHubSource::new(fallback.base_url.clone(), &fallback.token)?;
                Ok(VersionResolver::with_fallback(
                    Box::new(primary),
                    Box::new(fallback),
                ))
            }
            None => Ok(VersionResolver::new(Box::new(primary))),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
