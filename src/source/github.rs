//! GitHub REST API implementation of [`TagSource`].

use crate::action::is_commit_sha;
use crate::source::{RemoteTag, SourceError, TagPage, TagSource, TAGS_PER_PAGE};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const SHA_MEDIA_TYPE: &str = "application/vnd.github.sha";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct TagPayload {
    name: String,
    commit: CommitPayload,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
}

/// Blocking client for one GitHub API endpoint (github.com or a GHES host).
#[derive(Debug, Clone)]
pub struct GitHubSource {
    base_url: Url,
    client: Client,
}

impl GitHubSource {
    /// `base_url` is a normalized API base with a trailing slash, e.g.
    /// `https://api.github.com/` or `https://ghe.example.com/api/v3/`.
    /// An empty token sends unauthenticated requests.
    pub fn new(base_url: Url, token: &str) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        if !token.is_empty() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| SourceError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(concat!("gha-pin/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SourceError::Client)?;

        Ok(Self { base_url, client })
    }

    /// Append percent-encoded path segments to the API base.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SourceError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn get(&self, url: Url, accept: &'static str) -> Result<Response, SourceError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, accept)
            .send()
            .map_err(|source| SourceError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            let body: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl TagSource for GitHubSource {
    fn name(&self) -> &str {
        self.base_url.as_str()
    }

    fn list_tags(&self, owner: &str, repo: &str, page: u32) -> Result<TagPage, SourceError> {
        let mut url = self.endpoint(["repos", owner, repo, "tags"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &TAGS_PER_PAGE.to_string())
            .append_pair("page", &page.to_string());

        let response = self.get(url.clone(), JSON_MEDIA_TYPE)?;
        let next_page = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page_from_link);

        let body = response.text().map_err(|source| SourceError::Transport {
            url: url.to_string(),
            source,
        })?;
        let payload: Vec<TagPayload> =
            serde_json::from_str(&body).map_err(|e| SourceError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        // A tag whose commit is not a full SHA would be written into the
        // workflow as is, so the whole page is rejected.
        let tags = payload
            .into_iter()
            .map(|tag| {
                if is_commit_sha(&tag.commit.sha) {
                    Ok(RemoteTag::new(tag.name, tag.commit.sha))
                } else {
                    Err(SourceError::Decode {
                        url: url.to_string(),
                        message: format!(
                            "tag {:?} points at {:?}, expected a commit SHA",
                            tag.name,
                            truncate(&tag.commit.sha)
                        ),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TagPage { tags, next_page })
    }

    fn resolve_ref(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<String, SourceError> {
        // Branch names may contain slashes; each part becomes its own segment.
        let segments = ["repos", owner, repo, "commits"]
            .into_iter()
            .chain(reference.split('/'));
        let url = self.endpoint(segments)?;

        let response = self.get(url.clone(), SHA_MEDIA_TYPE)?;
        let body = response.text().map_err(|source| SourceError::Transport {
            url: url.to_string(),
            source,
        })?;

        let sha = body.trim();
        if !is_commit_sha(sha) {
            return Err(SourceError::Decode {
                url: url.to_string(),
                message: format!("expected a commit SHA, got {:?}", truncate(sha)),
            });
        }
        Ok(sha.to_string())
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY).collect()
}

/// Page number of the `rel="next"` entry of a GitHub `Link` header.
///
/// `<https://api.github.com/repositories/1/tags?per_page=100&page=2>; rel="next", <...>; rel="last"`
fn next_page_from_link(header: &str) -> Option<u32> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| param.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}
