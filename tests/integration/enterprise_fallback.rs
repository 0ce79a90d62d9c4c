//! A GitHub Enterprise Server primary with github.com as the fallback.
//!
//! Both hosts are mock servers; the enterprise one serves under `/api/v3/`.

use super::*;
use gha_pin::{ActionReference, PinOptions, Pinner, ResolveError, SourceError, VersionResolver};

const GHES_PREFIX: &str = "/api/v3/";
const MIRRORED_SHA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

fn resolver(ghes: &Server, github: &Server) -> VersionResolver {
    VersionResolver::with_fallback(
        Box::new(source_at(ghes, GHES_PREFIX, "ghes-token")),
        Box::new(source_for(github, "gh-token")),
    )
}

#[test]
fn test_tags_fall_back_to_github_com() {
    let mut ghes = Server::new();
    let mut github = Server::new();
    let primary = mock_not_found(&mut ghes, "/api/v3/repos/actions/checkout/tags");
    let fallback = github
        .mock("GET", "/repos/actions/checkout/tags")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .match_header("authorization", "Bearer gh-token")
        .with_status(200)
        .with_body(tags_body(&[("v4.2.2", SHA_V4_2_2), ("v4.1.0", SHA_V4_1_0)]))
        .create();

    let mut pinner = Pinner::new(resolver(&ghes, &github), PinOptions::default());
    let (updated, changed) = pinner
        .apply("      - uses: actions/checkout@v4\n")
        .unwrap();

    primary.assert();
    fallback.assert();
    assert!(changed);
    assert_eq!(
        updated,
        format!("      - uses: actions/checkout@{SHA_V4_2_2} # v4.2.2\n")
    );
}

#[test]
fn test_enterprise_answer_wins() {
    let mut ghes = Server::new();
    let mut github = Server::new();
    let primary = ghes
        .mock("GET", "/api/v3/repos/actions/checkout/tags")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer ghes-token")
        .with_status(200)
        .with_body(tags_body(&[("v4.2.2", MIRRORED_SHA)]))
        .create();
    let fallback = github
        .mock("GET", Matcher::Any)
        .with_status(200)
        .expect(0)
        .create();

    let mut resolver = resolver(&ghes, &github);
    let resolved = resolver
        .resolve(&ActionReference::new("actions", "checkout", "", "v4"))
        .unwrap();

    primary.assert();
    fallback.assert();
    assert_eq!(resolved.commit_sha, MIRRORED_SHA);
    assert_eq!(resolved.ref_comment, "v4.2.2");
}

#[test]
fn test_branch_falls_back_to_github_com() {
    let mut ghes = Server::new();
    let mut github = Server::new();
    let primary = mock_not_found(&mut ghes, "/api/v3/repos/my-org/workflows/commits/main");
    let fallback = mock_commit(&mut github, "/", "my-org", "workflows", "main", SHA_MAIN);

    let mut resolver = resolver(&ghes, &github);
    let reference = ActionReference::new("my-org", "workflows", ".github/workflows/ci.yml", "main");
    let resolved = resolver.resolve(&reference).unwrap();

    primary.assert();
    fallback.assert();
    assert_eq!(resolved.commit_sha, SHA_MAIN);
    assert_eq!(resolved.ref_comment, "main");

    // Cached for the rest of the run.
    let again = resolver.resolve(&reference).unwrap();
    assert_eq!(again, resolved);
    primary.assert();
    fallback.assert();
}

#[test]
fn test_server_error_does_not_fall_back() {
    let mut ghes = Server::new();
    let mut github = Server::new();
    let _primary = ghes
        .mock("GET", "/api/v3/repos/actions/checkout/tags")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("bad gateway")
        .create();
    let fallback = github
        .mock("GET", Matcher::Any)
        .with_status(200)
        .expect(0)
        .create();

    let mut resolver = resolver(&ghes, &github);
    let err = resolver
        .resolve(&ActionReference::new("actions", "checkout", "", "v4"))
        .unwrap_err();

    fallback.assert();
    match err.source_error() {
        Some(SourceError::Status { status, .. }) => assert_eq!(*status, 502),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(err, ResolveError::Tags { .. }));
}

#[test]
fn test_missing_everywhere_reports_fallback_error() {
    let mut ghes = Server::new();
    let mut github = Server::new();
    let primary = mock_not_found(&mut ghes, "/api/v3/repos/nobody/nothing/tags");
    let fallback = mock_not_found(&mut github, "/repos/nobody/nothing/tags");

    let mut resolver = resolver(&ghes, &github);
    let err = resolver
        .resolve(&ActionReference::new("nobody", "nothing", "", "v1"))
        .unwrap_err();

    primary.assert();
    fallback.assert();
    assert!(err.source_error().is_some_and(SourceError::is_not_found));
    assert_eq!(resolver.cached_len(), 0);
}
