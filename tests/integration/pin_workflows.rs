use super::*;
use gha_pin::rewrite::DEFAULT_IGNORE_DIRS;
use gha_pin::{
    find_workflow_files, rewrite, PinOptions, Pinner, RewriteError, RewriteOptions, VersionResolver,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CACHE_SHA: &str = "1bd1e32a3bdc45362d1e726936510720a7c30a57";

fn workflow() -> String {
    format!(
        r#"name: CI
on: [push]

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: "actions/setup-node@v4.1" # node
      - uses: ./local-action
      - uses: docker://alpine:3.20
      - uses: actions/cache@{CACHE_SHA} # v4.2.0
      # - uses: actions/checkout@v3
      - run: echo "uses: actions/checkout@v4 inside a script"
      - uses: actions/checkout@v4
  reusable:
    uses: my-org/workflows/.github/workflows/build.yml@main
"#
    )
}

fn expected_workflow() -> String {
    format!(
        r#"name: CI
on: [push]

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@{SHA_V4_2_2} # v4.2.2
      - uses: "actions/setup-node@{SHA_NODE_4_1_5}" # v4.1.5 # node
      - uses: ./local-action
      - uses: docker://alpine:3.20
      - uses: actions/cache@{CACHE_SHA} # v4.2.0
      # - uses: actions/checkout@v3
      - run: echo "uses: actions/checkout@v4 inside a script"
      - uses: actions/checkout@{SHA_V4_2_2} # v4.2.2
  reusable:
    uses: my-org/workflows/.github/workflows/build.yml@{SHA_MAIN} # main
"#
    )
}

/// A repository checkout with one workflow and a copy under node_modules
/// that must never be touched.
fn setup_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let workflows = dir.path().join(".github/workflows");
    fs::create_dir_all(&workflows).unwrap();
    fs::write(workflows.join("ci.yml"), workflow()).unwrap();

    let vendored = dir.path().join("node_modules/some-pkg/.github/workflows");
    fs::create_dir_all(&vendored).unwrap();
    fs::write(vendored.join("ci.yml"), workflow()).unwrap();

    dir
}

fn ignore_defaults() -> Vec<String> {
    DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect()
}

fn pin_repo(root: &Path, server: &Server, dry_run: bool) -> gha_pin::RewriteSummary {
    let resolver = VersionResolver::new(Box::new(source_for(server, "t0ken")));
    let mut pinner = Pinner::new(resolver, PinOptions::default());
    let files = find_workflow_files(root, &ignore_defaults()).unwrap();
    rewrite(&files, &RewriteOptions { dry_run }, |content| {
        pinner.apply(content)
    })
}

fn mock_checkout_and_friends(server: &mut Server) -> Vec<mockito::Mock> {
    let checkout = server
        .mock("GET", "/repos/actions/checkout/tags")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(tags_body(&[
            ("v5.0.0", SHA_V5_0_0),
            ("v4.2.2", SHA_V4_2_2),
            ("v4.3.0-beta.1", "0000000000000000000000000000000000000001"),
            ("v4.1.0", SHA_V4_1_0),
            ("nightly", "0000000000000000000000000000000000000002"),
        ]))
        // Both checkout lines share one listing.
        .expect(1)
        .create();
    let node = mock_tags(
        server,
        "/",
        "actions",
        "setup-node",
        &[
            ("v4.2.0", "0000000000000000000000000000000000000003"),
            ("v4.1.5", SHA_NODE_4_1_5),
            ("v4.1.0", "0000000000000000000000000000000000000004"),
        ],
    );
    let workflows = mock_commit(server, "/", "my-org", "workflows", "main", SHA_MAIN);
    vec![checkout, node, workflows]
}

#[test]
fn test_pins_repository_workflows() {
    let mut server = Server::new();
    let mocks = mock_checkout_and_friends(&mut server);
    let repo = setup_repo();

    let summary = pin_repo(repo.path(), &server, false);

    for mock in &mocks {
        mock.assert();
    }
    assert!(!summary.has_failures(), "{:?}", summary.failures);
    assert_eq!(summary.changed.len(), 1);

    let ci = repo.path().join(".github/workflows/ci.yml");
    assert_eq!(fs::read_to_string(&ci).unwrap(), expected_workflow());

    let vendored = repo
        .path()
        .join("node_modules/some-pkg/.github/workflows/ci.yml");
    assert_eq!(fs::read_to_string(vendored).unwrap(), workflow());
}

#[test]
fn test_second_run_is_a_no_op() {
    let mut server = Server::new();
    let repo = setup_repo();
    let ci = repo.path().join(".github/workflows/ci.yml");
    fs::write(&ci, expected_workflow()).unwrap();

    // Nothing left to resolve, so no request may be made.
    let any = server
        .mock("GET", Matcher::Any)
        .with_status(500)
        .expect(0)
        .create();

    let summary = pin_repo(repo.path(), &server, false);

    any.assert();
    assert!(summary.changed.is_empty());
    assert_eq!(summary.unchanged.len(), 1);
    assert_eq!(fs::read_to_string(&ci).unwrap(), expected_workflow());
}

#[test]
fn test_dry_run_reports_without_writing() {
    let mut server = Server::new();
    let _mocks = mock_checkout_and_friends(&mut server);
    let repo = setup_repo();

    let summary = pin_repo(repo.path(), &server, true);

    assert_eq!(summary.changed.len(), 1);
    assert_eq!(summary.changed[0].original, workflow());
    assert_eq!(summary.changed[0].updated, expected_workflow());

    let ci = repo.path().join(".github/workflows/ci.yml");
    assert_eq!(fs::read_to_string(ci).unwrap(), workflow());
}

#[test]
fn test_unknown_action_fails_only_its_file() {
    let mut server = Server::new();
    let _missing = mock_not_found(&mut server, "/repos/unknown/action/tags");
    let _checkout = mock_tags(
        &mut server,
        "/",
        "actions",
        "checkout",
        &[("v4.2.2", SHA_V4_2_2)],
    );

    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.yml");
    let good = dir.path().join("good.yml");
    let broken_text = "steps:\n  - uses: actions/checkout@v4\n  - uses: unknown/action@v1\n";
    fs::write(&broken, broken_text).unwrap();
    fs::write(&good, "steps:\n  - uses: actions/checkout@v4\n").unwrap();

    let summary = pin_repo(dir.path(), &server, false);

    assert_eq!(summary.failures.len(), 1);
    let failure = &summary.failures[0];
    assert_eq!(failure.path, broken);
    assert!(matches!(failure.error, RewriteError::Fix { .. }));
    let message = std::error::Error::source(&failure.error)
        .map(|source| source.to_string())
        .unwrap_or_default();
    assert_eq!(message, "failed to resolve version for unknown/action@v1");

    // A failing file is left exactly as it was, even the lines that resolved.
    assert_eq!(fs::read_to_string(&broken).unwrap(), broken_text);
    assert_eq!(
        fs::read_to_string(&good).unwrap(),
        format!("steps:\n  - uses: actions/checkout@{SHA_V4_2_2} # v4.2.2\n")
    );
}

#[test]
fn test_follows_tag_pages() {
    let mut server = Server::new();
    let next = format!(
        r#"<{}/repositories/1/tags?per_page=100&page=2>; rel="next", <{}/repositories/1/tags?per_page=100&page=2>; rel="last""#,
        server.url(),
        server.url()
    );
    let first = server
        .mock("GET", "/repos/actions/checkout/tags")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_header("link", &next)
        .with_body(tags_body(&[("v5.0.0", SHA_V5_0_0)]))
        .create();
    let second = server
        .mock("GET", "/repos/actions/checkout/tags")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(tags_body(&[("v4.1.0", SHA_V4_1_0), ("v4.0.0", SHA_MAIN)]))
        .create();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ci.yaml");
    fs::write(&path, "- uses: actions/checkout@v4\n").unwrap();

    let summary = pin_repo(dir.path(), &server, false);

    first.assert();
    second.assert();
    assert!(!summary.has_failures());
    assert_eq!(
        fs::read_to_string(path).unwrap(),
        format!("- uses: actions/checkout@{SHA_V4_1_0} # v4.1.0\n")
    );
}

#[test]
fn test_crlf_file_stays_crlf() {
    let mut server = Server::new();
    let _checkout = mock_tags(
        &mut server,
        "/",
        "actions",
        "checkout",
        &[("v4.2.2", SHA_V4_2_2)],
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ci.yml");
    fs::write(&path, "steps:\r\n  - uses: actions/checkout@v4\r\n").unwrap();

    let summary = pin_repo(dir.path(), &server, false);

    assert!(!summary.has_failures());
    assert_eq!(
        fs::read_to_string(path).unwrap(),
        format!("steps:\r\n  - uses: actions/checkout@{SHA_V4_2_2} # v4.2.2\r\n")
    );
}

#[test]
fn test_ignored_owner_is_not_resolved() {
    let mut server = Server::new();
    let any = server
        .mock("GET", Matcher::Any)
        .with_status(500)
        .expect(0)
        .create();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ci.yml");
    let text = "- uses: my-org/internal-action@v1\n- uses: docker/login-action@v3\n";
    fs::write(&path, text).unwrap();

    let resolver = VersionResolver::new(Box::new(source_for(&server, "t0ken")));
    let options = PinOptions {
        ignore_owners: vec!["my-org".to_string()],
        ignore_repos: vec!["docker/login-action".to_string()],
        strict_pinning: false,
    };
    let mut pinner = Pinner::new(resolver, options);
    let summary = rewrite(&[path.clone()], &RewriteOptions::default(), |content| {
        pinner.apply(content)
    });

    any.assert();
    assert_eq!(summary.unchanged, vec![path.clone()]);
    assert_eq!(fs::read_to_string(path).unwrap(), text);
}

#[test]
fn test_malformed_tag_commit_leaves_file_untouched() {
    let mut server = Server::new();
    let _checkout = mock_tags(&mut server, "/", "actions", "checkout", &[("v4.2.2", "")]);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ci.yml");
    let text = "steps:\n  - uses: actions/checkout@v4\n";
    fs::write(&path, text).unwrap();

    let summary = pin_repo(dir.path(), &server, false);

    assert!(summary.changed.is_empty());
    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(summary.failures[0].error, RewriteError::Fix { .. }));
    assert_eq!(fs::read_to_string(path).unwrap(), text);
}
