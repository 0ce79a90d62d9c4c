//! Line-level recognition of `uses:` references.
//!
//! Workflow files are never parsed as YAML. A single pattern picks the
//! reference out of a physical line and keeps every surrounding fragment, so
//! the line can be rebuilt with only the ref replaced. Lines the pattern does
//! not recognise (block scalars, anchors, multi-line values) are left alone.

use crate::action::ActionReference;
use regex::Regex;
use std::sync::LazyLock;

// Examples the pattern has to accept:
//
//   - uses: actions/checkout@v4 # Some comment
//   - uses: actions/setup-go@v5.4
//   - uses: "actions/checkout@v4"
//   - uses: 'actions/checkout@v4'
//     uses: golangci/golangci-lint-action@1481404843c368bc19ca9406f87d6e0fc97bdcfd # v7.0.0
//     uses: Finatext/workflows-public/.github/workflows/gha-lint.yml@main
//     "uses": actions/cache@v4
//
// Groups:
//   1 prefix, up to and including the whitespace after the colon
//   2 opening quote
//   3 owner
//   4 repo
//   5 path with its leading slash
//   6 ref or sha
//   7 closing quote
//   8 rest of the line
static USES_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^([-\s]*["']?uses["']?:\s+)(["']?)([^/"']+)/([^/"']+)(/[^@"']+)?@([^\s#"']+)(["']?)(.*)"#,
    )
    .expect("uses pattern is valid")
});

/// A recognised `uses:` line, split into the pieces needed to rebuild it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub reference: ActionReference,
    /// Indentation, list dash, key and separator (e.g. `"      - uses: "`)
    pub prefix: String,
    /// `"`, `'`, or empty
    pub open_quote: String,
    pub close_quote: String,
    /// Trailing comment from `#` onward, trimmed. Empty when there is none.
    pub comment: String,
}

impl ParsedLine {
    /// Rebuild the line around a new reference, with `annotation` as the
    /// leading comment text. Any comment the line already had follows it.
    pub fn render(&self, reference: &ActionReference, annotation: &str) -> String {
        let mut line = String::with_capacity(self.prefix.len() + 64);
        line.push_str(&self.prefix);
        line.push_str(&self.open_quote);
        line.push_str(&reference.to_string());
        line.push_str(&self.close_quote);
        line.push_str(" # ");
        line.push_str(annotation);
        if !self.comment.is_empty() {
            line.push(' ');
            line.push_str(&self.comment);
        }
        line
    }
}

/// Recognise a `uses:` reference on one physical line.
///
/// Returns `None` for comment lines and for anything the grammar does not
/// cover; that is not an error.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    if line.trim_start().starts_with('#') {
        return None;
    }

    let caps = USES_LINE.captures(line)?;
    let group = |idx: usize| caps.get(idx).map_or("", |m| m.as_str());

    let path = group(5).strip_prefix('/').unwrap_or("");
    let suffix = group(8);
    let comment = suffix
        .find('#')
        .map(|idx| suffix[idx..].trim().to_string())
        .unwrap_or_default();

    Some(ParsedLine {
        reference: ActionReference::new(group(3), group(4), path, group(6)),
        prefix: group(1).to_string(),
        open_quote: group(2).to_string(),
        close_quote: group(7).to_string(),
        comment,
    })
}
