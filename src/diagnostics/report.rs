//! Plain-text rendering of validation and match results for the CLI.

use crate::Result;
use crate::catalog::Catalog;
use crate::matcher::MatchFailure;
use crate::syntax::SyntaxError;
use crate::tags::TagSet;
use crate::validate::{FilterInvalidity, ManifestInvalidity, UNFILLED_VALUE, UNKNOWN_TAGS};

use std::fmt::Write;

/// Renders failures with their catalog descriptions.
#[derive(Debug, Clone)]
pub struct Reporter {
    match_failures: Catalog,
    valid_usage: Catalog,
}

impl Reporter {
    pub fn new(match_failures: Catalog, valid_usage: Catalog) -> Self {
        Self {
            match_failures,
            valid_usage,
        }
    }

    /// Reporter over the catalogs shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(Catalog::match_failures()?, Catalog::valid_usage()?))
    }

    /// `line <n>: <CODE>: <description>[ (<detail>)]`
    pub fn syntax_error(&self, err: &SyntaxError) -> String {
        let code = err.kind.as_str();
        let mut out = format!("line {}: {}: {}", err.line, code, self.valid_usage.describe(code));
        push_detail(&mut out, err.detail.as_deref());
        out
    }

    /// Code and description, both source lines, then the tag stack on its own
    /// line when tags were being resolved.
    pub fn match_failure(&self, failure: &MatchFailure) -> String {
        let code = failure.kind.as_str();
        let mut out = format!(
            "filter line {}, manifest line {}: {}: {}",
            failure.filter_line,
            failure.manifest_line,
            code,
            self.match_failures.describe(code)
        );
        push_detail(&mut out, failure.detail.as_deref());
        if !failure.tag_stack.is_empty() {
            let _ = write!(out, "\n  tag stack: {}", failure.tag_stack.join(" -> "));
        }
        out
    }

    pub fn filter_invalidity(&self, err: &FilterInvalidity) -> String {
        match err {
            FilterInvalidity::Syntax(err) => self.syntax_error(err),
            FilterInvalidity::UnknownTags(tags) => unknown_tags(&self.valid_usage, tags),
        }
    }

    pub fn manifest_invalidity(&self, err: &ManifestInvalidity) -> String {
        match err {
            ManifestInvalidity::Syntax(err) => self.syntax_error(err),
            ManifestInvalidity::Unfilled { line } => format!(
                "line {}: {}: {}",
                line,
                UNFILLED_VALUE,
                self.match_failures.describe(UNFILLED_VALUE)
            ),
            ManifestInvalidity::BaseModel(failure) => {
                format!("base model filter: {}", self.match_failure(failure))
            }
            ManifestInvalidity::UnknownTags(tags) => unknown_tags(&self.match_failures, tags),
            ManifestInvalidity::TagMismatch { tag, failure } => {
                format!("tag {}: {}", tag, self.match_failure(failure))
            }
        }
    }
}

fn unknown_tags(catalog: &Catalog, tags: &TagSet) -> String {
    let mut out = format!("{}: {}", UNKNOWN_TAGS, catalog.describe(UNKNOWN_TAGS));
    let listed = tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    push_detail(&mut out, Some(&listed));
    out
}

fn push_detail(out: &mut String, detail: Option<&str>) {
    if let Some(detail) = detail {
        let _ = write!(out, " ({})", detail);
    }
}
