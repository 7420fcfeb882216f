//! Composite validators: grammar checks followed by the semantic checks that
//! need the tag registry.

use crate::Result;
use crate::diagnostics;
use crate::document::{self, Element};
use crate::matcher::{self, MatchFailure};
use crate::model::{Filter, Manifest, TagFilter};
use crate::syntax::{self, SyntaxError};
use crate::tags::{TagRegistry, TagSet};

use anyhow::Context;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const UNKNOWN_TAGS: &str = "UNKNOWN_TAGS";
pub const UNFILLED_VALUE: &str = "UNFILLED_VALUE";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterInvalidity {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("unknown tags: {}", join(.0))]
    UnknownTags(TagSet),
}

impl FilterInvalidity {
    pub fn code(&self) -> &'static str {
        match self {
            FilterInvalidity::Syntax(err) => err.kind.as_str(),
            FilterInvalidity::UnknownTags(_) => UNKNOWN_TAGS,
        }
    }
}

/// Check `root` against the filter grammar, then check that every tag it
/// references is registered.
///
/// A tag definition passes its own name as `self_tag`: it may then list
/// itself under `explicit-tag-match` without being in the registry yet.
pub fn validate_filter(
    root: &Element,
    self_tag: Option<&str>,
    registry: &TagRegistry,
) -> std::result::Result<Filter, FilterInvalidity> {
    let filter = syntax::check_filter(root)?;
    let unknown = unknown_tag_references(&filter, self_tag, registry);
    if unknown.is_empty() {
        Ok(filter)
    } else {
        Err(FilterInvalidity::UnknownTags(unknown))
    }
}

/// Tags referenced by `filter` that `registry` cannot supply.
pub fn unknown_tag_references(
    filter: &Filter,
    self_tag: Option<&str>,
    registry: &TagRegistry,
) -> TagSet {
    let mut unknown = TagSet::new();
    for tags in filter.tag_filters() {
        let exempt = match tags {
            TagFilter::Explicit(_) => self_tag,
            TagFilter::Implicit(_) | TagFilter::None => None,
        };
        unknown.extend(
            tags.tags()
                .into_iter()
                .filter(|tag| !registry.contains(tag) && Some(tag.as_str()) != exempt),
        );
    }
    unknown
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifestInvalidity {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("line {line}: value is still unfilled")]
    Unfilled { line: usize },
    #[error("base model filter: {0}")]
    BaseModel(MatchFailure),
    #[error("unknown tags: {}", join(.0))]
    UnknownTags(TagSet),
    #[error("tag {tag}: {failure}")]
    TagMismatch { tag: String, failure: MatchFailure },
}

impl ManifestInvalidity {
    pub fn code(&self) -> &'static str {
        match self {
            ManifestInvalidity::Syntax(err) => err.kind.as_str(),
            ManifestInvalidity::Unfilled { .. } => UNFILLED_VALUE,
            ManifestInvalidity::BaseModel(failure)
            | ManifestInvalidity::TagMismatch { failure, .. } => failure.kind.as_str(),
            ManifestInvalidity::UnknownTags(_) => UNKNOWN_TAGS,
        }
    }
}

/// Full acceptance check for a model manifest.
///
/// Runs, stopping at the first problem: the manifest grammar, the
/// no-`unfilled` rule, the base model filter, registration of every declared
/// tag, and finally each declared tag's definition in sorted order.
pub fn validate_manifest(
    root: &Element,
    base_model_filter: &Filter,
    registry: &TagRegistry,
) -> std::result::Result<Manifest, ManifestInvalidity> {
    let manifest = syntax::check_manifest(root)?;

    if let Some(line) = manifest.first_unfilled() {
        return Err(ManifestInvalidity::Unfilled { line });
    }

    matcher::match_manifest(base_model_filter, &manifest, registry)
        .map_err(ManifestInvalidity::BaseModel)?;

    let declared = manifest.declared_tags();
    let unknown: TagSet = declared
        .iter()
        .filter(|tag| !registry.contains(tag))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ManifestInvalidity::UnknownTags(unknown));
    }

    for tag in &declared {
        debug!(%tag, "matching declared tag");
        matcher::match_tag(tag, &manifest, registry).map_err(|failure| {
            ManifestInvalidity::TagMismatch {
                tag: tag.clone(),
                failure,
            }
        })?;
    }
    Ok(manifest)
}

/// Load the filter every manifest must satisfy. It may reference registered
/// tags but is not itself a tag.
pub fn load_base_model_filter(path: impl AsRef<Path>, registry: &TagRegistry) -> Result<Filter> {
    let path = path.as_ref();
    let root = document::parse_file(path).with_context(|| {
        diagnostics::error_message(format!(
            "failed to load base model filter {}",
            path.display()
        ))
    })?;
    validate_filter(&root, None, registry).with_context(|| {
        diagnostics::error_message(format!("base model filter {} is invalid", path.display()))
    })
}

fn join(tags: &TagSet) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_str;
    use crate::matcher::MatchFailureKind;
    use crate::syntax::SyntaxErrorKind;
    use pretty_assertions::assert_eq;

    fn element(xml: &str) -> Element {
        parse_str(xml).unwrap()
    }

    fn definition(xml: &str) -> Filter {
        syntax::check_filter(&element(xml)).unwrap()
    }

    fn tag_set(tags: &[&str]) -> TagSet {
        tags.iter().map(|t| t.to_string()).collect()
    }

    fn registry() -> TagRegistry {
        TagRegistry::from_definitions([
            (
                "vision".to_string(),
                definition(
                    r#"<dict filter="all">
  <named-field name="domain"><string filter="equals">vision</string></named-field>
</dict>"#,
                ),
            ),
            (
                "vision::cnn".to_string(),
                definition(
                    r#"<dict filter="all">
  <named-field name="layers"><int filter="ge">1</int></named-field>
</dict>"#,
                ),
            ),
        ])
        .unwrap()
    }

    const BASE: &str = r#"<dict filter="all">
  <named-field name="name"><string filter="none"/></named-field>
  <named-field name="tags"><tag-collection filter="none"/></named-field>
</dict>"#;

    #[test]
    fn filter_with_registered_tags_is_valid() {
        let xml = r#"<tag-collection filter="implicit-tag-match">
  <condensed-tags>vision.cnn</condensed-tags>
</tag-collection>"#;
        assert!(validate_filter(&element(xml), None, &registry()).is_ok());
    }

    #[test]
    fn unknown_implicit_tags_are_collected() {
        let xml = r#"<logical filter="and">
  <tag-collection filter="implicit-tag-match"><condensed-tags>audio, vision</condensed-tags></tag-collection>
  <tag-collection filter="explicit-tag-match"><condensed-tags>text::{bert, gpt}</condensed-tags></tag-collection>
</logical>"#;
        let err = validate_filter(&element(xml), None, &registry()).unwrap_err();
        assert_eq!(
            err,
            FilterInvalidity::UnknownTags(tag_set(&["audio", "text::bert", "text::gpt"]))
        );
        assert_eq!(err.code(), UNKNOWN_TAGS);
    }

    #[test]
    fn definitions_may_name_themselves_explicitly() {
        let xml = r#"<dict filter="all"><named-field name="tags">
  <tag-collection filter="explicit-tag-match"><condensed-tags>speech</condensed-tags></tag-collection>
</named-field></dict>"#;
        assert!(validate_filter(&element(xml), Some("speech"), &registry()).is_ok());
        assert_eq!(
            validate_filter(&element(xml), None, &registry()).unwrap_err(),
            FilterInvalidity::UnknownTags(tag_set(&["speech"]))
        );

        let implicit = r#"<tag-collection filter="implicit-tag-match"><condensed-tags>speech</condensed-tags></tag-collection>"#;
        assert!(validate_filter(&element(implicit), Some("speech"), &registry()).is_err());
    }

    #[test]
    fn filter_syntax_errors_pass_through() {
        let err = validate_filter(&element("<dict/>"), None, &registry()).unwrap_err();
        assert_eq!(err.code(), SyntaxErrorKind::MissingFilterOperation.as_str());
    }

    #[test]
    fn accepts_a_complete_manifest() {
        let xml = r#"<dict>
  <named-field name="name"><string>resnet</string></named-field>
  <named-field name="domain"><string>vision</string></named-field>
  <named-field name="layers"><int>50</int></named-field>
  <named-field name="tags"><tag-collection><condensed-tags>vision.cnn</condensed-tags></tag-collection></named-field>
</dict>"#;
        let manifest = validate_manifest(&element(xml), &definition(BASE), &registry()).unwrap();
        assert_eq!(manifest.declared_tags(), tag_set(&["vision", "vision::cnn"]));
    }

    #[test]
    fn unfilled_values_are_rejected_first() {
        let xml = "<dict>\n<named-field name=\"name\"><string>unfilled</string></named-field>\n</dict>";
        let err = validate_manifest(&element(xml), &definition(BASE), &registry()).unwrap_err();
        assert_eq!(err, ManifestInvalidity::Unfilled { line: 2 });
        assert_eq!(err.code(), UNFILLED_VALUE);
    }

    #[test]
    fn base_model_filter_is_enforced() {
        let xml = r#"<dict><named-field name="name"><string>x</string></named-field></dict>"#;
        let err = validate_manifest(&element(xml), &definition(BASE), &registry()).unwrap_err();
        let ManifestInvalidity::BaseModel(failure) = &err else {
            panic!("expected base model failure, got {err:?}");
        };
        assert_eq!(failure.kind, MatchFailureKind::DictMissingKey);
    }

    #[test]
    fn declared_tags_must_be_registered() {
        let xml = r#"<dict>
  <named-field name="name"><string>x</string></named-field>
  <named-field name="tags"><tag-collection><condensed-tags>audio::wav</condensed-tags></tag-collection></named-field>
</dict>"#;
        let err = validate_manifest(&element(xml), &definition(BASE), &registry()).unwrap_err();
        assert_eq!(err, ManifestInvalidity::UnknownTags(tag_set(&["audio::wav"])));
    }

    #[test]
    fn declared_tags_must_match() {
        let xml = r#"<dict>
  <named-field name="name"><string>x</string></named-field>
  <named-field name="domain"><string>vision</string></named-field>
  <named-field name="layers"><int>0</int></named-field>
  <named-field name="tags"><tag-collection><condensed-tags>vision.cnn</condensed-tags></tag-collection></named-field>
</dict>"#;
        let err = validate_manifest(&element(xml), &definition(BASE), &registry()).unwrap_err();
        let ManifestInvalidity::TagMismatch { tag, failure } = &err else {
            panic!("expected tag mismatch, got {err:?}");
        };
        assert_eq!(tag, "vision::cnn");
        assert_eq!(failure.kind, MatchFailureKind::NumericFailedComparison);
        assert_eq!(failure.tag_stack, vec!["vision::cnn"]);
        assert_eq!(failure.manifest_line, 4);
    }
}
