//! Syntax layer: recursive-descent checks of element trees against the
//! filter and manifest grammars.
//!
//! Both checks walk the tree in document order, children left to right, and
//! stop at the first violation. On success they hand back the typed tree from
//! `model`.

pub mod error;
pub mod filter;
pub mod grammar;
pub mod manifest;

pub use error::{SyntaxError, SyntaxErrorKind, SyntaxResult};
pub use filter::check_filter;
pub use grammar::{FilterOp, TypeTag, ValueTag};
pub use manifest::check_manifest;

use crate::document::Element;
use crate::model::CondensedTags;
use crate::tags::condensed;
use grammar::{FILTER_ATTR, NAME_ATTR};
use std::collections::BTreeSet;

/// Read and check the `filter` attribute against the operations legal on
/// this element.
fn filter_op(element: &Element, legal: &[FilterOp]) -> SyntaxResult<FilterOp> {
    let raw = element.attr(FILTER_ATTR).ok_or_else(|| {
        SyntaxError::at(SyntaxErrorKind::MissingFilterOperation, element)
            .with_detail(format!("<{}> requires a filter attribute", element.tag))
    })?;
    FilterOp::from_name(raw)
        .filter(|op| legal.contains(op))
        .ok_or_else(|| {
            SyntaxError::at(SyntaxErrorKind::InvalidFilterOperation, element).with_detail(format!(
                "{:?} is not allowed on <{}>",
                raw, element.tag
            ))
        })
}

fn require_empty_when_none(element: &Element) -> SyntaxResult<()> {
    if element.is_empty() {
        Ok(())
    } else {
        Err(SyntaxError::at(SyntaxErrorKind::IllegalContentWhenNone, element))
    }
}

/// Containers hold elements only; text other than whitespace is stray.
fn require_no_text(element: &Element) -> SyntaxResult<()> {
    if element.has_text() {
        return Err(stray_text(element));
    }
    Ok(())
}

#[cold]
fn stray_text(element: &Element) -> SyntaxError {
    SyntaxError::at(SyntaxErrorKind::IllegalTextOnContainer, element)
        .with_detail(format!("<{}> cannot hold text {:?}", element.tag, element.trimmed_text()))
}

fn require_no_children(element: &Element, kind: SyntaxErrorKind) -> SyntaxResult<()> {
    match element.children.first() {
        None => Ok(()),
        Some(child) => Err(SyntaxError::at(kind, child)
            .with_detail(format!("<{}> cannot contain <{}>", element.tag, child.tag))),
    }
}

/// Check a `condensed-tags` element and expand it. Shared by both grammars.
fn condensed_tags(element: &Element) -> SyntaxResult<CondensedTags> {
    if element.has_attr(FILTER_ATTR) {
        return Err(SyntaxError::at(
            SyntaxErrorKind::CondensedTagsIllegalFilterAttribute,
            element,
        ));
    }
    require_no_children(element, SyntaxErrorKind::CondensedTagsIllegalChild)?;

    let text = element.trimmed_text();
    if text.is_empty() {
        return Err(SyntaxError::at(SyntaxErrorKind::CondensedTagsEmpty, element));
    }
    let tags = condensed::parse(text).map_err(|err| {
        SyntaxError::at(SyntaxErrorKind::CondensedTagsInvalidSyntax, element)
            .with_detail(err.to_string())
    })?;

    Ok(CondensedTags {
        line: element.line,
        text: text.to_string(),
        tags,
    })
}

fn tag_collection_children(element: &Element) -> SyntaxResult<Vec<CondensedTags>> {
    require_no_text(element)?;
    element
        .children
        .iter()
        .map(|child| {
            if child.tag != ValueTag::CondensedTags.as_str() {
                return Err(SyntaxError::at(SyntaxErrorKind::TagCollectionInvalidChild, child)
                    .with_detail(format!("found <{}>", child.tag)));
            }
            condensed_tags(child)
        })
        .collect()
}

/// Error kinds for a container of uniquely named single-child entries
/// (`dict`/`named-field`, `type-named-value-collection`/`type-named-value`).
struct FieldRules {
    child_tag: &'static str,
    invalid_child: SyntaxErrorKind,
    missing_name: SyntaxErrorKind,
    duplicate_name: SyntaxErrorKind,
    wrong_child_count: SyntaxErrorKind,
}

const DICT_FIELDS: FieldRules = FieldRules {
    child_tag: "named-field",
    invalid_child: SyntaxErrorKind::DictInvalidChild,
    missing_name: SyntaxErrorKind::NamedFieldMissingName,
    duplicate_name: SyntaxErrorKind::DictDuplicateKeys,
    wrong_child_count: SyntaxErrorKind::NamedFieldWrongChildCount,
};

const NAMED_VALUES: FieldRules = FieldRules {
    child_tag: "type-named-value",
    invalid_child: SyntaxErrorKind::TypeDeclarationNamedValueCollectionInvalidChild,
    missing_name: SyntaxErrorKind::TypeDeclarationNamedValueMissingName,
    duplicate_name: SyntaxErrorKind::TypeDeclarationNamedValueCollectionDuplicateKeys,
    wrong_child_count: SyntaxErrorKind::TypeDeclarationNamedValueWrongChildCount,
};

/// A checked named entry: its name, its own line, and its checked value.
struct Named<T> {
    name: String,
    line: usize,
    value: T,
}

fn named_children<T>(
    element: &Element,
    rules: &FieldRules,
    mut check: impl FnMut(&Element) -> SyntaxResult<T>,
) -> SyntaxResult<Vec<Named<T>>> {
    require_no_text(element)?;
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(element.children.len());

    for child in &element.children {
        if child.tag != rules.child_tag {
            return Err(SyntaxError::at(rules.invalid_child, child).with_detail(format!(
                "<{}> may only contain <{}>, found <{}>",
                element.tag, rules.child_tag, child.tag
            )));
        }
        let name = child
            .attr(NAME_ATTR)
            .ok_or_else(|| SyntaxError::at(rules.missing_name, child))?;
        if !seen.insert(name) {
            return Err(SyntaxError::at(rules.duplicate_name, child)
                .with_detail(format!("key {:?} appears more than once", name)));
        }
        let [value] = child.children.as_slice() else {
            return Err(SyntaxError::at(rules.wrong_child_count, child).with_detail(format!(
                "expected exactly one child, found {}",
                child.children.len()
            )));
        };
        require_no_text(child)?;

        out.push(Named {
            name: name.to_string(),
            line: child.line,
            value: check(value)?,
        });
    }
    Ok(out)
}
