//! Typed document trees.
//!
//! `syntax` turns a raw `Element` tree into one of these once it has checked
//! every grammar rule, so the match engine can dispatch on variants instead of
//! tag names and attribute strings. Each node keeps the source line of the
//! element it came from for failure reporting.

pub mod filter;
pub mod manifest;

pub use filter::{
    DimFilter, DimFilterKind, FieldFilter, Filter, FilterKind, NamedTypeFilter, TagFilter,
    TypeFilter, TypeFilterKind,
};
pub use manifest::{Dim, Field, Manifest, ManifestKind, NamedTypeDecl, TypeDecl, TypeDeclKind};

use crate::tags::TagSet;

/// Relation applied as `manifest <op> filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn holds<T: PartialOrd>(self, manifest: T, filter: T) -> bool {
        match self {
            Comparison::Equals => manifest == filter,
            Comparison::Lt => manifest < filter,
            Comparison::Le => manifest <= filter,
            Comparison::Gt => manifest > filter,
            Comparison::Ge => manifest >= filter,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Equals => "==",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

/// `logical` composition; used over value filters and over tensor dims.
#[derive(Debug, Clone, PartialEq)]
pub enum Logical<T> {
    And(Vec<T>),
    Or(Vec<T>),
    /// Negation takes exactly one operand.
    Not(Box<T>),
}

/// A manifest terminal that is either known or still the `unfilled`
/// placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Filled(T),
    Unfilled,
}

impl<T> Slot<T> {
    pub fn is_unfilled(&self) -> bool {
        matches!(self, Slot::Unfilled)
    }
}

/// One `condensed-tags` element: its raw text and the identifiers it expands
/// to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondensedTags {
    pub line: usize,
    pub text: String,
    pub tags: TagSet,
}

/// Union of the expansions of several `condensed-tags` elements.
pub fn union_tags(groups: &[CondensedTags]) -> TagSet {
    groups.iter().flat_map(|g| g.tags.iter().cloned()).collect()
}
