//! Match engine: evaluates a filter against a manifest, resolving tag
//! references through the registry.
//!
//! Conjunctive composites (`dict`, `list`, `type-tuple`, `type-tensor`,
//! `and`) stop at their first failing child. Disjunctions report a single
//! failure at the `logical` node.

pub mod engine;
pub mod failure;
mod types;

pub use engine::Matcher;
pub use failure::{MatchFailure, MatchFailureKind, MatchResult};

use crate::model::{Filter, Manifest};
use crate::tags::TagRegistry;

/// Match `filter` against the manifest rooted at `manifest`.
pub fn match_manifest(filter: &Filter, manifest: &Manifest, registry: &TagRegistry) -> MatchResult {
    Matcher::new(registry, manifest).value(filter, manifest)
}

/// Match the registered definition of `tag` against `manifest`. Failures
/// carry `tag` at the bottom of their tag stack.
pub fn match_tag(tag: &str, manifest: &Manifest, registry: &TagRegistry) -> MatchResult {
    Matcher::new(registry, manifest).resolve(tag, 0, manifest.line)
}

#[cfg(test)]
mod tests;
