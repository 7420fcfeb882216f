//! Mercury: a catalog of neural-network models described by XML manifests
//! and queried with XML filters.

#[macro_use]
mod macros;

pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod matcher;
pub mod model;
pub mod syntax;
pub mod tags;
pub mod validate;

pub type Result<T> = anyhow::Result<T>;

pub use matcher::{MatchFailure, MatchFailureKind, MatchResult, match_manifest, match_tag};
pub use tags::TagRegistry;
pub use validate::{FilterInvalidity, ManifestInvalidity, validate_filter, validate_manifest};
