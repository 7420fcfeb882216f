//! Tag identifiers: the condensed-tag DSL and the registry of tag
//! definitions.

pub mod condensed;
pub mod registry;

pub use condensed::{CondensedTagsError, TagSet, is_canonical_tag};
pub use registry::{TagIndex, TagRegistry};
