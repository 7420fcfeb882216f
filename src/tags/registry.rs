//! Tag registry and its on-disk index.
//!
//! JSON shape of the index file:
//! {
//!   "vision": "vision.xml",             // tag name -> filter document
//!   "vision::cnn": "vision/cnn.xml"      // relative to the index file
//! }
//!
//! Loading happens in passes. Every definition is parsed and checked against
//! the filter grammar first; only then, with the registry fully populated,
//! are tag references validated, so definitions may refer to each other in
//! any order. Last, the `implicit-tag-match` references must form a DAG whose
//! resolution stays within `MAX_DEPTH` levels.

use crate::Result;
use crate::diagnostics;
use crate::document::{self, MAX_DEPTH};
use crate::model::{Filter, TagFilter};
use crate::syntax;
use crate::tags::condensed::{TagSet, is_canonical_tag};
use crate::validate;

use anyhow::{Context, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Canonical tag identifier -> tag definition. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    definitions: BTreeMap<String, Filter>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from already checked definitions.
    ///
    /// Names must be canonical identifiers and unique. References between
    /// definitions are not validated here; see [`TagIndex::validate_and_build`].
    pub fn from_definitions(definitions: impl IntoIterator<Item = (String, Filter)>) -> Result<Self> {
        let mut out = BTreeMap::new();
        for (name, filter) in definitions {
            if !is_canonical_tag(&name) {
                bail!(
                    "{}",
                    diagnostics::error_message(format!(
                        "tag name {:?} is not a canonical identifier",
                        name
                    ))
                );
            }
            if out.contains_key(&name) {
                bail!(
                    "{}",
                    diagnostics::error_message(format!("duplicate tag definition: {}", name))
                );
            }
            out.insert(name, filter);
        }
        Ok(Self { definitions: out })
    }

    /// Read an index file and load every definition it lists.
    pub fn load(index_path: impl AsRef<Path>) -> Result<Self> {
        let index_path = index_path.as_ref();
        let text = fs::read_to_string(index_path).with_context(|| {
            diagnostics::error_message(format!(
                "failed to read tag index {}",
                index_path.display()
            ))
        })?;
        let index: TagIndex = serde_json::from_str(&text).with_context(|| {
            diagnostics::error_message(format!(
                "failed to parse tag index {}",
                index_path.display()
            ))
        })?;

        let base_dir = index_path.parent().unwrap_or_else(|| Path::new("."));
        let registry = index.validate_and_build(base_dir)?;
        info!(tags = registry.len(), index = %index_path.display(), "loaded tag registry");
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

/// Raw index file: tag name -> path of its filter document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct TagIndex {
    pub entries: BTreeMap<String, PathBuf>,
}

impl TagIndex {
    /// Load, check, and cross-validate every listed definition. Relative
    /// paths resolve against `base_dir`.
    pub fn validate_and_build(&self, base_dir: &Path) -> Result<TagRegistry> {
        // Pass 1: parse and check each definition on its own.
        let mut definitions = Vec::with_capacity(self.entries.len());
        for (name, path) in &self.entries {
            let path = base_dir.join(path);
            let root = document::parse_file(&path).with_context(|| {
                diagnostics::error_message(format!(
                    "failed to load definition of tag {}",
                    name
                ))
            })?;
            let filter = syntax::check_filter(&root).map_err(|err| {
                anyhow::anyhow!(
                    "{}",
                    diagnostics::error_message(format!(
                        "definition of tag {} ({}) is invalid: {}",
                        name,
                        path.display(),
                        err
                    ))
                )
            })?;
            debug!(tag = %name, path = %path.display(), "checked tag definition");
            definitions.push((name.clone(), filter));
        }
        let registry = TagRegistry::from_definitions(definitions)?;

        // Pass 2: every reference must resolve now that all names are known.
        for name in registry.names() {
            let Some(filter) = registry.get(name) else {
                continue;
            };
            let unknown = validate::unknown_tag_references(filter, Some(name), &registry);
            if !unknown.is_empty() {
                bail!(
                    "{}",
                    diagnostics::error_message(format!(
                        "definition of tag {} references unknown tags: {}",
                        name,
                        unknown.into_iter().collect::<Vec<_>>().join(", ")
                    ))
                );
            }
        }

        // Pass 3: cycle and depth check over implicit references (DFS coloring).
        #[derive(Copy, Clone, PartialEq, Eq)]
        enum Mark {
            Temp,
            /// Resolution depth of a fully explored tag.
            Done(usize),
        }

        fn dfs(
            tag: &str,
            registry: &TagRegistry,
            marks: &mut BTreeMap<String, Mark>,
            stack: &mut Vec<String>,
        ) -> Result<usize> {
            match marks.get(tag) {
                Some(Mark::Done(depth)) => return Ok(*depth),
                Some(Mark::Temp) => {
                    // tag is in the current recursion stack => cycle
                    stack.push(tag.to_string());
                    bail!(
                        "{}",
                        diagnostics::error_message(format!(
                            "tag cycle detected: {}",
                            stack.join(" -> ")
                        ))
                    );
                }
                None => {}
            }
            // Unknown references were rejected by pass 2.
            let Some(definition) = registry.get(tag) else {
                return Ok(0);
            };

            marks.insert(tag.to_string(), Mark::Temp);
            stack.push(tag.to_string());

            let mut deepest = 0;
            for reference in implicit_references(definition) {
                deepest = deepest.max(dfs(&reference, registry, marks, stack)?);
            }

            stack.pop();
            let depth = definition.depth() + deepest;
            marks.insert(tag.to_string(), Mark::Done(depth));
            Ok(depth)
        }

        let mut marks = BTreeMap::<String, Mark>::new();
        let mut stack = Vec::<String>::new();
        for name in registry.names() {
            stack.clear();
            let depth = dfs(name, &registry, &mut marks, &mut stack)
                .with_context(|| format!("cycle check failed starting at tag {}", name))?;
            if depth > MAX_DEPTH {
                bail!(
                    "{}",
                    diagnostics::error_message(format!(
                        "resolving tag {} nests {} levels deep, more than {}",
                        name, depth, MAX_DEPTH
                    ))
                );
            }
        }
        Ok(registry)
    }
}

/// Tags a definition resolves against the manifest when matched.
fn implicit_references(filter: &Filter) -> TagSet {
    filter
        .tag_filters()
        .into_iter()
        .filter(|tags| matches!(tags, TagFilter::Implicit(_)))
        .flat_map(TagFilter::tags)
        .collect()
}
