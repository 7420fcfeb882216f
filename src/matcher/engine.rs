use crate::matcher::failure::{MatchFailure, MatchFailureKind, MatchResult};
use crate::model::{
    CondensedTags, FieldFilter, Filter, FilterKind, Logical, Manifest, ManifestKind, Slot,
    TagFilter, union_tags,
};
use crate::tags::TagRegistry;

use tracing::trace;

/// Lockstep walk of a filter against one manifest.
///
/// The matcher owns the tag stack for the duration of a match; tags are
/// pushed before their definition is evaluated and popped on return, and a
/// failure carries a snapshot of the stack at the point it was raised.
pub struct Matcher<'a> {
    registry: &'a TagRegistry,
    root: &'a Manifest,
    stack: Vec<String>,
}

impl<'a> Matcher<'a> {
    pub fn new(registry: &'a TagRegistry, root: &'a Manifest) -> Self {
        Self {
            registry,
            root,
            stack: Vec::new(),
        }
    }

    pub(super) fn fail(
        &self,
        kind: MatchFailureKind,
        filter_line: usize,
        manifest_line: usize,
    ) -> MatchFailure {
        trace!(%kind, filter_line, manifest_line, stack = ?self.stack, "match failed");
        MatchFailure {
            kind,
            filter_line,
            manifest_line,
            tag_stack: self.stack.clone(),
            detail: None,
        }
    }

    pub(super) fn tag_mismatch(
        &self,
        filter_line: usize,
        manifest_line: usize,
        expected: &str,
        found: &str,
    ) -> MatchFailure {
        self.fail(MatchFailureKind::TagMismatch, filter_line, manifest_line)
            .with_detail(format!("expected <{}>, found <{}>", expected, found))
    }

    /// Match `filter` against `manifest`, a node of the manifest this matcher
    /// was created for.
    pub fn value(&mut self, filter: &'a Filter, manifest: &'a Manifest) -> MatchResult {
        // Only these arms recurse. Leaves are checked out of line so that deep
        // filters keep small frames on the recursive path.
        match (&filter.kind, &manifest.kind) {
            (FilterKind::Logical(logical), _) => {
                self.logical(filter.line, manifest.line, logical, |this, operand| {
                    this.value(operand, manifest)
                })
            }
            // Implicit tag matches are resolved against the whole manifest,
            // whatever node they sit opposite.
            (FilterKind::TagCollection(TagFilter::Implicit(groups)), _) => {
                self.implicit(filter.line, manifest.line, groups)
            }
            (FilterKind::Dict(Some(fields)), ManifestKind::Dict(entries)) => {
                for field in fields {
                    let Some(entry) = entries.iter().find(|e| e.name == field.name) else {
                        return Err(self.missing_key(field, manifest));
                    };
                    self.value(&field.value, &entry.value)?;
                }
                Ok(())
            }
            (FilterKind::List(Some(items)), ManifestKind::List(values)) => {
                if values.len() < items.len() {
                    return Err(self.short_list(filter, manifest, items.len(), values.len()));
                }
                for (item, value) in items.iter().zip(values) {
                    self.value(item, value)?;
                }
                Ok(())
            }
            (FilterKind::TypeDeclaration(Some(expected)), ManifestKind::TypeDeclaration(decl)) => {
                self.type_decl(expected, decl)
            }
            _ => self.leaf(filter, manifest),
        }
    }

    #[inline(never)]
    fn leaf(&self, filter: &Filter, manifest: &Manifest) -> MatchResult {
        match (&filter.kind, &manifest.kind) {
            (FilterKind::Dict(None), ManifestKind::Dict(_))
            | (FilterKind::List(None), ManifestKind::List(_))
            | (FilterKind::String(None), ManifestKind::String(_))
            | (FilterKind::Bool(None), ManifestKind::Bool(_))
            | (FilterKind::Int(None), ManifestKind::Int(_))
            | (FilterKind::Float(None), ManifestKind::Float(_))
            | (FilterKind::TypeDeclaration(None), ManifestKind::TypeDeclaration(_))
            | (FilterKind::TagCollection(TagFilter::None), ManifestKind::TagCollection(_)) => Ok(()),

            (FilterKind::String(Some(expected)), ManifestKind::String(slot)) => {
                match slot {
                    Slot::Filled(actual) if actual == expected => Ok(()),
                    _ => Err(self
                        .fail(MatchFailureKind::StringValueNotEqual, filter.line, manifest.line)
                        .with_detail(format!("expected {:?}, found {}", expected, show(slot)))),
                }
            }

            (FilterKind::Bool(Some(expected)), ManifestKind::Bool(slot)) => match slot {
                Slot::Filled(actual) if actual == expected => Ok(()),
                _ => Err(self
                    .fail(MatchFailureKind::BoolValueNotEqual, filter.line, manifest.line)
                    .with_detail(format!("expected {}, found {}", expected, show(slot)))),
            },

            (FilterKind::Int(Some((cmp, bound))), ManifestKind::Int(slot)) => match slot {
                Slot::Filled(actual) if cmp.holds(actual, bound) => Ok(()),
                _ => Err(self
                    .fail(MatchFailureKind::NumericFailedComparison, filter.line, manifest.line)
                    .with_detail(format!("{} {} {} is false", show(slot), cmp.symbol(), bound))),
            },

            (FilterKind::Float(Some((cmp, bound))), ManifestKind::Float(slot)) => match slot {
                Slot::Filled(actual) if cmp.holds(actual, bound) => Ok(()),
                _ => Err(self
                    .fail(MatchFailureKind::NumericFailedComparison, filter.line, manifest.line)
                    .with_detail(format!("{} {} {} is false", show(slot), cmp.symbol(), bound))),
            },

            (
                FilterKind::TagCollection(TagFilter::Explicit(required)),
                ManifestKind::TagCollection(declared),
            ) => {
                let declared = union_tags(declared);
                let missing: Vec<String> = union_tags(required)
                    .into_iter()
                    .filter(|tag| !declared.contains(tag))
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(self
                        .fail(
                            MatchFailureKind::TagCollectionExplicitTagMatchFailure,
                            filter.line,
                            manifest.line,
                        )
                        .with_detail(format!("manifest does not declare {}", missing.join(", "))))
                }
            }

            _ => {
                let expected = filter.tag().map(|t| t.as_str()).unwrap_or("logical");
                Err(self.tag_mismatch(filter.line, manifest.line, expected, manifest.tag().as_str()))
            }
        }
    }

    #[cold]
    fn missing_key(&self, field: &FieldFilter, manifest: &Manifest) -> MatchFailure {
        self.fail(MatchFailureKind::DictMissingKey, field.line, manifest.line)
            .with_detail(format!("missing key {:?}", field.name))
    }

    #[cold]
    fn short_list(
        &self,
        filter: &Filter,
        manifest: &Manifest,
        wanted: usize,
        found: usize,
    ) -> MatchFailure {
        self.fail(MatchFailureKind::ListInsufficientChildren, filter.line, manifest.line)
            .with_detail(format!("filter needs {} item(s), manifest has {}", wanted, found))
    }

    /// Shared by the value layer and tensor dims.
    pub(super) fn logical<T>(
        &mut self,
        filter_line: usize,
        manifest_line: usize,
        logical: &'a Logical<T>,
        mut operand: impl FnMut(&mut Self, &'a T) -> MatchResult,
    ) -> MatchResult {
        match logical {
            Logical::And(items) => {
                for item in items {
                    operand(self, item)?;
                }
                Ok(())
            }
            Logical::Or(items) => {
                for item in items {
                    match operand(self, item) {
                        Ok(()) => return Ok(()),
                        Err(failure) if failure.kind.is_registry_fault() => return Err(failure),
                        Err(_) => {}
                    }
                }
                Err(self
                    .fail(
                        MatchFailureKind::LogicalOperationMatchFailure,
                        filter_line,
                        manifest_line,
                    )
                    .with_detail("no alternative of `or` matched"))
            }
            Logical::Not(item) => match operand(self, item) {
                Ok(()) => Err(self
                    .fail(
                        MatchFailureKind::LogicalOperationMatchFailure,
                        filter_line,
                        manifest_line,
                    )
                    .with_detail("the negated filter matched")),
                Err(failure) if failure.kind.is_registry_fault() => Err(failure),
                Err(_) => Ok(()),
            },
        }
    }

    fn implicit(
        &mut self,
        filter_line: usize,
        manifest_line: usize,
        groups: &[CondensedTags],
    ) -> MatchResult {
        for tag in union_tags(groups) {
            self.resolve(&tag, filter_line, manifest_line)?;
        }
        Ok(())
    }

    /// Match the definition of `tag` against the manifest root with `tag`
    /// pushed onto the stack.
    pub fn resolve(&mut self, tag: &str, filter_line: usize, manifest_line: usize) -> MatchResult {
        if self.stack.iter().any(|t| t == tag) {
            let mut failure = self
                .fail(MatchFailureKind::TagCycle, filter_line, manifest_line)
                .with_detail(format!("{:?} is already being resolved", tag));
            failure.tag_stack.push(tag.to_string());
            return Err(failure);
        }
        let registry = self.registry;
        let Some(definition) = registry.get(tag) else {
            return Err(self
                .fail(MatchFailureKind::TagNotFound, filter_line, manifest_line)
                .with_detail(format!("{:?} is not registered", tag)));
        };

        self.stack.push(tag.to_string());
        let root = self.root;
        let result = self.value(definition, root);
        self.stack.pop();
        result
    }
}

fn show<T: std::fmt::Debug>(slot: &Slot<T>) -> String {
    match slot {
        Slot::Filled(value) => format!("{:?}", value),
        Slot::Unfilled => "unfilled".to_string(),
    }
}
