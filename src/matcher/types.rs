//! Type-declaration layer of the match engine.

use crate::matcher::engine::Matcher;
use crate::matcher::failure::{MatchFailureKind, MatchResult};
use crate::model::{Dim, DimFilter, DimFilterKind, Slot, TypeDecl, TypeDeclKind, TypeFilter, TypeFilterKind};
use std::collections::BTreeSet;

impl<'a> Matcher<'a> {
    pub(super) fn type_decl(&mut self, filter: &'a TypeFilter, decl: &'a TypeDecl) -> MatchResult {
        match (&filter.kind, &decl.kind) {
            (TypeFilterKind::String, TypeDeclKind::String)
            | (TypeFilterKind::Bool, TypeDeclKind::Bool)
            | (TypeFilterKind::Int, TypeDeclKind::Int)
            | (TypeFilterKind::Float, TypeDeclKind::Float)
            | (TypeFilterKind::Tensor(None), TypeDeclKind::Tensor(_))
            | (TypeFilterKind::List(None), TypeDeclKind::List(_))
            | (TypeFilterKind::Tuple(None), TypeDeclKind::Tuple(_))
            | (TypeFilterKind::NamedValues(None), TypeDeclKind::NamedValues(_)) => Ok(()),

            (TypeFilterKind::List(Some(item)), TypeDeclKind::List(actual)) => {
                self.type_decl(item, actual)
            }

            (TypeFilterKind::Tuple(Some(items)), TypeDeclKind::Tuple(actual)) => {
                if items.len() != actual.len() {
                    return Err(self
                        .fail(
                            MatchFailureKind::TypeDeclarationTupleIncorrectChildrenCount,
                            filter.line,
                            decl.line,
                        )
                        .with_detail(format!(
                            "filter tuple has {} element(s), manifest tuple has {}",
                            items.len(),
                            actual.len()
                        )));
                }
                for (item, element) in items.iter().zip(actual) {
                    self.type_decl(item, element)?;
                }
                Ok(())
            }

            (TypeFilterKind::Tensor(Some(dims)), TypeDeclKind::Tensor(actual)) => {
                if dims.len() != actual.len() {
                    return Err(self
                        .fail(
                            MatchFailureKind::TypeDeclarationTensorDifferentDimNumber,
                            filter.line,
                            decl.line,
                        )
                        .with_detail(format!(
                            "filter tensor has {} dim(s), manifest tensor has {}",
                            dims.len(),
                            actual.len()
                        )));
                }
                for (dim, size) in dims.iter().zip(actual) {
                    self.dim(dim, size)?;
                }
                Ok(())
            }

            (TypeFilterKind::NamedValues(Some(expected)), TypeDeclKind::NamedValues(actual)) => {
                // Records have no width subtyping: the key sets must be equal.
                let wanted: BTreeSet<&str> = expected.iter().map(|v| v.name.as_str()).collect();
                let found: BTreeSet<&str> = actual.iter().map(|v| v.name.as_str()).collect();
                if wanted != found {
                    let missing: Vec<&str> = wanted.difference(&found).copied().collect();
                    let extra: Vec<&str> = found.difference(&wanted).copied().collect();
                    return Err(self
                        .fail(
                            MatchFailureKind::TypeDeclarationNamedValueCollectionDifferentKeys,
                            filter.line,
                            decl.line,
                        )
                        .with_detail(format!(
                            "missing [{}], unexpected [{}]",
                            missing.join(", "),
                            extra.join(", ")
                        )));
                }
                for value in expected {
                    if let Some(other) = actual.iter().find(|v| v.name == value.name) {
                        self.type_decl(&value.value, &other.value)?;
                    }
                }
                Ok(())
            }

            _ => Err(self.tag_mismatch(
                filter.line,
                decl.line,
                filter.tag().as_str(),
                decl.tag().as_str(),
            )),
        }
    }

    fn dim(&mut self, filter: &'a DimFilter, dim: &'a Dim) -> MatchResult {
        match &filter.kind {
            DimFilterKind::Logical(logical) => {
                self.logical(filter.line, dim.line, logical, |this, operand| this.dim(operand, dim))
            }
            DimFilterKind::Size(None) => Ok(()),
            DimFilterKind::Size(Some((cmp, bound))) => match &dim.size {
                Slot::Filled(size) if cmp.holds(size, bound) => Ok(()),
                Slot::Filled(size) => Err(self
                    .fail(
                        MatchFailureKind::TypeDeclarationDimFailedComparison,
                        filter.line,
                        dim.line,
                    )
                    .with_detail(format!("{} {} {} is false", size, cmp.symbol(), bound))),
                Slot::Unfilled => Err(self
                    .fail(
                        MatchFailureKind::TypeDeclarationDimFailedComparison,
                        filter.line,
                        dim.line,
                    )
                    .with_detail("dim is unfilled")),
            },
        }
    }
}
