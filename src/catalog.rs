//! Human-readable descriptions of failure codes.
//!
//! Both catalogs ship with the crate as XML:
//! `<catalog><entry kind="CODE">description</entry>...</catalog>`.

use crate::Result;
use crate::diagnostics;
use crate::document::{self, Element};

use anyhow::bail;
use std::collections::BTreeMap;

const MATCH_FAILURES_XML: &str = include_str!("../resources/match_failures.xml");
const VALID_USAGE_XML: &str = include_str!("../resources/valid_usage.xml");

const CATALOG_TAG: &str = "catalog";
const ENTRY_TAG: &str = "entry";
const KIND_ATTR: &str = "kind";

/// Code -> description.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, String>,
}

impl Catalog {
    pub fn from_xml(text: &str) -> Result<Self> {
        Self::from_element(&document::parse_str(text)?)
    }

    fn from_element(root: &Element) -> Result<Self> {
        if root.tag != CATALOG_TAG {
            bail!(
                "{}",
                diagnostics::error_message(format!(
                    "catalog root must be <{}>, found <{}>",
                    CATALOG_TAG, root.tag
                ))
            );
        }
        let mut entries = BTreeMap::new();
        for entry in &root.children {
            let Some(kind) = entry.attr(KIND_ATTR).filter(|_| entry.tag == ENTRY_TAG) else {
                bail!(
                    "{}",
                    diagnostics::error_message(format!(
                        "line {}: expected <{} {}=\"...\">",
                        entry.line, ENTRY_TAG, KIND_ATTR
                    ))
                );
            };
            if entries
                .insert(kind.to_string(), entry.trimmed_text().to_string())
                .is_some()
            {
                bail!(
                    "{}",
                    diagnostics::error_message(format!(
                        "line {}: duplicate catalog entry {}",
                        entry.line, kind
                    ))
                );
            }
        }
        Ok(Self { entries })
    }

    /// The catalog of match-failure and manifest-validation codes.
    pub fn match_failures() -> Result<Self> {
        Self::from_xml(MATCH_FAILURES_XML)
    }

    /// The catalog of grammar rules.
    pub fn valid_usage() -> Result<Self> {
        Self::from_xml(VALID_USAGE_XML)
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// Description of `code`, or the code itself when the catalog has none.
    pub fn describe<'a>(&'a self, code: &'a str) -> &'a str {
        self.get(code).unwrap_or(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
