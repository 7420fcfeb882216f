//! The closed vocabularies shared by manifests and filters.

use crate::model::Comparison;

pub const FILTER_ATTR: &str = "filter";
pub const NAME_ATTR: &str = "name";

/// Placeholder text allowed in manifest terminals until the value is known.
pub const UNFILLED: &str = "unfilled";

closed_set! {
    /// Tags of the value layer.
    pub enum ValueTag {
        Dict => "dict",
        List => "list",
        NamedField => "named-field",
        String => "string",
        Bool => "bool",
        Int => "int",
        Float => "float",
        TypeDeclaration => "type-declaration",
        Logical => "logical",
        TagCollection => "tag-collection",
        CondensedTags => "condensed-tags",
    }
}

closed_set! {
    /// Tags that may appear below `type-declaration`.
    pub enum TypeTag {
        String => "type-string",
        Bool => "type-bool",
        Int => "type-int",
        Float => "type-float",
        Tensor => "type-tensor",
        List => "type-list",
        Tuple => "type-tuple",
        NamedValueCollection => "type-named-value-collection",
        NamedValue => "type-named-value",
        Dim => "dim",
    }
}

closed_set! {
    /// Values of the `filter` attribute.
    pub enum FilterOp {
        None => "none",
        All => "all",
        Equals => "equals",
        TypeMatch => "type-match",
        Lt => "lt",
        Le => "le",
        Gt => "gt",
        Ge => "ge",
        And => "and",
        Or => "or",
        Not => "not",
        ImplicitTagMatch => "implicit-tag-match",
        ExplicitTagMatch => "explicit-tag-match",
    }
}

impl FilterOp {
    pub fn comparison(self) -> Option<Comparison> {
        match self {
            FilterOp::Equals => Some(Comparison::Equals),
            FilterOp::Lt => Some(Comparison::Lt),
            FilterOp::Le => Some(Comparison::Le),
            FilterOp::Gt => Some(Comparison::Gt),
            FilterOp::Ge => Some(Comparison::Ge),
            _ => None,
        }
    }
}

const TRUE_LEXEMES: &[&str] = &["true", "1", "True", "TRUE"];
const FALSE_LEXEMES: &[&str] = &["false", "0", "False", "FALSE"];

/// Map a boolean lexeme onto its value. Text is trimmed first.
pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if TRUE_LEXEMES.contains(&text) {
        Some(true)
    } else if FALSE_LEXEMES.contains(&text) {
        Some(false)
    } else {
        None
    }
}

pub fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

pub fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}
