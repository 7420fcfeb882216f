use crate::document::Element;
use thiserror::Error;

closed_set! {
    /// Every structural rule a manifest or filter can violate. The string form
    /// is the stable identifier used by the valid-usage catalog.
    pub enum SyntaxErrorKind {
        InvalidTag => "INVALID_TAG",
        MissingFilterOperation => "MISSING_FILTER_OPERATION",
        InvalidFilterOperation => "INVALID_FILTER_OPERATION",
        IllegalFilterAttribute => "ILLEGAL_FILTER_ATTRIBUTE",
        IllegalContentWhenNone => "ILLEGAL_CONTENT_WHEN_NONE",
        IllegalTextOnContainer => "ILLEGAL_TEXT_ON_CONTAINER",
        DictInvalidChild => "DICT_INVALID_CHILD",
        DictDuplicateKeys => "DICT_DUPLICATE_KEYS",
        NamedFieldMissingName => "NAMED_FIELD_MISSING_NAME",
        NamedFieldWrongChildCount => "NAMED_FIELD_WRONG_CHILD_COUNT",
        IllegalChildOnTerminal => "ILLEGAL_CHILD_ON_TERMINAL",
        IntInvalidLiteral => "INT_INVALID_LITERAL",
        FloatInvalidLiteral => "FLOAT_INVALID_LITERAL",
        BoolInvalidLiteral => "BOOL_INVALID_LITERAL",
        TypeDeclarationWrongChildCount => "TYPE_DECLARATION_WRONG_CHILD_COUNT",
        TypeDeclarationInvalidTag => "TYPE_DECLARATION_INVALID_TAG",
        TypeDeclarationIllegalContentOnPrimitive => "TYPE_DECLARATION_ILLEGAL_CONTENT_ON_PRIMITIVE",
        TypeDeclarationListWrongChildCount => "TYPE_DECLARATION_LIST_WRONG_CHILD_COUNT",
        TypeDeclarationTensorInvalidChild => "TYPE_DECLARATION_TENSOR_INVALID_CHILD",
        TypeDeclarationNamedValueCollectionInvalidChild => "TYPE_DECLARATION_NAMED_VALUE_COLLECTION_INVALID_CHILD",
        TypeDeclarationNamedValueCollectionDuplicateKeys => "TYPE_DECLARATION_NAMED_VALUE_COLLECTION_DUPLICATE_KEYS",
        TypeDeclarationNamedValueMissingName => "TYPE_DECLARATION_NAMED_VALUE_MISSING_NAME",
        TypeDeclarationNamedValueWrongChildCount => "TYPE_DECLARATION_NAMED_VALUE_WRONG_CHILD_COUNT",
        TypeDeclarationDimInvalidLiteral => "TYPE_DECLARATION_DIM_INVALID_LITERAL",
        TypeDeclarationDimIllegalChild => "TYPE_DECLARATION_DIM_ILLEGAL_CHILD",
        LogicalWrongChildCount => "LOGICAL_WRONG_CHILD_COUNT",
        TagCollectionInvalidChild => "TAG_COLLECTION_INVALID_CHILD",
        CondensedTagsEmpty => "CONDENSED_TAGS_EMPTY",
        CondensedTagsInvalidSyntax => "CONDENSED_TAGS_INVALID_SYNTAX",
        CondensedTagsIllegalChild => "CONDENSED_TAGS_ILLEGAL_CHILD",
        CondensedTagsIllegalFilterAttribute => "CONDENSED_TAGS_ILLEGAL_FILTER_ATTRIBUTE",
    }
}

/// First structural violation found in a document, with the source line of
/// the offending element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}{}", .detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub line: usize,
    pub detail: Option<String>,
}

impl SyntaxError {
    pub fn at(kind: SyntaxErrorKind, element: &Element) -> Self {
        Self {
            kind,
            line: element.line,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub type SyntaxResult<T> = Result<T, SyntaxError>;
