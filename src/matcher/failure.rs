use thiserror::Error;

closed_set! {
    /// Why a filter did not match a manifest. The string form is the stable
    /// identifier used by the match-failure catalog.
    pub enum MatchFailureKind {
        TagMismatch => "TAG_MISMATCH",
        DictMissingKey => "DICT_MISSING_KEY",
        ListInsufficientChildren => "LIST_INSUFFICIENT_CHILDREN",
        StringValueNotEqual => "STRING_VALUE_NOT_EQUAL",
        BoolValueNotEqual => "BOOL_VALUE_NOT_EQUAL",
        NumericFailedComparison => "NUMERIC_FAILED_COMPARISON",
        LogicalOperationMatchFailure => "LOGICAL_OPERATION_MATCH_FAILURE",
        TagCollectionExplicitTagMatchFailure => "TAG_COLLECTION_EXPLICIT_TAG_MATCH_FAILURE",
        TagNotFound => "TAG_NOT_FOUND",
        TagCycle => "TAG_CYCLE",
        TypeDeclarationTupleIncorrectChildrenCount => "TYPE_DECLARATION_TUPLE_INCORRECT_CHILDREN_COUNT",
        TypeDeclarationTensorDifferentDimNumber => "TYPE_DECLARATION_TENSOR_DIFFERENT_DIM_NUMBER",
        TypeDeclarationDimFailedComparison => "TYPE_DECLARATION_DIM_FAILED_COMPARISON",
        TypeDeclarationNamedValueCollectionDifferentKeys => "TYPE_DECLARATION_NAMED_VALUE_COLLECTION_DIFFERENT_KEYS",
    }
}

impl MatchFailureKind {
    /// Failures caused by the registry rather than by the manifest. `or` and
    /// `not` pass these through instead of treating them as a mismatch.
    pub fn is_registry_fault(self) -> bool {
        matches!(self, MatchFailureKind::TagCycle | MatchFailureKind::TagNotFound)
    }
}

/// Where and why matching diverged.
///
/// `tag_stack` lists the tags being resolved at the point of failure,
/// outermost first. Line 0 stands for "no node on this side".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{kind} at filter line {filter_line}, manifest line {manifest_line}{}",
    .detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
)]
pub struct MatchFailure {
    pub kind: MatchFailureKind,
    pub filter_line: usize,
    pub manifest_line: usize,
    pub tag_stack: Vec<String>,
    pub detail: Option<String>,
}

impl MatchFailure {
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub type MatchResult = Result<(), MatchFailure>;
