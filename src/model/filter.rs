use crate::model::{CondensedTags, Comparison, Logical, union_tags};
use crate::syntax::grammar::{TypeTag, ValueTag};
use crate::tags::TagSet;

/// A validated filter node.
///
/// Throughout this module `Option::None` stands for `filter="none"`: the node
/// only constrains the tag of its counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub line: usize,
    pub kind: FilterKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    Dict(Option<Vec<FieldFilter>>),
    List(Option<Vec<Filter>>),
    String(Option<String>),
    Bool(Option<bool>),
    Int(Option<(Comparison, i64)>),
    Float(Option<(Comparison, f64)>),
    TypeDeclaration(Option<TypeFilter>),
    Logical(Logical<Filter>),
    TagCollection(TagFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub name: String,
    pub line: usize,
    pub value: Filter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagFilter {
    /// Every listed tag's definition must match the manifest.
    Implicit(Vec<CondensedTags>),
    /// Every listed tag must be declared by the manifest's tag collection.
    Explicit(Vec<CondensedTags>),
    None,
}

impl TagFilter {
    pub fn tags(&self) -> TagSet {
        match self {
            TagFilter::Implicit(groups) | TagFilter::Explicit(groups) => union_tags(groups),
            TagFilter::None => TagSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeFilter {
    pub line: usize,
    pub kind: TypeFilterKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeFilterKind {
    String,
    Bool,
    Int,
    Float,
    Tensor(Option<Vec<DimFilter>>),
    List(Option<Box<TypeFilter>>),
    Tuple(Option<Vec<TypeFilter>>),
    NamedValues(Option<Vec<NamedTypeFilter>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedTypeFilter {
    pub name: String,
    pub line: usize,
    pub value: TypeFilter,
}

/// One dimension slot of a tensor filter.
#[derive(Debug, Clone, PartialEq)]
pub struct DimFilter {
    pub line: usize,
    pub kind: DimFilterKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DimFilterKind {
    Size(Option<(Comparison, i64)>),
    Logical(Logical<DimFilter>),
}

impl Filter {
    /// Tag this filter constrains, or `None` for `logical`, which applies to
    /// whatever node it is matched against.
    pub fn tag(&self) -> Option<ValueTag> {
        Some(match &self.kind {
            FilterKind::Dict(_) => ValueTag::Dict,
            FilterKind::List(_) => ValueTag::List,
            FilterKind::String(_) => ValueTag::String,
            FilterKind::Bool(_) => ValueTag::Bool,
            FilterKind::Int(_) => ValueTag::Int,
            FilterKind::Float(_) => ValueTag::Float,
            FilterKind::TypeDeclaration(_) => ValueTag::TypeDeclaration,
            FilterKind::TagCollection(_) => ValueTag::TagCollection,
            FilterKind::Logical(_) => return None,
        })
    }

    /// Nesting depth of this filter, counting the node itself and the
    /// type-declaration layer below it.
    pub fn depth(&self) -> usize {
        let inner = match &self.kind {
            FilterKind::Dict(Some(fields)) => {
                fields.iter().map(|f| f.value.depth()).max().unwrap_or(0)
            }
            FilterKind::List(Some(items))
            | FilterKind::Logical(Logical::And(items) | Logical::Or(items)) => {
                items.iter().map(Filter::depth).max().unwrap_or(0)
            }
            FilterKind::Logical(Logical::Not(item)) => item.depth(),
            FilterKind::TypeDeclaration(Some(decl)) => decl.depth(),
            _ => 0,
        };
        inner + 1
    }

    /// Every tag collection in this filter, in document order.
    pub fn tag_filters(&self) -> Vec<&TagFilter> {
        let mut out = Vec::new();
        self.collect_tag_filters(&mut out);
        out
    }

    fn collect_tag_filters<'a>(&'a self, out: &mut Vec<&'a TagFilter>) {
        match &self.kind {
            FilterKind::Dict(Some(fields)) => {
                for field in fields {
                    field.value.collect_tag_filters(out);
                }
            }
            FilterKind::List(Some(items)) => {
                for item in items {
                    item.collect_tag_filters(out);
                }
            }
            FilterKind::Logical(Logical::And(items) | Logical::Or(items)) => {
                for item in items {
                    item.collect_tag_filters(out);
                }
            }
            FilterKind::Logical(Logical::Not(item)) => item.collect_tag_filters(out),
            FilterKind::TagCollection(tags) => out.push(tags),
            _ => {}
        }
    }
}

impl TypeFilter {
    pub fn depth(&self) -> usize {
        let inner = match &self.kind {
            TypeFilterKind::List(Some(item)) => item.depth(),
            TypeFilterKind::Tuple(Some(items)) => {
                items.iter().map(TypeFilter::depth).max().unwrap_or(0)
            }
            TypeFilterKind::NamedValues(Some(values)) => {
                values.iter().map(|v| v.value.depth()).max().unwrap_or(0)
            }
            TypeFilterKind::Tensor(Some(dims)) => {
                dims.iter().map(DimFilter::depth).max().unwrap_or(0)
            }
            _ => 0,
        };
        inner + 1
    }

    pub fn tag(&self) -> TypeTag {
        match &self.kind {
            TypeFilterKind::String => TypeTag::String,
            TypeFilterKind::Bool => TypeTag::Bool,
            TypeFilterKind::Int => TypeTag::Int,
            TypeFilterKind::Float => TypeTag::Float,
            TypeFilterKind::Tensor(_) => TypeTag::Tensor,
            TypeFilterKind::List(_) => TypeTag::List,
            TypeFilterKind::Tuple(_) => TypeTag::Tuple,
            TypeFilterKind::NamedValues(_) => TypeTag::NamedValueCollection,
        }
    }
}

impl DimFilter {
    pub fn depth(&self) -> usize {
        match &self.kind {
            DimFilterKind::Size(_) => 1,
            DimFilterKind::Logical(Logical::And(items) | Logical::Or(items)) => {
                1 + items.iter().map(DimFilter::depth).max().unwrap_or(0)
            }
            DimFilterKind::Logical(Logical::Not(item)) => 1 + item.depth(),
        }
    }
}
