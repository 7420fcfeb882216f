use crate::model::{CondensedTags, Slot, union_tags};
use crate::syntax::grammar::{TypeTag, ValueTag};
use crate::tags::TagSet;

/// A validated manifest node.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub line: usize,
    pub kind: ManifestKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManifestKind {
    /// Fields in document order; names are distinct.
    Dict(Vec<Field>),
    List(Vec<Manifest>),
    String(Slot<String>),
    Bool(Slot<bool>),
    Int(Slot<i64>),
    Float(Slot<f64>),
    TypeDeclaration(TypeDecl),
    TagCollection(Vec<CondensedTags>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub line: usize,
    pub value: Manifest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub line: usize,
    pub kind: TypeDeclKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclKind {
    String,
    Bool,
    Int,
    Float,
    Tensor(Vec<Dim>),
    List(Box<TypeDecl>),
    Tuple(Vec<TypeDecl>),
    NamedValues(Vec<NamedTypeDecl>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedTypeDecl {
    pub name: String,
    pub line: usize,
    pub value: TypeDecl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dim {
    pub line: usize,
    pub size: Slot<i64>,
}

impl Manifest {
    pub fn tag(&self) -> ValueTag {
        match &self.kind {
            ManifestKind::Dict(_) => ValueTag::Dict,
            ManifestKind::List(_) => ValueTag::List,
            ManifestKind::String(_) => ValueTag::String,
            ManifestKind::Bool(_) => ValueTag::Bool,
            ManifestKind::Int(_) => ValueTag::Int,
            ManifestKind::Float(_) => ValueTag::Float,
            ManifestKind::TypeDeclaration(_) => ValueTag::TypeDeclaration,
            ManifestKind::TagCollection(_) => ValueTag::TagCollection,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        match &self.kind {
            ManifestKind::Dict(fields) => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Line of the first `unfilled` terminal in document order.
    pub fn first_unfilled(&self) -> Option<usize> {
        match &self.kind {
            ManifestKind::Dict(fields) => fields.iter().find_map(|f| f.value.first_unfilled()),
            ManifestKind::List(items) => items.iter().find_map(Manifest::first_unfilled),
            ManifestKind::String(slot) => slot.is_unfilled().then_some(self.line),
            ManifestKind::Bool(slot) => slot.is_unfilled().then_some(self.line),
            ManifestKind::Int(slot) => slot.is_unfilled().then_some(self.line),
            ManifestKind::Float(slot) => slot.is_unfilled().then_some(self.line),
            ManifestKind::TypeDeclaration(decl) => decl.first_unfilled(),
            ManifestKind::TagCollection(_) => None,
        }
    }

    /// Every tag declared by any tag collection in the manifest.
    pub fn declared_tags(&self) -> TagSet {
        let mut out = TagSet::new();
        self.collect_tags(&mut out);
        out
    }

    fn collect_tags(&self, out: &mut TagSet) {
        match &self.kind {
            ManifestKind::Dict(fields) => {
                for field in fields {
                    field.value.collect_tags(out);
                }
            }
            ManifestKind::List(items) => {
                for item in items {
                    item.collect_tags(out);
                }
            }
            ManifestKind::TagCollection(groups) => out.extend(union_tags(groups)),
            _ => {}
        }
    }
}

impl TypeDecl {
    pub fn tag(&self) -> TypeTag {
        match &self.kind {
            TypeDeclKind::String => TypeTag::String,
            TypeDeclKind::Bool => TypeTag::Bool,
            TypeDeclKind::Int => TypeTag::Int,
            TypeDeclKind::Float => TypeTag::Float,
            TypeDeclKind::Tensor(_) => TypeTag::Tensor,
            TypeDeclKind::List(_) => TypeTag::List,
            TypeDeclKind::Tuple(_) => TypeTag::Tuple,
            TypeDeclKind::NamedValues(_) => TypeTag::NamedValueCollection,
        }
    }

    fn first_unfilled(&self) -> Option<usize> {
        match &self.kind {
            TypeDeclKind::Tensor(dims) => dims.iter().find(|d| d.size.is_unfilled()).map(|d| d.line),
            TypeDeclKind::List(inner) => inner.first_unfilled(),
            TypeDeclKind::Tuple(items) => items.iter().find_map(TypeDecl::first_unfilled),
            TypeDeclKind::NamedValues(values) => {
                values.iter().find_map(|v| v.value.first_unfilled())
            }
            _ => None,
        }
    }
}
