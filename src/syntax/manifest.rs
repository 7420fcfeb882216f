use crate::document::Element;
use crate::model::{
    Dim, Field, Manifest, ManifestKind, NamedTypeDecl, Slot, TypeDecl, TypeDeclKind,
};
use crate::syntax::grammar::{self, FILTER_ATTR, TypeTag, UNFILLED, ValueTag};
use crate::syntax::{
    DICT_FIELDS, NAMED_VALUES, SyntaxError, SyntaxErrorKind, SyntaxResult, named_children,
    require_no_children, require_no_text, tag_collection_children,
};

/// Check that `root` is a well-formed manifest and build its typed tree.
///
/// Manifests carry values, never operations: a `filter` attribute anywhere
/// is rejected. Terminals may hold the `unfilled` placeholder.
pub fn check_manifest(root: &Element) -> SyntaxResult<Manifest> {
    value(root)
}

fn value(element: &Element) -> SyntaxResult<Manifest> {
    let tag = ValueTag::from_name(&element.tag).ok_or_else(|| invalid_tag(element))?;
    reject_filter_attr(element)?;

    let kind = match tag {
        ValueTag::Dict => {
            let named = named_children(element, &DICT_FIELDS, value)?;
            let mut fields = Vec::with_capacity(named.len());
            for f in named {
                fields.push(Field {
                    name: f.name,
                    line: f.line,
                    value: f.value,
                });
            }
            ManifestKind::Dict(fields)
        }
        ValueTag::List => {
            require_no_text(element)?;
            let mut items = Vec::with_capacity(element.children.len());
            for child in &element.children {
                items.push(value(child)?);
            }
            ManifestKind::List(items)
        }
        ValueTag::TypeDeclaration => {
            let [child] = element.children.as_slice() else {
                return Err(wrong_child_count(element));
            };
            require_no_text(element)?;
            ManifestKind::TypeDeclaration(type_decl(child)?)
        }
        ValueTag::Logical | ValueTag::NamedField | ValueTag::CondensedTags => {
            return Err(invalid_tag(element));
        }
        _ => leaf(tag, element)?,
    };

    Ok(Manifest {
        line: element.line,
        kind,
    })
}

/// Terminals and tag collections, kept out of the recursive path.
#[inline(never)]
fn leaf(tag: ValueTag, element: &Element) -> SyntaxResult<ManifestKind> {
    Ok(match tag {
        ValueTag::String => {
            require_no_children(element, SyntaxErrorKind::IllegalChildOnTerminal)?;
            let text = element.trimmed_text();
            ManifestKind::String(if text == UNFILLED {
                Slot::Unfilled
            } else {
                Slot::Filled(text.to_string())
            })
        }
        ValueTag::Bool => ManifestKind::Bool(terminal(
            element,
            SyntaxErrorKind::IllegalChildOnTerminal,
            SyntaxErrorKind::BoolInvalidLiteral,
            grammar::parse_bool,
        )?),
        ValueTag::Int => ManifestKind::Int(terminal(
            element,
            SyntaxErrorKind::IllegalChildOnTerminal,
            SyntaxErrorKind::IntInvalidLiteral,
            grammar::parse_int,
        )?),
        ValueTag::Float => ManifestKind::Float(terminal(
            element,
            SyntaxErrorKind::IllegalChildOnTerminal,
            SyntaxErrorKind::FloatInvalidLiteral,
            grammar::parse_float,
        )?),
        ValueTag::TagCollection => ManifestKind::TagCollection(tag_collection_children(element)?),
        _ => return Err(invalid_tag(element)),
    })
}

fn reject_filter_attr(element: &Element) -> SyntaxResult<()> {
    if element.has_attr(FILTER_ATTR) {
        return Err(SyntaxError::at(SyntaxErrorKind::IllegalFilterAttribute, element)
            .with_detail(format!("<{}> in a manifest cannot carry a filter", element.tag)));
    }
    Ok(())
}

/// A terminal holding either a literal or the `unfilled` placeholder.
fn terminal<T>(
    element: &Element,
    illegal_child: SyntaxErrorKind,
    invalid_literal: SyntaxErrorKind,
    parse: fn(&str) -> Option<T>,
) -> SyntaxResult<Slot<T>> {
    require_no_children(element, illegal_child)?;
    let text = element.trimmed_text();
    if text == UNFILLED {
        return Ok(Slot::Unfilled);
    }
    parse(text).map(Slot::Filled).ok_or_else(|| {
        SyntaxError::at(invalid_literal, element).with_detail(format!("{:?}", text))
    })
}

fn type_decl(element: &Element) -> SyntaxResult<TypeDecl> {
    let tag = TypeTag::from_name(&element.tag).ok_or_else(|| invalid_type_tag(element))?;
    reject_filter_attr(element)?;

    let kind = match tag {
        TypeTag::String | TypeTag::Bool | TypeTag::Int | TypeTag::Float => {
            if !element.is_empty() {
                return Err(SyntaxError::at(
                    SyntaxErrorKind::TypeDeclarationIllegalContentOnPrimitive,
                    element,
                ));
            }
            match tag {
                TypeTag::String => TypeDeclKind::String,
                TypeTag::Bool => TypeDeclKind::Bool,
                TypeTag::Int => TypeDeclKind::Int,
                _ => TypeDeclKind::Float,
            }
        }
        TypeTag::Tensor => {
            require_no_text(element)?;
            let mut dims = Vec::with_capacity(element.children.len());
            for child in &element.children {
                dims.push(dim(child)?);
            }
            TypeDeclKind::Tensor(dims)
        }
        TypeTag::List => {
            let [child] = element.children.as_slice() else {
                return Err(SyntaxError::at(
                    SyntaxErrorKind::TypeDeclarationListWrongChildCount,
                    element,
                ));
            };
            require_no_text(element)?;
            TypeDeclKind::List(Box::new(type_decl(child)?))
        }
        TypeTag::Tuple => {
            require_no_text(element)?;
            let mut items = Vec::with_capacity(element.children.len());
            for child in &element.children {
                items.push(type_decl(child)?);
            }
            TypeDeclKind::Tuple(items)
        }
        TypeTag::NamedValueCollection => {
            let named = named_children(element, &NAMED_VALUES, type_decl)?;
            let mut values = Vec::with_capacity(named.len());
            for v in named {
                values.push(NamedTypeDecl {
                    name: v.name,
                    line: v.line,
                    value: v.value,
                });
            }
            TypeDeclKind::NamedValues(values)
        }
        TypeTag::NamedValue | TypeTag::Dim => return Err(invalid_type_tag(element)),
    };

    Ok(TypeDecl {
        line: element.line,
        kind,
    })
}

fn dim(element: &Element) -> SyntaxResult<Dim> {
    if element.tag != TypeTag::Dim.as_str() {
        return Err(
            SyntaxError::at(SyntaxErrorKind::TypeDeclarationTensorInvalidChild, element)
                .with_detail(format!("found <{}>", element.tag)),
        );
    }
    reject_filter_attr(element)?;
    let size = terminal(
        element,
        SyntaxErrorKind::TypeDeclarationDimIllegalChild,
        SyntaxErrorKind::TypeDeclarationDimInvalidLiteral,
        grammar::parse_int,
    )?;
    Ok(Dim {
        line: element.line,
        size,
    })
}

#[cold]
fn wrong_child_count(element: &Element) -> SyntaxError {
    SyntaxError::at(SyntaxErrorKind::TypeDeclarationWrongChildCount, element).with_detail(format!(
        "expected exactly one child, found {}",
        element.children.len()
    ))
}

#[cold]
fn invalid_tag(element: &Element) -> SyntaxError {
    SyntaxError::at(SyntaxErrorKind::InvalidTag, element)
        .with_detail(format!("<{}> is not allowed here", element.tag))
}

#[cold]
fn invalid_type_tag(element: &Element) -> SyntaxError {
    SyntaxError::at(SyntaxErrorKind::TypeDeclarationInvalidTag, element)
        .with_detail(format!("<{}> is not allowed here", element.tag))
}
