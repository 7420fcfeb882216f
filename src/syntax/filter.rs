use crate::document::Element;
use crate::model::{
    Comparison, DimFilter, DimFilterKind, FieldFilter, Filter, FilterKind, Logical,
    NamedTypeFilter, TagFilter, TypeFilter, TypeFilterKind,
};
use crate::syntax::grammar::{self, FilterOp, TypeTag, ValueTag};
use crate::syntax::{
    DICT_FIELDS, NAMED_VALUES, SyntaxError, SyntaxErrorKind, SyntaxResult, filter_op,
    named_children, require_empty_when_none, require_no_children, require_no_text,
    tag_collection_children,
};

const COLLECTION_OPS: &[FilterOp] = &[FilterOp::All, FilterOp::None];
const EQUALS_OPS: &[FilterOp] = &[FilterOp::Equals, FilterOp::None];
const NUMERIC_OPS: &[FilterOp] = &[
    FilterOp::Equals,
    FilterOp::Lt,
    FilterOp::Le,
    FilterOp::Gt,
    FilterOp::Ge,
    FilterOp::None,
];
const TYPE_DECLARATION_OPS: &[FilterOp] = &[FilterOp::TypeMatch, FilterOp::None];
const LOGICAL_OPS: &[FilterOp] = &[FilterOp::And, FilterOp::Or, FilterOp::Not];
const TAG_COLLECTION_OPS: &[FilterOp] = &[
    FilterOp::ImplicitTagMatch,
    FilterOp::ExplicitTagMatch,
    FilterOp::None,
];

/// Check that `root` is a well-formed filter and build its typed tree.
pub fn check_filter(root: &Element) -> SyntaxResult<Filter> {
    value(root)
}

fn value(element: &Element) -> SyntaxResult<Filter> {
    let tag = ValueTag::from_name(&element.tag).ok_or_else(|| invalid_tag(element))?;

    // Only the container arms recurse; everything else is handled out of line
    // so deep documents keep small frames on the recursive path.
    let kind = match tag {
        ValueTag::Dict => dict(element)?,
        ValueTag::List => list(element)?,
        ValueTag::TypeDeclaration => type_declaration(element)?,
        ValueTag::Logical => FilterKind::Logical(logical(element, value)?),
        // Only valid inside their containers.
        ValueTag::NamedField | ValueTag::CondensedTags => return Err(invalid_tag(element)),
        _ => leaf(tag, element)?,
    };

    Ok(Filter {
        line: element.line,
        kind,
    })
}

fn dict(element: &Element) -> SyntaxResult<FilterKind> {
    if filter_op(element, COLLECTION_OPS)? != FilterOp::All {
        return none(element, FilterKind::Dict(None));
    }
    let named = named_children(element, &DICT_FIELDS, value)?;
    let mut fields = Vec::with_capacity(named.len());
    for f in named {
        fields.push(FieldFilter {
            name: f.name,
            line: f.line,
            value: f.value,
        });
    }
    Ok(FilterKind::Dict(Some(fields)))
}

fn list(element: &Element) -> SyntaxResult<FilterKind> {
    if filter_op(element, COLLECTION_OPS)? != FilterOp::All {
        return none(element, FilterKind::List(None));
    }
    require_no_text(element)?;
    let mut items = Vec::with_capacity(element.children.len());
    for child in &element.children {
        items.push(value(child)?);
    }
    Ok(FilterKind::List(Some(items)))
}

fn type_declaration(element: &Element) -> SyntaxResult<FilterKind> {
    if filter_op(element, TYPE_DECLARATION_OPS)? != FilterOp::TypeMatch {
        return none(element, FilterKind::TypeDeclaration(None));
    }
    let [child] = element.children.as_slice() else {
        return Err(wrong_child_count(element));
    };
    require_no_text(element)?;
    Ok(FilterKind::TypeDeclaration(Some(type_filter(child)?)))
}

/// Terminals and tag collections; none of these recurse into `value`.
#[inline(never)]
fn leaf(tag: ValueTag, element: &Element) -> SyntaxResult<FilterKind> {
    Ok(match tag {
        ValueTag::String => match filter_op(element, EQUALS_OPS)? {
            FilterOp::Equals => {
                require_no_children(element, SyntaxErrorKind::IllegalChildOnTerminal)?;
                FilterKind::String(Some(element.trimmed_text().to_string()))
            }
            _ => none(element, FilterKind::String(None))?,
        },
        ValueTag::Bool => match filter_op(element, EQUALS_OPS)? {
            FilterOp::Equals => {
                require_no_children(element, SyntaxErrorKind::IllegalChildOnTerminal)?;
                let parsed = grammar::parse_bool(element.trimmed_text()).ok_or_else(|| {
                    literal_error(SyntaxErrorKind::BoolInvalidLiteral, element)
                })?;
                FilterKind::Bool(Some(parsed))
            }
            _ => none(element, FilterKind::Bool(None))?,
        },
        ValueTag::Int => FilterKind::Int(numeric(element, INT_LITERAL, grammar::parse_int)?),
        ValueTag::Float => {
            FilterKind::Float(numeric(element, FLOAT_LITERAL, grammar::parse_float)?)
        }
        ValueTag::TagCollection => match filter_op(element, TAG_COLLECTION_OPS)? {
            FilterOp::ImplicitTagMatch => {
                FilterKind::TagCollection(TagFilter::Implicit(tag_collection_children(element)?))
            }
            FilterOp::ExplicitTagMatch => {
                FilterKind::TagCollection(TagFilter::Explicit(tag_collection_children(element)?))
            }
            _ => none(element, FilterKind::TagCollection(TagFilter::None))?,
        },
        _ => return Err(invalid_tag(element)),
    })
}

fn none(element: &Element, kind: FilterKind) -> SyntaxResult<FilterKind> {
    require_empty_when_none(element)?;
    Ok(kind)
}

/// Error kinds for a comparable terminal: (illegal child, invalid literal).
type LiteralRules = (SyntaxErrorKind, SyntaxErrorKind);

const INT_LITERAL: LiteralRules = (
    SyntaxErrorKind::IllegalChildOnTerminal,
    SyntaxErrorKind::IntInvalidLiteral,
);
const FLOAT_LITERAL: LiteralRules = (
    SyntaxErrorKind::IllegalChildOnTerminal,
    SyntaxErrorKind::FloatInvalidLiteral,
);
const DIM_LITERAL: LiteralRules = (
    SyntaxErrorKind::TypeDeclarationDimIllegalChild,
    SyntaxErrorKind::TypeDeclarationDimInvalidLiteral,
);

/// `int`/`float`/`dim`: a comparison against a literal, or `none`.
fn numeric<T>(
    element: &Element,
    (illegal_child, invalid_literal): LiteralRules,
    parse: fn(&str) -> Option<T>,
) -> SyntaxResult<Option<(Comparison, T)>> {
    let op = filter_op(element, NUMERIC_OPS)?;
    let Some(comparison) = op.comparison() else {
        require_empty_when_none(element)?;
        return Ok(None);
    };
    require_no_children(element, illegal_child)?;
    let literal =
        parse(element.trimmed_text()).ok_or_else(|| literal_error(invalid_literal, element))?;
    Ok(Some((comparison, literal)))
}

fn logical<T>(
    element: &Element,
    mut operand: impl FnMut(&Element) -> SyntaxResult<T>,
) -> SyntaxResult<Logical<T>> {
    let op = filter_op(element, LOGICAL_OPS)?;
    let count = element.children.len();
    let arity_ok = match op {
        FilterOp::Not => count == 1,
        _ => count >= 2,
    };
    if !arity_ok {
        return Err(logical_arity(element, op));
    }
    require_no_text(element)?;

    let mut operands = Vec::with_capacity(count);
    for child in &element.children {
        operands.push(operand(child)?);
    }
    Ok(match op {
        FilterOp::And => Logical::And(operands),
        FilterOp::Or => Logical::Or(operands),
        _ => match operands.pop() {
            Some(inner) => Logical::Not(Box::new(inner)),
            None => {
                return Err(SyntaxError::at(SyntaxErrorKind::LogicalWrongChildCount, element));
            }
        },
    })
}

fn type_filter(element: &Element) -> SyntaxResult<TypeFilter> {
    let tag = TypeTag::from_name(&element.tag).ok_or_else(|| invalid_type_tag(element))?;

    let kind = match tag {
        TypeTag::String | TypeTag::Bool | TypeTag::Int | TypeTag::Float => {
            if !element.is_empty() {
                return Err(SyntaxError::at(
                    SyntaxErrorKind::TypeDeclarationIllegalContentOnPrimitive,
                    element,
                ));
            }
            match tag {
                TypeTag::String => TypeFilterKind::String,
                TypeTag::Bool => TypeFilterKind::Bool,
                TypeTag::Int => TypeFilterKind::Int,
                _ => TypeFilterKind::Float,
            }
        }
        TypeTag::NamedValue | TypeTag::Dim => return Err(invalid_type_tag(element)),
        // The containers share `all`/`none`; `none` leaves them empty.
        _ if filter_op(element, COLLECTION_OPS)? == FilterOp::None => {
            require_empty_when_none(element)?;
            match tag {
                TypeTag::Tensor => TypeFilterKind::Tensor(None),
                TypeTag::List => TypeFilterKind::List(None),
                TypeTag::Tuple => TypeFilterKind::Tuple(None),
                _ => TypeFilterKind::NamedValues(None),
            }
        }
        TypeTag::Tensor => {
            require_no_text(element)?;
            let mut dims = Vec::with_capacity(element.children.len());
            for child in &element.children {
                dims.push(tensor_slot(child)?);
            }
            TypeFilterKind::Tensor(Some(dims))
        }
        TypeTag::List => {
            let [child] = element.children.as_slice() else {
                return Err(SyntaxError::at(
                    SyntaxErrorKind::TypeDeclarationListWrongChildCount,
                    element,
                ));
            };
            require_no_text(element)?;
            TypeFilterKind::List(Some(Box::new(type_filter(child)?)))
        }
        TypeTag::Tuple => {
            require_no_text(element)?;
            let mut items = Vec::with_capacity(element.children.len());
            for child in &element.children {
                items.push(type_filter(child)?);
            }
            TypeFilterKind::Tuple(Some(items))
        }
        TypeTag::NamedValueCollection => {
            let named = named_children(element, &NAMED_VALUES, type_filter)?;
            let mut values = Vec::with_capacity(named.len());
            for v in named {
                values.push(NamedTypeFilter {
                    name: v.name,
                    line: v.line,
                    value: v.value,
                });
            }
            TypeFilterKind::NamedValues(Some(values))
        }
    };

    Ok(TypeFilter {
        line: element.line,
        kind,
    })
}

/// A child of `type-tensor`: a `dim` or a `logical` over dims.
fn tensor_slot(element: &Element) -> SyntaxResult<DimFilter> {
    let kind = if element.tag == TypeTag::Dim.as_str() {
        DimFilterKind::Size(numeric(element, DIM_LITERAL, grammar::parse_int)?)
    } else if element.tag == ValueTag::Logical.as_str() {
        DimFilterKind::Logical(logical(element, tensor_slot)?)
    } else {
        return Err(
            SyntaxError::at(SyntaxErrorKind::TypeDeclarationTensorInvalidChild, element)
                .with_detail(format!("found <{}>", element.tag)),
        );
    };
    Ok(DimFilter {
        line: element.line,
        kind,
    })
}

#[cold]
fn logical_arity(element: &Element, op: FilterOp) -> SyntaxError {
    SyntaxError::at(SyntaxErrorKind::LogicalWrongChildCount, element).with_detail(format!(
        "`{}` cannot take {} operand(s)",
        op,
        element.children.len()
    ))
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

#[cold]
fn literal_error(kind: SyntaxErrorKind, element: &Element) -> SyntaxError {
    SyntaxError::at(kind, element).with_detail(format!("{:?}", element.trimmed_text()))
}
