//! Field and array accessors: the bridge between symbolic expressions and
//! message schemas.
//!
//! An accessor's own type starts wide ([`TypeSet::SCHEMA`] for fields,
//! [`TypeSet::ITEM`] for array elements) and is narrowed by refinement once
//! the schema of the chain's base message is known.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::TypeError;
use crate::schema::SchemaRef;
use crate::types::TypeSet;

use super::{Expression, check_type};

/// Access to a named field of a message-typed expression.
#[derive(Debug, Clone)]
pub struct FieldAccess {
    pub(crate) message: Box<Expression>,
    field: String,
    pub(crate) schema_type: RefCell<Option<SchemaRef>>,
    pub(crate) types: Cell<TypeSet>,
}

impl FieldAccess {
    /// Access a field, casting the parent to a message.
    pub fn new(message: Expression, field: impl Into<String>) -> Result<Self, TypeError> {
        let node = Self {
            message: Box::new(message),
            field: field.into(),
            schema_type: RefCell::new(None),
            types: Cell::new(TypeSet::SCHEMA),
        };
        check_type(&node, &node.message, TypeSet::MESSAGE)?;
        Ok(node)
    }

    /// Access a field of the implicit current message.
    pub fn own_field(field: impl Into<String>) -> Self {
        let node = Self {
            message: Box::new(Expression::ThisMessage(super::ThisMessage::new())),
            field: field.into(),
            schema_type: RefCell::new(None),
            types: Cell::new(TypeSet::SCHEMA),
        };
        // the parent is already a message; no cast can fail
        node
    }

    pub fn message(&self) -> &Expression {
        &self.message
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// The schema type resolved during refinement, if any.
    pub fn schema_type(&self) -> Option<SchemaRef> {
        self.schema_type.borrow().clone()
    }

    /// The value at the root of the accessor chain.
    pub fn base(&self) -> &Expression {
        chain_base(&self.message)
    }
}

impl fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = self.message.to_string();
        if parent.is_empty() {
            f.write_str(&self.field)
        } else {
            write!(f, "{}.{}", parent, self.field)
        }
    }
}

impl PartialEq for FieldAccess {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.field == other.field
    }
}

impl Eq for FieldAccess {}

impl Hash for FieldAccess {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.message.hash(state);
        self.field.hash(state);
    }
}

/// Access to one element of an array-typed expression.
#[derive(Debug, Clone)]
pub struct ArrayAccess {
    pub(crate) array: Box<Expression>,
    pub(crate) index: Box<Expression>,
    pub(crate) schema_type: RefCell<Option<SchemaRef>>,
    pub(crate) types: Cell<TypeSet>,
}

impl ArrayAccess {
    /// Index into an array, casting the parent to an array and the index to
    /// a number. Indexing an expression that is itself an array element is
    /// rejected (no multi-dimensional arrays).
    pub fn new(array: Expression, index: Expression) -> Result<Self, TypeError> {
        if array.is_indexed_accessor() {
            return Err(TypeError::MultiDimensionalAccess {
                array: array.to_string(),
                index: index.to_string(),
            });
        }
        let node = Self {
            array: Box::new(array),
            index: Box::new(index),
            schema_type: RefCell::new(None),
            types: Cell::new(TypeSet::ITEM),
        };
        check_type(&node, &node.array, TypeSet::ARRAY)?;
        check_type(&node, &node.index, TypeSet::NUMBER)?;
        Ok(node)
    }

    pub fn array(&self) -> &Expression {
        &self.array
    }

    pub fn index(&self) -> &Expression {
        &self.index
    }

    /// The schema type resolved during refinement, if any.
    pub fn schema_type(&self) -> Option<SchemaRef> {
        self.schema_type.borrow().clone()
    }

    /// The value at the root of the accessor chain.
    pub fn base(&self) -> &Expression {
        chain_base(&self.array)
    }
}

impl fmt::Display for ArrayAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.array, self.index)
    }
}

impl PartialEq for ArrayAccess {
    fn eq(&self, other: &Self) -> bool {
        self.array == other.array && self.index == other.index
    }
}

impl Eq for ArrayAccess {}

impl Hash for ArrayAccess {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.array.hash(state);
        self.index.hash(state);
    }
}

/// The parent expression of an accessor node.
pub(crate) fn accessor_parent(accessor: &Expression) -> Option<&Expression> {
    match accessor {
        Expression::Field(f) => Some(&f.message),
        Expression::Index(a) => Some(&a.array),
        _ => None,
    }
}

fn chain_base(mut expr: &Expression) -> &Expression {
    while let Some(parent) = accessor_parent(expr) {
        expr = parent;
    }
    expr
}
