//! The expression tree: values, accessors, operators, quantifiers, calls.
//!
//! Every node carries a bit-set of possible types ([`TypeSet`]) that is
//! narrowed monotonically: constructors cast children to the types their
//! position requires, and later analyses (predicate structural checks,
//! schema refinement) narrow further. Narrowing mutates through [`Cell`],
//! which is safe because trees are unshared and bits are only removed.
//!
//! Submodules hold one family of nodes each; this module owns the
//! [`Expression`] enum and the operations shared by all nodes.

use std::cell::Cell;
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::errors::TypeError;
use crate::schema::SchemaRef;
use crate::types::TypeSet;

mod accessors;
mod functions;
mod operators;
mod quantifier;
mod values;

pub use accessors::{ArrayAccess, FieldAccess};
pub use functions::{BuiltinFunction, FunctionCall, Signature};
pub use operators::{BinaryOp, BinaryOperator, UnaryOp, UnaryOperator};
pub use quantifier::{Quantifier, QuantifierKind};
pub use values::{Literal, LiteralValue, RangeLiteral, SetLiteral, ThisMessage, VarReference};

/// Identifier of a binding site: ties a variable occurrence to the
/// quantifier that binds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(Uuid);

impl BindingId {
    pub(crate) fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A node of the expression tree.
///
/// One variant per concrete node kind; construction goes through the
/// variant constructors, which validate types eagerly.
#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    ThisMessage(ThisMessage),
    Variable(VarReference),
    Set(SetLiteral),
    Range(RangeLiteral),
    Field(FieldAccess),
    Index(ArrayAccess),
    Unary(UnaryOperator),
    Binary(BinaryOperator),
    Call(FunctionCall),
    Quantifier(Quantifier),
}

impl Expression {
    fn types_cell(&self) -> &Cell<TypeSet> {
        match self {
            Expression::Literal(n) => &n.types,
            Expression::ThisMessage(n) => &n.types,
            Expression::Variable(n) => &n.types,
            Expression::Set(n) => &n.types,
            Expression::Range(n) => &n.types,
            Expression::Field(n) => &n.types,
            Expression::Index(n) => &n.types,
            Expression::Unary(n) => &n.types,
            Expression::Binary(n) => &n.types,
            Expression::Call(n) => &n.types,
            Expression::Quantifier(n) => &n.types,
        }
    }

    /// The set of types this node may still have.
    pub fn types(&self) -> TypeSet {
        self.types_cell().get()
    }

    /// Check whether this node could have one of the given types.
    pub fn can_be(&self, t: TypeSet) -> bool {
        self.types().intersects(t)
    }

    /// Narrow this node to the intersection with `t`.
    ///
    /// Fails when the intersection is empty.
    pub fn cast(&self, t: TypeSet) -> Result<(), TypeError> {
        let current = self.types();
        let narrowed = current.intersection(t);
        if narrowed.is_empty() {
            return Err(TypeError::Mismatch {
                expected: t.name(),
                found: current.name(),
                expression: self.to_string(),
            });
        }
        self.types_cell().set(narrowed);
        Ok(())
    }

    /// Widen this node by adding the given types.
    pub fn add_type(&self, t: TypeSet) {
        let cell = self.types_cell();
        cell.set(cell.get().union(t));
    }

    /// Remove the given types from this node.
    ///
    /// Fails when the removal would empty the set.
    pub fn rem_type(&self, t: TypeSet) -> Result<(), TypeError> {
        let remaining = self.types().difference(t);
        if remaining.is_empty() {
            return Err(TypeError::NoTypesLeft(self.to_string()));
        }
        self.types_cell().set(remaining);
        Ok(())
    }

    /// Check whether every node of the subtree has a singleton type set.
    pub fn is_fully_typed(&self) -> bool {
        self.iter().all(|node| node.types().is_singleton())
    }

    /// Check whether this node is a field or array access.
    pub fn is_accessor(&self) -> bool {
        matches!(self, Expression::Field(_) | Expression::Index(_))
    }

    /// Check whether this node is an array access.
    pub fn is_indexed_accessor(&self) -> bool {
        matches!(self, Expression::Index(_))
    }

    /// The direct children, in evaluation order.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal(_) | Expression::ThisMessage(_) | Expression::Variable(_) => {
                Vec::new()
            }
            Expression::Set(n) => n.values.iter().collect(),
            Expression::Range(n) => vec![&n.min, &n.max],
            Expression::Field(n) => vec![&n.message],
            Expression::Index(n) => vec![&n.array, &n.index],
            Expression::Unary(n) => vec![&n.operand],
            Expression::Binary(n) => vec![&n.left, &n.right],
            Expression::Call(n) => n.arguments.iter().collect(),
            Expression::Quantifier(n) => vec![&n.domain, &n.condition],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Vec<&mut Expression> {
        match self {
            Expression::Literal(_) | Expression::ThisMessage(_) | Expression::Variable(_) => {
                Vec::new()
            }
            Expression::Set(n) => n.values.iter_mut().collect(),
            Expression::Range(n) => vec![&mut n.min, &mut n.max],
            Expression::Field(n) => vec![&mut n.message],
            Expression::Index(n) => vec![&mut n.array, &mut n.index],
            Expression::Unary(n) => vec![&mut n.operand],
            Expression::Binary(n) => vec![&mut n.left, &mut n.right],
            Expression::Call(n) => n.arguments.iter_mut().collect(),
            Expression::Quantifier(n) => vec![&mut n.domain, &mut n.condition],
        }
    }

    /// Pre-order iterator over the subtree rooted at this node.
    pub fn iter(&self) -> ExprIter<'_> {
        ExprIter { stack: vec![self] }
    }

    /// Names of external aliases this subtree references: unbound variables
    /// used as the base of a field access.
    pub fn external_references(&self) -> HashSet<&str> {
        let mut refs = HashSet::new();
        for node in self.iter() {
            if let Expression::Field(f) = node {
                if let Expression::Variable(v) = f.message() {
                    if !v.is_defined() {
                        refs.insert(v.name());
                    }
                }
            }
        }
        refs
    }

    /// Check whether any variable occurrence references the given alias.
    pub fn contains_reference(&self, alias: &str) -> bool {
        self.iter()
            .any(|node| matches!(node, Expression::Variable(v) if v.name() == alias))
    }

    /// Check whether the subtree references the implicit own message.
    pub fn contains_self_reference(&self) -> bool {
        self.iter()
            .any(|node| matches!(node, Expression::ThisMessage(_)))
    }

    /// The schema type annotated on this node during refinement, if any.
    pub fn schema_type(&self) -> Option<SchemaRef> {
        match self {
            Expression::ThisMessage(n) => n.schema_type(),
            Expression::Variable(n) => n.schema_type(),
            Expression::Field(n) => n.schema_type(),
            Expression::Index(n) => n.schema_type(),
            _ => None,
        }
    }

    pub(crate) fn assign_schema_type(&self, schema: SchemaRef) {
        match self {
            Expression::ThisMessage(n) => *n.schema_type.borrow_mut() = Some(schema),
            Expression::Variable(n) => *n.schema_type.borrow_mut() = Some(schema),
            Expression::Field(n) => *n.schema_type.borrow_mut() = Some(schema),
            Expression::Index(n) => *n.schema_type.borrow_mut() = Some(schema),
            _ => {}
        }
    }
}

/// Pre-order traversal over an expression subtree.
pub struct ExprIter<'a> {
    stack: Vec<&'a Expression>,
}

impl<'a> Iterator for ExprIter<'a> {
    type Item = &'a Expression;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let children = node.children();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(n) => n.fmt(f),
            Expression::ThisMessage(n) => n.fmt(f),
            Expression::Variable(n) => n.fmt(f),
            Expression::Set(n) => n.fmt(f),
            Expression::Range(n) => n.fmt(f),
            Expression::Field(n) => n.fmt(f),
            Expression::Index(n) => n.fmt(f),
            Expression::Unary(n) => n.fmt(f),
            Expression::Binary(n) => n.fmt(f),
            Expression::Call(n) => n.fmt(f),
            Expression::Quantifier(n) => n.fmt(f),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expression::Literal(a), Expression::Literal(b)) => a == b,
            (Expression::ThisMessage(_), Expression::ThisMessage(_)) => true,
            (Expression::Variable(a), Expression::Variable(b)) => a == b,
            (Expression::Set(a), Expression::Set(b)) => a == b,
            (Expression::Range(a), Expression::Range(b)) => a == b,
            (Expression::Field(a), Expression::Field(b)) => a == b,
            (Expression::Index(a), Expression::Index(b)) => a == b,
            (Expression::Unary(a), Expression::Unary(b)) => a == b,
            (Expression::Binary(a), Expression::Binary(b)) => a == b,
            (Expression::Call(a), Expression::Call(b)) => a == b,
            (Expression::Quantifier(a), Expression::Quantifier(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Expression::Literal(n) => n.hash(state),
            Expression::ThisMessage(_) => {}
            Expression::Variable(n) => n.hash(state),
            Expression::Set(n) => n.hash(state),
            Expression::Range(n) => n.hash(state),
            Expression::Field(n) => n.hash(state),
            Expression::Index(n) => n.hash(state),
            Expression::Unary(n) => n.hash(state),
            Expression::Binary(n) => n.hash(state),
            Expression::Call(n) => n.hash(state),
            Expression::Quantifier(n) => n.hash(state),
        }
    }
}

/// Cast `child` to `t`, annotating failures with the enclosing node.
pub(crate) fn check_type(
    owner: &dyn fmt::Display,
    child: &Expression,
    t: TypeSet,
) -> Result<(), TypeError> {
    child
        .cast(t)
        .map_err(|source| TypeError::in_expression(owner.to_string(), source))
}

/// Stand-alone hash of a node, for order-independent combinations.
pub(crate) fn node_hash<T: Hash + ?Sized>(node: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    node.hash(&mut hasher);
    hasher.finish()
}

/// Build `(a and b)`.
pub fn conjunction(a: Expression, b: Expression) -> Result<Expression, TypeError> {
    Ok(Expression::Binary(BinaryOperator::new(BinaryOp::And, a, b)?))
}

/// Build `(a or b)`.
pub fn disjunction(a: Expression, b: Expression) -> Result<Expression, TypeError> {
    Ok(Expression::Binary(BinaryOperator::new(BinaryOp::Or, a, b)?))
}

/// Build `(a implies b)`.
pub fn implication(a: Expression, b: Expression) -> Result<Expression, TypeError> {
    Ok(Expression::Binary(BinaryOperator::new(
        BinaryOp::Implies,
        a,
        b,
    )?))
}

/// Build `(a iff b)`.
pub fn equivalence(a: Expression, b: Expression) -> Result<Expression, TypeError> {
    Ok(Expression::Binary(BinaryOperator::new(BinaryOp::Iff, a, b)?))
}

/// Build `(not a)`.
pub fn negation(a: Expression) -> Result<Expression, TypeError> {
    Ok(Expression::Unary(UnaryOperator::new(UnaryOp::Not, a)?))
}
