//! Unary and binary operator nodes and their fixed typing tables.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::TypeError;
use crate::types::TypeSet;

use super::{Expression, check_type, node_hash};

/// The two unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Numeric negation, `-`.
    Minus,
    /// Boolean negation, `not`.
    Not,
}

impl UnaryOp {
    /// The operator's source symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Not => "not",
        }
    }

    /// Look an operator up by its source symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "-" => Some(UnaryOp::Minus),
            "not" => Some(UnaryOp::Not),
            _ => None,
        }
    }

    /// (operand type, result type)
    pub fn signature(self) -> (TypeSet, TypeSet) {
        match self {
            UnaryOp::Minus => (TypeSet::NUMBER, TypeSet::NUMBER),
            UnaryOp::Not => (TypeSet::BOOLEAN, TypeSet::BOOLEAN),
        }
    }
}

/// A unary operator applied to one operand.
#[derive(Debug, Clone)]
pub struct UnaryOperator {
    op: UnaryOp,
    pub(crate) operand: Box<Expression>,
    pub(crate) types: Cell<TypeSet>,
}

impl UnaryOperator {
    /// Apply an operator, casting the operand to the operator's input type.
    pub fn new(op: UnaryOp, operand: Expression) -> Result<Self, TypeError> {
        let (input, output) = op.signature();
        let node = Self {
            op,
            operand: Box::new(operand),
            types: Cell::new(output),
        };
        check_type(&node, &node.operand, input)?;
        Ok(node)
    }

    pub fn op(&self) -> UnaryOp {
        self.op
    }

    pub fn operand(&self) -> &Expression {
        &self.operand
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.op.symbol();
        let space = if symbol.ends_with(|c: char| c.is_alphabetic()) {
            " "
        } else {
            ""
        };
        write!(f, "({}{}{})", symbol, space, self.operand)
    }
}

impl PartialEq for UnaryOperator {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.operand == other.operand
    }
}

impl Eq for UnaryOperator {}

impl Hash for UnaryOperator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        self.operand.hash(state);
    }
}

/// The fixed binary operator alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    And,
    Or,
    Implies,
    Iff,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    In,
}

impl BinaryOp {
    /// The operator's source symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "**",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Implies => "implies",
            BinaryOp::Iff => "iff",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::In => "in",
        }
    }

    /// Look an operator up by its source symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Subtract),
            "*" => Some(BinaryOp::Multiply),
            "/" => Some(BinaryOp::Divide),
            "**" => Some(BinaryOp::Power),
            "and" => Some(BinaryOp::And),
            "or" => Some(BinaryOp::Or),
            "implies" => Some(BinaryOp::Implies),
            "iff" => Some(BinaryOp::Iff),
            "=" => Some(BinaryOp::Equal),
            "!=" => Some(BinaryOp::NotEqual),
            "<" => Some(BinaryOp::LessThan),
            "<=" => Some(BinaryOp::LessOrEqual),
            ">" => Some(BinaryOp::GreaterThan),
            ">=" => Some(BinaryOp::GreaterOrEqual),
            "in" => Some(BinaryOp::In),
            _ => None,
        }
    }

    /// (left type, right type, result type)
    pub fn signature(self) -> (TypeSet, TypeSet, TypeSet) {
        match self {
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide
            | BinaryOp::Power => (TypeSet::NUMBER, TypeSet::NUMBER, TypeSet::NUMBER),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Implies | BinaryOp::Iff => {
                (TypeSet::BOOLEAN, TypeSet::BOOLEAN, TypeSet::BOOLEAN)
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                (TypeSet::PRIMITIVE, TypeSet::PRIMITIVE, TypeSet::BOOLEAN)
            }
            BinaryOp::LessThan | BinaryOp::LessOrEqual | BinaryOp::GreaterThan
            | BinaryOp::GreaterOrEqual => (TypeSet::NUMBER, TypeSet::NUMBER, TypeSet::BOOLEAN),
            BinaryOp::In => (
                TypeSet::PRIMITIVE,
                TypeSet::SET.union(TypeSet::RANGE),
                TypeSet::BOOLEAN,
            ),
        }
    }

    /// Check whether the operator renders between its operands.
    pub fn is_infix(self) -> bool {
        true
    }

    /// Check whether swapped operands denote the same expression.
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Multiply
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Iff
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        )
    }

    /// Check whether the operands must narrow to a common type.
    fn requires_compatible_operands(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }
}

/// A binary operator applied to two operands.
///
/// Equality of commutative nodes ignores operand order.
#[derive(Debug, Clone)]
pub struct BinaryOperator {
    op: BinaryOp,
    pub(crate) left: Box<Expression>,
    pub(crate) right: Box<Expression>,
    pub(crate) types: Cell<TypeSet>,
}

impl BinaryOperator {
    /// Apply an operator, casting both operands to the operator's input
    /// types. Equality operators additionally narrow both operands to their
    /// common types, so `@x = 5` types `@x` as a number.
    pub fn new(op: BinaryOp, left: Expression, right: Expression) -> Result<Self, TypeError> {
        let (tl, tr, output) = op.signature();
        let node = Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
            types: Cell::new(output),
        };
        check_type(&node, &node.left, tl)?;
        check_type(&node, &node.right, tr)?;
        if op.requires_compatible_operands() {
            let common = node.left.types().intersection(node.right.types());
            check_type(&node, &node.left, common)?;
            check_type(&node, &node.right, common)?;
        }
        Ok(node)
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.is_infix() {
            write!(f, "({} {} {})", self.left, self.op.symbol(), self.right)
        } else {
            write!(f, "{}({}, {})", self.op.symbol(), self.left, self.right)
        }
    }
}

impl PartialEq for BinaryOperator {
    fn eq(&self, other: &Self) -> bool {
        if self.op != other.op {
            return false;
        }
        if self.left == other.left && self.right == other.right {
            return true;
        }
        self.op.is_commutative() && self.left == other.right && self.right == other.left
    }
}

impl Eq for BinaryOperator {}

impl Hash for BinaryOperator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        if self.op.is_commutative() {
            // order-independent, to stay consistent with equality
            let combined =
                node_hash(self.left.as_ref()).wrapping_add(node_hash(self.right.as_ref()));
            combined.hash(state);
        } else {
            self.left.hash(state);
            self.right.hash(state);
        }
    }
}
