//! Value nodes: literals, message references, sets and ranges.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::TypeError;
use crate::schema::SchemaRef;
use crate::types::TypeSet;

use super::{BindingId, Expression, check_type};

/// The concrete value of a literal token.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl LiteralValue {
    fn type_set(&self) -> TypeSet {
        match self {
            LiteralValue::Boolean(_) => TypeSet::BOOLEAN,
            LiteralValue::Integer(_) | LiteralValue::Float(_) => TypeSet::NUMBER,
            LiteralValue::String(_) => TypeSet::STRING,
        }
    }

    /// The value as an array index, when it is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            LiteralValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// A literal constant: its source token and its value.
///
/// The type set is the singleton matching the value. Equality and hashing
/// use the token, so `1.0` and `1.00` are distinct literals.
#[derive(Debug, Clone)]
pub struct Literal {
    token: String,
    value: LiteralValue,
    pub(crate) types: Cell<TypeSet>,
}

impl Literal {
    /// Create a literal from a source token and its parsed value.
    pub fn new(token: impl Into<String>, value: LiteralValue) -> Self {
        let types = Cell::new(value.type_set());
        Self {
            token: token.into(),
            value,
            types,
        }
    }

    /// Boolean literal with the canonical token.
    pub fn boolean(value: bool) -> Self {
        let token = if value { "True" } else { "False" };
        Self::new(token, LiteralValue::Boolean(value))
    }

    /// Integer literal with the canonical token.
    pub fn integer(value: i64) -> Self {
        Self::new(value.to_string(), LiteralValue::Integer(value))
    }

    /// Float literal with the canonical token.
    pub fn float(value: f64) -> Self {
        Self::new(value.to_string(), LiteralValue::Float(value))
    }

    /// String literal with a quoted token.
    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(format!("\"{}\"", value), LiteralValue::String(value))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn value(&self) -> &LiteralValue {
        &self.value
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

/// The implicit current message of the enclosing event.
///
/// Displays as the empty string, so `.x` accessor chains render as `x`.
#[derive(Debug, Clone)]
pub struct ThisMessage {
    pub(crate) types: Cell<TypeSet>,
    pub(crate) schema_type: RefCell<Option<SchemaRef>>,
}

impl ThisMessage {
    pub fn new() -> Self {
        Self {
            types: Cell::new(TypeSet::MESSAGE),
            schema_type: RefCell::new(None),
        }
    }

    /// The message schema resolved during refinement, if any.
    pub fn schema_type(&self) -> Option<SchemaRef> {
        self.schema_type.borrow().clone()
    }
}

impl fmt::Display for ThisMessage {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

impl PartialEq for ThisMessage {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for ThisMessage {}

/// A reference to an external alias or quantified variable, `@name`.
///
/// The token keeps the `@` sigil; [`VarReference::name`] strips it. The
/// initial type set is [`TypeSet::ITEM`]: the reference could be any
/// primitive or a message until its uses narrow it.
#[derive(Debug, Clone)]
pub struct VarReference {
    token: String,
    pub(crate) types: Cell<TypeSet>,
    pub(crate) defined_at: Cell<Option<BindingId>>,
    pub(crate) schema_type: RefCell<Option<SchemaRef>>,
}

impl VarReference {
    /// Create a reference to the given name (without the sigil).
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            token: format!("@{}", name.as_ref()),
            types: Cell::new(TypeSet::ITEM),
            defined_at: Cell::new(None),
            schema_type: RefCell::new(None),
        }
    }

    /// The source token, sigil included.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The referenced name, sigil stripped.
    pub fn name(&self) -> &str {
        &self.token[1..]
    }

    /// Check whether a quantifier has bound this occurrence.
    pub fn is_defined(&self) -> bool {
        self.defined_at.get().is_some()
    }

    /// The binding site of this occurrence, if bound.
    pub fn defined_at(&self) -> Option<BindingId> {
        self.defined_at.get()
    }

    /// The message schema resolved during refinement, if any.
    pub fn schema_type(&self) -> Option<SchemaRef> {
        self.schema_type.borrow().clone()
    }
}

impl fmt::Display for VarReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl PartialEq for VarReference {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for VarReference {}

impl Hash for VarReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

/// An enumerated set of primitive values, `{a, b, c}`.
#[derive(Debug, Clone)]
pub struct SetLiteral {
    pub(crate) values: Vec<Expression>,
    pub(crate) types: Cell<TypeSet>,
}

impl SetLiteral {
    /// Create a set literal, casting every element to a primitive type.
    pub fn new(values: Vec<Expression>) -> Result<Self, TypeError> {
        let set = Self {
            values,
            types: Cell::new(TypeSet::SET),
        };
        for value in &set.values {
            check_type(&set, value, TypeSet::PRIMITIVE)?;
        }
        Ok(set)
    }

    pub fn values(&self) -> &[Expression] {
        &self.values
    }

    /// Union of the element type sets; the type a membership test or a
    /// quantified variable over this set can have.
    pub fn subtypes(&self) -> TypeSet {
        self.values
            .iter()
            .fold(TypeSet::EMPTY, |acc, v| acc.union(v.types()))
    }
}

impl fmt::Display for SetLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "}}")
    }
}

impl PartialEq for SetLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for SetLiteral {}

impl Hash for SetLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in &self.values {
            value.hash(state);
        }
    }
}

/// A numeric interval with optionally exclusive bounds, `[lo to hi]`.
#[derive(Debug, Clone)]
pub struct RangeLiteral {
    pub(crate) min: Box<Expression>,
    pub(crate) max: Box<Expression>,
    exclude_min: bool,
    exclude_max: bool,
    pub(crate) types: Cell<TypeSet>,
}

impl RangeLiteral {
    /// Create a range, casting both bounds to numbers.
    pub fn new(
        min: Expression,
        max: Expression,
        exclude_min: bool,
        exclude_max: bool,
    ) -> Result<Self, TypeError> {
        let range = Self {
            min: Box::new(min),
            max: Box::new(max),
            exclude_min,
            exclude_max,
            types: Cell::new(TypeSet::RANGE),
        };
        check_type(&range, &range.min, TypeSet::NUMBER)?;
        check_type(&range, &range.max, TypeSet::NUMBER)?;
        Ok(range)
    }

    /// Inclusive range over both bounds.
    pub fn inclusive(min: Expression, max: Expression) -> Result<Self, TypeError> {
        Self::new(min, max, false, false)
    }

    pub fn min(&self) -> &Expression {
        &self.min
    }

    pub fn max(&self) -> &Expression {
        &self.max
    }

    pub fn excludes_min(&self) -> bool {
        self.exclude_min
    }

    pub fn excludes_max(&self) -> bool {
        self.exclude_max
    }

    /// The type a quantified variable over this range has.
    pub fn subtypes(&self) -> TypeSet {
        TypeSet::NUMBER
    }
}

impl fmt::Display for RangeLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lp = if self.exclude_min { "![" } else { "[" };
        let rp = if self.exclude_max { "]!" } else { "]" };
        write!(f, "{}{} to {}{}", lp, self.min, self.max, rp)
    }
}

impl PartialEq for RangeLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min
            && self.max == other.max
            && self.exclude_min == other.exclude_min
            && self.exclude_max == other.exclude_max
    }
}

impl Eq for RangeLiteral {}

impl Hash for RangeLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.min.hash(state);
        self.max.hash(state);
        self.exclude_min.hash(state);
        self.exclude_max.hash(state);
    }
}
