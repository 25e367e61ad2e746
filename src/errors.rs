//! Error types for property construction and analysis.
//!
//! Two disjoint families, both fatal at the call site that constructs the
//! offending node or runs the analysis:
//! - [`SanityError`]: structural and scoping violations (alias dataflow,
//!   duplicate topics, quantifier variable hygiene).
//! - [`TypeError`]: bitmask narrowing failures and schema mismatches.
//!
//! Every message carries the stringification of the offending sub-expression.

use thiserror::Error;

/// Structural or scoping violations detected without consulting schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanityError {
    /// A predicate references an alias no preceding event defines.
    #[error("reference to undefined event: '{0}'")]
    UndefinedEventReference(String),

    /// An event defines an alias that is already in scope.
    #[error("duplicate alias: '{0}'")]
    DuplicateAlias(String),

    /// The same topic occurs on both sides of an event disjunction.
    #[error("topic '{0}' appears multiple times in an event disjunction")]
    DuplicateTopic(String),

    /// A quantifier's domain mentions the variable it binds.
    #[error("cannot reference quantified variable '{variable}' in the domain of: {quantifier}")]
    VariableInDomain { variable: String, quantifier: String },

    /// A bound variable occurrence is rebound without permission.
    #[error("multiple definitions of variable '{variable}' in: {quantifier}")]
    MultipleDefinitions { variable: String, quantifier: String },

    /// A quantified variable never occurs in the quantifier body.
    #[error("quantified variable '{variable}' is never used in: {quantifier}")]
    UnusedVariable { variable: String, quantifier: String },

    /// A predicate contains no field reference rooted at the own message.
    #[error("there are no references to any fields of this message: {0}")]
    NoFieldReferences(String),

    /// A pattern time window with a negative lower bound.
    #[error("negative lower time bound: {0}s")]
    NegativeTimeBound(String),

    /// Refinement found an accessor base alias with no schema binding.
    #[error("undefined message alias: '{0}'")]
    UndefinedAlias(String),
}

impl SanityError {
    /// Create an undefined-event-reference error.
    pub fn undefined_event(alias: impl Into<String>) -> Self {
        Self::UndefinedEventReference(alias.into())
    }

    /// Create a duplicate-alias error.
    pub fn duplicate_alias(alias: impl Into<String>) -> Self {
        Self::DuplicateAlias(alias.into())
    }

    /// Create a duplicate-topic error.
    pub fn duplicate_topic(topic: impl Into<String>) -> Self {
        Self::DuplicateTopic(topic.into())
    }
}

/// Type discipline violations: failed narrowing, schema mismatches,
/// unresolvable calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    /// Narrowing produced an empty intersection.
    #[error("expected ({expected}) but found ({found}): {expression}")]
    Mismatch {
        expected: String,
        found: String,
        expression: String,
    },

    /// Removing a type emptied the set.
    #[error("no types left: {0}")]
    NoTypesLeft(String),

    /// A nested type error, annotated with the enclosing expression.
    #[error("type error in expression '{expression}': {source}")]
    InExpression {
        expression: String,
        #[source]
        source: Box<TypeError>,
    },

    /// Indexing into an expression that is already an array element.
    #[error("multi-dimensional array access: '{array}[{index}]'")]
    MultiDimensionalAccess { array: String, index: String },

    /// A call to a name outside the builtin table.
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),

    /// No overload of a builtin matches the argument types.
    #[error("function '{function}' expects {expected}, but got {found}")]
    SignatureMismatch {
        function: String,
        expected: String,
        found: String,
    },

    /// Refinement was given no schema for a topic.
    #[error("unknown topic: '{0}'")]
    UnknownTopic(String),

    /// An event already carries a different message type.
    #[error("message type already defined for '{topic}': expected '{previous}', found '{new}'")]
    AlreadyDefined {
        topic: String,
        previous: String,
        new: String,
    },

    /// A field access does not exist in the schema type of its parent.
    #[error("no field '{field}' in type '{schema}': {expression}")]
    UnknownField {
        field: String,
        schema: String,
        expression: String,
    },

    /// An array access over a schema type that is not an array.
    #[error("not an array type '{schema}': {expression}")]
    NotAnArray { schema: String, expression: String },

    /// A literal index outside the declared bounds of an array.
    #[error("array index {index} out of range for type '{schema}': {expression}")]
    IndexOutOfRange {
        index: String,
        schema: String,
        expression: String,
    },

    /// An accessor base alias resolved to a non-message schema type.
    #[error("alias '{alias}' does not resolve to a message type: '{schema}'")]
    NotAMessage { alias: String, schema: String },

    /// A predicate condition that cannot be boolean.
    #[error("not a boolean expression: {0}")]
    NotBoolean(String),
}

impl TypeError {
    /// Wrap a type error with the enclosing expression it occurred in.
    pub fn in_expression(expression: impl Into<String>, source: TypeError) -> Self {
        Self::InExpression {
            expression: expression.into(),
            source: Box::new(source),
        }
    }

    /// Create an unknown-field error.
    pub fn unknown_field(
        field: impl Into<String>,
        schema: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::UnknownField {
            field: field.into(),
            schema: schema.into(),
            expression: expression.into(),
        }
    }

    /// Create a not-an-array error.
    pub fn not_an_array(schema: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::NotAnArray {
            schema: schema.into(),
            expression: expression.into(),
        }
    }
}

/// Union of the two error families, for call sites that can raise either.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Sanity(#[from] SanityError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl Error {
    /// Check whether this is a sanity (structural) error.
    pub fn is_sanity(&self) -> bool {
        matches!(self, Self::Sanity(_))
    }

    /// Check whether this is a type error.
    pub fn is_type(&self) -> bool {
        matches!(self, Self::Type(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanity_error_messages() {
        let err = SanityError::duplicate_topic("/odom");
        assert_eq!(
            err.to_string(),
            "topic '/odom' appears multiple times in an event disjunction"
        );

        let err = SanityError::undefined_event("t");
        assert_eq!(err.to_string(), "reference to undefined event: 't'");
    }

    #[test]
    fn test_type_error_context_wrapping() {
        let inner = TypeError::Mismatch {
            expected: "number".into(),
            found: "boolean".into(),
            expression: "x".into(),
        };
        let outer = TypeError::in_expression("(x + 1)", inner);
        let text = outer.to_string();
        assert!(text.contains("type error in expression '(x + 1)'"));
        assert!(text.contains("expected (number) but found (boolean): x"));
    }

    #[test]
    fn test_error_union_discrimination() {
        let err: Error = SanityError::duplicate_alias("m").into();
        assert!(err.is_sanity());
        assert!(!err.is_type());

        let err: Error = TypeError::UnknownTopic("/a".into()).into();
        assert!(err.is_type());
    }
}
