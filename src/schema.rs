//! Message schema interface consumed by type refinement.
//!
//! A [`SchemaType`] describes the concrete type of a topic's messages (or a
//! part of one): a message with named fields and constants, an array with an
//! element type and optional bounds, or a scalar. Refinement walks accessor
//! chains against these descriptions, narrowing bit-set types and annotating
//! nodes with the schema type reached at each step.
//!
//! [`MessageSchema`], [`ArraySchema`] and [`ScalarSchema`] are ready-made
//! implementations for building catalogues; external registries can plug in
//! their own types by implementing the trait.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// Shared handle to a schema type.
pub type SchemaRef = Arc<dyn SchemaType + Send + Sync>;

/// The concrete type of a message, field, array or constant, as an external
/// schema registry describes it.
pub trait SchemaType: fmt::Debug {
    /// Name of this type, for diagnostics and identity comparison.
    fn type_name(&self) -> &str;

    /// Check whether this is a message type with fields.
    fn is_message(&self) -> bool {
        false
    }

    /// Check whether this is an array type.
    fn is_array(&self) -> bool {
        false
    }

    /// Check whether this is a numeric type.
    fn is_number(&self) -> bool {
        false
    }

    /// Check whether this is a boolean type.
    fn is_bool(&self) -> bool {
        false
    }

    /// Check whether this is a string type.
    fn is_string(&self) -> bool {
        false
    }

    /// Look up the type of a named field, for message types.
    fn field(&self, _name: &str) -> Option<SchemaRef> {
        None
    }

    /// Look up the type of a named constant, for message types.
    fn constant(&self, _name: &str) -> Option<SchemaRef> {
        None
    }

    /// The element type, for array types.
    fn element_type(&self) -> Option<SchemaRef> {
        None
    }

    /// Check whether a literal index is valid for this array.
    ///
    /// Unbounded arrays accept every index; the check is active only when
    /// the schema declares bounds.
    fn contains_index(&self, _index: i64) -> bool {
        true
    }

    /// Identity comparison between schema types.
    fn same_as(&self, other: &dyn SchemaType) -> bool {
        self.type_name() == other.type_name()
    }
}

/// A message type: named fields and named constants, each with a type.
#[derive(Debug, Clone, Default)]
pub struct MessageSchema {
    name: String,
    fields: IndexMap<String, SchemaRef>,
    constants: IndexMap<String, SchemaRef>,
}

impl MessageSchema {
    /// Create an empty message type with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            constants: IndexMap::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, schema: SchemaRef) -> Self {
        self.fields.insert(name.into(), schema);
        self
    }

    /// Add a named constant.
    pub fn with_constant(mut self, name: impl Into<String>, schema: SchemaRef) -> Self {
        self.constants.insert(name.into(), schema);
        self
    }

    /// Finish building and wrap in a shared handle.
    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl SchemaType for MessageSchema {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn is_message(&self) -> bool {
        true
    }

    fn field(&self, name: &str) -> Option<SchemaRef> {
        self.fields.get(name).cloned()
    }

    fn constant(&self, name: &str) -> Option<SchemaRef> {
        self.constants.get(name).cloned()
    }
}

/// An array type with an element type and optional declared length.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    name: String,
    element: SchemaRef,
    length: Option<usize>,
}

impl ArraySchema {
    /// Create an unbounded array of the given element type.
    pub fn unbounded(element: SchemaRef) -> Self {
        let name = format!("{}[]", element.type_name());
        Self {
            name,
            element,
            length: None,
        }
    }

    /// Create an array with a declared length.
    pub fn bounded(element: SchemaRef, length: usize) -> Self {
        let name = format!("{}[{}]", element.type_name(), length);
        Self {
            name,
            element,
            length: Some(length),
        }
    }

    /// Finish building and wrap in a shared handle.
    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl SchemaType for ArraySchema {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn is_array(&self) -> bool {
        true
    }

    fn element_type(&self) -> Option<SchemaRef> {
        Some(self.element.clone())
    }

    fn contains_index(&self, index: i64) -> bool {
        match self.length {
            Some(n) => index >= 0 && (index as usize) < n,
            None => true,
        }
    }
}

/// A scalar type: number, boolean or string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarSchema {
    kind: ScalarKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Number,
    Boolean,
    String,
}

impl ScalarSchema {
    /// Shared handle to the numeric scalar type.
    pub fn number() -> SchemaRef {
        Arc::new(Self {
            kind: ScalarKind::Number,
        })
    }

    /// Shared handle to the boolean scalar type.
    pub fn boolean() -> SchemaRef {
        Arc::new(Self {
            kind: ScalarKind::Boolean,
        })
    }

    /// Shared handle to the string scalar type.
    pub fn string() -> SchemaRef {
        Arc::new(Self {
            kind: ScalarKind::String,
        })
    }
}

impl SchemaType for ScalarSchema {
    fn type_name(&self) -> &str {
        match self.kind {
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
            ScalarKind::String => "string",
        }
    }

    fn is_number(&self) -> bool {
        self.kind == ScalarKind::Number
    }

    fn is_bool(&self) -> bool {
        self.kind == ScalarKind::Boolean
    }

    fn is_string(&self) -> bool {
        self.kind == ScalarKind::String
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_schema_lookup() {
        let schema = MessageSchema::new("Pose")
            .with_field("x", ScalarSchema::number())
            .with_field("frame", ScalarSchema::string())
            .with_constant("DIM", ScalarSchema::number())
            .into_ref();

        assert!(schema.is_message());
        assert!(schema.field("x").is_some_and(|t| t.is_number()));
        assert!(schema.field("frame").is_some_and(|t| t.is_string()));
        assert!(schema.field("missing").is_none());
        assert!(schema.constant("DIM").is_some_and(|t| t.is_number()));
    }

    #[test]
    fn test_array_bounds() {
        let bounded = ArraySchema::bounded(ScalarSchema::number(), 3).into_ref();
        assert!(bounded.is_array());
        assert!(bounded.contains_index(0));
        assert!(bounded.contains_index(2));
        assert!(!bounded.contains_index(3));
        assert!(!bounded.contains_index(-1));

        let unbounded = ArraySchema::unbounded(ScalarSchema::number()).into_ref();
        assert!(unbounded.contains_index(9999));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ScalarSchema::number().type_name(), "number");
        let arr = ArraySchema::bounded(ScalarSchema::string(), 4).into_ref();
        assert_eq!(arr.type_name(), "string[4]");
        assert_eq!(
            ArraySchema::unbounded(ScalarSchema::boolean()).type_name(),
            "boolean[]"
        );
    }

    #[test]
    fn test_identity_by_name() {
        let a = MessageSchema::new("Odometry").into_ref();
        let b = MessageSchema::new("Odometry")
            .with_field("x", ScalarSchema::number())
            .into_ref();
        let c = MessageSchema::new("Twist").into_ref();
        assert!(a.same_as(&*b));
        assert!(!a.same_as(&*c));
    }
}
