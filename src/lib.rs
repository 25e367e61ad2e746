//! # prospect-base
//!
//! Core library for a temporal property language over publish/subscribe
//! message channels: AST, sanity checking, and schema-driven type
//! refinement.
//!
//! A specification is a collection of properties; each property combines a
//! scope (when the property is active) with a pattern (what must or must
//! not occur) over events that carry predicates on message contents.
//! Constructors validate eagerly: expression nodes narrow their children's
//! bit-set types, predicates check reference consistency, disjunctions
//! reject duplicate topics, and properties run an alias dataflow across
//! their event slots. A second pass refines expressions against an external
//! message-schema catalogue.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! visitor    → AstRef, generic pre-order walks, Visitor dispatch
//!   ↓
//! property   → Scope, Pattern, Property, Specification, sanity dataflow
//!   ↓
//! event      → SimpleEvent, disjunctions, alias accounting
//!   ↓
//! predicate  → Predicate, structural checks, refinement walk
//!   ↓
//! expr       → Expression nodes, operator/function tables, quantifiers
//!   ↓
//! schema     → SchemaType interface, catalogue building blocks
//!   ↓
//! types      → TypeSet bitmask lattice
//!   ↓
//! errors     → SanityError / TypeError taxonomy
//! ```
//!
//! The concrete grammar and parser, the schema registry, and visitor-based
//! backends are external collaborators; this crate defines the interfaces
//! they need.

// ============================================================================
// MODULES (dependency order: errors → types → schema → expr → … → visitor)
// ============================================================================

/// Error taxonomy: sanity (structural) and type families
pub mod errors;

/// Bitmask type lattice
pub mod types;

/// Message schema interface and catalogue building blocks
pub mod schema;

/// Expression nodes and their constructor-time type checks
pub mod expr;

/// Predicates and their structural/refinement passes
pub mod predicate;

/// Simple events and event disjunctions
pub mod event;

/// Scopes, patterns, properties and specifications
pub mod property;

/// Generic tree walks and the visitor protocol
pub mod visitor;

// Re-export the working vocabulary
pub use errors::{Error, SanityError, TypeError};
pub use event::{Event, EventDisjunction, SimpleEvent};
pub use expr::{Expression, Literal, LiteralValue, Quantifier, VarReference};
pub use predicate::Predicate;
pub use property::{Pattern, PatternKind, Property, Scope, Specification};
pub use schema::{SchemaRef, SchemaType};
pub use types::TypeSet;
pub use visitor::{AstRef, Visitor, walk};
