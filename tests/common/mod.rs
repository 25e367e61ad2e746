//! Shared builders for integration tests: predicates, events, and schema
//! catalogues.

#![allow(dead_code)]

use std::collections::HashMap;

use prospect::expr::{BinaryOp, BinaryOperator, Expression, FieldAccess, Literal, VarReference};
use prospect::schema::{ArraySchema, MessageSchema, ScalarSchema, SchemaRef};
use prospect::{Event, Predicate, SimpleEvent};

/// `field` as an access on the implicit own message.
pub fn own_field(name: &str) -> Expression {
    Expression::Field(FieldAccess::own_field(name))
}

pub fn int(value: i64) -> Expression {
    Expression::Literal(Literal::integer(value))
}

pub fn var(name: &str) -> Expression {
    Expression::Variable(VarReference::new(name))
}

/// `@alias.field` as an expression.
pub fn alias_field(alias: &str, field: &str) -> Expression {
    Expression::Field(FieldAccess::new(var(alias), field).expect("variable can be a message"))
}

/// Predicate `{ (field > value) }`.
pub fn field_gt(field: &str, value: i64) -> Predicate {
    let cmp = BinaryOperator::new(BinaryOp::GreaterThan, own_field(field), int(value))
        .expect("comparison over a field");
    Predicate::new(Expression::Binary(cmp)).expect("valid predicate")
}

/// Predicate `{ (field = @alias.remote) }`: an own-field reference tied to
/// an external alias.
pub fn field_eq_alias(field: &str, alias: &str, remote: &str) -> Predicate {
    let eq = BinaryOperator::new(
        BinaryOp::Equal,
        own_field(field),
        alias_field(alias, remote),
    )
    .expect("equality over compatible references");
    Predicate::new(Expression::Binary(eq)).expect("valid predicate")
}

/// An unconstrained event over a topic.
pub fn event(topic: &str) -> Event {
    Event::Simple(SimpleEvent::publish(topic))
}

/// An unconstrained event with an alias.
pub fn aliased(topic: &str, alias: &str) -> Event {
    Event::Simple(SimpleEvent::new(
        topic,
        Predicate::vacuous_truth(),
        Some(alias.to_string()),
    ))
}

/// A message type with a single numeric field.
pub fn message_with_number(name: &str, field: &str) -> SchemaRef {
    MessageSchema::new(name)
        .with_field(field, ScalarSchema::number())
        .into_ref()
}

/// A message type with a numeric field and a bounded numeric array.
pub fn message_with_array(name: &str, field: &str, array: &str, length: usize) -> SchemaRef {
    MessageSchema::new(name)
        .with_field(field, ScalarSchema::number())
        .with_field(
            array,
            ArraySchema::bounded(ScalarSchema::number(), length).into_ref(),
        )
        .into_ref()
}

/// A topic catalogue from `(topic, schema)` pairs.
pub fn topics(pairs: Vec<(&str, SchemaRef)>) -> HashMap<String, SchemaRef> {
    pairs
        .into_iter()
        .map(|(topic, schema)| (topic.to_string(), schema))
        .collect()
}

pub fn no_aliases() -> HashMap<String, SchemaRef> {
    HashMap::new()
}
