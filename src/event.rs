//! Events: topic occurrences with predicates, and disjunctions of them.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{Error, SanityError, TypeError};
use crate::expr::node_hash;
use crate::predicate::Predicate;
use crate::schema::SchemaRef;

/// A message published on one topic, with an optional alias and a predicate
/// over the message contents.
///
/// When an alias is given, references to `@alias` inside the predicate are
/// rewritten to the implicit own message at construction, so `@p.x` inside
/// the event that introduces `p` reads the event's own message.
#[derive(Debug, Clone)]
pub struct SimpleEvent {
    topic: String,
    alias: Option<String>,
    predicate: Predicate,
    message_type: RefCell<Option<SchemaRef>>,
}

impl SimpleEvent {
    /// Create an event over a topic.
    pub fn new(
        topic: impl Into<String>,
        mut predicate: Predicate,
        alias: Option<String>,
    ) -> Self {
        if let Some(alias) = &alias {
            predicate.replace_self_reference(alias);
        }
        Self {
            topic: topic.into(),
            alias,
            predicate,
            message_type: RefCell::new(None),
        }
    }

    /// An unconstrained event over a topic.
    pub fn publish(topic: impl Into<String>) -> Self {
        Self::new(topic, Predicate::vacuous_truth(), None)
    }

    /// Attach a pre-resolved message type.
    pub fn with_message_type(self, schema: SchemaRef) -> Self {
        *self.message_type.borrow_mut() = Some(schema);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The resolved message type, if construction or refinement set one.
    pub fn message_type(&self) -> Option<SchemaRef> {
        self.message_type.borrow().clone()
    }

    /// The aliases this event defines.
    pub fn aliases(&self) -> Vec<&str> {
        self.alias.as_deref().into_iter().collect()
    }

    /// External aliases the predicate references, excluding this event's own.
    pub fn external_references(&self) -> HashSet<&str> {
        let mut refs = self.predicate.external_references();
        if let Some(alias) = &self.alias {
            refs.remove(alias.as_str());
        }
        refs
    }

    /// Check whether the predicate references the given alias.
    pub fn contains_reference(&self, alias: &str) -> bool {
        self.predicate.contains_reference(alias)
    }

    /// Refine the predicate against this event's message schema.
    ///
    /// A second refinement with an equal schema is a no-op; a conflicting
    /// one is an error.
    pub fn refine_types(
        &self,
        schema: &SchemaRef,
        aliases: &HashMap<String, SchemaRef>,
    ) -> Result<(), Error> {
        if let Some(previous) = self.message_type() {
            if previous.same_as(schema.as_ref()) {
                return Ok(());
            }
            return Err(TypeError::AlreadyDefined {
                topic: self.topic.clone(),
                previous: previous.type_name().to_string(),
                new: schema.type_name().to_string(),
            }
            .into());
        }
        tracing::trace!("refining event {} against {}", self, schema.type_name());
        self.predicate.refine_types(schema, aliases)?;
        *self.message_type.borrow_mut() = Some(schema.clone());
        Ok(())
    }
}

impl fmt::Display for SimpleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {} {}", self.topic, alias, self.predicate),
            None => write!(f, "{} {}", self.topic, self.predicate),
        }
    }
}

impl PartialEq for SimpleEvent {
    fn eq(&self, other: &Self) -> bool {
        if self.topic != other.topic || self.predicate != other.predicate {
            return false;
        }
        match (self.message_type(), other.message_type()) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_as(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for SimpleEvent {}

impl Hash for SimpleEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.topic.hash(state);
        self.predicate.hash(state);
    }
}

/// Two events either of which may occur.
///
/// Every simple event under a disjunction must use a distinct topic.
/// Equality ignores operand order.
#[derive(Debug, Clone)]
pub struct EventDisjunction {
    left: Box<Event>,
    right: Box<Event>,
}

impl EventDisjunction {
    /// Join two events, rejecting duplicate topics across all leaves.
    pub fn new(left: Event, right: Event) -> Result<Self, SanityError> {
        let disjunction = Self {
            left: Box::new(left),
            right: Box::new(right),
        };
        let mut topics = HashSet::new();
        for event in disjunction.simple_events() {
            if !topics.insert(event.topic()) {
                return Err(SanityError::duplicate_topic(event.topic()));
            }
        }
        Ok(disjunction)
    }

    pub fn left(&self) -> &Event {
        &self.left
    }

    pub fn right(&self) -> &Event {
        &self.right
    }

    fn simple_events(&self) -> Vec<&SimpleEvent> {
        let mut events = self.left.simple_events();
        events.extend(self.right.simple_events());
        events
    }
}

impl fmt::Display for EventDisjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} or {})", self.left, self.right)
    }
}

impl PartialEq for EventDisjunction {
    fn eq(&self, other: &Self) -> bool {
        (self.left == other.left && self.right == other.right)
            || (self.left == other.right && self.right == other.left)
    }
}

impl Eq for EventDisjunction {}

impl Hash for EventDisjunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // order-independent, to stay consistent with equality
        let combined = node_hash(self.left.as_ref()).wrapping_add(node_hash(self.right.as_ref()));
        combined.hash(state);
    }
}

/// An event slot of a scope or pattern: one topic occurrence or a
/// disjunction of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Simple(SimpleEvent),
    Disjunction(EventDisjunction),
}

impl Event {
    /// Check whether this is a single topic occurrence.
    pub fn is_simple(&self) -> bool {
        matches!(self, Event::Simple(_))
    }

    /// Check whether this is a disjunction.
    pub fn is_disjunction(&self) -> bool {
        matches!(self, Event::Disjunction(_))
    }

    /// All simple events under this node, left to right.
    pub fn simple_events(&self) -> Vec<&SimpleEvent> {
        match self {
            Event::Simple(e) => vec![e],
            Event::Disjunction(d) => d.simple_events(),
        }
    }

    /// The aliases defined across all simple events, left to right.
    pub fn aliases(&self) -> Vec<&str> {
        self.simple_events()
            .into_iter()
            .flat_map(|e| e.aliases())
            .collect()
    }

    /// External aliases referenced across all simple events.
    pub fn external_references(&self) -> HashSet<&str> {
        self.simple_events()
            .into_iter()
            .flat_map(|e| e.external_references())
            .collect()
    }

    /// Check whether any predicate references the given alias.
    pub fn contains_reference(&self, alias: &str) -> bool {
        self.simple_events()
            .into_iter()
            .any(|e| e.contains_reference(alias))
    }

    /// Check whether every simple event's predicate is fully typed.
    pub fn is_fully_typed(&self) -> bool {
        self.simple_events()
            .into_iter()
            .all(|e| e.predicate().is_fully_typed())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Simple(e) => e.fmt(f),
            Event::Disjunction(d) => d.fmt(f),
        }
    }
}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Event::Simple(e) => e.hash(state),
            Event::Disjunction(d) => d.hash(state),
        }
    }
}
