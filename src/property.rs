//! Properties: a temporal scope, a behavioral pattern, and the sanity
//! dataflow that ties their events' aliases together.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{Error, SanityError, TypeError};
use crate::event::{Event, SimpleEvent};
use crate::expr::node_hash;
use crate::schema::SchemaRef;

/// The temporal envelope during which a pattern's obligation is active.
///
/// The activator and terminator slots exist only on the variants that
/// require them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Active over the whole trace.
    Global,
    /// Active once the activator occurs.
    After(Event),
    /// Active until the terminator occurs.
    Until(Event),
    /// Active between the activator and the terminator.
    AfterUntil { activator: Event, terminator: Event },
}

impl Scope {
    /// The scope that is always active.
    pub fn globally() -> Self {
        Scope::Global
    }

    /// Active from the activator onwards.
    pub fn after(activator: Event) -> Self {
        Scope::After(activator)
    }

    /// Active up to the terminator.
    pub fn until(terminator: Event) -> Self {
        Scope::Until(terminator)
    }

    /// Active between activator and terminator.
    pub fn after_until(activator: Event, terminator: Event) -> Self {
        Scope::AfterUntil {
            activator,
            terminator,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }

    pub fn is_after(&self) -> bool {
        matches!(self, Scope::After(_))
    }

    pub fn is_until(&self) -> bool {
        matches!(self, Scope::Until(_))
    }

    pub fn is_after_until(&self) -> bool {
        matches!(self, Scope::AfterUntil { .. })
    }

    /// The event that opens the scope, if this variant has one.
    pub fn activator(&self) -> Option<&Event> {
        match self {
            Scope::After(e) => Some(e),
            Scope::AfterUntil { activator, .. } => Some(activator),
            _ => None,
        }
    }

    /// The event that closes the scope, if this variant has one.
    pub fn terminator(&self) -> Option<&Event> {
        match self {
            Scope::Until(e) => Some(e),
            Scope::AfterUntil { terminator, .. } => Some(terminator),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("globally"),
            Scope::After(e) => write!(f, "after {}", e),
            Scope::Until(e) => write!(f, "until {}", e),
            Scope::AfterUntil {
                activator,
                terminator,
            } => write!(f, "after {} until {}", activator, terminator),
        }
    }
}

/// The five pattern kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Existence,
    Absence,
    Response,
    Requirement,
    Prevention,
}

/// What must or must not occur while the scope is active, within an
/// optional time window.
///
/// A trigger exists only for the kinds that relate two events; the per-kind
/// constructors make invalid compositions unrepresentable.
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: PatternKind,
    behaviour: Event,
    trigger: Option<Event>,
    min_time: f64,
    max_time: f64,
}

impl Pattern {
    fn build(kind: PatternKind, behaviour: Event, trigger: Option<Event>) -> Self {
        Self {
            kind,
            behaviour,
            trigger,
            min_time: 0.0,
            max_time: f64::INFINITY,
        }
    }

    /// The behaviour must occur.
    pub fn existence(behaviour: Event) -> Self {
        Self::build(PatternKind::Existence, behaviour, None)
    }

    /// The behaviour must not occur.
    pub fn absence(behaviour: Event) -> Self {
        Self::build(PatternKind::Absence, behaviour, None)
    }

    /// After the trigger, the behaviour must occur.
    pub fn response(trigger: Event, behaviour: Event) -> Self {
        Self::build(PatternKind::Response, behaviour, Some(trigger))
    }

    /// The behaviour may occur only after the trigger.
    pub fn requirement(behaviour: Event, trigger: Event) -> Self {
        Self::build(PatternKind::Requirement, behaviour, Some(trigger))
    }

    /// After the trigger, the behaviour must not occur.
    pub fn prevention(trigger: Event, behaviour: Event) -> Self {
        Self::build(PatternKind::Prevention, behaviour, Some(trigger))
    }

    /// Constrain the time window. `max_time` may be infinite.
    ///
    /// A negative lower bound is rejected.
    pub fn with_time_bounds(mut self, min_time: f64, max_time: f64) -> Result<Self, SanityError> {
        if min_time < 0.0 {
            return Err(SanityError::NegativeTimeBound(min_time.to_string()));
        }
        self.min_time = min_time;
        self.max_time = max_time;
        Ok(self)
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn behaviour(&self) -> &Event {
        &self.behaviour
    }

    pub fn trigger(&self) -> Option<&Event> {
        self.trigger.as_ref()
    }

    pub fn min_time(&self) -> f64 {
        self.min_time
    }

    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    /// Check whether the lower time bound constrains anything.
    pub fn has_min_time(&self) -> bool {
        self.min_time > 0.0 && self.min_time.is_finite()
    }

    /// Check whether the upper time bound constrains anything.
    pub fn has_max_time(&self) -> bool {
        self.max_time >= 0.0 && self.max_time.is_finite()
    }

    /// Absence, Requirement and Prevention forbid behaviours.
    pub fn is_safety(&self) -> bool {
        matches!(
            self.kind,
            PatternKind::Absence | PatternKind::Requirement | PatternKind::Prevention
        )
    }

    /// Existence and Response demand behaviours.
    pub fn is_liveness(&self) -> bool {
        matches!(self.kind, PatternKind::Existence | PatternKind::Response)
    }

    pub fn is_existence(&self) -> bool {
        self.kind == PatternKind::Existence
    }

    pub fn is_absence(&self) -> bool {
        self.kind == PatternKind::Absence
    }

    pub fn is_response(&self) -> bool {
        self.kind == PatternKind::Response
    }

    pub fn is_requirement(&self) -> bool {
        self.kind == PatternKind::Requirement
    }

    pub fn is_prevention(&self) -> bool {
        self.kind == PatternKind::Prevention
    }
}

/// Relative-tolerance comparison for pattern time bounds.
fn time_close(a: f64, b: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= 1e-6 * f64::max(a.abs(), b.abs())
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let window = if self.max_time.is_finite() {
            format!(" within {}s", self.max_time)
        } else {
            String::new()
        };
        match self.kind {
            PatternKind::Existence => write!(f, "some {}{}", self.behaviour, window),
            PatternKind::Absence => write!(f, "no {}{}", self.behaviour, window),
            PatternKind::Response => write!(
                f,
                "{} causes {}{}",
                self.trigger.as_ref().expect("response has a trigger"),
                self.behaviour,
                window
            ),
            PatternKind::Requirement => write!(
                f,
                "{} requires {}{}",
                self.behaviour,
                self.trigger.as_ref().expect("requirement has a trigger"),
                window
            ),
            PatternKind::Prevention => write!(
                f,
                "{} forbids {}{}",
                self.trigger.as_ref().expect("prevention has a trigger"),
                self.behaviour,
                window
            ),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.behaviour == other.behaviour
            && self.trigger == other.trigger
            && time_close(self.min_time, other.min_time)
            && time_close(self.max_time, other.max_time)
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // time bounds compare with tolerance, so they stay out of the hash
        self.kind.hash(state);
        self.behaviour.hash(state);
        self.trigger.hash(state);
    }
}

/// A scope, a pattern, and opaque metadata.
#[derive(Debug, Clone)]
pub struct Property {
    scope: Scope,
    pattern: Pattern,
    metadata: HashMap<String, String>,
}

impl Property {
    /// Combine a scope and a pattern.
    pub fn new(scope: Scope, pattern: Pattern) -> Self {
        Self {
            scope,
            pattern,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// The property's identifier, when the metadata carries one.
    pub fn uid(&self) -> Option<&str> {
        self.metadata.get("id").map(String::as_str)
    }

    pub fn is_safety(&self) -> bool {
        self.pattern.is_safety()
    }

    pub fn is_liveness(&self) -> bool {
        self.pattern.is_liveness()
    }

    /// Every event slot, in alias-scope order: activator, behaviour,
    /// trigger, terminator.
    pub fn events(&self) -> Vec<&Event> {
        let mut events = Vec::new();
        if let Some(activator) = self.scope.activator() {
            events.push(activator);
        }
        events.push(self.pattern.behaviour());
        if let Some(trigger) = self.pattern.trigger() {
            events.push(trigger);
        }
        if let Some(terminator) = self.scope.terminator() {
            events.push(terminator);
        }
        events
    }

    /// Simple events grouped by topic.
    pub fn events_by_topic(&self) -> HashMap<&str, Vec<&SimpleEvent>> {
        let mut map: HashMap<&str, Vec<&SimpleEvent>> = HashMap::new();
        for event in self.events() {
            for e in event.simple_events() {
                map.entry(e.topic()).or_default().push(e);
            }
        }
        map
    }

    /// Check whether every predicate in the property is fully typed.
    pub fn is_fully_typed(&self) -> bool {
        self.events().into_iter().all(Event::is_fully_typed)
    }

    /// Validate alias scoping across the property's events.
    ///
    /// The activator's aliases seed the available set; the pattern's
    /// primary event is checked next and extends it; the dependent event
    /// sees the extended set; the terminator sees the initial aliases only.
    pub fn sanity_check(&self) -> Result<(), SanityError> {
        tracing::debug!("sanity checking property: {}", self);
        let initial = self.check_activator()?;
        match self.pattern.kind() {
            PatternKind::Existence | PatternKind::Absence => {
                self.check_event(self.pattern.behaviour(), &initial)?;
            }
            PatternKind::Requirement => {
                let available = self.check_event(self.pattern.behaviour(), &initial)?;
                if let Some(trigger) = self.pattern.trigger() {
                    self.check_event(trigger, &available)?;
                }
            }
            PatternKind::Response | PatternKind::Prevention => {
                let available = match self.pattern.trigger() {
                    Some(trigger) => self.check_event(trigger, &initial)?,
                    None => initial.clone(),
                };
                self.check_event(self.pattern.behaviour(), &available)?;
            }
        }
        self.check_terminator(&initial)
    }

    fn check_activator(&self) -> Result<Vec<&str>, SanityError> {
        let Some(activator) = self.scope.activator() else {
            return Ok(Vec::new());
        };
        let mut refs: Vec<&str> = activator.external_references().into_iter().collect();
        refs.sort_unstable();
        if let Some(undefined) = refs.first() {
            return Err(SanityError::undefined_event(*undefined));
        }
        Ok(activator.aliases())
    }

    fn check_event<'a>(
        &'a self,
        event: &'a Event,
        available: &[&'a str],
    ) -> Result<Vec<&'a str>, SanityError> {
        let mut refs: Vec<&str> = event.external_references().into_iter().collect();
        refs.sort_unstable();
        for reference in refs {
            if !available.contains(&reference) {
                return Err(SanityError::undefined_event(reference));
            }
        }
        let mut aliases = event.aliases();
        for alias in &aliases {
            if available.contains(alias) {
                return Err(SanityError::duplicate_alias(*alias));
            }
        }
        aliases.extend_from_slice(available);
        Ok(aliases)
    }

    fn check_terminator(&self, initial: &[&str]) -> Result<(), SanityError> {
        let Some(terminator) = self.scope.terminator() else {
            return Ok(());
        };
        self.check_event(terminator, initial)?;
        Ok(())
    }

    /// Refine every simple event against the schema of its topic.
    ///
    /// `topics` maps topic names to message schemas; `aliases` supplies
    /// schemas for externally-bound aliases. Aliases defined by the
    /// property's own events resolve to their topics' schemas automatically.
    pub fn refine_types(
        &self,
        topics: &HashMap<String, SchemaRef>,
        aliases: &HashMap<String, SchemaRef>,
    ) -> Result<(), Error> {
        tracing::debug!("refining property: {}", self);
        let mut bindings = aliases.clone();
        for event in self.events() {
            for e in event.simple_events() {
                if let (Some(alias), Some(schema)) = (e.alias(), topics.get(e.topic())) {
                    bindings
                        .entry(alias.to_string())
                        .or_insert_with(|| schema.clone());
                }
            }
        }
        for event in self.events() {
            for e in event.simple_events() {
                let schema = topics
                    .get(e.topic())
                    .ok_or_else(|| TypeError::UnknownTopic(e.topic().to_string()))?;
                e.refine_types(schema, &bindings)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.pattern)
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        // metadata is opaque and does not participate
        self.scope == other.scope && self.pattern == other.pattern
    }
}

impl Eq for Property {}

impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scope.hash(state);
        self.pattern.hash(state);
    }
}

/// An ordered collection of properties; equality treats it as a set.
#[derive(Debug, Clone, Default)]
pub struct Specification {
    properties: Vec<Property>,
}

impl Specification {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Add a property.
    pub fn push(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Validate alias scoping across every property.
    pub fn sanity_check(&self) -> Result<(), SanityError> {
        for property in &self.properties {
            property.sanity_check()?;
        }
        Ok(())
    }

    /// Refine every property against the schema catalogue.
    pub fn refine_types(
        &self,
        topics: &HashMap<String, SchemaRef>,
        aliases: &HashMap<String, SchemaRef>,
    ) -> Result<(), Error> {
        for property in &self.properties {
            property.refine_types(topics, aliases)?;
        }
        Ok(())
    }

    /// Check whether every property is fully typed.
    pub fn is_fully_typed(&self) -> bool {
        self.properties.iter().all(Property::is_fully_typed)
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, property) in self.properties.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", property)?;
        }
        Ok(())
    }
}

impl PartialEq for Specification {
    fn eq(&self, other: &Self) -> bool {
        self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .all(|p| other.properties.contains(p))
            && other
                .properties
                .iter()
                .all(|p| self.properties.contains(p))
    }
}

impl Eq for Specification {}

impl Hash for Specification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // order-independent, to stay consistent with set equality
        let combined: u64 = self
            .properties
            .iter()
            .fold(0u64, |acc, p| acc.wrapping_add(node_hash(p)));
        combined.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, BinaryOperator, Expression, FieldAccess, Literal};
    use crate::predicate::Predicate;

    fn field_pred(name: &str) -> Predicate {
        let access = Expression::Field(FieldAccess::own_field(name));
        let gt = BinaryOperator::new(
            BinaryOp::GreaterThan,
            access,
            Expression::Literal(Literal::integer(0)),
        )
        .unwrap();
        Predicate::new(Expression::Binary(gt)).unwrap()
    }

    fn simple(topic: &str) -> Event {
        Event::Simple(SimpleEvent::publish(topic))
    }

    #[test]
    fn test_scope_slots() {
        assert!(Scope::globally().activator().is_none());
        assert!(Scope::globally().terminator().is_none());

        let scope = Scope::after(simple("/start"));
        assert!(scope.is_after());
        assert!(scope.activator().is_some());
        assert!(scope.terminator().is_none());

        let scope = Scope::after_until(simple("/start"), simple("/stop"));
        assert!(scope.activator().is_some());
        assert!(scope.terminator().is_some());
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::globally().to_string(), "globally");
        assert_eq!(
            Scope::until(simple("/stop")).to_string(),
            "until /stop { True }"
        );
    }

    #[test]
    fn test_pattern_classification() {
        let p = Pattern::absence(simple("/a"));
        assert!(p.is_safety());
        assert!(!p.is_liveness());
        assert!(p.trigger().is_none());

        let p = Pattern::response(simple("/t"), simple("/b"));
        assert!(p.is_liveness());
        assert!(p.trigger().is_some());
    }

    #[test]
    fn test_pattern_display() {
        let p = Pattern::absence(simple("/a"));
        assert_eq!(p.to_string(), "no /a { True }");

        let p = Pattern::response(simple("/t"), simple("/b"))
            .with_time_bounds(0.0, 5.0)
            .unwrap();
        assert_eq!(p.to_string(), "/t { True } causes /b { True } within 5s");

        let p = Pattern::requirement(simple("/b"), simple("/t"));
        assert_eq!(p.to_string(), "/b { True } requires /t { True }");

        let p = Pattern::prevention(simple("/t"), simple("/b"));
        assert_eq!(p.to_string(), "/t { True } forbids /b { True }");
    }

    #[test]
    fn test_negative_min_time_rejected() {
        let err = Pattern::absence(simple("/a"))
            .with_time_bounds(-5.0, 10.0)
            .unwrap_err();
        assert!(matches!(err, SanityError::NegativeTimeBound(_)));
        assert_eq!(err.to_string(), "negative lower time bound: -5s");
    }

    #[test]
    fn test_time_bound_tolerance() {
        let a = Pattern::absence(simple("/a")).with_time_bounds(0.0, 10.0).unwrap();
        let b = Pattern::absence(simple("/a"))
            .with_time_bounds(0.0, 10.0 + 1e-9)
            .unwrap();
        let c = Pattern::absence(simple("/a")).with_time_bounds(0.0, 11.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        // infinity compares specially
        let inf = Pattern::absence(simple("/a"));
        let other_inf = Pattern::absence(simple("/a"));
        assert_eq!(inf, other_inf);
        assert_ne!(inf, c);
        assert!(!inf.has_max_time());
        assert!(c.has_max_time());
    }

    #[test]
    fn test_property_display() {
        let event = Event::Simple(SimpleEvent::new("/odom", field_pred("x"), None));
        let property = Property::new(Scope::globally(), Pattern::absence(event));
        assert_eq!(property.to_string(), "globally: no /odom { (x > 0) }");
    }

    #[test]
    fn test_property_events_order() {
        let property = Property::new(
            Scope::after_until(simple("/on"), simple("/off")),
            Pattern::response(simple("/t"), simple("/b")),
        );
        let topics: Vec<&str> = property
            .events()
            .iter()
            .flat_map(|e| e.simple_events())
            .map(|e| e.topic())
            .collect();
        assert_eq!(topics, vec!["/on", "/b", "/t", "/off"]);
    }

    #[test]
    fn test_property_metadata() {
        let property = Property::new(Scope::globally(), Pattern::absence(simple("/a")))
            .with_metadata("id", "p1");
        assert_eq!(property.uid(), Some("p1"));

        // metadata does not participate in equality
        let other = Property::new(Scope::globally(), Pattern::absence(simple("/a")));
        assert_eq!(property, other);
    }

    #[test]
    fn test_specification_set_equality() {
        let a = Property::new(Scope::globally(), Pattern::absence(simple("/a")));
        let b = Property::new(Scope::globally(), Pattern::existence(simple("/b")));
        let ab = Specification::new(vec![a.clone(), b.clone()]);
        let ba = Specification::new(vec![b.clone(), a.clone()]);
        assert_eq!(ab, ba);
        assert_eq!(node_hash(&ab), node_hash(&ba));

        let aa = Specification::new(vec![a.clone(), a.clone()]);
        assert_ne!(ab, aa);
        assert_ne!(ab, Specification::new(vec![a]));
    }
}
