//! Generic tree walks and the visitor protocol for backends.
//!
//! [`AstRef`] borrows any node of the tree and supports a stack-based
//! pre-order [`iterate`](AstRef::iterate). [`Visitor`] has one hook per
//! concrete variant; [`AstRef::accept`] dispatches a node to its hook,
//! calling the umbrella hooks (`visit_event`, `visit_expression`,
//! `visit_value`) first, so visitors can hang behavior at whichever level
//! fits. Traversal order is the caller's choice; the usual shape is
//! `iterate()` plus per-node `accept`.

use crate::event::{Event, EventDisjunction, SimpleEvent};
use crate::expr::{
    ArrayAccess, BinaryOperator, Expression, FieldAccess, FunctionCall, Literal, Quantifier,
    RangeLiteral, SetLiteral, ThisMessage, UnaryOperator, VarReference,
};
use crate::predicate::Predicate;
use crate::property::{Pattern, Property, Scope, Specification};

/// One hook per AST variant, plus umbrella hooks for the node families.
///
/// All hooks default to doing nothing, so a visitor implements only the
/// ones it cares about.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_specification(&mut self, node: &Specification) {}
    fn visit_property(&mut self, node: &Property) {}
    fn visit_scope(&mut self, node: &Scope) {}
    fn visit_pattern(&mut self, node: &Pattern) {}

    /// Umbrella hook, called for every event before its specific hook.
    fn visit_event(&mut self, node: &Event) {}
    fn visit_simple_event(&mut self, node: &SimpleEvent) {}
    fn visit_event_disjunction(&mut self, node: &EventDisjunction) {}

    /// Hook for non-vacuous predicates.
    fn visit_predicate(&mut self, node: &Predicate) {}
    fn visit_vacuous_truth(&mut self, node: &Predicate) {}
    fn visit_contradiction(&mut self, node: &Predicate) {}

    /// Umbrella hook, called for every expression before its specific hook.
    fn visit_expression(&mut self, node: &Expression) {}
    /// Umbrella hook, called for value nodes after `visit_expression`.
    fn visit_value(&mut self, node: &Expression) {}

    fn visit_literal(&mut self, node: &Literal) {}
    fn visit_this_message(&mut self, node: &ThisMessage) {}
    fn visit_var_reference(&mut self, node: &VarReference) {}
    fn visit_set(&mut self, node: &SetLiteral) {}
    fn visit_range(&mut self, node: &RangeLiteral) {}
    fn visit_field_access(&mut self, node: &FieldAccess) {}
    fn visit_array_access(&mut self, node: &ArrayAccess) {}
    fn visit_unary_operator(&mut self, node: &UnaryOperator) {}
    fn visit_binary_operator(&mut self, node: &BinaryOperator) {}
    fn visit_function_call(&mut self, node: &FunctionCall) {}
    fn visit_quantifier(&mut self, node: &Quantifier) {}
}

/// A borrowed reference to any node of the tree.
#[derive(Debug, Clone, Copy)]
pub enum AstRef<'a> {
    Specification(&'a Specification),
    Property(&'a Property),
    Scope(&'a Scope),
    Pattern(&'a Pattern),
    Event(&'a Event),
    Predicate(&'a Predicate),
    Expression(&'a Expression),
}

impl<'a> AstRef<'a> {
    /// The direct children, in traversal order.
    pub fn children(self) -> Vec<AstRef<'a>> {
        match self {
            AstRef::Specification(s) => {
                s.properties().iter().map(AstRef::Property).collect()
            }
            AstRef::Property(p) => vec![AstRef::Scope(p.scope()), AstRef::Pattern(p.pattern())],
            AstRef::Scope(s) => {
                let mut children = Vec::new();
                if let Some(activator) = s.activator() {
                    children.push(AstRef::Event(activator));
                }
                if let Some(terminator) = s.terminator() {
                    children.push(AstRef::Event(terminator));
                }
                children
            }
            AstRef::Pattern(p) => {
                let mut children = Vec::new();
                if let Some(trigger) = p.trigger() {
                    children.push(AstRef::Event(trigger));
                }
                children.push(AstRef::Event(p.behaviour()));
                children
            }
            AstRef::Event(Event::Simple(e)) => vec![AstRef::Predicate(e.predicate())],
            AstRef::Event(Event::Disjunction(d)) => {
                vec![AstRef::Event(d.left()), AstRef::Event(d.right())]
            }
            AstRef::Predicate(p) => match p.condition() {
                Some(condition) => vec![AstRef::Expression(condition)],
                None => Vec::new(),
            },
            AstRef::Expression(e) => e.children().into_iter().map(AstRef::Expression).collect(),
        }
    }

    /// Pre-order iterator over the subtree rooted at this node.
    pub fn iterate(self) -> AstIter<'a> {
        AstIter { stack: vec![self] }
    }

    /// Dispatch this node to the visitor hook for its variant.
    pub fn accept(self, visitor: &mut dyn Visitor) {
        match self {
            AstRef::Specification(s) => visitor.visit_specification(s),
            AstRef::Property(p) => visitor.visit_property(p),
            AstRef::Scope(s) => visitor.visit_scope(s),
            AstRef::Pattern(p) => visitor.visit_pattern(p),
            AstRef::Event(e) => {
                visitor.visit_event(e);
                match e {
                    Event::Simple(s) => visitor.visit_simple_event(s),
                    Event::Disjunction(d) => visitor.visit_event_disjunction(d),
                }
            }
            AstRef::Predicate(p) => {
                if !p.is_vacuous() {
                    visitor.visit_predicate(p);
                } else if p.is_true() {
                    visitor.visit_vacuous_truth(p);
                } else {
                    visitor.visit_contradiction(p);
                }
            }
            AstRef::Expression(e) => {
                visitor.visit_expression(e);
                match e {
                    Expression::Literal(n) => {
                        visitor.visit_value(e);
                        visitor.visit_literal(n);
                    }
                    Expression::ThisMessage(n) => {
                        visitor.visit_value(e);
                        visitor.visit_this_message(n);
                    }
                    Expression::Variable(n) => {
                        visitor.visit_value(e);
                        visitor.visit_var_reference(n);
                    }
                    Expression::Set(n) => {
                        visitor.visit_value(e);
                        visitor.visit_set(n);
                    }
                    Expression::Range(n) => {
                        visitor.visit_value(e);
                        visitor.visit_range(n);
                    }
                    Expression::Field(n) => visitor.visit_field_access(n),
                    Expression::Index(n) => visitor.visit_array_access(n),
                    Expression::Unary(n) => visitor.visit_unary_operator(n),
                    Expression::Binary(n) => visitor.visit_binary_operator(n),
                    Expression::Call(n) => visitor.visit_function_call(n),
                    Expression::Quantifier(n) => visitor.visit_quantifier(n),
                }
            }
        }
    }
}

impl<'a> From<&'a Specification> for AstRef<'a> {
    fn from(node: &'a Specification) -> Self {
        AstRef::Specification(node)
    }
}

impl<'a> From<&'a Property> for AstRef<'a> {
    fn from(node: &'a Property) -> Self {
        AstRef::Property(node)
    }
}

impl<'a> From<&'a Event> for AstRef<'a> {
    fn from(node: &'a Event) -> Self {
        AstRef::Event(node)
    }
}

impl<'a> From<&'a Predicate> for AstRef<'a> {
    fn from(node: &'a Predicate) -> Self {
        AstRef::Predicate(node)
    }
}

impl<'a> From<&'a Expression> for AstRef<'a> {
    fn from(node: &'a Expression) -> Self {
        AstRef::Expression(node)
    }
}

/// Pre-order traversal over any subtree.
pub struct AstIter<'a> {
    stack: Vec<AstRef<'a>>,
}

impl<'a> Iterator for AstIter<'a> {
    type Item = AstRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let children = node.children();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

/// Walk a subtree in pre-order, dispatching every node to the visitor.
pub fn walk<'a>(root: impl Into<AstRef<'a>>, visitor: &mut dyn Visitor) {
    for node in root.into().iterate() {
        node.accept(visitor);
    }
}
