//! Predicates: the boolean conditions attached to events.
//!
//! A predicate is either a vacuous constant (`True` / `False`) or a boolean
//! condition over message fields and aliases. Non-vacuous construction runs
//! the structural checks: all references that stringify identically converge
//! to one narrowed type, and at least one reference names a field of the
//! implicit own message.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::errors::{Error, SanityError, TypeError};
use crate::expr::{self, Expression, ThisMessage, UnaryOp, UnaryOperator};
use crate::schema::SchemaRef;
use crate::types::TypeSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PredicateKind {
    Condition(Expression),
    VacuousTruth,
    Contradiction,
}

/// A boolean condition over the contents of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    kind: PredicateKind,
}

impl Predicate {
    /// Wrap a boolean expression, running the structural checks.
    pub fn new(condition: Expression) -> Result<Self, Error> {
        if !condition.can_be(TypeSet::BOOLEAN) {
            return Err(TypeError::NotBoolean(condition.to_string()).into());
        }
        static_checks(&condition)?;
        Ok(Self {
            kind: PredicateKind::Condition(condition),
        })
    }

    /// The predicate that always holds.
    pub fn vacuous_truth() -> Self {
        Self {
            kind: PredicateKind::VacuousTruth,
        }
    }

    /// The predicate that never holds.
    pub fn contradiction() -> Self {
        Self {
            kind: PredicateKind::Contradiction,
        }
    }

    /// Check whether this predicate is a constant.
    pub fn is_vacuous(&self) -> bool {
        !matches!(self.kind, PredicateKind::Condition(_))
    }

    /// Check whether this predicate holds trivially.
    pub fn is_true(&self) -> bool {
        matches!(self.kind, PredicateKind::VacuousTruth)
    }

    /// The wrapped condition, for non-vacuous predicates.
    pub fn condition(&self) -> Option<&Expression> {
        match &self.kind {
            PredicateKind::Condition(c) => Some(c),
            _ => None,
        }
    }

    /// Check whether every node of the condition has a singleton type.
    pub fn is_fully_typed(&self) -> bool {
        match &self.kind {
            PredicateKind::Condition(c) => c.is_fully_typed(),
            _ => true,
        }
    }

    /// Names of external aliases the condition references.
    pub fn external_references(&self) -> HashSet<&str> {
        match &self.kind {
            PredicateKind::Condition(c) => c.external_references(),
            _ => HashSet::new(),
        }
    }

    /// Check whether the condition references the given alias.
    pub fn contains_reference(&self, alias: &str) -> bool {
        match &self.kind {
            PredicateKind::Condition(c) => c.contains_reference(alias),
            _ => false,
        }
    }

    /// Check whether the condition references the implicit own message.
    pub fn contains_self_reference(&self) -> bool {
        match &self.kind {
            PredicateKind::Condition(c) => c.contains_self_reference(),
            _ => false,
        }
    }

    /// The logical complement, with double negation eliminated.
    pub fn negate(&self) -> Result<Predicate, Error> {
        match &self.kind {
            PredicateKind::VacuousTruth => Ok(Self::contradiction()),
            PredicateKind::Contradiction => Ok(Self::vacuous_truth()),
            PredicateKind::Condition(c) => {
                if let Expression::Unary(u) = c {
                    if u.op() == UnaryOp::Not {
                        return Self::new(u.operand().clone());
                    }
                }
                let negated = UnaryOperator::new(UnaryOp::Not, c.clone())?;
                Self::new(Expression::Unary(negated))
            }
        }
    }

    /// The conjunction of two predicates, with vacuous identities applied.
    pub fn join(&self, other: &Predicate) -> Result<Predicate, Error> {
        match (&self.kind, &other.kind) {
            (PredicateKind::VacuousTruth, _) => Ok(other.clone()),
            (PredicateKind::Contradiction, _) => Ok(self.clone()),
            (_, PredicateKind::VacuousTruth) => Ok(self.clone()),
            (_, PredicateKind::Contradiction) => Ok(other.clone()),
            (PredicateKind::Condition(a), PredicateKind::Condition(b)) => {
                let joined = expr::conjunction(a.clone(), b.clone())?;
                Self::new(joined)
            }
        }
    }

    /// Rewrite `@alias.field` accesses to fields of the implicit message.
    ///
    /// Applied when an event binds `alias` to its own message.
    pub(crate) fn replace_self_reference(&mut self, alias: &str) {
        if let PredicateKind::Condition(condition) = &mut self.kind {
            rewrite_self_references(condition, alias);
        }
    }

    /// Refine the condition's accessors against the schema of the own
    /// message and the schemas of external aliases.
    pub fn refine_types(
        &self,
        schema: &SchemaRef,
        aliases: &HashMap<String, SchemaRef>,
    ) -> Result<(), Error> {
        let Some(condition) = self.condition() else {
            return Ok(());
        };
        tracing::trace!("refining predicate {}", self);
        let mut stack = vec![condition];
        while let Some(node) = stack.pop() {
            if node.is_accessor() {
                refine_accessor_chain(node, schema, aliases, &mut stack)?;
            } else {
                let children = node.children();
                stack.extend(children.into_iter().rev());
            }
        }
        Ok(())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PredicateKind::Condition(c) => write!(f, "{{ {} }}", c),
            PredicateKind::VacuousTruth => f.write_str("{ True }"),
            PredicateKind::Contradiction => f.write_str("{ False }"),
        }
    }
}

impl Hash for Predicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

/// Group accessors and variable references by canonical string form, then
/// enforce per-group type convergence and the own-field requirement.
fn static_checks(condition: &Expression) -> Result<(), Error> {
    let mut table: IndexMap<String, Vec<&Expression>> = IndexMap::new();
    for node in condition.iter() {
        if node.is_accessor() || matches!(node, Expression::Variable(_)) {
            table.entry(node.to_string()).or_default().push(node);
        }
    }
    all_references_same_type(&table)?;
    some_own_field_reference(&table, condition)?;
    Ok(())
}

/// Two-pass narrowing: forward then backward, so every occurrence ends with
/// the intersection type of its group even when the walk starts at the most
/// generic occurrence.
fn all_references_same_type(table: &IndexMap<String, Vec<&Expression>>) -> Result<(), TypeError> {
    for references in table.values() {
        let mut final_type = TypeSet::ANY;
        for reference in references {
            reference.cast(final_type)?;
            final_type = reference.types();
        }
        for reference in references.iter().rev() {
            reference.cast(final_type)?;
            final_type = reference.types();
        }
    }
    Ok(())
}

/// At least one reference group must be a direct, unindexed field of the
/// implicit own message.
fn some_own_field_reference(
    table: &IndexMap<String, Vec<&Expression>>,
    condition: &Expression,
) -> Result<(), SanityError> {
    for references in table.values() {
        for reference in references {
            match reference {
                Expression::Field(f) if matches!(f.message(), Expression::ThisMessage(_)) => {
                    return Ok(());
                }
                _ => break,
            }
        }
    }
    Err(SanityError::NoFieldReferences(condition.to_string()))
}

fn rewrite_self_references(expr: &mut Expression, alias: &str) {
    if let Expression::Field(f) = expr {
        let is_self_alias =
            matches!(f.message.as_ref(), Expression::Variable(v) if v.name() == alias);
        if is_self_alias {
            *f.message = Expression::ThisMessage(ThisMessage::new());
        }
    }
    for child in expr.children_mut() {
        rewrite_self_references(child, alias);
    }
}

/// Resolve one accessor chain from its base to its leaf, narrowing the
/// bit-set type and annotating the schema type of every step. Index
/// subexpressions are pushed back for the caller's traversal, so accessors
/// inside them are refined too.
fn refine_accessor_chain<'a>(
    accessor: &'a Expression,
    schema: &SchemaRef,
    aliases: &HashMap<String, SchemaRef>,
    stack: &mut Vec<&'a Expression>,
) -> Result<(), Error> {
    // collect the chain leaf-to-base
    let mut chain = vec![accessor];
    let mut base = parent_of(accessor);
    while base.is_accessor() {
        chain.push(base);
        base = parent_of(base);
    }

    let mut current: SchemaRef = match base {
        Expression::ThisMessage(_) => schema.clone(),
        Expression::Variable(v) => aliases
            .get(v.name())
            .cloned()
            .ok_or_else(|| SanityError::UndefinedAlias(v.name().to_string()))?,
        // accessor parents are cast to message or array at construction,
        // which only references can satisfy
        _ => unreachable!("accessor chain base must be a message reference"),
    };
    if !current.is_message() {
        let alias = match base {
            Expression::Variable(v) => v.name().to_string(),
            _ => base.to_string(),
        };
        return Err(TypeError::NotAMessage {
            alias,
            schema: current.type_name().to_string(),
        }
        .into());
    }
    base.assign_schema_type(current.clone());

    while let Some(node) = chain.pop() {
        match node {
            Expression::Field(f) => {
                let next = if current.is_message() {
                    current
                        .field(f.field())
                        .or_else(|| current.constant(f.field()))
                } else {
                    None
                };
                current = next.ok_or_else(|| {
                    TypeError::unknown_field(f.field(), current.type_name(), node.to_string())
                })?;
            }
            Expression::Index(a) => {
                if !current.is_array() {
                    return Err(
                        TypeError::not_an_array(current.type_name(), node.to_string()).into()
                    );
                }
                if let Expression::Literal(l) = a.index() {
                    if let Some(i) = l.value().as_integer() {
                        if !current.contains_index(i) {
                            return Err(TypeError::IndexOutOfRange {
                                index: i.to_string(),
                                schema: current.type_name().to_string(),
                                expression: node.to_string(),
                            }
                            .into());
                        }
                    }
                }
                stack.push(a.index());
                current = current.element_type().ok_or_else(|| {
                    TypeError::not_an_array(current.type_name(), node.to_string())
                })?;
            }
            _ => unreachable!("accessor chain contains only accessors"),
        }

        let mask = if current.is_message() {
            Some(TypeSet::MESSAGE)
        } else if current.is_array() {
            Some(TypeSet::ARRAY)
        } else if current.is_number() {
            Some(TypeSet::NUMBER)
        } else if current.is_bool() {
            Some(TypeSet::BOOLEAN)
        } else if current.is_string() {
            Some(TypeSet::STRING)
        } else {
            None
        };
        if let Some(mask) = mask {
            node.cast(mask)
                .map_err(|source| TypeError::in_expression(accessor.to_string(), source))?;
        }
        node.assign_schema_type(current.clone());
    }
    Ok(())
}

fn parent_of(accessor: &Expression) -> &Expression {
    match accessor {
        Expression::Field(f) => f.message(),
        Expression::Index(a) => a.array(),
        _ => accessor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{
        ArrayAccess, BinaryOp, BinaryOperator, FieldAccess, Literal, VarReference,
    };
    use crate::schema::{ArraySchema, MessageSchema, ScalarSchema};

    fn own_field(name: &str) -> Expression {
        Expression::Field(FieldAccess::own_field(name))
    }

    fn num(n: i64) -> Expression {
        Expression::Literal(Literal::integer(n))
    }

    fn field_gt_zero(name: &str) -> Expression {
        Expression::Binary(
            BinaryOperator::new(BinaryOp::GreaterThan, own_field(name), num(0)).unwrap(),
        )
    }

    #[test]
    fn test_condition_display() {
        let p = Predicate::new(field_gt_zero("x")).unwrap();
        assert_eq!(p.to_string(), "{ (x > 0) }");
        assert!(!p.is_vacuous());
    }

    #[test]
    fn test_vacuous_display() {
        assert_eq!(Predicate::vacuous_truth().to_string(), "{ True }");
        assert_eq!(Predicate::contradiction().to_string(), "{ False }");
        assert!(Predicate::vacuous_truth().is_true());
        assert!(!Predicate::contradiction().is_true());
    }

    #[test]
    fn test_non_boolean_condition_rejected() {
        let sum = Expression::Binary(
            BinaryOperator::new(BinaryOp::Add, own_field("x"), num(1)).unwrap(),
        );
        let err = Predicate::new(sum).unwrap_err();
        assert!(matches!(err, Error::Type(TypeError::NotBoolean(_))));
    }

    #[test]
    fn test_bare_field_condition_is_boolean_capable() {
        // a field access can still be boolean, so it is accepted as-is
        let p = Predicate::new(own_field("active")).unwrap();
        assert!(p.condition().unwrap().can_be(TypeSet::BOOLEAN));
    }

    #[test]
    fn test_no_own_field_reference_rejected() {
        // (@x = 5) never touches the own message
        let eq = Expression::Binary(
            BinaryOperator::new(
                BinaryOp::Equal,
                Expression::Variable(VarReference::new("x")),
                num(5),
            )
            .unwrap(),
        );
        let err = Predicate::new(eq).unwrap_err();
        assert!(matches!(
            err,
            Error::Sanity(SanityError::NoFieldReferences(_))
        ));
    }

    #[test]
    fn test_repeated_references_converge() {
        // (x > 0) and (@y = x): both occurrences of x end as numbers
        let left = field_gt_zero("x");
        let right = Expression::Binary(
            BinaryOperator::new(
                BinaryOp::Equal,
                Expression::Variable(VarReference::new("y")),
                own_field("x"),
            )
            .unwrap(),
        );
        let both = expr::conjunction(left, right).unwrap();
        let p = Predicate::new(both).unwrap();
        let condition = p.condition().unwrap();
        for node in condition.iter() {
            if let Expression::Field(f) = node {
                assert!(f.schema_type().is_none());
                assert_eq!(node.types(), TypeSet::NUMBER, "for {}", node);
            }
        }
    }

    #[test]
    fn test_negate_round_trip() {
        let p = Predicate::new(field_gt_zero("x")).unwrap();
        let n = p.negate().unwrap();
        assert_eq!(n.to_string(), "{ (not (x > 0)) }");
        let back = n.negate().unwrap();
        assert_eq!(back, p);

        assert_eq!(
            Predicate::vacuous_truth().negate().unwrap(),
            Predicate::contradiction()
        );
    }

    #[test]
    fn test_join_identities() {
        let p = Predicate::new(field_gt_zero("x")).unwrap();
        assert_eq!(p.join(&Predicate::vacuous_truth()).unwrap(), p);
        assert_eq!(
            p.join(&Predicate::contradiction()).unwrap(),
            Predicate::contradiction()
        );
        let q = Predicate::new(field_gt_zero("y")).unwrap();
        let joined = p.join(&q).unwrap();
        assert_eq!(joined.to_string(), "{ ((x > 0) and (y > 0)) }");
    }

    #[test]
    fn test_replace_self_reference() {
        // @m.k = 1 with alias m becomes a reference to the own message
        let access = Expression::Field(
            FieldAccess::new(Expression::Variable(VarReference::new("m")), "k").unwrap(),
        );
        let eq = Expression::Binary(BinaryOperator::new(BinaryOp::Equal, access, num(1)).unwrap());
        let mut p = Predicate::new(eq).unwrap();
        assert!(p.external_references().contains("m"));
        p.replace_self_reference("m");
        assert!(p.external_references().is_empty());
        assert!(p.contains_self_reference());
        assert_eq!(p.to_string(), "{ (k = 1) }");
    }

    fn odometry_schema() -> SchemaRef {
        MessageSchema::new("Odometry")
            .with_field("x", ScalarSchema::number())
            .with_field("ranges", ArraySchema::bounded(ScalarSchema::number(), 4).into_ref())
            .into_ref()
    }

    #[test]
    fn test_refine_field_access() {
        let p = Predicate::new(field_gt_zero("x")).unwrap();
        p.refine_types(&odometry_schema(), &HashMap::new()).unwrap();
        let condition = p.condition().unwrap();
        let field = condition
            .iter()
            .find(|n| n.is_accessor())
            .unwrap();
        assert!(field.schema_type().is_some_and(|t| t.is_number()));
        assert!(p.is_fully_typed());
    }

    #[test]
    fn test_refine_unknown_field() {
        let p = Predicate::new(field_gt_zero("missing")).unwrap();
        let err = p
            .refine_types(&odometry_schema(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Type(TypeError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_refine_array_access() {
        let ranges = own_field("ranges");
        let element = Expression::Index(ArrayAccess::new(ranges, num(1)).unwrap());
        let cond = Expression::Binary(
            BinaryOperator::new(BinaryOp::GreaterThan, element, num(0)).unwrap(),
        );
        // an own-field group must exist alongside the indexed access
        let both = expr::conjunction(cond, field_gt_zero("x")).unwrap();
        let p = Predicate::new(both).unwrap();
        p.refine_types(&odometry_schema(), &HashMap::new()).unwrap();
        assert!(p.is_fully_typed());
    }

    #[test]
    fn test_refine_index_out_of_bounds() {
        let ranges = own_field("ranges");
        let element = Expression::Index(ArrayAccess::new(ranges, num(9)).unwrap());
        let cond = Expression::Binary(
            BinaryOperator::new(BinaryOp::GreaterThan, element, num(0)).unwrap(),
        );
        let both = expr::conjunction(cond, field_gt_zero("x")).unwrap();
        let p = Predicate::new(both).unwrap();
        let err = p
            .refine_types(&odometry_schema(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Type(TypeError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_refine_undefined_alias() {
        let access = Expression::Field(
            FieldAccess::new(Expression::Variable(VarReference::new("m")), "k").unwrap(),
        );
        let eq = Expression::Binary(BinaryOperator::new(BinaryOp::Equal, access, num(1)).unwrap());
        let both = expr::conjunction(eq, field_gt_zero("x")).unwrap();
        let p = Predicate::new(both).unwrap();
        let err = p
            .refine_types(&odometry_schema(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Sanity(SanityError::UndefinedAlias(_))
        ));
    }
}
