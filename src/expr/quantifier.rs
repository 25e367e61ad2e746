//! Quantified expressions and their variable hygiene rules.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{Error, SanityError};
use crate::types::TypeSet;

use super::{BindingId, Expression, check_type};

/// The two quantifier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantifierKind {
    /// `forall`
    Universal,
    /// `exists`
    Existential,
}

impl QuantifierKind {
    /// The quantifier's source keyword.
    pub fn symbol(self) -> &'static str {
        match self {
            QuantifierKind::Universal => "forall",
            QuantifierKind::Existential => "exists",
        }
    }
}

/// A quantifier binding one variable over a composite domain.
///
/// Construction enforces the hygiene rules: the domain cannot reference the
/// bound variable, every body occurrence of the variable is bound to this
/// quantifier's [`BindingId`] and typed to the domain's element type, and at
/// least one occurrence must exist. Rebinding an occurrence that already
/// carries a foreign binding is rejected unless `shadow` is set, which is
/// meant for rebuilding subtrees whose bindings were already resolved.
#[derive(Debug, Clone)]
pub struct Quantifier {
    kind: QuantifierKind,
    variable: String,
    pub(crate) domain: Box<Expression>,
    pub(crate) condition: Box<Expression>,
    binding: BindingId,
    pub(crate) types: Cell<TypeSet>,
}

impl Quantifier {
    /// Bind `variable` over `domain` within `condition`.
    pub fn new(
        kind: QuantifierKind,
        variable: impl Into<String>,
        domain: Expression,
        condition: Expression,
        shadow: bool,
    ) -> Result<Self, Error> {
        let node = Self {
            kind,
            variable: variable.into(),
            domain: Box::new(domain),
            condition: Box::new(condition),
            binding: BindingId::fresh(),
            types: Cell::new(TypeSet::BOOLEAN),
        };
        check_type(&node, &node.domain, TypeSet::COMPOSITE)?;
        check_type(&node, &node.condition, TypeSet::BOOLEAN)?;
        let element_types = node.check_domain_variables()?;
        node.bind_condition_variables(element_types, shadow)?;
        Ok(node)
    }

    /// Universal quantification, `forall v in domain: condition`.
    pub fn forall(
        variable: impl Into<String>,
        domain: Expression,
        condition: Expression,
    ) -> Result<Self, Error> {
        Self::new(QuantifierKind::Universal, variable, domain, condition, false)
    }

    /// Existential quantification, `exists v in domain: condition`.
    pub fn exists(
        variable: impl Into<String>,
        domain: Expression,
        condition: Expression,
    ) -> Result<Self, Error> {
        Self::new(
            QuantifierKind::Existential,
            variable,
            domain,
            condition,
            false,
        )
    }

    pub fn kind(&self) -> QuantifierKind {
        self.kind
    }

    pub fn is_universal(&self) -> bool {
        self.kind == QuantifierKind::Universal
    }

    pub fn is_existential(&self) -> bool {
        self.kind == QuantifierKind::Existential
    }

    /// The bound variable's name.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn domain(&self) -> &Expression {
        &self.domain
    }

    pub fn condition(&self) -> &Expression {
        &self.condition
    }

    /// The binding site identifier carried by bound occurrences.
    pub fn binding(&self) -> BindingId {
        self.binding
    }

    /// Reject any domain occurrence of the bound variable, and work out the
    /// type a bound occurrence gets: the element types of a literal set or
    /// range domain, any primitive otherwise.
    fn check_domain_variables(&self) -> Result<TypeSet, SanityError> {
        for node in self.domain.iter() {
            if let Expression::Variable(v) = node {
                if v.name() == self.variable {
                    return Err(SanityError::VariableInDomain {
                        variable: self.variable.clone(),
                        quantifier: self.to_string(),
                    });
                }
            }
        }
        Ok(match self.domain.as_ref() {
            Expression::Set(set) => set.subtypes(),
            Expression::Range(range) => range.subtypes(),
            _ => TypeSet::PRIMITIVE,
        })
    }

    fn bind_condition_variables(&self, element_types: TypeSet, shadow: bool) -> Result<(), Error> {
        let mut used = 0usize;
        for node in self.condition.iter() {
            if let Expression::Variable(v) = node {
                if v.name() != self.variable {
                    continue;
                }
                if v.is_defined() && !shadow {
                    return Err(SanityError::MultipleDefinitions {
                        variable: self.variable.clone(),
                        quantifier: self.to_string(),
                    }
                    .into());
                }
                v.defined_at.set(Some(self.binding));
                check_type(self, node, element_types)?;
                used += 1;
            }
        }
        if used == 0 {
            return Err(SanityError::UnusedVariable {
                variable: self.variable.clone(),
                quantifier: self.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {} in {}: {})",
            self.kind.symbol(),
            self.variable,
            self.domain,
            self.condition
        )
    }
}

impl PartialEq for Quantifier {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.variable == other.variable
            && self.domain == other.domain
            && self.condition == other.condition
    }
}

impl Eq for Quantifier {}

impl Hash for Quantifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.variable.hash(state);
        self.domain.hash(state);
        self.condition.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{
        ArrayAccess, BinaryOp, BinaryOperator, FieldAccess, Literal, SetLiteral, VarReference,
    };

    fn num(n: i64) -> Expression {
        Expression::Literal(Literal::integer(n))
    }

    fn var(name: &str) -> Expression {
        Expression::Variable(VarReference::new(name))
    }

    fn num_set() -> Expression {
        Expression::Set(SetLiteral::new(vec![num(1), num(2), num(3)]).unwrap())
    }

    fn var_positive(name: &str) -> Expression {
        Expression::Binary(
            BinaryOperator::new(BinaryOp::GreaterThan, var(name), num(0)).unwrap(),
        )
    }

    #[test]
    fn test_forall_over_set() {
        let q = Quantifier::forall("i", num_set(), var_positive("i")).unwrap();
        assert!(q.is_universal());
        assert_eq!(q.to_string(), "(forall i in {1, 2, 3}: (@i > 0))");
        // the bound occurrence carries the binding and the element type
        let bound = q
            .condition()
            .iter()
            .find_map(|n| match n {
                Expression::Variable(v) => Some(v),
                _ => None,
            })
            .unwrap();
        assert_eq!(bound.defined_at(), Some(q.binding()));
        assert_eq!(bound.types.get(), TypeSet::NUMBER);
    }

    #[test]
    fn test_domain_must_be_composite() {
        let err = Quantifier::exists("i", num(1), var_positive("i"));
        assert!(err.is_err());
    }

    #[test]
    fn test_variable_in_domain_rejected() {
        // forall i in @i.arr: @i > 0
        let arr = Expression::Field(FieldAccess::new(var("i"), "arr").unwrap());
        let err = Quantifier::forall("i", arr, var_positive("i")).unwrap_err();
        let Error::Sanity(SanityError::VariableInDomain { variable, .. }) = err else {
            panic!("expected variable-in-domain error, got {err:?}");
        };
        assert_eq!(variable, "i");
    }

    #[test]
    fn test_domain_occurrence_bound_by_nested_quantifier_rejected() {
        // the domain's occurrences of `i` are bound by an inner quantifier,
        // but the outer `forall i` still may not see its own name there
        let inner = Quantifier::exists("i", num_set(), var_positive("i")).unwrap();
        let domain = Expression::Set(
            SetLiteral::new(vec![Expression::Quantifier(inner)]).unwrap(),
        );
        let err = Quantifier::forall("i", domain, var_positive("i")).unwrap_err();
        assert!(matches!(
            err,
            Error::Sanity(SanityError::VariableInDomain { .. })
        ));
    }

    #[test]
    fn test_unused_variable_rejected() {
        let err = Quantifier::forall("i", num_set(), var_positive("j")).unwrap_err();
        assert!(matches!(
            err,
            Error::Sanity(SanityError::UnusedVariable { .. })
        ));
    }

    #[test]
    fn test_rebinding_requires_shadow() {
        let inner = Quantifier::exists("i", num_set(), var_positive("i")).unwrap();
        // the inner body's occurrences are already bound to `inner`
        let err = Quantifier::forall(
            "i",
            num_set(),
            Expression::Quantifier(inner.clone()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Sanity(SanityError::MultipleDefinitions { .. })
        ));

        let shadowed = Quantifier::new(
            QuantifierKind::Universal,
            "i",
            num_set(),
            Expression::Quantifier(inner),
            true,
        )
        .unwrap();
        assert!(shadowed.is_universal());
    }

    #[test]
    fn test_array_element_condition() {
        // forall i in [0 to 2]: items[@i] > 0
        let range = Expression::Range(
            crate::expr::RangeLiteral::inclusive(num(0), num(2)).unwrap(),
        );
        let items = Expression::Field(FieldAccess::own_field("items"));
        let element = Expression::Index(ArrayAccess::new(items, var("i")).unwrap());
        let cond =
            Expression::Binary(BinaryOperator::new(BinaryOp::GreaterThan, element, num(0)).unwrap());
        let q = Quantifier::forall("i", range, cond).unwrap();
        assert_eq!(
            q.to_string(),
            "(forall i in [0 to 2]: (items[@i] > 0))"
        );
    }
}
