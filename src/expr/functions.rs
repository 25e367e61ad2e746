//! Builtin functions and call nodes.
//!
//! The function alphabet is fixed. Each builtin has one or more overloads,
//! tried in declaration order; an overload matches when every argument's
//! type set intersects the parameter type, and only a matching overload
//! commits its casts. Variadic overloads repeat their last parameter type.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::TypeError;
use crate::types::TypeSet;

use super::{Expression, check_type};

/// One overload of a builtin function.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    /// Parameter types, in order.
    pub params: &'static [TypeSet],
    /// Whether the last parameter type repeats for extra arguments.
    pub variadic: bool,
}

impl Signature {
    fn matches(&self, arguments: &[Expression]) -> bool {
        if self.variadic {
            if arguments.len() < self.params.len() {
                return false;
            }
        } else if arguments.len() != self.params.len() {
            return false;
        }
        arguments
            .iter()
            .zip(self.param_types())
            .all(|(arg, t)| arg.can_be(t))
    }

    /// The parameter type for each argument position, repeating the last
    /// type when variadic.
    fn param_types(&self) -> impl Iterator<Item = TypeSet> + '_ {
        let last = *self.params.last().unwrap_or(&TypeSet::ANY);
        self.params
            .iter()
            .copied()
            .chain(std::iter::repeat(last))
    }

    fn render(&self) -> String {
        let names: Vec<String> = self.params.iter().map(|t| t.name()).collect();
        let star = if self.variadic { "*" } else { "" };
        format!("({}{})", names.join(", "), star)
    }
}

const NUM: TypeSet = TypeSet::NUMBER;
const PRIM: TypeSet = TypeSet::PRIMITIVE;
const COMP: TypeSet = TypeSet::COMPOSITE;
const MSG: TypeSet = TypeSet::MESSAGE;

const SIG_NUM_TO_NUM: &[Signature] = &[Signature {
    params: &[NUM],
    variadic: false,
}];
const SIG_NUM2_TO_NUM: &[Signature] = &[Signature {
    params: &[NUM, NUM],
    variadic: false,
}];
const SIG_PRIM: &[Signature] = &[Signature {
    params: &[PRIM],
    variadic: false,
}];
const SIG_COMP: &[Signature] = &[Signature {
    params: &[COMP],
    variadic: false,
}];
const SIG_MSG: &[Signature] = &[Signature {
    params: &[MSG],
    variadic: false,
}];
const SIG_AGGREGATE: &[Signature] = &[
    Signature {
        params: &[COMP],
        variadic: false,
    },
    Signature {
        params: &[NUM, NUM],
        variadic: true,
    },
];
const SIG_ORIENTATION: &[Signature] = &[
    Signature {
        params: &[MSG],
        variadic: false,
    },
    Signature {
        params: &[NUM, NUM, NUM, NUM],
        variadic: false,
    },
];

/// The fixed builtin function alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Abs,
    Bool,
    Int,
    Float,
    Str,
    Len,
    Sum,
    Prod,
    Sqrt,
    Ceil,
    Floor,
    Log,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Deg,
    Rad,
    X,
    Y,
    Z,
    Max,
    Min,
    Gcd,
    Roll,
    Pitch,
    Yaw,
}

impl BuiltinFunction {
    /// The function's source name.
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::Abs => "abs",
            BuiltinFunction::Bool => "bool",
            BuiltinFunction::Int => "int",
            BuiltinFunction::Float => "float",
            BuiltinFunction::Str => "str",
            BuiltinFunction::Len => "len",
            BuiltinFunction::Sum => "sum",
            BuiltinFunction::Prod => "prod",
            BuiltinFunction::Sqrt => "sqrt",
            BuiltinFunction::Ceil => "ceil",
            BuiltinFunction::Floor => "floor",
            BuiltinFunction::Log => "log",
            BuiltinFunction::Sin => "sin",
            BuiltinFunction::Cos => "cos",
            BuiltinFunction::Tan => "tan",
            BuiltinFunction::Asin => "asin",
            BuiltinFunction::Acos => "acos",
            BuiltinFunction::Atan => "atan",
            BuiltinFunction::Atan2 => "atan2",
            BuiltinFunction::Deg => "deg",
            BuiltinFunction::Rad => "rad",
            BuiltinFunction::X => "x",
            BuiltinFunction::Y => "y",
            BuiltinFunction::Z => "z",
            BuiltinFunction::Max => "max",
            BuiltinFunction::Min => "min",
            BuiltinFunction::Gcd => "gcd",
            BuiltinFunction::Roll => "roll",
            BuiltinFunction::Pitch => "pitch",
            BuiltinFunction::Yaw => "yaw",
        }
    }

    /// Look a builtin up by its source name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(BuiltinFunction::Abs),
            "bool" => Some(BuiltinFunction::Bool),
            "int" => Some(BuiltinFunction::Int),
            "float" => Some(BuiltinFunction::Float),
            "str" => Some(BuiltinFunction::Str),
            "len" => Some(BuiltinFunction::Len),
            "sum" => Some(BuiltinFunction::Sum),
            "prod" => Some(BuiltinFunction::Prod),
            "sqrt" => Some(BuiltinFunction::Sqrt),
            "ceil" => Some(BuiltinFunction::Ceil),
            "floor" => Some(BuiltinFunction::Floor),
            "log" => Some(BuiltinFunction::Log),
            "sin" => Some(BuiltinFunction::Sin),
            "cos" => Some(BuiltinFunction::Cos),
            "tan" => Some(BuiltinFunction::Tan),
            "asin" => Some(BuiltinFunction::Asin),
            "acos" => Some(BuiltinFunction::Acos),
            "atan" => Some(BuiltinFunction::Atan),
            "atan2" => Some(BuiltinFunction::Atan2),
            "deg" => Some(BuiltinFunction::Deg),
            "rad" => Some(BuiltinFunction::Rad),
            "x" => Some(BuiltinFunction::X),
            "y" => Some(BuiltinFunction::Y),
            "z" => Some(BuiltinFunction::Z),
            "max" => Some(BuiltinFunction::Max),
            "min" => Some(BuiltinFunction::Min),
            "gcd" => Some(BuiltinFunction::Gcd),
            "roll" => Some(BuiltinFunction::Roll),
            "pitch" => Some(BuiltinFunction::Pitch),
            "yaw" => Some(BuiltinFunction::Yaw),
            _ => None,
        }
    }

    /// The result type, shared by all overloads.
    pub fn output(self) -> TypeSet {
        match self {
            BuiltinFunction::Bool => TypeSet::BOOLEAN,
            BuiltinFunction::Str => TypeSet::STRING,
            _ => TypeSet::NUMBER,
        }
    }

    /// The overloads, in declaration order.
    pub fn overloads(self) -> &'static [Signature] {
        match self {
            BuiltinFunction::Abs
            | BuiltinFunction::Sqrt
            | BuiltinFunction::Ceil
            | BuiltinFunction::Floor
            | BuiltinFunction::Sin
            | BuiltinFunction::Cos
            | BuiltinFunction::Tan
            | BuiltinFunction::Asin
            | BuiltinFunction::Acos
            | BuiltinFunction::Atan
            | BuiltinFunction::Deg
            | BuiltinFunction::Rad => SIG_NUM_TO_NUM,
            BuiltinFunction::Log | BuiltinFunction::Atan2 => SIG_NUM2_TO_NUM,
            BuiltinFunction::Bool | BuiltinFunction::Int | BuiltinFunction::Float
            | BuiltinFunction::Str => SIG_PRIM,
            BuiltinFunction::Len | BuiltinFunction::Sum | BuiltinFunction::Prod => SIG_COMP,
            BuiltinFunction::X | BuiltinFunction::Y | BuiltinFunction::Z => SIG_MSG,
            BuiltinFunction::Max | BuiltinFunction::Min | BuiltinFunction::Gcd => SIG_AGGREGATE,
            BuiltinFunction::Roll | BuiltinFunction::Pitch | BuiltinFunction::Yaw => {
                SIG_ORIENTATION
            }
        }
    }
}

/// A call to a builtin function.
#[derive(Debug, Clone)]
pub struct FunctionCall {
    function: BuiltinFunction,
    pub(crate) arguments: Vec<Expression>,
    pub(crate) types: Cell<TypeSet>,
}

impl FunctionCall {
    /// Build a call, resolving the argument list against the builtin's
    /// overloads and committing the casts of the first match.
    pub fn new(function: BuiltinFunction, arguments: Vec<Expression>) -> Result<Self, TypeError> {
        let node = Self {
            function,
            arguments,
            types: Cell::new(function.output()),
        };
        node.resolve_overload()?;
        Ok(node)
    }

    /// Build a call from a source name; unknown names are type errors.
    pub fn named(name: &str, arguments: Vec<Expression>) -> Result<Self, TypeError> {
        let function = BuiltinFunction::from_name(name)
            .ok_or_else(|| TypeError::UndefinedFunction(name.to_string()))?;
        Self::new(function, arguments)
    }

    pub fn function(&self) -> BuiltinFunction {
        self.function
    }

    pub fn arguments(&self) -> &[Expression] {
        &self.arguments
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    fn resolve_overload(&self) -> Result<(), TypeError> {
        for signature in self.function.overloads() {
            if signature.matches(&self.arguments) {
                // every argument intersects; commit the narrowing
                for (arg, t) in self.arguments.iter().zip(signature.param_types()) {
                    check_type(self, arg, t)?;
                }
                return Ok(());
            }
        }
        Err(self.signature_mismatch())
    }

    fn signature_mismatch(&self) -> TypeError {
        let expected: Vec<String> = self
            .function
            .overloads()
            .iter()
            .map(Signature::render)
            .collect();
        let found: Vec<String> = self.arguments.iter().map(|a| a.types().name()).collect();
        TypeError::SignatureMismatch {
            function: self.function.name().to_string(),
            expected: expected.join(" or "),
            found: format!("({})", found.join(", ")),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.name())?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

impl PartialEq for FunctionCall {
    fn eq(&self, other: &Self) -> bool {
        self.function == other.function && self.arguments == other.arguments
    }
}

impl Eq for FunctionCall {}

impl Hash for FunctionCall {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.function.hash(state);
        self.arguments.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Literal, SetLiteral, VarReference};

    fn num(n: i64) -> Expression {
        Expression::Literal(Literal::integer(n))
    }

    fn var(name: &str) -> Expression {
        Expression::Variable(VarReference::new(name))
    }

    #[test]
    fn test_simple_overload() {
        let call = FunctionCall::new(BuiltinFunction::Abs, vec![num(-3)]).unwrap();
        assert_eq!(call.types.get(), TypeSet::NUMBER);
        assert_eq!(call.to_string(), "abs(-3)");
    }

    #[test]
    fn test_arity_mismatch() {
        let err = FunctionCall::new(BuiltinFunction::Abs, vec![num(1), num(2)]).unwrap_err();
        assert!(matches!(err, TypeError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_variadic_overload() {
        let call =
            FunctionCall::new(BuiltinFunction::Max, vec![num(1), num(2), num(3), num(4)]).unwrap();
        assert_eq!(call.arity(), 4);

        // one numeric argument matches neither overload
        let err = FunctionCall::new(BuiltinFunction::Max, vec![num(1)]).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("expects (array or range or set) or (number, number*)"));
        assert!(text.contains("got (number)"));
    }

    #[test]
    fn test_composite_overload_selected_first() {
        let set = SetLiteral::new(vec![num(1), num(2)]).unwrap();
        let call = FunctionCall::new(BuiltinFunction::Max, vec![Expression::Set(set)]).unwrap();
        assert_eq!(call.types.get(), TypeSet::NUMBER);
    }

    #[test]
    fn test_overload_narrows_arguments() {
        let x = var("x");
        let call = FunctionCall::new(BuiltinFunction::Sqrt, vec![x]).unwrap();
        assert_eq!(call.arguments()[0].types(), TypeSet::NUMBER);
    }

    #[test]
    fn test_orientation_overloads() {
        let this = Expression::ThisMessage(crate::expr::ThisMessage::new());
        let call = FunctionCall::new(BuiltinFunction::Yaw, vec![this]).unwrap();
        assert_eq!(call.types.get(), TypeSet::NUMBER);

        let call =
            FunctionCall::new(BuiltinFunction::Yaw, vec![num(0), num(0), num(0), num(1)]).unwrap();
        assert_eq!(call.arity(), 4);

        let err = FunctionCall::new(BuiltinFunction::Yaw, vec![num(0), num(0)]);
        assert!(err.is_err());
    }

    #[test]
    fn test_undefined_function() {
        let err = FunctionCall::named("median", vec![num(1)]).unwrap_err();
        assert_eq!(err.to_string(), "undefined function 'median'");
    }

    #[test]
    fn test_conversion_output_types() {
        let call = FunctionCall::new(BuiltinFunction::Str, vec![num(1)]).unwrap();
        assert_eq!(call.types.get(), TypeSet::STRING);
        let call = FunctionCall::new(BuiltinFunction::Bool, vec![num(1)]).unwrap();
        assert_eq!(call.types.get(), TypeSet::BOOLEAN);
    }
}
