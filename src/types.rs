//! The type lattice: finite bit-sets of possible semantic types.
//!
//! Every expression node carries a [`TypeSet`] describing which semantic
//! types it may still have. An unconstrained node starts wide (e.g. an alias
//! could be a number, string or message until used) and is narrowed by
//! intersection as constraints accumulate. An expression is fully typed when
//! every node's set is a singleton.

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// A set of possible semantic types, stored as a bitmask.
///
/// The alphabet has seven members: boolean, number, string, array, range,
/// set, and message. Composite constants ([`TypeSet::ANY`],
/// [`TypeSet::PRIMITIVE`], ...) are unions over the alphabet.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSet(u8);

impl TypeSet {
    /// The empty set. Never valid on a constructed node.
    pub const EMPTY: TypeSet = TypeSet(0);

    pub const BOOLEAN: TypeSet = TypeSet(0x01);
    pub const NUMBER: TypeSet = TypeSet(0x02);
    pub const STRING: TypeSet = TypeSet(0x04);
    pub const ARRAY: TypeSet = TypeSet(0x08);
    pub const RANGE: TypeSet = TypeSet(0x10);
    pub const SET: TypeSet = TypeSet(0x20);
    pub const MESSAGE: TypeSet = TypeSet(0x40);

    /// All seven types.
    pub const ANY: TypeSet = TypeSet(0x7f);
    /// Container types: array, range, set.
    pub const COMPOSITE: TypeSet = TypeSet(0x08 | 0x10 | 0x20);
    /// Scalar types: boolean, number, string.
    pub const PRIMITIVE: TypeSet = TypeSet(0x01 | 0x02 | 0x04);
    /// Types a message schema can declare for a field.
    pub const SCHEMA: TypeSet = TypeSet(0x01 | 0x02 | 0x04 | 0x08 | 0x40);
    /// Types an array element or unconstrained alias can have.
    pub const ITEM: TypeSet = TypeSet(0x01 | 0x02 | 0x04 | 0x40);

    const NAMES: [(TypeSet, &'static str); 7] = [
        (TypeSet::BOOLEAN, "boolean"),
        (TypeSet::NUMBER, "number"),
        (TypeSet::STRING, "string"),
        (TypeSet::ARRAY, "array"),
        (TypeSet::RANGE, "range"),
        (TypeSet::SET, "set"),
        (TypeSet::MESSAGE, "message"),
    ];

    /// Check whether every type in `other` is also in `self`.
    pub const fn contains(self, other: TypeSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether the two sets share at least one type.
    pub const fn intersects(self, other: TypeSet) -> bool {
        self.0 & other.0 != 0
    }

    /// The types present in both sets.
    pub const fn intersection(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 & other.0)
    }

    /// The types present in either set.
    pub const fn union(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 | other.0)
    }

    /// The types of `self` not present in `other`.
    pub const fn difference(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 & !other.0)
    }

    /// Check whether the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check whether exactly one type remains.
    pub const fn is_singleton(self) -> bool {
        self.0 != 0 && self.0 & (self.0 - 1) == 0
    }

    /// Human-readable name: the single type's name, or an `"x or y"` join.
    pub fn name(self) -> String {
        let mut parts = Vec::new();
        for (mask, name) in Self::NAMES {
            if self.intersects(mask) {
                parts.push(name);
            }
        }
        parts.join(" or ")
    }
}

impl BitAnd for TypeSet {
    type Output = TypeSet;

    fn bitand(self, rhs: TypeSet) -> TypeSet {
        self.intersection(rhs)
    }
}

impl BitOr for TypeSet {
    type Output = TypeSet;

    fn bitor(self, rhs: TypeSet) -> TypeSet {
        self.union(rhs)
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSet({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_constants() {
        assert_eq!(
            TypeSet::ANY,
            TypeSet::PRIMITIVE | TypeSet::COMPOSITE | TypeSet::MESSAGE
        );
        assert_eq!(
            TypeSet::COMPOSITE,
            TypeSet::ARRAY | TypeSet::RANGE | TypeSet::SET
        );
        assert_eq!(TypeSet::ITEM, TypeSet::PRIMITIVE | TypeSet::MESSAGE);
        assert_eq!(TypeSet::SCHEMA, TypeSet::ITEM | TypeSet::ARRAY);
    }

    #[test]
    fn test_intersection_and_union() {
        let t = TypeSet::ITEM & TypeSet::PRIMITIVE;
        assert_eq!(t, TypeSet::PRIMITIVE);
        assert!((TypeSet::NUMBER & TypeSet::BOOLEAN).is_empty());
        assert_eq!(
            TypeSet::NUMBER | TypeSet::BOOLEAN | TypeSet::STRING,
            TypeSet::PRIMITIVE
        );
    }

    #[test]
    fn test_singleton() {
        assert!(TypeSet::NUMBER.is_singleton());
        assert!(TypeSet::MESSAGE.is_singleton());
        assert!(!TypeSet::PRIMITIVE.is_singleton());
        assert!(!TypeSet::EMPTY.is_singleton());
    }

    #[test]
    fn test_contains() {
        assert!(TypeSet::ANY.contains(TypeSet::COMPOSITE));
        assert!(TypeSet::PRIMITIVE.contains(TypeSet::NUMBER));
        assert!(!TypeSet::PRIMITIVE.contains(TypeSet::MESSAGE));
    }

    #[test]
    fn test_names() {
        assert_eq!(TypeSet::NUMBER.name(), "number");
        assert_eq!(TypeSet::MESSAGE.name(), "message");
        assert_eq!(
            (TypeSet::BOOLEAN | TypeSet::NUMBER).name(),
            "boolean or number"
        );
        assert_eq!(TypeSet::COMPOSITE.name(), "array or range or set");
    }

    #[test]
    fn test_difference() {
        let t = TypeSet::ANY.difference(TypeSet::COMPOSITE);
        assert_eq!(t, TypeSet::PRIMITIVE | TypeSet::MESSAGE);
        assert!(TypeSet::NUMBER.difference(TypeSet::NUMBER).is_empty());
    }
}
