//! Value: a dynamically typed scripting value usable as a key or element.

use crate::key::MapKey;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

/// Bit pattern every NaN hashes as, so that all NaNs land in one bucket.
const CANONICAL_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

/// A scripting-language value.
///
/// Equality is SameValue: `NaN` equals `NaN`, while `+0` and `-0` are
/// different values. Maps and sets fold `-0` into `+0` through
/// [`MapKey::canonical`], which yields SameValueZero behavior for keys.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
}

impl Value {
    /// The numeric negative zero.
    pub const NEGATIVE_ZERO: Value = Value::Number(-0.0);

    pub fn is_negative_zero(&self) -> bool {
        matches!(self, Value::Number(n) if *n == 0.0 && n.is_sign_negative())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() || b.is_nan() {
                    a.is_nan() && b.is_nan()
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) if n.is_nan() => CANONICAL_NAN_BITS.hash(state),
            Value::Number(n) => n.to_bits().hash(state),
            Value::String(s) => s.hash(state),
        }
    }
}

impl MapKey for Value {
    #[inline]
    fn canonical(&self) -> Option<Self> {
        if self.is_negative_zero() {
            Some(Value::Number(0.0))
        } else {
            None
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(_) if self.is_negative_zero() => f.write_str("-0"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn nan_is_same_value_as_nan() {
        let a = Value::Number(f64::NAN);
        let b = Value::Number(-f64::NAN);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn signed_zeros_differ_until_canonicalized() {
        let neg = Value::NEGATIVE_ZERO;
        let pos = Value::Number(0.0);
        assert_ne!(neg, pos);
        assert!(neg.is_negative_zero());
        assert!(!pos.is_negative_zero());
        assert_eq!(neg.canonical(), Some(pos.clone()));
        assert!(pos.canonical().is_none());
    }

    #[test]
    fn variants_do_not_collide_in_equality() {
        assert_ne!(Value::Null, Value::Undefined);
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::from(true), Value::from(1));
        assert_eq!(Value::from("a"), Value::String("a".into()));
    }

    #[test]
    fn debug_renders_script_literals() {
        assert_eq!(format!("{:?}", Value::NEGATIVE_ZERO), "-0");
        assert_eq!(format!("{:?}", Value::from(2)), "2");
        assert_eq!(format!("{:?}", Value::from("x")), "\"x\"");
        assert_eq!(format!("{:?}", Value::Undefined), "undefined");
    }
}
