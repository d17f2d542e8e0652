//! Typed literal values with validity and event masks.

use crate::types::HdlType;
use hwtk_common::{Bits, Logic};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The raw content of a [`Value`].
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Payload {
    /// An `INTEGER`.
    Int(i64),
    /// A `BOOLEAN`.
    Bool(bool),
    /// A `STRING`.
    Str(String),
    /// A `STD_LOGIC` (width 1) or any vector.
    Bits(Bits),
}

/// An immutable typed literal.
///
/// Scalar payloads are either valid or not as a whole; bit payloads carry a
/// per-bit validity plane. The event flag is set on values written by a
/// clock edge so that edge operators can tell an edge from a steady level.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Value {
    ty: HdlType,
    payload: Payload,
    valid: bool,
    event: bool,
}

impl Value {
    fn scalar(ty: HdlType, payload: Payload) -> Self {
        Self {
            ty,
            payload,
            valid: true,
            event: false,
        }
    }

    /// An integer.
    pub fn int(v: i64) -> Self {
        Self::scalar(HdlType::Integer, Payload::Int(v))
    }

    /// A boolean.
    pub fn boolean(v: bool) -> Self {
        Self::scalar(HdlType::Bool, Payload::Bool(v))
    }

    /// A string.
    pub fn string(v: impl Into<String>) -> Self {
        Self::scalar(HdlType::Str, Payload::Str(v.into()))
    }

    /// A driven `STD_LOGIC`.
    pub fn bit(v: bool) -> Self {
        Self::from_bits(HdlType::Bit, Bits::from_bool(v))
    }

    /// A `STD_LOGIC` from a three-state level.
    pub fn logic(v: Logic) -> Self {
        let mut bits = Bits::new(1);
        bits.set(0, v);
        Self::from_bits(HdlType::Bit, bits)
    }

    /// A fully valid `STD_LOGIC_VECTOR` holding the low `width` bits of `v`.
    pub fn vector(v: u64, width: u32) -> Self {
        Self::from_bits(HdlType::vector(width), Bits::from_u64(v, width))
    }

    /// A fully valid `SIGNED` vector.
    pub fn signed(v: i64, width: u32) -> Self {
        Self::from_bits(HdlType::signed(width), Bits::from_i64(v, width))
    }

    /// Wraps bits under a bit-like type. A one-bit `Bit` type keeps its type;
    /// everything else becomes a vector of the bits' width, keeping the
    /// signedness of `ty`.
    pub fn from_bits(ty: HdlType, bits: Bits) -> Self {
        let ty = match ty {
            HdlType::Bit if bits.width() == 1 => HdlType::Bit,
            HdlType::Vector { signed, .. } => HdlType::Vector {
                width: crate::types::Width::Fixed(bits.width()),
                signed,
            },
            _ => HdlType::vector(bits.width()),
        };
        Self {
            ty,
            valid: bits.is_fully_valid(),
            payload: Payload::Bits(bits),
            event: false,
        }
    }

    /// The uninitialized value of a type: every bit `X`, scalars invalid.
    ///
    /// A vector whose width is still signal-given gets zero bits; callers
    /// that need a sized placeholder resolve the type first.
    pub fn invalid(ty: &HdlType) -> Self {
        let payload = match ty {
            HdlType::Bool => Payload::Bool(false),
            HdlType::Integer => Payload::Int(0),
            HdlType::Str => Payload::Str(String::new()),
            HdlType::Bit | HdlType::Vector { .. } => {
                Payload::Bits(Bits::new(ty.fixed_width().unwrap_or(0)))
            }
        };
        Self {
            ty: ty.clone(),
            payload,
            valid: false,
            event: false,
        }
    }

    /// Returns the type.
    pub fn ty(&self) -> &HdlType {
        &self.ty
    }

    /// Returns the payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns `true` when every bit (or the scalar) is known.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns `true` when no bit is known at all.
    pub fn is_uninitialized(&self) -> bool {
        match &self.payload {
            Payload::Bits(bits) => bits.is_fully_invalid(),
            _ => !self.valid,
        }
    }

    /// Validity mask: the low 64 bits' validity for bit payloads, `1` or `0`
    /// for scalars.
    pub fn vld_mask(&self) -> u64 {
        match &self.payload {
            Payload::Bits(bits) => bits.vld_mask(),
            _ => u64::from(self.valid),
        }
    }

    /// Returns `true` if the value was written by an edge.
    pub fn has_event(&self) -> bool {
        self.event
    }

    /// Returns a copy with the event flag set to `event`.
    pub fn with_event(mut self, event: bool) -> Self {
        self.event = event;
        self
    }

    /// Reads the value as an integer.
    ///
    /// Vectors read as unsigned unless their type is signed; booleans read
    /// as 0/1. Returns `None` if anything is unknown.
    pub fn as_i64(&self) -> Option<i64> {
        if !self.valid {
            return None;
        }
        match &self.payload {
            Payload::Int(v) => Some(*v),
            Payload::Bool(b) => Some(i64::from(*b)),
            Payload::Bits(bits) if self.ty.is_signed() => bits.to_i64(),
            Payload::Bits(bits) => bits.to_u64().and_then(|v| i64::try_from(v).ok()),
            Payload::Str(_) => None,
        }
    }

    /// Reads the value as a truth value.
    ///
    /// Only booleans and single bits have one.
    pub fn as_bool(&self) -> Option<bool> {
        if !self.valid {
            return None;
        }
        match &self.payload {
            Payload::Bool(b) => Some(*b),
            Payload::Bits(bits) if bits.width() == 1 => bits.get(0).to_bool(),
            _ => None,
        }
    }

    /// Returns the bits of a bit-like value.
    pub fn as_bits(&self) -> Option<&Bits> {
        match &self.payload {
            Payload::Bits(bits) => Some(bits),
            _ => None,
        }
    }

    /// Returns the string of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::Str(s) if self.valid => Some(s),
            _ => None,
        }
    }
}

/// Renders the value as a VHDL literal.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Bits(bits) if self.ty == HdlType::Bit => write!(f, "'{bits}'"),
            Payload::Bits(bits) => write!(f, "\"{bits}\""),
            _ if !self.valid => write!(f, "X"),
            Payload::Int(v) => write!(f, "{v}"),
            Payload::Bool(true) => write!(f, "TRUE"),
            Payload::Bool(false) => write!(f, "FALSE"),
            Payload::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::boolean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_render_as_vhdl() {
        assert_eq!(Value::int(42).to_string(), "42");
        assert_eq!(Value::boolean(true).to_string(), "TRUE");
        assert_eq!(Value::bit(true).to_string(), "'1'");
        assert_eq!(Value::vector(5, 4).to_string(), "\"0101\"");
        assert_eq!(Value::string("abc").to_string(), "\"abc\"");
        assert_eq!(Value::invalid(&HdlType::Bit).to_string(), "'X'");
    }

    #[test]
    fn invalid_values() {
        let v = Value::invalid(&HdlType::vector(4));
        assert!(!v.is_valid());
        assert!(v.is_uninitialized());
        assert_eq!(v.vld_mask(), 0);
        assert_eq!(v.as_i64(), None);
        assert_eq!(Value::invalid(&HdlType::Integer).vld_mask(), 0);
    }

    #[test]
    fn partially_valid_bits() {
        let mut bits = Bits::zeros(4);
        bits.set(2, Logic::X);
        let v = Value::from_bits(HdlType::vector(4), bits);
        assert!(!v.is_valid());
        assert!(!v.is_uninitialized());
        assert_eq!(v.vld_mask(), 0b1011);
    }

    #[test]
    fn numeric_reads() {
        assert_eq!(Value::vector(0b1111, 4).as_i64(), Some(15));
        assert_eq!(Value::signed(-1, 4).as_i64(), Some(-1));
        assert_eq!(Value::boolean(true).as_i64(), Some(1));
        assert_eq!(Value::bit(true).as_bool(), Some(true));
        assert_eq!(Value::vector(1, 2).as_bool(), None);
        assert_eq!(Value::string("s").as_i64(), None);
    }

    #[test]
    fn event_flag_is_part_of_identity() {
        let steady = Value::bit(true);
        let edge = Value::bit(true).with_event(true);
        assert!(edge.has_event());
        assert_ne!(steady, edge);
        assert_eq!(edge.with_event(false), steady);
    }

    #[test]
    fn from_bits_keeps_bit_type() {
        assert_eq!(Value::from_bits(HdlType::Bit, Bits::from_bool(false)).ty(), &HdlType::Bit);
        assert_eq!(
            Value::from_bits(HdlType::signed(8), Bits::zeros(3)).ty(),
            &HdlType::signed(3)
        );
        assert_eq!(Value::logic(Logic::X).as_bool(), None);
    }

    #[test]
    fn serde_roundtrip() {
        let v = Value::vector(9, 6).with_event(true);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
