//! HDL types of signals and values.

use crate::error::RtlError;
use crate::ids::SignalId;
use crate::netlist::Netlist;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The bit count of a vector type.
///
/// A width may be given by a signal (typically an expression over unit
/// parameters); it is folded by static evaluation whenever a concrete
/// number is needed, so changing a parameter changes every dependent width.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Width {
    /// A literal bit count.
    Fixed(u32),
    /// The bit count is the current value of this signal.
    Signal(SignalId),
}

/// The type of a signal, port, or value.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum HdlType {
    /// `BOOLEAN`.
    Bool,
    /// `STD_LOGIC`.
    Bit,
    /// A bit vector. `signed` picks the numeric interpretation:
    /// `None` is a plain `STD_LOGIC_VECTOR`.
    Vector {
        /// Number of bits.
        width: Width,
        /// `Some(true)` for `SIGNED`, `Some(false)` for `UNSIGNED`.
        signed: Option<bool>,
    },
    /// `INTEGER`.
    Integer,
    /// `STRING`.
    Str,
}

impl HdlType {
    /// A `STD_LOGIC_VECTOR` of a literal width.
    pub fn vector(width: u32) -> Self {
        HdlType::Vector {
            width: Width::Fixed(width),
            signed: None,
        }
    }

    /// A `STD_LOGIC_VECTOR` whose width is held by `width`.
    pub fn vector_of(width: SignalId) -> Self {
        HdlType::Vector {
            width: Width::Signal(width),
            signed: None,
        }
    }

    /// A `SIGNED` vector.
    pub fn signed(width: u32) -> Self {
        HdlType::Vector {
            width: Width::Fixed(width),
            signed: Some(true),
        }
    }

    /// An `UNSIGNED` vector.
    pub fn unsigned(width: u32) -> Self {
        HdlType::Vector {
            width: Width::Fixed(width),
            signed: Some(false),
        }
    }

    /// Returns `true` for `Bit` and `Vector`, the types whose values are [`Bits`](hwtk_common::Bits).
    pub fn is_bits(&self) -> bool {
        matches!(self, HdlType::Bit | HdlType::Vector { .. })
    }

    /// Returns `true` for signed vectors.
    pub fn is_signed(&self) -> bool {
        matches!(self, HdlType::Vector { signed: Some(true), .. })
    }

    /// Returns the bit count if it is known without evaluation.
    pub fn fixed_width(&self) -> Option<u32> {
        match self {
            HdlType::Bool | HdlType::Bit => Some(1),
            HdlType::Integer => Some(32),
            HdlType::Vector {
                width: Width::Fixed(w),
                ..
            } => Some(*w),
            HdlType::Vector {
                width: Width::Signal(_),
                ..
            }
            | HdlType::Str => None,
        }
    }

    /// Returns the bit count, folding a signal-given width by static evaluation.
    pub fn bit_width(&self, netlist: &mut Netlist) -> Result<u32, RtlError> {
        match self {
            HdlType::Vector {
                width: Width::Signal(sig),
                ..
            } => {
                let value = netlist.static_eval(*sig)?;
                value
                    .as_i64()
                    .and_then(|w| u32::try_from(w).ok())
                    .ok_or_else(|| RtlError::UnresolvedWidth {
                        signal: netlist.signal(*sig).name.clone(),
                    })
            }
            HdlType::Str => Err(RtlError::UnresolvedWidth {
                signal: "<string>".into(),
            }),
            other => Ok(other.fixed_width().unwrap_or(0)),
        }
    }

    /// Returns a copy with every signal-given width replaced by its folded value.
    pub fn resolved(&self, netlist: &mut Netlist) -> Result<HdlType, RtlError> {
        match self {
            HdlType::Vector {
                width: Width::Signal(_),
                signed,
            } => Ok(HdlType::Vector {
                width: Width::Fixed(self.bit_width(netlist)?),
                signed: *signed,
            }),
            other => Ok(other.clone()),
        }
    }

    /// Builds the boolean view of `sig`, which has this type.
    ///
    /// `Bool` is returned as is; `Bit` and one-bit vectors compare against
    /// `'1'`; integers compare against zero. Wider vectors and strings have no
    /// boolean reading.
    pub fn convert_to_bool(&self, netlist: &mut Netlist, sig: SignalId) -> Result<SignalId, RtlError> {
        match self {
            HdlType::Bool => Ok(sig),
            HdlType::Bit => netlist.op_eq(sig, Value::bit(true)),
            HdlType::Integer => netlist.op_neq(sig, Value::int(0)),
            HdlType::Vector { .. } if self.fixed_width() == Some(1) => {
                netlist.op_eq(sig, Value::vector(1, 1))
            }
            _ => Err(RtlError::TypeConversion {
                signal: netlist.signal(sig).name.clone(),
                from: self.to_string(),
                to: HdlType::Bool.to_string(),
            }),
        }
    }
}

impl fmt::Display for HdlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HdlType::Bool => write!(f, "BOOLEAN"),
            HdlType::Bit => write!(f, "STD_LOGIC"),
            HdlType::Integer => write!(f, "INTEGER"),
            HdlType::Str => write!(f, "STRING"),
            HdlType::Vector { width, signed } => {
                let name = match signed {
                    None => "STD_LOGIC_VECTOR",
                    Some(true) => "SIGNED",
                    Some(false) => "UNSIGNED",
                };
                match width {
                    Width::Fixed(w) => write!(f, "{name}({} DOWNTO 0)", w.saturating_sub(1)),
                    Width::Signal(sig) => write!(f, "{name}({sig} - 1 DOWNTO 0)"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(HdlType::Bit.to_string(), "STD_LOGIC");
        assert_eq!(HdlType::vector(8).to_string(), "STD_LOGIC_VECTOR(7 DOWNTO 0)");
        assert_eq!(HdlType::signed(4).to_string(), "SIGNED(3 DOWNTO 0)");
        assert_eq!(HdlType::unsigned(1).to_string(), "UNSIGNED(0 DOWNTO 0)");
        assert_eq!(HdlType::Bool.to_string(), "BOOLEAN");
    }

    #[test]
    fn fixed_widths() {
        assert_eq!(HdlType::Bit.fixed_width(), Some(1));
        assert_eq!(HdlType::vector(12).fixed_width(), Some(12));
        assert_eq!(HdlType::vector_of(SignalId::from_raw(0)).fixed_width(), None);
        assert!(HdlType::signed(3).is_signed());
        assert!(HdlType::Bit.is_bits());
        assert!(!HdlType::Integer.is_bits());
    }

    #[test]
    fn width_follows_parameter() {
        let mut n = Netlist::new();
        let w = n.param("W", Value::int(8));
        let ty = HdlType::vector_of(w);
        assert_eq!(ty.bit_width(&mut n).unwrap(), 8);
        n.set_param(w, Value::int(3));
        assert_eq!(ty.resolved(&mut n).unwrap(), HdlType::vector(3));
    }

    #[test]
    fn width_from_expression() {
        let mut n = Netlist::new();
        let w = n.param("W", Value::int(4));
        let doubled = n.op_mul(w, Value::int(2)).unwrap();
        let ty = HdlType::vector_of(doubled);
        assert_eq!(ty.bit_width(&mut n).unwrap(), 8);
        n.set_param(w, Value::int(5));
        assert_eq!(ty.bit_width(&mut n).unwrap(), 10);
    }

    #[test]
    fn unresolved_width() {
        let mut n = Netlist::new();
        let w = n.sig("w", HdlType::Integer);
        let err = HdlType::vector_of(w).bit_width(&mut n).unwrap_err();
        assert!(matches!(err, RtlError::UnresolvedWidth { ref signal } if signal == "w"));
    }

    #[test]
    fn bool_conversion_rules() {
        let mut n = Netlist::new();
        let b = n.sig("b", HdlType::Bool);
        assert_eq!(HdlType::Bool.convert_to_bool(&mut n, b).unwrap(), b);

        let bit = n.sig("bit", HdlType::Bit);
        let on = HdlType::Bit.convert_to_bool(&mut n, bit).unwrap();
        assert_ne!(on, bit);
        assert_eq!(n.signal(on).ty, HdlType::Bool);

        let v = n.sig("v", HdlType::vector(4));
        let err = HdlType::vector(4).convert_to_bool(&mut n, v).unwrap_err();
        assert!(matches!(err, RtlError::TypeConversion { .. }));
    }
}
