//! Operator kinds, operands, and the evaluation rules shared by static
//! evaluation and simulation.

use crate::ids::SignalId;
use crate::types::HdlType;
use crate::value::{Payload, Value};
use hwtk_common::{Bits, Logic};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// What an operator computes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum OpKind {
    /// Logical or bitwise negation.
    Not,
    /// Arithmetic negation.
    Neg,
    /// `true` while a single bit carries an edge event and reads `'1'`.
    RisingEdge,
    /// `true` while a single bit carries an edge event and reads `'0'`.
    FallingEdge,
    /// Logical or bitwise AND over all operands.
    And,
    /// Logical or bitwise OR over all operands.
    Or,
    /// Logical or bitwise XOR over all operands.
    Xor,
    /// Sum of all operands.
    Add,
    /// First operand minus the rest.
    Sub,
    /// Product of all operands.
    Mul,
    /// First operand divided by the rest, truncating.
    Div,
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Concatenation; the first operand supplies the most significant bits.
    Concat,
    /// `base(index)`, a single bit.
    Index,
    /// `base(hi DOWNTO lo)`.
    Slice,
    /// `cond ? then : else`.
    Ternary,
}

impl OpKind {
    /// Returns `true` for kinds taking a single operand. Only these are cached.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            OpKind::Not | OpKind::Neg | OpKind::RisingEdge | OpKind::FallingEdge
        )
    }

    /// Returns `true` for comparison kinds, which always produce `Bool`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            OpKind::Eq | OpKind::Neq | OpKind::Lt | OpKind::Le | OpKind::Gt | OpKind::Ge
        )
    }

    /// Returns `true` for kinds that select part of their first operand.
    pub fn is_selection(self) -> bool {
        matches!(self, OpKind::Index | OpKind::Slice)
    }

    /// Number of operands the kind requires, or `None` for two or more.
    pub fn arity(self) -> Option<usize> {
        match self {
            k if k.is_unary() => Some(1),
            OpKind::Index => Some(2),
            OpKind::Slice | OpKind::Ternary => Some(3),
            k if k.is_comparison() => Some(2),
            _ => None,
        }
    }

    /// Infix VHDL symbol for kinds rendered between their operands.
    pub fn infix_symbol(self) -> Option<&'static str> {
        Some(match self {
            OpKind::And => "AND",
            OpKind::Or => "OR",
            OpKind::Xor => "XOR",
            OpKind::Add => "+",
            OpKind::Sub => "-",
            OpKind::Mul => "*",
            OpKind::Div => "/",
            OpKind::Eq => "=",
            OpKind::Neq => "/=",
            OpKind::Lt => "<",
            OpKind::Le => "<=",
            OpKind::Gt => ">",
            OpKind::Ge => ">=",
            OpKind::Concat => "&",
            _ => return None,
        })
    }

    /// Computes the result of this operator over already evaluated operands.
    ///
    /// `result_ty` is the folded type of the result signal; it sizes unknown
    /// results. Any unknown input bit that can influence the result makes the
    /// affected result bits unknown.
    pub fn eval(self, operands: &[Value], result_ty: &HdlType) -> Value {
        let unknown = || Value::invalid(result_ty);
        match self {
            OpKind::Not => match operands[0].payload() {
                Payload::Bool(b) if operands[0].is_valid() => Value::boolean(!b),
                Payload::Bits(bits) => Value::from_bits(result_ty.clone(), !bits),
                Payload::Int(v) if operands[0].is_valid() => Value::int(!v),
                _ => unknown(),
            },
            OpKind::Neg => match operands[0].as_i64() {
                Some(v) => numeric(v.wrapping_neg(), result_ty),
                None => unknown(),
            },
            OpKind::RisingEdge | OpKind::FallingEdge => {
                let level = operands[0].as_bool();
                let want = self == OpKind::RisingEdge;
                match level {
                    Some(l) => Value::boolean(operands[0].has_event() && l == want),
                    None => unknown(),
                }
            }
            OpKind::And | OpKind::Or | OpKind::Xor => logical(self, operands, result_ty),
            OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Div => {
                arithmetic(self, operands, result_ty)
            }
            k if k.is_comparison() => compare(k, &operands[0], &operands[1]),
            OpKind::Concat => {
                let mut acc: Option<Bits> = None;
                for op in operands {
                    let Some(bits) = op.as_bits() else {
                        return unknown();
                    };
                    acc = Some(match acc {
                        None => bits.clone(),
                        Some(high) => high.concat(bits),
                    });
                }
                acc.map_or_else(unknown, |bits| Value::from_bits(result_ty.clone(), bits))
            }
            OpKind::Index => {
                let (Some(base), Some(i)) = (operands[0].as_bits(), operands[1].as_i64()) else {
                    return unknown();
                };
                match u32::try_from(i).ok().filter(|i| *i < base.width()) {
                    Some(i) => Value::logic(base.get(i)),
                    None => unknown(),
                }
            }
            OpKind::Slice => {
                let (Some(base), Some(hi), Some(lo)) = (
                    operands[0].as_bits(),
                    operands[1].as_i64(),
                    operands[2].as_i64(),
                ) else {
                    return unknown();
                };
                let part = u32::try_from(hi)
                    .ok()
                    .zip(u32::try_from(lo).ok())
                    .and_then(|(hi, lo)| base.slice(hi, lo));
                match part {
                    Some(bits) => Value::from_bits(result_ty.clone(), bits),
                    None => unknown(),
                }
            }
            OpKind::Ternary => match operands[0].as_bool() {
                Some(true) => operands[1].clone().with_event(false),
                Some(false) => operands[2].clone().with_event(false),
                None => unknown(),
            },
            _ => unknown(),
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Not => "NOT",
            OpKind::Neg => "NEG",
            OpKind::RisingEdge => "RISING_EDGE",
            OpKind::FallingEdge => "FALLING_EDGE",
            OpKind::Index => "INDEX",
            OpKind::Slice => "SLICE",
            OpKind::Ternary => "TERNARY",
            other => return write!(f, "{}", other.infix_symbol().unwrap_or("?")),
        };
        write!(f, "{name}")
    }
}

fn numeric(v: i64, ty: &HdlType) -> Value {
    match ty {
        HdlType::Bit | HdlType::Vector { .. } => {
            Value::from_bits(ty.clone(), Bits::from_i64(v, ty.fixed_width().unwrap_or(64)))
        }
        HdlType::Bool => Value::boolean(v != 0),
        _ => Value::int(v),
    }
}

fn logical(kind: OpKind, operands: &[Value], ty: &HdlType) -> Value {
    if *ty == HdlType::Bool {
        let mut acc: Option<Logic> = None;
        for op in operands {
            let l = op.as_bool().map_or(Logic::X, Logic::from_bool);
            acc = Some(match (acc, kind) {
                (None, _) => l,
                (Some(a), OpKind::And) => a & l,
                (Some(a), OpKind::Or) => a | l,
                (Some(a), _) => a ^ l,
            });
        }
        return acc
            .and_then(Logic::to_bool)
            .map_or_else(|| Value::invalid(ty), Value::boolean);
    }
    if ty.is_bits() {
        let mut acc: Option<Bits> = None;
        for op in operands {
            let Some(bits) = op.as_bits() else {
                return Value::invalid(ty);
            };
            acc = Some(match acc {
                None => bits.clone(),
                Some(prev) if prev.width() != bits.width() => return Value::invalid(ty),
                Some(prev) => match kind {
                    OpKind::And => &prev & bits,
                    OpKind::Or => &prev | bits,
                    _ => &prev ^ bits,
                },
            });
        }
        return acc.map_or_else(|| Value::invalid(ty), |b| Value::from_bits(ty.clone(), b));
    }
    let mut acc: Option<i64> = None;
    for op in operands {
        let Some(v) = op.as_i64() else {
            return Value::invalid(ty);
        };
        acc = Some(match (acc, kind) {
            (None, _) => v,
            (Some(a), OpKind::And) => a & v,
            (Some(a), OpKind::Or) => a | v,
            (Some(a), _) => a ^ v,
        });
    }
    acc.map_or_else(|| Value::invalid(ty), |v| numeric(v, ty))
}

fn arithmetic(kind: OpKind, operands: &[Value], ty: &HdlType) -> Value {
    let mut acc: Option<i64> = None;
    for op in operands {
        let Some(v) = op.as_i64() else {
            return Value::invalid(ty);
        };
        acc = Some(match (acc, kind) {
            (None, _) => v,
            (Some(a), OpKind::Add) => a.wrapping_add(v),
            (Some(a), OpKind::Sub) => a.wrapping_sub(v),
            (Some(a), OpKind::Mul) => a.wrapping_mul(v),
            (Some(a), _) => match a.checked_div(v) {
                Some(q) => q,
                None => return Value::invalid(ty),
            },
        });
    }
    acc.map_or_else(|| Value::invalid(ty), |v| numeric(v, ty))
}

fn compare(kind: OpKind, a: &Value, b: &Value) -> Value {
    let ordering = match (a.payload(), b.payload()) {
        (Payload::Str(x), Payload::Str(y)) if a.is_valid() && b.is_valid() => Some(x.cmp(y)),
        _ => a.as_i64().zip(b.as_i64()).map(|(x, y)| x.cmp(&y)),
    };
    let Some(ordering) = ordering else {
        return Value::invalid(&HdlType::Bool);
    };
    Value::boolean(match kind {
        OpKind::Eq => ordering == Ordering::Equal,
        OpKind::Neq => ordering != Ordering::Equal,
        OpKind::Lt => ordering == Ordering::Less,
        OpKind::Le => ordering != Ordering::Greater,
        OpKind::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

/// An operator input as stored in the graph.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Operand {
    /// A literal.
    Value(Value),
    /// A net of the same netlist.
    Signal(SignalId),
}

impl Operand {
    /// Returns the signal, if this operand is one.
    pub fn as_signal(&self) -> Option<SignalId> {
        match self {
            Operand::Signal(s) => Some(*s),
            Operand::Value(_) => None,
        }
    }
}

/// Anything a caller may try to use as an operand.
///
/// Only [`Term::Value`] and [`Term::Signal`] are accepted; the other variants
/// exist so that a mistaken argument is reported as an error instead of being
/// silently coerced.
#[derive(Clone, PartialEq, Debug)]
pub enum Term {
    /// A literal.
    Value(Value),
    /// A net.
    Signal(SignalId),
    /// An interface handle, named.
    Interface(String),
    /// A type used where a value was expected.
    Type(HdlType),
}

impl From<Value> for Term {
    fn from(v: Value) -> Self {
        Term::Value(v)
    }
}

impl From<SignalId> for Term {
    fn from(s: SignalId) -> Self {
        Term::Signal(s)
    }
}

impl From<Operand> for Term {
    fn from(o: Operand) -> Self {
        match o {
            Operand::Value(v) => Term::Value(v),
            Operand::Signal(s) => Term::Signal(s),
        }
    }
}

impl From<i64> for Term {
    fn from(v: i64) -> Self {
        Term::Value(Value::int(v))
    }
}

impl From<i32> for Term {
    fn from(v: i32) -> Self {
        Term::Value(Value::int(i64::from(v)))
    }
}

impl From<bool> for Term {
    fn from(v: bool) -> Self {
        Term::Value(Value::boolean(v))
    }
}

impl From<HdlType> for Term {
    fn from(t: HdlType) -> Self {
        Term::Type(t)
    }
}

/// A computation node: a kind, its ordered operands, and its result net.
///
/// Immutable after construction. The result net lists the operator as its
/// driver (unless an indexed write reclassified it) and as its `origin`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Operator {
    /// What is computed.
    pub kind: OpKind,
    /// Inputs in order.
    pub operands: Vec<Operand>,
    /// The net carrying the result.
    pub result: SignalId,
}

impl Operator {
    /// Signal operands in order, skipping literals.
    pub fn signal_operands(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.operands.iter().filter_map(Operand::as_signal)
    }

    /// Structural equality: same kind and equal operands, ignoring the result.
    pub fn same_structure(&self, other: &Operator) -> bool {
        self.kind == other.kind && self.operands == other.operands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Value {
        let b = Bits::from_binary_str(s).unwrap();
        Value::from_bits(HdlType::vector(b.width()), b)
    }

    #[test]
    fn unary_kinds() {
        assert!(OpKind::Not.is_unary());
        assert!(OpKind::RisingEdge.is_unary());
        assert!(!OpKind::Add.is_unary());
        assert_eq!(OpKind::Slice.arity(), Some(3));
        assert_eq!(OpKind::And.arity(), None);
    }

    #[test]
    fn bool_logic() {
        let t = Value::boolean(true);
        let f = Value::boolean(false);
        assert_eq!(OpKind::And.eval(&[t.clone(), f.clone()], &HdlType::Bool), f);
        assert_eq!(OpKind::Or.eval(&[t.clone(), f.clone()], &HdlType::Bool), t);
        assert_eq!(OpKind::Not.eval(&[t], &HdlType::Bool), f);
        let x = Value::invalid(&HdlType::Bool);
        assert_eq!(OpKind::And.eval(&[f.clone(), x.clone()], &HdlType::Bool), f);
        assert!(!OpKind::Or.eval(&[f, x], &HdlType::Bool).is_valid());
    }

    #[test]
    fn bitwise_vectors() {
        let ty = HdlType::vector(4);
        assert_eq!(OpKind::And.eval(&[bits("1100"), bits("1010")], &ty), bits("1000"));
        assert_eq!(OpKind::Xor.eval(&[bits("1100"), bits("1010")], &ty), bits("0110"));
        assert_eq!(OpKind::Not.eval(&[bits("1100")], &ty), bits("0011"));
    }

    #[test]
    fn arithmetic_wraps_to_width() {
        let ty = HdlType::vector(4);
        assert_eq!(
            OpKind::Add.eval(&[Value::vector(15, 4), Value::int(1)], &ty),
            Value::vector(0, 4)
        );
        assert_eq!(
            OpKind::Sub.eval(&[Value::int(10), Value::int(3), Value::int(2)], &HdlType::Integer),
            Value::int(5)
        );
        assert!(!OpKind::Div
            .eval(&[Value::int(1), Value::int(0)], &HdlType::Integer)
            .is_valid());
        assert_eq!(OpKind::Neg.eval(&[Value::int(3)], &HdlType::Integer), Value::int(-3));
    }

    #[test]
    fn comparisons() {
        let ty = HdlType::Bool;
        assert_eq!(OpKind::Eq.eval(&[Value::bit(true), Value::bit(true)], &ty), Value::boolean(true));
        assert_eq!(OpKind::Lt.eval(&[Value::int(2), Value::int(3)], &ty), Value::boolean(true));
        assert_eq!(OpKind::Ge.eval(&[Value::int(2), Value::int(3)], &ty), Value::boolean(false));
        assert!(!OpKind::Eq
            .eval(&[Value::invalid(&HdlType::Bit), Value::bit(true)], &ty)
            .is_valid());
    }

    #[test]
    fn edges_need_events() {
        let ty = HdlType::Bool;
        let steady = Value::bit(true);
        let rising = Value::bit(true).with_event(true);
        let falling = Value::bit(false).with_event(true);
        assert_eq!(OpKind::RisingEdge.eval(&[steady], &ty), Value::boolean(false));
        assert_eq!(OpKind::RisingEdge.eval(&[rising.clone()], &ty), Value::boolean(true));
        assert_eq!(OpKind::FallingEdge.eval(&[rising], &ty), Value::boolean(false));
        assert_eq!(OpKind::FallingEdge.eval(&[falling], &ty), Value::boolean(true));
    }

    #[test]
    fn selection_and_concat() {
        let v = bits("1011");
        assert_eq!(OpKind::Index.eval(&[v.clone(), Value::int(2)], &HdlType::Bit), Value::bit(false));
        assert!(!OpKind::Index.eval(&[v.clone(), Value::int(9)], &HdlType::Bit).is_valid());
        assert_eq!(
            OpKind::Slice.eval(&[v.clone(), Value::int(3), Value::int(2)], &HdlType::vector(2)),
            bits("10")
        );
        assert_eq!(
            OpKind::Concat.eval(&[bits("10"), Value::bit(true)], &HdlType::vector(3)),
            bits("101")
        );
    }

    #[test]
    fn ternary_picks_branch() {
        let ty = HdlType::Integer;
        let ops = |c: bool| [Value::boolean(c), Value::int(4), Value::int(8)];
        assert_eq!(OpKind::Ternary.eval(&ops(true), &ty), Value::int(4));
        assert_eq!(OpKind::Ternary.eval(&ops(false), &ty), Value::int(8));
        let undecided = [Value::invalid(&HdlType::Bool), Value::int(4), Value::int(8)];
        assert!(!OpKind::Ternary.eval(&undecided, &ty).is_valid());
    }

    #[test]
    fn structural_equality_ignores_result() {
        let a = Operator {
            kind: OpKind::Add,
            operands: vec![Operand::Signal(SignalId::from_raw(0)), Operand::Value(Value::int(1))],
            result: SignalId::from_raw(1),
        };
        let mut b = a.clone();
        b.result = SignalId::from_raw(7);
        assert!(a.same_structure(&b));
        b.kind = OpKind::Sub;
        assert!(!a.same_structure(&b));
        assert_eq!(a.signal_operands().count(), 1);
    }
}
