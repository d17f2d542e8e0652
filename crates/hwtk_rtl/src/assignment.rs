//! Assignment nodes.

use crate::ids::SignalId;
use crate::operator::Operand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `dst <= src`, optionally guarded.
///
/// The assignment only writes while every guard reads a valid `true`. An
/// empty guard set makes it an unconditional driver, and a net may have at
/// most one of those.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Assignment {
    /// Value or net being copied.
    pub src: Operand,
    /// Net being written.
    pub dst: SignalId,
    /// Boolean guard nets.
    pub cond: BTreeSet<SignalId>,
}

impl Assignment {
    /// Returns `true` if the assignment has guards.
    pub fn is_conditional(&self) -> bool {
        !self.cond.is_empty()
    }

    /// Nets this assignment reads: the source (if a net) and every guard.
    pub fn inputs(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.src.as_signal().into_iter().chain(self.cond.iter().copied())
    }

    /// Same source and guards, regardless of destination.
    pub fn same_structure(&self, other: &Assignment) -> bool {
        self.src == other.src && self.cond == other.cond
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn inputs_list_source_then_guards() {
        let a = Assignment {
            src: Operand::Signal(SignalId::from_raw(4)),
            dst: SignalId::from_raw(0),
            cond: [SignalId::from_raw(2), SignalId::from_raw(1)].into_iter().collect(),
        };
        let inputs: Vec<u32> = a.inputs().map(SignalId::as_raw).collect();
        assert_eq!(inputs, vec![4, 1, 2]);
        assert!(a.is_conditional());
    }

    #[test]
    fn structure_ignores_destination() {
        let a = Assignment {
            src: Operand::Value(Value::bit(true)),
            dst: SignalId::from_raw(0),
            cond: BTreeSet::new(),
        };
        let mut b = a.clone();
        b.dst = SignalId::from_raw(9);
        assert!(a.same_structure(&b));
        assert!(!a.is_conditional());
        assert_eq!(a.inputs().count(), 0);
    }
}
