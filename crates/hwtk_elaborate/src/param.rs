//! Parameter cells.

use hwtk_rtl::{GenericDecl, Netlist, SignalId, Value};

/// A named unit parameter backed by a signal in the unit's declaration
/// netlist, so port widths can be expressions over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Backing signal in the declaration netlist.
    pub signal: SignalId,
}

impl Param {
    /// Wraps an existing parameter signal.
    pub fn new(name: impl Into<String>, signal: SignalId) -> Self {
        Self {
            name: name.into(),
            signal,
        }
    }

    /// Current value.
    pub fn get(&self, decl: &Netlist) -> Value {
        decl.signal(self.signal).value.clone()
    }

    /// Replaces the value; dependent widths re-fold on next use.
    pub fn set(&self, decl: &mut Netlist, value: Value) {
        decl.set_param(self.signal, value);
    }

    /// The entity generic carrying the current value.
    pub fn generic_decl(&self, decl: &Netlist) -> GenericDecl {
        let value = self.get(decl);
        GenericDecl {
            name: self.name.clone(),
            ty: value.ty().clone(),
            value: Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwtk_rtl::HdlType;

    #[test]
    fn get_and_set() {
        let mut decl = Netlist::new();
        let p = Param::new("W", decl.param("W", Value::int(8)));
        assert_eq!(p.get(&decl), Value::int(8));
        p.set(&mut decl, Value::int(4));
        assert_eq!(p.get(&decl), Value::int(4));
        let g = p.generic_decl(&decl);
        assert_eq!(g.ty, HdlType::Integer);
        assert_eq!(g.value, Some(Value::int(4)));
    }
}
