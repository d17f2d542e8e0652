//! Properties of the expression graph: operator caching, operand
//! validation, driver bookkeeping and width folding.

use hwtk_rtl::{HdlType, Netlist, NodeRef, OpKind, RtlError, SignalId, Term, Value};

#[test]
fn unary_results_are_cached_per_kind() {
    let mut n = Netlist::new();
    let a = n.sig("a", HdlType::Bit);
    let first = n.op_not(a).unwrap();
    let again = n.op_not(a).unwrap();
    assert_eq!(first, again);
    let edge = n.op_rising_edge(a).unwrap();
    assert_ne!(first, edge);
    assert_eq!(n.operators().count(), 2);
    assert_eq!(n.signal(a).endpoints.len(), 2);
}

#[test]
fn nary_results_are_never_cached() {
    let mut n = Netlist::new();
    let a = n.sig("a", HdlType::vector(4));
    let b = n.sig("b", HdlType::vector(4));
    let x = n.op_and(a, b).unwrap();
    let y = n.op_and(a, b).unwrap();
    assert_ne!(x, y);
    assert_eq!(n.operators().count(), 2);
    for r in [x, y] {
        let origin = n.signal(r).origin.unwrap();
        assert_eq!(n.signal(r).drivers.len(), 1);
        assert!(n.signal(r).drivers.contains(&NodeRef::Operator(origin)));
        assert!(n.signal(r).has_generic_name);
    }
}

#[test]
fn invalid_operands_fail_before_mutation() {
    let mut n = Netlist::new();
    let a = n.sig("a", HdlType::Integer);
    let signals = n.signal_count();
    for bad in [
        Term::Interface("axis".into()),
        Term::Type(HdlType::Integer),
        Term::Signal(SignalId::from_raw(40)),
    ] {
        let err = n.nary_op(a, OpKind::Add, [bad]).unwrap_err();
        assert!(matches!(err, RtlError::InvalidOperand { .. }));
        assert_eq!(err.code().to_string(), "E300");
    }
    assert_eq!(n.signal_count(), signals);
    assert_eq!(n.operators().count(), 0);
    assert!(n.signal(a).endpoints.is_empty());
}

#[test]
fn same_signal_predicate() {
    let mut n = Netlist::new();
    let a = n.sig("a", HdlType::Integer);
    let b = n.sig("b", HdlType::Integer);
    let x = n.op_mul(a, b).unwrap();
    let y = n.op_mul(a, b).unwrap();
    let z = n.op_mul(b, a).unwrap();
    assert!(n.are_same_signals(x, y));
    assert!(!n.are_same_signals(x, z));
    assert!(!n.are_same_signals(a, b));
    assert!(n.are_same_signals(a, a));
}

#[test]
fn guarded_assignments_resolve_by_declaration_order() {
    let mut n = Netlist::new();
    let hi = n
        .sig_with_default("hi", HdlType::Bool, Value::boolean(true))
        .unwrap();
    let lo = n
        .sig_with_default("lo", HdlType::Bool, Value::boolean(false))
        .unwrap();
    let q = n
        .sig_with_default("q", HdlType::vector(2), Value::vector(0, 2))
        .unwrap();
    n.assign_when(q, Value::vector(1, 2), [hi]).unwrap();
    n.assign_when(q, Value::vector(2, 2), [lo]).unwrap();
    assert_eq!(n.static_eval(q).unwrap(), Value::vector(1, 2));

    n.set_param(lo, Value::boolean(true));
    assert_eq!(n.static_eval(q).unwrap(), Value::vector(2, 2));
}

#[test]
fn second_unconditional_driver_is_rejected() {
    let mut n = Netlist::new();
    let q = n.sig("q", HdlType::Bit);
    n.assign(q, Value::bit(true)).unwrap();
    let err = n.assign(q, Value::bit(false)).unwrap_err();
    assert_eq!(err, RtlError::MultipleDrivers { signal: "q".into() });
    assert_eq!(n.signal(q).drivers.len(), 1);
}

#[test]
fn indexed_reassignment_writes_through() {
    let mut n = Netlist::new();
    let v = n
        .sig_with_default("v", HdlType::vector(8), Value::vector(0, 8))
        .unwrap();
    let part = n.op_slice(v, 7, 4).unwrap();
    assert_eq!(n.signal(part).ty, HdlType::vector(4));
    let op = n.is_indexed_by_sole_driver(part).unwrap();
    n.assign(part, Value::vector(0b1010, 4)).unwrap();
    assert!(n.is_write_through(op));
    assert!(n.signal(part).endpoints.contains(&NodeRef::Operator(op)));
    assert_eq!(n.static_eval(v).unwrap().as_i64(), Some(0b1010_0000));
}

#[test]
fn widths_fold_through_parameters() {
    let mut n = Netlist::new();
    let w = n.param("W", Value::int(4));
    let x = n.sig("x", HdlType::vector_of(w));
    let both = n.op_concat(x, x).unwrap();
    let ty = n.signal(both).ty.clone();
    assert_eq!(ty.fixed_width(), None);
    assert_eq!(ty.bit_width(&mut n).unwrap(), 8);
    n.set_param(w, Value::int(6));
    assert_eq!(ty.bit_width(&mut n).unwrap(), 12);
    assert_eq!(ty.resolved(&mut n).unwrap(), HdlType::vector(12));
}
