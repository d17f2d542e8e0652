//! End-to-end elaboration of unit hierarchies.

use hwtk_config::ElaborateConfig;
use hwtk_conformance::{fifo, leaf, run_elaboration, wrapper};
use hwtk_elaborate::{
    default_classes, Direction, ElabError, Interface, InterfacePath, Param, ParsedEntity, Unit,
};
use hwtk_rtl::{
    Entity, HdlType, Netlist, PortDecl, PortDirection, Statement, Value,
};
use std::path::Path;

fn defaults() -> ElaborateConfig {
    ElaborateConfig::default()
}

#[test]
fn every_unit_needs_an_external_interface() {
    let inv = leaf("inv", "inv.vhd").unwrap();
    let mut top = Unit::new("top");
    top.add_sub_unit("u0", &inv).unwrap();
    top.add_interface(Interface::port("a", HdlType::Bit)).unwrap();
    top.connect(InterfacePath::own("a"), InterfacePath::sub("u0", "a"));
    let err = run_elaboration(&mut top, &defaults()).unwrap_err();
    assert_eq!(err, ElabError::NoExternalInterface { unit: "top".into() });
    assert_eq!(err.code().to_string(), "E403");
    assert!(top.entity.is_none());
    assert!(top.architecture.is_none());
}

#[test]
fn outward_directions_match_ports_at_every_level() {
    let inv = leaf("inv", "inv.vhd").unwrap();
    let mid = wrapper("mid", &inv).unwrap();
    let mut top = wrapper("top", &mid).unwrap();
    let run = run_elaboration(&mut top, &defaults()).unwrap();

    let paths: Vec<&str> = run.units.iter().map(|u| u.path.as_str()).collect();
    assert_eq!(paths, vec!["top.u0.u0", "top.u0", "top"]);

    let mid = top.sub_unit("u0").unwrap();
    let inv = mid.sub_unit("u0").unwrap();
    for unit in [&top, mid, inv] {
        assert_eq!(unit.interface("a").unwrap().direction, Direction::In, "{}", unit.name);
        assert_eq!(unit.interface("y").unwrap().direction, Direction::Out, "{}", unit.name);
        let entity = unit.entity.as_ref().unwrap();
        assert_eq!(entity.port("a").unwrap().direction, PortDirection::In);
        assert_eq!(entity.port("y").unwrap().direction, PortDirection::Out);
        assert!(unit.interfaces.iter().all(|i| i.signal.is_none()));
    }

    let vhdl = run.top().unwrap().to_vhdl();
    assert!(vhdl.contains("ENTITY top IS"));
    assert!(vhdl.contains("sig_u0_a <= a;"));
    assert!(vhdl.contains("y <= sig_u0_y;"));
    assert!(vhdl.contains("COMPONENT mid IS"));
    assert_eq!(run.unit("top.u0.u0").unwrap().to_vhdl(), "-- inv.vhd\n");
}

#[test]
fn names_are_unique_per_unit() {
    let inv = leaf("inv", "inv.vhd").unwrap();
    let mut top = Unit::new("top");
    top.add_interface(Interface::port("a", HdlType::Bit)).unwrap();
    let err = top.add_sub_unit("a", &inv).unwrap_err();
    assert_eq!(
        err,
        ElabError::DuplicateName {
            unit: "top".into(),
            name: "a".into()
        }
    );
    assert!(top.add_interface(Interface::port("a", HdlType::Bit)).is_err());
    assert!(top.add_param("a", Value::int(1)).is_err());
}

#[test]
fn duplicate_nets_in_a_body_are_rejected() {
    let mut top = Unit::new("top").with_body(|ctx, _| {
        ctx.sig("a", HdlType::Bit)?;
        Ok(())
    });
    top.add_interface(Interface::port("a", HdlType::Bit).external()).unwrap();
    let err = run_elaboration(&mut top, &defaults()).unwrap_err();
    assert!(matches!(err, ElabError::Rtl(_)));
    assert_eq!(err.code().to_string(), "E301");
}

#[test]
fn unmatched_ports_abort_every_ancestor() {
    let mut inv = leaf("inv", "inv.vhd").unwrap();
    let mut ghost = Interface::port("en", HdlType::Bit).external();
    ghost.port = Some("en".into());
    inv.add_interface(ghost).unwrap();
    let mut top = wrapper("top", &inv).unwrap();
    let err = run_elaboration(&mut top, &defaults()).unwrap_err();
    assert_eq!(
        err,
        ElabError::UnmatchedPort {
            unit: "top.u0".into(),
            interface: "en".into()
        }
    );
    assert!(top.entity.is_none());
}

fn condp_parser(_: &Path, decl: &mut Netlist) -> Result<ParsedEntity, ElabError> {
    let w = decl.param("W", Value::int(8));
    let wide = decl.op_gt(w, 4)?;
    let width = decl.op_ternary(wide, 8, 4)?;
    let mut entity = Entity::new("condp");
    entity
        .ports
        .push(PortDecl::new("d", PortDirection::In, HdlType::vector_of(width)));
    entity
        .ports
        .push(PortDecl::new("q", PortDirection::Out, HdlType::vector_of(width)));
    Ok(ParsedEntity {
        entity,
        params: vec![Param::new("W", w)],
    })
}

#[test]
fn conditional_widths_follow_parameters() {
    let template = Unit::from_origin("condp", "condp.vhd", &condp_parser, &default_classes()).unwrap();

    let mut wide = template.instantiate();
    run_elaboration(&mut wide, &defaults()).unwrap();
    assert_eq!(wide.entity.as_ref().unwrap().ports[0].ty, HdlType::vector(8));

    let mut narrow = template.instantiate();
    narrow.set_param("W", Value::int(2)).unwrap();
    run_elaboration(&mut narrow, &defaults()).unwrap();
    let entity = narrow.entity.as_ref().unwrap();
    assert_eq!(entity.ports[0].ty, HdlType::vector(4));
    assert_eq!(entity.generics[0].value, Some(Value::int(2)));
    assert_eq!(narrow.interface("q").unwrap().ty, Some(HdlType::vector(4)));
    // the template keeps its own value
    assert_eq!(template.param("W").unwrap(), Value::int(8));
}

#[test]
fn bundles_are_mirrored_and_bridged() {
    let fifo = fifo().unwrap();
    let mut top = Unit::new("top");
    top.add_sub_unit("u0", &fifo).unwrap();
    top.sub_unit_mut("u0")
        .unwrap()
        .set_param("W", Value::int(4))
        .unwrap();
    for name in ["din", "dout", "clk"] {
        top.add_interface(Interface::mirror(name, InterfacePath::sub("u0", name)).external())
            .unwrap();
    }
    let run = run_elaboration(&mut top, &defaults()).unwrap();
    assert_eq!(run.warning_count(), 0);

    let entity = top.entity.as_ref().unwrap();
    let ports: Vec<(&str, PortDirection, HdlType)> = entity
        .ports
        .iter()
        .map(|p| (p.name.as_str(), p.direction, p.ty.clone()))
        .collect();
    assert_eq!(
        ports,
        vec![
            ("din_data", PortDirection::In, HdlType::vector(4)),
            ("din_valid", PortDirection::In, HdlType::Bit),
            ("dout_data", PortDirection::Out, HdlType::vector(4)),
            ("dout_valid", PortDirection::Out, HdlType::Bit),
            ("clk", PortDirection::In, HdlType::Bit),
        ]
    );
    assert_eq!(top.interface("din.data").unwrap().direction, Direction::In);
    assert_eq!(top.interface("dout.valid").unwrap().direction, Direction::Out);

    let arch = top.architecture.as_ref().unwrap();
    let Some(Statement::Instance(inst)) = arch.statements.last() else {
        panic!("expected the fifo instance last");
    };
    assert_eq!(inst.generic_map, vec![("W".to_string(), Value::int(4))]);
    assert!(inst
        .port_map
        .contains(&("din_data".to_string(), "sig_u0_din_data".to_string())));
    // the declared component leaves the generic open
    assert_eq!(arch.components[0].entity.generics[0].value, None);
}

#[test]
fn repeated_components_are_declared_once() {
    let inv = leaf("inv", "inv.vhd").unwrap();
    let mut top = Unit::new("chain");
    top.add_sub_unit("u0", &inv).unwrap();
    top.add_sub_unit("u1", &inv).unwrap();
    top.add_interface(Interface::port("a", HdlType::Bit).external()).unwrap();
    top.add_interface(Interface::port("y", HdlType::Bit).external()).unwrap();
    top.connect(InterfacePath::own("a"), InterfacePath::sub("u0", "a"));
    top.connect(InterfacePath::sub("u0", "y"), InterfacePath::sub("u1", "a"));
    top.connect(InterfacePath::sub("u1", "y"), InterfacePath::own("y"));
    run_elaboration(&mut top, &defaults()).unwrap();

    let arch = top.architecture.as_ref().unwrap();
    assert_eq!(arch.components.len(), 1);
    let instances = arch
        .statements
        .iter()
        .filter(|s| matches!(s, Statement::Instance(_)))
        .count();
    assert_eq!(instances, 2);
    assert!(arch.to_string().contains("sig_u1_a <= sig_u0_y;"));
}

#[test]
fn open_interfaces_are_reported() {
    let dff = leaf("dff", "dff.vhd").unwrap();
    let mut top = Unit::new("top");
    top.add_sub_unit("r0", &dff).unwrap();
    top.add_interface(Interface::port("d", HdlType::Bit).external()).unwrap();
    top.add_interface(Interface::port("spare", HdlType::Bit).external()).unwrap();
    top.connect(InterfacePath::own("d"), InterfacePath::sub("r0", "d"));
    let run = run_elaboration(&mut top, &defaults()).unwrap();
    assert_eq!(run.codes(), vec!["W400", "W401", "W401"]);
    assert!(run.diagnostics[0].message.contains("spare"));
    let report = run.report();
    assert!(report.starts_with("warning[W400]: interface `spare` is not connected\n  --> top\n"));
    assert!(report.contains("warning[W401]: port `q` of `r0` is left open"));

    let mut quiet = defaults();
    quiet.warn_unconnected = false;
    let mut again = top.instantiate();
    let run = run_elaboration(&mut again, &quiet).unwrap();
    assert!(run.diagnostics.is_empty());
}

#[test]
fn artifacts_serialize() {
    let inv = leaf("inv", "inv.vhd").unwrap();
    let mut top = wrapper("top", &inv).unwrap();
    run_elaboration(&mut top, &defaults()).unwrap();
    let json = serde_json::to_string(top.entity.as_ref().unwrap()).unwrap();
    let back: Entity = serde_json::from_str(&json).unwrap();
    assert_eq!(&back, top.entity.as_ref().unwrap());
}
