//! Recursive elaboration of a unit hierarchy.
//!
//! Sub-units are elaborated first. Their external interfaces are then
//! bridged into the parent's [`Context`] as `sig_<sub>_<path>` nets, the
//! parent's own interfaces are materialized, sources and declared
//! connections are wired, and the context is flattened. Finally the own
//! interfaces are rebound to the produced ports and, for composite units,
//! turned to face outward.

use crate::error::{warning_open_port, warning_unconnected_interface, ElabError};
use crate::interface::{find_in, Direction, Interface, InterfacePath};
use crate::unit::{BodyScope, Unit};
use hwtk_common::InternalError;
use hwtk_config::ElaborateConfig;
use hwtk_diagnostics::DiagnosticSink;
use hwtk_rtl::{
    Architecture, Component, ComponentInstance, Context, Entity, Netlist, PortDecl, SignalId,
};
use tracing::{debug, trace};

/// The flattened result for one unit instance.
#[derive(Debug, Clone)]
pub struct ElaboratedUnit {
    /// Dotted instance path from the top unit.
    pub path: String,
    /// The produced entity.
    pub entity: Entity,
    /// The produced architecture; `None` for leaf units.
    pub architecture: Option<Architecture>,
    /// Reference to the external source of a leaf unit, as a comment line.
    pub source: Option<String>,
    /// The flattened netlist of a composite unit, ready for simulation.
    pub netlist: Option<Netlist>,
}

impl ElaboratedUnit {
    /// Renders the unit as VHDL text, or the source reference for leaves.
    pub fn to_vhdl(&self) -> String {
        match (&self.architecture, &self.source) {
            (Some(arch), _) => format!("{}\n\n{}\n", self.entity, arch),
            (None, Some(src)) => format!("{src}\n"),
            (None, None) => format!("{}\n", self.entity),
        }
    }
}

/// Elaborates `unit` and everything below it.
///
/// Returns one [`ElaboratedUnit`] per instance in post-order, so the top
/// unit comes last. Any error aborts the whole hierarchy. Unconnected
/// interfaces are reported to `sink` when the configuration asks for it.
pub fn elaborate(
    unit: &mut Unit,
    config: &ElaborateConfig,
    sink: &DiagnosticSink,
) -> Result<Vec<ElaboratedUnit>, ElabError> {
    let mut out = Vec::new();
    let path = unit.name.clone();
    elaborate_unit(unit, &path, config, sink, &mut out)?;
    debug!(top = %path, units = out.len(), "elaboration finished");
    Ok(out)
}

fn elaborate_unit(
    unit: &mut Unit,
    path: &str,
    config: &ElaborateConfig,
    sink: &DiagnosticSink,
    out: &mut Vec<ElaboratedUnit>,
) -> Result<(), ElabError> {
    if unit.is_leaf() {
        elaborate_leaf(unit, path, out)
    } else {
        elaborate_composite(unit, path, config, sink, out)
    }
}

fn elaborate_leaf(unit: &mut Unit, path: &str, out: &mut Vec<ElaboratedUnit>) -> Result<(), ElabError> {
    debug!(unit = %path, "adopting external entity");
    let mut entity = unit
        .parsed
        .clone()
        .ok_or_else(|| InternalError::new(format!("leaf unit `{path}` has no parsed entity")))?;
    for port in &mut entity.ports {
        port.ty = port.ty.resolved(unit.decl_mut())?;
    }
    entity.generics = unit
        .params
        .iter()
        .map(|p| p.generic_decl(unit.decl()))
        .collect();
    if !unit.interfaces.iter().any(|i| i.is_extern) {
        return Err(ElabError::NoExternalInterface {
            unit: path.to_string(),
        });
    }
    for intf in &mut unit.interfaces {
        for leaf in intf.leaves_mut() {
            let name = leaf.port.clone().unwrap_or_else(|| leaf.name.clone());
            let port = match_port(&entity, &name, path)?;
            leaf.ty = Some(port.ty.clone());
            leaf.port = Some(port.name.clone());
        }
    }
    let source = unit.origin.as_ref().map(|o| format!("-- {}", o.display()));
    unit.component = Some(Component::new(entity.clone()));
    unit.entity = Some(entity.clone());
    unit.architecture = None;
    out.push(ElaboratedUnit {
        path: path.to_string(),
        entity,
        architecture: None,
        source,
        netlist: None,
    });
    Ok(())
}

fn elaborate_composite(
    unit: &mut Unit,
    path: &str,
    config: &ElaborateConfig,
    sink: &DiagnosticSink,
    out: &mut Vec<ElaboratedUnit>,
) -> Result<(), ElabError> {
    debug!(unit = %path, subs = unit.sub_units.len(), "elaborating composite unit");
    let mut ctx = Context::new(unit.name.clone(), config);

    for (name, sub) in &mut unit.sub_units {
        elaborate_unit(sub, &format!("{path}.{name}"), config, sink, out)?;
        register_sub(&mut ctx, name, sub)?;
    }

    adopt_source_shapes(unit, path)?;
    for intf in &mut unit.interfaces {
        for leaf in intf.leaves_mut() {
            if let Some(ty) = &leaf.ty {
                leaf.ty = Some(ty.resolved(&mut unit.decl)?);
            }
        }
    }
    let mut ports = Vec::new();
    for intf in &mut unit.interfaces {
        intf.materialize(&mut ctx, None)?;
        ports.extend(
            intf.leaves()
                .into_iter()
                .filter(|(_, l)| l.is_extern)
                .filter_map(|(_, l)| l.signal),
        );
    }
    for p in &unit.params {
        ctx.add_generic(p.generic_decl(&unit.decl));
    }

    let sources: Vec<(InterfacePath, InterfacePath)> = unit
        .interfaces
        .iter()
        .filter_map(|i| {
            let own = InterfacePath {
                unit: None,
                path: vec![i.name.clone()],
            };
            i.src.clone().map(|src| (src, own))
        })
        .collect();
    for (from, to) in &sources {
        wire(&mut ctx, &unit.interfaces, &unit.sub_units, path, from, to)?;
    }
    let (siblings, own): (Vec<_>, Vec<_>) = unit
        .connections
        .iter()
        .cloned()
        .partition(|c| c.from.unit.is_some() && c.to.unit.is_some());
    for c in siblings.iter().chain(&own) {
        wire(&mut ctx, &unit.interfaces, &unit.sub_units, path, &c.from, &c.to)?;
    }

    if let Some(body) = unit.body.clone() {
        let scope = body_scope(unit, &ctx);
        body(&mut ctx, &scope)?;
    }
    if config.warn_unconnected {
        report_unconnected(unit, &ctx, path, sink);
    }

    if ports.is_empty() {
        return Err(ElabError::NoExternalInterface {
            unit: path.to_string(),
        });
    }

    let (entity, architecture) = ctx.synthesize(&ports)?;
    for intf in &mut unit.interfaces {
        for leaf in intf.leaves_mut() {
            let Some(sig) = leaf.signal.filter(|_| leaf.is_extern) else {
                continue;
            };
            let name = ctx.netlist().signal(sig).name.clone();
            let port = match_port(&entity, &name, path)?;
            let outward = Direction::from(port.direction);
            if leaf.direction != Direction::Unknown && leaf.direction != outward {
                return Err(ElabError::DirectionConflict {
                    unit: path.to_string(),
                    from: name,
                    to: port.name.clone(),
                    reason: format!("declared {} but the logic makes it {outward}", leaf.direction),
                });
            }
            leaf.port = Some(port.name.clone());
            leaf.ty = Some(port.ty.clone());
            // inside view: a port driven from inside is a sink for the logic
            leaf.direction = outward.reversed();
        }
    }

    unit.component = Some(Component::new(entity.clone()));
    unit.entity = Some(entity.clone());
    unit.architecture = Some(architecture.clone());
    for intf in &mut unit.interfaces {
        intf.remove_signals();
        intf.reverse_direction();
    }
    for (_, sub) in &mut unit.sub_units {
        for intf in &mut sub.interfaces {
            intf.remove_signals();
        }
    }
    out.push(ElaboratedUnit {
        path: path.to_string(),
        entity,
        architecture: Some(architecture),
        source: None,
        netlist: Some(ctx.into_netlist()),
    });
    Ok(())
}

/// Bridges the external interfaces of an elaborated sub-unit into the
/// parent and records its instantiation.
fn register_sub(ctx: &mut Context, name: &str, sub: &mut Unit) -> Result<(), ElabError> {
    let mut port_map = Vec::new();
    for intf in sub.interfaces.iter_mut().filter(|i| i.is_extern) {
        intf.materialize(ctx, Some(name))?;
        for leaf in intf.leaves_mut() {
            if let (Some(port), Some(sig)) = (&leaf.port, leaf.signal) {
                port_map.push((port.clone(), ctx.netlist().signal(sig).name.clone()));
            }
        }
    }
    let component = sub
        .component
        .clone()
        .ok_or_else(|| InternalError::new(format!("sub-unit `{name}` was not elaborated")))?;
    let mut declared = component.entity;
    for g in &mut declared.generics {
        g.value = None;
    }
    let generic_map = sub
        .params
        .iter()
        .map(|p| (p.name.clone(), p.get(sub.decl())))
        .collect();
    trace!(instance = %name, ports = port_map.len(), "sub-unit bridged");
    ctx.add_instance(
        Component::new(declared),
        ComponentInstance {
            name: name.to_string(),
            component: sub.name.clone(),
            generic_map,
            port_map,
        },
    );
    Ok(())
}

fn lookup<'a>(
    own: &'a [Interface],
    subs: &'a [(String, Unit)],
    p: &InterfacePath,
) -> Option<&'a Interface> {
    match &p.unit {
        None => find_in(own, &p.path),
        Some(u) => {
            let (_, sub) = subs.iter().find(|(n, _)| n == u)?;
            find_in(&sub.interfaces, &p.path)
        }
    }
}

fn unknown(unit: &str, p: &InterfacePath) -> ElabError {
    ElabError::UnknownInterface {
        unit: unit.to_string(),
        path: p.to_string(),
    }
}

/// Gives shapeless own interfaces the shape of their source.
fn adopt_source_shapes(unit: &mut Unit, path: &str) -> Result<(), ElabError> {
    for i in 0..unit.interfaces.len() {
        if !unit.interfaces[i].is_shapeless() {
            continue;
        }
        let Some(src) = unit.interfaces[i].src.clone() else {
            let name = unit.interfaces[i].name.clone();
            return Err(ElabError::ShapeMismatch {
                unit: path.to_string(),
                from: name.clone(),
                to: name,
                reason: "interface has neither a type nor a source".into(),
            });
        };
        let shape = lookup(&unit.interfaces, &unit.sub_units, &src)
            .ok_or_else(|| unknown(path, &src))?
            .clone();
        unit.interfaces[i].adopt_shape(&shape);
    }
    Ok(())
}

struct Endpoint {
    own: bool,
    leaves: Vec<(Vec<String>, SignalId, Direction)>,
}

fn endpoint(
    own: &[Interface],
    subs: &[(String, Unit)],
    unit: &str,
    p: &InterfacePath,
) -> Result<Endpoint, ElabError> {
    let intf = lookup(own, subs, p).ok_or_else(|| unknown(unit, p))?;
    let mut leaves = Vec::new();
    for (rel, leaf) in intf.leaves() {
        let sig = leaf.signal.ok_or_else(|| unknown(unit, p))?;
        leaves.push((rel, sig, leaf.direction));
    }
    Ok(Endpoint {
        own: p.unit.is_none(),
        leaves,
    })
}

/// Connects two interfaces leaf by leaf.
///
/// Between two sub-units the `Out` leaf drives the `In` leaf. Between an
/// own interface and a sub-unit the sub-unit's direction decides who
/// drives. Between two own interfaces `to` is driven from `from`.
fn wire(
    ctx: &mut Context,
    own: &[Interface],
    subs: &[(String, Unit)],
    unit: &str,
    from: &InterfacePath,
    to: &InterfacePath,
) -> Result<(), ElabError> {
    let a = endpoint(own, subs, unit, from)?;
    let b = endpoint(own, subs, unit, to)?;
    let mismatch = |reason: String| ElabError::ShapeMismatch {
        unit: unit.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        reason,
    };
    let conflict = |da: Direction, db: Direction| ElabError::DirectionConflict {
        unit: unit.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        reason: format!("{da} cannot be connected to {db}"),
    };
    let paths_a: Vec<&Vec<String>> = a.leaves.iter().map(|l| &l.0).collect();
    let paths_b: Vec<&Vec<String>> = b.leaves.iter().map(|l| &l.0).collect();
    if paths_a != paths_b {
        return Err(mismatch("the interfaces have different members".into()));
    }
    for ((rel, sa, da), (_, sb, db)) in a.leaves.iter().zip(&b.leaves) {
        let wa = ctx.netlist().signal(*sa).ty.fixed_width();
        let wb = ctx.netlist().signal(*sb).ty.fixed_width();
        if wa != wb {
            return Err(mismatch(format!(
                "member `{}` is {} bits wide on one side and {} on the other",
                rel.join("."),
                wa.unwrap_or(0),
                wb.unwrap_or(0)
            )));
        }
        let (dst, src) = match (a.own, b.own) {
            (true, true) => (*sb, *sa),
            (false, false) => match (da, db) {
                (Direction::Out, Direction::In) => (*sb, *sa),
                (Direction::In, Direction::Out) => (*sa, *sb),
                _ => return Err(conflict(*da, *db)),
            },
            (true, false) => match db {
                Direction::In => (*sb, *sa),
                Direction::Out => (*sa, *sb),
                Direction::Unknown => return Err(conflict(*da, *db)),
            },
            (false, true) => match da {
                Direction::In => (*sa, *sb),
                Direction::Out => (*sb, *sa),
                Direction::Unknown => return Err(conflict(*da, *db)),
            },
        };
        trace!(
            dst = %ctx.netlist().signal(dst).name,
            src = %ctx.netlist().signal(src).name,
            "connection wired"
        );
        ctx.netlist_mut().assign(dst, src)?;
    }
    Ok(())
}

fn body_scope(unit: &Unit, ctx: &Context) -> BodyScope {
    let mut scope = BodyScope::default();
    let mut add = |prefix: &str, intf: &Interface| {
        for (rel, leaf) in intf.leaves() {
            if let Some(sig) = leaf.signal {
                let mut key = format!("{prefix}{}", intf.name);
                for r in rel {
                    key.push('.');
                    key.push_str(&r);
                }
                scope.signals.insert(key, sig);
            }
        }
    };
    for intf in &unit.interfaces {
        add("", intf);
    }
    for (name, sub) in &unit.sub_units {
        for intf in &sub.interfaces {
            add(&format!("{name}."), intf);
        }
    }
    for p in &unit.params {
        scope.params.insert(p.name.clone(), p.get(unit.decl()));
    }
    trace!(unit = %ctx.name(), signals = scope.signals.len(), "body scope built");
    scope
}

fn is_floating(ctx: &Context, sig: SignalId) -> bool {
    let s = ctx.netlist().signal(sig);
    s.drivers.is_empty() && s.endpoints.is_empty()
}

fn report_unconnected(unit: &Unit, ctx: &Context, path: &str, sink: &DiagnosticSink) {
    for intf in &unit.interfaces {
        for (rel, leaf) in intf.leaves() {
            if leaf.signal.is_some_and(|s| is_floating(ctx, s)) {
                let mut name = vec![intf.name.clone()];
                name.extend(rel);
                sink.emit(warning_unconnected_interface(path, &name.join(".")));
            }
        }
    }
    for (sub_name, sub) in &unit.sub_units {
        for intf in &sub.interfaces {
            for (rel, leaf) in intf.leaves() {
                if leaf.signal.is_some_and(|s| is_floating(ctx, s)) {
                    let mut name = vec![intf.name.clone()];
                    name.extend(rel);
                    sink.emit(warning_open_port(path, sub_name, &name.join(".")));
                }
            }
        }
    }
}

fn match_port<'a>(entity: &'a Entity, name: &str, unit: &str) -> Result<&'a PortDecl, ElabError> {
    let mut hits = entity.ports.iter().filter(|p| p.name == name);
    match (hits.next(), hits.count()) {
        (Some(port), 0) => Ok(port),
        (None, _) => Err(ElabError::UnmatchedPort {
            unit: unit.to_string(),
            interface: name.to_string(),
        }),
        (Some(_), more) => Err(ElabError::AmbiguousPort {
            unit: unit.to_string(),
            interface: name.to_string(),
            count: more + 1,
        }),
    }
}
