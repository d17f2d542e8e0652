//! Conformance test helpers for hwtk.
//!
//! Provides a catalog-backed [`EntityParser`] standing in for a real HDL
//! front end, a few ready-made leaf units, and a pipeline function that
//! elaborates a unit and collects the emitted diagnostics for assertion in
//! integration tests.

#![warn(missing_docs)]

use hwtk_config::ElaborateConfig;
use hwtk_diagnostics::{Diagnostic, DiagnosticRenderer, DiagnosticSink, Severity, TerminalRenderer};
use hwtk_elaborate::{
    default_classes, elaborate, BundleShape, ElabError, ElaboratedUnit, EntityParser,
    Interface, InterfaceClass, InterfacePath, Param, ParsedEntity, PortShape, Unit,
};
use hwtk_rtl::{Entity, HdlType, Netlist, PortDecl, PortDirection, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Width of a catalog port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortWidth {
    /// A single `STD_LOGIC`.
    Bit,
    /// A vector of literal width.
    Fixed(u32),
    /// A vector whose width is the named generic.
    Generic(String),
}

/// An entity declaration as a parser would report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    /// Entity name.
    pub name: String,
    /// Integer generics with their default values.
    pub generics: Vec<(String, i64)>,
    /// Ports in declaration order.
    pub ports: Vec<(String, PortDirection, PortWidth)>,
}

impl EntityDecl {
    /// An entity without generics or ports.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            generics: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// Adds an integer generic.
    pub fn generic(mut self, name: &str, default: i64) -> Self {
        self.generics.push((name.to_string(), default));
        self
    }

    /// Adds an input port.
    pub fn input(mut self, name: &str, width: PortWidth) -> Self {
        self.ports.push((name.to_string(), PortDirection::In, width));
        self
    }

    /// Adds an output port.
    pub fn output(mut self, name: &str, width: PortWidth) -> Self {
        self.ports.push((name.to_string(), PortDirection::Out, width));
        self
    }
}

/// An [`EntityParser`] answering from a fixed set of declarations keyed by
/// file path.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<PathBuf, EntityDecl>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the entity found in `path`.
    pub fn with(mut self, path: &str, decl: EntityDecl) -> Self {
        self.entries.insert(PathBuf::from(path), decl);
        self
    }
}

impl EntityParser for Catalog {
    fn parse_entity(&self, path: &Path, decl: &mut Netlist) -> Result<ParsedEntity, ElabError> {
        let parse_error = |message: String| ElabError::Parse {
            path: path.display().to_string(),
            message,
        };
        let found = self
            .entries
            .get(path)
            .ok_or_else(|| parse_error("no entity declaration found".into()))?;
        let mut params = Vec::new();
        for (name, default) in &found.generics {
            let sig = decl.param(name.clone(), Value::int(*default));
            params.push(Param::new(name.clone(), sig));
        }
        let mut entity = Entity::new(found.name.clone());
        for (name, direction, width) in &found.ports {
            let ty = match width {
                PortWidth::Bit => HdlType::Bit,
                PortWidth::Fixed(w) => HdlType::vector(*w),
                PortWidth::Generic(g) => {
                    let param = params
                        .iter()
                        .find(|p| &p.name == g)
                        .ok_or_else(|| parse_error(format!("port `{name}` uses unknown generic `{g}`")))?;
                    HdlType::vector_of(param.signal)
                }
            };
            entity.ports.push(PortDecl::new(name.clone(), *direction, ty));
        }
        Ok(ParsedEntity { entity, params })
    }
}

/// The entities used throughout the conformance tests.
///
/// * `inv.vhd`: `a` in, `y` out.
/// * `dff.vhd`: `clk`, `d` in, `q` out.
/// * `fifo.vhd`: generic `W` (8); `clk`; bundles `din` and `dout` with
///   `data` of width `W` and `valid`.
pub fn standard_catalog() -> Catalog {
    Catalog::new()
        .with(
            "inv.vhd",
            EntityDecl::new("inv")
                .input("a", PortWidth::Bit)
                .output("y", PortWidth::Bit),
        )
        .with(
            "dff.vhd",
            EntityDecl::new("dff")
                .input("clk", PortWidth::Bit)
                .input("d", PortWidth::Bit)
                .output("q", PortWidth::Bit),
        )
        .with(
            "fifo.vhd",
            EntityDecl::new("fifo")
                .generic("W", 8)
                .input("clk", PortWidth::Bit)
                .input("din_data", PortWidth::Generic("W".into()))
                .input("din_valid", PortWidth::Bit)
                .output("dout_data", PortWidth::Generic("W".into()))
                .output("dout_valid", PortWidth::Bit),
        )
}

/// A leaf unit read from `path` of the [`standard_catalog`], with ports
/// grouped by the default interface classes.
pub fn leaf(name: &str, path: &str) -> Result<Unit, ElabError> {
    Unit::from_origin(name, path, &standard_catalog(), &default_classes())
}

/// The `fifo.vhd` leaf with its `din` and `dout` ports grouped into
/// bundles.
pub fn fifo() -> Result<Unit, ElabError> {
    let classes: Vec<Box<dyn InterfaceClass>> = vec![
        Box::new(BundleShape::new("din", &["data", "valid"])),
        Box::new(BundleShape::new("dout", &["data", "valid"])),
        Box::new(PortShape),
    ];
    Unit::from_origin("fifo", "fifo.vhd", &standard_catalog(), &classes)
}

/// A composite exposing `a` and `y` and wrapping one instance `u0` of
/// `inner`, which must have interfaces of the same names.
pub fn wrapper(name: &str, inner: &Unit) -> Result<Unit, ElabError> {
    let mut unit = Unit::new(name);
    unit.add_sub_unit("u0", inner)?;
    unit.add_interface(Interface::port("a", HdlType::Bit).external())?;
    unit.add_interface(Interface::port("y", HdlType::Bit).external())?;
    unit.connect(InterfacePath::own("a"), InterfacePath::sub("u0", "a"));
    unit.connect(InterfacePath::sub("u0", "y"), InterfacePath::own("y"));
    Ok(unit)
}

/// Result of running elaboration on one hierarchy.
#[derive(Debug)]
pub struct ElabRun {
    /// Elaborated instances in post-order; the top unit is last.
    pub units: Vec<ElaboratedUnit>,
    /// All diagnostics emitted during elaboration.
    pub diagnostics: Vec<Diagnostic>,
}

impl ElabRun {
    /// The top unit.
    pub fn top(&self) -> Option<&ElaboratedUnit> {
        self.units.last()
    }

    /// The instance at the dotted `path`.
    pub fn unit(&self, path: &str) -> Option<&ElaboratedUnit> {
        self.units.iter().find(|u| u.path == path)
    }

    /// Number of warning-severity diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Codes of all diagnostics, in emission order.
    pub fn codes(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.code.to_string()).collect()
    }

    /// All diagnostics rendered as terminal text.
    pub fn report(&self) -> String {
        TerminalRenderer::new().render_all(&self.diagnostics)
    }
}

/// Elaborates `unit` with `config`, collecting diagnostics.
pub fn run_elaboration(unit: &mut Unit, config: &ElaborateConfig) -> Result<ElabRun, ElabError> {
    let sink = DiagnosticSink::new();
    let units = elaborate(unit, config, &sink)?;
    Ok(ElabRun {
        units,
        diagnostics: sink.take_all(),
    })
}
