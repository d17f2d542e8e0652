//! Units: the hierarchical, parameterized modules elaboration flattens.

use crate::error::ElabError;
use crate::interface::{find_in, Interface, InterfacePath};
use crate::param::Param;
use crate::parser::EntityParser;
use crate::shapes::InterfaceClass;
use hwtk_rtl::{Architecture, Component, Context, Entity, Netlist, SignalId, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What user logic sees while its unit is flattened.
#[derive(Debug, Clone, Default)]
pub struct BodyScope {
    /// Nets of the unit's own interface leaves by `.`-joined path, and of
    /// sub-unit leaves as `<sub>.<path>`.
    pub signals: BTreeMap<String, SignalId>,
    /// Current parameter values.
    pub params: BTreeMap<String, Value>,
}

impl BodyScope {
    /// Looks up an interface net.
    pub fn signal(&self, path: &str) -> Option<SignalId> {
        self.signals.get(path).copied()
    }

    /// Looks up a parameter value.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// User logic of a composite unit, run after all connections are wired.
pub type Body = Arc<dyn Fn(&mut Context, &BodyScope) -> Result<(), ElabError>>;

/// A connection declared between two interfaces visible in a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Where data comes from (for own-to-own connections).
    pub from: InterfacePath,
    /// Where data goes.
    pub to: InterfacePath,
}

/// A hardware module: either a leaf backed by an external HDL source or a
/// composite of sub-units.
///
/// Cloning is a deep copy. Every sub-unit is stored as its own instance,
/// so siblings built from the same template never share state.
#[derive(Clone)]
pub struct Unit {
    /// Unit name, used as the entity name.
    pub name: String,
    /// Source file of a leaf unit.
    pub origin: Option<PathBuf>,
    /// Interfaces in declaration order.
    pub interfaces: Vec<Interface>,
    /// Sub-units in declaration order, keyed by instance name.
    pub sub_units: Vec<(String, Unit)>,
    /// Parameters in declaration order.
    pub params: Vec<Param>,
    /// Declared connections.
    pub connections: Vec<Connection>,
    /// Entity produced by elaboration.
    pub entity: Option<Entity>,
    /// Architecture produced by elaboration of a composite unit.
    pub architecture: Option<Architecture>,
    /// Handle for instantiating the elaborated unit in a parent.
    pub component: Option<Component>,
    pub(crate) parsed: Option<Entity>,
    pub(crate) body: Option<Body>,
    pub(crate) decl: Netlist,
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("interfaces", &self.interfaces)
            .field("sub_units", &self.sub_units)
            .field("params", &self.params)
            .field("connections", &self.connections)
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

impl Unit {
    /// An empty composite unit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
            interfaces: Vec::new(),
            sub_units: Vec::new(),
            params: Vec::new(),
            connections: Vec::new(),
            entity: None,
            architecture: None,
            component: None,
            parsed: None,
            body: None,
            decl: Netlist::new(),
        }
    }

    /// A leaf unit whose entity is read from `path`.
    ///
    /// The entity's ports are grouped into interfaces by `classes`, in
    /// order. Every port must be claimed by some interface, and extracted
    /// interface names must be unique. All extracted interfaces are
    /// external, with directions as seen from outside.
    pub fn from_origin(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        parser: &dyn EntityParser,
        classes: &[Box<dyn InterfaceClass>],
    ) -> Result<Self, ElabError> {
        let mut unit = Self::new(name);
        let path = path.as_ref();
        let parsed = parser.parse_entity(path, &mut unit.decl)?;
        let mut claimed = vec![false; parsed.entity.ports.len()];
        for class in classes {
            for mut intf in class.try_extract(&parsed.entity, &mut claimed) {
                intf.set_extern();
                unit.add_interface(intf)?;
            }
        }
        if let Some(i) = claimed.iter().position(|c| !c) {
            return Err(ElabError::UnclaimedPort {
                unit: unit.name.clone(),
                port: parsed.entity.ports[i].name.clone(),
            });
        }
        unit.params = parsed.params;
        unit.origin = Some(path.to_path_buf());
        unit.parsed = Some(parsed.entity);
        Ok(unit)
    }

    fn check_free(&self, name: &str) -> Result<(), ElabError> {
        let taken = self.interfaces.iter().any(|i| i.name == name)
            || self.sub_units.iter().any(|(n, _)| n == name)
            || self.params.iter().any(|p| p.name == name);
        if taken {
            return Err(ElabError::DuplicateName {
                unit: self.name.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Registers an interface.
    pub fn add_interface(&mut self, intf: Interface) -> Result<(), ElabError> {
        self.check_free(&intf.name)?;
        self.interfaces.push(intf);
        Ok(())
    }

    /// Registers a fresh instance of `template` as sub-unit `name`.
    pub fn add_sub_unit(&mut self, name: impl Into<String>, template: &Unit) -> Result<(), ElabError> {
        let name = name.into();
        self.check_free(&name)?;
        self.sub_units.push((name, template.instantiate()));
        Ok(())
    }

    /// Declares a parameter and returns its signal in the declaration
    /// netlist, for use in interface widths.
    pub fn add_param(&mut self, name: &str, value: Value) -> Result<SignalId, ElabError> {
        self.check_free(name)?;
        let sig = self.decl.param(name, value);
        self.params.push(Param::new(name, sig));
        Ok(sig)
    }

    fn find_param(&self, name: &str) -> Result<&Param, ElabError> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ElabError::UnknownParam {
                unit: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Current value of a parameter.
    pub fn param(&self, name: &str) -> Result<Value, ElabError> {
        Ok(self.find_param(name)?.get(&self.decl))
    }

    /// Changes a parameter. Widths depending on it re-fold at elaboration.
    pub fn set_param(&mut self, name: &str, value: Value) -> Result<(), ElabError> {
        let p = self.find_param(name)?.clone();
        p.set(&mut self.decl, value);
        Ok(())
    }

    /// Declares that `from` feeds `to`.
    pub fn connect(&mut self, from: InterfacePath, to: InterfacePath) {
        self.connections.push(Connection { from, to });
    }

    /// Sets the user logic of a composite unit.
    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut Context, &BodyScope) -> Result<(), ElabError> + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// The declaration netlist holding parameters and width expressions.
    pub fn decl(&self) -> &Netlist {
        &self.decl
    }

    /// Mutable declaration netlist, for building width expressions.
    pub fn decl_mut(&mut self) -> &mut Netlist {
        &mut self.decl
    }

    /// Returns `true` for units backed by an external source.
    pub fn is_leaf(&self) -> bool {
        self.origin.is_some()
    }

    /// Looks up a sub-unit.
    pub fn sub_unit(&self, name: &str) -> Option<&Unit> {
        self.sub_units.iter().find(|(n, _)| n == name).map(|(_, u)| u)
    }

    /// Mutable variant of [`sub_unit`](Self::sub_unit).
    pub fn sub_unit_mut(&mut self, name: &str) -> Option<&mut Unit> {
        self.sub_units
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, u)| u)
    }

    /// Looks up an interface by `.`-separated path.
    pub fn interface(&self, path: &str) -> Option<&Interface> {
        find_in(&self.interfaces, &InterfacePath::own(path).path)
    }

    /// A fresh, unelaborated copy of this unit.
    pub fn instantiate(&self) -> Unit {
        let mut copy = self.clone();
        copy.entity = None;
        copy.architecture = None;
        copy.component = None;
        for intf in &mut copy.interfaces {
            intf.remove_signals();
        }
        copy
    }
}
