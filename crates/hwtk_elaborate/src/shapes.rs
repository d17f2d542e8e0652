//! Interface classes: recognizers that group the ports of a parsed entity
//! into interfaces.

use crate::interface::{Direction, Interface};
use hwtk_rtl::Entity;

/// Recognizes one interface shape among an entity's ports.
///
/// Classes run in order. Each sees which ports earlier classes already
/// claimed and marks the ports it takes, so every port ends up in at most
/// one interface.
pub trait InterfaceClass {
    /// Extracts every occurrence of the shape among unclaimed ports.
    fn try_extract(&self, entity: &Entity, claimed: &mut [bool]) -> Vec<Interface>;
}

/// One leaf interface per port. Claims every port still unclaimed, so it
/// belongs at the end of a class list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortShape;

impl InterfaceClass for PortShape {
    fn try_extract(&self, entity: &Entity, claimed: &mut [bool]) -> Vec<Interface> {
        let mut out = Vec::new();
        for (port, taken) in entity.ports.iter().zip(claimed.iter_mut()) {
            if *taken {
                continue;
            }
            *taken = true;
            let mut intf = Interface::port(port.name.clone(), port.ty.clone())
                .with_direction(Direction::from(port.direction));
            intf.port = Some(port.name.clone());
            out.push(intf);
        }
        out
    }
}

/// A bundle named `name` whose fields are the ports `<name>_<field>`.
///
/// All fields must be present and unclaimed; a partial match claims
/// nothing.
#[derive(Debug, Clone)]
pub struct BundleShape {
    /// Bundle name and port prefix.
    pub name: String,
    /// Field names in order.
    pub fields: Vec<String>,
}

impl BundleShape {
    /// Creates a bundle shape.
    pub fn new(name: &str, fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl InterfaceClass for BundleShape {
    fn try_extract(&self, entity: &Entity, claimed: &mut [bool]) -> Vec<Interface> {
        let mut found = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let port_name = format!("{}_{field}", self.name);
            let hit = entity
                .ports
                .iter()
                .enumerate()
                .find(|(i, p)| p.name == port_name && !claimed[*i]);
            match hit {
                Some((i, p)) => found.push((i, field, p)),
                None => return Vec::new(),
            }
        }
        let subs = found
            .into_iter()
            .map(|(i, field, p)| {
                claimed[i] = true;
                let mut leaf = Interface::port(field.clone(), p.ty.clone())
                    .with_direction(Direction::from(p.direction));
                leaf.port = Some(p.name.clone());
                leaf
            })
            .collect();
        vec![Interface::bundle(self.name.clone(), subs)]
    }
}

/// The classes used when a unit names none: one interface per port.
pub fn default_classes() -> Vec<Box<dyn InterfaceClass>> {
    vec![Box::new(PortShape)]
}
