//! Interfaces: named, possibly nested groups of ports with a direction.

use hwtk_rtl::{Context, HdlType, PortDirection, RtlError, SignalId};
use std::fmt;

/// The direction of an interface leaf.
///
/// On an elaborated unit, `In` means data flows into the unit. While a
/// composite unit is being flattened its own interfaces hold the opposite,
/// inside view: an input port is a source for the logic inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Read by the unit.
    In,
    /// Driven by the unit.
    Out,
    /// Not known yet, or bidirectional.
    Unknown,
}

impl Direction {
    /// The complementary direction. `Unknown` stays `Unknown`.
    pub fn reversed(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
            Direction::Unknown => Direction::Unknown,
        }
    }
}

impl From<PortDirection> for Direction {
    fn from(d: PortDirection) -> Self {
        match d {
            PortDirection::In => Direction::In,
            PortDirection::Out => Direction::Out,
            PortDirection::InOut => Direction::Unknown,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Unknown => "unknown",
        })
    }
}

/// Addresses an interface from inside a unit: either one of the unit's own
/// interfaces or an interface of one of its sub-units.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfacePath {
    /// Sub-unit name, or `None` for the unit's own interfaces.
    pub unit: Option<String>,
    /// Interface names from the top-level interface down.
    pub path: Vec<String>,
}

fn split(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

impl InterfacePath {
    /// One of the unit's own interfaces, `.`-separated for nested ones.
    pub fn own(path: &str) -> Self {
        Self {
            unit: None,
            path: split(path),
        }
    }

    /// An interface of sub-unit `unit`.
    pub fn sub(unit: &str, path: &str) -> Self {
        Self {
            unit: Some(unit.to_string()),
            path: split(path),
        }
    }
}

impl fmt::Display for InterfacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(u) = &self.unit {
            write!(f, "{u}.")?;
        }
        write!(f, "{}", self.path.join("."))
    }
}

/// A named port, or a bundle of nested interfaces.
///
/// Leaves carry a type; bundles carry sub-interfaces. `signal` is working
/// state that only exists while the owning unit is being flattened, and
/// `port` is the entity port a leaf was bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    /// Interface name, unique among its siblings.
    pub name: String,
    /// Direction of a leaf.
    pub direction: Direction,
    /// Whether the interface becomes part of the entity.
    pub is_extern: bool,
    /// Type of a leaf.
    pub ty: Option<HdlType>,
    /// Nested interfaces of a bundle.
    pub sub_interfaces: Vec<Interface>,
    /// Interface this one mirrors and is wired to.
    pub src: Option<InterfacePath>,
    /// Backing net while the unit is being flattened.
    pub signal: Option<SignalId>,
    /// Bound entity port.
    pub port: Option<String>,
}

impl Interface {
    /// A leaf of type `ty` with a direction still to be determined.
    pub fn port(name: impl Into<String>, ty: HdlType) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Unknown,
            is_extern: false,
            ty: Some(ty),
            sub_interfaces: Vec::new(),
            src: None,
            signal: None,
            port: None,
        }
    }

    /// A bundle of nested interfaces.
    pub fn bundle(name: impl Into<String>, subs: Vec<Interface>) -> Self {
        Self {
            ty: None,
            sub_interfaces: subs,
            ..Self::port(name, HdlType::Bit)
        }
    }

    /// An interface without shape, mirroring `src`.
    pub fn mirror(name: impl Into<String>, src: InterfacePath) -> Self {
        Self {
            ty: None,
            src: Some(src),
            ..Self::port(name, HdlType::Bit)
        }
    }

    /// Marks the interface and everything below it as external.
    pub fn external(mut self) -> Self {
        self.set_extern();
        self
    }

    pub(crate) fn set_extern(&mut self) {
        self.is_extern = true;
        for s in &mut self.sub_interfaces {
            s.set_extern();
        }
    }

    /// Sets a leaf direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Returns `true` for bundles.
    pub fn is_bundle(&self) -> bool {
        !self.sub_interfaces.is_empty()
    }

    /// Returns `true` if the interface has neither a type nor sub-interfaces.
    pub fn is_shapeless(&self) -> bool {
        self.ty.is_none() && self.sub_interfaces.is_empty()
    }

    /// Copies type and nesting from `other`, dropping its working state.
    pub fn adopt_shape(&mut self, other: &Interface) {
        self.ty = other.ty.clone();
        self.sub_interfaces = other
            .sub_interfaces
            .iter()
            .map(|s| {
                let mut copy = Interface {
                    name: s.name.clone(),
                    direction: Direction::Unknown,
                    is_extern: self.is_extern,
                    ty: None,
                    sub_interfaces: Vec::new(),
                    src: None,
                    signal: None,
                    port: None,
                };
                copy.adopt_shape(s);
                copy
            })
            .collect();
    }

    /// Creates one net per leaf in `ctx`.
    ///
    /// Nets are named after the leaf path joined with the configured
    /// separator; with `bridge` set to a sub-unit name they get that
    /// sub-unit's bridging name instead.
    pub fn materialize(&mut self, ctx: &mut Context, bridge: Option<&str>) -> Result<(), RtlError> {
        let mut prefix = Vec::new();
        self.materialize_in(ctx, bridge, &mut prefix)
    }

    fn materialize_in(
        &mut self,
        ctx: &mut Context,
        bridge: Option<&str>,
        prefix: &mut Vec<String>,
    ) -> Result<(), RtlError> {
        prefix.push(self.name.clone());
        if let Some(ty) = &self.ty {
            let path = prefix.join(ctx.separator());
            let name = match bridge {
                Some(sub) => ctx.bridge_name(sub, &path),
                None => path,
            };
            self.signal = Some(ctx.sig(&name, ty.clone())?);
        }
        for s in &mut self.sub_interfaces {
            s.materialize_in(ctx, bridge, prefix)?;
        }
        prefix.pop();
        Ok(())
    }

    /// Flips the direction of every leaf.
    pub fn reverse_direction(&mut self) {
        self.direction = self.direction.reversed();
        for s in &mut self.sub_interfaces {
            s.reverse_direction();
        }
    }

    /// Drops working nets from the whole tree.
    pub fn remove_signals(&mut self) {
        self.signal = None;
        for s in &mut self.sub_interfaces {
            s.remove_signals();
        }
    }

    /// Leaves with their paths relative to this interface. A leaf interface
    /// yields itself with an empty path.
    pub fn leaves(&self) -> Vec<(Vec<String>, &Interface)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &mut Vec<String>, out: &mut Vec<(Vec<String>, &'a Interface)>) {
        if self.ty.is_some() {
            out.push((prefix.clone(), self));
            return;
        }
        for s in &self.sub_interfaces {
            prefix.push(s.name.clone());
            s.collect_leaves(prefix, out);
            prefix.pop();
        }
    }

    /// Mutable leaves in the same order as [`leaves`](Self::leaves).
    pub fn leaves_mut(&mut self) -> Vec<&mut Interface> {
        let mut out = Vec::new();
        self.collect_leaves_mut(&mut out);
        out
    }

    fn collect_leaves_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Interface>) {
        if self.ty.is_some() {
            out.push(self);
            return;
        }
        for s in &mut self.sub_interfaces {
            s.collect_leaves_mut(out);
        }
    }

    /// Finds a nested interface by path relative to this one.
    pub fn find(&self, path: &[String]) -> Option<&Interface> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self
                .sub_interfaces
                .iter()
                .find(|s| &s.name == head)?
                .find(rest),
        }
    }
}

/// Finds an interface by absolute path in a list of top-level interfaces.
pub fn find_in<'a>(interfaces: &'a [Interface], path: &[String]) -> Option<&'a Interface> {
    let (head, rest) = path.split_first()?;
    interfaces.iter().find(|i| &i.name == head)?.find(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwtk_config::ElaborateConfig;

    fn axis() -> Interface {
        Interface::bundle(
            "axis",
            vec![
                Interface::port("data", HdlType::vector(8)).with_direction(Direction::Out),
                Interface::port("valid", HdlType::Bit).with_direction(Direction::Out),
                Interface::port("ready", HdlType::Bit).with_direction(Direction::In),
            ],
        )
    }

    #[test]
    fn external_flag_reaches_leaves() {
        let i = axis().external();
        assert!(i.leaves().iter().all(|(_, l)| l.is_extern));
    }

    #[test]
    fn reverse_is_recursive_and_involutive() {
        let mut i = axis();
        i.reverse_direction();
        let dirs: Vec<Direction> = i.leaves().iter().map(|(_, l)| l.direction).collect();
        assert_eq!(dirs, vec![Direction::In, Direction::In, Direction::Out]);
        i.reverse_direction();
        assert_eq!(i, axis());
    }

    #[test]
    fn materialize_names_follow_paths() {
        let mut ctx = Context::new("top", &ElaborateConfig::default());
        let mut own = axis();
        own.materialize(&mut ctx, None).unwrap();
        let mut sub = axis();
        sub.materialize(&mut ctx, Some("u0")).unwrap();
        let names: Vec<String> = own
            .leaves()
            .iter()
            .chain(sub.leaves().iter())
            .map(|(_, l)| ctx.netlist().signal(l.signal.unwrap()).name.clone())
            .collect();
        assert_eq!(
            names,
            vec![
                "axis_data",
                "axis_valid",
                "axis_ready",
                "sig_u0_axis_data",
                "sig_u0_axis_valid",
                "sig_u0_axis_ready"
            ]
        );
        own.remove_signals();
        assert!(own.leaves().iter().all(|(_, l)| l.signal.is_none()));
    }

    #[test]
    fn leaf_paths_and_lookup() {
        let i = axis();
        let paths: Vec<String> = i.leaves().iter().map(|(p, _)| p.join(".")).collect();
        assert_eq!(paths, vec!["data", "valid", "ready"]);
        let list = vec![i];
        let found = find_in(&list, &["axis".to_string(), "ready".to_string()]).unwrap();
        assert_eq!(found.ty, Some(HdlType::Bit));
        assert!(find_in(&list, &["axis".to_string(), "last".to_string()]).is_none());
    }

    #[test]
    fn mirror_adopts_shape() {
        let mut m = Interface::mirror("out", InterfacePath::sub("u0", "axis")).external();
        assert!(m.is_shapeless());
        m.adopt_shape(&axis());
        assert!(m.is_bundle());
        assert_eq!(m.leaves().len(), 3);
        assert!(m.leaves().iter().all(|(_, l)| l.direction == Direction::Unknown && l.is_extern));
    }

    #[test]
    fn paths_display() {
        assert_eq!(InterfacePath::sub("u0", "axis.data").to_string(), "u0.axis.data");
        assert_eq!(InterfacePath::own("clk").to_string(), "clk");
    }
}
