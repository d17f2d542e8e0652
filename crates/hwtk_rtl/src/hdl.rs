//! Flattened hardware descriptions: entities, architectures, and components.
//!
//! These are the artifacts elaboration hands back. Every type renders as
//! VHDL through `Display` and serializes with serde for downstream tooling.

use crate::operator::OpKind;
use crate::types::HdlType;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The direction of an entity port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Data flows into the entity.
    In,
    /// Data flows out of the entity.
    Out,
    /// Bidirectional.
    InOut,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortDirection::In => "IN",
            PortDirection::Out => "OUT",
            PortDirection::InOut => "INOUT",
        })
    }
}

/// One port of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDecl {
    /// Port name.
    pub name: String,
    /// Direction of data flow.
    pub direction: PortDirection,
    /// Port type.
    pub ty: HdlType,
}

impl PortDecl {
    /// Creates a port declaration.
    pub fn new(name: impl Into<String>, direction: PortDirection, ty: HdlType) -> Self {
        Self {
            name: name.into(),
            direction,
            ty,
        }
    }
}

/// One generic of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericDecl {
    /// Generic name.
    pub name: String,
    /// Generic type.
    pub ty: HdlType,
    /// Default value.
    pub value: Option<Value>,
}

/// The external view of a design unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name.
    pub name: String,
    /// Generics in declaration order.
    pub generics: Vec<GenericDecl>,
    /// Ports in declaration order.
    pub ports: Vec<PortDecl>,
}

impl Entity {
    /// Creates an entity without generics or ports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// Looks up a port by name.
    pub fn port(&self, name: &str) -> Option<&PortDecl> {
        self.ports.iter().find(|p| p.name == name)
    }
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    keyword: &str,
    items: &[T],
    indent: &str,
    item: impl Fn(&T) -> String,
) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "{indent}    {keyword} (")?;
    for (i, it) in items.iter().enumerate() {
        let sep = if i + 1 == items.len() { "" } else { ";" };
        writeln!(f, "{indent}        {}{sep}", item(it))?;
    }
    writeln!(f, "{indent}    );")
}

fn generic_line(g: &GenericDecl) -> String {
    match &g.value {
        Some(v) => format!("{} : {} := {v}", g.name, g.ty),
        None => format!("{} : {}", g.name, g.ty),
    }
}

fn port_line(p: &PortDecl) -> String {
    format!("{} : {} {}", p.name, p.direction, p.ty)
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ENTITY {} IS", self.name)?;
        write_list(f, "GENERIC", &self.generics, "", generic_line)?;
        write_list(f, "PORT", &self.ports, "", port_line)?;
        write!(f, "END ENTITY {};", self.name)
    }
}

/// A component declaration: the entity of a sub-unit as seen by its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// The instantiated entity.
    pub entity: Entity,
}

impl Component {
    /// Wraps an entity.
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }

    /// Component name, equal to the entity name.
    pub fn name(&self) -> &str {
        &self.entity.name
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "COMPONENT {} IS", self.entity.name)?;
        write_list(f, "GENERIC", &self.entity.generics, "", generic_line)?;
        write_list(f, "PORT", &self.entity.ports, "", port_line)?;
        write!(f, "END COMPONENT;")
    }
}

/// An instantiation of a component inside an architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Instance label.
    pub name: String,
    /// Name of the instantiated component.
    pub component: String,
    /// `generic => value` pairs.
    pub generic_map: Vec<(String, Value)>,
    /// `port => net` pairs.
    pub port_map: Vec<(String, String)>,
}

impl fmt::Display for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.name, self.component)?;
        let mapping = |pairs: Vec<String>| pairs.join(",\n        ");
        if !self.generic_map.is_empty() {
            let pairs = self
                .generic_map
                .iter()
                .map(|(g, v)| format!("{g} => {v}"))
                .collect();
            writeln!(f, "    GENERIC MAP (\n        {}\n    )", mapping(pairs))?;
        }
        let pairs = self
            .port_map
            .iter()
            .map(|(p, n)| format!("{p} => {n}"))
            .collect();
        write!(f, "    PORT MAP (\n        {}\n    );", mapping(pairs))
    }
}

/// An expression tree with operator results inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// A declared net or port.
    Signal(String),
    /// A literal.
    Literal(Value),
    /// An operator applied to sub-expressions.
    Op {
        /// What is computed.
        kind: OpKind,
        /// Operands in order.
        operands: Vec<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Signal(name) => f.write_str(name),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Op { kind, operands } => match (kind, operands.as_slice()) {
                (OpKind::Not, [a]) => write!(f, "NOT {a}"),
                (OpKind::Neg, [a]) => write!(f, "-{a}"),
                (OpKind::RisingEdge | OpKind::FallingEdge, [a]) => write!(f, "{kind}({a})"),
                (OpKind::Index, [a, i]) => write!(f, "{a}({i})"),
                (OpKind::Slice, [a, hi, lo]) => write!(f, "{a}({hi} DOWNTO {lo})"),
                (OpKind::Ternary, [c, a, b]) => write!(f, "({a} WHEN {c} ELSE {b})"),
                _ => {
                    let symbol = kind.infix_symbol().unwrap_or("?");
                    let parts: Vec<String> = operands.iter().map(ToString::to_string).collect();
                    write!(f, "({})", parts.join(&format!(" {symbol} ")))
                }
            },
        }
    }
}

/// One guarded alternative of a conditional assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Value written while the conditions hold.
    pub value: Expr,
    /// Boolean conditions, all of which must hold.
    pub conditions: Vec<Expr>,
}

/// A concurrent statement of an architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// `target <= a WHEN c ELSE ... ELSE otherwise;`
    ///
    /// Branches are listed highest priority first. Without `otherwise` the
    /// target keeps its value when no branch applies.
    Assign {
        /// Net or selection being written.
        target: Expr,
        /// Guarded alternatives.
        branches: Vec<Branch>,
        /// Value written when no branch applies.
        otherwise: Option<Expr>,
    },
    /// A register loaded from its shadow net on the rising edge of `clk`.
    Clocked {
        /// Clock net.
        clk: String,
        /// Register net.
        target: String,
        /// Shadow net holding the next state.
        next: String,
    },
    /// A sub-unit instance.
    Instance(ComponentInstance),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign {
                target,
                branches,
                otherwise,
            } => {
                write!(f, "{target} <= ")?;
                for b in branches {
                    let conds: Vec<String> = b.conditions.iter().map(ToString::to_string).collect();
                    write!(f, "{} WHEN {} ELSE ", b.value, conds.join(" AND "))?;
                }
                match otherwise {
                    Some(v) => write!(f, "{v};"),
                    None => write!(f, "UNAFFECTED;"),
                }
            }
            Statement::Clocked { clk, target, next } => {
                writeln!(f, "{target}_proc: PROCESS({clk})")?;
                writeln!(f, "BEGIN")?;
                writeln!(f, "    IF RISING_EDGE({clk}) THEN")?;
                writeln!(f, "        {target} <= {next};")?;
                writeln!(f, "    END IF;")?;
                write!(f, "END PROCESS;")
            }
            Statement::Instance(inst) => write!(f, "{inst}"),
        }
    }
}

/// A net declared inside an architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDecl {
    /// Net name.
    pub name: String,
    /// Net type.
    pub ty: HdlType,
    /// Initial value.
    pub default: Option<Value>,
}

/// The body of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    /// Architecture name.
    pub name: String,
    /// Name of the entity this architecture implements.
    pub entity_name: String,
    /// Component declarations, one per distinct sub-unit entity.
    pub components: Vec<Component>,
    /// Internal nets.
    pub signals: Vec<SignalDecl>,
    /// Concurrent statements.
    pub statements: Vec<Statement>,
}

fn indented(text: &str) -> String {
    text.lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("    {l}") })
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ARCHITECTURE {} OF {} IS", self.name, self.entity_name)?;
        for c in &self.components {
            writeln!(f, "{}", indented(&c.to_string()))?;
        }
        for s in &self.signals {
            match &s.default {
                Some(v) => writeln!(f, "    SIGNAL {} : {} := {v};", s.name, s.ty)?,
                None => writeln!(f, "    SIGNAL {} : {};", s.name, s.ty)?,
            }
        }
        writeln!(f, "BEGIN")?;
        for st in &self.statements {
            writeln!(f, "{}", indented(&st.to_string()))?;
        }
        write!(f, "END ARCHITECTURE {};", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adder() -> Entity {
        Entity {
            name: "adder".into(),
            generics: vec![GenericDecl {
                name: "W".into(),
                ty: HdlType::Integer,
                value: Some(Value::int(8)),
            }],
            ports: vec![
                PortDecl::new("a", PortDirection::In, HdlType::vector(8)),
                PortDecl::new("s", PortDirection::Out, HdlType::vector(8)),
            ],
        }
    }

    #[test]
    fn entity_text() {
        let text = adder().to_string();
        assert_eq!(
            text,
            "ENTITY adder IS\n    GENERIC (\n        W : INTEGER := 8\n    );\n    PORT (\n        a : IN STD_LOGIC_VECTOR(7 DOWNTO 0);\n        s : OUT STD_LOGIC_VECTOR(7 DOWNTO 0)\n    );\nEND ENTITY adder;"
        );
    }

    #[test]
    fn component_text() {
        let c = Component::new(adder());
        let text = c.to_string();
        assert!(text.starts_with("COMPONENT adder IS\n"));
        assert!(text.ends_with("END COMPONENT;"));
        assert_eq!(c.name(), "adder");
    }

    #[test]
    fn expressions_inline() {
        let e = Expr::Op {
            kind: OpKind::And,
            operands: vec![
                Expr::Signal("a".into()),
                Expr::Op {
                    kind: OpKind::Not,
                    operands: vec![Expr::Signal("b".into())],
                },
            ],
        };
        assert_eq!(e.to_string(), "(a AND NOT b)");
        let idx = Expr::Op {
            kind: OpKind::Index,
            operands: vec![Expr::Signal("v".into()), Expr::Literal(Value::int(2))],
        };
        assert_eq!(idx.to_string(), "v(2)");
    }

    #[test]
    fn conditional_assignment_text() {
        let st = Statement::Assign {
            target: Expr::Signal("q".into()),
            branches: vec![Branch {
                value: Expr::Literal(Value::bit(true)),
                conditions: vec![Expr::Signal("en".into()), Expr::Signal("go".into())],
            }],
            otherwise: None,
        };
        assert_eq!(st.to_string(), "q <= '1' WHEN en AND go ELSE UNAFFECTED;");
    }

    #[test]
    fn instance_text() {
        let inst = ComponentInstance {
            name: "u0".into(),
            component: "adder".into(),
            generic_map: vec![("W".into(), Value::int(4))],
            port_map: vec![("a".into(), "sig_u0_a".into())],
        };
        assert_eq!(
            inst.to_string(),
            "u0: adder\n    GENERIC MAP (\n        W => 4\n    )\n    PORT MAP (\n        a => sig_u0_a\n    );"
        );
    }

    #[test]
    fn architecture_text() {
        let arch = Architecture {
            name: "rtl".into(),
            entity_name: "top".into(),
            components: vec![],
            signals: vec![SignalDecl {
                name: "r".into(),
                ty: HdlType::Bit,
                default: Some(Value::bit(false)),
            }],
            statements: vec![Statement::Clocked {
                clk: "clk".into(),
                target: "r".into(),
                next: "r_next".into(),
            }],
        };
        let text = arch.to_string();
        assert!(text.starts_with("ARCHITECTURE rtl OF top IS\n    SIGNAL r : STD_LOGIC := '0';\nBEGIN\n"));
        assert!(text.contains("        IF RISING_EDGE(clk) THEN\n"));
        assert!(text.ends_with("END ARCHITECTURE rtl;"));
    }

    #[test]
    fn serde_roundtrip() {
        let e = adder();
        let json = serde_json::to_string(&e).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
