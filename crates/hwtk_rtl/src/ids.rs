//! Copyable ids for graph nodes, plus [`NodeRef`] for driver and endpoint sets.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an id from a raw index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A net in a [`Netlist`](crate::netlist::Netlist).
    SignalId,
    "sig"
);

define_id!(
    /// An operator node in a [`Netlist`](crate::netlist::Netlist).
    OperatorId,
    "op"
);

define_id!(
    /// An assignment node in a [`Netlist`](crate::netlist::Netlist).
    AssignmentId,
    "asg"
);

/// A node that can drive a signal or listen to one.
///
/// Ordered so driver and endpoint sets iterate in a stable order: operators,
/// then assignments, then defaults, each group in allocation order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum NodeRef {
    /// An operator; it drives its result and listens to its operands.
    Operator(OperatorId),
    /// An assignment; it drives its destination and listens to its source
    /// and guard conditions.
    Assignment(AssignmentId),
    /// The default of a net that copies another net. It listens to that net
    /// and re-resolves the copying one; it is never one of its drivers.
    Default(SignalId),
}

impl From<OperatorId> for NodeRef {
    fn from(id: OperatorId) -> Self {
        NodeRef::Operator(id)
    }
}

impl From<AssignmentId> for NodeRef {
    fn from(id: AssignmentId) -> Self {
        NodeRef::Assignment(id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Operator(id) => write!(f, "{id}"),
            NodeRef::Assignment(id) => write!(f, "{id}"),
            NodeRef::Default(id) => write!(f, "default({id})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_tags() {
        assert_eq!(SignalId::from_raw(3).to_string(), "sig#3");
        assert_eq!(NodeRef::from(OperatorId::from_raw(1)).to_string(), "op#1");
        assert_eq!(NodeRef::from(AssignmentId::from_raw(0)).to_string(), "asg#0");
        assert_eq!(NodeRef::Default(SignalId::from_raw(2)).to_string(), "default(sig#2)");
    }

    #[test]
    fn operators_sort_before_assignments() {
        let mut refs = vec![
            NodeRef::Assignment(AssignmentId::from_raw(0)),
            NodeRef::Operator(OperatorId::from_raw(2)),
            NodeRef::Operator(OperatorId::from_raw(1)),
        ];
        refs.sort();
        assert_eq!(refs[0], NodeRef::Operator(OperatorId::from_raw(1)));
        assert_eq!(refs[2], NodeRef::Assignment(AssignmentId::from_raw(0)));
    }
}
