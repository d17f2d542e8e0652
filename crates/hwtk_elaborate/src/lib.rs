//! Elaboration of hierarchical units into flat entities and architectures.
//!
//! A [`Unit`] is either a leaf backed by an external HDL source, whose
//! ports are grouped into [`Interface`]s by [`InterfaceClass`]es, or a
//! composite of sub-units plus connections and optional user logic.
//! [`elaborate`] walks the hierarchy bottom-up, bridges every sub-unit's
//! external interfaces into its parent, and flattens each composite into
//! an entity and an architecture.

#![warn(missing_docs)]

pub mod elaborate;
pub mod error;
pub mod interface;
pub mod param;
pub mod parser;
pub mod shapes;
pub mod unit;

pub use elaborate::{elaborate, ElaboratedUnit};
pub use error::ElabError;
pub use interface::{Direction, Interface, InterfacePath};
pub use param::Param;
pub use parser::{EntityParser, ParsedEntity};
pub use shapes::{default_classes, BundleShape, InterfaceClass, PortShape};
pub use unit::{Body, BodyScope, Connection, Unit};
