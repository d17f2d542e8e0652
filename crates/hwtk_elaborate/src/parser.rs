//! The seam to an external HDL parser.

use crate::error::ElabError;
use crate::param::Param;
use hwtk_rtl::{Entity, Netlist};
use std::path::Path;

/// What a parser returns for one source file.
#[derive(Debug, Clone)]
pub struct ParsedEntity {
    /// Ports and generics. Port widths may reference parameter signals.
    pub entity: Entity,
    /// Generics as parameter cells living in the declaration netlist.
    pub params: Vec<Param>,
}

/// Reads an entity description from an HDL source.
///
/// Generics must be created as parameter signals in `decl` so that port
/// widths written in terms of them re-fold when a parameter changes.
pub trait EntityParser {
    /// Parses the entity declared in `path`.
    fn parse_entity(&self, path: &Path, decl: &mut Netlist) -> Result<ParsedEntity, ElabError>;
}

impl<F> EntityParser for F
where
    F: Fn(&Path, &mut Netlist) -> Result<ParsedEntity, ElabError>,
{
    fn parse_entity(&self, path: &Path, decl: &mut Netlist) -> Result<ParsedEntity, ElabError> {
        self(path, decl)
    }
}
