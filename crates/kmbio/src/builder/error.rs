//! Construction errors raised while assembling a structure record by record.
//!
//! Parsers running in permissive mode downgrade these to warnings and keep going; strict
//! parsers surface them to the caller.

use crate::model::types::ResidueId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A residue id was redefined with a different name, but the residue already present
    /// has atoms without altloc flags, so the two cannot be merged into a point mutation.
    #[error("blank altlocs in duplicate residue {resname} {id}")]
    BlankAltlocs { resname: String, id: ResidueId },

    /// The same atom name (without altloc) appeared twice in one residue.
    #[error("atom '{name}' defined twice in residue {residue}")]
    DuplicateAtom { name: String, residue: ResidueId },

    /// A heterogen or water id appeared twice in one chain.
    #[error("residue {resname} {id} defined twice in chain '{chain}'")]
    DuplicateResidue {
        resname: String,
        id: ResidueId,
        chain: String,
    },

    /// A builder method was called before the level above it was initialised.
    #[error("cannot initialise {level} before a {parent} has been started")]
    MissingParent {
        level: &'static str,
        parent: &'static str,
    },
}

impl Error {
    pub fn missing_parent(level: &'static str, parent: &'static str) -> Self {
        Self::MissingParent { level, parent }
    }
}
