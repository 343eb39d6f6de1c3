//! Core data structures modeling biological macromolecules.
//!
//! The hierarchy follows the classic structure → model → chain → residue → atom layout.
//! Alternate locations and point mutations are represented explicitly through
//! [`atom::DisorderedAtom`] and [`residue::DisorderedResidue`], so readers can preserve
//! everything a deposited file contains while consumers see one selected conformer.

pub mod atom;
pub mod chain;
pub mod compare;
pub mod header;
#[allow(clippy::module_inception)]
pub mod model;
pub mod residue;
pub mod structure;
pub mod types;
