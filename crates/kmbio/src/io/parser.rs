//! Common entry point shared by the PDB and mmCIF readers.

use super::error::Error;
use crate::model::structure::Structure;
use crate::ops::apply_bioassembly;
use std::io::BufRead;

/// A structure file reader.
pub trait Parser {
    /// Reads a structure from `reader`.
    ///
    /// When `structure_id` is `None` the identifier is taken from the file itself (the
    /// `HEADER` idcode or the mmCIF data block name). A `bioassembly` of `0` returns the
    /// structure as deposited; any other value returns that biological assembly, built
    /// from the first model.
    ///
    /// # Errors
    ///
    /// Propagates parse failures, and returns [`Error::Assembly`] when the file
    /// does not define the requested assembly.
    fn get_structure<R: BufRead>(
        &self,
        reader: R,
        structure_id: Option<&str>,
        bioassembly: usize,
    ) -> Result<Structure, Error>;
}

/// Replaces `structure` with its assembly `bioassembly`, or returns it unchanged for `0`.
pub(crate) fn finish_structure(
    structure: Structure,
    bioassembly: usize,
) -> Result<Structure, Error> {
    if bioassembly == 0 {
        return Ok(structure);
    }
    Ok(apply_bioassembly(&structure, bioassembly)?)
}
