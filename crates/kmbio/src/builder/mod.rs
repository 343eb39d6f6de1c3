//! Incremental construction of [`Structure`] objects.
//!
//! Parsers translate records into calls on [`StructureBuilder`], which owns the
//! bookkeeping for the current model, chain, segment and residue, and applies the rules
//! for discontinuous chains, point mutations and alternate locations.

mod error;

pub use error::Error;

use crate::model::atom::{Atom, AtomEntry, DisorderedAtom};
use crate::model::chain::Chain;
use crate::model::header::Header;
use crate::model::model::Model;
use crate::model::residue::{DisorderedResidue, Residue, ResidueEntry};
use crate::model::structure::Structure;
use crate::model::types::{HetField, ResidueId};
use smol_str::SmolStr;
use tracing::{info, warn};

/// Stateful consumer of parsed records.
///
/// # Examples
///
/// ```
/// use kmbio::builder::StructureBuilder;
/// use kmbio::{Atom, Element, Point};
///
/// let mut builder = StructureBuilder::new();
/// builder.init_structure("demo");
/// builder.init_model(0, 1).unwrap();
/// builder.init_seg(" ");
/// builder.init_chain("A").unwrap();
/// builder.init_residue("GLY", ' ', 1, ' ').unwrap();
/// builder
///     .init_atom(Atom::new("CA", Element::C, Point::new(1.0, 2.0, 3.0)))
///     .unwrap();
///
/// let structure = builder.get_structure().unwrap();
/// assert_eq!(structure.atom_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct StructureBuilder {
    line_counter: usize,
    header: Header,
    structure: Option<Structure>,
    chain_index: Option<usize>,
    segid: SmolStr,
    residue: Option<ResidueId>,
}

/// What `init_residue` found when the requested id already existed.
enum Redefinition {
    Reused,
    Convert,
}

/// What `init_atom` found under the atom's name.
enum Slot {
    Empty,
    Ordered,
    Disordered,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self {
            segid: SmolStr::new(" "),
            ..Self::default()
        }
    }

    /// Records the input line currently being processed, used in diagnostics.
    pub fn set_line_counter(&mut self, line_counter: usize) {
        self.line_counter = line_counter;
    }

    pub fn line_counter(&self) -> usize {
        self.line_counter
    }

    pub fn set_header(&mut self, header: Header) {
        self.header = header;
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn init_structure(&mut self, structure_id: &str) {
        self.structure = Some(Structure::new(structure_id));
        self.chain_index = None;
        self.residue = None;
    }

    pub fn init_model(&mut self, model_id: usize, serial_num: usize) -> Result<(), Error> {
        let structure = self
            .structure
            .as_mut()
            .ok_or_else(|| Error::missing_parent("model", "structure"))?;
        structure.add_model(Model::new(model_id, serial_num));
        self.chain_index = None;
        self.residue = None;
        Ok(())
    }

    pub fn has_model(&self) -> bool {
        self.structure
            .as_ref()
            .is_some_and(|s| s.model_count() > 0)
    }

    /// Makes `chain_id` the current chain, reusing it when the model already has it.
    pub fn init_chain(&mut self, chain_id: &str) -> Result<(), Error> {
        let line = self.line_counter;
        let model = self.current_model_mut()?;
        let index = match model.chain_position(chain_id) {
            Some(index) => {
                info!(chain = chain_id, line, "chain is discontinuous");
                index
            }
            None => {
                model.add_chain(Chain::new(chain_id));
                model.chain_count() - 1
            }
        };
        self.chain_index = Some(index);
        self.residue = None;
        Ok(())
    }

    /// Flags a change of segment identifier for the residues that follow.
    pub fn init_seg(&mut self, segid: &str) {
        self.segid = SmolStr::new(segid);
    }

    /// Starts (or re-enters) a residue in the current chain.
    ///
    /// `field` is the record's hetero flag: `' '` for polymer residues, `'W'` for water and
    /// `'H'` for other heterogens. Re-declaring a polymer residue id either re-enters the
    /// existing residue (same name) or turns it into a point mutation
    /// ([`DisorderedResidue`]) when the existing residue is completely disordered.
    ///
    /// # Errors
    ///
    /// [`Error::BlankAltlocs`] when a conflicting residue cannot become a point mutation,
    /// [`Error::DuplicateResidue`] for a repeated heterogen id. In both cases the current
    /// residue is cleared and the following atoms are dropped until the next residue.
    pub fn init_residue(
        &mut self,
        resname: &str,
        field: char,
        resseq: i32,
        icode: char,
    ) -> Result<(), Error> {
        let line = self.line_counter;
        let segid = self.segid.clone();
        let id = ResidueId::new(HetField::from_flag(field, resname), resseq, icode);

        let chain = self.current_chain_mut()?;
        let chain_id = chain.id.clone();
        let redefinition = match chain.entry_mut(&id) {
            None => None,
            Some(_) if !id.hetfield.is_standard() => {
                self.residue = None;
                return Err(Error::DuplicateResidue {
                    resname: resname.to_string(),
                    id,
                    chain: chain_id.to_string(),
                });
            }
            Some(ResidueEntry::Disordered(existing)) => {
                info!(residue = %id, resname, line, "residue redefined");
                if !existing.select(resname) {
                    existing.add(Residue::new(id.clone(), resname, &segid));
                }
                Some(Redefinition::Reused)
            }
            Some(ResidueEntry::Ordered(existing)) => {
                info!(residue = %id, resname, line, "residue redefined");
                if existing.name == resname {
                    warn!(
                        residue = %id,
                        resname,
                        chain = %chain_id,
                        line,
                        "residue is already defined with the same name"
                    );
                    Some(Redefinition::Reused)
                } else if !existing.is_completely_disordered() {
                    self.residue = None;
                    return Err(Error::BlankAltlocs {
                        resname: resname.to_string(),
                        id,
                    });
                } else {
                    Some(Redefinition::Convert)
                }
            }
        };

        match redefinition {
            Some(Redefinition::Reused) => {}
            Some(Redefinition::Convert) => {
                let chain = self.current_chain_mut()?;
                if let Some((index, ResidueEntry::Ordered(previous))) = chain.remove_entry(&id)
                {
                    let mut disordered = DisorderedResidue::new(id.clone());
                    disordered.add(previous);
                    disordered.add(Residue::new(id.clone(), resname, &segid));
                    chain.insert_entry(index, ResidueEntry::Disordered(disordered));
                }
            }
            None => {
                let chain = self.current_chain_mut()?;
                chain.add_residue(Residue::new(id.clone(), resname, &segid));
            }
        }

        self.residue = Some(id);
        Ok(())
    }

    /// Adds an atom to the current residue.
    ///
    /// `atom.name` is expected stripped and `atom.fullname` as read from the file. Atoms
    /// with a non-blank altloc are gathered into a [`DisorderedAtom`]. Does nothing when
    /// the current residue was rejected by [`init_residue`](Self::init_residue).
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateAtom`] when an atom without altloc repeats a name.
    pub fn init_atom(&mut self, mut atom: Atom) -> Result<(), Error> {
        let Some(residue_id) = self.residue.clone() else {
            return Ok(());
        };
        let line = self.line_counter;

        let chain = self.current_chain_mut()?;
        let Some(entry) = chain.entry_mut(&residue_id) else {
            return Ok(());
        };
        let plain_residue = !entry.is_disordered();
        let residue = entry.residue_mut();

        if let Some(duplicate) = residue.entry(&atom.name) {
            let duplicate_fullname = &duplicate.atom().fullname;
            if *duplicate_fullname != atom.fullname {
                info!(
                    existing = %duplicate_fullname,
                    new = %atom.fullname,
                    line,
                    "atom names differ only in spaces"
                );
                atom.name = atom.fullname.clone();
            }
        }

        let name = atom.name.clone();
        let slot = match residue.entry(&name) {
            None => Slot::Empty,
            Some(AtomEntry::Ordered(_)) => Slot::Ordered,
            Some(AtomEntry::Disordered(_)) => Slot::Disordered,
        };

        if atom.altloc == ' ' {
            if !matches!(slot, Slot::Empty) {
                return Err(Error::DuplicateAtom {
                    name: name.to_string(),
                    residue: residue_id,
                });
            }
            residue.add_atom(atom);
            return Ok(());
        }

        match slot {
            Slot::Disordered => {
                if let Some(AtomEntry::Disordered(disordered)) = residue.entry_mut(&name) {
                    disordered.add(atom);
                }
            }
            Slot::Ordered => {
                if let Some(AtomEntry::Ordered(previous)) = residue.remove_atom(&name) {
                    let mut disordered = DisorderedAtom::new(&name);
                    disordered.add(atom);
                    disordered.add(previous);
                    residue.add_entry(AtomEntry::Disordered(disordered));
                    residue.disordered = true;
                    info!(
                        atom = %name,
                        line,
                        "disordered atom found with blank altloc before this line"
                    );
                }
            }
            Slot::Empty => {
                let mut disordered = DisorderedAtom::new(&name);
                disordered.add(atom);
                residue.add_entry(AtomEntry::Disordered(disordered));
                if plain_residue {
                    residue.disordered = true;
                }
            }
        }
        Ok(())
    }

    /// Space group and unit cell are accepted for API compatibility and ignored.
    pub fn set_symmetry(&mut self, _spacegroup: &str, _cell: [f64; 6]) {}

    /// Attaches the header and returns the finished structure.
    pub fn get_structure(self) -> Result<Structure, Error> {
        let mut structure = self
            .structure
            .ok_or_else(|| Error::missing_parent("result", "structure"))?;
        structure.header = self.header;
        Ok(structure)
    }

    fn current_model_mut(&mut self) -> Result<&mut Model, Error> {
        self.structure
            .as_mut()
            .and_then(Structure::last_model_mut)
            .ok_or_else(|| Error::missing_parent("chain", "model"))
    }

    fn current_chain_mut(&mut self) -> Result<&mut Chain, Error> {
        let index = self
            .chain_index
            .ok_or_else(|| Error::missing_parent("residue", "chain"))?;
        self.current_model_mut()?
            .chain_at_mut(index)
            .ok_or_else(|| Error::missing_parent("residue", "chain"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Element, Point};

    fn builder_with_chain() -> StructureBuilder {
        let mut builder = StructureBuilder::new();
        builder.init_structure("test");
        builder.init_model(0, 1).unwrap();
        builder.init_seg(" ");
        builder.init_chain("A").unwrap();
        builder
    }

    fn atom(name: &str, altloc: char, occupancy: f64, x: f64) -> Atom {
        Atom::new(name, Element::C, Point::new(x, 0.0, 0.0))
            .with_altloc(altloc)
            .with_occupancy(Some(occupancy))
    }

    #[test]
    fn builder_requires_parents() {
        let mut builder = StructureBuilder::new();
        assert!(matches!(
            builder.init_model(0, 1),
            Err(Error::MissingParent { .. })
        ));
        builder.init_structure("x");
        assert!(builder.init_chain("A").is_err());
        builder.init_model(0, 1).unwrap();
        assert!(builder.init_residue("ALA", ' ', 1, ' ').is_err());
    }

    #[test]
    fn discontinuous_chain_is_reused() {
        let mut builder = builder_with_chain();
        builder.init_residue("ALA", ' ', 1, ' ').unwrap();
        builder.init_chain("B").unwrap();
        builder.init_residue("GLY", ' ', 1, ' ').unwrap();
        builder.init_chain("A").unwrap();
        builder.init_residue("SER", ' ', 2, ' ').unwrap();

        let structure = builder.get_structure().unwrap();
        let model = structure.first_model().unwrap();
        assert_eq!(model.chain_count(), 2);
        assert_eq!(model.chain("A").unwrap().residue_count(), 2);
    }

    #[test]
    fn hetero_field_uses_residue_name() {
        let mut builder = builder_with_chain();
        builder.init_residue("FUC", 'H', 400, ' ').unwrap();
        builder.init_residue("HOH", 'W', 500, ' ').unwrap();

        let structure = builder.get_structure().unwrap();
        let chain = structure.first_model().unwrap().chain("A").unwrap();
        let ids: Vec<_> = chain.iter_residues().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["('H_FUC', 400, ' ')", "('W', 500, ' ')"]);
    }

    #[test]
    fn duplicate_hetero_residue_is_an_error() {
        let mut builder = builder_with_chain();
        builder.init_residue("NAG", 'H', 1, ' ').unwrap();
        let err = builder.init_residue("NAG", 'H', 1, ' ').unwrap_err();
        assert!(matches!(err, Error::DuplicateResidue { .. }));
    }

    #[test]
    fn redefined_residue_with_same_name_is_reentered() {
        let mut builder = builder_with_chain();
        builder.init_residue("ALA", ' ', 1, ' ').unwrap();
        builder.init_atom(atom("N", ' ', 1.0, 0.0)).unwrap();
        builder.init_residue("GLY", ' ', 2, ' ').unwrap();
        builder.init_residue("ALA", ' ', 1, ' ').unwrap();
        builder.init_atom(atom("CA", ' ', 1.0, 1.0)).unwrap();

        let structure = builder.get_structure().unwrap();
        let chain = structure.first_model().unwrap().chain("A").unwrap();
        assert_eq!(chain.residue_count(), 2);
        let ala = chain.residue(&ResidueId::standard(1)).unwrap();
        assert_eq!(ala.atom_count(), 2);
    }

    #[test]
    fn point_mutation_becomes_disordered_residue() {
        let mut builder = builder_with_chain();
        builder.init_residue("SER", ' ', 10, ' ').unwrap();
        builder.init_atom(atom("CA", 'A', 0.5, 1.0)).unwrap();
        builder.init_residue("CYS", ' ', 10, ' ').unwrap();
        builder.init_atom(atom("CA", 'B', 0.5, 2.0)).unwrap();
        builder.init_residue("GLY", ' ', 11, ' ').unwrap();

        let structure = builder.get_structure().unwrap();
        let chain = structure.first_model().unwrap().chain("A").unwrap();
        let entry = chain.entry(&ResidueId::standard(10)).unwrap();

        match entry {
            ResidueEntry::Disordered(disordered) => {
                assert_eq!(disordered.names(), vec!["SER", "CYS"]);
                assert_eq!(disordered.selected().name, "CYS");
                assert!(disordered.selected().has_atom("CA"));
            }
            other => panic!("expected a disordered residue, got {other:?}"),
        }

        let order: Vec<_> = chain.iter_residues().map(|r| r.id.seq).collect();
        assert_eq!(order, vec![10, 11]);
    }

    #[test]
    fn existing_point_mutation_is_selected_or_extended() {
        let mut builder = builder_with_chain();
        builder.init_residue("SER", ' ', 10, ' ').unwrap();
        builder.init_atom(atom("CA", 'A', 0.5, 1.0)).unwrap();
        builder.init_residue("CYS", ' ', 10, ' ').unwrap();
        builder.init_atom(atom("CA", 'B', 0.5, 2.0)).unwrap();
        builder.init_residue("SER", ' ', 10, ' ').unwrap();
        builder.init_atom(atom("CB", 'A', 0.5, 3.0)).unwrap();
        builder.init_residue("THR", ' ', 10, ' ').unwrap();

        let structure = builder.get_structure().unwrap();
        let chain = structure.first_model().unwrap().chain("A").unwrap();
        let ResidueEntry::Disordered(disordered) =
            chain.entry(&ResidueId::standard(10)).unwrap()
        else {
            panic!("expected a disordered residue");
        };
        assert_eq!(disordered.names(), vec!["SER", "CYS", "THR"]);
        let ser = &disordered.children()[0];
        assert!(ser.has_atom("CB"));
    }

    #[test]
    fn point_mutation_with_blank_altlocs_is_rejected() {
        let mut builder = builder_with_chain();
        builder.init_residue("SER", ' ', 10, ' ').unwrap();
        builder.init_atom(atom("CA", ' ', 1.0, 1.0)).unwrap();

        let err = builder.init_residue("CYS", ' ', 10, ' ').unwrap_err();
        assert!(matches!(err, Error::BlankAltlocs { .. }));

        // Atoms following a rejected residue are ignored.
        builder.init_atom(atom("CB", ' ', 1.0, 2.0)).unwrap();
        let structure = builder.get_structure().unwrap();
        let chain = structure.first_model().unwrap().chain("A").unwrap();
        let ser = chain.residue(&ResidueId::standard(10)).unwrap();
        assert_eq!(ser.name, "SER");
        assert_eq!(ser.atom_count(), 1);
    }

    #[test]
    fn altloc_atoms_are_grouped_and_residue_flagged() {
        let mut builder = builder_with_chain();
        builder.init_residue("LEU", ' ', 5, ' ').unwrap();
        builder.init_atom(atom("N", ' ', 1.0, 0.0)).unwrap();
        builder.init_atom(atom("CG", 'A', 0.3, 1.0)).unwrap();
        builder.init_atom(atom("CG", 'B', 0.7, 2.0)).unwrap();

        let structure = builder.get_structure().unwrap();
        let residue = structure.first_model().unwrap().chain("A").unwrap().iter_residues().next().unwrap().clone();
        assert!(residue.disordered);
        assert_eq!(residue.atom_count(), 2);
        assert_eq!(residue.unpacked_atoms().count(), 3);
        assert_eq!(residue.atom("CG").unwrap().altloc, 'B');
    }

    #[test]
    fn blank_altloc_atom_is_folded_into_disordered_atom() {
        let mut builder = builder_with_chain();
        builder.init_residue("LEU", ' ', 5, ' ').unwrap();
        builder.init_atom(atom("CG", ' ', 0.5, 1.0)).unwrap();
        builder.init_atom(atom("CG", 'B', 0.5, 2.0)).unwrap();

        let structure = builder.get_structure().unwrap();
        let chain = structure.first_model().unwrap().chain("A").unwrap();
        let residue = chain.iter_residues().next().unwrap();
        let Some(AtomEntry::Disordered(cg)) = residue.entry("CG") else {
            panic!("CG should be disordered");
        };
        assert_eq!(cg.altlocs(), vec!['B', ' ']);
        assert!(residue.disordered);
    }

    #[test]
    fn names_differing_in_spaces_keep_their_full_name() {
        let mut builder = builder_with_chain();
        builder.init_residue("LIG", 'H', 1, ' ').unwrap();
        let mut first = atom("CA", ' ', 1.0, 0.0);
        first.fullname = "CA  ".into();
        let mut second = atom("CA", ' ', 1.0, 1.0);
        second.fullname = " CA ".into();
        builder.init_atom(first).unwrap();
        builder.init_atom(second).unwrap();

        let structure = builder.get_structure().unwrap();
        let residue = structure.iter_chains().next().unwrap().iter_residues().next().unwrap();
        assert!(residue.has_atom("CA"));
        assert!(residue.has_atom(" CA "));
    }

    #[test]
    fn duplicate_atom_without_altloc_is_an_error() {
        let mut builder = builder_with_chain();
        builder.init_residue("ALA", ' ', 1, ' ').unwrap();
        builder.init_atom(atom("CA", ' ', 1.0, 0.0)).unwrap();
        let err = builder.init_atom(atom("CA", ' ', 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, Error::DuplicateAtom { .. }));
    }

    #[test]
    fn header_is_attached_to_structure() {
        let mut builder = builder_with_chain();
        builder.header_mut().idcode = Some("1ABC".into());
        let structure = builder.get_structure().unwrap();
        assert_eq!(structure.header.idcode.as_deref(), Some("1ABC"));
    }
}
