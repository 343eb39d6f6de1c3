use super::atom::Atom;
use super::residue::{Residue, ResidueEntry};
use super::types::ResidueId;
use smol_str::SmolStr;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub id: SmolStr,
    residues: Vec<ResidueEntry>,
}

impl Chain {
    pub fn new(id: &str) -> Self {
        Self {
            id: SmolStr::new(id),
            residues: Vec::new(),
        }
    }

    pub fn add_residue(&mut self, residue: Residue) {
        self.add_entry(ResidueEntry::Ordered(residue));
    }

    pub fn add_entry(&mut self, entry: ResidueEntry) {
        debug_assert!(
            self.entry(entry.id()).is_none(),
            "Attempted to add a duplicate residue ID {} to chain '{}'",
            entry.id(),
            self.id
        );
        self.residues.push(entry);
    }

    /// Removes a residue slot, keeping its position free for a replacement via
    /// [`Chain::insert_entry`].
    pub fn remove_entry(&mut self, id: &ResidueId) -> Option<(usize, ResidueEntry)> {
        let index = self.residues.iter().position(|r| r.id() == id)?;
        Some((index, self.residues.remove(index)))
    }

    pub fn insert_entry(&mut self, index: usize, entry: ResidueEntry) {
        let index = index.min(self.residues.len());
        self.residues.insert(index, entry);
    }

    pub fn entry(&self, id: &ResidueId) -> Option<&ResidueEntry> {
        self.residues.iter().find(|r| r.id() == id)
    }

    pub fn entry_mut(&mut self, id: &ResidueId) -> Option<&mut ResidueEntry> {
        self.residues.iter_mut().find(|r| r.id() == id)
    }

    pub fn residue(&self, id: &ResidueId) -> Option<&Residue> {
        self.entry(id).map(ResidueEntry::residue)
    }

    pub fn residue_mut(&mut self, id: &ResidueId) -> Option<&mut Residue> {
        self.entry_mut(id).map(ResidueEntry::residue_mut)
    }

    /// Finds a residue by sequence number and insertion code, ignoring the hetfield.
    pub fn residue_by_seq(&self, seq: i32, icode: char) -> Option<&Residue> {
        self.iter_residues()
            .find(|r| r.id.seq == seq && r.id.icode == icode)
    }

    pub fn entries(&self) -> &[ResidueEntry] {
        &self.residues
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Selected residue of every slot.
    pub fn iter_residues(&self) -> impl Iterator<Item = &Residue> {
        self.residues.iter().map(ResidueEntry::residue)
    }

    pub fn iter_residues_mut(&mut self) -> impl Iterator<Item = &mut Residue> {
        self.residues.iter_mut().map(ResidueEntry::residue_mut)
    }

    /// Every residue, each point-mutation variant included.
    pub fn unpacked_residues(&self) -> impl Iterator<Item = &Residue> {
        self.residues.iter().flat_map(|r| r.unpacked().iter())
    }

    pub fn unpacked_residues_mut(&mut self) -> impl Iterator<Item = &mut Residue> {
        self.residues
            .iter_mut()
            .flat_map(|r| r.unpacked_mut().iter_mut())
    }

    pub fn iter_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.iter_residues().flat_map(|r| r.iter_atoms())
    }

    /// Every stored atom, conformers and mutation variants included.
    pub fn unpacked_atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.unpacked_residues_mut()
            .flat_map(|r| r.unpacked_atoms_mut())
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chain {{ id: \"{}\", residues: {} }}",
            self.id,
            self.residue_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::residue::DisorderedResidue;
    use crate::model::types::{Element, HetField, Point};

    fn residue(seq: i32, name: &str) -> Residue {
        let mut residue = Residue::new(ResidueId::standard(seq), name, " ");
        residue.add_atom(Atom::new("CA", Element::C, Point::new(seq as f64, 0.0, 0.0)));
        residue
    }

    #[test]
    fn chain_add_and_lookup_residues() {
        let mut chain = Chain::new("A");
        chain.add_residue(residue(1, "ALA"));
        chain.add_residue(residue(2, "GLY"));

        assert_eq!(chain.residue_count(), 2);
        assert_eq!(chain.residue(&ResidueId::standard(2)).unwrap().name, "GLY");
        assert!(chain.residue(&ResidueId::standard(3)).is_none());
        assert_eq!(chain.residue_by_seq(1, ' ').unwrap().name, "ALA");
    }

    #[test]
    fn chain_hetero_ids_do_not_collide_with_standard_ids() {
        let mut chain = Chain::new("A");
        chain.add_residue(residue(1, "ALA"));
        let het_id = ResidueId::new(HetField::Hetero("NAG".into()), 1, ' ');
        chain.add_residue(Residue::new(het_id.clone(), "NAG", " "));

        assert_eq!(chain.residue(&het_id).unwrap().name, "NAG");
        assert_eq!(chain.residue(&ResidueId::standard(1)).unwrap().name, "ALA");
    }

    #[test]
    fn chain_remove_and_insert_preserves_position() {
        let mut chain = Chain::new("A");
        chain.add_residue(residue(1, "ALA"));
        chain.add_residue(residue(2, "GLY"));
        chain.add_residue(residue(3, "SER"));

        let (index, entry) = chain.remove_entry(&ResidueId::standard(2)).unwrap();
        assert_eq!(index, 1);
        chain.insert_entry(index, entry);

        let names: Vec<_> = chain.iter_residues().map(|r| r.name.to_string()).collect();
        assert_eq!(names, vec!["ALA", "GLY", "SER"]);
    }

    #[test]
    fn chain_unpacked_residues_expand_point_mutations() {
        let mut chain = Chain::new("A");
        let id = ResidueId::standard(5);
        let mut disordered = DisorderedResidue::new(id.clone());
        disordered.add(residue(5, "SER"));
        disordered.add(residue(5, "CYS"));
        chain.add_entry(ResidueEntry::Disordered(disordered));

        assert_eq!(chain.iter_residues().count(), 1);
        assert_eq!(chain.unpacked_residues().count(), 2);
        assert_eq!(chain.residue(&id).unwrap().name, "CYS");
    }

    #[test]
    fn chain_atom_iteration_and_mutation() {
        let mut chain = Chain::new("B");
        chain.add_residue(residue(1, "ALA"));
        chain.add_residue(residue(2, "GLY"));

        assert_eq!(chain.iter_atoms().count(), 2);

        for atom in chain.unpacked_atoms_mut() {
            atom.translate_by(&nalgebra::Vector3::new(0.0, 1.0, 0.0));
        }
        assert!(chain.iter_atoms().all(|a| (a.pos.y - 1.0).abs() < 1e-12));
    }

    #[test]
    fn chain_display_formats_correctly() {
        let mut chain = Chain::new("A");
        chain.add_residue(residue(1, "ALA"));

        assert_eq!(chain.to_string(), "Chain { id: \"A\", residues: 1 }");
        assert_eq!(Chain::new("B").to_string(), "Chain { id: \"B\", residues: 0 }");
    }
}
