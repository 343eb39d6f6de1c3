//! Residues and point-mutation containers.
//!
//! A [`Residue`] owns its atom slots in file order. When a deposited structure models a
//! point mutation, several residues share one identifier; they are kept together in a
//! [`DisorderedResidue`] keyed by residue name. [`ResidueEntry`] is the slot a chain
//! stores.

use super::atom::{Atom, AtomEntry};
use super::types::ResidueId;
use smol_str::SmolStr;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub id: ResidueId,
    /// Residue name (`ASN`, `HOH`, ...).
    pub name: SmolStr,
    /// Segment identifier, `"    "` style padding preserved as read.
    pub segid: SmolStr,
    /// Set when at least one atom of the residue has alternate locations.
    pub disordered: bool,
    atoms: Vec<AtomEntry>,
}

impl Residue {
    pub fn new(id: ResidueId, name: &str, segid: &str) -> Self {
        Self {
            id,
            name: SmolStr::new(name),
            segid: SmolStr::new(segid),
            disordered: false,
            atoms: Vec::new(),
        }
    }

    pub fn add_atom(&mut self, atom: Atom) {
        self.add_entry(AtomEntry::Ordered(atom));
    }

    /// Appends an atom slot. Names must be unique within the residue.
    pub fn add_entry(&mut self, entry: AtomEntry) {
        debug_assert!(
            !self.has_atom(entry.name()),
            "Attempted to add a duplicate atom name '{}' to residue '{}'",
            entry.name(),
            self.name
        );
        self.atoms.push(entry);
    }

    pub fn remove_atom(&mut self, name: &str) -> Option<AtomEntry> {
        let index = self.atoms.iter().position(|a| a.name() == name)?;
        Some(self.atoms.remove(index))
    }

    pub fn entry(&self, name: &str) -> Option<&AtomEntry> {
        self.atoms.iter().find(|a| a.name() == name)
    }

    pub fn entry_mut(&mut self, name: &str) -> Option<&mut AtomEntry> {
        self.atoms.iter_mut().find(|a| a.name() == name)
    }

    /// Selected atom for `name`.
    pub fn atom(&self, name: &str) -> Option<&Atom> {
        self.entry(name).map(AtomEntry::atom)
    }

    pub fn atom_mut(&mut self, name: &str) -> Option<&mut Atom> {
        self.entry_mut(name).map(AtomEntry::atom_mut)
    }

    pub fn has_atom(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn entries(&self) -> &[AtomEntry] {
        &self.atoms
    }

    /// Number of atom slots (alternate conformers count once).
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Selected atom of every slot.
    pub fn iter_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter().map(AtomEntry::atom)
    }

    pub fn iter_atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.atoms.iter_mut().map(AtomEntry::atom_mut)
    }

    /// Every atom, each alternate conformer included.
    pub fn unpacked_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter().flat_map(|a| a.unpacked().iter())
    }

    pub fn unpacked_atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.atoms.iter_mut().flat_map(|a| a.unpacked_mut().iter_mut())
    }

    /// True when every atom carries a non-blank altloc.
    pub fn is_completely_disordered(&self) -> bool {
        self.unpacked_atoms().all(|a| a.altloc != ' ')
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Residue {{ id: {}, name: \"{}\", segid: \"{}\", atoms: {} }}",
            self.id,
            self.name,
            self.segid,
            self.atom_count()
        )
    }
}

/// Residues sharing one identifier, keyed by residue name.
#[derive(Debug, Clone, PartialEq)]
pub struct DisorderedResidue {
    pub id: ResidueId,
    children: Vec<Residue>,
    selected: usize,
}

impl DisorderedResidue {
    pub fn new(id: ResidueId) -> Self {
        Self {
            id,
            children: Vec::new(),
            selected: 0,
        }
    }

    /// Adds a residue and selects it.
    pub fn add(&mut self, residue: Residue) {
        debug_assert!(
            !self.has_name(&residue.name),
            "Attempted to add residue '{}' twice to disordered residue {}",
            residue.name,
            self.id
        );
        self.children.push(residue);
        self.selected = self.children.len() - 1;
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.children.iter().any(|r| r.name == name)
    }

    /// Selects the child named `name`. Returns `false` when absent.
    pub fn select(&mut self, name: &str) -> bool {
        match self.children.iter().position(|r| r.name == name) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    pub fn selected(&self) -> &Residue {
        &self.children[self.selected]
    }

    pub fn selected_mut(&mut self) -> &mut Residue {
        &mut self.children[self.selected]
    }

    pub fn children(&self) -> &[Residue] {
        &self.children
    }

    pub fn names(&self) -> Vec<&str> {
        self.children.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Residue slot inside a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ResidueEntry {
    Ordered(Residue),
    Disordered(DisorderedResidue),
}

impl ResidueEntry {
    pub fn id(&self) -> &ResidueId {
        match self {
            ResidueEntry::Ordered(residue) => &residue.id,
            ResidueEntry::Disordered(residue) => &residue.id,
        }
    }

    pub fn residue(&self) -> &Residue {
        match self {
            ResidueEntry::Ordered(residue) => residue,
            ResidueEntry::Disordered(residue) => residue.selected(),
        }
    }

    pub fn residue_mut(&mut self) -> &mut Residue {
        match self {
            ResidueEntry::Ordered(residue) => residue,
            ResidueEntry::Disordered(residue) => residue.selected_mut(),
        }
    }

    pub fn is_disordered(&self) -> bool {
        matches!(self, ResidueEntry::Disordered(_))
    }

    /// Every residue in the slot, each point-mutation variant included.
    pub fn unpacked(&self) -> &[Residue] {
        match self {
            ResidueEntry::Ordered(residue) => std::slice::from_ref(residue),
            ResidueEntry::Disordered(residue) => residue.children(),
        }
    }

    pub fn unpacked_mut(&mut self) -> &mut [Residue] {
        match self {
            ResidueEntry::Ordered(residue) => std::slice::from_mut(residue),
            ResidueEntry::Disordered(residue) => &mut residue.children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::DisorderedAtom;
    use crate::model::types::{Element, HetField, Point};

    fn residue_with_atoms(name: &str, atoms: &[(&str, char)]) -> Residue {
        let mut residue = Residue::new(ResidueId::standard(1), name, "    ");
        for (atom_name, altloc) in atoms {
            let atom =
                Atom::new(atom_name, Element::C, Point::origin()).with_altloc(*altloc);
            residue.add_atom(atom);
        }
        residue
    }

    #[test]
    fn residue_lookup_add_and_remove() {
        let mut residue = residue_with_atoms("ALA", &[("N", ' '), ("CA", ' ')]);

        assert_eq!(residue.atom_count(), 2);
        assert!(residue.has_atom("CA"));
        assert!(residue.remove_atom("CA").is_some());
        assert!(!residue.has_atom("CA"));
        assert!(residue.remove_atom("CA").is_none());
    }

    #[test]
    fn residue_unpacked_atoms_include_conformers() {
        let mut residue = residue_with_atoms("SER", &[("N", ' ')]);
        let mut og = DisorderedAtom::new("OG");
        og.add(Atom::new("OG", Element::O, Point::origin()).with_altloc('A'));
        og.add(Atom::new("OG", Element::O, Point::origin()).with_altloc('B'));
        residue.add_entry(AtomEntry::Disordered(og));

        assert_eq!(residue.iter_atoms().count(), 2);
        assert_eq!(residue.unpacked_atoms().count(), 3);
    }

    #[test]
    fn residue_complete_disorder_requires_every_altloc() {
        let partial = residue_with_atoms("ALA", &[("N", ' '), ("CA", 'A')]);
        let complete = residue_with_atoms("ALA", &[("N", 'A'), ("CA", 'A')]);

        assert!(!partial.is_completely_disordered());
        assert!(complete.is_completely_disordered());
    }

    #[test]
    fn disordered_residue_selects_latest_addition() {
        let id = ResidueId::standard(10);
        let mut disordered = DisorderedResidue::new(id.clone());
        disordered.add(Residue::new(id.clone(), "SER", " "));
        disordered.add(Residue::new(id, "CYS", " "));

        assert_eq!(disordered.selected().name, "CYS");
        assert!(disordered.select("SER"));
        assert_eq!(disordered.selected().name, "SER");
        assert!(!disordered.select("GLY"));
        assert_eq!(disordered.names(), vec!["SER", "CYS"]);
    }

    #[test]
    fn residue_entry_exposes_selected_and_unpacked_views() {
        let id = ResidueId::new(HetField::Standard, 3, 'A');
        let mut disordered = DisorderedResidue::new(id.clone());
        disordered.add(Residue::new(id.clone(), "ARG", " "));
        disordered.add(Residue::new(id.clone(), "LYS", " "));
        let entry = ResidueEntry::Disordered(disordered);

        assert_eq!(entry.id(), &id);
        assert_eq!(entry.residue().name, "LYS");
        assert_eq!(entry.unpacked().len(), 2);
        assert!(entry.is_disordered());
    }

    #[test]
    fn residue_display_formats_correctly() {
        let residue = residue_with_atoms("GLY", &[("CA", ' ')]);
        assert_eq!(
            residue.to_string(),
            "Residue { id: (' ', 1, ' '), name: \"GLY\", segid: \"    \", atoms: 1 }"
        );
    }
}
