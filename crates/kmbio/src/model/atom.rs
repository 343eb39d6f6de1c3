//! Atoms and alternative-location containers.
//!
//! An [`Atom`] is the leaf of the structure hierarchy. Crystallographic files may list
//! the same atom several times with different alternate-location (`altloc`) flags; those
//! copies are gathered into a [`DisorderedAtom`] which exposes one selected child while
//! keeping every conformer reachable for output. [`AtomEntry`] is the slot a residue
//! stores, holding either form.

use super::types::{Element, Point};
use nalgebra::{Matrix3, Vector3};
use smol_str::SmolStr;
use std::fmt;

/// Labeled atom with crystallographic annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Lookup name. Normally the stripped name (`CA`); it keeps the padded
    /// [`fullname`](Self::fullname) when two names differ only in spaces.
    pub name: SmolStr,
    /// Name exactly as it appeared in the four name columns (`" CA "`).
    pub fullname: SmolStr,
    pub element: Element,
    /// Cartesian coordinates in ångströms.
    pub pos: Point,
    pub bfactor: f64,
    /// Occupancy; `None` when the column was blank.
    pub occupancy: Option<f64>,
    /// Alternate location indicator, `' '` when absent.
    pub altloc: char,
    pub serial_number: Option<u32>,
    /// Set when the atom is one conformer of a [`DisorderedAtom`].
    pub disordered: bool,
}

impl Atom {
    /// Creates an ordered atom with full occupancy, zero B-factor and blank altloc.
    ///
    /// The full name is derived from `name` using the usual four-column alignment.
    pub fn new(name: &str, element: Element, pos: Point) -> Self {
        let name = name.trim();
        Self {
            name: SmolStr::new(name),
            fullname: SmolStr::new(pad_atom_name(name)),
            element,
            pos,
            bfactor: 0.0,
            occupancy: Some(1.0),
            altloc: ' ',
            serial_number: None,
            disordered: false,
        }
    }

    pub fn with_altloc(mut self, altloc: char) -> Self {
        self.altloc = altloc;
        self
    }

    pub fn with_occupancy(mut self, occupancy: Option<f64>) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_bfactor(mut self, bfactor: f64) -> Self {
        self.bfactor = bfactor;
        self
    }

    pub fn with_serial_number(mut self, serial_number: u32) -> Self {
        self.serial_number = Some(serial_number);
        self
    }

    pub fn distance_squared(&self, other: &Atom) -> f64 {
        nalgebra::distance_squared(&self.pos, &other.pos)
    }

    pub fn distance(&self, other: &Atom) -> f64 {
        nalgebra::distance(&self.pos, &other.pos)
    }

    pub fn translate_by(&mut self, vector: &Vector3<f64>) {
        self.pos += vector;
    }

    /// Applies `pos <- rotation * pos + translation`.
    pub fn transform(&mut self, rotation: &Matrix3<f64>, translation: &Vector3<f64>) {
        self.pos = Point::from(rotation * self.pos.coords + translation);
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Atom {{ name: \"{}\", altloc: '{}', element: {}, pos: [{:.3}, {:.3}, {:.3}] }}",
            self.name, self.altloc, self.element, self.pos.x, self.pos.y, self.pos.z
        )
    }
}

/// Aligns a bare atom name into the four PDB name columns.
///
/// One- to three-character names start in the second column; four-character names fill
/// all columns.
pub fn pad_atom_name(name: &str) -> String {
    if name.len() >= 4 {
        name.to_string()
    } else {
        format!(" {:<3}", name)
    }
}

/// Alternate conformers of one atom name, keyed by altloc.
///
/// Exactly one child is selected at a time. Adding a child selects it only when its
/// occupancy beats the best occupancy seen so far, so ties keep the earlier conformer.
#[derive(Debug, Clone, PartialEq)]
pub struct DisorderedAtom {
    pub name: SmolStr,
    children: Vec<Atom>,
    selected: usize,
    best_occupancy: f64,
}

impl DisorderedAtom {
    pub fn new(name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            children: Vec::new(),
            selected: 0,
            best_occupancy: f64::NEG_INFINITY,
        }
    }

    /// Adds a conformer, replacing any child that already uses the same altloc.
    pub fn add(&mut self, mut atom: Atom) {
        atom.disordered = true;
        let occupancy = atom.occupancy.unwrap_or(0.0);
        let altloc = atom.altloc;

        let index = match self.children.iter().position(|a| a.altloc == altloc) {
            Some(index) => {
                self.children[index] = atom;
                index
            }
            None => {
                self.children.push(atom);
                self.children.len() - 1
            }
        };

        if occupancy > self.best_occupancy {
            self.best_occupancy = occupancy;
            self.selected = index;
        }
    }

    /// Makes the conformer with `altloc` the selected one. Returns `false` when absent.
    pub fn select(&mut self, altloc: char) -> bool {
        match self.children.iter().position(|a| a.altloc == altloc) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    pub fn has_altloc(&self, altloc: char) -> bool {
        self.children.iter().any(|a| a.altloc == altloc)
    }

    pub fn altlocs(&self) -> Vec<char> {
        self.children.iter().map(|a| a.altloc).collect()
    }

    pub fn selected(&self) -> &Atom {
        &self.children[self.selected]
    }

    pub fn selected_mut(&mut self) -> &mut Atom {
        &mut self.children[self.selected]
    }

    pub fn children(&self) -> &[Atom] {
        &self.children
    }

    pub fn children_mut(&mut self) -> std::slice::IterMut<'_, Atom> {
        self.children.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Atom slot inside a residue.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomEntry {
    Ordered(Atom),
    Disordered(DisorderedAtom),
}

impl AtomEntry {
    pub fn name(&self) -> &str {
        match self {
            AtomEntry::Ordered(atom) => &atom.name,
            AtomEntry::Disordered(atom) => &atom.name,
        }
    }

    /// The atom this slot currently represents.
    ///
    /// Disordered slots always hold at least one child; the builder never stores an
    /// empty container.
    pub fn atom(&self) -> &Atom {
        match self {
            AtomEntry::Ordered(atom) => atom,
            AtomEntry::Disordered(atom) => atom.selected(),
        }
    }

    pub fn atom_mut(&mut self) -> &mut Atom {
        match self {
            AtomEntry::Ordered(atom) => atom,
            AtomEntry::Disordered(atom) => atom.selected_mut(),
        }
    }

    pub fn is_disordered(&self) -> bool {
        matches!(self, AtomEntry::Disordered(_))
    }

    /// Every atom stored in the slot, all conformers included.
    pub fn unpacked(&self) -> &[Atom] {
        match self {
            AtomEntry::Ordered(atom) => std::slice::from_ref(atom),
            AtomEntry::Disordered(atom) => atom.children(),
        }
    }

    pub fn unpacked_mut(&mut self) -> &mut [Atom] {
        match self {
            AtomEntry::Ordered(atom) => std::slice::from_mut(atom),
            AtomEntry::Disordered(atom) => &mut atom.children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conformer(altloc: char, occupancy: f64, x: f64) -> Atom {
        Atom::new("CA", Element::C, Point::new(x, 0.0, 0.0))
            .with_altloc(altloc)
            .with_occupancy(Some(occupancy))
    }

    #[test]
    fn atom_new_pads_fullname_and_sets_defaults() {
        let atom = Atom::new("CA", Element::C, Point::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "CA");
        assert_eq!(atom.fullname, " CA ");
        assert_eq!(atom.altloc, ' ');
        assert_eq!(atom.occupancy, Some(1.0));
        assert!(!atom.disordered);
    }

    #[test]
    fn pad_atom_name_handles_four_character_names() {
        assert_eq!(pad_atom_name("N"), " N  ");
        assert_eq!(pad_atom_name("OXT"), " OXT");
        assert_eq!(pad_atom_name("HG21"), "HG21");
    }

    #[test]
    fn atom_distance_calculates_correctly() {
        let a = Atom::new("A", Element::H, Point::new(0.0, 0.0, 0.0));
        let b = Atom::new("B", Element::H, Point::new(3.0, 4.0, 0.0));

        assert!((a.distance_squared(&b) - 25.0).abs() < 1e-10);
        assert!((a.distance(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn atom_transform_rotates_then_translates() {
        let mut atom = Atom::new("X", Element::C, Point::new(1.0, 0.0, 0.0));
        let rotation = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);

        atom.transform(&rotation, &Vector3::new(0.0, 0.0, 2.0));

        assert!((atom.pos.x - 0.0).abs() < 1e-12);
        assert!((atom.pos.y - 1.0).abs() < 1e-12);
        assert!((atom.pos.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn disordered_atom_selects_highest_occupancy() {
        let mut disordered = DisorderedAtom::new("CA");
        disordered.add(conformer('A', 0.4, 1.0));
        disordered.add(conformer('B', 0.6, 2.0));
        disordered.add(conformer('C', 0.6, 3.0));

        assert_eq!(disordered.len(), 3);
        assert_eq!(disordered.selected().altloc, 'B');
        assert!(disordered.children().iter().all(|a| a.disordered));
    }

    #[test]
    fn disordered_atom_replaces_same_altloc() {
        let mut disordered = DisorderedAtom::new("CA");
        disordered.add(conformer('A', 0.5, 1.0));
        disordered.add(conformer('A', 0.5, 9.0));

        assert_eq!(disordered.len(), 1);
        assert!((disordered.selected().pos.x - 9.0).abs() < 1e-12);
    }

    #[test]
    fn disordered_atom_select_switches_child() {
        let mut disordered = DisorderedAtom::new("CA");
        disordered.add(conformer('A', 0.7, 1.0));
        disordered.add(conformer('B', 0.3, 2.0));

        assert!(disordered.select('B'));
        assert_eq!(disordered.selected().altloc, 'B');
        assert!(!disordered.select('Z'));
        assert_eq!(disordered.altlocs(), vec!['A', 'B']);
    }

    #[test]
    fn atom_entry_unpacks_every_conformer() {
        let mut disordered = DisorderedAtom::new("CA");
        disordered.add(conformer('A', 0.5, 1.0));
        disordered.add(conformer('B', 0.5, 2.0));
        let entry = AtomEntry::Disordered(disordered);

        assert_eq!(entry.name(), "CA");
        assert_eq!(entry.unpacked().len(), 2);
        assert_eq!(entry.atom().altloc, 'A');

        let ordered = AtomEntry::Ordered(Atom::new("N", Element::N, Point::origin()));
        assert_eq!(ordered.unpacked().len(), 1);
        assert!(!ordered.is_disordered());
    }
}
