//! Top of the structure hierarchy.
//!
//! A `Structure` owns an ordered list of [`Model`]s plus the [`Header`] gathered while
//! parsing. It is the unit returned by parsers, expanded by bioassembly operations,
//! moved by superposition, and consumed by the PDB writer. Lower-level entities can be
//! lifted into a structure through the `From` impls so they can be written on their own.

use super::atom::Atom;
use super::chain::Chain;
use super::header::Header;
use super::model::Model;
use super::residue::Residue;
use super::types::{Point, ResidueId};
use crate::utils::parallel::*;
use std::fmt;

/// Identifier given to structures assembled from loose entities.
pub const WRAPPED_STRUCTURE_ID: &str = "pdb";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    pub id: String,
    pub header: Header,
    models: Vec<Model>,
}

impl Structure {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            header: Header::default(),
            models: Vec::new(),
        }
    }

    pub fn add_model(&mut self, model: Model) {
        debug_assert!(
            self.model(model.id).is_none(),
            "Attempted to add a duplicate model ID '{}' to structure '{}'",
            model.id,
            self.id
        );
        self.models.push(model);
    }

    pub fn model(&self, id: usize) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn model_mut(&mut self, id: usize) -> Option<&mut Model> {
        self.models.iter_mut().find(|m| m.id == id)
    }

    /// First model in file order, the one most tools operate on.
    pub fn first_model(&self) -> Option<&Model> {
        self.models.first()
    }

    pub fn remove_model(&mut self, id: usize) -> Option<Model> {
        let index = self.models.iter().position(|m| m.id == id)?;
        Some(self.models.remove(index))
    }

    pub(crate) fn last_model_mut(&mut self) -> Option<&mut Model> {
        self.models.last_mut()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn chain_count(&self) -> usize {
        self.models.iter().map(|m| m.chain_count()).sum()
    }

    pub fn residue_count(&self) -> usize {
        self.models.iter().map(|m| m.residue_count()).sum()
    }

    pub fn atom_count(&self) -> usize {
        self.iter_atoms().count()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter_models(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    pub fn iter_models_mut(&mut self) -> std::slice::IterMut<'_, Model> {
        self.models.iter_mut()
    }

    pub fn iter_chains(&self) -> impl Iterator<Item = &Chain> {
        self.models.iter().flat_map(|m| m.iter_chains())
    }

    /// Selected atoms of every model.
    pub fn iter_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.models.iter().flat_map(|m| m.iter_atoms())
    }

    /// Parallel iterator over every chain of every model.
    ///
    /// Falls back to serial iteration when the `parallel` feature is disabled.
    pub fn par_chains_mut(&mut self) -> impl ParallelIterator<Item = &mut Chain> {
        let chains: Vec<&mut Chain> = self
            .models
            .iter_mut()
            .flat_map(|m| m.chains_mut().iter_mut())
            .collect();
        chains.into_par_iter()
    }

    /// Unweighted centroid of all selected atoms; the origin for an empty structure.
    pub fn geometric_center(&self) -> Point {
        let (sum, count) = self
            .iter_atoms()
            .fold((nalgebra::Vector3::zeros(), 0usize), |(sum, n), atom| {
                (sum + atom.pos.coords, n + 1)
            });
        if count == 0 {
            Point::origin()
        } else {
            Point::from(sum / count as f64)
        }
    }

    /// Mass-weighted centroid; falls back to the geometric center when no atom has a
    /// known mass.
    pub fn center_of_mass(&self) -> Point {
        let (weighted, total_mass) = self.iter_atoms().fold(
            (nalgebra::Vector3::zeros(), 0.0),
            |(sum, mass), atom| {
                let m = atom.element.atomic_mass();
                (sum + atom.pos.coords * m, mass + m)
            },
        );
        if total_mass > 0.0 {
            Point::from(weighted / total_mass)
        } else {
            self.geometric_center()
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Structure {{ id: \"{}\", models: {}, chains: {}, residues: {}, atoms: {} }}",
            self.id,
            self.model_count(),
            self.chain_count(),
            self.residue_count(),
            self.atom_count()
        )
    }
}

impl From<Model> for Structure {
    fn from(model: Model) -> Self {
        let mut structure = Structure::new(WRAPPED_STRUCTURE_ID);
        structure.add_model(model);
        structure
    }
}

impl From<Chain> for Structure {
    fn from(chain: Chain) -> Self {
        let mut model = Model::new(0, 0);
        model.add_chain(chain);
        Structure::from(model)
    }
}

impl From<Residue> for Structure {
    fn from(residue: Residue) -> Self {
        let mut chain = Chain::new("A");
        chain.add_residue(residue);
        Structure::from(chain)
    }
}

impl From<Atom> for Structure {
    fn from(atom: Atom) -> Self {
        let mut residue = Residue::new(ResidueId::standard(1), "DUM", " ");
        residue.add_atom(atom);
        Structure::from(residue)
    }
}

impl FromIterator<Model> for Structure {
    fn from_iter<I: IntoIterator<Item = Model>>(iter: I) -> Self {
        let mut structure = Structure::new(WRAPPED_STRUCTURE_ID);
        for model in iter {
            structure.add_model(model);
        }
        structure
    }
}
