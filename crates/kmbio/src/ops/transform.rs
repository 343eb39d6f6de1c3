//! Rigid-body moves of whole structures and of bioassembly copies.
//!
//! Every operation moves all conformers of every atom, so alternate locations and point
//! mutations stay consistent with the selected atoms.

use crate::model::header::Biomt;
use crate::model::model::Model;
use crate::model::structure::Structure;
use crate::model::types::Point;
use crate::utils::parallel::*;
use nalgebra::{Matrix3, Vector3};

/// Collection of rigid-body operations that mutate coordinates in place.
pub struct Transform;

impl Transform {
    /// Translates all atoms by `vector`.
    pub fn translate(structure: &mut Structure, vector: &Vector3<f64>) {
        structure.par_chains_mut().for_each(|chain| {
            for atom in chain.unpacked_atoms_mut() {
                atom.translate_by(vector);
            }
        });
    }

    /// Moves the unweighted centroid of the selected atoms to `target` (the origin when
    /// `None`).
    pub fn center_geometry(structure: &mut Structure, target: Option<Point>) {
        let shift = target.unwrap_or(Point::origin()) - structure.geometric_center();
        Self::translate(structure, &shift);
    }

    /// Moves the centre of mass of the selected atoms to `target` (the origin when
    /// `None`).
    pub fn center_mass(structure: &mut Structure, target: Option<Point>) {
        let shift = target.unwrap_or(Point::origin()) - structure.center_of_mass();
        Self::translate(structure, &shift);
    }

    /// Applies `x' = R x + t` to every atom.
    pub fn apply(structure: &mut Structure, rotation: &Matrix3<f64>, translation: &Vector3<f64>) {
        structure.par_chains_mut().for_each(|chain| {
            for atom in chain.unpacked_atoms_mut() {
                atom.transform(rotation, translation);
            }
        });
    }

    /// Applies a bioassembly operator to every atom of one model.
    pub fn apply_biomt(model: &mut Model, biomt: &Biomt) {
        let rotation = biomt.rotation_matrix();
        let translation = biomt.translation_vector();
        model.chains_mut().into_par_iter().for_each(|chain| {
            for atom in chain.unpacked_atoms_mut() {
                atom.transform(&rotation, &translation);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use crate::model::{
        atom::{Atom, AtomEntry, DisorderedAtom},
        chain::Chain,
        header::Biomt,
        model::Model,
        residue::Residue,
        structure::Structure,
        types::{Element, Point, ResidueId},
    };
    use nalgebra::{Matrix3, Vector3};

    fn structure_with(atoms: &[(Element, Point)]) -> Structure {
        let mut residue = Residue::new(ResidueId::standard(1), "UNK", " ");
        for (idx, (element, point)) in atoms.iter().enumerate() {
            residue.add_atom(Atom::new(&format!("X{idx}"), *element, *point));
        }
        let mut chain = Chain::new("A");
        chain.add_residue(residue);
        Structure::from(chain)
    }

    fn assert_point_close(actual: &Point, expected: &Point) {
        assert!((actual - expected).norm() < 1e-6, "{actual} != {expected}");
    }

    #[test]
    fn translate_moves_all_atoms_by_vector() {
        let mut structure = structure_with(&[
            (Element::C, Point::new(0.0, 0.0, 0.0)),
            (Element::C, Point::new(1.0, 2.0, 3.0)),
        ]);

        Transform::translate(&mut structure, &Vector3::new(5.0, -2.0, 1.5));

        let mut atoms = structure.iter_atoms();
        assert_point_close(&atoms.next().unwrap().pos, &Point::new(5.0, -2.0, 1.5));
        assert_point_close(&atoms.next().unwrap().pos, &Point::new(6.0, 0.0, 4.5));
    }

    #[test]
    fn centering_targets_centroid_or_mass_center() {
        let atoms = [
            (Element::H, Point::new(0.0, 0.0, 0.0)),
            (Element::O, Point::new(4.0, 0.0, 0.0)),
        ];

        let mut by_geometry = structure_with(&atoms);
        Transform::center_geometry(&mut by_geometry, Some(Point::new(10.0, 0.0, 0.0)));
        assert_point_close(&by_geometry.geometric_center(), &Point::new(10.0, 0.0, 0.0));

        let mut by_mass = structure_with(&atoms);
        Transform::center_mass(&mut by_mass, None);
        assert_point_close(&by_mass.center_of_mass(), &Point::origin());
        // The heavy oxygen ends up much closer to the origin than the hydrogen.
        let x: Vec<f64> = by_mass.iter_atoms().map(|a| a.pos.x).collect();
        assert!(x[1].abs() < x[0].abs());
    }

    #[test]
    fn apply_rotates_then_translates() {
        let mut structure = structure_with(&[(Element::C, Point::new(1.0, 0.0, 0.0))]);
        let quarter_turn = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);

        Transform::apply(&mut structure, &quarter_turn, &Vector3::new(0.0, 0.0, 2.0));

        let atom = structure.iter_atoms().next().unwrap();
        assert_point_close(&atom.pos, &Point::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn apply_biomt_moves_every_altloc() {
        let mut residue = Residue::new(ResidueId::standard(1), "SER", " ");
        let mut og = DisorderedAtom::new("OG");
        og.add(Atom::new("OG", Element::O, Point::new(1.0, 0.0, 0.0)).with_altloc('A'));
        og.add(Atom::new("OG", Element::O, Point::new(2.0, 0.0, 0.0)).with_altloc('B'));
        residue.add_entry(AtomEntry::Disordered(og));
        let mut chain = Chain::new("A");
        chain.add_residue(residue);
        let mut model = Model::new(0, 1);
        model.add_chain(chain);

        let biomt = Biomt {
            rotation: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 10.0],
        };
        Transform::apply_biomt(&mut model, &biomt);

        let positions: Vec<Point> = model
            .iter_chains()
            .flat_map(|c| c.iter_residues())
            .flat_map(|r| r.unpacked_atoms())
            .map(|a| a.pos)
            .collect();
        assert_point_close(&positions[0], &Point::new(-1.0, 0.0, 10.0));
        assert_point_close(&positions[1], &Point::new(-2.0, 0.0, 10.0));
    }
}
