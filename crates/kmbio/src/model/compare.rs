//! Structural equality with coordinate tolerance.

use super::chain::Chain;
use super::model::Model;
use super::residue::Residue;
use super::structure::Structure;

/// Default coordinate tolerance in ångströms, matching the three decimals PDB keeps.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// Returns `true` when two structures hold the same hierarchy and coordinates.
///
/// Models are compared pairwise in order, chains and residues by identifier and order,
/// atoms by name, element and position (each axis within `tolerance`). Structure ids,
/// headers, B-factors and serial numbers are ignored, so a structure and its PDB round
/// trip compare equal.
pub fn allequal(a: &Structure, b: &Structure, tolerance: f64) -> bool {
    a.model_count() == b.model_count()
        && a
            .iter_models()
            .zip(b.iter_models())
            .all(|(ma, mb)| models_equal(ma, mb, tolerance))
}

fn models_equal(a: &Model, b: &Model, tolerance: f64) -> bool {
    a.chain_count() == b.chain_count()
        && a.iter_chains()
            .zip(b.iter_chains())
            .all(|(ca, cb)| chains_equal(ca, cb, tolerance))
}

fn chains_equal(a: &Chain, b: &Chain, tolerance: f64) -> bool {
    a.id == b.id
        && a.residue_count() == b.residue_count()
        && a.iter_residues()
            .zip(b.iter_residues())
            .all(|(ra, rb)| residues_equal(ra, rb, tolerance))
}

fn residues_equal(a: &Residue, b: &Residue, tolerance: f64) -> bool {
    if a.id != b.id || a.name != b.name || a.atom_count() != b.atom_count() {
        return false;
    }
    a.iter_atoms().zip(b.iter_atoms()).all(|(x, y)| {
        x.name == y.name
            && x.element == y.element
            && (x.pos - y.pos).iter().all(|d| d.abs() <= tolerance)
    })
}
