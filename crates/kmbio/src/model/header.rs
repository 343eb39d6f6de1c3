//! File-level metadata and biological assembly definitions.
//!
//! Both PDB (`REMARK 350`) and mmCIF (`_pdbx_struct_assembly_gen`,
//! `_pdbx_struct_oper_list`) readers normalise assembly data into the same
//! [`Bioassembly`] representation, so assemblies from either source compare directly.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header fields shared by PDB and mmCIF inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Four-character entry code (`1ABC`).
    pub idcode: Option<String>,
    /// Entry title.
    pub name: Option<String>,
    /// Classification / keywords line.
    pub head: Option<String>,
    pub deposition_date: Option<String>,
    pub structure_method: Option<String>,
    /// Resolution in ångströms.
    pub resolution: Option<f64>,
    /// Biological assemblies keyed by assembly id (`"1"`, `"2"`, ...).
    pub bioassembly_data: BTreeMap<String, Bioassembly>,
}

/// Rigid-body operator `x' = R x + t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Biomt {
    /// Row-major rotation matrix.
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl Biomt {
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }

    pub fn from_matrices(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut rows = [[0.0; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = rotation[(i, j)];
            }
        }
        Self {
            rotation: rows,
            translation: [translation.x, translation.y, translation.z],
        }
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        let r = &self.rotation;
        Matrix3::new(
            r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
        )
    }

    pub fn translation_vector(&self) -> Vector3<f64> {
        Vector3::from(self.translation)
    }

    /// Operator equivalent to applying `inner` first, then `self`.
    pub fn compose(&self, inner: &Biomt) -> Biomt {
        let r_outer = self.rotation_matrix();
        let rotation = r_outer * inner.rotation_matrix();
        let translation = r_outer * inner.translation_vector() + self.translation_vector();
        Biomt::from_matrices(&rotation, &translation)
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        self.approx_eq(&Biomt::identity(), tolerance)
    }

    pub fn approx_eq(&self, other: &Biomt, tolerance: f64) -> bool {
        let rotation_close = self
            .rotation
            .iter()
            .flatten()
            .zip(other.rotation.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tolerance);
        let translation_close = self
            .translation
            .iter()
            .zip(other.translation.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance);
        rotation_close && translation_close
    }
}

/// A set of chains together with the operators applied to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyOperation {
    pub chains: Vec<String>,
    pub transforms: Vec<Biomt>,
}

/// One biological assembly: an ordered list of chain/operator groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bioassembly {
    pub id: String,
    pub operations: Vec<AssemblyOperation>,
}

impl Bioassembly {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operations: Vec::new(),
        }
    }

    /// Total number of copies produced when the assembly is expanded.
    pub fn copy_count(&self) -> usize {
        self.operations.iter().map(|op| op.transforms.len()).sum()
    }

    /// Structural comparison with numeric tolerance on the operators.
    ///
    /// Text precision differs between formats (PDB keeps six decimals), so exact
    /// equality is too strict when comparing assemblies read from different files.
    pub fn approx_eq(&self, other: &Bioassembly, tolerance: f64) -> bool {
        self.id == other.id
            && self.operations.len() == other.operations.len()
            && self
                .operations
                .iter()
                .zip(&other.operations)
                .all(|(a, b)| {
                    a.chains == b.chains
                        && a.transforms.len() == b.transforms.len()
                        && a.transforms
                            .iter()
                            .zip(&b.transforms)
                            .all(|(x, y)| x.approx_eq(y, tolerance))
                })
    }
}

/// Compares two assembly tables key by key with [`Bioassembly::approx_eq`].
pub fn bioassembly_data_approx_eq(
    a: &BTreeMap<String, Bioassembly>,
    b: &BTreeMap<String, Bioassembly>,
    tolerance: f64,
) -> bool {
    a.len() == b.len()
        && a.iter().all(|(key, assembly)| {
            b.get(key)
                .is_some_and(|other| assembly.approx_eq(other, tolerance))
        })
}
