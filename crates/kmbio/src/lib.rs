//! # kmbio
//!
//! **kmbio** reads, builds, transforms and writes macromolecular structures. PDB and PDBx/mmCIF files are parsed into a structure → model → chain → residue → atom hierarchy that keeps alternate locations and point mutations, biological assemblies can be expanded from either format, and structures can be superposed and written back out as PDB.
//!
//! ## Features
//!
//! - **Disorder-aware hierarchy** – `DisorderedAtom` and `DisorderedResidue` keep every conformer of an alternate location or point mutation while exposing the selected one by default.
//! - **Two readers, one builder** – `PdbParser` and `MmcifParser` feed the same `StructureBuilder`, so both formats produce identical models and share permissive/strict handling of malformed input.
//! - **Biological assemblies** – `REMARK 350` and `_pdbx_struct_assembly_gen` tables are parsed into the same `Bioassembly` records and expanded into one model per symmetry copy.
//! - **Faithful PDB output** – `PdbWriter` emits fixed-column records with selectable atom numbering and pluggable `Select` filters.
//! - **Superposition** – QCP and Kabsch (SVD) superimposers on raw coordinates or atoms.

pub mod builder;
pub mod io;
pub mod model;
pub mod ops;
pub mod tools;

mod utils;

pub use builder::StructureBuilder;
pub use io::{load_structure, open_url};
pub use model::atom::{Atom, AtomEntry, DisorderedAtom};
pub use model::chain::Chain;
pub use model::compare::{DEFAULT_TOLERANCE, allequal};
pub use model::header::{AssemblyOperation, Bioassembly, Biomt, Header};
pub use model::model::Model;
pub use model::residue::{DisorderedResidue, Residue, ResidueEntry};
pub use model::structure::Structure;
pub use model::types::{Element, HetField, Point, ResidueId};
