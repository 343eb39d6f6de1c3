//! Whole-structure operations: rigid transforms and biological assembly expansion.

mod assembly;
mod error;
mod transform;

pub use assembly::apply_bioassembly;

pub use transform::Transform;

pub use error::Error;
