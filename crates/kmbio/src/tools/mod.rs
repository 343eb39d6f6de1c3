//! Rigid-body superposition of coordinate sets and atoms.

mod error;
mod fit;
pub mod qcp;
mod superimposer;
pub mod svd;

pub use error::Error;
pub use fit::Fit;
pub use qcp::QcpSuperimposer;
pub use superimposer::{Method, Superimposer};
pub use svd::SvdSuperimposer;
