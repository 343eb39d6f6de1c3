mod error;
pub mod mmcif;
mod parser;
pub mod pdb;
mod source;

pub use error::Error;
pub use parser::Parser;

pub use pdb::reader::PdbParser;
pub use pdb::remark350::Remark350;
pub use pdb::writer::{
    AtomNumbering, NotDisordered, PdbWriter, SaveOptions, Select, SelectAll, save_structure,
};

pub use mmcif::bioassembly::get_mmcif_bioassembly_data;
pub use mmcif::dict::MmcifDict;
pub use mmcif::reader::MmcifParser;

pub use source::{DEFAULT_ROUTES, Format, Route, load_structure, open_url, resolve_url, route};
