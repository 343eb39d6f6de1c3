//! PDBx/mmCIF support: tokenizer, flat dictionary, assembly tables and the structure
//! reader built on top of them.

pub mod bioassembly;
pub mod dict;
pub mod lexer;
pub mod reader;
