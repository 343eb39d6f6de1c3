pub mod reader;
pub mod remark350;
pub mod writer;
