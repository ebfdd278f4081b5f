//! Markup tree: tolerant parsing and serialization of Jelly-flavored markup.

mod parser;
mod scan;
mod serialize;
mod tree;

pub use parser::parse;
pub use serialize::serialize;
pub use tree::{Attribute, Document, Element, NodeData, NodeId};
