//! CSS support for inlining: stylesheet reading and selector matching.

mod selector;
mod stylesheet;

pub use selector::{Selector, SelectorError};
pub use stylesheet::{
    format_declarations, merge_declaration, parse_declarations, Declaration, Rule, Stylesheet,
};
