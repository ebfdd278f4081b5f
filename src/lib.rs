//! Inline CSS into Jelly email templates.
//!
//! The run is a straight line: the template is parsed case-insensitively, every
//! stylesheet rule is copied into the `style` attribute of the elements it matches,
//! the tree is written back out, and a fixed list of literal substitutions puts back
//! the camel-cased Jelly names (and the double-escaped `&amp;nbsp;`) that the
//! round-trip flattened.
//!
//! ```no_run
//! use jelly_inliner::{run, Config};
//!
//! run(&Config::default())?; // html.jelly -> html_gmail.jelly
//! # Ok::<(), jelly_inliner::Error>(())
//! ```

pub mod config;
pub mod corrector;
pub mod css;
pub mod error;
pub mod inliner;
pub mod markup;
pub mod pipeline;

pub use config::{Config, InlinerOptions, ParserConfig};
pub use corrector::{correct, Substitution, JELLY_SUBSTITUTIONS};
pub use error::{Error, Result};
pub use inliner::StyleInliner;
pub use pipeline::{load, process, run, write};
