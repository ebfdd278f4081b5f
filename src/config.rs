// src/config.rs
//
// Run configuration. Every value here is fixed for the Jelly run; the CLI can only
// swap the file paths and set a base URL for linked stylesheets.

use crate::corrector::{Substitution, JELLY_SUBSTITUTIONS};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_INPUT: &str = "html.jelly";
pub const DEFAULT_OUTPUT: &str = "html_gmail.jelly";

/// Void tags of the Jelly dialect (never get a closing tag).
pub const JELLY_SELF_CLOSING: &[&str] = &["j:set", "j:getstatic", "br"];

/// Tags that may nest inside an open element of the same name.
pub const JELLY_NESTABLE: &[&str] = &["j:if", "j:foreach", "table"];

/// How markup is tokenized into a tree.
///
/// Immutable and passed by reference into every parse, so two parses with
/// different rules can never observe each other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    pub case_sensitive: bool,
    self_closing: Vec<String>,
    nestable: Vec<String>,
}

impl ParserConfig {
    pub fn new<S: AsRef<str>>(case_sensitive: bool, self_closing: &[S], nestable: &[S]) -> Self {
        let norm = |names: &[S]| -> Vec<String> {
            names
                .iter()
                .map(|n| {
                    let n = n.as_ref();
                    if case_sensitive {
                        n.to_string()
                    } else {
                        n.to_ascii_lowercase()
                    }
                })
                .collect()
        };
        ParserConfig {
            case_sensitive,
            self_closing: norm(self_closing),
            nestable: norm(nestable),
        }
    }

    pub fn jelly() -> Self {
        ParserConfig::new(false, JELLY_SELF_CLOSING, JELLY_NESTABLE)
    }

    pub fn is_self_closing(&self, name: &str) -> bool {
        self.contains(&self.self_closing, name)
    }

    pub fn is_nestable(&self, name: &str) -> bool {
        self.contains(&self.nestable, name)
    }

    /// Compare two tag or attribute names under this configuration.
    pub fn names_eq(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    fn contains(&self, set: &[String], name: &str) -> bool {
        set.iter().any(|s| self.names_eq(s, name))
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig::jelly()
    }
}

/// Options of the style inliner.
#[derive(Clone, Debug)]
pub struct InlinerOptions {
    pub parser: ParserConfig,
    /// Emit one node per line with indentation.
    pub prettify: bool,
    /// Relative `<link href>` values are joined onto this and fetched. Without
    /// it they name files next to the input.
    pub base_url: Option<Url>,
}

impl Default for InlinerOptions {
    fn default() -> Self {
        InlinerOptions {
            parser: ParserConfig::jelly(),
            prettify: true,
            base_url: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub inliner: InlinerOptions,
    pub substitutions: &'static [Substitution],
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            inliner: InlinerOptions::default(),
            substitutions: JELLY_SUBSTITUTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jelly_config_ignores_case() {
        let cfg = ParserConfig::jelly();
        assert!(cfg.is_self_closing("j:getStatic"));
        assert!(cfg.is_self_closing("BR"));
        assert!(cfg.is_nestable("j:forEach"));
        assert!(!cfg.is_nestable("div"));
    }

    #[test]
    fn case_sensitive_config_keeps_names() {
        let cfg = ParserConfig::new(true, &["Br"], &["Table"]);
        assert!(cfg.is_self_closing("Br"));
        assert!(!cfg.is_self_closing("br"));
        assert!(!cfg.is_nestable("table"));
    }

    #[test]
    fn default_paths_are_fixed() {
        let cfg = Config::default();
        assert_eq!(cfg.input, PathBuf::from("html.jelly"));
        assert_eq!(cfg.output, PathBuf::from("html_gmail.jelly"));
        assert!(cfg.inliner.prettify);
        assert!(!cfg.inliner.parser.case_sensitive);
    }
}
