// src/css/selector.rs
//
// The small selector subset that email templates actually use. Anything outside of
// it is rejected at parse time so the caller can skip the rule.

use super::stylesheet::split_top_level;
use crate::config::ParserConfig;
use crate::markup::{Document, Element, NodeId};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    Adjacent,
    /// `a ~ b`
    Sibling,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MatcherType {
    /// `[a]`
    Exists,
    /// `[a=v]`
    Equals,
    /// `[a~=v]`
    Includes,
    /// `[a|=v]`
    DashMatch,
    /// `[a^=v]`
    PrefixMatch,
    /// `[a$=v]`
    SuffixMatch,
    /// `[a*=v]`
    SubstringMatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AttributeSelector {
    pub name: String,
    pub matcher: MatcherType,
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PseudoClass {
    FirstChild,
    LastChild,
}

/// A sequence of simple selectors without combinators, e.g. `td.total#sum`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    /// `None` matches any element (`*` or no type given).
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttributeSelector>,
    pub pseudos: Vec<PseudoClass>,
}

/// `combinators[i]` joins `parts[i]` and `parts[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<Compound>,
    combinators: Vec<Combinator>,
    source: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported selector {:?}: {}", self.selector, self.reason)
    }
}

impl std::error::Error for SelectorError {}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/* ================================ Parsing ================================ */

#[inline]
fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80
}

struct SelectorParser<'a> {
    src: &'a str,
    s: &'a [u8],
    i: usize,
}

impl<'a> SelectorParser<'a> {
    fn err(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError {
            selector: self.src.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.s.get(self.i).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.i;
        while self.peek().map_or(false, |b| b.is_ascii_whitespace()) {
            self.i += 1;
        }
        self.i > start
    }

    /// Identifier with CSS backslash escapes, so `j\:if` names the `j:if` tag.
    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.peek() {
                Some(b'\\') => {
                    let rest = &self.src[self.i + 1..];
                    let Some(ch) = rest.chars().next() else {
                        return Err(self.err("dangling escape"));
                    };
                    out.push(ch);
                    self.i += 1 + ch.len_utf8();
                }
                Some(b) if is_ident_char(b) => {
                    let start = self.i;
                    while self.peek().map_or(false, is_ident_char) {
                        self.i += 1;
                    }
                    out.push_str(&self.src[start..self.i]);
                }
                _ => break,
            }
        }
        if out.is_empty() {
            return Err(self.err(format!("expected a name at offset {}", self.i)));
        }
        Ok(out)
    }

    fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        // after '['
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();
        let matcher = match self.peek() {
            Some(b']') => {
                self.i += 1;
                return Ok(AttributeSelector {
                    name,
                    matcher: MatcherType::Exists,
                    value: String::new(),
                });
            }
            Some(b'=') => {
                self.i += 1;
                MatcherType::Equals
            }
            Some(op) if self.s.get(self.i + 1) == Some(&b'=') => {
                let m = match op {
                    b'~' => MatcherType::Includes,
                    b'|' => MatcherType::DashMatch,
                    b'^' => MatcherType::PrefixMatch,
                    b'$' => MatcherType::SuffixMatch,
                    b'*' => MatcherType::SubstringMatch,
                    _ => return Err(self.err("unknown attribute matcher")),
                };
                self.i += 2;
                m
            }
            _ => return Err(self.err("malformed attribute selector")),
        };
        self.skip_ws();
        let value = match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                let start = self.i + 1;
                let end = memchr::memchr(q, &self.s[start..])
                    .map(|p| start + p)
                    .ok_or_else(|| self.err("unterminated string"))?;
                self.i = end + 1;
                self.src[start..end].to_string()
            }
            _ => self.ident()?,
        };
        self.skip_ws();
        if self.peek() != Some(b']') {
            return Err(self.err("expected ']'"));
        }
        self.i += 1;
        Ok(AttributeSelector {
            name,
            matcher,
            value,
        })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut c = Compound::default();
        if self.peek() == Some(b'*') {
            self.i += 1;
        } else if self
            .peek()
            .map_or(false, |b| is_ident_char(b) || b == b'\\')
        {
            c.tag = Some(self.ident()?);
        }
        loop {
            match self.peek() {
                Some(b'.') => {
                    self.i += 1;
                    c.classes.push(self.ident()?);
                }
                Some(b'#') => {
                    self.i += 1;
                    c.ids.push(self.ident()?);
                }
                Some(b'[') => {
                    self.i += 1;
                    c.attrs.push(self.attribute()?);
                }
                Some(b':') => {
                    self.i += 1;
                    if self.peek() == Some(b':') {
                        return Err(self.err("pseudo-elements cannot be inlined"));
                    }
                    let name = self.ident()?;
                    match name.to_ascii_lowercase().as_str() {
                        "first-child" => c.pseudos.push(PseudoClass::FirstChild),
                        "last-child" => c.pseudos.push(PseudoClass::LastChild),
                        other => return Err(self.err(format!("pseudo-class :{other}"))),
                    }
                }
                _ => break,
            }
        }
        Ok(c)
    }
}

impl Selector {
    /// Parse a single complex selector (no commas).
    pub fn parse(src: &str) -> Result<Selector, SelectorError> {
        let trimmed = src.trim();
        let mut p = SelectorParser {
            src: trimmed,
            s: trimmed.as_bytes(),
            i: 0,
        };
        let mut parts = Vec::new();
        let mut combinators = Vec::new();

        loop {
            let start = p.i;
            let c = p.compound()?;
            if p.i == start {
                return Err(p.err(format!("unexpected character at offset {}", p.i)));
            }
            parts.push(c);

            let had_ws = p.skip_ws();
            let comb = match p.peek() {
                None => break,
                Some(b'>') => Some(Combinator::Child),
                Some(b'+') => Some(Combinator::Adjacent),
                Some(b'~') => Some(Combinator::Sibling),
                Some(_) if had_ws => None,
                Some(_) => return Err(p.err(format!("unexpected character at offset {}", p.i))),
            };
            match comb {
                Some(comb) => {
                    p.i += 1;
                    p.skip_ws();
                    combinators.push(comb);
                }
                None => combinators.push(Combinator::Descendant),
            }
        }

        Ok(Selector {
            parts,
            combinators,
            source: trimmed.to_string(),
        })
    }

    /// Parse a comma separated selector group.
    pub fn parse_group(src: &str) -> Vec<Result<Selector, SelectorError>> {
        split_top_level(src, b',')
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(Selector::parse)
            .collect()
    }

    /* =============================== Matching ============================= */

    pub fn matches(&self, doc: &Document, id: NodeId, cfg: &ParserConfig) -> bool {
        match self.parts.len() {
            0 => false,
            n => self.match_from(doc, id, n - 1, cfg),
        }
    }

    // Right to left: part `idx` must match `id`, then the combinator to its left
    // decides which node(s) part `idx - 1` is tried against.
    fn match_from(&self, doc: &Document, id: NodeId, idx: usize, cfg: &ParserConfig) -> bool {
        if !compound_matches(&self.parts[idx], doc, id, cfg) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        let prev = idx - 1;
        match self.combinators[prev] {
            Combinator::Child => doc
                .parent_element(id)
                .map_or(false, |p| self.match_from(doc, p, prev, cfg)),
            Combinator::Descendant => {
                let mut cur = doc.parent_element(id);
                while let Some(p) = cur {
                    if self.match_from(doc, p, prev, cfg) {
                        return true;
                    }
                    cur = doc.parent_element(p);
                }
                false
            }
            Combinator::Adjacent => doc
                .prev_element_sibling(id)
                .map_or(false, |s| self.match_from(doc, s, prev, cfg)),
            Combinator::Sibling => {
                let mut cur = doc.prev_element_sibling(id);
                while let Some(s) = cur {
                    if self.match_from(doc, s, prev, cfg) {
                        return true;
                    }
                    cur = doc.prev_element_sibling(s);
                }
                false
            }
        }
    }
}

fn compound_matches(c: &Compound, doc: &Document, id: NodeId, cfg: &ParserConfig) -> bool {
    let Some(e) = doc.element(id) else {
        return false;
    };
    if let Some(tag) = &c.tag {
        if !cfg.names_eq(tag, &e.name) {
            return false;
        }
    }
    if !c.ids.iter().all(|want| e.attr("id") == Some(want.as_str())) {
        return false;
    }
    if !c.classes.iter().all(|want| e.has_class(want)) {
        return false;
    }
    if !c.attrs.iter().all(|a| attribute_matches(a, e, cfg)) {
        return false;
    }
    c.pseudos.iter().all(|p| match p {
        PseudoClass::FirstChild => doc.prev_element_sibling(id).is_none(),
        PseudoClass::LastChild => doc.next_element_sibling(id).is_none(),
    })
}

fn attribute_matches(sel: &AttributeSelector, e: &Element, cfg: &ParserConfig) -> bool {
    let Some(attr) = e.attrs.iter().find(|a| cfg.names_eq(&a.name, &sel.name)) else {
        return false;
    };
    let got = attr.value.as_deref().unwrap_or("");
    let want = sel.value.as_str();
    match sel.matcher {
        MatcherType::Exists => true,
        MatcherType::Equals => got == want,
        MatcherType::Includes => got.split_ascii_whitespace().any(|w| w == want),
        MatcherType::DashMatch => {
            got == want || (got.starts_with(want) && got[want.len()..].starts_with('-'))
        }
        MatcherType::PrefixMatch => !want.is_empty() && got.starts_with(want),
        MatcherType::SuffixMatch => !want.is_empty() && got.ends_with(want),
        MatcherType::SubstringMatch => !want.is_empty() && got.contains(want),
    }
}
