// src/css/stylesheet.rs
//
// Minimal stylesheet reader:
// - comments are stripped first,
// - plain rules become (selectors, declarations) in source order,
// - at-rules (`@media`, `@font-face`, `@import`, ...) are kept as text, since they
//   cannot be expressed as a `style` attribute.

use super::selector::Selector;
use memchr::memmem;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Declaration {
            property: property.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
}

#[derive(Clone, Debug, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
    pub at_rules: Vec<String>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Stylesheet {
        let css = strip_comments(css);
        let s = css.as_bytes();
        let n = s.len();
        let mut sheet = Stylesheet::default();
        let mut i = 0usize;

        while i < n {
            while i < n && s[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= n {
                break;
            }

            if s[i] == b'@' {
                let end = at_rule_end(s, i);
                let text = css[i..end].trim();
                if !text.is_empty() {
                    sheet.at_rules.push(text.to_string());
                }
                i = end;
                continue;
            }

            let Some(open) = find_outside_strings(s, i, b'{') else {
                log::warn!("ignoring trailing css text {:?}", css[i..].trim());
                break;
            };
            let close = matching_brace(s, open).unwrap_or(n);
            let prelude = &css[i..open];
            let body = &css[open + 1..close.min(n)];
            i = (close + 1).min(n);

            let mut selectors = Vec::new();
            for parsed in Selector::parse_group(prelude) {
                match parsed {
                    Ok(sel) => selectors.push(sel),
                    Err(e) => log::warn!("{e}; skipping it"),
                }
            }
            if selectors.is_empty() {
                continue;
            }
            sheet.rules.push(Rule {
                selectors,
                declarations: parse_declarations(body),
            });
        }
        sheet
    }

    pub fn extend(&mut self, other: Stylesheet) {
        self.rules.extend(other.rules);
        self.at_rules.extend(other.at_rules);
    }
}

/// Split a declaration block (`a: b; c: d`) into declarations. Semicolons inside
/// strings or parentheses (`url(data:...;base64,...)`) do not split.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut out = Vec::new();
    for part in split_top_level(block, b';') {
        let Some(colon) = part.find(':') else {
            if !part.trim().is_empty() {
                log::debug!("ignoring declaration without a value: {:?}", part.trim());
            }
            continue;
        };
        let property = part[..colon].trim();
        let value = part[colon + 1..].trim();
        if property.is_empty() || value.is_empty() {
            continue;
        }
        out.push(Declaration::new(property.to_ascii_lowercase(), value));
    }
    out
}

/// Add `decl` to `list`: an existing declaration of the same property gets the new
/// value where it stands, otherwise it is appended.
pub fn merge_declaration(list: &mut Vec<Declaration>, decl: Declaration) {
    match list.iter_mut().find(|d| d.property == decl.property) {
        Some(existing) => existing.value = decl.value,
        None => list.push(decl),
    }
}

pub fn format_declarations(list: &[Declaration]) -> String {
    list.iter()
        .map(|d| format!("{}: {}", d.property, d.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/* ================================ Scanning =============================== */

fn strip_comments(css: &str) -> String {
    let s = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut last = 0usize;
    let mut i = 0usize;
    while let Some(p) = memmem::find(&s[i..], b"/*") {
        let start = i + p;
        out.push_str(&css[last..start]);
        match memmem::find(&s[start + 2..], b"*/") {
            Some(q) => {
                i = start + 2 + q + 2;
                last = i;
            }
            None => {
                // unterminated comment swallows the rest
                return out;
            }
        }
    }
    out.push_str(&css[last..]);
    out
}

fn skip_string(s: &[u8], i: usize) -> usize {
    let q = s[i];
    let mut j = i + 1;
    while j < s.len() {
        if s[j] == b'\\' {
            j += 2;
            continue;
        }
        if s[j] == q {
            return j + 1;
        }
        j += 1;
    }
    s.len()
}

fn find_outside_strings(s: &[u8], mut i: usize, needle: u8) -> Option<usize> {
    while i < s.len() {
        match s[i] {
            b'"' | b'\'' => i = skip_string(s, i),
            b if b == needle => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Index of the '}' closing the '{' at `open`.
fn matching_brace(s: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < s.len() {
        match s[i] {
            b'"' | b'\'' => {
                i = skip_string(s, i);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// End (exclusive) of the at-rule starting at `i`: after its `;` or its block.
fn at_rule_end(s: &[u8], i: usize) -> usize {
    let mut j = i;
    while j < s.len() {
        match s[j] {
            b'"' | b'\'' => {
                j = skip_string(s, j);
                continue;
            }
            b';' => return j + 1,
            b'{' => return matching_brace(s, j).map_or(s.len(), |c| c + 1),
            _ => {}
        }
        j += 1;
    }
    s.len()
}

/// Split at `sep` outside strings, parentheses and brackets.
pub(super) fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let s = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < s.len() {
        match s[i] {
            b'"' | b'\'' => {
                i = skip_string(s, i);
                continue;
            }
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b if b == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&text[start.min(text.len())..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rules_in_order() {
        let sheet = Stylesheet::parse(
            "/* header */\n.a { color: red; }\ntd, th {\n  padding: 2px;\n  border: 0 }\n",
        );
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].selectors[0].to_string(), ".a");
        assert_eq!(
            sheet.rules[0].declarations,
            vec![Declaration::new("color", "red")]
        );
        assert_eq!(sheet.rules[1].selectors.len(), 2);
        assert_eq!(
            sheet.rules[1].declarations,
            vec![
                Declaration::new("padding", "2px"),
                Declaration::new("border", "0")
            ]
        );
    }

    #[test]
    fn keeps_at_rules_aside() {
        let sheet = Stylesheet::parse(
            "@import url(\"x.css\");\n@media (max-width: 600px) { td { display: block } }\nb{font-weight:bold}",
        );
        assert_eq!(
            sheet.at_rules,
            vec![
                "@import url(\"x.css\");".to_string(),
                "@media (max-width: 600px) { td { display: block } }".to_string()
            ]
        );
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn unsupported_selectors_are_dropped_from_the_group() {
        let sheet = Stylesheet::parse("a:hover, a.x { color: blue } p::after { content: 'x' }");
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].selectors.len(), 1);
        assert_eq!(sheet.rules[0].selectors[0].to_string(), "a.x");
    }

    #[test]
    fn declarations_respect_parens_and_strings() {
        let decls =
            parse_declarations("background: url(data:image/png;base64,AA==); font-family: 'a;b'; ;x");
        assert_eq!(
            decls,
            vec![
                Declaration::new("background", "url(data:image/png;base64,AA==)"),
                Declaration::new("font-family", "'a;b'"),
            ]
        );
    }

    #[test]
    fn merge_overrides_in_place() {
        let mut list = vec![Declaration::new("color", "red"), Declaration::new("margin", "0")];
        merge_declaration(&mut list, Declaration::new("color", "blue"));
        merge_declaration(&mut list, Declaration::new("padding", "1px"));
        assert_eq!(format_declarations(&list), "color: blue; margin: 0; padding: 1px");
    }

    #[test]
    fn property_names_are_lowercased() {
        let decls = parse_declarations("COLOR: Red");
        assert_eq!(decls, vec![Declaration::new("color", "Red")]);
    }
}
