// src/markup/parser.rs
//
// Tolerant tree builder for Jelly-flavored markup.
// - Names are lower-cased unless the config is case-sensitive.
// - Void elements: `<x/>` syntax, HTML void elements, or a name listed as self-closing.
// - A start tag that is not nestable first closes an open element of the same name,
//   so the repeated tag becomes a sibling instead of a child.
// - An end tag closes the nearest open element of that name (and everything opened
//   after it); end tags without an open element are dropped.
// - RAW-TEXT elements (style, script) keep their content verbatim.
// - Text gets the XML entities decoded; other entity-like text is left alone.

use super::scan::{
    at_tag_open, decode_xml_entities, find, find_raw_text_end, find_tag_end, parse_attributes,
    parse_tag_info,
};
use super::tree::{Document, Element, NodeData, NodeId};
use crate::config::ParserConfig;
use crate::error::{Error, Result};
use memchr::memchr;

fn matches_ignore_ascii_case(name: &str, set: &[&str]) -> bool {
    set.iter().any(|s| name.eq_ignore_ascii_case(s))
}

fn is_raw_text(name: &str) -> bool {
    matches_ignore_ascii_case(name, &["style", "script"])
}

/// HTML void elements, void regardless of the configured self-closing tags.
fn is_void(name: &str) -> bool {
    matches_ignore_ascii_case(
        name,
        &[
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
            "source", "track", "wbr",
        ],
    )
}

/// Parse `src` into an element tree.
pub fn parse(src: &str, cfg: &ParserConfig) -> Result<Document> {
    let mut builder = TreeBuilder::new(src, cfg);
    builder.run()?;
    Ok(builder.doc)
}

struct TreeBuilder<'a> {
    src: &'a str,
    cfg: &'a ParserConfig,
    doc: Document,
    open: Vec<NodeId>,
}

impl<'a> TreeBuilder<'a> {
    fn new(src: &'a str, cfg: &'a ParserConfig) -> Self {
        TreeBuilder {
            src,
            cfg,
            doc: Document::new(),
            open: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn name(&self, raw: &str) -> String {
        if self.cfg.case_sensitive {
            raw.to_string()
        } else {
            raw.to_ascii_lowercase()
        }
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = self.doc.create(data);
        let parent = self.current();
        self.doc.append(parent, id);
        id
    }

    fn run(&mut self) -> Result<()> {
        let src = self.src;
        let s = src.as_bytes();
        let n = s.len();
        let mut i = 0usize;

        while i < n {
            if s[i] != b'<' {
                let next_lt = memchr(b'<', &s[i..]).map(|off| i + off).unwrap_or(n);
                self.text(&src[i..next_lt]);
                i = next_lt;
                continue;
            }

            // Comments
            if s[i..].starts_with(b"<!--") {
                let end = find(s, i + 4, b"-->")
                    .ok_or_else(|| Error::parse_at(s, i, "unterminated comment"))?;
                self.push_node(NodeData::Comment(src[i + 4..end].to_string()));
                i = end + 3;
                continue;
            }

            if s[i..].starts_with(b"<![CDATA[") {
                let end = find(s, i + 9, b"]]>")
                    .ok_or_else(|| Error::parse_at(s, i, "unterminated CDATA section"))?;
                self.push_node(NodeData::CData(src[i + 9..end].to_string()));
                i = end + 3;
                continue;
            }

            if s[i..].starts_with(b"<!") {
                let end = find_tag_end(s, i)
                    .ok_or_else(|| Error::parse_at(s, i, "unterminated declaration"))?;
                self.push_node(NodeData::Declaration(src[i + 2..end].to_string()));
                i = end + 1;
                continue;
            }

            if s[i..].starts_with(b"<?") {
                let end = find(s, i + 2, b"?>")
                    .ok_or_else(|| Error::parse_at(s, i, "unterminated processing instruction"))?;
                self.push_node(NodeData::ProcessingInstruction(src[i + 2..end].to_string()));
                i = end + 2;
                continue;
            }

            if !at_tag_open(s, i) {
                // literal '<'
                self.text("<");
                i += 1;
                continue;
            }

            let Some(j) = find_tag_end(s, i) else {
                return Err(Error::parse_at(s, i, "unterminated tag"));
            };
            let tag = &src[i..=j];
            let ti = parse_tag_info(tag);
            i = j + 1;

            if ti.is_end {
                self.close(ti.name);
                continue;
            }

            let id = self.open_element(tag, ti.name, ti.self_closing);
            if is_raw_text(ti.name) && self.doc.element(id).map_or(false, |e| !e.void) {
                let (content_end, after) = find_raw_text_end(s, i, ti.name).ok_or_else(|| {
                    Error::parse_at(s, i, format!("unclosed <{}> element", ti.name))
                })?;
                if content_end > i {
                    let raw = self.doc.create(NodeData::RawText(src[i..content_end].to_string()));
                    self.doc.append(id, raw);
                }
                self.close(ti.name);
                i = after;
            }
        }

        if !self.open.is_empty() {
            log::debug!("closing {} element(s) left open at end of input", self.open.len());
        }
        Ok(())
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_xml_entities(raw);
        let parent = self.current();
        self.doc.append_text(parent, &decoded);
    }

    fn open_element(&mut self, tag: &str, raw_name: &str, self_closing: bool) -> NodeId {
        let name = self.name(raw_name);

        if !self.cfg.is_nestable(&name) {
            if let Some(pos) = self.find_open_in_scope(&name) {
                self.open.truncate(pos);
            }
        }

        let mut attrs = parse_attributes(tag);
        if !self.cfg.case_sensitive {
            for a in &mut attrs {
                a.name.make_ascii_lowercase();
            }
        }

        let void = self_closing || is_void(&name) || self.cfg.is_self_closing(&name);
        let id = self.push_node(NodeData::Element(Element { name, attrs, void }));
        if !void {
            self.open.push(id);
        }
        id
    }

    fn close(&mut self, raw_name: &str) {
        let name = self.name(raw_name);
        match self.find_open(&name) {
            Some(pos) => self.open.truncate(pos),
            None => log::debug!("ignoring stray end tag </{name}>"),
        }
    }

    /// Like `find_open`, but an open nestable element bounds the search: a `<tr>`
    /// inside a nested `<table>` must not close the outer table's row.
    fn find_open_in_scope(&self, name: &str) -> Option<usize> {
        for (pos, &id) in self.open.iter().enumerate().rev() {
            let Some(e) = self.doc.element(id) else {
                continue;
            };
            if self.cfg.names_eq(&e.name, name) {
                return Some(pos);
            }
            if self.cfg.is_nestable(&e.name) {
                return None;
            }
        }
        None
    }

    fn find_open(&self, name: &str) -> Option<usize> {
        self.open.iter().rposition(|&id| {
            self.doc
                .element(id)
                .map_or(false, |e| self.cfg.names_eq(&e.name, name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn names(doc: &Document, id: NodeId) -> Vec<String> {
        doc.children(id)
            .iter()
            .filter_map(|&c| doc.element(c).map(|e| e.name.clone()))
            .collect()
    }

    fn first_element(doc: &Document, id: NodeId) -> NodeId {
        doc.children(id)
            .iter()
            .copied()
            .find(|&c| doc.element(c).is_some())
            .unwrap()
    }

    #[test]
    fn lowercases_names_when_case_insensitive() {
        let doc = parse("<j:forEach varStatus=\"s\"></j:forEach>", &ParserConfig::jelly()).unwrap();
        let e = doc.element(first_element(&doc, doc.root())).unwrap();
        assert_eq!(e.name, "j:foreach");
        assert_eq!(e.attrs[0].name, "varstatus");
        assert_eq!(e.attr("varstatus"), Some("s"));
    }

    #[test]
    fn case_sensitive_keeps_names() {
        let cfg = ParserConfig::new(true, &["br"], &["table"]);
        let doc = parse("<j:forEach varStatus=\"s\"/>", &cfg).unwrap();
        let e = doc.element(first_element(&doc, doc.root())).unwrap();
        assert_eq!(e.name, "j:forEach");
        assert_eq!(e.attrs[0].name, "varStatus");
    }

    #[test]
    fn configured_self_closing_tags_take_no_children() {
        let doc = parse("<j:set var=\"x\" value=\"y\"><b>t</b>", &ParserConfig::jelly()).unwrap();
        assert_eq!(names(&doc, doc.root()), vec!["j:set", "b"]);
    }

    #[test]
    fn html_void_elements_need_no_slash() {
        let doc = parse("<td><img src=\"a.png\"><hr>t</td>", &ParserConfig::jelly()).unwrap();
        let td = first_element(&doc, doc.root());
        assert_eq!(names(&doc, td), vec!["img", "hr"]);
        assert_eq!(doc.text_content(td), "t");
    }

    #[test]
    fn stray_end_tag_is_dropped() {
        let doc = parse("<j:set var=\"x\"/></j:set><p>t</p>", &ParserConfig::jelly()).unwrap();
        assert_eq!(names(&doc, doc.root()), vec!["j:set", "p"]);
    }

    #[test]
    fn nestable_tags_nest() {
        let doc = parse("<table><tr><td><table></table></td></tr></table>", &ParserConfig::jelly())
            .unwrap();
        let outer = first_element(&doc, doc.root());
        let tr = first_element(&doc, outer);
        let td = first_element(&doc, tr);
        assert_eq!(names(&doc, td), vec!["table"]);
        assert_eq!(names(&doc, doc.root()), vec!["table"]);
    }

    #[test_case(r#"<j:if test="a"><j:if test="b">x</j:if></j:if>"#, "j:if" ; "if in if")]
    #[test_case(
        r#"<j:forEach items="a"><j:forEach items="b">x</j:forEach></j:forEach>"#,
        "j:foreach" ; "forEach in forEach"
    )]
    #[test_case(
        r#"<J:IF test="a"><j:if test="b">x</J:IF></j:if>"#,
        "j:if" ; "mixed case"
    )]
    fn jelly_control_tags_nest_in_themselves(src: &str, name: &str) {
        let doc = parse(src, &ParserConfig::jelly()).unwrap();
        assert_eq!(names(&doc, doc.root()), vec![name]);
        let outer = first_element(&doc, doc.root());
        assert_eq!(names(&doc, outer), vec![name]);
        let inner = first_element(&doc, outer);
        assert!(names(&doc, inner).is_empty());
        assert_eq!(doc.text_content(inner), "x");
    }

    #[test]
    fn rows_of_a_nested_table_stay_inside_it() {
        let src = "<table><tr><td><table><tr><td>in</td></tr></table></td></tr></table>";
        let doc = parse(src, &ParserConfig::jelly()).unwrap();
        let outer = first_element(&doc, doc.root());
        assert_eq!(names(&doc, outer), vec!["tr"]);
        let td = first_element(&doc, first_element(&doc, outer));
        let inner = first_element(&doc, td);
        assert_eq!(names(&doc, inner), vec!["tr"]);
    }

    #[test]
    fn repeated_non_nestable_tag_becomes_sibling() {
        let doc = parse("<p>a<p>b", &ParserConfig::jelly()).unwrap();
        assert_eq!(names(&doc, doc.root()), vec!["p", "p"]);
    }

    #[test]
    fn end_tag_closes_intermediate_elements() {
        let doc = parse("<div><span>a</div><i>b</i>", &ParserConfig::jelly()).unwrap();
        assert_eq!(names(&doc, doc.root()), vec!["div", "i"]);
    }

    #[test]
    fn style_content_is_raw() {
        let doc = parse("<style>td > b { color: red }</style>", &ParserConfig::jelly()).unwrap();
        let style = first_element(&doc, doc.root());
        assert_eq!(doc.text_content(style), "td > b { color: red }");
        assert!(matches!(
            doc.node(doc.children(style)[0]).data,
            NodeData::RawText(_)
        ));
    }

    #[test]
    fn preserves_prolog_comments_and_cdata() {
        let src = "<?jelly escape-by-default='true'?><!DOCTYPE html><!-- c --><![CDATA[x<y]]>";
        let doc = parse(src, &ParserConfig::jelly()).unwrap();
        let kinds: Vec<NodeData> = doc
            .children(doc.root())
            .iter()
            .map(|&c| doc.node(c).data.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeData::ProcessingInstruction("jelly escape-by-default='true'".into()),
                NodeData::Declaration("DOCTYPE html".into()),
                NodeData::Comment(" c ".into()),
                NodeData::CData("x<y".into()),
            ]
        );
    }

    #[test]
    fn decodes_amp_in_text() {
        let doc = parse("<td>&amp;nbsp;&amp;nbsp;</td>", &ParserConfig::jelly()).unwrap();
        let td = first_element(&doc, doc.root());
        assert_eq!(doc.text_content(td), "&nbsp;&nbsp;");
    }

    #[test]
    fn literal_lt_stays_text() {
        let doc = parse("<p>1 < 2</p>", &ParserConfig::jelly()).unwrap();
        let p = first_element(&doc, doc.root());
        assert_eq!(doc.text_content(p), "1 < 2");
    }

    #[test]
    fn unterminated_tag_is_a_parse_error() {
        let err = parse("<div>\n<td class=\"x\"", &ParserConfig::jelly()).unwrap_err();
        match err {
            Error::Parse { line, column, .. } => assert_eq!((line, column), (2, 1)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unterminated_comment_is_a_parse_error() {
        assert!(matches!(
            parse("<!-- open", &ParserConfig::jelly()),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn unclosed_style_is_a_parse_error() {
        assert!(matches!(
            parse("<style>a{}", &ParserConfig::jelly()),
            Err(Error::Parse { .. })
        ));
    }
}
