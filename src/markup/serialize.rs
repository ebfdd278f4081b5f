// src/markup/serialize.rs
//
// Renders a tree back to markup.
// - Compact: nodes as parsed, void elements as `<name ... />`.
// - Prettify: one node per line, one space of indentation per depth level, text
//   trimmed, whitespace-only text dropped. `pre`/`textarea` subtrees are emitted
//   compact so their whitespace survives.
// - '<' in text is escaped; '&' is written as-is.

use super::tree::{Document, Element, NodeData, NodeId};

fn is_preformatted(name: &str) -> bool {
    name.eq_ignore_ascii_case("pre") || name.eq_ignore_ascii_case("textarea")
}

pub fn serialize(doc: &Document, prettify: bool) -> String {
    let mut out = String::new();
    for &child in doc.children(doc.root()) {
        if prettify {
            write_pretty(doc, child, 0, &mut out);
        } else {
            write_compact(doc, child, &mut out);
        }
    }
    out
}

fn write_compact(doc: &Document, id: NodeId, out: &mut String) {
    match &doc.node(id).data {
        NodeData::Document => {
            for &c in doc.children(id) {
                write_compact(doc, c, out);
            }
        }
        NodeData::Element(e) => {
            write_start_tag(e, out);
            if e.void {
                return;
            }
            for &c in doc.children(id) {
                write_compact(doc, c, out);
            }
            write_end_tag(e, out);
        }
        NodeData::Text(t) => escape_text(t, out),
        other => write_leaf(other, out),
    }
}

fn write_pretty(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    match &doc.node(id).data {
        NodeData::Document => {
            for &c in doc.children(id) {
                write_pretty(doc, c, depth, out);
            }
        }
        NodeData::Element(e) => {
            indent(depth, out);
            if e.void {
                write_start_tag(e, out);
            } else if is_preformatted(&e.name) {
                write_compact(doc, id, out);
            } else {
                write_start_tag(e, out);
                out.push('\n');
                for &c in doc.children(id) {
                    write_pretty(doc, c, depth + 1, out);
                }
                indent(depth, out);
                write_end_tag(e, out);
            }
            out.push('\n');
        }
        NodeData::Text(t) => {
            let t = t.trim();
            if t.is_empty() {
                return;
            }
            indent(depth, out);
            escape_text(t, out);
            out.push('\n');
        }
        NodeData::RawText(t) => {
            let t = t.trim_matches(|c| c == '\n' || c == '\r');
            if t.trim().is_empty() {
                return;
            }
            out.push_str(t);
            out.push('\n');
        }
        other => {
            indent(depth, out);
            write_leaf(other, out);
            out.push('\n');
        }
    }
}

fn write_leaf(data: &NodeData, out: &mut String) {
    match data {
        NodeData::RawText(t) => out.push_str(t),
        NodeData::Comment(t) => {
            out.push_str("<!--");
            out.push_str(t);
            out.push_str("-->");
        }
        NodeData::CData(t) => {
            out.push_str("<![CDATA[");
            out.push_str(t);
            out.push_str("]]>");
        }
        NodeData::Declaration(t) => {
            out.push_str("<!");
            out.push_str(t);
            out.push('>');
        }
        NodeData::ProcessingInstruction(t) => {
            out.push_str("<?");
            out.push_str(t);
            out.push_str("?>");
        }
        NodeData::Document | NodeData::Element(_) | NodeData::Text(_) => {}
    }
}

fn indent(depth: usize, out: &mut String) {
    out.extend(std::iter::repeat(' ').take(depth));
}

fn write_start_tag(e: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&e.name);
    for a in &e.attrs {
        out.push(' ');
        out.push_str(&a.name);
        if let Some(v) = &a.value {
            write_attr_value(v, out);
        }
    }
    if e.void {
        out.push_str(" />");
    } else {
        out.push('>');
    }
}

fn write_end_tag(e: &Element, out: &mut String) {
    out.push_str("</");
    out.push_str(&e.name);
    out.push('>');
}

fn write_attr_value(v: &str, out: &mut String) {
    out.push('=');
    if v.contains('"') {
        if v.contains('\'') {
            out.push('"');
            out.push_str(&v.replace('"', "&quot;"));
            out.push('"');
        } else {
            out.push('\'');
            out.push_str(v);
            out.push('\'');
        }
    } else {
        out.push('"');
        out.push_str(v);
        out.push('"');
    }
}

fn escape_text(t: &str, out: &mut String) {
    let mut last = 0usize;
    for pos in memchr::memchr_iter(b'<', t.as_bytes()) {
        out.push_str(&t[last..pos]);
        out.push_str("&lt;");
        last = pos + 1;
    }
    out.push_str(&t[last..]);
}
