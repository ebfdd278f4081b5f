// src/markup/scan.rs
//
// Low-level scanning over the raw markup bytes.
// - Tag ends are found quote-aware, so `test="${a > b}"` stays inside its tag.
// - Attribute values may be double-quoted, single-quoted, unquoted or absent.
// - All delimiters are ASCII, so every index returned here is a UTF-8 char boundary.

use super::tree::Attribute;
use memchr::{memchr, memmem};
use std::borrow::Cow;

/* ============================ Utility predicates ========================= */

#[inline]
pub(crate) fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' || b == b'.'
}

#[inline]
pub(crate) fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' || b == b'\x0c'
}

#[inline]
fn is_attr_name_char(b: u8) -> bool {
    !is_ws(b) && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

/* =============================== Tag parsing ============================= */

#[derive(Clone, Copy, Debug)]
pub(crate) struct TagInfo<'a> {
    pub name: &'a str,
    pub is_end: bool,
    pub self_closing: bool,
}

/// Find the '>' for a tag starting at `i` (s[i] == '<'), being quote-aware.
pub(crate) fn find_tag_end(s: &[u8], mut i: usize) -> Option<usize> {
    let n = s.len();
    i += 1;
    let mut quote: u8 = 0;
    while i < n {
        let b = s[i];
        if quote != 0 {
            if b == quote {
                quote = 0;
            }
        } else if b == b'"' || b == b'\'' {
            quote = b;
        } else if b == b'>' {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Extract tag name, end/self-closing flags from raw `<...>` text.
pub(crate) fn parse_tag_info(tag: &str) -> TagInfo<'_> {
    let t = tag.as_bytes();
    let n = t.len();
    let mut i = 1;

    let mut is_end = false;
    if i < n && t[i] == b'/' {
        is_end = true;
        i += 1;
    }
    while i < n && is_ws(t[i]) {
        i += 1;
    }
    let start = i;
    while i < n && is_name_char(t[i]) {
        i += 1;
    }
    let name = &tag[start..i];

    // self-closing? check before '>'
    let mut j = n.saturating_sub(1);
    while j > 0 && is_ws(t[j - 1]) {
        j -= 1;
    }
    let self_closing = !is_end && j >= 2 && t[j - 1] == b'/';

    TagInfo {
        name,
        is_end,
        self_closing,
    }
}

/// Does `s[i..]` open a start or end tag (as opposed to a literal '<')?
pub(crate) fn at_tag_open(s: &[u8], i: usize) -> bool {
    match s.get(i + 1) {
        Some(b'/') => s.get(i + 2).map_or(false, |b| b.is_ascii_alphabetic()),
        Some(b) => b.is_ascii_alphabetic(),
        None => false,
    }
}

/* ============================ Attribute scanning ========================= */

/// Parse the attributes of a raw start tag `<name ...>`.
pub(crate) fn parse_attributes(tag: &str) -> Vec<Attribute> {
    let t = tag.as_bytes();
    let len = t.len();
    let mut attrs = Vec::new();
    if len < 2 {
        return attrs;
    }

    // skip '<' and the tag name
    let mut i = 1usize;
    while i < len && is_name_char(t[i]) {
        i += 1;
    }

    while i < len && t[i] != b'>' {
        // skip whitespace and slashes
        while i < len && (is_ws(t[i]) || t[i] == b'/') {
            i += 1;
        }
        if i >= len || t[i] == b'>' {
            break;
        }

        if !is_attr_name_char(t[i]) {
            // Not a valid name start; advance to avoid infinite loops.
            i += 1;
            continue;
        }
        let name_start = i;
        i += 1;
        while i < len && is_attr_name_char(t[i]) {
            i += 1;
        }
        let name = &tag[name_start..i];

        while i < len && is_ws(t[i]) {
            i += 1;
        }

        let mut value = None;
        if i < len && t[i] == b'=' {
            i += 1;
            while i < len && is_ws(t[i]) {
                i += 1;
            }
            if i >= len || t[i] == b'>' {
                value = Some(String::new());
            } else if t[i] == b'"' || t[i] == b'\'' {
                let q = t[i];
                i += 1;
                let v_start = i;
                while i < len && t[i] != q {
                    i += 1;
                }
                value = Some(tag[v_start..i].to_string());
                if i < len {
                    i += 1;
                }
            } else {
                let v_start = i;
                while i < len && !is_ws(t[i]) && t[i] != b'>' {
                    i += 1;
                }
                value = Some(tag[v_start..i].to_string());
            }
        }

        attrs.push(Attribute {
            name: name.to_string(),
            value,
        });
    }
    attrs
}

/* ========================= Delimited constructs ========================== */

/// Index of the first byte of `needle` at or after `from`.
pub(crate) fn find(s: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > s.len() {
        return None;
    }
    memmem::find(&s[from..], needle).map(|p| from + p)
}

/// Find the matching `</name ...>` for a raw-text element whose content starts
/// at `i`. Returns (content_end, index_after_end_tag).
pub(crate) fn find_raw_text_end(s: &[u8], i: usize, name: &str) -> Option<(usize, usize)> {
    let mut j = i;
    while let Some(pos) = find(s, j, b"</") {
        let name_start = pos + 2;
        let name_end = name_start + name.len();
        let same_name = s
            .get(name_start..name_end)
            .map_or(false, |n| n.eq_ignore_ascii_case(name.as_bytes()));
        let terminated = s.get(name_end).map_or(false, |&b| !is_name_char(b));
        if same_name && terminated {
            let close = name_end + memchr(b'>', &s[name_end..])?;
            return Some((pos, close + 1));
        }
        j = pos + 2;
    }
    None
}

/* ================================ Entities =============================== */

const XML_ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
];

/// Decode the five predefined XML entities; any other `&...;` is kept literally.
pub(crate) fn decode_xml_entities(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..first]);
    let mut i = first;
    while i < bytes.len() {
        if bytes[i] == b'&' {
            let rest = &text[i..];
            let decoded = XML_ENTITIES.iter().find(|(ent, _)| rest.starts_with(*ent));
            if let Some((ent, ch)) = decoded {
                out.push(*ch);
                i += ent.len();
                continue;
            }
        }
        let next = memchr(b'&', &bytes[i + 1..]).map_or(bytes.len(), |p| i + 1 + p);
        out.push_str(&text[i..next]);
        i = next;
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_end_ignores_quoted_gt() {
        let s = br#"<j:if test="${a > b}">x"#;
        assert_eq!(find_tag_end(s, 0), Some(21));
    }

    #[test]
    fn tag_info_flags() {
        let ti = parse_tag_info("<j:set var=\"x\" value=\"y\"/>");
        assert_eq!(ti.name, "j:set");
        assert!(!ti.is_end);
        assert!(ti.self_closing);

        let ti = parse_tag_info("</j:forEach >");
        assert_eq!(ti.name, "j:forEach");
        assert!(ti.is_end);
        assert!(!ti.self_closing);
    }

    #[test]
    fn attributes_in_all_forms() {
        let attrs = parse_attributes("<td class='a b' colspan=2 nowrap style=\"x:y\">");
        let got: Vec<(&str, Option<&str>)> = attrs
            .iter()
            .map(|a| (a.name.as_str(), a.value.as_deref()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("class", Some("a b")),
                ("colspan", Some("2")),
                ("nowrap", None),
                ("style", Some("x:y")),
            ]
        );
    }

    #[test]
    fn namespaced_attribute_names() {
        let attrs = parse_attributes("<j:jelly xmlns:j=\"jelly:core\" escape-by-default='true'>");
        assert_eq!(attrs[0].name, "xmlns:j");
        assert_eq!(attrs[1].name, "escape-by-default");
        assert_eq!(attrs[1].value.as_deref(), Some("true"));
    }

    #[test]
    fn raw_text_end_is_case_insensitive() {
        let s = b"a { } </b> </STYLE >tail";
        let (content_end, after) = find_raw_text_end(s, 0, "style").unwrap();
        assert_eq!(&s[..content_end], b"a { } </b> ");
        assert_eq!(&s[after..], b"tail");
    }

    #[test]
    fn decodes_only_xml_entities() {
        assert_eq!(decode_xml_entities("&amp;nbsp;&lt;b&gt;"), "&nbsp;<b>");
        assert_eq!(decode_xml_entities("&nbsp;&copy;"), "&nbsp;&copy;");
        assert_eq!(decode_xml_entities("a & b"), "a & b");
        assert!(matches!(decode_xml_entities("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn literal_lt_is_not_a_tag() {
        assert!(!at_tag_open(b"a < b", 2));
        assert!(at_tag_open(b"<div>", 0));
        assert!(at_tag_open(b"</div>", 0));
        assert!(!at_tag_open(b"</ div>", 0));
    }
}
