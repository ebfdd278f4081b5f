// src/corrector.rs
//
// Repairs the damage of a case-insensitive parse/serialize round-trip:
// - restores camel-cased Jelly tag and attribute names,
// - re-escapes the `&nbsp;` that the parser decoded from `&amp;nbsp;`.
// Patterns are literal substrings, never regular expressions.

use memchr::memmem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Substitution {
    pub pattern: &'static str,
    pub replacement: &'static str,
}

const fn sub(pattern: &'static str, replacement: &'static str) -> Substitution {
    Substitution {
        pattern,
        replacement,
    }
}

/// Applied in this order.
pub const JELLY_SUBSTITUTIONS: &[Substitution] = &[
    sub("j:foreach", "j:forEach"),
    sub("j:getstatic", "j:getStatic"),
    sub("varstatus", "varStatus"),
    sub("classname", "className"),
    sub("&nbsp;", "&amp;nbsp;"),
];

/// Apply every substitution, in order, across the whole text.
pub fn correct(text: &str, subs: &[Substitution]) -> String {
    let mut cur = text.to_string();
    for s in subs {
        let count = replace_all(&mut cur, s);
        if count > 0 {
            log::debug!("replaced {count} x {:?} -> {:?}", s.pattern, s.replacement);
        }
    }
    cur
}

/// Replace every non-overlapping occurrence of `s.pattern`; returns the count.
fn replace_all(text: &mut String, s: &Substitution) -> usize {
    if s.pattern.is_empty() {
        return 0;
    }
    let hay = text.as_bytes();
    let finder = memmem::Finder::new(s.pattern);
    let mut out = String::with_capacity(text.len());
    let mut last = 0usize;
    let mut count = 0usize;
    for pos in finder.find_iter(hay) {
        // Pattern and text are both valid UTF-8, so a match starts and ends on a char boundary.
        out.push_str(&text[last..pos]);
        out.push_str(s.replacement);
        last = pos + s.pattern.len();
        count += 1;
    }
    if count == 0 {
        return 0;
    }
    out.push_str(&text[last..]);
    *text = out;
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("<j:foreach items=\"x\">", "<j:forEach items=\"x\">")]
    #[test_case("<j:getstatic var=\"a\" />", "<j:getStatic var=\"a\" />")]
    #[test_case("varstatus=\"loop\"", "varStatus=\"loop\"")]
    #[test_case("classname=\"hudson.Util\"", "className=\"hudson.Util\"")]
    #[test_case("a&nbsp;b", "a&amp;nbsp;b")]
    fn restores_each_pattern(input: &str, expected: &str) {
        assert_eq!(correct(input, JELLY_SUBSTITUTIONS), expected);
    }

    #[test]
    fn applying_twice_is_a_no_op() {
        let input = "<j:foreach varstatus=\"s\"><j:getstatic classname=\"C\" />&nbsp;&nbsp;</j:foreach>";
        let once = correct(input, JELLY_SUBSTITUTIONS);
        let twice = correct(&once, JELLY_SUBSTITUTIONS);
        assert_eq!(once, twice);
        assert_eq!(
            once,
            "<j:forEach varStatus=\"s\"><j:getStatic className=\"C\" />&amp;nbsp;&amp;nbsp;</j:forEach>"
        );
    }

    #[test]
    fn absent_patterns_leave_text_alone() {
        let input = "<div>plain</div>";
        assert_eq!(correct(input, JELLY_SUBSTITUTIONS), input);
    }

    #[test]
    fn patterns_are_literal() {
        let subs = [sub("a.c", "X")];
        assert_eq!(correct("abc a.c", &subs), "abc X");
    }

    #[test]
    fn order_is_respected() {
        let subs = [sub("ab", "b"), sub("bb", "c")];
        assert_eq!(correct("abb", &subs), "c");
    }
}
