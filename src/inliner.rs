// src/inliner.rs
//
// Moves stylesheet rules into per-element `style` attributes:
// - sources: every <style> element and every <link rel="stylesheet">, in document
//   order; hrefs name files next to the input or http(s) URLs,
// - consumed sources are removed; at-rules survive in a <style> element,
// - rules merge in appearance order, the element's own inline style last.

use crate::config::{InlinerOptions, ParserConfig};
use crate::css::{
    format_declarations, merge_declaration, parse_declarations, Declaration, Stylesheet,
};
use crate::error::{Error, Result};
use crate::markup::{parse, serialize, Document, Element, NodeData, NodeId};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Where a `<link href>` points once resolved.
#[derive(Debug, PartialEq, Eq)]
enum SheetLocation {
    File(PathBuf),
    Remote(Url),
}

pub struct StyleInliner<'a> {
    options: &'a InlinerOptions,
    base_dir: Option<&'a Path>,
}

impl<'a> StyleInliner<'a> {
    pub fn new(options: &'a InlinerOptions) -> Self {
        StyleInliner {
            options,
            base_dir: None,
        }
    }

    /// Directory that relative `<link href>` paths are resolved against.
    pub fn with_base_dir(mut self, dir: &'a Path) -> Self {
        self.base_dir = Some(dir);
        self
    }

    /// Parse, inline and serialize.
    pub fn inline(&self, src: &str) -> Result<String> {
        let cfg = &self.options.parser;
        let mut doc = parse(src, cfg)?;
        let sheet = self.collect_styles(&mut doc)?;
        log::debug!(
            "collected {} rule(s), {} at-rule(s)",
            sheet.rules.len(),
            sheet.at_rules.len()
        );
        let styled = apply_styles(&mut doc, &sheet, cfg);
        log::info!("inlined styles into {styled} element(s)");
        Ok(serialize(&doc, self.options.prettify))
    }

    /// Gather all style sources and take them out of the tree.
    fn collect_styles(&self, doc: &mut Document) -> Result<Stylesheet> {
        let cfg = &self.options.parser;
        let mut sheet = Stylesheet::default();

        for id in doc.descendants(doc.root()) {
            let Some(e) = doc.element(id) else {
                continue;
            };
            if e.name.eq_ignore_ascii_case("style") {
                let parsed = Stylesheet::parse(&doc.text_content(id));
                keep_at_rules_or_remove(doc, id, &parsed.at_rules);
                sheet.extend(parsed);
            } else if e.name.eq_ignore_ascii_case("link") && is_stylesheet_link(e, cfg) {
                let Some(href) = attr(e, "href", cfg).map(str::to_string) else {
                    continue;
                };
                let css = match self.resolve_href(&href) {
                    Some(SheetLocation::File(path)) => {
                        log::debug!("reading linked stylesheet {}", path.display());
                        fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?
                    }
                    Some(SheetLocation::Remote(url)) => fetch(&url)?,
                    None => continue,
                };
                let parsed = Stylesheet::parse(&css);
                if parsed.at_rules.is_empty() {
                    doc.detach(id);
                } else {
                    let style = doc.create(NodeData::Element(Element::new("style")));
                    doc.replace(id, style);
                    keep_at_rules_or_remove(doc, style, &parsed.at_rules);
                }
                sheet.extend(parsed);
            }
        }
        Ok(sheet)
    }

    fn resolve_href(&self, href: &str) -> Option<SheetLocation> {
        let href = href.trim();
        match Url::parse(href) {
            Ok(url) => locate(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.options.base_url {
                Some(base) => match base.join(href) {
                    Ok(url) => locate(url),
                    Err(e) => {
                        log::warn!("cannot join stylesheet {href:?} onto {base}: {e}");
                        None
                    }
                },
                // scheme-relative, e.g. `//cdn.example.com/mail.css`
                None if href.starts_with("//") => Url::parse(&format!("https:{href}"))
                    .ok()
                    .and_then(locate),
                None => Some(SheetLocation::File(match self.base_dir {
                    Some(dir) => dir.join(href),
                    None => PathBuf::from(href),
                })),
            },
            Err(e) => {
                log::warn!("ignoring stylesheet link {href:?}: {e}");
                None
            }
        }
    }
}

fn locate(url: Url) -> Option<SheetLocation> {
    match url.scheme() {
        "http" | "https" => Some(SheetLocation::Remote(url)),
        "file" => match url.to_file_path() {
            Ok(path) => Some(SheetLocation::File(path)),
            Err(()) => {
                log::warn!("ignoring stylesheet link {url}: not a local path");
                None
            }
        },
        scheme => {
            log::warn!("ignoring stylesheet link {url}: unsupported scheme {scheme}");
            None
        }
    }
}

fn fetch(url: &Url) -> Result<String> {
    log::info!("fetching linked stylesheet {url}");
    let response = ureq::get(url.as_str())
        .call()
        .map_err(|e| Error::fetch(url, e))?;
    response
        .into_string()
        .map_err(|e| Error::io(url.as_str(), e))
}

/// Returns how many elements got a new `style` attribute.
fn apply_styles(doc: &mut Document, sheet: &Stylesheet, cfg: &ParserConfig) -> usize {
    let mut styled = 0usize;
    for id in doc.descendants(doc.root()) {
        if doc.element(id).is_none() {
            continue;
        }

        let view: &Document = doc;
        let mut merged: Vec<Declaration> = Vec::new();
        for rule in &sheet.rules {
            if rule.selectors.iter().any(|s| s.matches(view, id, cfg)) {
                for d in &rule.declarations {
                    merge_declaration(&mut merged, d.clone());
                }
            }
        }
        if merged.is_empty() {
            continue;
        }

        let Some(e) = doc.element_mut(id) else {
            continue;
        };
        if let Some(existing) = attr(e, "style", cfg) {
            for d in parse_declarations(existing) {
                merge_declaration(&mut merged, d);
            }
        }
        set_style(e, format_declarations(&merged), cfg);
        styled += 1;
    }
    styled
}

fn keep_at_rules_or_remove(doc: &mut Document, style: NodeId, at_rules: &[String]) {
    if at_rules.is_empty() {
        doc.detach(style);
        return;
    }
    doc.clear_children(style);
    let text = doc.create(NodeData::RawText(format!("\n{}\n", at_rules.join("\n"))));
    doc.append(style, text);
}

fn attr<'e>(e: &'e Element, name: &str, cfg: &ParserConfig) -> Option<&'e str> {
    e.attrs
        .iter()
        .find(|a| cfg.names_eq(&a.name, name))
        .map(|a| a.value.as_deref().unwrap_or(""))
}

fn set_style(e: &mut Element, value: String, cfg: &ParserConfig) {
    match e.attrs.iter_mut().find(|a| cfg.names_eq(&a.name, "style")) {
        Some(a) => a.value = Some(value),
        None => e.set_attr("style", value),
    }
}

fn is_stylesheet_link(e: &Element, cfg: &ParserConfig) -> bool {
    attr(e, "rel", cfg).map_or(false, |rel| {
        rel.split_ascii_whitespace()
            .any(|r| r.eq_ignore_ascii_case("stylesheet"))
    })
}
