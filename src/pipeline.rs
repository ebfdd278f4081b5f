// src/pipeline.rs
//
// Load → Inline → Correct → Write. Strictly linear; the first failure ends the run.

use crate::config::{Config, InlinerOptions};
use crate::corrector::{correct, Substitution};
use crate::error::{Error, Result};
use crate::inliner::StyleInliner;
use std::fs;
use std::path::Path;

/// Read the whole file as UTF-8 text.
pub fn load(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    log::info!("read {} bytes from {}", text.len(), path.display());
    Ok(text)
}

/// Create or truncate `path` and write `text` into it.
pub fn write(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|e| Error::io(path, e))?;
    log::info!("wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

/// Inline and correct one document held in memory.
pub fn process(
    src: &str,
    options: &InlinerOptions,
    base_dir: Option<&Path>,
    substitutions: &[Substitution],
) -> Result<String> {
    let inliner = StyleInliner::new(options);
    let inliner = match base_dir {
        Some(dir) => inliner.with_base_dir(dir),
        None => inliner,
    };
    let inlined = inliner.inline(src)?;
    Ok(correct(&inlined, substitutions))
}

pub fn run(config: &Config) -> Result<()> {
    let src = load(&config.input)?;
    let base_dir = config.input.parent().filter(|p| !p.as_os_str().is_empty());
    let out = process(&src, &config.inliner, base_dir, config.substitutions)?;
    write(&config.output, &out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrector::JELLY_SUBSTITUTIONS;

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("html.jelly")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn write_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jelly");
        write(&path, "a much longer first version").unwrap();
        write(&path, "short").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn process_restores_case_after_inlining() {
        let out = process(
            "<j:forEach varStatus=\"x\" items=\"${items}\"></j:forEach>",
            &InlinerOptions::default(),
            None,
            JELLY_SUBSTITUTIONS,
        )
        .unwrap();
        assert!(out.contains("<j:forEach varStatus=\"x\" items=\"${items}\">"));
        assert!(out.contains("</j:forEach>"));
    }

    #[test]
    fn parse_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("html.jelly");
        let output = dir.path().join("html_gmail.jelly");
        fs::write(&input, "<table><td class=\"x\"").unwrap();
        let config = Config {
            input,
            output: output.clone(),
            ..Config::default()
        };
        assert!(matches!(run(&config), Err(Error::Parse { .. })));
        assert!(!output.exists());
    }
}
