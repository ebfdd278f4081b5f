// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not fetch stylesheet {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn fetch(url: &url::Url, source: ureq::Error) -> Self {
        Error::Fetch {
            url: url.to_string(),
            source: Box::new(source),
        }
    }

    /// Build a parse error for byte offset `pos` of `src`.
    pub(crate) fn parse_at(src: &[u8], pos: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_col(src, pos);
        Error::Parse {
            line,
            column,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// 1-based line/column of byte offset `pos`.
fn line_col(src: &[u8], pos: usize) -> (usize, usize) {
    let pos = pos.min(src.len());
    let head = &src[..pos];
    let line = memchr::memchr_iter(b'\n', head).count() + 1;
    let line_start = memchr::memrchr(b'\n', head).map(|x| x + 1).unwrap_or(0);
    (line, pos - line_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_reports_line_and_column() {
        let src = b"<a>\n  <b";
        let err = Error::parse_at(src, 6, "unterminated tag");
        match err {
            Error::Parse { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn io_error_mentions_path() {
        let err = Error::io(
            "missing.jelly",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.jelly"));
    }
}
