pub mod ast;
pub mod lexer;
pub mod parser;
pub mod runtime;

use std::path::Path;

use tracing::debug;

use ast::{VisualScript, MAX_NESTING_DEPTH};
use lexer::Lexer;
use parser::Parser;

/// Any failure between reading a document and finishing a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Lexer error: {0}")]
    Lexer(#[from] lexer::LexerError),
    #[error("Parse error: {0}")]
    Parse(#[from] parser::ParseError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Nesting depth {depth} exceeds the maximum of {max}")]
    TooDeep { depth: usize, max: usize },
    #[error("Runtime error: {0}")]
    Runtime(#[from] runtime::RuntimeError),
}

/// Document encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Protobuf text format
    Text,
    /// JSON rendering of the same message
    Json,
}

impl Format {
    /// `.json` files are JSON; everything else is text format.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Text,
        }
    }
}

pub fn load_text(source: &str, filename: &str) -> Result<VisualScript, Error> {
    let tokens = Lexer::new(source, filename).tokenize()?;
    let program = Parser::new(tokens).parse()?;
    debug!(bytes = source.len(), nodes = program.nodes.len(), "loaded text document");
    Ok(program)
}

pub fn load_json(source: &str) -> Result<VisualScript, Error> {
    let program: VisualScript = serde_json::from_str(source)?;
    let depth = program.nesting_depth();
    if depth > MAX_NESTING_DEPTH {
        debug!(depth, "JSON document nests too deeply");
        return Err(Error::TooDeep {
            depth,
            max: MAX_NESTING_DEPTH,
        });
    }
    debug!(bytes = source.len(), nodes = program.nodes.len(), "loaded JSON document");
    Ok(program)
}

pub fn load(source: &str, filename: &str, format: Format) -> Result<VisualScript, Error> {
    match format {
        Format::Text => load_text(source, filename),
        Format::Json => load_json(source),
    }
}

/// Read and load a document, choosing the format from the extension unless one is given.
pub fn load_path(path: &Path, format: Option<Format>) -> Result<VisualScript, Error> {
    let filename = path.to_string_lossy().to_string();
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: filename.clone(),
        source,
    })?;
    load(&source, &filename, format.unwrap_or_else(|| Format::detect(path)))
}
