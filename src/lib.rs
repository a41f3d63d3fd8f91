//! # Quasar — a Quasar-to-Python source-to-source compiler
//!
//! Quasar is a statically-typed surface language (C-family syntax,
//! mandatory type annotations, structs, enums, dicts, lists, modules)
//! compiled to Python 3.10+ source text. The pipeline is strictly
//! linear and deterministic:
//!
//! ```text
//! source text → Lexer → tokens → Parser → AST
//!             → Semantic Analyzer → annotated AST → Emitter → Python
//! ```
//!
//! Each stage accumulates its own diagnostics; the pipeline halts at the
//! first stage that produced any, so no stage ever receives structurally
//! invalid input.
//!
//! ## Example
//!
//! ```rust,ignore
//! use quasar::{compile_source, NoImports};
//!
//! let python = compile_source(
//!     "fn fact(n: int) -> int { if n <= 1 { return 1 } return n * fact(n - 1) }\nprint(fact(5))",
//!     "example.qsr",
//!     &mut NoImports,
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codegen;
pub mod frontend;
pub mod utils;

pub use codegen::PyCodeGen;
pub use frontend::ast::Program;
pub use frontend::semantic::{FsImportResolver, ImportResolver, NoImports};
pub use utils::errors::{Diagnostic, ErrorCode};

use frontend::lexer::Lexer;
use frontend::parser::Parser;
use frontend::token::Token;
use std::path::Path;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tokenize source text. Returns every lexical diagnostic at once.
pub fn lex(source: &str, file: &str) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let (tokens, errors) = Lexer::new(source).tokenize();
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors
            .into_iter()
            .map(|e| e.into_diagnostic(file))
            .collect())
    }
}

/// Lex and parse source text into a program tree.
pub fn parse(source: &str, file: &str) -> Result<Program, Vec<Diagnostic>> {
    let tokens = lex(source, file)?;
    Parser::new(tokens, file)
        .parse()
        .map_err(|errors| errors.into_iter().map(|e| e.into_diagnostic(file)).collect())
}

/// Semantically validate a parsed program in place, annotating every
/// expression with its type. Local imports are compiled recursively
/// through `resolver`.
pub fn analyze(
    program: &mut Program,
    resolver: &mut dyn ImportResolver,
) -> Result<(), Vec<Diagnostic>> {
    frontend::semantic::analyze(program, resolver)
}

/// Emit Python source for an analyzed program. Deterministic: the same
/// tree always produces byte-identical output.
pub fn emit(program: &Program) -> String {
    PyCodeGen::new().generate(program)
}

/// Run the full pipeline over in-memory source text.
pub fn compile_source(
    source: &str,
    file: &str,
    resolver: &mut dyn ImportResolver,
) -> Result<String, Vec<Diagnostic>> {
    let mut program = parse(source, file)?;
    analyze(&mut program, resolver)?;
    Ok(emit(&program))
}

/// Open a source file, run the pipeline, and return the emitted Python
/// text or the accumulated diagnostics. An unreadable input path reports
/// as an unresolved-import diagnostic on the file itself.
pub fn compile(path: &Path) -> Result<String, Vec<Diagnostic>> {
    let file = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|err| {
        vec![Diagnostic::new(
            ErrorCode::E0901,
            format!("cannot read '{}': {}", file, err),
            utils::location::Span::dummy(),
            file.clone(),
        )]
    })?;
    let mut resolver = FsImportResolver;
    compile_source(&source, &file, &mut resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_compile_source_pipeline() {
        let python = compile_source("let x: int = 1\nprint(x)", "t.qsr", &mut NoImports)
            .expect("compile failed");
        assert_eq!(python, "x = 1\nprint(x)\n");
    }

    #[test]
    fn test_pipeline_halts_at_first_failing_stage() {
        // A lexical error and a (would-be) semantic error: only the
        // lexical diagnostics are reported.
        let diags = compile_source("let x: int = $ + true", "t.qsr", &mut NoImports).unwrap_err();
        assert!(diags.iter().all(|d| d.code == ErrorCode::E0000));
    }

    #[test]
    fn test_compile_missing_file() {
        let diags = compile(Path::new("/definitely/not/here.qsr")).unwrap_err();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::E0901);
    }
}
