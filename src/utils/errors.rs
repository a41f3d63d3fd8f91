//! Error and diagnostic types for the compiler.
//!
//! Every user-facing failure is a [`Diagnostic`]: a stable [`ErrorCode`],
//! a message, and a source span. Each pipeline stage has its own typed
//! error that converts into a `Diagnostic` at the stage boundary.

use crate::utils::location::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable diagnostic codes.
///
/// Ranges are append-only and codes are never reused:
/// E0000-E00FF lexical/parse and scope, E01xx types, E02xx control flow,
/// E03xx return paths, E04xx print, E05xx lists and ranges, E06xx input
/// and casts, E08xx structs, E09xx imports, E10xx dicts, E11xx primitive
/// methods, E12xx enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ErrorCode {
    // Lexical
    E0000,
    // Scope / identifiers (E0001 doubles as the lexer's unterminated-literal code;
    // the stage makes the two unambiguous)
    E0001,
    E0002,
    E0003,
    // Parse errors
    E0010,
    E0011,
    E0012,
    E0013,
    E0014,
    E0015,
    E0016,
    E0017,
    E0018,
    // Types
    E0100,
    E0101,
    E0102,
    E0103,
    E0104,
    // Control flow
    E0200,
    E0201,
    E0205,
    // Return paths
    E0302,
    E0303,
    E0304,
    // Print
    E0401,
    E0402,
    E0403,
    E0406,
    E0410,
    E0411,
    // Lists and ranges
    E0500,
    E0501,
    E0502,
    E0503,
    E0504,
    E0505,
    E0506,
    E0507,
    // Input and casts
    E0600,
    E0601,
    E0602,
    // Structs
    E0800,
    E0801,
    E0803,
    E0804,
    E0805,
    E0806,
    E0807,
    E0808,
    E0809,
    // Imports
    E0900,
    E0901,
    // Dicts
    E1000,
    E1001,
    E1002,
    E1003,
    E1004,
    E1005,
    E1006,
    // Primitive methods
    E1100,
    E1102,
    E1105,
    E1106,
    E1107,
    // Enums
    E1200,
    E1201,
    E1202,
    E1203,
    E1204,
    E1205,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Variant names are the stable code names.
        write!(f, "{:?}", self)
    }
}

/// A diagnostic: stable code, human message, source span, file identity.
///
/// The core never prints; the CLI formats these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// Path of the compilation unit the span refers to
    pub file: String,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span, file: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            file: file.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error[{}]: {}:{}:{}: {}",
            self.code, self.file, self.span.start_line, self.span.start_column, self.message
        )
    }
}

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl LexerError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self.kind {
            LexerErrorKind::UnexpectedChar => ErrorCode::E0000,
            LexerErrorKind::UnterminatedString
            | LexerErrorKind::InvalidEscape
            | LexerErrorKind::InvalidNumber => ErrorCode::E0001,
        }
    }

    /// Convert into a diagnostic for the given compilation unit.
    pub fn into_diagnostic(self, file: &str) -> Diagnostic {
        Diagnostic::new(self.code(), self.message, self.span, file)
    }
}

/// The kind of a lexer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Unterminated string literal
    UnterminatedString,
    /// Invalid escape sequence
    InvalidEscape,
    /// Invalid number literal
    InvalidNumber,
}

/// Error during parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// What was found
    pub found: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)?;
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

impl ParseError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self.kind {
            ParseErrorKind::UnexpectedToken => ErrorCode::E0010,
            ParseErrorKind::ExpectedToken => ErrorCode::E0011,
            ParseErrorKind::ExpectedExpression => ErrorCode::E0012,
            ParseErrorKind::ExpectedStatement => ErrorCode::E0013,
            ParseErrorKind::ExpectedIdentifier => ErrorCode::E0014,
            ParseErrorKind::ExpectedType => ErrorCode::E0015,
            ParseErrorKind::InvalidSyntax => ErrorCode::E0016,
            ParseErrorKind::MismatchedDelimiter => ErrorCode::E0017,
            ParseErrorKind::UnexpectedEof => ErrorCode::E0018,
        }
    }

    /// Convert into a diagnostic for the given compilation unit.
    pub fn into_diagnostic(self, file: &str) -> Diagnostic {
        let message = match self.found {
            Some(ref found) => format!("{} (found {})", self.message, found),
            None => self.message.clone(),
        };
        Diagnostic::new(self.code(), message, self.span, file)
    }
}

/// The kind of a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// Expected a specific token
    ExpectedToken,
    /// Expected an expression
    ExpectedExpression,
    /// Expected a statement
    ExpectedStatement,
    /// Expected an identifier
    ExpectedIdentifier,
    /// Expected a type
    ExpectedType,
    /// Invalid syntax
    InvalidSyntax,
    /// Mismatched brackets/braces
    MismatchedDelimiter,
    /// Unexpected end of file
    UnexpectedEof,
}

/// Error during semantic analysis.
///
/// Unlike the lexer and parser errors, semantic errors carry their code
/// directly: the analyzer produces ~50 distinct codes and the mapping
/// would otherwise just mirror a second enum.
#[derive(Error, Debug, Clone)]
pub struct SemanticError {
    /// Stable error code
    pub code: ErrorCode,
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} at {}", self.code, self.message, self.span)
    }
}

impl SemanticError {
    /// Create a new semantic error.
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    /// Convert into a diagnostic for the given compilation unit.
    pub fn into_diagnostic(self, file: &str) -> Diagnostic {
        Diagnostic::new(self.code, self.message, self.span, file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::E0100.to_string(), "E0100");
        assert_eq!(ErrorCode::E1205.to_string(), "E1205");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(
            ErrorCode::E0100,
            "type mismatch: expected int, got float",
            Span::new(3, 14, 3, 18),
            "main.qsr",
        );
        let s = diag.to_string();
        assert!(s.contains("E0100"));
        assert!(s.contains("main.qsr:3:14"));
        assert!(s.contains("type mismatch"));
    }

    #[test]
    fn test_lexer_error_codes() {
        let err = LexerError {
            message: "unterminated string literal".to_string(),
            span: Span::new(1, 5, 1, 10),
            kind: LexerErrorKind::UnterminatedString,
        };
        assert_eq!(err.code(), ErrorCode::E0001);

        let err = LexerError {
            message: "unexpected character '$'".to_string(),
            span: Span::new(1, 1, 1, 2),
            kind: LexerErrorKind::UnexpectedChar,
        };
        assert_eq!(err.code(), ErrorCode::E0000);
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            message: "expected ')' after arguments".to_string(),
            span: Span::new(1, 5, 1, 10),
            kind: ParseErrorKind::ExpectedToken,
            found: Some("}".to_string()),
        };
        let s = format!("{}", err);
        assert!(s.contains("expected ')'"));
        assert!(s.contains("}"));
        assert_eq!(err.code(), ErrorCode::E0011);
    }
}
