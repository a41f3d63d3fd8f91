//! Lexer for the Quasar surface language.
//!
//! The lexer converts source text into a stream of tokens, ending with
//! `Eof`. Malformed lexemes are reported one diagnostic each; after an
//! error the lexer resynchronizes at the next whitespace character and
//! keeps scanning so a single run can report several lexical errors.

use crate::frontend::token::{Literal, Token, TokenKind};
use crate::utils::errors::{LexerError, LexerErrorKind};
use crate::utils::location::{SourceLocation, Span};
use std::iter::Peekable;
use std::str::Chars;
use unicode_xid::UnicodeXID;

/// A lexer for tokenizing Quasar source code.
pub struct Lexer<'a> {
    /// The source text
    source: &'a str,
    /// Character iterator
    chars: Peekable<Chars<'a>>,
    /// Current byte offset
    offset: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start of current token
    token_start: SourceLocation,
    /// Whether we've hit EOF
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            token_start: SourceLocation::start(),
            at_eof: false,
        }
    }

    /// Get the current location.
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }

    /// Mark the start of a new token.
    fn mark_token_start(&mut self) {
        self.token_start = self.current_location();
    }

    /// Create a span from token start to current location.
    fn make_span(&self) -> Span {
        Span::from_locations(self.token_start, self.current_location())
    }

    /// Peek at the current character without consuming it.
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek at the next character (one ahead).
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    /// Consume and return the current character.
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume the current character if it matches.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and `//` line comments.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while self.peek().is_some() && self.peek() != Some('\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Create a token with the given kind.
    fn make_token(&self, kind: TokenKind) -> Token {
        let span = self.make_span();
        let lexeme = self.source[span.start_offset..span.end_offset].to_string();
        Token::new(kind, span, lexeme)
    }

    /// Create a literal token.
    fn make_literal_token(&self, kind: TokenKind, literal: Literal) -> Token {
        let span = self.make_span();
        let lexeme = self.source[span.start_offset..span.end_offset].to_string();
        Token::with_literal(kind, span, lexeme, literal)
    }

    /// Create an error.
    fn make_error(&self, message: impl Into<String>, kind: LexerErrorKind) -> LexerError {
        LexerError {
            message: message.into(),
            span: self.make_span(),
            kind,
        }
    }

    /// Scan a number literal. A `.` promotes to float only when followed
    /// by a digit, so `0..n` lexes as `0`, `..`, `n`.
    fn scan_number(&mut self) -> Result<Token, LexerError> {
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            is_float = true;
            self.advance(); // consume '.'
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance();
            }
        }

        let span = self.make_span();
        let lexeme = &self.source[span.start_offset..span.end_offset];

        if is_float {
            let value: f64 = lexeme
                .parse()
                .map_err(|_| self.make_error("invalid float literal", LexerErrorKind::InvalidNumber))?;
            Ok(self.make_literal_token(TokenKind::FloatLit, Literal::Float(value)))
        } else {
            let value: i64 = lexeme.parse().map_err(|_| {
                self.make_error(
                    format!("integer literal '{}' out of range", lexeme),
                    LexerErrorKind::InvalidNumber,
                )
            })?;
            Ok(self.make_literal_token(TokenKind::IntLit, Literal::Int(value)))
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .map(|c| c.is_xid_continue() || c == '_')
            .unwrap_or(false)
        {
            self.advance();
        }

        let span = self.make_span();
        let lexeme = &self.source[span.start_offset..span.end_offset];

        match TokenKind::keyword(lexeme) {
            Some(TokenKind::True) => {
                self.make_literal_token(TokenKind::True, Literal::Bool(true))
            }
            Some(TokenKind::False) => {
                self.make_literal_token(TokenKind::False, Literal::Bool(false))
            }
            Some(kind) => self.make_token(kind),
            None => self.make_token(TokenKind::Identifier),
        }
    }

    /// Scan a string literal. The opening quote is already consumed.
    ///
    /// The token keeps both the unescaped value (in `literal`) and the
    /// verbatim lexeme; the format-string check and the emitter each need
    /// a different one.
    fn scan_string(&mut self) -> Result<Token, LexerError> {
        let mut value = String::new();

        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\n') | None => {
                    return Err(self.make_error(
                        "unterminated string literal",
                        LexerErrorKind::UnterminatedString,
                    ));
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some(c) => {
                            return Err(self.make_error(
                                format!("invalid escape sequence '\\{}'", c),
                                LexerErrorKind::InvalidEscape,
                            ));
                        }
                        None => {
                            return Err(self.make_error(
                                "unterminated string literal",
                                LexerErrorKind::UnterminatedString,
                            ));
                        }
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        Ok(self.make_literal_token(TokenKind::StringLit, Literal::Str(value)))
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace();
        self.mark_token_start();

        let c = match self.advance() {
            Some(c) => c,
            None => {
                self.at_eof = true;
                return Ok(self.make_token(TokenKind::Eof));
            }
        };

        match c {
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            '[' => Ok(self.make_token(TokenKind::LeftBracket)),
            ']' => Ok(self.make_token(TokenKind::RightBracket)),
            '{' => Ok(self.make_token(TokenKind::LeftBrace)),
            '}' => Ok(self.make_token(TokenKind::RightBrace)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            ':' => Ok(self.make_token(TokenKind::Colon)),
            '+' => Ok(self.make_token(TokenKind::Plus)),
            '*' => Ok(self.make_token(TokenKind::Star)),
            '/' => Ok(self.make_token(TokenKind::Slash)),
            '%' => Ok(self.make_token(TokenKind::Percent)),

            // Two-character operators are greedy.
            '-' => {
                if self.match_char('>') {
                    Ok(self.make_token(TokenKind::Arrow))
                } else {
                    Ok(self.make_token(TokenKind::Minus))
                }
            }
            '.' => {
                if self.match_char('.') {
                    Ok(self.make_token(TokenKind::DotDot))
                } else {
                    Ok(self.make_token(TokenKind::Dot))
                }
            }
            '=' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::EqualEqual))
                } else {
                    Ok(self.make_token(TokenKind::Equal))
                }
            }
            '!' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::BangEqual))
                } else {
                    Ok(self.make_token(TokenKind::Bang))
                }
            }
            '<' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::LessEqual))
                } else {
                    Ok(self.make_token(TokenKind::Less))
                }
            }
            '>' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::GreaterEqual))
                } else {
                    Ok(self.make_token(TokenKind::Greater))
                }
            }
            '&' => {
                if self.match_char('&') {
                    Ok(self.make_token(TokenKind::AmpAmp))
                } else {
                    Err(self.make_error(
                        "unexpected character '&'; did you mean '&&'?",
                        LexerErrorKind::UnexpectedChar,
                    ))
                }
            }
            '|' => {
                if self.match_char('|') {
                    Ok(self.make_token(TokenKind::PipePipe))
                } else {
                    Err(self.make_error(
                        "unexpected character '|'; did you mean '||'?",
                        LexerErrorKind::UnexpectedChar,
                    ))
                }
            }

            ';' => Err(self.make_error(
                "unexpected character ';'; Quasar does not use semicolons",
                LexerErrorKind::UnexpectedChar,
            )),

            '"' => self.scan_string(),

            c if c.is_ascii_digit() => self.scan_number(),

            c if c.is_xid_start() || c == '_' => Ok(self.scan_identifier()),

            _ => Err(self.make_error(
                format!("unexpected character '{}'", c),
                LexerErrorKind::UnexpectedChar,
            )),
        }
    }

    /// Skip to the next whitespace character after a lexical error.
    fn resynchronize(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    /// Tokenize the entire source, accumulating errors.
    ///
    /// Always produces a token vector ending with `Eof`; errors do not
    /// stop the scan, so callers get every lexical error in one pass.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            match self.next_token() {
                Ok(token) => {
                    let is_eof = token.is_eof();
                    tokens.push(token);
                    if is_eof {
                        break;
                    }
                }
                Err(err) => {
                    errors.push(err);
                    self.resynchronize();
                }
            }
        }

        (tokens, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens
    }

    fn token_kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_whitespace_and_comments() {
        let tokens = lex("   // a comment\n\t \r\n// another\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_keywords() {
        let kinds = token_kinds("let const fn if else while for in return break continue struct enum import print");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Let,
                TokenKind::Const,
                TokenKind::Fn,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::In,
                TokenKind::Return,
                TokenKind::Break,
                TokenKind::Continue,
                TokenKind::Struct,
                TokenKind::Enum,
                TokenKind::Import,
                TokenKind::Print,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = lex("foo bar _test x123");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "foo");
        assert_eq!(tokens[1].lexeme, "bar");
        assert_eq!(tokens[2].lexeme, "_test");
        assert_eq!(tokens[3].lexeme, "x123");
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("123 45.67");
        assert_eq!(tokens[0].kind, TokenKind::IntLit);
        assert_eq!(tokens[0].literal, Some(Literal::Int(123)));
        assert_eq!(tokens[1].kind, TokenKind::FloatLit);
        assert_eq!(tokens[1].literal, Some(Literal::Float(45.67)));
        assert_eq!(tokens[1].lexeme, "45.67");
    }

    #[test]
    fn test_negative_is_not_part_of_literal() {
        let kinds = token_kinds("-5");
        assert_eq!(kinds, vec![TokenKind::Minus, TokenKind::IntLit, TokenKind::Eof]);
    }

    #[test]
    fn test_range_after_integer() {
        let kinds = token_kinds("0..10");
        assert_eq!(
            kinds,
            vec![TokenKind::IntLit, TokenKind::DotDot, TokenKind::IntLit, TokenKind::Eof]
        );
    }

    #[test]
    fn test_operators_greedy() {
        let kinds = token_kinds("== != <= >= && || -> .. = < > !");
        assert_eq!(
            kinds,
            vec![
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Arrow,
                TokenKind::DotDot,
                TokenKind::Equal,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        let tokens = lex(r#""hello world""#);
        assert_eq!(tokens[0].kind, TokenKind::StringLit);
        assert_eq!(tokens[0].literal, Some(Literal::Str("hello world".to_string())));
        assert_eq!(tokens[0].lexeme, r#""hello world""#);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = lex(r#""a\nb\t\"c\"\\""#);
        assert_eq!(
            tokens[0].literal,
            Some(Literal::Str("a\nb\t\"c\"\\".to_string()))
        );
        // The lexeme stays verbatim.
        assert_eq!(tokens[0].lexeme, r#""a\nb\t\"c\"\\""#);
    }

    #[test]
    fn test_unterminated_string() {
        let (_, errors) = Lexer::new("\"oops").tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexerErrorKind::UnterminatedString);
    }

    #[test]
    fn test_string_with_newline_is_unterminated() {
        let (_, errors) = Lexer::new("\"a\nb\"").tokenize();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].kind, LexerErrorKind::UnterminatedString);
    }

    #[test]
    fn test_invalid_escape() {
        let (_, errors) = Lexer::new(r#""a\qb""#).tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexerErrorKind::InvalidEscape);
    }

    #[test]
    fn test_semicolon_is_error() {
        let (tokens, errors) = Lexer::new("let x: int = 1;").tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexerErrorKind::UnexpectedChar);
        assert!(errors[0].message.contains("semicolon"));
        // Everything before the semicolon was still tokenized.
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Let));
    }

    #[test]
    fn test_resynchronize_reports_multiple_errors() {
        let (_, errors) = Lexer::new("$ x @ y").tokenize();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_bool_literals() {
        let tokens = lex("true false");
        assert_eq!(tokens[0].literal, Some(Literal::Bool(true)));
        assert_eq!(tokens[1].literal, Some(Literal::Bool(false)));
    }

    #[test]
    fn test_location_tracking() {
        let tokens = lex("foo\nbar");
        assert_eq!(tokens[0].span.start_line, 1);
        assert_eq!(tokens[0].span.start_column, 1);
        assert_eq!(tokens[1].span.start_line, 2);
        assert_eq!(tokens[1].span.start_column, 1);
    }

    #[test]
    fn test_lexemes_reconstruct_source() {
        let source = "fn add(a: int, b: int) -> int { return a + b } // tail";
        let tokens = lex(source);
        // Concatenated lexemes plus skipped whitespace/comments must cover
        // the source exactly: verify via the recorded offsets.
        for t in tokens.iter().filter(|t| !t.is_eof()) {
            assert_eq!(
                &source[t.span.start_offset..t.span.end_offset],
                t.lexeme.as_str()
            );
        }
    }

    #[test]
    fn test_complex_program() {
        let source = r#"
            fn fact(n: int) -> int {
                if n <= 1 { return 1 }
                return n * fact(n - 1)
            }
            let r: int = fact(5)
            print("r={}", r)
        "#;
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty());
        assert!(tokens.len() > 30);
    }
}
