//! Parser for the Quasar surface language.
//!
//! A recursive descent parser over the lexer's token vector. Operator
//! precedence, lowest to highest:
//!
//! ```text
//! ..            (non-associative, for-loop ranges)
//! ||
//! &&
//! == !=
//! < > <= >=
//! + -
//! * / %
//! ! -           (unary, right-associative)
//! () [] . .()   (postfix)
//! ```
//!
//! On a syntax error the parser records a diagnostic and resynchronizes
//! at the next statement or top-level keyword, so one pass reports every
//! distinct error. It never returns a partial tree: any recorded error
//! fails the whole parse.

use crate::frontend::ast::*;
use crate::frontend::token::{Literal, Token, TokenKind};
use crate::utils::errors::{ParseError, ParseErrorKind};
use crate::utils::location::Span;

/// A recursive descent parser for Quasar.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    file: String,
    errors: Vec<ParseError>,
}

impl Parser {
    /// Create a new parser over a token vector ending with `Eof`.
    pub fn new(tokens: Vec<Token>, file: impl Into<String>) -> Self {
        Self {
            tokens,
            current: 0,
            file: file.into(),
            errors: Vec::new(),
        }
    }

    /// Parse the token stream into a program.
    ///
    /// Returns every syntax error found; a program is only returned when
    /// there were none.
    pub fn parse(mut self) -> Result<Program, Vec<ParseError>> {
        let start_span = self.peek().span;
        let mut items = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(decl) => items.push(decl),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        let end_span = self.previous_or_start().span;
        Ok(Program {
            items,
            file: self.file,
            span: start_span.merge(&end_span),
        })
    }

    // =========================================================================
    // Token navigation
    // =========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_n(&self, n: usize) -> &Token {
        let idx = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn previous_or_start(&self) -> &Token {
        if self.current == 0 {
            &self.tokens[0]
        } else {
            self.previous()
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message, ParseErrorKind::ExpectedToken))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> Result<(String, Span), ParseError> {
        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            Ok((token.lexeme.clone(), token.span))
        } else {
            Err(self.error_at_current(message, ParseErrorKind::ExpectedIdentifier))
        }
    }

    fn error_at_current(&self, message: &str, kind: ParseErrorKind) -> ParseError {
        let kind = if self.is_at_end() && kind != ParseErrorKind::InvalidSyntax {
            ParseErrorKind::UnexpectedEof
        } else {
            kind
        };
        ParseError {
            message: message.to_string(),
            span: self.peek().span,
            kind,
            found: Some(self.peek().kind.name().to_string()),
        }
    }

    fn error_at(&self, message: &str, kind: ParseErrorKind, span: Span) -> ParseError {
        ParseError {
            message: message.to_string(),
            span,
            kind,
            found: None,
        }
    }

    /// Skip to the next top-level declaration after an error.
    fn synchronize(&mut self) {
        if !self.is_at_end() {
            self.advance();
        }
        while !self.is_at_end() {
            if self.previous_or_start().kind == TokenKind::RightBrace {
                return;
            }
            match self.peek().kind {
                TokenKind::Let
                | TokenKind::Const
                | TokenKind::Fn
                | TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::Import => return,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the next statement inside a block after an error.
    fn synchronize_statement(&mut self) {
        while !self.is_at_end() && !self.check(TokenKind::RightBrace) {
            match self.peek().kind {
                TokenKind::Let
                | TokenKind::Const
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Print => return,
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn declaration(&mut self) -> Result<Decl, ParseError> {
        match self.peek().kind {
            TokenKind::Let => Ok(Decl::Var(self.var_decl()?)),
            TokenKind::Const => Ok(Decl::Const(self.const_decl()?)),
            TokenKind::Fn => Ok(Decl::Fn(self.fn_decl()?)),
            TokenKind::Struct => Ok(Decl::Struct(self.struct_decl()?)),
            TokenKind::Enum => Ok(Decl::Enum(self.enum_decl()?)),
            TokenKind::Import => Ok(Decl::Import(self.import_decl()?)),
            _ => Ok(Decl::Stmt(self.statement()?)),
        }
    }

    fn var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let start = self.advance().span; // consume 'let'
        let (name, _) = self.consume_identifier("expected variable name after 'let'")?;
        self.consume(TokenKind::Colon, "expected ':' after variable name")?;
        let ty = self.type_annotation()?;
        self.consume(TokenKind::Equal, "expected '=' in variable declaration")?;
        let initializer = self.expression()?;

        let span = start.merge(&initializer.span);
        Ok(VarDecl {
            name,
            ty,
            initializer,
            span,
        })
    }

    fn const_decl(&mut self) -> Result<ConstDecl, ParseError> {
        let start = self.advance().span; // consume 'const'
        let (name, _) = self.consume_identifier("expected constant name after 'const'")?;
        self.consume(TokenKind::Colon, "expected ':' after constant name")?;
        let ty = self.type_annotation()?;
        self.consume(TokenKind::Equal, "expected '=' in constant declaration")?;
        let initializer = self.expression()?;

        let span = start.merge(&initializer.span);
        Ok(ConstDecl {
            name,
            ty,
            initializer,
            span,
        })
    }

    fn fn_decl(&mut self) -> Result<FnDecl, ParseError> {
        let start = self.advance().span; // consume 'fn'
        let (name, _) = self.consume_identifier("expected function name after 'fn'")?;

        self.consume(TokenKind::LeftParen, "expected '(' after function name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.param()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after parameters")?;

        self.consume(TokenKind::Arrow, "expected '->' before return type")?;
        let return_type = self.type_annotation()?;

        let body = self.block()?;
        let span = start.merge(&body.span);

        Ok(FnDecl {
            name,
            params,
            return_type,
            body,
            span,
        })
    }

    fn param(&mut self) -> Result<Param, ParseError> {
        let (name, name_span) = self.consume_identifier("expected parameter name")?;
        self.consume(TokenKind::Colon, "expected ':' after parameter name")?;
        let ty = self.type_annotation()?;
        let span = name_span.merge(&self.previous().span);
        Ok(Param { name, ty, span })
    }

    fn struct_decl(&mut self) -> Result<StructDecl, ParseError> {
        let start = self.advance().span; // consume 'struct'
        let (name, _) = self.consume_identifier("expected struct name after 'struct'")?;
        self.consume(TokenKind::LeftBrace, "expected '{' after struct name")?;

        let mut fields = Vec::new();
        if !self.check(TokenKind::RightBrace) {
            loop {
                let (field_name, field_span) = self.consume_identifier("expected field name")?;
                self.consume(TokenKind::Colon, "expected ':' after field name")?;
                let ty = self.type_annotation()?;
                let span = field_span.merge(&self.previous().span);
                fields.push(StructField {
                    name: field_name,
                    ty,
                    span,
                });
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
                // trailing comma
                if self.check(TokenKind::RightBrace) {
                    break;
                }
            }
        }

        let end = self.consume(TokenKind::RightBrace, "expected '}' after struct fields")?;
        let span = start.merge(&end.span);
        Ok(StructDecl { name, fields, span })
    }

    fn enum_decl(&mut self) -> Result<EnumDecl, ParseError> {
        let start = self.advance().span; // consume 'enum'
        let (name, _) = self.consume_identifier("expected enum name after 'enum'")?;
        self.consume(TokenKind::LeftBrace, "expected '{' after enum name")?;

        let mut variants = Vec::new();
        if !self.check(TokenKind::RightBrace) {
            loop {
                let (variant_name, variant_span) = self.consume_identifier("expected variant name")?;
                variants.push(EnumVariant {
                    name: variant_name,
                    span: variant_span,
                });
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RightBrace) {
                    break;
                }
            }
        }

        let end = self.consume(TokenKind::RightBrace, "expected '}' after enum variants")?;
        let span = start.merge(&end.span);
        Ok(EnumDecl {
            name,
            variants,
            span,
        })
    }

    fn import_decl(&mut self) -> Result<ImportDecl, ParseError> {
        let start = self.advance().span; // consume 'import'

        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            let span = start.merge(&token.span);
            return Ok(ImportDecl {
                module: token.lexeme.clone(),
                is_local: false,
                span,
            });
        }

        if self.check(TokenKind::StringLit) {
            let token = self.advance();
            let module = match &token.literal {
                Some(Literal::Str(s)) => s.clone(),
                _ => token.lexeme.clone(),
            };
            let span = start.merge(&token.span);
            return Ok(ImportDecl {
                module,
                is_local: true,
                span,
            });
        }

        Err(self.error_at_current(
            "expected module name or quoted path after 'import'",
            ParseErrorKind::UnexpectedToken,
        ))
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// type → "int" | "float" | "bool" | "str" | "[" type "]"
    ///      | "Dict" "[" type "," type "]" | IDENTIFIER
    ///
    /// A bare identifier names a struct or enum; the analyzer resolves it.
    fn type_annotation(&mut self) -> Result<Type, ParseError> {
        if self.match_token(TokenKind::LeftBracket) {
            let element = self.type_annotation()?;
            self.consume(TokenKind::RightBracket, "expected ']' after list element type")?;
            return Ok(Type::list_of(element));
        }

        if self.match_token(TokenKind::Dict) {
            self.consume(TokenKind::LeftBracket, "expected '[' after 'Dict'")?;
            let key = self.type_annotation()?;
            self.consume(TokenKind::Comma, "expected ',' between dict key and value types")?;
            let value = self.type_annotation()?;
            self.consume(TokenKind::RightBracket, "expected ']' after dict value type")?;
            return Ok(Type::dict_of(key, value));
        }

        if self.match_token(TokenKind::Int) {
            return Ok(Type::Int);
        }
        if self.match_token(TokenKind::Float) {
            return Ok(Type::Float);
        }
        if self.match_token(TokenKind::Bool) {
            return Ok(Type::Bool);
        }
        if self.match_token(TokenKind::Str) {
            return Ok(Type::Str);
        }

        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            // Stand-in for a struct or enum; resolved during analysis.
            return Ok(Type::Struct(token.lexeme.clone()));
        }

        Err(self.error_at_current("expected type name", ParseErrorKind::ExpectedType))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().kind {
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Return => self.return_stmt(),
            TokenKind::Break => {
                let span = self.advance().span;
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span,
                })
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span,
                })
            }
            TokenKind::Print => self.print_stmt(),
            TokenKind::LeftBrace => {
                let block = self.block()?;
                let span = block.span;
                Ok(Stmt {
                    kind: StmtKind::Block(block),
                    span,
                })
            }
            _ => self.assign_or_expr_stmt(),
        }
    }

    /// Assignments and expression statements share the same start: parse
    /// an expression, then a following `=` reclassifies it as a target.
    fn assign_or_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;

        if self.match_token(TokenKind::Equal) {
            let value = self.expression()?;
            let span = expr.span.merge(&value.span);
            let target = self.expr_to_assign_target(expr)?;
            return Ok(Stmt {
                kind: StmtKind::Assign { target, value },
                span,
            });
        }

        let span = expr.span;
        Ok(Stmt {
            kind: StmtKind::Expr(expr),
            span,
        })
    }

    fn expr_to_assign_target(&self, expr: Expr) -> Result<AssignTarget, ParseError> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Ident(name) => Ok(AssignTarget::Name { name, span }),
            ExprKind::Index { target, index } => Ok(AssignTarget::Index {
                target: *target,
                index: *index,
                span,
            }),
            ExprKind::Member { object, field } => Ok(AssignTarget::Member {
                object: *object,
                field,
                span,
            }),
            _ => Err(self.error_at(
                "invalid assignment target",
                ParseErrorKind::InvalidSyntax,
                span,
            )),
        }
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // consume 'if'
        let condition = self.expression()?;
        let then_block = self.block()?;

        let else_block = if self.match_token(TokenKind::Else) {
            Some(self.block()?)
        } else {
            None
        };

        let end_span = else_block
            .as_ref()
            .map(|b| b.span)
            .unwrap_or(then_block.span);
        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                then_block,
                else_block,
            },
            span: start.merge(&end_span),
        })
    }

    fn while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // consume 'while'
        let condition = self.expression()?;
        let body = self.block()?;
        let span = start.merge(&body.span);
        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            span,
        })
    }

    fn for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // consume 'for'
        let (variable, _) = self.consume_identifier("expected loop variable after 'for'")?;
        self.consume(TokenKind::In, "expected 'in' after loop variable")?;
        let iterable = self.expression()?;
        let body = self.block()?;
        let span = start.merge(&body.span);
        Ok(Stmt {
            kind: StmtKind::For {
                variable,
                iterable,
                body,
            },
            span,
        })
    }

    fn return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // consume 'return'
        let value = self.expression()?;
        let span = start.merge(&value.span);
        Ok(Stmt {
            kind: StmtKind::Return(value),
            span,
        })
    }

    /// print_stmt → "print" "(" args? ")"
    ///
    /// Positional arguments come first; `sep=` and `end=` each at most
    /// once, after all positionals.
    fn print_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // consume 'print'
        self.consume(TokenKind::LeftParen, "expected '(' after 'print'")?;

        let mut arguments = Vec::new();
        let mut sep = None;
        let mut end = None;

        if !self.check(TokenKind::RightParen) {
            loop {
                if self.check(TokenKind::Sep) {
                    let kw_span = self.advance().span;
                    self.consume(TokenKind::Equal, "expected '=' after 'sep'")?;
                    if sep.is_some() {
                        return Err(self.error_at(
                            "duplicate 'sep' parameter",
                            ParseErrorKind::InvalidSyntax,
                            kw_span,
                        ));
                    }
                    sep = Some(self.expression()?);
                } else if self.check(TokenKind::End) {
                    let kw_span = self.advance().span;
                    self.consume(TokenKind::Equal, "expected '=' after 'end'")?;
                    if end.is_some() {
                        return Err(self.error_at(
                            "duplicate 'end' parameter",
                            ParseErrorKind::InvalidSyntax,
                            kw_span,
                        ));
                    }
                    end = Some(self.expression()?);
                } else {
                    if sep.is_some() || end.is_some() {
                        return Err(self.error_at_current(
                            "positional argument after 'sep' or 'end'",
                            ParseErrorKind::InvalidSyntax,
                        ));
                    }
                    arguments.push(self.expression()?);
                }
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        let end_token = self.consume(TokenKind::RightParen, "expected ')' after print arguments")?;
        let span = start.merge(&end_token.span);
        Ok(Stmt {
            kind: StmtKind::Print(PrintStmt {
                arguments,
                sep,
                end,
            }),
            span,
        })
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        let start = self.consume(TokenKind::LeftBrace, "expected '{'")?.span;

        let mut items = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            match self.declaration() {
                Ok(decl) => items.push(decl),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize_statement();
                }
            }
        }

        let end = self.consume(TokenKind::RightBrace, "expected '}' after block")?;
        let span = start.merge(&end.span);
        Ok(Block { items, span })
    }

    // =========================================================================
    // Expressions (precedence climbing)
    // =========================================================================

    /// expression → range_expr
    /// range_expr → logic_or (".." logic_or)?
    ///
    /// Range is non-associative: `a..b..c` is rejected when the second
    /// `..` is seen by the caller's context.
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let left = self.logic_or()?;

        if self.match_token(TokenKind::DotDot) {
            let right = self.logic_or()?;
            let span = left.span.merge(&right.span);
            return Ok(Expr::new(
                ExprKind::Range {
                    start: Box::new(left),
                    end: Box::new(right),
                },
                span,
            ));
        }

        Ok(left)
    }

    fn logic_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.logic_and()?;
        while self.match_token(TokenKind::PipePipe) {
            let right = self.logic_and()?;
            let span = expr.span.merge(&right.span);
            expr = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;
        while self.match_token(TokenKind::AmpAmp) {
            let right = self.equality()?;
            let span = expr.span.merge(&right.span);
            expr = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::And,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            let span = expr.span.merge(&right.span);
            expr = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            let span = expr.span.merge(&right.span);
            expr = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            let span = expr.span.merge(&right.span);
            expr = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            let span = expr.span.merge(&right.span);
            expr = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };

        if let Some(op) = op {
            let start = self.advance().span;
            let operand = self.unary()?; // right-associative
            let span = start.merge(&operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        self.postfix()
    }

    /// postfix → primary ( "(" args ")" | "[" expr "]" | "." IDENT "("? )*
    ///
    /// `recv.name(` becomes a method call node directly; `recv.name`
    /// without a following `(` is a member access, which the analyzer may
    /// later reclassify as an enum variant access.
    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(TokenKind::LeftParen) {
                let callee = match &expr.kind {
                    ExprKind::Ident(name) => name.clone(),
                    _ => {
                        return Err(self.error_at(
                            "can only call named functions",
                            ParseErrorKind::InvalidSyntax,
                            expr.span,
                        ));
                    }
                };
                let args = self.arg_list()?;
                let end = self.consume(TokenKind::RightParen, "expected ')' after arguments")?;
                let span = expr.span.merge(&end.span);
                expr = Expr::new(ExprKind::Call { callee, args }, span);
            } else if self.match_token(TokenKind::LeftBracket) {
                let index = self.expression()?;
                let end = self.consume(TokenKind::RightBracket, "expected ']' after index")?;
                let span = expr.span.merge(&end.span);
                expr = Expr::new(
                    ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.match_token(TokenKind::Dot) {
                let (name, name_span) = self.consume_identifier("expected name after '.'")?;
                if self.match_token(TokenKind::LeftParen) {
                    let args = self.arg_list()?;
                    let end = self.consume(TokenKind::RightParen, "expected ')' after arguments")?;
                    let span = expr.span.merge(&end.span);
                    expr = Expr::new(
                        ExprKind::MethodCall {
                            receiver: Box::new(expr),
                            method: name,
                            args,
                        },
                        span,
                    );
                } else {
                    let span = expr.span.merge(&name_span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            field: name,
                        },
                        span,
                    );
                }
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn arg_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.peek().span;

        match self.peek().kind {
            TokenKind::IntLit => {
                let token = self.advance();
                let value = match token.literal {
                    Some(Literal::Int(v)) => v,
                    _ => 0,
                };
                Ok(Expr::int_lit(value, span))
            }
            TokenKind::FloatLit => {
                let token = self.advance();
                let value = match token.literal {
                    Some(Literal::Float(v)) => v,
                    _ => 0.0,
                };
                let lexeme = token.lexeme.clone();
                Ok(Expr::new(ExprKind::FloatLit { value, lexeme }, span))
            }
            TokenKind::StringLit => {
                let token = self.advance();
                let value = match &token.literal {
                    Some(Literal::Str(s)) => s.clone(),
                    _ => String::new(),
                };
                let lexeme = token.lexeme.clone();
                Ok(Expr::new(ExprKind::StringLit { value, lexeme }, span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLit(true), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLit(false), span))
            }
            TokenKind::Identifier => {
                let token = self.advance();
                let name = token.lexeme.clone();
                // Struct initializer: IDENT { IDENT : ... }. A block after
                // an identifier (e.g. the body of `for x in xs { ... }`)
                // never starts with `IDENT :`, which disambiguates. Empty
                // braces stay a block; empty structs are not initializable
                // inline.
                if self.check(TokenKind::LeftBrace)
                    && self.peek_n(1).kind == TokenKind::Identifier
                    && self.peek_n(2).kind == TokenKind::Colon
                {
                    return self.struct_init(name, span);
                }
                Ok(Expr::ident(name, span))
            }
            // Casting builtins reuse the type keywords: int(x), float(x),
            // str(x), bool(x).
            TokenKind::Int | TokenKind::Float | TokenKind::Str | TokenKind::Bool
                if self.peek_n(1).kind == TokenKind::LeftParen =>
            {
                let token = self.advance();
                Ok(Expr::ident(token.lexeme.clone(), span))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "expected ')' after expression")?;
                // Parentheses are resolved here; the emitter wraps every
                // binary expression defensively, so no group node is kept.
                Ok(expr)
            }
            TokenKind::LeftBracket => self.list_literal(),
            TokenKind::LeftBrace => self.dict_literal(),
            _ => Err(self.error_at_current(
                "expected expression",
                ParseErrorKind::ExpectedExpression,
            )),
        }
    }

    fn list_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance().span; // consume '['
        let mut elements = Vec::new();

        if !self.check(TokenKind::RightBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
                // trailing comma
                if self.check(TokenKind::RightBracket) {
                    break;
                }
            }
        }

        let end = self.consume(TokenKind::RightBracket, "expected ']' after list elements")?;
        let span = start.merge(&end.span);
        Ok(Expr::new(ExprKind::ListLit(elements), span))
    }

    /// dict_literal → "{" (expr ":" expr ("," expr ":" expr)* ","?)? "}"
    ///
    /// Only reached in expression position; statement position treats a
    /// leading `{` as a block.
    fn dict_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance().span; // consume '{'
        let mut entries = Vec::new();

        if !self.check(TokenKind::RightBrace) {
            loop {
                let key = self.expression()?;
                self.consume(TokenKind::Colon, "expected ':' after dict key")?;
                let value = self.expression()?;
                entries.push((key, value));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RightBrace) {
                    break;
                }
            }
        }

        let end = self.consume(TokenKind::RightBrace, "expected '}' after dict entries")?;
        let span = start.merge(&end.span);
        Ok(Expr::new(ExprKind::DictLit(entries), span))
    }

    fn struct_init(&mut self, name: String, name_span: Span) -> Result<Expr, ParseError> {
        self.consume(TokenKind::LeftBrace, "expected '{' after struct name")?;

        let mut fields = Vec::new();
        if !self.check(TokenKind::RightBrace) {
            loop {
                let (field_name, field_span) = self.consume_identifier("expected field name")?;
                self.consume(TokenKind::Colon, "expected ':' after field name")?;
                let value = self.expression()?;
                let span = field_span.merge(&value.span);
                fields.push(FieldInit {
                    name: field_name,
                    value,
                    span,
                });
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RightBrace) {
                    break;
                }
            }
        }

        let end = self.consume(TokenKind::RightBrace, "expected '}' after struct fields")?;
        let span = name_span.merge(&end.span);
        Ok(Expr::new(ExprKind::StructInit { name, fields }, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "lex errors: {:?}", errors);
        Parser::new(tokens, "test.qsr").parse()
    }

    fn parse_ok(source: &str) -> Program {
        parse(source).expect("expected successful parse")
    }

    fn first_stmt(program: &Program) -> &Stmt {
        match &program.items[0] {
            Decl::Stmt(s) => s,
            other => panic!("expected statement, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_program() {
        let program = parse_ok("");
        assert!(program.items.is_empty());
    }

    #[test]
    fn test_var_decl() {
        let program = parse_ok("let x: int = 42");
        match &program.items[0] {
            Decl::Var(decl) => {
                assert_eq!(decl.name, "x");
                assert_eq!(decl.ty, Type::Int);
                assert!(matches!(decl.initializer.kind, ExprKind::IntLit(42)));
            }
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn test_const_decl_with_list_type() {
        let program = parse_ok("const XS: [int] = [1, 2, 3]");
        match &program.items[0] {
            Decl::Const(decl) => {
                assert_eq!(decl.ty, Type::list_of(Type::Int));
                assert!(matches!(&decl.initializer.kind, ExprKind::ListLit(es) if es.len() == 3));
            }
            other => panic!("expected const decl, got {:?}", other),
        }
    }

    #[test]
    fn test_dict_type_annotation() {
        let program = parse_ok(r#"let d: Dict[str, int] = {"a": 1}"#);
        match &program.items[0] {
            Decl::Var(decl) => {
                assert_eq!(decl.ty, Type::dict_of(Type::Str, Type::Int));
                assert!(matches!(&decl.initializer.kind, ExprKind::DictLit(es) if es.len() == 1));
            }
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_dict_literal() {
        let program = parse_ok("let d: Dict[str, int] = {}");
        match &program.items[0] {
            Decl::Var(decl) => {
                assert!(matches!(&decl.initializer.kind, ExprKind::DictLit(es) if es.is_empty()));
            }
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn test_fn_decl() {
        let program = parse_ok("fn add(a: int, b: int) -> int { return a + b }");
        match &program.items[0] {
            Decl::Fn(decl) => {
                assert_eq!(decl.name, "add");
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.return_type, Type::Int);
                assert_eq!(decl.body.items.len(), 1);
            }
            other => panic!("expected fn decl, got {:?}", other),
        }
    }

    #[test]
    fn test_fn_requires_return_type() {
        assert!(parse("fn f() { return 1 }").is_err());
    }

    #[test]
    fn test_precedence() {
        let program = parse_ok("let x: int = 2 + 3 * 4");
        match &program.items[0] {
            Decl::Var(decl) => match &decl.initializer.kind {
                ExprKind::Binary { op, right, .. } => {
                    assert_eq!(*op, BinaryOp::Add);
                    assert!(matches!(
                        right.kind,
                        ExprKind::Binary { op: BinaryOp::Mul, .. }
                    ));
                }
                other => panic!("expected binary, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parenthesized_grouping() {
        let program = parse_ok("let x: int = (2 + 3) * 4");
        match &program.items[0] {
            Decl::Var(decl) => match &decl.initializer.kind {
                ExprKind::Binary { op, left, .. } => {
                    assert_eq!(*op, BinaryOp::Mul);
                    assert!(matches!(
                        left.kind,
                        ExprKind::Binary { op: BinaryOp::Add, .. }
                    ));
                }
                other => panic!("expected binary, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unary_right_associative() {
        let program = parse_ok("let b: bool = !!true");
        match &program.items[0] {
            Decl::Var(decl) => match &decl.initializer.kind {
                ExprKind::Unary { op, operand } => {
                    assert_eq!(*op, UnaryOp::Not);
                    assert!(matches!(operand.kind, ExprKind::Unary { .. }));
                }
                other => panic!("expected unary, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_if_else() {
        let program = parse_ok("if x > 0 { print(1) } else { print(2) }");
        match &first_stmt(&program).kind {
            StmtKind::If { else_block, .. } => assert!(else_block.is_some()),
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_for_range() {
        let program = parse_ok("for i in 0..10 { print(i) }");
        match &first_stmt(&program).kind {
            StmtKind::For { variable, iterable, .. } => {
                assert_eq!(variable, "i");
                assert!(matches!(iterable.kind, ExprKind::Range { .. }));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_for_over_list_variable() {
        let program = parse_ok("for x in items { print(x) }");
        match &first_stmt(&program).kind {
            StmtKind::For { iterable, .. } => {
                assert!(matches!(&iterable.kind, ExprKind::Ident(name) if name == "items"));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_targets() {
        let program = parse_ok("x = 1\nxs[0] = 2\np.x = 3\nl.start.x = 4");
        let targets: Vec<_> = program
            .items
            .iter()
            .map(|d| match d {
                Decl::Stmt(Stmt {
                    kind: StmtKind::Assign { target, .. },
                    ..
                }) => target,
                other => panic!("expected assignment, got {:?}", other),
            })
            .collect();
        assert!(matches!(targets[0], AssignTarget::Name { name, .. } if name == "x"));
        assert!(matches!(targets[1], AssignTarget::Index { .. }));
        assert!(matches!(targets[2], AssignTarget::Member { .. }));
        // Nested member target: object is itself a member access.
        match targets[3] {
            AssignTarget::Member { object, field, .. } => {
                assert_eq!(field, "x");
                assert!(matches!(&object.kind, ExprKind::Member { .. }));
            }
            other => panic!("expected member target, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let errors = parse("1 + 2 = 3").unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ParseErrorKind::InvalidSyntax));
    }

    #[test]
    fn test_struct_decl_and_init() {
        let program = parse_ok(
            "struct Point { x: int, y: int }\nlet p: Point = Point { x: 1, y: 2 }",
        );
        assert!(matches!(&program.items[0], Decl::Struct(s) if s.fields.len() == 2));
        match &program.items[1] {
            Decl::Var(decl) => {
                assert_eq!(decl.ty, Type::Struct("Point".to_string()));
                assert!(matches!(
                    &decl.initializer.kind,
                    ExprKind::StructInit { name, fields } if name == "Point" && fields.len() == 2
                ));
            }
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn test_struct_init_not_confused_with_block() {
        // `flag { print(1) }` must not parse as a struct initializer:
        // the token after `{` is not `IDENT :`.
        let program = parse_ok("if flag { print(1) }");
        assert!(matches!(
            first_stmt(&program).kind,
            StmtKind::If { .. }
        ));
    }

    #[test]
    fn test_enum_decl() {
        let program = parse_ok("enum Color { Red, Green, Blue }");
        match &program.items[0] {
            Decl::Enum(decl) => {
                assert_eq!(decl.name, "Color");
                let names: Vec<_> = decl.variants.iter().map(|v| v.name.as_str()).collect();
                assert_eq!(names, vec!["Red", "Green", "Blue"]);
            }
            other => panic!("expected enum decl, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_access_parses_as_member() {
        let program = parse_ok("let c: Color = Color.Red");
        match &program.items[0] {
            Decl::Var(decl) => {
                assert!(matches!(
                    &decl.initializer.kind,
                    ExprKind::Member { field, .. } if field == "Red"
                ));
            }
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn test_method_call_vs_member() {
        let program = parse_ok("let n: int = s.len()\nlet v: int = p.x");
        match &program.items[0] {
            Decl::Var(decl) => assert!(matches!(
                &decl.initializer.kind,
                ExprKind::MethodCall { method, .. } if method == "len"
            )),
            _ => unreachable!(),
        }
        match &program.items[1] {
            Decl::Var(decl) => assert!(matches!(
                &decl.initializer.kind,
                ExprKind::Member { field, .. } if field == "x"
            )),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_chained_postfix() {
        let program = parse_ok("let x: int = grid[0][1]");
        match &program.items[0] {
            Decl::Var(decl) => match &decl.initializer.kind {
                ExprKind::Index { target, .. } => {
                    assert!(matches!(target.kind, ExprKind::Index { .. }));
                }
                other => panic!("expected index, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_imports() {
        let program = parse_ok("import math\nimport \"./util.qsr\"");
        assert!(matches!(
            &program.items[0],
            Decl::Import(d) if !d.is_local && d.module == "math"
        ));
        assert!(matches!(
            &program.items[1],
            Decl::Import(d) if d.is_local && d.module == "./util.qsr"
        ));
    }

    #[test]
    fn test_print_with_named_params() {
        let program = parse_ok(r#"print(1, 2, sep=", ", end="!")"#);
        match &first_stmt(&program).kind {
            StmtKind::Print(p) => {
                assert_eq!(p.arguments.len(), 2);
                assert!(p.sep.is_some());
                assert!(p.end.is_some());
            }
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_print_duplicate_sep_rejected() {
        let errors = parse(r#"print(1, sep=",", sep=";")"#).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("duplicate 'sep'")));
    }

    #[test]
    fn test_print_positional_after_named_rejected() {
        let errors = parse(r#"print(1, sep=",", 2)"#).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("positional argument after")));
    }

    #[test]
    fn test_cast_call() {
        let program = parse_ok(r#"let n: int = int("42")"#);
        match &program.items[0] {
            Decl::Var(decl) => assert!(matches!(
                &decl.initializer.kind,
                ExprKind::Call { callee, .. } if callee == "int"
            )),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_error_recovery_reports_multiple() {
        let errors = parse("let = 1\nlet y: = 2").unwrap_err();
        assert!(errors.len() >= 2);
    }

    #[test]
    fn test_no_partial_tree_on_error() {
        assert!(parse("let x: int = 1\nfn broken( { }").is_err());
    }

    #[test]
    fn test_spans_cover_declaration() {
        let program = parse_ok("let x: int = 1 + 2");
        let span = program.items[0].span();
        assert_eq!(span.start_line, 1);
        assert_eq!(span.start_column, 1);
        assert!(span.end_column > span.start_column);
    }

    #[test]
    fn test_nested_blocks() {
        let program = parse_ok("{ let x: int = 1 { let y: int = 2 } }");
        match &first_stmt(&program).kind {
            StmtKind::Block(block) => assert_eq!(block.items.len(), 2),
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_range_is_non_associative() {
        assert!(parse("for i in 0..5..10 { print(i) }").is_err());
    }
}
