//! Semantic analysis for Quasar.
//!
//! The analyzer enforces the closed type system over a single compilation
//! unit, transitively including imported local files:
//!
//! - scope rules (declare before use, no redeclaration in a frame)
//! - type compatibility with no implicit coercion
//! - user-defined type registration and resolution (structs, enums)
//! - primitive-method dispatch with generic parameter substitution
//! - builtin functions and the `File`/`Env` static modules
//! - `print` validation including format-string arity
//! - control flow (`break`/`continue` depth, return-path analysis)
//! - module imports, driven through an [`ImportResolver`]
//!
//! Every expression node is annotated with its resolved type. A
//! diagnostic abandons the enclosing top-level declaration; the remaining
//! declarations are still analyzed, so one run reports several
//! independent errors.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::methods::{self, Family, MethodSig};
use crate::frontend::parser::Parser;
use crate::utils::errors::{Diagnostic, ErrorCode, SemanticError};
use crate::utils::location::Span;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// Supplies the source text of imported local files.
///
/// The analyzer drives the import traversal; the caller implements the
/// file-system access. `resolve` returns the canonical path (used to
/// detect re-entry) together with the file's contents.
pub trait ImportResolver {
    /// Resolve `relative` against `base_dir`.
    fn resolve(&mut self, base_dir: &Path, relative: &str) -> io::Result<(PathBuf, String)>;
}

/// The standard resolver: reads imported files from disk.
#[derive(Debug, Default)]
pub struct FsImportResolver;

impl ImportResolver for FsImportResolver {
    fn resolve(&mut self, base_dir: &Path, relative: &str) -> io::Result<(PathBuf, String)> {
        let joined = base_dir.join(relative);
        let canonical = joined.canonicalize()?;
        let source = std::fs::read_to_string(&canonical)?;
        Ok((canonical, source))
    }
}

/// A resolver that refuses every import; for single-file analysis.
#[derive(Debug, Default)]
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve(&mut self, _base_dir: &Path, relative: &str) -> io::Result<(PathBuf, String)> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("imports are not available here: {}", relative),
        ))
    }
}

/// A symbol bound in some scope.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// The symbol's type; functions use [`Type::Function`], imported
    /// modules [`Type::Module`]
    pub ty: Type,
    /// Constants, functions, modules, and loop variables reject assignment
    pub is_const: bool,
}

/// A stack of lexical scopes.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
}

impl SymbolTable {
    /// Create a table with the outermost (module) scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Push a new innermost scope.
    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope.
    pub fn exit_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the module scope");
        self.scopes.pop();
    }

    /// Define a name in the innermost scope. Returns false if the name
    /// already exists in that scope (shadowing outer scopes is fine).
    pub fn define(&mut self, name: &str, symbol: Symbol) -> bool {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(name.to_string(), symbol);
        true
    }

    /// Look up a name, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered struct: ordered field list.
#[derive(Debug, Clone)]
pub struct StructInfo {
    /// Fields in declaration order, with resolved types
    pub fields: Vec<(String, Type)>,
}

impl StructInfo {
    fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

/// A registered enum: ordered variant list.
#[derive(Debug, Clone)]
pub struct EnumInfo {
    /// Variants in declaration order
    pub variants: Vec<String>,
}

/// An exported top-level symbol of a local module.
#[derive(Debug, Clone)]
enum Export {
    Function { params: Vec<Type>, ret: Type },
    Struct(StructInfo),
    Enum(EnumInfo),
}

type ModuleExports = HashMap<String, Export>;

/// What an imported module binding refers to.
#[derive(Debug, Clone)]
enum ModuleInfo {
    /// An opaque Python module: every member is `Any`
    Opaque,
    /// A compiled local `.qsr` file with its exported symbols
    Local(ModuleExports),
}

/// Per-compilation-unit analyzer state.
struct UnitContext {
    symbols: SymbolTable,
    structs: HashMap<String, StructInfo>,
    enums: HashMap<String, EnumInfo>,
    modules: HashMap<String, ModuleInfo>,
    imports_seen: HashSet<String>,
    loop_depth: usize,
    current_return: Option<Type>,
    file: String,
    base_dir: PathBuf,
}

impl UnitContext {
    fn new(file: String, base_dir: PathBuf) -> Self {
        Self {
            symbols: SymbolTable::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
            modules: HashMap::new(),
            imports_seen: HashSet::new(),
            loop_depth: 0,
            current_return: None,
            file,
            base_dir,
        }
    }
}

/// The semantic analyzer. One instance analyzes one root program plus
/// everything it transitively imports.
pub struct SemanticAnalyzer<'r> {
    resolver: &'r mut dyn ImportResolver,
    /// Canonical paths currently on the import stack; re-entry means a
    /// circular import, which is deferred to the Python loader
    in_progress: HashSet<PathBuf>,
    /// Finished units, so diamond imports compile once
    completed: HashMap<PathBuf, ModuleExports>,
    diagnostics: Vec<Diagnostic>,
}

/// Analyze a program in place, resolving imports through `resolver`.
///
/// On success every expression carries its resolved type. On failure the
/// accumulated diagnostics are returned and the tree must not be emitted.
pub fn analyze(
    program: &mut Program,
    resolver: &mut dyn ImportResolver,
) -> Result<(), Vec<Diagnostic>> {
    let mut analyzer = SemanticAnalyzer::new(resolver);
    analyzer.run(program)
}

impl<'r> SemanticAnalyzer<'r> {
    /// Create an analyzer using the given import resolver.
    pub fn new(resolver: &'r mut dyn ImportResolver) -> Self {
        Self {
            resolver,
            in_progress: HashSet::new(),
            completed: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Analyze the root program.
    pub fn run(&mut self, program: &mut Program) -> Result<(), Vec<Diagnostic>> {
        let root = Path::new(&program.file);
        let base_dir = root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        // Mark the root on the import stack so an import cycle that
        // reaches back to it does not recompile it.
        if let Ok(canonical) = root.canonicalize() {
            self.in_progress.insert(canonical);
        }
        self.analyze_unit(program, base_dir);

        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.diagnostics))
        }
    }

    /// Analyze one compilation unit and collect its exports.
    fn analyze_unit(&mut self, program: &mut Program, base_dir: PathBuf) -> ModuleExports {
        let mut ctx = UnitContext::new(program.file.clone(), base_dir);

        for item in &mut program.items {
            if let Err(err) = self.analyze_decl(&mut ctx, item) {
                self.diagnostics.push(err.into_diagnostic(&ctx.file));
            }
        }

        // Exported surface of this unit: top-level functions, structs,
        // and enums, in whatever state analysis left them.
        let mut exports = ModuleExports::new();
        for item in &program.items {
            match item {
                Decl::Fn(f) => {
                    if let Some(Symbol {
                        ty: Type::Function(params, ret),
                        ..
                    }) = ctx.symbols.lookup(&f.name)
                    {
                        exports.insert(
                            f.name.clone(),
                            Export::Function {
                                params: params.clone(),
                                ret: (**ret).clone(),
                            },
                        );
                    }
                }
                Decl::Struct(s) => {
                    if let Some(info) = ctx.structs.get(&s.name) {
                        exports.insert(s.name.clone(), Export::Struct(info.clone()));
                    }
                }
                Decl::Enum(e) => {
                    if let Some(info) = ctx.enums.get(&e.name) {
                        exports.insert(e.name.clone(), Export::Enum(info.clone()));
                    }
                }
                _ => {}
            }
        }
        exports
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn analyze_decl(&mut self, ctx: &mut UnitContext, decl: &mut Decl) -> Result<(), SemanticError> {
        match decl {
            Decl::Var(d) => self.analyze_var_decl(ctx, d),
            Decl::Const(d) => self.analyze_const_decl(ctx, d),
            Decl::Fn(d) => self.analyze_fn_decl(ctx, d),
            Decl::Struct(d) => self.analyze_struct_decl(ctx, d),
            Decl::Enum(d) => self.analyze_enum_decl(ctx, d),
            Decl::Import(d) => self.analyze_import(ctx, d),
            Decl::Stmt(s) => self.analyze_stmt(ctx, s),
        }
    }

    fn check_reserved(&self, name: &str, span: Span) -> Result<(), SemanticError> {
        if methods::is_builtin_module(name) {
            return Err(SemanticError::new(
                ErrorCode::E0205,
                format!("cannot shadow builtin module '{}'", name),
                span,
            ));
        }
        Ok(())
    }

    fn analyze_var_decl(
        &mut self,
        ctx: &mut UnitContext,
        decl: &mut VarDecl,
    ) -> Result<(), SemanticError> {
        self.check_reserved(&decl.name, decl.span)?;
        let declared = self.resolve_type(ctx, &decl.ty, decl.span)?;
        let actual = self.expr_type(ctx, &mut decl.initializer)?;

        if !types_compatible(&declared, &actual) {
            return Err(SemanticError::new(
                ErrorCode::E0100,
                format!("type mismatch: expected {}, got {}", declared, actual),
                decl.initializer.span,
            ));
        }

        if !ctx.symbols.define(&decl.name, Symbol { ty: declared, is_const: false }) {
            return Err(SemanticError::new(
                ErrorCode::E0002,
                format!("redeclaration of '{}' in the same scope", decl.name),
                decl.span,
            ));
        }
        Ok(())
    }

    fn analyze_const_decl(
        &mut self,
        ctx: &mut UnitContext,
        decl: &mut ConstDecl,
    ) -> Result<(), SemanticError> {
        self.check_reserved(&decl.name, decl.span)?;
        let declared = self.resolve_type(ctx, &decl.ty, decl.span)?;
        let actual = self.expr_type(ctx, &mut decl.initializer)?;

        if !types_compatible(&declared, &actual) {
            return Err(SemanticError::new(
                ErrorCode::E0100,
                format!("type mismatch: expected {}, got {}", declared, actual),
                decl.initializer.span,
            ));
        }

        if !ctx.symbols.define(&decl.name, Symbol { ty: declared, is_const: true }) {
            return Err(SemanticError::new(
                ErrorCode::E0002,
                format!("redeclaration of '{}' in the same scope", decl.name),
                decl.span,
            ));
        }
        Ok(())
    }

    fn analyze_fn_decl(
        &mut self,
        ctx: &mut UnitContext,
        decl: &mut FnDecl,
    ) -> Result<(), SemanticError> {
        self.check_reserved(&decl.name, decl.span)?;

        let mut param_types = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            param_types.push(self.resolve_type(ctx, &param.ty, param.span)?);
        }
        let return_type = self.resolve_type(ctx, &decl.return_type, decl.span)?;

        // Defined before the body so direct recursion resolves.
        let signature = Type::Function(param_types.clone(), Box::new(return_type.clone()));
        if !ctx.symbols.define(&decl.name, Symbol { ty: signature, is_const: true }) {
            return Err(SemanticError::new(
                ErrorCode::E0002,
                format!("redeclaration of '{}' in the same scope", decl.name),
                decl.span,
            ));
        }

        ctx.symbols.enter_scope();
        let prev_return = ctx.current_return.replace(return_type);
        let prev_depth = std::mem::replace(&mut ctx.loop_depth, 0);

        let result = (|| {
            for (param, ty) in decl.params.iter().zip(param_types) {
                self.check_reserved(&param.name, param.span)?;
                if !ctx.symbols.define(&param.name, Symbol { ty, is_const: false }) {
                    return Err(SemanticError::new(
                        ErrorCode::E0002,
                        format!("redeclaration of parameter '{}'", param.name),
                        param.span,
                    ));
                }
            }
            for item in &mut decl.body.items {
                self.analyze_decl(ctx, item)?;
            }
            Ok(())
        })();

        ctx.current_return = prev_return;
        ctx.loop_depth = prev_depth;
        ctx.symbols.exit_scope();
        result?;

        if !block_guarantees_return(&decl.body) {
            return Err(SemanticError::new(
                ErrorCode::E0303,
                format!("function '{}' does not return on all paths", decl.name),
                decl.span,
            ));
        }
        Ok(())
    }

    fn analyze_struct_decl(
        &mut self,
        ctx: &mut UnitContext,
        decl: &StructDecl,
    ) -> Result<(), SemanticError> {
        self.check_reserved(&decl.name, decl.span)?;

        if ctx.structs.contains_key(&decl.name) || ctx.enums.contains_key(&decl.name) {
            return Err(SemanticError::new(
                ErrorCode::E0800,
                format!("duplicate type name '{}'", decl.name),
                decl.span,
            ));
        }

        let mut fields: Vec<(String, Type)> = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            if fields.iter().any(|(n, _)| n == &field.name) {
                return Err(SemanticError::new(
                    ErrorCode::E0801,
                    format!("duplicate field '{}' in struct '{}'", field.name, decl.name),
                    field.span,
                ));
            }
            let ty = self.resolve_type(ctx, &field.ty, field.span)?;
            fields.push((field.name.clone(), ty));
        }

        ctx.structs.insert(decl.name.clone(), StructInfo { fields });
        Ok(())
    }

    fn analyze_enum_decl(
        &mut self,
        ctx: &mut UnitContext,
        decl: &EnumDecl,
    ) -> Result<(), SemanticError> {
        self.check_reserved(&decl.name, decl.span)?;

        if ctx.enums.contains_key(&decl.name) || ctx.structs.contains_key(&decl.name) {
            return Err(SemanticError::new(
                ErrorCode::E1200,
                format!("duplicate type name '{}'", decl.name),
                decl.span,
            ));
        }

        let mut variants: Vec<String> = Vec::with_capacity(decl.variants.len());
        for variant in &decl.variants {
            if variants.contains(&variant.name) {
                return Err(SemanticError::new(
                    ErrorCode::E1201,
                    format!("duplicate variant '{}' in enum '{}'", variant.name, decl.name),
                    variant.span,
                ));
            }
            variants.push(variant.name.clone());
        }

        ctx.enums.insert(decl.name.clone(), EnumInfo { variants });
        Ok(())
    }

    fn analyze_import(
        &mut self,
        ctx: &mut UnitContext,
        decl: &ImportDecl,
    ) -> Result<(), SemanticError> {
        if ctx.imports_seen.contains(&decl.module) {
            return Err(SemanticError::new(
                ErrorCode::E0900,
                format!("duplicate import of '{}'", decl.module),
                decl.span,
            ));
        }
        ctx.imports_seen.insert(decl.module.clone());

        let binding = decl.binding_name();
        self.check_reserved(&binding, decl.span)?;

        if ctx.modules.contains_key(&binding) {
            return Err(SemanticError::new(
                ErrorCode::E0900,
                format!("import '{}' conflicts with an earlier import", binding),
                decl.span,
            ));
        }

        let info = if decl.is_local {
            ModuleInfo::Local(self.compile_import(ctx, decl)?)
        } else {
            ModuleInfo::Opaque
        };

        ctx.modules.insert(binding.clone(), info);
        if !ctx
            .symbols
            .define(&binding, Symbol { ty: Type::Module(binding.clone()), is_const: true })
        {
            return Err(SemanticError::new(
                ErrorCode::E0002,
                format!("redeclaration of '{}' in the same scope", binding),
                decl.span,
            ));
        }
        Ok(())
    }

    /// Lex, parse, and analyze an imported local file, returning its
    /// exported symbols. Diagnostics from the imported unit surface with
    /// that unit's file identity.
    fn compile_import(
        &mut self,
        ctx: &UnitContext,
        decl: &ImportDecl,
    ) -> Result<ModuleExports, SemanticError> {
        let (canonical, source) = self
            .resolver
            .resolve(&ctx.base_dir, &decl.module)
            .map_err(|err| {
                SemanticError::new(
                    ErrorCode::E0901,
                    format!("cannot resolve import '{}': {}", decl.module, err),
                    decl.span,
                )
            })?;

        if let Some(exports) = self.completed.get(&canonical) {
            return Ok(exports.clone());
        }
        if self.in_progress.contains(&canonical) {
            // Circular import: hand back what is known so far and let the
            // Python loader surface any true cycle at runtime.
            return Ok(ModuleExports::new());
        }

        let file = canonical.display().to_string();
        let (tokens, lex_errors) = Lexer::new(&source).tokenize();
        if !lex_errors.is_empty() {
            self.diagnostics
                .extend(lex_errors.into_iter().map(|e| e.into_diagnostic(&file)));
            return Ok(ModuleExports::new());
        }

        let mut program = match Parser::new(tokens, file.clone()).parse() {
            Ok(program) => program,
            Err(errors) => {
                self.diagnostics
                    .extend(errors.into_iter().map(|e| e.into_diagnostic(&file)));
                return Ok(ModuleExports::new());
            }
        };

        let base_dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        self.in_progress.insert(canonical.clone());
        let exports = self.analyze_unit(&mut program, base_dir);
        self.in_progress.remove(&canonical);
        self.completed.insert(canonical, exports.clone());
        Ok(exports)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn analyze_block(&mut self, ctx: &mut UnitContext, block: &mut Block) -> Result<(), SemanticError> {
        ctx.symbols.enter_scope();
        let result = (|| {
            for item in &mut block.items {
                self.analyze_decl(ctx, item)?;
            }
            Ok(())
        })();
        ctx.symbols.exit_scope();
        result
    }

    fn analyze_stmt(&mut self, ctx: &mut UnitContext, stmt: &mut Stmt) -> Result<(), SemanticError> {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Expr(expr) => {
                self.expr_type(ctx, expr)?;
                Ok(())
            }
            StmtKind::Print(print) => self.analyze_print(ctx, print, span),
            StmtKind::Assign { target, value } => self.analyze_assign(ctx, target, value),
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let cond_ty = self.expr_type(ctx, condition)?;
                if !types_compatible(&Type::Bool, &cond_ty) {
                    return Err(SemanticError::new(
                        ErrorCode::E0101,
                        format!("condition must be bool, got {}", cond_ty),
                        condition.span,
                    ));
                }
                self.analyze_block(ctx, then_block)?;
                if let Some(else_block) = else_block {
                    self.analyze_block(ctx, else_block)?;
                }
                Ok(())
            }
            StmtKind::While { condition, body } => {
                let cond_ty = self.expr_type(ctx, condition)?;
                if !types_compatible(&Type::Bool, &cond_ty) {
                    return Err(SemanticError::new(
                        ErrorCode::E0101,
                        format!("condition must be bool, got {}", cond_ty),
                        condition.span,
                    ));
                }
                ctx.loop_depth += 1;
                let result = self.analyze_block(ctx, body);
                ctx.loop_depth -= 1;
                result
            }
            StmtKind::For {
                variable,
                iterable,
                body,
            } => self.analyze_for(ctx, variable, iterable, body, span),
            StmtKind::Return(value) => {
                let expected = match ctx.current_return.clone() {
                    Some(ty) => ty,
                    None => {
                        return Err(SemanticError::new(
                            ErrorCode::E0304,
                            "'return' outside of function",
                            span,
                        ));
                    }
                };
                let actual = self.expr_type(ctx, value)?;
                if !types_compatible(&expected, &actual) {
                    return Err(SemanticError::new(
                        ErrorCode::E0302,
                        format!("return type mismatch: expected {}, got {}", expected, actual),
                        value.span,
                    ));
                }
                Ok(())
            }
            StmtKind::Break => {
                if ctx.loop_depth == 0 {
                    return Err(SemanticError::new(
                        ErrorCode::E0200,
                        "'break' outside of loop",
                        span,
                    ));
                }
                Ok(())
            }
            StmtKind::Continue => {
                if ctx.loop_depth == 0 {
                    return Err(SemanticError::new(
                        ErrorCode::E0201,
                        "'continue' outside of loop",
                        span,
                    ));
                }
                Ok(())
            }
            StmtKind::Block(block) => self.analyze_block(ctx, block),
        }
    }

    fn analyze_for(
        &mut self,
        ctx: &mut UnitContext,
        variable: &str,
        iterable: &mut Expr,
        body: &mut Block,
        span: Span,
    ) -> Result<(), SemanticError> {
        self.check_reserved(variable, span)?;

        let var_type = if let ExprKind::Range { start, end } = &mut iterable.kind {
            let start_ty = self.expr_type(ctx, start)?;
            if !types_compatible(&Type::Int, &start_ty) {
                return Err(SemanticError::new(
                    ErrorCode::E0504,
                    format!("range start must be int, got {}", start_ty),
                    start.span,
                ));
            }
            let end_ty = self.expr_type(ctx, end)?;
            if !types_compatible(&Type::Int, &end_ty) {
                return Err(SemanticError::new(
                    ErrorCode::E0504,
                    format!("range end must be int, got {}", end_ty),
                    end.span,
                ));
            }
            iterable.ty = Type::list_of(Type::Int);
            Type::Int
        } else {
            let iter_ty = self.expr_type(ctx, iterable)?;
            match iter_ty {
                Type::List(element) => *element,
                Type::Any => Type::Any,
                other => {
                    return Err(SemanticError::new(
                        ErrorCode::E0505,
                        format!("cannot iterate over {}", other),
                        iterable.span,
                    ));
                }
            }
        };

        ctx.loop_depth += 1;
        ctx.symbols.enter_scope();
        // The loop variable is a fresh binding; it cannot be reassigned.
        ctx.symbols
            .define(variable, Symbol { ty: var_type, is_const: true });
        let result = (|| {
            for item in &mut body.items {
                self.analyze_decl(ctx, item)?;
            }
            Ok(())
        })();
        ctx.symbols.exit_scope();
        ctx.loop_depth -= 1;
        result
    }

    fn analyze_print(
        &mut self,
        ctx: &mut UnitContext,
        print: &mut PrintStmt,
        span: Span,
    ) -> Result<(), SemanticError> {
        if print.arguments.is_empty() {
            return Err(SemanticError::new(
                ErrorCode::E0406,
                "print requires at least one argument",
                span,
            ));
        }

        for arg in &mut print.arguments {
            let ty = self.expr_type(ctx, arg)?;
            if !ty.is_printable() {
                return Err(SemanticError::new(
                    ErrorCode::E0401,
                    format!("cannot print value of type {}", ty),
                    arg.span,
                ));
            }
        }

        // Format mode: the first argument is a string literal containing
        // at least one real `{}` placeholder.
        if let ExprKind::StringLit { value, .. } = &print.arguments[0].kind {
            let placeholders = PrintStmt::placeholder_count(value);
            if placeholders > 0 {
                let args = print.arguments.len() - 1;
                if placeholders > args {
                    return Err(SemanticError::new(
                        ErrorCode::E0410,
                        format!(
                            "format string has {} placeholder(s) but only {} argument(s) provided",
                            placeholders, args
                        ),
                        print.arguments[0].span,
                    ));
                }
                if placeholders < args {
                    return Err(SemanticError::new(
                        ErrorCode::E0411,
                        format!(
                            "format string has {} placeholder(s) but {} argument(s) provided",
                            placeholders, args
                        ),
                        print.arguments[0].span,
                    ));
                }
            }
        }

        if let Some(sep) = &mut print.sep {
            let ty = self.expr_type(ctx, sep)?;
            if !types_compatible(&Type::Str, &ty) {
                return Err(SemanticError::new(
                    ErrorCode::E0402,
                    format!("'sep' parameter must be str, got {}", ty),
                    sep.span,
                ));
            }
        }
        if let Some(end) = &mut print.end {
            let ty = self.expr_type(ctx, end)?;
            if !types_compatible(&Type::Str, &ty) {
                return Err(SemanticError::new(
                    ErrorCode::E0403,
                    format!("'end' parameter must be str, got {}", ty),
                    end.span,
                ));
            }
        }
        Ok(())
    }

    fn analyze_assign(
        &mut self,
        ctx: &mut UnitContext,
        target: &mut AssignTarget,
        value: &mut Expr,
    ) -> Result<(), SemanticError> {
        match target {
            AssignTarget::Name { name, span } => {
                let (target_ty, is_const) = match ctx.symbols.lookup(name) {
                    Some(symbol) => (symbol.ty.clone(), symbol.is_const),
                    None => {
                        return Err(SemanticError::new(
                            ErrorCode::E0001,
                            format!("use of undeclared identifier '{}'", name),
                            *span,
                        ));
                    }
                };
                if is_const {
                    return Err(SemanticError::new(
                        ErrorCode::E0003,
                        format!("cannot assign to constant '{}'", name),
                        *span,
                    ));
                }
                let value_ty = self.expr_type(ctx, value)?;
                if !types_compatible(&target_ty, &value_ty) {
                    return Err(SemanticError::new(
                        ErrorCode::E0100,
                        format!("type mismatch: expected {}, got {}", target_ty, value_ty),
                        value.span,
                    ));
                }
                Ok(())
            }
            AssignTarget::Index { target, index, .. } => {
                let target_ty = self.expr_type(ctx, target)?;
                match target_ty {
                    Type::List(element) => {
                        let index_ty = self.expr_type(ctx, index)?;
                        if !types_compatible(&Type::Int, &index_ty) {
                            return Err(SemanticError::new(
                                ErrorCode::E0501,
                                format!("list index must be int, got {}", index_ty),
                                index.span,
                            ));
                        }
                        let value_ty = self.expr_type(ctx, value)?;
                        if !types_compatible(&element, &value_ty) {
                            return Err(SemanticError::new(
                                ErrorCode::E0503,
                                format!(
                                    "cannot assign {} to list element of type {}",
                                    value_ty, element
                                ),
                                value.span,
                            ));
                        }
                        Ok(())
                    }
                    Type::Dict(key, val) => {
                        let index_ty = self.expr_type(ctx, index)?;
                        if !types_compatible(&key, &index_ty) {
                            return Err(SemanticError::new(
                                ErrorCode::E1003,
                                format!("dict key must be {}, got {}", key, index_ty),
                                index.span,
                            ));
                        }
                        let value_ty = self.expr_type(ctx, value)?;
                        if !types_compatible(&val, &value_ty) {
                            return Err(SemanticError::new(
                                ErrorCode::E1004,
                                format!("cannot assign {} to dict value of type {}", value_ty, val),
                                value.span,
                            ));
                        }
                        Ok(())
                    }
                    Type::Any => {
                        self.expr_type(ctx, index)?;
                        self.expr_type(ctx, value)?;
                        Ok(())
                    }
                    other => Err(SemanticError::new(
                        ErrorCode::E0502,
                        format!("cannot index into {}", other),
                        target.span,
                    )),
                }
            }
            AssignTarget::Member { object, field, span } => {
                let object_ty = self.expr_type(ctx, object)?;
                let field_ty = match &object_ty {
                    Type::Struct(name) => match ctx.structs.get(name).and_then(|s| s.field_type(field)) {
                        Some(ty) => ty.clone(),
                        None => {
                            return Err(SemanticError::new(
                                ErrorCode::E0808,
                                format!("struct '{}' has no field '{}'", name, field),
                                *span,
                            ));
                        }
                    },
                    Type::Any => Type::Any,
                    other => {
                        return Err(SemanticError::new(
                            ErrorCode::E0807,
                            format!("cannot access field of {}", other),
                            object.span,
                        ));
                    }
                };
                let value_ty = self.expr_type(ctx, value)?;
                if !types_compatible(&field_ty, &value_ty) {
                    return Err(SemanticError::new(
                        ErrorCode::E0809,
                        format!(
                            "cannot assign {} to field '{}' of type {}",
                            value_ty, field, field_ty
                        ),
                        value.span,
                    ));
                }
                Ok(())
            }
        }
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// Resolve a parsed type annotation: bare identifiers become enum or
    /// struct references (enum registry first), dict keys must be
    /// hashable, list and dict parameters resolve recursively.
    fn resolve_type(
        &self,
        ctx: &UnitContext,
        ty: &Type,
        span: Span,
    ) -> Result<Type, SemanticError> {
        match ty {
            Type::Struct(name) => {
                if ctx.enums.contains_key(name) {
                    Ok(Type::Enum(name.clone()))
                } else if ctx.structs.contains_key(name) {
                    Ok(Type::Struct(name.clone()))
                } else {
                    Err(SemanticError::new(
                        ErrorCode::E1203,
                        format!("unknown type '{}'", name),
                        span,
                    ))
                }
            }
            Type::List(element) => {
                let element = self.resolve_type(ctx, element, span)?;
                Ok(Type::list_of(element))
            }
            Type::Dict(key, value) => {
                let key = self.resolve_type(ctx, key, span)?;
                if !key.is_hashable_key() {
                    return Err(SemanticError::new(
                        ErrorCode::E1002,
                        format!("dict key type must be int, str, or bool, got {}", key),
                        span,
                    ));
                }
                let value = self.resolve_type(ctx, value, span)?;
                Ok(Type::dict_of(key, value))
            }
            other => Ok(other.clone()),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Determine and record the type of an expression, validating it
    /// along the way.
    fn expr_type(&mut self, ctx: &mut UnitContext, expr: &mut Expr) -> Result<Type, SemanticError> {
        // `Enum.Variant` parses as member access; reclassify it here once
        // the receiver is known to name a declared enum.
        if let ExprKind::Member { object, field } = &expr.kind {
            if let ExprKind::Ident(name) = &object.kind {
                if let Some(info) = ctx.enums.get(name) {
                    if !info.variants.contains(field) {
                        return Err(SemanticError::new(
                            ErrorCode::E1202,
                            format!("enum '{}' has no variant '{}'", name, field),
                            expr.span,
                        ));
                    }
                    let enum_name = name.clone();
                    let variant = field.clone();
                    expr.kind = ExprKind::EnumVariant {
                        enum_name: enum_name.clone(),
                        variant,
                    };
                    expr.ty = Type::Enum(enum_name);
                    return Ok(expr.ty.clone());
                }
            }
        }

        let ty = self.expr_type_uncached(ctx, expr)?;
        expr.ty = ty.clone();
        Ok(ty)
    }

    fn expr_type_uncached(
        &mut self,
        ctx: &mut UnitContext,
        expr: &mut Expr,
    ) -> Result<Type, SemanticError> {
        // Calls dispatch on their own; everything else below.
        if matches!(expr.kind, ExprKind::Call { .. }) {
            return self.call_type(ctx, expr);
        }
        if matches!(expr.kind, ExprKind::MethodCall { .. }) {
            return self.method_call_type(ctx, expr);
        }

        let span = expr.span;
        match &mut expr.kind {
            ExprKind::IntLit(_) => Ok(Type::Int),
            ExprKind::FloatLit { .. } => Ok(Type::Float),
            ExprKind::StringLit { .. } => Ok(Type::Str),
            ExprKind::BoolLit(_) => Ok(Type::Bool),

            ExprKind::Ident(name) => match ctx.symbols.lookup(name) {
                Some(symbol) => Ok(symbol.ty.clone()),
                None => {
                    let message = if methods::is_builtin_module(name) {
                        format!("builtin module '{}' cannot be used as a value", name)
                    } else {
                        format!("use of undeclared identifier '{}'", name)
                    };
                    Err(SemanticError::new(ErrorCode::E0001, message, span))
                }
            },

            ExprKind::ListLit(elements) => {
                if elements.is_empty() {
                    // Placeholder element type; compatible with any list.
                    return Ok(Type::list_of(Type::Void));
                }
                let mut iter = elements.iter_mut();
                let first = iter.next().expect("non-empty");
                let first_ty = self.expr_type(ctx, first)?;
                for (i, element) in iter.enumerate() {
                    let ty = self.expr_type(ctx, element)?;
                    if !equatable(&first_ty, &ty) {
                        return Err(SemanticError::new(
                            ErrorCode::E0500,
                            format!(
                                "heterogeneous list: element {} has type {} but expected {}",
                                i + 1,
                                ty,
                                first_ty
                            ),
                            element.span,
                        ));
                    }
                }
                Ok(Type::list_of(first_ty))
            }

            ExprKind::DictLit(entries) => {
                if entries.is_empty() {
                    return Ok(Type::dict_of(Type::Void, Type::Void));
                }
                let mut key_ty: Option<Type> = None;
                let mut value_ty: Option<Type> = None;
                for (key, value) in entries.iter_mut() {
                    let kt = self.expr_type(ctx, key)?;
                    if !kt.is_hashable_key() && kt != Type::Any {
                        return Err(SemanticError::new(
                            ErrorCode::E1002,
                            format!("dict key type must be int, str, or bool, got {}", kt),
                            key.span,
                        ));
                    }
                    match &key_ty {
                        None => key_ty = Some(kt),
                        Some(expected) if equatable(expected, &kt) => {}
                        Some(expected) => {
                            return Err(SemanticError::new(
                                ErrorCode::E1000,
                                format!("heterogeneous dict keys: {} and {}", expected, kt),
                                key.span,
                            ));
                        }
                    }
                    let vt = self.expr_type(ctx, value)?;
                    match &value_ty {
                        None => value_ty = Some(vt),
                        Some(expected) if equatable(expected, &vt) => {}
                        Some(expected) => {
                            return Err(SemanticError::new(
                                ErrorCode::E1001,
                                format!("heterogeneous dict values: {} and {}", expected, vt),
                                value.span,
                            ));
                        }
                    }
                }
                Ok(Type::dict_of(key_ty.expect("non-empty"), value_ty.expect("non-empty")))
            }

            ExprKind::Range { start, end } => {
                let start_ty = self.expr_type(ctx, start)?;
                if !types_compatible(&Type::Int, &start_ty) {
                    return Err(SemanticError::new(
                        ErrorCode::E0504,
                        format!("range start must be int, got {}", start_ty),
                        start.span,
                    ));
                }
                let end_ty = self.expr_type(ctx, end)?;
                if !types_compatible(&Type::Int, &end_ty) {
                    return Err(SemanticError::new(
                        ErrorCode::E0504,
                        format!("range end must be int, got {}", end_ty),
                        end.span,
                    ));
                }
                // A range is an iterable of int.
                Ok(Type::list_of(Type::Int))
            }

            ExprKind::Binary { op, left, right } => {
                let op = *op;
                let left_ty = self.expr_type(ctx, left)?;
                let right_ty = self.expr_type(ctx, right)?;
                self.binary_result(op, &left_ty, &right_ty, left.span, right.span, span)
            }

            ExprKind::Unary { op, operand } => {
                let op = *op;
                let operand_ty = self.expr_type(ctx, operand)?;
                match op {
                    UnaryOp::Not => {
                        if !types_compatible(&Type::Bool, &operand_ty) {
                            return Err(SemanticError::new(
                                ErrorCode::E0104,
                                format!("logical NOT requires bool operand, got {}", operand_ty),
                                operand.span,
                            ));
                        }
                        Ok(Type::Bool)
                    }
                    UnaryOp::Neg => match operand_ty {
                        Type::Int => Ok(Type::Int),
                        Type::Float => Ok(Type::Float),
                        Type::Any => Ok(Type::Any),
                        other => Err(SemanticError::new(
                            ErrorCode::E0102,
                            format!("negation requires a numeric type, got {}", other),
                            operand.span,
                        )),
                    },
                }
            }

            ExprKind::Call { .. } | ExprKind::MethodCall { .. } => {
                unreachable!("calls are dispatched above")
            }

            ExprKind::Member { object, field } => {
                // Module member access; the enum case was handled above.
                if let ExprKind::Ident(name) = &object.kind {
                    if let Some(info) = ctx.modules.get(name) {
                        let module_name = name.clone();
                        object.ty = Type::Module(module_name.clone());
                        return match info {
                            ModuleInfo::Opaque => Ok(Type::Any),
                            ModuleInfo::Local(_) => Err(SemanticError::new(
                                ErrorCode::E0001,
                                format!(
                                    "module '{}' has no value member '{}'; only functions can be referenced",
                                    module_name, field
                                ),
                                span,
                            )),
                        };
                    }
                }

                let object_ty = self.expr_type(ctx, object)?;
                match &object_ty {
                    Type::Struct(name) => {
                        match ctx.structs.get(name).and_then(|s| s.field_type(field)) {
                            Some(ty) => Ok(ty.clone()),
                            None => Err(SemanticError::new(
                                ErrorCode::E0808,
                                format!("struct '{}' has no field '{}'", name, field),
                                span,
                            )),
                        }
                    }
                    Type::Any => Ok(Type::Any),
                    other => Err(SemanticError::new(
                        ErrorCode::E0807,
                        format!("cannot access field of {}", other),
                        object.span,
                    )),
                }
            }

            ExprKind::Index { target, index } => {
                let target_ty = self.expr_type(ctx, target)?;
                match target_ty {
                    Type::List(element) => {
                        let index_ty = self.expr_type(ctx, index)?;
                        if !types_compatible(&Type::Int, &index_ty) {
                            return Err(SemanticError::new(
                                ErrorCode::E0501,
                                format!("list index must be int, got {}", index_ty),
                                index.span,
                            ));
                        }
                        Ok(*element)
                    }
                    Type::Dict(key, value) => {
                        let index_ty = self.expr_type(ctx, index)?;
                        if !types_compatible(&key, &index_ty) {
                            return Err(SemanticError::new(
                                ErrorCode::E1003,
                                format!("dict key must be {}, got {}", key, index_ty),
                                index.span,
                            ));
                        }
                        Ok(*value)
                    }
                    Type::Any => {
                        self.expr_type(ctx, index)?;
                        Ok(Type::Any)
                    }
                    other => Err(SemanticError::new(
                        ErrorCode::E0502,
                        format!("cannot index into {}", other),
                        target.span,
                    )),
                }
            }

            ExprKind::StructInit { name, fields } => {
                let info = match ctx.structs.get(name) {
                    Some(info) => info.clone(),
                    None => {
                        return Err(SemanticError::new(
                            ErrorCode::E0803,
                            format!("struct '{}' must be defined before use", name),
                            span,
                        ));
                    }
                };

                // Unknown and duplicate fields first, then missing ones.
                let mut seen: Vec<&str> = Vec::with_capacity(fields.len());
                for field in fields.iter() {
                    if info.field_type(&field.name).is_none() {
                        return Err(SemanticError::new(
                            ErrorCode::E0805,
                            format!("struct '{}' has no field '{}'", name, field.name),
                            field.span,
                        ));
                    }
                    if seen.contains(&field.name.as_str()) {
                        return Err(SemanticError::new(
                            ErrorCode::E0805,
                            format!("field '{}' initialized more than once", field.name),
                            field.span,
                        ));
                    }
                    seen.push(field.name.as_str());
                }

                let missing: Vec<&str> = info
                    .fields
                    .iter()
                    .map(|(n, _)| n.as_str())
                    .filter(|n| !fields.iter().any(|f| f.name.as_str() == *n))
                    .collect();
                if !missing.is_empty() {
                    return Err(SemanticError::new(
                        ErrorCode::E0804,
                        format!("missing field(s) {} in initializer of '{}'", missing.join(", "), name),
                        span,
                    ));
                }

                let struct_name = name.clone();
                for field in fields.iter_mut() {
                    let expected = info
                        .field_type(&field.name)
                        .expect("validated above")
                        .clone();
                    let actual = self.expr_type(ctx, &mut field.value)?;
                    if !types_compatible(&expected, &actual) {
                        return Err(SemanticError::new(
                            ErrorCode::E0806,
                            format!(
                                "field '{}' of '{}' expects {}, got {}",
                                field.name, struct_name, expected, actual
                            ),
                            field.value.span,
                        ));
                    }
                }

                Ok(Type::Struct(struct_name))
            }

            ExprKind::EnumVariant { enum_name, variant } => {
                // Already classified (idempotent re-analysis).
                match ctx.enums.get(enum_name) {
                    Some(info) if info.variants.contains(variant) => {
                        Ok(Type::Enum(enum_name.clone()))
                    }
                    Some(_) => Err(SemanticError::new(
                        ErrorCode::E1202,
                        format!("enum '{}' has no variant '{}'", enum_name, variant),
                        span,
                    )),
                    None => Err(SemanticError::new(
                        ErrorCode::E1203,
                        format!("unknown type '{}'", enum_name),
                        span,
                    )),
                }
            }
        }
    }

    fn binary_result(
        &self,
        op: BinaryOp,
        left: &Type,
        right: &Type,
        left_span: Span,
        right_span: Span,
        span: Span,
    ) -> Result<Type, SemanticError> {
        if op.is_logical() {
            if !types_compatible(&Type::Bool, left) {
                return Err(SemanticError::new(
                    ErrorCode::E0104,
                    format!("logical operator requires bool operands, got {}", left),
                    left_span,
                ));
            }
            if !types_compatible(&Type::Bool, right) {
                return Err(SemanticError::new(
                    ErrorCode::E0104,
                    format!("logical operator requires bool operands, got {}", right),
                    right_span,
                ));
            }
            return Ok(Type::Bool);
        }

        let left_enum = matches!(left, Type::Enum(_));
        let right_enum = matches!(right, Type::Enum(_));

        if op.is_equality() {
            if left_enum || right_enum {
                return match (left, right) {
                    (Type::Enum(a), Type::Enum(b)) if a == b => Ok(Type::Bool),
                    (Type::Enum(_), Type::Any) | (Type::Any, Type::Enum(_)) => Ok(Type::Bool),
                    _ => Err(SemanticError::new(
                        ErrorCode::E1204,
                        format!("cannot compare {} with {}", left, right),
                        span,
                    )),
                };
            }
            if !equatable(left, right) {
                return Err(SemanticError::new(
                    ErrorCode::E0102,
                    format!("cannot compare {} with {}", left, right),
                    span,
                ));
            }
            return Ok(Type::Bool);
        }

        if op.is_ordering() {
            if left_enum || right_enum {
                return Err(SemanticError::new(
                    ErrorCode::E1205,
                    format!("enums support only '==' and '!=', not '{}'", op),
                    span,
                ));
            }
            if *left == Type::Str || *right == Type::Str {
                return Err(SemanticError::new(
                    ErrorCode::E0103,
                    "string comparison with '<', '>', '<=', '>=' is not supported",
                    span,
                ));
            }
            if *left == Type::Any || *right == Type::Any {
                return Ok(Type::Bool);
            }
            if left != right {
                return Err(SemanticError::new(
                    ErrorCode::E0102,
                    format!("cannot compare {} with {}", left, right),
                    span,
                ));
            }
            if !left.is_numeric() {
                return Err(SemanticError::new(
                    ErrorCode::E0102,
                    format!("comparison requires numeric types, got {}", left),
                    span,
                ));
            }
            return Ok(Type::Bool);
        }

        // Arithmetic.
        if *left == Type::Str && *right == Type::Str {
            if op == BinaryOp::Add {
                return Ok(Type::Str);
            }
            return Err(SemanticError::new(
                ErrorCode::E0102,
                format!("operator '{}' is not supported for strings", op),
                span,
            ));
        }
        if *left == Type::Str || *right == Type::Str {
            return Err(SemanticError::new(
                ErrorCode::E0102,
                format!("cannot perform arithmetic between {} and {}", left, right),
                span,
            ));
        }
        if *left == Type::Any || *right == Type::Any {
            return Ok(Type::Any);
        }
        if left != right {
            return Err(SemanticError::new(
                ErrorCode::E0102,
                format!("cannot mix {} and {} in arithmetic", left, right),
                span,
            ));
        }
        if !left.is_numeric() {
            return Err(SemanticError::new(
                ErrorCode::E0102,
                format!("arithmetic operators are not supported for {}", left),
                span,
            ));
        }
        Ok(left.clone())
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn call_type(&mut self, ctx: &mut UnitContext, expr: &mut Expr) -> Result<Type, SemanticError> {
        let span = expr.span;
        let (callee, args) = match &mut expr.kind {
            ExprKind::Call { callee, args } => (callee.clone(), args),
            _ => unreachable!("call_type on non-call"),
        };

        // Builtins are intercepted before symbol lookup; they are not
        // first-class symbols.
        match callee.as_str() {
            "len" => return self.check_len(ctx, args, span),
            "push" => return self.check_push(ctx, args, span),
            "keys" => return self.check_keys(ctx, args, span),
            "values" => return self.check_values(ctx, args, span),
            "input" => return self.check_input(ctx, args, span),
            "int" | "float" | "str" | "bool" => return self.check_cast(ctx, &callee, args, span),
            _ => {}
        }

        let symbol_ty = match ctx.symbols.lookup(&callee) {
            Some(symbol) => symbol.ty.clone(),
            None => {
                return Err(SemanticError::new(
                    ErrorCode::E0001,
                    format!("use of undeclared function '{}'", callee),
                    span,
                ));
            }
        };

        match symbol_ty {
            Type::Function(params, ret) => {
                if args.len() != params.len() {
                    return Err(SemanticError::new(
                        ErrorCode::E0100,
                        format!(
                            "'{}' takes {} argument(s), {} given",
                            callee,
                            params.len(),
                            args.len()
                        ),
                        span,
                    ));
                }
                for (arg, expected) in args.iter_mut().zip(&params) {
                    let actual = self.expr_type(ctx, arg)?;
                    if !types_compatible(expected, &actual) {
                        return Err(SemanticError::new(
                            ErrorCode::E0100,
                            format!("argument type mismatch: expected {}, got {}", expected, actual),
                            arg.span,
                        ));
                    }
                }
                Ok(*ret)
            }
            other => Err(SemanticError::new(
                ErrorCode::E0001,
                format!("'{}' is not a function (it has type {})", callee, other),
                span,
            )),
        }
    }

    fn method_call_type(
        &mut self,
        ctx: &mut UnitContext,
        expr: &mut Expr,
    ) -> Result<Type, SemanticError> {
        let span = expr.span;
        let (receiver, method, args) = match &mut expr.kind {
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => (receiver, method.clone(), args),
            _ => unreachable!("method_call_type on non-method-call"),
        };

        // Classify identifier receivers before general typing: builtin
        // static modules and imported module namespaces are not values.
        enum Receiver {
            Builtin(String),
            OpaqueModule(String),
            LocalModule(String, Option<(Vec<Type>, Type)>),
            Value,
        }

        let class = match &receiver.kind {
            ExprKind::Ident(name) if methods::is_builtin_module(name) => {
                Receiver::Builtin(name.clone())
            }
            ExprKind::Ident(name) => match ctx.modules.get(name) {
                Some(ModuleInfo::Opaque) => Receiver::OpaqueModule(name.clone()),
                Some(ModuleInfo::Local(exports)) => {
                    let signature = match exports.get(&method) {
                        Some(Export::Function { params, ret }) => {
                            Some((params.clone(), ret.clone()))
                        }
                        _ => None,
                    };
                    Receiver::LocalModule(name.clone(), signature)
                }
                None => Receiver::Value,
            },
            _ => Receiver::Value,
        };

        match class {
            Receiver::Builtin(module) => {
                receiver.ty = Type::Module(module.clone());
                let sig = match methods::static_module_method(&module, &method) {
                    Some(sig) => sig,
                    None => {
                        return Err(SemanticError::new(
                            ErrorCode::E1105,
                            format!("'{}' has no method '{}'", module, method),
                            span,
                        ));
                    }
                };
                return self.check_method_args(ctx, sig, &Type::Module(module), &method, args, span);
            }
            Receiver::OpaqueModule(module) => {
                // Opaque Python call: anything goes, result is Any.
                receiver.ty = Type::Module(module);
                for arg in args.iter_mut() {
                    self.expr_type(ctx, arg)?;
                }
                return Ok(Type::Any);
            }
            Receiver::LocalModule(module, signature) => {
                receiver.ty = Type::Module(module.clone());
                let (params, ret) = match signature {
                    Some(signature) => signature,
                    None => {
                        return Err(SemanticError::new(
                            ErrorCode::E0001,
                            format!("module '{}' has no function '{}'", module, method),
                            span,
                        ));
                    }
                };
                if args.len() != params.len() {
                    return Err(SemanticError::new(
                        ErrorCode::E0100,
                        format!(
                            "'{}.{}' takes {} argument(s), {} given",
                            module,
                            method,
                            params.len(),
                            args.len()
                        ),
                        span,
                    ));
                }
                for (arg, expected) in args.iter_mut().zip(&params) {
                    let actual = self.expr_type(ctx, arg)?;
                    if !types_compatible(expected, &actual) {
                        return Err(SemanticError::new(
                            ErrorCode::E0100,
                            format!(
                                "argument type mismatch: expected {}, got {}",
                                expected, actual
                            ),
                            arg.span,
                        ));
                    }
                }
                return Ok(ret);
            }
            Receiver::Value => {}
        }

        let receiver_ty = self.expr_type(ctx, receiver)?;

        if receiver_ty == Type::Any {
            for arg in args.iter_mut() {
                self.expr_type(ctx, arg)?;
            }
            return Ok(Type::Any);
        }

        let family = match Family::of(&receiver_ty) {
            Some(family) => family,
            None => {
                return Err(SemanticError::new(
                    ErrorCode::E1105,
                    format!("type {} has no methods", receiver_ty),
                    span,
                ));
            }
        };

        let sig = match methods::lookup(family, &method) {
            Some(sig) => sig,
            None => {
                return Err(SemanticError::new(
                    ErrorCode::E1105,
                    format!("type {} has no method '{}'", receiver_ty, method),
                    span,
                ));
            }
        };

        // join() is the one signature the registry cannot express: the
        // receiver itself must be [str].
        if family == Family::List && method == "join" {
            if let Type::List(element) = &receiver_ty {
                if !matches!(**element, Type::Str | Type::Any | Type::Void) {
                    return Err(SemanticError::new(
                        ErrorCode::E1102,
                        format!("join() requires [str], got {}", receiver_ty),
                        receiver.span,
                    ));
                }
            }
        }

        self.check_method_args(ctx, sig, &receiver_ty, &method, args, span)
    }

    fn check_method_args(
        &mut self,
        ctx: &mut UnitContext,
        sig: &MethodSig,
        receiver_ty: &Type,
        method: &str,
        args: &mut [Expr],
        span: Span,
    ) -> Result<Type, SemanticError> {
        if args.len() != sig.params.len() {
            return Err(SemanticError::new(
                ErrorCode::E1106,
                format!(
                    "{}() takes {} argument(s), {} given",
                    method,
                    sig.params.len(),
                    args.len()
                ),
                span,
            ));
        }

        for (arg, pattern) in args.iter_mut().zip(sig.params) {
            let expected = pattern.substitute(receiver_ty);
            let actual = self.expr_type(ctx, arg)?;
            if !types_compatible(&expected, &actual) {
                let code = if pattern.is_generic() {
                    ErrorCode::E1100
                } else {
                    ErrorCode::E1107
                };
                return Err(SemanticError::new(
                    code,
                    format!(
                        "{}() argument type mismatch: expected {}, got {}",
                        method, expected, actual
                    ),
                    arg.span,
                ));
            }
        }

        Ok(sig.ret.substitute(receiver_ty))
    }

    // =========================================================================
    // Builtin functions
    // =========================================================================

    fn check_len(
        &mut self,
        ctx: &mut UnitContext,
        args: &mut [Expr],
        span: Span,
    ) -> Result<Type, SemanticError> {
        if args.len() != 1 {
            return Err(SemanticError::new(
                ErrorCode::E0507,
                format!("len() takes exactly 1 argument ({} given)", args.len()),
                span,
            ));
        }
        let ty = self.expr_type(ctx, &mut args[0])?;
        match ty {
            Type::List(_) | Type::Dict(_, _) | Type::Str | Type::Any => Ok(Type::Int),
            other => Err(SemanticError::new(
                ErrorCode::E0507,
                format!("len() argument must be a list, dict, or str, got {}", other),
                args[0].span,
            )),
        }
    }

    fn check_push(
        &mut self,
        ctx: &mut UnitContext,
        args: &mut [Expr],
        span: Span,
    ) -> Result<Type, SemanticError> {
        if args.len() != 2 {
            return Err(SemanticError::new(
                ErrorCode::E0506,
                format!("push() takes exactly 2 arguments ({} given)", args.len()),
                span,
            ));
        }
        let list_ty = self.expr_type(ctx, &mut args[0])?;
        let element = match list_ty {
            Type::List(element) => *element,
            Type::Any => Type::Any,
            other => {
                return Err(SemanticError::new(
                    ErrorCode::E0506,
                    format!("push() first argument must be a list, got {}", other),
                    args[0].span,
                ));
            }
        };
        let value_ty = self.expr_type(ctx, &mut args[1])?;
        if !types_compatible(&element, &value_ty) {
            return Err(SemanticError::new(
                ErrorCode::E0506,
                format!("push() cannot add {} to a list of {}", value_ty, element),
                args[1].span,
            ));
        }
        Ok(Type::Void)
    }

    fn check_keys(
        &mut self,
        ctx: &mut UnitContext,
        args: &mut [Expr],
        span: Span,
    ) -> Result<Type, SemanticError> {
        if args.len() != 1 {
            return Err(SemanticError::new(
                ErrorCode::E1005,
                format!("keys() takes exactly 1 argument ({} given)", args.len()),
                span,
            ));
        }
        let ty = self.expr_type(ctx, &mut args[0])?;
        match ty {
            Type::Dict(key, _) => Ok(Type::List(key)),
            Type::Any => Ok(Type::list_of(Type::Any)),
            other => Err(SemanticError::new(
                ErrorCode::E1005,
                format!("keys() argument must be a dict, got {}", other),
                args[0].span,
            )),
        }
    }

    fn check_values(
        &mut self,
        ctx: &mut UnitContext,
        args: &mut [Expr],
        span: Span,
    ) -> Result<Type, SemanticError> {
        if args.len() != 1 {
            return Err(SemanticError::new(
                ErrorCode::E1006,
                format!("values() takes exactly 1 argument ({} given)", args.len()),
                span,
            ));
        }
        let ty = self.expr_type(ctx, &mut args[0])?;
        match ty {
            Type::Dict(_, value) => Ok(Type::List(value)),
            Type::Any => Ok(Type::list_of(Type::Any)),
            other => Err(SemanticError::new(
                ErrorCode::E1006,
                format!("values() argument must be a dict, got {}", other),
                args[0].span,
            )),
        }
    }

    fn check_input(
        &mut self,
        ctx: &mut UnitContext,
        args: &mut [Expr],
        span: Span,
    ) -> Result<Type, SemanticError> {
        if args.len() > 1 {
            return Err(SemanticError::new(
                ErrorCode::E0600,
                format!("input() takes at most 1 argument ({} given)", args.len()),
                span,
            ));
        }
        if let Some(arg) = args.first_mut() {
            let ty = self.expr_type(ctx, arg)?;
            if !types_compatible(&Type::Str, &ty) {
                return Err(SemanticError::new(
                    ErrorCode::E0601,
                    format!("input() prompt must be str, got {}", ty),
                    arg.span,
                ));
            }
        }
        Ok(Type::Str)
    }

    fn check_cast(
        &mut self,
        ctx: &mut UnitContext,
        callee: &str,
        args: &mut [Expr],
        span: Span,
    ) -> Result<Type, SemanticError> {
        if args.len() != 1 {
            return Err(SemanticError::new(
                ErrorCode::E0602,
                format!("{}() requires exactly 1 argument ({} given)", callee, args.len()),
                span,
            ));
        }
        self.expr_type(ctx, &mut args[0])?;
        Ok(match callee {
            "int" => Type::Int,
            "float" => Type::Float,
            "str" => Type::Str,
            _ => Type::Bool,
        })
    }
}

// =============================================================================
// Type compatibility
// =============================================================================

/// Check if a value of `actual` type may appear where `expected` is
/// required. `Any` is compatible in both directions; the empty-collection
/// placeholders `[void]` and `Dict[void, void]` satisfy any collection of
/// the same shape. There is no numeric coercion.
pub fn types_compatible(expected: &Type, actual: &Type) -> bool {
    if expected == actual {
        return true;
    }
    match (expected, actual) {
        (Type::Any, _) | (_, Type::Any) => true,
        (Type::List(a), Type::List(b)) => **b == Type::Void || types_compatible(a, b),
        (Type::Dict(k1, v1), Type::Dict(k2, v2)) => {
            (**k2 == Type::Void && **v2 == Type::Void)
                || (types_compatible(k1, k2) && types_compatible(v1, v2))
        }
        _ => false,
    }
}

/// Symmetric compatibility, used where neither side is the "declared"
/// one (list elements, equality operands).
fn equatable(left: &Type, right: &Type) -> bool {
    types_compatible(left, right) || types_compatible(right, left)
}

// =============================================================================
// Return-path analysis
// =============================================================================

/// Conservative syntactic check: a block guarantees a return iff some
/// statement in it does; an `if` guarantees one iff it has an `else` and
/// both branches guarantee it. Loops never guarantee a return.
fn block_guarantees_return(block: &Block) -> bool {
    block.items.iter().any(decl_guarantees_return)
}

fn decl_guarantees_return(decl: &Decl) -> bool {
    match decl {
        Decl::Stmt(stmt) => stmt_guarantees_return(stmt),
        _ => false,
    }
}

fn stmt_guarantees_return(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::If {
            then_block,
            else_block: Some(else_block),
            ..
        } => block_guarantees_return(then_block) && block_guarantees_return(else_block),
        StmtKind::Block(block) => block_guarantees_return(block),
        _ => false,
    }
}
