//! Python code generation.
//!
//! A deterministic read-only walk over the analyzed tree, emitting
//! Python 3.10+ source. Binary expressions are wrapped in parentheses
//! unconditionally so operator precedence never depends on the target's
//! precedence table. Four-space indentation; empty bodies emit `pass`.

use crate::frontend::ast::*;
use crate::utils::pretty::CodeFormatter;

/// Python code generator.
pub struct PyCodeGen {
    indent: &'static str,
}

impl PyCodeGen {
    /// Create a generator with the standard four-space indent.
    pub fn new() -> Self {
        Self { indent: "    " }
    }

    /// Generate Python source for an analyzed program.
    pub fn generate(&self, program: &Program) -> String {
        let mut f = CodeFormatter::new(self.indent);

        let has_structs = program
            .items
            .iter()
            .any(|d| matches!(d, Decl::Struct(_)));
        let has_enums = program.items.iter().any(|d| matches!(d, Decl::Enum(_)));
        let (uses_file, uses_env) = scan_static_modules(program);

        let mut preamble = false;
        if has_structs {
            f.writeln("from dataclasses import dataclass");
            preamble = true;
        }
        if has_enums {
            f.writeln("from enum import Enum");
            preamble = true;
        }
        if uses_file {
            // Aliased so user identifiers can never collide.
            f.writeln("import os as _q_os");
            preamble = true;
        }
        if uses_env {
            f.writeln("import sys as _q_sys");
            preamble = true;
        }
        if preamble {
            f.newline();
        }

        for (i, decl) in program.items.iter().enumerate() {
            // A blank line between consecutive top-level definitions.
            if i > 0
                && matches!(decl, Decl::Fn(_) | Decl::Struct(_) | Decl::Enum(_))
                && matches!(
                    program.items[i - 1],
                    Decl::Fn(_) | Decl::Struct(_) | Decl::Enum(_)
                )
            {
                f.newline();
            }
            self.emit_decl(&mut f, decl);
        }

        f.finish()
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn emit_decl(&self, f: &mut CodeFormatter, decl: &Decl) {
        match decl {
            Decl::Var(d) => {
                let value = self.expr_str(&d.initializer);
                f.writeln(&format!("{} = {}", d.name, value));
            }
            Decl::Const(d) => {
                let value = self.expr_str(&d.initializer);
                f.writeln(&format!("{} = {}", d.name, value));
            }
            Decl::Fn(d) => self.emit_fn(f, d),
            Decl::Struct(d) => self.emit_struct(f, d),
            Decl::Enum(d) => self.emit_enum(f, d),
            Decl::Import(d) => self.emit_import(f, d),
            Decl::Stmt(s) => self.emit_stmt(f, s),
        }
    }

    fn emit_fn(&self, f: &mut CodeFormatter, decl: &FnDecl) {
        let params: Vec<&str> = decl.params.iter().map(|p| p.name.as_str()).collect();
        f.writeln(&format!("def {}({}):", decl.name, params.join(", ")));
        f.indent();
        self.emit_body(f, &decl.body);
        f.dedent();
    }

    fn emit_struct(&self, f: &mut CodeFormatter, decl: &StructDecl) {
        f.writeln("@dataclass");
        f.writeln(&format!("class {}:", decl.name));
        f.indent();
        if decl.fields.is_empty() {
            f.writeln("pass");
        } else {
            for field in &decl.fields {
                f.writeln(&format!("{}: {}", field.name, type_to_python(&field.ty)));
            }
        }
        f.dedent();
    }

    fn emit_enum(&self, f: &mut CodeFormatter, decl: &EnumDecl) {
        f.writeln(&format!("class {}(Enum):", decl.name));
        f.indent();
        if decl.variants.is_empty() {
            f.writeln("pass");
        } else {
            for variant in &decl.variants {
                f.writeln(&format!("{} = \"{}\"", variant.name, variant.name));
            }
        }
        f.dedent();
    }

    fn emit_import(&self, f: &mut CodeFormatter, decl: &ImportDecl) {
        if decl.is_local {
            // "./sub/util.qsr" imports as the dotted path without the
            // extension.
            let path = decl.module.trim_start_matches("./");
            let stem = path.strip_suffix(".qsr").unwrap_or(path);
            f.writeln(&format!("import {}", stem.replace('/', ".")));
        } else {
            f.writeln(&format!("import {}", decl.module));
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn emit_body(&self, f: &mut CodeFormatter, block: &Block) {
        if block.items.is_empty() {
            f.writeln("pass");
            return;
        }
        for item in &block.items {
            self.emit_decl(f, item);
        }
    }

    fn emit_stmt(&self, f: &mut CodeFormatter, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                let s = self.expr_str(expr);
                f.writeln(&s);
            }
            StmtKind::Print(print) => self.emit_print(f, print),
            StmtKind::Assign { target, value } => {
                let target_str = match target {
                    AssignTarget::Name { name, .. } => name.clone(),
                    AssignTarget::Index { target, index, .. } => {
                        format!("{}[{}]", self.expr_str(target), self.expr_str(index))
                    }
                    AssignTarget::Member { object, field, .. } => {
                        format!("{}.{}", self.expr_str(object), field)
                    }
                };
                f.writeln(&format!("{} = {}", target_str, self.expr_str(value)));
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                f.writeln(&format!("if {}:", self.expr_str(condition)));
                f.indent();
                self.emit_body(f, then_block);
                f.dedent();
                if let Some(else_block) = else_block {
                    f.writeln("else:");
                    f.indent();
                    self.emit_body(f, else_block);
                    f.dedent();
                }
            }
            StmtKind::While { condition, body } => {
                f.writeln(&format!("while {}:", self.expr_str(condition)));
                f.indent();
                self.emit_body(f, body);
                f.dedent();
            }
            StmtKind::For {
                variable,
                iterable,
                body,
            } => {
                f.writeln(&format!("for {} in {}:", variable, self.expr_str(iterable)));
                f.indent();
                self.emit_body(f, body);
                f.dedent();
            }
            StmtKind::Return(value) => {
                f.writeln(&format!("return {}", self.expr_str(value)));
            }
            StmtKind::Break => f.writeln("break"),
            StmtKind::Continue => f.writeln("continue"),
            // Python has no block scope; nested blocks flatten.
            StmtKind::Block(block) => {
                for item in &block.items {
                    self.emit_decl(f, item);
                }
            }
        }
    }

    fn emit_print(&self, f: &mut CodeFormatter, print: &PrintStmt) {
        if print.is_format_mode() {
            // print("x={}".format(args), end=...); sep has nothing left
            // to separate.
            let template = self.expr_str(&print.arguments[0]);
            let args: Vec<String> = print.arguments[1..]
                .iter()
                .map(|a| self.expr_str(a))
                .collect();
            let call = format!("{}.format({})", template, args.join(", "));
            match &print.end {
                Some(end) => f.writeln(&format!("print({}, end={})", call, self.expr_str(end))),
                None => f.writeln(&format!("print({})", call)),
            }
            return;
        }

        let mut parts: Vec<String> = print.arguments.iter().map(|a| self.expr_str(a)).collect();
        if let Some(sep) = &print.sep {
            parts.push(format!("sep={}", self.expr_str(sep)));
        }
        if let Some(end) = &print.end {
            parts.push(format!("end={}", self.expr_str(end)));
        }
        f.writeln(&format!("print({})", parts.join(", ")));
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expr_str(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::IntLit(value) => value.to_string(),
            ExprKind::FloatLit { lexeme, .. } => lexeme.clone(),
            ExprKind::StringLit { lexeme, .. } => lexeme.clone(),
            ExprKind::BoolLit(true) => "True".to_string(),
            ExprKind::BoolLit(false) => "False".to_string(),
            ExprKind::Ident(name) => name.clone(),
            ExprKind::ListLit(elements) => {
                let parts: Vec<String> = elements.iter().map(|e| self.expr_str(e)).collect();
                format!("[{}]", parts.join(", "))
            }
            ExprKind::DictLit(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", self.expr_str(k), self.expr_str(v)))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            ExprKind::Range { start, end } => {
                format!("range({}, {})", self.expr_str(start), self.expr_str(end))
            }
            ExprKind::Binary { op, left, right } => {
                // Defensive parenthesization.
                format!(
                    "({} {} {})",
                    self.expr_str(left),
                    python_binary_op(*op),
                    self.expr_str(right)
                )
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Neg => format!("-{}", self.expr_str(operand)),
                UnaryOp::Not => format!("not {}", self.expr_str(operand)),
            },
            ExprKind::Call { callee, args } => self.call_str(callee, args),
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => self.method_call_str(receiver, method, args),
            ExprKind::Member { object, field } => {
                format!("{}.{}", self.expr_str(object), field)
            }
            ExprKind::Index { target, index } => {
                format!("{}[{}]", self.expr_str(target), self.expr_str(index))
            }
            ExprKind::StructInit { name, fields } => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}={}", f.name, self.expr_str(&f.value)))
                    .collect();
                format!("{}({})", name, parts.join(", "))
            }
            ExprKind::EnumVariant { enum_name, variant } => {
                format!("{}.{}", enum_name, variant)
            }
        }
    }

    fn call_str(&self, callee: &str, args: &[Expr]) -> String {
        match callee {
            // push(xs, v) becomes a method call on the list.
            "push" if args.len() == 2 => {
                format!("{}.append({})", self.expr_str(&args[0]), self.expr_str(&args[1]))
            }
            "keys" if args.len() == 1 => {
                format!("list({}.keys())", self.expr_str(&args[0]))
            }
            "values" if args.len() == 1 => {
                format!("list({}.values())", self.expr_str(&args[0]))
            }
            // len, input, and the casts share Python's spelling.
            _ => {
                let parts: Vec<String> = args.iter().map(|a| self.expr_str(a)).collect();
                format!("{}({})", callee, parts.join(", "))
            }
        }
    }

    fn method_call_str(&self, receiver: &Expr, method: &str, args: &[Expr]) -> String {
        // Builtin static modules map onto aliased host imports.
        if let ExprKind::Ident(name) = &receiver.kind {
            match (name.as_str(), method) {
                ("File", "exists") => {
                    return format!("_q_os.path.exists({})", self.expr_str(&args[0]));
                }
                ("Env", "args") => {
                    // Defensive copy so callers may mutate the result.
                    return "list(_q_sys.argv)".to_string();
                }
                _ => {}
            }
        }

        // Imported module calls pass through untouched.
        if matches!(receiver.ty, Type::Module(_)) {
            let parts: Vec<String> = args.iter().map(|a| self.expr_str(a)).collect();
            return format!("{}.{}({})", self.expr_str(receiver), method, parts.join(", "));
        }

        let recv = self.expr_str(receiver);
        let arg_strs: Vec<String> = args.iter().map(|a| self.expr_str(a)).collect();

        match method {
            "len" => format!("len({})", recv),
            "contains" | "has_key" => format!("({} in {})", arg_strs[0], recv),
            "push" => format!("{}.append({})", recv, arg_strs[0]),
            // Receiver and argument swap places.
            "join" => format!("{}.join({})", arg_strs[0], recv),
            "trim" => format!("{}.strip()", recv),
            "trim_start" => format!("{}.lstrip()", recv),
            "trim_end" => format!("{}.rstrip()", recv),
            "starts_with" => format!("{}.startswith({})", recv, arg_strs[0]),
            "ends_with" => format!("{}.endswith({})", recv, arg_strs[0]),
            "to_int" => format!("int({})", recv),
            "to_float" => format!("float({})", recv),
            "keys" => format!("list({}.keys())", recv),
            "values" => format!("list({}.values())", recv),
            "remove" => format!("{}.pop({}, None)", recv, arg_strs[0]),
            // pop, get, clear, reverse, upper, lower, split, replace, and
            // opaque-module members share Python's spelling.
            _ => format!("{}.{}({})", recv, method, arg_strs.join(", ")),
        }
    }
}

impl Default for PyCodeGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a type annotation as Python source (used for dataclass
/// fields). User-declared types emit their bare name.
fn type_to_python(ty: &Type) -> String {
    match ty {
        Type::Int => "int".to_string(),
        Type::Float => "float".to_string(),
        Type::Bool => "bool".to_string(),
        Type::Str => "str".to_string(),
        Type::List(element) => format!("list[{}]", type_to_python(element)),
        Type::Dict(key, value) => {
            format!("dict[{}, {}]", type_to_python(key), type_to_python(value))
        }
        Type::Struct(name) | Type::Enum(name) => name.clone(),
        _ => "object".to_string(),
    }
}

fn python_binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

/// Scan for uses of the builtin static modules so their aliased host
/// imports are emitted only when needed.
fn scan_static_modules(program: &Program) -> (bool, bool) {
    let mut uses_file = false;
    let mut uses_env = false;
    for item in &program.items {
        scan_decl(item, &mut uses_file, &mut uses_env);
    }
    (uses_file, uses_env)
}

fn scan_decl(decl: &Decl, uses_file: &mut bool, uses_env: &mut bool) {
    match decl {
        Decl::Var(d) => scan_expr(&d.initializer, uses_file, uses_env),
        Decl::Const(d) => scan_expr(&d.initializer, uses_file, uses_env),
        Decl::Fn(d) => scan_block(&d.body, uses_file, uses_env),
        Decl::Stmt(s) => scan_stmt(s, uses_file, uses_env),
        Decl::Struct(_) | Decl::Enum(_) | Decl::Import(_) => {}
    }
}

fn scan_block(block: &Block, uses_file: &mut bool, uses_env: &mut bool) {
    for item in &block.items {
        scan_decl(item, uses_file, uses_env);
    }
}

fn scan_stmt(stmt: &Stmt, uses_file: &mut bool, uses_env: &mut bool) {
    match &stmt.kind {
        StmtKind::Expr(e) => scan_expr(e, uses_file, uses_env),
        StmtKind::Print(p) => {
            for arg in &p.arguments {
                scan_expr(arg, uses_file, uses_env);
            }
            if let Some(sep) = &p.sep {
                scan_expr(sep, uses_file, uses_env);
            }
            if let Some(end) = &p.end {
                scan_expr(end, uses_file, uses_env);
            }
        }
        StmtKind::Assign { target, value } => {
            match target {
                AssignTarget::Index { target, index, .. } => {
                    scan_expr(target, uses_file, uses_env);
                    scan_expr(index, uses_file, uses_env);
                }
                AssignTarget::Member { object, .. } => scan_expr(object, uses_file, uses_env),
                AssignTarget::Name { .. } => {}
            }
            scan_expr(value, uses_file, uses_env);
        }
        StmtKind::If {
            condition,
            then_block,
            else_block,
        } => {
            scan_expr(condition, uses_file, uses_env);
            scan_block(then_block, uses_file, uses_env);
            if let Some(else_block) = else_block {
                scan_block(else_block, uses_file, uses_env);
            }
        }
        StmtKind::While { condition, body } => {
            scan_expr(condition, uses_file, uses_env);
            scan_block(body, uses_file, uses_env);
        }
        StmtKind::For { iterable, body, .. } => {
            scan_expr(iterable, uses_file, uses_env);
            scan_block(body, uses_file, uses_env);
        }
        StmtKind::Return(value) => scan_expr(value, uses_file, uses_env),
        StmtKind::Block(block) => scan_block(block, uses_file, uses_env),
        StmtKind::Break | StmtKind::Continue => {}
    }
}

fn scan_expr(expr: &Expr, uses_file: &mut bool, uses_env: &mut bool) {
    match &expr.kind {
        ExprKind::MethodCall {
            receiver,
            method: _,
            args,
        } => {
            if let ExprKind::Ident(name) = &receiver.kind {
                match name.as_str() {
                    "File" => *uses_file = true,
                    "Env" => *uses_env = true,
                    _ => {}
                }
            }
            scan_expr(receiver, uses_file, uses_env);
            for arg in args {
                scan_expr(arg, uses_file, uses_env);
            }
        }
        ExprKind::ListLit(elements) => {
            for e in elements {
                scan_expr(e, uses_file, uses_env);
            }
        }
        ExprKind::DictLit(entries) => {
            for (k, v) in entries {
                scan_expr(k, uses_file, uses_env);
                scan_expr(v, uses_file, uses_env);
            }
        }
        ExprKind::Range { start, end } => {
            scan_expr(start, uses_file, uses_env);
            scan_expr(end, uses_file, uses_env);
        }
        ExprKind::Binary { left, right, .. } => {
            scan_expr(left, uses_file, uses_env);
            scan_expr(right, uses_file, uses_env);
        }
        ExprKind::Unary { operand, .. } => scan_expr(operand, uses_file, uses_env),
        ExprKind::Call { args, .. } => {
            for arg in args {
                scan_expr(arg, uses_file, uses_env);
            }
        }
        ExprKind::Member { object, .. } => scan_expr(object, uses_file, uses_env),
        ExprKind::Index { target, index } => {
            scan_expr(target, uses_file, uses_env);
            scan_expr(index, uses_file, uses_env);
        }
        ExprKind::StructInit { fields, .. } => {
            for field in fields {
                scan_expr(&field.value, uses_file, uses_env);
            }
        }
        ExprKind::IntLit(_)
        | ExprKind::FloatLit { .. }
        | ExprKind::StringLit { .. }
        | ExprKind::BoolLit(_)
        | ExprKind::Ident(_)
        | ExprKind::EnumVariant { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use crate::frontend::semantic::{analyze, NoImports};

    fn emit(source: &str) -> String {
        let (tokens, lex_errors) = Lexer::new(source).tokenize();
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
        let mut program = Parser::new(tokens, "test.qsr")
            .parse()
            .expect("parse failed");
        let mut resolver = NoImports;
        analyze(&mut program, &mut resolver).expect("analysis failed");
        PyCodeGen::new().generate(&program)
    }

    #[test]
    fn test_var_decl() {
        assert_eq!(emit("let x: int = 42"), "x = 42\n");
    }

    #[test]
    fn test_float_lexeme_preserved() {
        assert_eq!(emit("let x: float = 1.0"), "x = 1.0\n");
    }

    #[test]
    fn test_string_lexeme_preserved() {
        assert_eq!(emit(r#"let s: str = "a\nb""#), "s = \"a\\nb\"\n");
    }

    #[test]
    fn test_bool_literals() {
        assert_eq!(emit("let b: bool = true"), "b = True\n");
        assert_eq!(emit("let b: bool = false"), "b = False\n");
    }

    #[test]
    fn test_defensive_parens() {
        assert_eq!(emit("let x: int = (2 + 3) * 4"), "x = ((2 + 3) * 4)\n");
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            emit("let b: bool = true && false || !true"),
            "b = ((True and False) or not True)\n"
        );
    }

    #[test]
    fn test_fn_emission() {
        let code = emit("fn add(a: int, b: int) -> int { return a + b }");
        assert_eq!(code, "def add(a, b):\n    return (a + b)\n");
    }

    #[test]
    fn test_if_else() {
        let code = emit("let x: int = 1\nif x > 0 { print(1) } else { print(2) }");
        assert!(code.contains("if (x > 0):"));
        assert!(code.contains("    print(1)"));
        assert!(code.contains("else:"));
        assert!(code.contains("    print(2)"));
    }

    #[test]
    fn test_empty_block_emits_pass() {
        let code = emit("let x: int = 1\nif x > 0 { }");
        assert!(code.contains("if (x > 0):\n    pass"));
    }

    #[test]
    fn test_while() {
        let code = emit("let i: int = 0\nwhile i < 3 { i = i + 1 }");
        assert!(code.contains("while (i < 3):"));
        assert!(code.contains("    i = (i + 1)"));
    }

    #[test]
    fn test_for_range() {
        let code = emit("for i in 0..10 { print(i) }");
        assert!(code.contains("for i in range(0, 10):"));
    }

    #[test]
    fn test_for_list() {
        let code = emit("let xs: [int] = [1, 2]\nfor x in xs { print(x) }");
        assert!(code.contains("for x in xs:"));
    }

    #[test]
    fn test_struct_emission() {
        let code = emit("struct Point { x: int, y: int }");
        assert!(code.starts_with("from dataclasses import dataclass\n\n"));
        assert!(code.contains("@dataclass\nclass Point:\n    x: int\n    y: int\n"));
    }

    #[test]
    fn test_struct_init_emission() {
        let code = emit("struct Point { x: int, y: int }\nlet p: Point = Point { x: 1, y: 2 }");
        assert!(code.contains("p = Point(x=1, y=2)"));
    }

    #[test]
    fn test_struct_field_annotations() {
        let code = emit("struct Bag { items: [str], counts: Dict[str, int] }");
        assert!(code.contains("items: list[str]"));
        assert!(code.contains("counts: dict[str, int]"));
    }

    #[test]
    fn test_enum_emission() {
        let code = emit("enum Color { Red, Green }");
        assert!(code.starts_with("from enum import Enum\n\n"));
        assert!(code.contains("class Color(Enum):"));
        assert!(code.contains("    Red = \"Red\""));
        assert!(code.contains("    Green = \"Green\""));
    }

    #[test]
    fn test_enum_access_emission() {
        let code = emit("enum Color { Red }\nlet c: Color = Color.Red");
        assert!(code.contains("c = Color.Red"));
    }

    #[test]
    fn test_print_plain() {
        assert_eq!(emit("print(1, 2)"), "print(1, 2)\n");
    }

    #[test]
    fn test_print_sep_end() {
        let code = emit(r#"print(1, 2, sep=", ", end="!")"#);
        assert_eq!(code, "print(1, 2, sep=\", \", end=\"!\")\n");
    }

    #[test]
    fn test_print_format_mode() {
        let code = emit(r#"print("x={}", 5)"#);
        assert_eq!(code, "print(\"x={}\".format(5))\n");
    }

    #[test]
    fn test_print_format_mode_keeps_end() {
        let code = emit(r#"print("x={}", 5, end="")"#);
        assert_eq!(code, "print(\"x={}\".format(5), end=\"\")\n");
    }

    #[test]
    fn test_push_builtin_and_method() {
        let code = emit("let xs: [int] = []\npush(xs, 1)\nxs.push(2)");
        assert!(code.contains("xs.append(1)"));
        assert!(code.contains("xs.append(2)"));
    }

    #[test]
    fn test_contains_emission() {
        let code = emit("let xs: [int] = [1]\nlet b: bool = xs.contains(1)");
        assert!(code.contains("b = (1 in xs)"));
    }

    #[test]
    fn test_join_inverts_receiver() {
        let code = emit(r#"let xs: [str] = ["a"]
let s: str = xs.join(", ")"#);
        assert!(code.contains("s = \", \".join(xs)"));
    }

    #[test]
    fn test_string_method_mappings() {
        let code = emit(
            "let s: str = \" hi \"\n\
             let a: str = s.trim()\n\
             let b: str = s.trim_start()\n\
             let c: str = s.trim_end()\n\
             let d: bool = s.starts_with(\"h\")\n\
             let e: int = s.to_int()\n\
             let g: str = s.upper()",
        );
        assert!(code.contains("a = s.strip()"));
        assert!(code.contains("b = s.lstrip()"));
        assert!(code.contains("c = s.rstrip()"));
        assert!(code.contains("d = s.startswith(\"h\")"));
        assert!(code.contains("e = int(s)"));
        assert!(code.contains("g = s.upper()"));
    }

    #[test]
    fn test_dict_method_mappings() {
        let code = emit(
            "let d: Dict[str, int] = {\"a\": 1}\n\
             let b: bool = d.has_key(\"a\")\n\
             let v: int = d.get(\"b\", 0)\n\
             let ks: [str] = d.keys()\n\
             d.remove(\"a\")\n\
             d.clear()",
        );
        assert!(code.contains("b = (\"a\" in d)"));
        assert!(code.contains("v = d.get(\"b\", 0)"));
        assert!(code.contains("ks = list(d.keys())"));
        assert!(code.contains("d.pop(\"a\", None)"));
        assert!(code.contains("d.clear()"));
    }

    #[test]
    fn test_keys_values_builtins() {
        let code = emit(
            "let d: Dict[str, int] = {\"a\": 1}\nlet ks: [str] = keys(d)\nlet vs: [int] = values(d)",
        );
        assert!(code.contains("ks = list(d.keys())"));
        assert!(code.contains("vs = list(d.values())"));
    }

    #[test]
    fn test_dict_literal_emission() {
        let code = emit(r#"let d: Dict[str, int] = {"a": 1, "b": 2}"#);
        assert!(code.contains("d = {\"a\": 1, \"b\": 2}"));
    }

    #[test]
    fn test_member_assign() {
        let code = emit(
            "struct P { x: int }\nlet p: P = P { x: 1 }\np.x = 5",
        );
        assert!(code.contains("p.x = 5"));
    }

    #[test]
    fn test_index_assign() {
        let code = emit("let xs: [int] = [1]\nxs[0] = 2");
        assert!(code.contains("xs[0] = 2"));
    }

    #[test]
    fn test_python_import_passthrough() {
        let code = emit("import math\nlet r: float = math.sqrt(2.0)");
        assert!(code.contains("import math"));
        assert!(code.contains("r = math.sqrt(2.0)"));
    }

    #[test]
    fn test_file_exists_mapping() {
        let code = emit(r#"let e: bool = File.exists("x.txt")"#);
        assert!(code.starts_with("import os as _q_os\n\n"));
        assert!(code.contains("e = _q_os.path.exists(\"x.txt\")"));
    }

    #[test]
    fn test_env_args_mapping() {
        let code = emit("let args: [str] = Env.args()");
        assert!(code.starts_with("import sys as _q_sys\n\n"));
        assert!(code.contains("args = list(_q_sys.argv)"));
    }

    #[test]
    fn test_no_alias_imports_when_unused() {
        let code = emit("let x: int = 42");
        assert!(!code.contains("_q_os"));
        assert!(!code.contains("_q_sys"));
        assert_eq!(code, "x = 42\n");
    }

    #[test]
    fn test_blank_line_between_functions() {
        let code = emit("fn a() -> int { return 1 }\nfn b() -> int { return 2 }");
        assert!(code.contains("return 1\n\ndef b"));
    }

    #[test]
    fn test_deterministic_output() {
        let source = "struct P { x: int }\nenum C { A, B }\nfn f(p: P) -> int { return p.x }\nlet p: P = P { x: 1 }\nprint(f(p))";
        assert_eq!(emit(source), emit(source));
    }

    #[test]
    fn test_local_import_emission() {
        // Codegen only; analysis of imports is covered elsewhere.
        let program = Program {
            items: vec![Decl::Import(ImportDecl {
                module: "./sub/util.qsr".to_string(),
                is_local: true,
                span: crate::utils::location::Span::dummy(),
            })],
            file: "test.qsr".to_string(),
            span: crate::utils::location::Span::dummy(),
        };
        let code = PyCodeGen::new().generate(&program);
        assert_eq!(code, "import sub.util\n");
    }
}
