use crate::parser::ast::*;

/// Pretty-print a program back into source text, one statement per line.
pub fn pretty_print(nodes: &[Node]) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_statements(nodes);
    pp.buf
}

/// Pretty-print a single expression on one line (used to display quoted forms).
pub fn pretty_expr(expr: &Expr) -> String {
    let mut pp = PrettyPrinter::new();
    pp.inline = true;
    pp.emit_expr(expr, 0);
    pp.buf
}

struct PrettyPrinter {
    buf: String,
    indent: usize,
    /// Keep everything on one line: multi-statement blocks and match arms use `;`/`,`.
    inline: bool,
}

const PREC_UNARY: u8 = 7;
const PREC_POW: u8 = 8;
const PREC_POSTFIX: u8 = 10;

impl PrettyPrinter {
    fn new() -> Self {
        Self { buf: String::new(), indent: 0, inline: false }
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
    }

    fn indent(&mut self) {
        self.indent += 1;
    }

    fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// One statement per line. A line that would open with a continuation token
    /// (`[`, `(`, `-`, `+`) gets a `;` on the line above so it stays a statement.
    fn emit_statements(&mut self, stmts: &[Node]) {
        let mut prev_end: Option<usize> = None;
        for stmt in stmts {
            self.write_indent();
            let start = self.buf.len();
            self.emit_expr(&stmt.node, 0);
            if let Some(end) = prev_end {
                if self.buf[start..].starts_with(['[', '(', '-', '+']) {
                    self.buf.insert(end, ';');
                }
            }
            prev_end = Some(self.buf.len());
            self.newline();
        }
    }

    fn emit_list<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            each(self, item);
        }
    }

    fn emit_expr(&mut self, expr: &Expr, parent_prec: u8) {
        match expr {
            Expr::Literal { value } => self.emit_literal(value, parent_prec),
            Expr::Identifier { name } => self.write(name),
            Expr::BinaryOp { op, left, right } => {
                let prec = binop_prec(*op);
                let need_parens = prec < parent_prec;
                if need_parens {
                    self.write("(");
                }
                // `^` is right-associative: the left child needs the tighter context
                let (lp, rp) = if *op == BinOp::Pow { (prec + 1, prec) } else { (prec, prec + 1) };
                self.emit_expr(&left.node, lp);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.emit_expr(&right.node, rp);
                if need_parens {
                    self.write(")");
                }
            }
            Expr::UnaryOp { op, operand } => {
                let need_parens = PREC_UNARY < parent_prec;
                if need_parens {
                    self.write("(");
                }
                self.write(op.symbol());
                self.emit_expr(&operand.node, PREC_POW);
                if need_parens {
                    self.write(")");
                }
            }
            Expr::Assignment { target, value } => {
                let need_parens = 0 < parent_prec;
                if need_parens {
                    self.write("(");
                }
                self.emit_expr(&target.node, 1);
                self.write(" := ");
                self.emit_expr(&value.node, 0);
                if need_parens {
                    self.write(")");
                }
            }
            Expr::FieldAccess { object, field } => {
                self.emit_expr(&object.node, PREC_POSTFIX);
                self.write(".");
                self.write(&field.node);
            }
            Expr::MethodCall { receiver, method, args } => {
                if let Some(receiver) = receiver {
                    self.emit_expr(&receiver.node, PREC_POSTFIX);
                    self.write(".");
                }
                self.write(&method.node);
                self.write("(");
                self.emit_list(args, |pp, a| pp.emit_expr(&a.node, 0));
                self.write(")");
            }
            Expr::Block { params, body } => self.emit_block(params, body),
            Expr::MatchExpression { scrutinee, arms } => {
                self.write("match ");
                self.emit_expr(&scrutinee.node, 1);
                if self.inline || arms.is_empty() {
                    self.write(" { ");
                    self.emit_list(arms, |pp, arm| pp.emit_arm(arm));
                    self.write(" }");
                    return;
                }
                self.write(" {");
                self.newline();
                self.indent();
                for (i, arm) in arms.iter().enumerate() {
                    self.write_indent();
                    self.emit_arm(arm);
                    if i + 1 < arms.len() {
                        self.write(",");
                    }
                    self.newline();
                }
                self.dedent();
                self.write_indent();
                self.write("}");
            }
            Expr::TypeInstance { name, fields } => {
                self.write(&name.node);
                self.write(" { ");
                self.emit_list(fields, |pp, (k, v)| {
                    pp.write(&k.node);
                    pp.write(": ");
                    pp.emit_expr(&v.node, 0);
                });
                self.write(" }");
            }
            Expr::TypeDeclaration { decl } => self.emit_type_decl(decl),
            Expr::FunctionDeclaration { decl } => self.emit_function(decl),
            Expr::CapturePattern { name, pattern } => {
                self.write("?");
                if let Some(name) = name {
                    self.write(name);
                }
                if let Some(pattern) = pattern {
                    self.write(" ");
                    self.emit_expr(&pattern.node, 0);
                }
            }
            Expr::QuotedForm { body } => {
                self.write("#");
                self.emit_expr(&body.node, PREC_POSTFIX);
            }
            Expr::Array { elements } => {
                self.write("[");
                self.emit_list(elements, |pp, e| pp.emit_expr(&e.node, 0));
                self.write("]");
            }
            Expr::Object { entries } => {
                if entries.is_empty() {
                    self.write("[:]");
                    return;
                }
                self.write("[");
                self.emit_list(entries, |pp, (k, v)| {
                    pp.emit_key(&k.node);
                    pp.write(": ");
                    pp.emit_expr(&v.node, 0);
                });
                self.write("]");
            }
            Expr::KeyValue { key, value } => {
                self.emit_expr(&key.node, 0);
                self.write(": ");
                self.emit_expr(&value.node, 0);
            }
        }
    }

    fn emit_literal(&mut self, value: &Literal, parent_prec: u8) {
        match value {
            Literal::Int(n) if *n < 0 && parent_prec >= PREC_UNARY => {
                self.write(&format!("({n})"));
            }
            Literal::Int(n) => self.write(&n.to_string()),
            Literal::Float(f) => {
                let s = f.to_string();
                let negative = *f < 0.0 && parent_prec >= PREC_UNARY;
                if negative {
                    self.write("(");
                }
                self.write(&s);
                // Ensure decimal point is present
                if f.is_finite() && !s.contains('.') {
                    self.write(".0");
                }
                if negative {
                    self.write(")");
                }
            }
            Literal::Boolean(b) => self.write(if *b { "true" } else { "false" }),
            Literal::String(s) => {
                self.write("\"");
                self.write(&escape_string(s));
                self.write("\"");
            }
        }
    }

    fn emit_key(&mut self, key: &str) {
        let is_ident = key.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !crate::lexer::is_keyword(key);
        if is_ident {
            self.write(key);
        } else {
            self.write("\"");
            self.write(&escape_string(key));
            self.write("\"");
        }
    }

    fn emit_arm(&mut self, arm: &PatternArm) {
        self.emit_expr(&arm.pattern.node, 0);
        self.write(" => ");
        self.emit_expr(&arm.body.node, 0);
    }

    fn emit_params(&mut self, params: &[Param]) {
        self.emit_list(params, |pp, p| {
            pp.write(&p.name.node);
            if let Some(ann) = &p.annotation {
                pp.write(": ");
                pp.write(&ann.node.to_string());
            }
        });
    }

    fn emit_block(&mut self, params: &[Param], body: &[Node]) {
        self.write("{");
        if !params.is_empty() {
            self.write(" ");
            self.emit_params(params);
            self.write(" |");
        }
        if body.len() <= 1 || self.inline {
            for (i, stmt) in body.iter().enumerate() {
                self.write(if i > 0 { "; " } else { " " });
                self.emit_expr(&stmt.node, 0);
            }
            self.write(" }");
            return;
        }
        self.newline();
        self.indent();
        self.emit_statements(body);
        self.dedent();
        self.write_indent();
        self.write("}");
    }

    fn emit_type_params(&mut self, type_params: &[TypeParam]) {
        if type_params.is_empty() {
            return;
        }
        self.write("[");
        self.emit_list(type_params, |pp, tp| {
            pp.write(&tp.name.node);
            if let Some(c) = &tp.constraint {
                pp.write(" <: ");
                pp.write(&c.node.to_string());
            }
        });
        self.write("]");
    }

    fn emit_function(&mut self, decl: &FunctionDecl) {
        self.write("fn ");
        self.write(&decl.name.node);
        self.emit_type_params(&decl.type_params);
        self.write("(");
        self.emit_params(&decl.params);
        self.write(") := ");
        self.emit_expr(&decl.body.node, 1);
    }

    fn emit_fields(&mut self, fields: &[FieldDecl]) {
        self.emit_list(fields, |pp, f| {
            pp.write(&f.name.node);
            pp.write(": ");
            pp.write(&f.ty.node.to_string());
        });
    }

    fn emit_type_decl(&mut self, decl: &TypeDecl) {
        let keyword = if decl.body == TypeDeclBody::Abstract { "abstract " } else { "type " };
        self.write(keyword);
        self.write(&decl.name.node);
        self.emit_type_params(&decl.type_params);
        if let Some(parent) = &decl.parent {
            self.write(" <: ");
            self.write(&parent.node.to_string());
        }
        match &decl.body {
            TypeDeclBody::Abstract | TypeDeclBody::Concrete => {}
            TypeDeclBody::Struct { fields } => {
                self.write(" { ");
                self.emit_fields(fields);
                self.write(" }");
            }
            TypeDeclBody::Adt { variants } => {
                self.write(" = ");
                for (i, v) in variants.iter().enumerate() {
                    if i > 0 {
                        self.write(" | ");
                    }
                    self.write(&v.name.node);
                    if !v.fields.is_empty() {
                        self.write("(");
                        self.emit_fields(&v.fields);
                        self.write(")");
                    }
                }
            }
        }
    }
}

fn binop_prec(op: BinOp) -> u8 {
    match op {
        BinOp::Or => 1,
        BinOp::And => 2,
        BinOp::Eq | BinOp::Neq => 3,
        BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => 4,
        BinOp::Add | BinOp::Sub => 5,
        BinOp::Mul | BinOp::Div | BinOp::Mod => 6,
        BinOp::Pow => PREC_POW,
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
