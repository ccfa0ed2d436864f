pub mod ast;
mod decl;
mod pattern;

use crate::diagnostics::ParseError;
use crate::lexer::{self, Token};
use crate::span::{Span, Spanned};
use ast::*;

/// Parse a whole program: one node per top-level statement.
pub fn parse(source: &str) -> Result<Vec<Node>, ParseError> {
    let tokens = lexer::lex(source);
    let mut parser = Parser::new(&tokens, source);
    parser.parse_program()
}

static EOF: Spanned<Token> = Spanned {
    node: Token::Eof,
    span: Span { start: 0, end: 0, line: 0, column: 0 },
};

/// Binding power of prefix `-`, `!` and `#`.
const UNARY_BP: u8 = 18;
/// Right binding power of `:=`, also used for declaration bodies.
const ASSIGN_RBP: u8 = 1;

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
    /// Set while parsing a match scrutinee so `x {` is not read as a type instance.
    restrict_type_instance: bool,
    /// Set while parsing the direct elements of a `[...]` literal.
    allow_key_value: bool,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str) -> Self {
        Self { tokens, source, pos: 0, restrict_type_instance: false, allow_key_value: false }
    }

    fn peek(&self) -> &'a Spanned<Token> {
        let tokens: &'a [Spanned<Token>] = self.tokens;
        tokens.get(self.pos).unwrap_or(&EOF)
    }

    fn peek_at(&self, offset: usize) -> &'a Spanned<Token> {
        let tokens: &'a [Spanned<Token>] = self.tokens;
        tokens.get(self.pos + offset).unwrap_or(&EOF)
    }

    fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(&self.peek().node) == std::mem::discriminant(expected)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().node, Token::Eof)
    }

    fn advance(&mut self) -> &'a Spanned<Token> {
        let tok = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<&'a Spanned<Token>, ParseError> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(ParseError::new(format!("expected {expected}, found {}", tok.node), tok.span))
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, ParseError> {
        let tok = self.peek();
        match &tok.node {
            Token::Ident(name) => {
                self.advance();
                Ok(Spanned::new(name.clone(), tok.span))
            }
            other => Err(ParseError::new(format!("expected identifier, found {other}"), tok.span)),
        }
    }

    /// Span of the most recently consumed token.
    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_else(Span::dummy)
    }

    /// True if a line break separates the previous token from the current one.
    fn starts_new_line(&self) -> bool {
        if self.pos == 0 {
            return false;
        }
        let prev_end = self.prev_span().end;
        let next_start = self.peek().span.start;
        if next_start < prev_end {
            return false;
        }
        self.source.get(prev_end..next_start).is_some_and(|gap| gap.contains('\n'))
    }

    /// True if the current token directly touches the previous one (`?name`).
    fn is_adjacent(&self) -> bool {
        self.pos > 0 && self.prev_span().end == self.peek().span.start
    }

    pub fn parse_program(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            while self.check(&Token::Semicolon) {
                self.advance();
            }
            if self.at_eof() {
                break;
            }
            nodes.push(self.parse_nested(0)?);
            self.expect_statement_end(false)?;
        }
        Ok(nodes)
    }

    /// A statement ends at `;` (consumed), end of input, a line break, or `}` inside a block.
    fn expect_statement_end(&mut self, in_block: bool) -> Result<(), ParseError> {
        let tok = self.peek();
        match &tok.node {
            Token::Semicolon => {
                self.advance();
                Ok(())
            }
            Token::Eof => Ok(()),
            Token::RBrace if in_block => Ok(()),
            Token::Eq => Err(ParseError::new("unexpected '=' (use ':=' for assignment)", tok.span)),
            _ if self.starts_new_line() => Ok(()),
            other => Err(ParseError::new(format!("unexpected {other} after expression"), tok.span)),
        }
    }

    /// Parse an expression in a fresh context: no key-value pairs, type instances allowed.
    fn parse_nested(&mut self, min_bp: u8) -> Result<Node, ParseError> {
        let old_kv = std::mem::replace(&mut self.allow_key_value, false);
        let old_restrict = std::mem::replace(&mut self.restrict_type_instance, false);
        let result = self.parse_expr(min_bp);
        self.allow_key_value = old_kv;
        self.restrict_type_instance = old_restrict;
        result
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Node, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let tok = self.peek();
            if self.starts_new_line() && !is_continuation(&tok.node) {
                break;
            }

            // Member access binds tighter than any infix operator
            if matches!(tok.node, Token::Dot) {
                self.advance();
                let name = self.expect_ident()?;
                if self.check(&Token::LParen) {
                    let (args, close) = self.parse_call_args()?;
                    let span = lhs.span.to(close);
                    lhs = Spanned::new(
                        Expr::MethodCall { receiver: Some(Box::new(lhs)), method: name, args },
                        span,
                    );
                } else {
                    let span = lhs.span.to(name.span);
                    lhs = Spanned::new(Expr::FieldAccess { object: Box::new(lhs), field: name }, span);
                }
                continue;
            }

            // Index sugar: a[i] is a.at(i)
            if matches!(tok.node, Token::LBracket) {
                self.advance();
                let index = self.parse_nested(0)?;
                let close = self.expect(&Token::RBracket)?;
                let span = lhs.span.to(close.span);
                lhs = Spanned::new(
                    Expr::MethodCall {
                        receiver: Some(Box::new(lhs)),
                        method: Spanned::new("at".to_string(), tok.span),
                        args: vec![index],
                    },
                    span,
                );
                continue;
            }

            let Some((lbp, rbp)) = infix_binding_power(&tok.node, self.allow_key_value) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance();

            match &tok.node {
                Token::ColonEq => {
                    let valid_target = match &lhs.node {
                        Expr::Identifier { .. } => true,
                        Expr::TypeInstance { .. } => lhs.node.contains_capture(),
                        _ => false,
                    };
                    if !valid_target {
                        return Err(ParseError::new(
                            "invalid assignment target: expected an identifier or a destructuring pattern",
                            lhs.span,
                        ));
                    }
                    let value = self.parse_expr(rbp)?;
                    let span = lhs.span.to(value.span);
                    lhs = Spanned::new(Expr::Assignment { target: Box::new(lhs), value: Box::new(value) }, span);
                }
                Token::Colon => {
                    let value = self.parse_expr(rbp)?;
                    let span = lhs.span.to(value.span);
                    lhs = Spanned::new(Expr::KeyValue { key: Box::new(lhs), value: Box::new(value) }, span);
                }
                other => {
                    let op = binop_for(other).ok_or_else(|| {
                        ParseError::new(format!("unexpected {other} in expression"), tok.span)
                    })?;
                    let rhs = self.parse_expr(rbp)?;
                    let span = lhs.span.to(rhs.span);
                    lhs = Spanned::new(Expr::BinaryOp { op, left: Box::new(lhs), right: Box::new(rhs) }, span);
                }
            }
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Node, ParseError> {
        let tok = self.peek();
        match &tok.node {
            Token::IntLit(n) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal { value: Literal::Int(*n) }, tok.span))
            }
            Token::FloatLit(n) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal { value: Literal::Float(*n) }, tok.span))
            }
            Token::IntOverflow(text) => Err(ParseError::new(
                format!("integer literal {text} is out of range for Int (max {})", i64::MAX),
                tok.span,
            )),
            Token::StringLit(s) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal { value: Literal::String(s.clone()) }, tok.span))
            }
            Token::True | Token::False => {
                self.advance();
                let value = Literal::Boolean(matches!(tok.node, Token::True));
                Ok(Spanned::new(Expr::Literal { value }, tok.span))
            }
            Token::Ident(_) => {
                let ident = self.expect_ident()?;
                self.parse_expr_after_ident(ident)
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_nested(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => self.parse_list(),
            Token::LBrace => self.parse_block(),
            Token::Minus | Token::Bang => {
                self.advance();
                let op = if matches!(tok.node, Token::Minus) { UnaryOp::Neg } else { UnaryOp::Not };
                let operand = self.parse_expr(UNARY_BP)?;
                let span = tok.span.to(operand.span);
                Ok(Spanned::new(Expr::UnaryOp { op, operand: Box::new(operand) }, span))
            }
            Token::Question => self.parse_capture(),
            Token::Hash => {
                self.advance();
                let body = self.parse_expr(UNARY_BP)?;
                let span = tok.span.to(body.span);
                Ok(Spanned::new(Expr::QuotedForm { body: Box::new(body) }, span))
            }
            Token::Fn => self.parse_function_decl(),
            // `type(x)` is the builtin, not a declaration
            Token::Type if matches!(self.peek_at(1).node, Token::LParen) => {
                self.advance();
                self.parse_expr_after_ident(Spanned::new("type".to_string(), tok.span))
            }
            Token::Type => self.parse_type_decl(),
            Token::Abstract => self.parse_abstract_decl(),
            Token::Match => self.parse_match(),
            Token::Trait | Token::Impl | Token::For => Err(ParseError::new(
                format!("{} is a reserved keyword and cannot start an expression", tok.node),
                tok.span,
            )),
            Token::Eq => Err(ParseError::new("unexpected '=' (use ':=' for assignment)", tok.span)),
            Token::Eof => Err(ParseError::new("unexpected end of input in expression", tok.span)),
            other => Err(ParseError::new(format!("unexpected {other} in expression"), tok.span)),
        }
    }

    /// Continue after an identifier: global call, type instance, or plain identifier.
    fn parse_expr_after_ident(&mut self, ident: Spanned<String>) -> Result<Node, ParseError> {
        if self.check(&Token::LParen) {
            let (args, close) = self.parse_call_args()?;
            let span = ident.span.to(close);
            return Ok(Spanned::new(Expr::MethodCall { receiver: None, method: ident, args }, span));
        }
        if !self.restrict_type_instance && self.is_type_instance_ahead() {
            let (fields, close) = self.parse_instance_fields(|p| p.parse_nested(0))?;
            let span = ident.span.to(close);
            return Ok(Spanned::new(Expr::TypeInstance { name: ident, fields }, span));
        }
        let span = ident.span;
        Ok(Spanned::new(Expr::Identifier { name: ident.node }, span))
    }

    /// `{ ident :` after a name starts a type instance rather than a block.
    fn is_type_instance_ahead(&self) -> bool {
        matches!(self.peek().node, Token::LBrace)
            && matches!(self.peek_at(1).node, Token::Ident(_))
            && matches!(self.peek_at(2).node, Token::Colon)
    }

    /// Parse `{ name: <item>, ... }`; fields are separated by commas or line breaks.
    fn parse_instance_fields(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<Node, ParseError>,
    ) -> Result<(Vec<(Spanned<String>, Node)>, Span), ParseError> {
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        loop {
            while self.check(&Token::Comma) {
                self.advance();
            }
            if self.check(&Token::RBrace) {
                break;
            }
            let name = self.expect_ident()?;
            self.expect(&Token::Colon)?;
            let value = item(self)?;
            fields.push((name, value));
            if !self.check(&Token::Comma) && !self.check(&Token::RBrace) && !self.starts_new_line() {
                let tok = self.peek();
                return Err(ParseError::new(format!("expected ',' or '}}', found {}", tok.node), tok.span));
            }
        }
        let close = self.expect(&Token::RBrace)?;
        Ok((fields, close.span))
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Node>, Span), ParseError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            if !args.is_empty() {
                self.expect(&Token::Comma)?;
                if self.check(&Token::RParen) {
                    break;
                }
            }
            args.push(self.parse_nested(0)?);
        }
        let close = self.expect(&Token::RParen)?;
        Ok((args, close.span))
    }

    /// `[...]`: an Array, or an Object when every element is a `key: value` pair.
    fn parse_list(&mut self) -> Result<Node, ParseError> {
        let open = self.expect(&Token::LBracket)?;
        if matches!(self.peek().node, Token::Colon) && matches!(self.peek_at(1).node, Token::RBracket) {
            self.advance();
            let close = self.advance();
            return Ok(Spanned::new(Expr::Object { entries: Vec::new() }, open.span.to(close.span)));
        }

        let mut elements = Vec::new();
        while !self.check(&Token::RBracket) {
            if !elements.is_empty() {
                self.expect(&Token::Comma)?;
                if self.check(&Token::RBracket) {
                    break;
                }
            }
            let old_kv = std::mem::replace(&mut self.allow_key_value, true);
            let old_restrict = std::mem::replace(&mut self.restrict_type_instance, false);
            let element = self.parse_expr(0);
            self.allow_key_value = old_kv;
            self.restrict_type_instance = old_restrict;
            elements.push(element?);
        }
        let close = self.expect(&Token::RBracket)?;
        let span = open.span.to(close.span);

        let pairs = elements.iter().filter(|e| matches!(e.node, Expr::KeyValue { .. })).count();
        if pairs == 0 {
            return Ok(Spanned::new(Expr::Array { elements }, span));
        }
        if pairs != elements.len() {
            return Err(ParseError::new(
                "cannot mix key-value pairs and plain values in a list literal",
                span,
            ));
        }

        let mut entries = Vec::with_capacity(elements.len());
        for element in elements {
            let Expr::KeyValue { key, value } = element.node else { continue };
            let key = match key.node {
                Expr::Identifier { name } => Spanned::new(name, key.span),
                Expr::Literal { value: Literal::String(s) } => Spanned::new(s, key.span),
                _ => {
                    return Err(ParseError::new("object keys must be identifiers or strings", key.span));
                }
            };
            entries.push((key, *value));
        }
        Ok(Spanned::new(Expr::Object { entries }, span))
    }

    /// `{ stmts }` or a closure `{ a, b: Type | stmts }`.
    fn parse_block(&mut self) -> Result<Node, ParseError> {
        let open = self.expect(&Token::LBrace)?;
        let checkpoint = self.pos;
        let params = match self.try_block_params() {
            Some(params) => params,
            None => {
                self.pos = checkpoint;
                Vec::new()
            }
        };

        let mut body = Vec::new();
        loop {
            while self.check(&Token::Semicolon) {
                self.advance();
            }
            if self.check(&Token::RBrace) {
                break;
            }
            if self.at_eof() {
                return Err(ParseError::new("unclosed block: expected '}'", open.span));
            }
            body.push(self.parse_nested(0)?);
            self.expect_statement_end(true)?;
        }
        let close = self.expect(&Token::RBrace)?;
        Ok(Spanned::new(Expr::Block { params, body }, open.span.to(close.span)))
    }

    /// Look for `ident (: Type)? (, ident (: Type)?)* |`. Returns None if the prefix is absent.
    fn try_block_params(&mut self) -> Option<Vec<Param>> {
        let mut params = Vec::new();
        loop {
            let name = self.expect_ident().ok()?;
            let annotation = if self.check(&Token::Colon) {
                self.advance();
                Some(self.parse_type_expr().ok()?)
            } else {
                None
            };
            params.push(Param { name, annotation });
            match self.peek().node {
                Token::Comma => {
                    self.advance();
                }
                Token::Pipe => {
                    self.advance();
                    return Some(params);
                }
                _ => return None,
            }
        }
    }

    /// `Name` or `Name[Arg, ...]`.
    fn parse_type_expr(&mut self) -> Result<Spanned<TypeExpr>, ParseError> {
        let name = self.expect_ident()?;
        if !self.check(&Token::LBracket) || self.starts_new_line() {
            return Ok(Spanned::new(TypeExpr::Named(name.node), name.span));
        }
        self.advance();
        let mut args = Vec::new();
        while !self.check(&Token::RBracket) {
            if !args.is_empty() {
                self.expect(&Token::Comma)?;
            }
            args.push(self.parse_type_expr()?);
        }
        let close = self.expect(&Token::RBracket)?;
        Ok(Spanned::new(TypeExpr::Applied { name: name.node, args }, name.span.to(close.span)))
    }

    fn parse_match(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(&Token::Match)?;
        let old_restrict = std::mem::replace(&mut self.restrict_type_instance, true);
        let old_kv = std::mem::replace(&mut self.allow_key_value, false);
        let scrutinee = self.parse_expr(0);
        self.restrict_type_instance = old_restrict;
        self.allow_key_value = old_kv;
        let scrutinee = scrutinee?;

        let open = self.expect(&Token::LBrace)?;
        let mut arms = Vec::new();
        loop {
            while self.check(&Token::Comma) || self.check(&Token::Semicolon) {
                self.advance();
            }
            if self.check(&Token::RBrace) {
                break;
            }
            if self.at_eof() {
                return Err(ParseError::new("unclosed match: expected '}'", open.span));
            }
            let pattern = self.parse_pattern()?;
            self.expect(&Token::FatArrow)?;
            let body = self.parse_nested(0)?;
            arms.push(PatternArm { pattern, body });
            if !self.check(&Token::Comma) && !self.check(&Token::RBrace) && !self.starts_new_line() {
                let tok = self.peek();
                return Err(ParseError::new(
                    format!("expected ',' or '}}' after match arm, found {}", tok.node),
                    tok.span,
                ));
            }
        }
        let close = self.expect(&Token::RBrace)?;
        Ok(Spanned::new(
            Expr::MatchExpression { scrutinee: Box::new(scrutinee), arms },
            kw.span.to(close.span),
        ))
    }
}

/// Tokens that may begin a line without ending the previous statement.
fn is_continuation(tok: &Token) -> bool {
    matches!(
        tok,
        Token::Dot
            | Token::LBracket
            | Token::LParen
            | Token::Comma
            | Token::Plus
            | Token::Minus
            | Token::Star
            | Token::Slash
            | Token::AmpAmp
            | Token::PipePipe
            | Token::FatArrow
            | Token::Pipe
    )
}

/// (left, right) binding powers. Left-associative operators recurse with `left + 1`.
/// `=>` is absent on purpose: it ends an expression and match arms are split by `parse_match`.
fn infix_binding_power(tok: &Token, allow_key_value: bool) -> Option<(u8, u8)> {
    let bp = match tok {
        Token::ColonEq => (2, ASSIGN_RBP),
        Token::Colon if allow_key_value => (4, 5),
        Token::PipePipe => (6, 7),
        Token::AmpAmp => (8, 9),
        Token::EqEq | Token::BangEq => (10, 11),
        Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => (12, 13),
        Token::Plus | Token::Minus => (14, 15),
        Token::Star | Token::Slash | Token::Percent => (16, 17),
        Token::Caret => (19, 18),
        _ => return None,
    };
    Some(bp)
}

fn binop_for(tok: &Token) -> Option<BinOp> {
    let op = match tok {
        Token::Plus => BinOp::Add,
        Token::Minus => BinOp::Sub,
        Token::Star => BinOp::Mul,
        Token::Slash => BinOp::Div,
        Token::Percent => BinOp::Mod,
        Token::Caret => BinOp::Pow,
        Token::EqEq => BinOp::Eq,
        Token::BangEq => BinOp::Neq,
        Token::Lt => BinOp::Lt,
        Token::Gt => BinOp::Gt,
        Token::LtEq => BinOp::LtEq,
        Token::GtEq => BinOp::GtEq,
        Token::AmpAmp => BinOp::And,
        Token::PipePipe => BinOp::Or,
        _ => return None,
    };
    Some(op)
}
