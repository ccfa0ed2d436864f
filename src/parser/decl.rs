use super::ast::*;
use super::{Parser, ASSIGN_RBP};
use crate::diagnostics::ParseError;
use crate::lexer::Token;
use crate::span::Spanned;

impl<'a> Parser<'a> {
    /// `fn name [T <: C, ...]? (param | (params)) := body`
    pub(super) fn parse_function_decl(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(&Token::Fn)?;
        let name = self.expect_ident()?;

        let type_params = if self.check(&Token::LBracket) { self.parse_type_params()? } else { Vec::new() };

        let params = match &self.peek().node {
            Token::LParen => {
                self.advance();
                let mut params = Vec::new();
                while !self.check(&Token::RParen) {
                    if !params.is_empty() {
                        self.expect(&Token::Comma)?;
                    }
                    params.push(self.parse_param()?);
                }
                self.expect(&Token::RParen)?;
                params
            }
            Token::Ident(_) => vec![self.parse_param()?],
            Token::ColonEq => Vec::new(),
            other => {
                return Err(ParseError::new(
                    format!("expected parameter list after function name, found {other}"),
                    self.peek().span,
                ));
            }
        };

        self.expect(&Token::ColonEq)?;
        let body = self.parse_nested(ASSIGN_RBP)?;
        let span = kw.span.to(body.span);
        Ok(Spanned::new(
            Expr::FunctionDeclaration {
                decl: FunctionDecl { name, type_params, params, body: Box::new(body) },
            },
            span,
        ))
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let name = self.expect_ident()?;
        let annotation = if self.check(&Token::Colon) {
            self.advance();
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        Ok(Param { name, annotation })
    }

    /// `[T, U <: Number]`
    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        self.expect(&Token::LBracket)?;
        let mut params = Vec::new();
        while !self.check(&Token::RBracket) {
            if !params.is_empty() {
                self.expect(&Token::Comma)?;
            }
            let name = self.expect_ident()?;
            let constraint = if self.check(&Token::Subtype) {
                self.advance();
                Some(self.parse_type_expr()?)
            } else {
                None
            };
            params.push(TypeParam { name, constraint });
        }
        self.expect(&Token::RBracket)?;
        Ok(params)
    }

    fn parse_parent(&mut self) -> Result<Option<Spanned<TypeExpr>>, ParseError> {
        if self.check(&Token::Subtype) {
            self.advance();
            Ok(Some(self.parse_type_expr()?))
        } else {
            Ok(None)
        }
    }

    /// `abstract Name (<: Parent)?`; a redundant `type` after `abstract` is accepted.
    pub(super) fn parse_abstract_decl(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(&Token::Abstract)?;
        if self.check(&Token::Type) {
            self.advance();
        }
        let name = self.expect_ident()?;
        let parent = self.parse_parent()?;
        let span = kw.span.to(self.prev_span());
        Ok(Spanned::new(
            Expr::TypeDeclaration {
                decl: TypeDecl { name, type_params: Vec::new(), parent, body: TypeDeclBody::Abstract },
            },
            span,
        ))
    }

    /// `type Name[T]? (<: Parent)? ({ fields } | = Variant | Variant(f: T) ... )?`
    pub(super) fn parse_type_decl(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(&Token::Type)?;
        let name = self.expect_ident()?;
        let type_params = if self.check(&Token::LBracket) { self.parse_type_params()? } else { Vec::new() };
        let parent = self.parse_parent()?;

        let body = match self.peek().node {
            Token::LBrace => {
                self.advance();
                let fields = self.parse_field_decls(&Token::RBrace)?;
                self.expect(&Token::RBrace)?;
                TypeDeclBody::Struct { fields }
            }
            Token::Eq => {
                self.advance();
                let mut variants = vec![self.parse_variant()?];
                while self.check(&Token::Pipe) {
                    self.advance();
                    variants.push(self.parse_variant()?);
                }
                TypeDeclBody::Adt { variants }
            }
            _ => TypeDeclBody::Concrete,
        };

        let span = kw.span.to(self.prev_span());
        Ok(Spanned::new(Expr::TypeDeclaration { decl: TypeDecl { name, type_params, parent, body } }, span))
    }

    fn parse_variant(&mut self) -> Result<AdtVariant, ParseError> {
        let name = self.expect_ident()?;
        let fields = if self.check(&Token::LParen) && !self.starts_new_line() {
            self.advance();
            let fields = self.parse_field_decls(&Token::RParen)?;
            self.expect(&Token::RParen)?;
            fields
        } else {
            Vec::new()
        };
        Ok(AdtVariant { name, fields })
    }

    /// `name: Type` entries separated by commas or line breaks, up to (not including) `close`.
    fn parse_field_decls(&mut self, close: &Token) -> Result<Vec<FieldDecl>, ParseError> {
        let mut fields = Vec::new();
        loop {
            while self.check(&Token::Comma) {
                self.advance();
            }
            if self.check(close) {
                break;
            }
            let name = match &self.peek().node {
                Token::Ident(_) => self.expect_ident()?,
                other => {
                    return Err(ParseError::new(
                        format!("expected a named field 'name: Type', found {other}"),
                        self.peek().span,
                    ));
                }
            };
            if !self.check(&Token::Colon) {
                return Err(ParseError::new(
                    format!("expected a named field 'name: Type', found {}", self.peek().node),
                    self.peek().span,
                ));
            }
            self.advance();
            let ty = self.parse_type_expr()?;
            fields.push(FieldDecl { name, ty });
            if !self.check(&Token::Comma) && !self.check(close) && !self.starts_new_line() {
                let tok = self.peek();
                return Err(ParseError::new(format!("expected ',' or {close}, found {}", tok.node), tok.span));
            }
        }
        Ok(fields)
    }
}
