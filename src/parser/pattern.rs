use super::ast::*;
use super::Parser;
use crate::diagnostics::ParseError;
use crate::lexer::Token;
use crate::span::Spanned;

impl<'a> Parser<'a> {
    /// A match-arm pattern. Identifiers name ADT variants; `Name { f: pat }` is structural.
    pub(super) fn parse_pattern(&mut self) -> Result<Node, ParseError> {
        let tok = self.peek();
        match &tok.node {
            Token::Question => self.parse_capture(),
            Token::Ident(_) => {
                let name = self.expect_ident()?;
                if self.is_type_instance_ahead() {
                    let (fields, close) = self.parse_instance_fields(|p| p.parse_pattern())?;
                    let span = name.span.to(close);
                    return Ok(Spanned::new(Expr::TypeInstance { name, fields }, span));
                }
                Ok(Spanned::new(Expr::Identifier { name: name.node }, name.span))
            }
            Token::IntLit(_) | Token::FloatLit(_) | Token::StringLit(_) | Token::True | Token::False => {
                self.parse_prefix()
            }
            Token::Minus => {
                self.advance();
                let num = self.peek();
                let value = match num.node {
                    Token::IntLit(n) => Literal::Int(-n),
                    Token::FloatLit(n) => Literal::Float(-n),
                    ref other => {
                        return Err(ParseError::new(
                            format!("expected a number after '-' in pattern, found {other}"),
                            num.span,
                        ));
                    }
                };
                self.advance();
                Ok(Spanned::new(Expr::Literal { value }, tok.span.to(num.span)))
            }
            other => Err(ParseError::new(format!("expected pattern, found {other}"), tok.span)),
        }
    }

    /// `?`, `?name`, either optionally followed by a nested pattern on the same line.
    pub(super) fn parse_capture(&mut self) -> Result<Node, ParseError> {
        let q = self.expect(&Token::Question)?;
        let mut span = q.span;

        let name = match &self.peek().node {
            Token::Ident(_) if self.is_adjacent() => {
                let ident = self.expect_ident()?;
                span = span.to(ident.span);
                Some(ident.node)
            }
            _ => None,
        };

        let pattern = if self.nested_pattern_follows() {
            let inner = self.parse_pattern()?;
            span = span.to(inner.span);
            Some(Box::new(inner))
        } else {
            None
        };

        Ok(Spanned::new(Expr::CapturePattern { name, pattern }, span))
    }

    fn nested_pattern_follows(&self) -> bool {
        if self.starts_new_line() {
            return false;
        }
        matches!(
            self.peek().node,
            Token::Ident(_)
                | Token::IntLit(_)
                | Token::FloatLit(_)
                | Token::StringLit(_)
                | Token::True
                | Token::False
                | Token::Question
        )
    }
}
