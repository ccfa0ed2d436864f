pub mod line_index;
pub mod token;
pub use token::{is_keyword, Token, TokenKind};

use logos::Logos;
use serde::Serialize;
use tracing::trace;

use crate::span::{Span, Spanned};
use line_index::LineIndex;

/// Tokenize `source`. Never fails: unrecognised characters are skipped one at a
/// time and the stream always ends with `Token::Eof`. Digits too large for `Int`
/// come through as `Token::IntOverflow`.
pub fn lex(source: &str) -> Vec<Spanned<Token>> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(tok) => {
                let (line, column) = index.position(range.start);
                tokens.push(Spanned::new(tok, Span::with_position(range.start, range.end, line, column)));
            }
            Err(()) => {
                let text = source.get(range.clone()).unwrap_or_default();
                if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
                    let (line, column) = index.position(range.start);
                    let span = Span::with_position(range.start, range.end, line, column);
                    tokens.push(Spanned::new(Token::IntOverflow(text.to_string()), span));
                    continue;
                }
                trace!(offset = range.start, text, "skipping unrecognised input");
            }
        }
    }

    let (line, column) = index.position(source.len());
    tokens.push(Spanned::new(Token::Eof, Span::with_position(source.len(), source.len(), line, column)));
    tokens
}

/// Serializable view of a token: `{kind, text, line, column}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lexeme {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

/// Tokenize into the tooling-facing representation used by `sift --lexer`.
pub fn tokenize(source: &str) -> Vec<Lexeme> {
    lex(source)
        .into_iter()
        .map(|tok| {
            let text = match &tok.node {
                Token::StringLit(s) => s.clone(),
                Token::Eof => String::new(),
                _ => source[tok.span.start..tok.span.end].to_string(),
            };
            Lexeme { kind: tok.node.kind(), text, line: tok.span.line, column: tok.span.column }
        })
        .collect()
}
