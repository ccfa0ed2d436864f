#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sift::lexer::Token;
use sift::span::{Span, Spanned};

/// Token shapes worth combining; literal payloads are fixed.
#[derive(Arbitrary, Debug)]
enum FuzzToken {
    Ident,
    TypeName,
    IntLit,
    FloatLit,
    StringLit,
    Fn,
    Type,
    Abstract,
    Match,
    ColonEq,
    FatArrow,
    Subtype,
    Plus,
    Minus,
    Star,
    Caret,
    Lt,
    Question,
    Hash,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,
    Newline,
}

impl FuzzToken {
    fn to_token(&self) -> Option<Token> {
        let token = match self {
            FuzzToken::Ident => Token::Ident("x".to_string()),
            FuzzToken::TypeName => Token::Ident("Point".to_string()),
            FuzzToken::IntLit => Token::IntLit(42),
            FuzzToken::FloatLit => Token::FloatLit(2.5),
            FuzzToken::StringLit => Token::StringLit("str".to_string()),
            FuzzToken::Fn => Token::Fn,
            FuzzToken::Type => Token::Type,
            FuzzToken::Abstract => Token::Abstract,
            FuzzToken::Match => Token::Match,
            FuzzToken::ColonEq => Token::ColonEq,
            FuzzToken::FatArrow => Token::FatArrow,
            FuzzToken::Subtype => Token::Subtype,
            FuzzToken::Plus => Token::Plus,
            FuzzToken::Minus => Token::Minus,
            FuzzToken::Star => Token::Star,
            FuzzToken::Caret => Token::Caret,
            FuzzToken::Lt => Token::Lt,
            FuzzToken::Question => Token::Question,
            FuzzToken::Hash => Token::Hash,
            FuzzToken::Pipe => Token::Pipe,
            FuzzToken::LParen => Token::LParen,
            FuzzToken::RParen => Token::RParen,
            FuzzToken::LBracket => Token::LBracket,
            FuzzToken::RBracket => Token::RBracket,
            FuzzToken::LBrace => Token::LBrace,
            FuzzToken::RBrace => Token::RBrace,
            FuzzToken::Comma => Token::Comma,
            FuzzToken::Colon => Token::Colon,
            FuzzToken::Dot => Token::Dot,
            FuzzToken::Semicolon => Token::Semicolon,
            FuzzToken::Newline => return None,
        };
        Some(token)
    }
}

#[derive(Arbitrary, Debug)]
struct FuzzTokens {
    tokens: Vec<FuzzToken>,
}

fuzz_target!(|input: FuzzTokens| {
    // Each token occupies two bytes of a synthetic source: "x " or "x\n" after a
    // Newline, so line-break sensitive rules see real gaps.
    let mut source = String::new();
    let mut tokens: Vec<Spanned<Token>> = Vec::new();
    let mut line = 1;
    for t in &input.tokens {
        match t.to_token() {
            Some(token) => {
                let start = source.len();
                source.push_str("x ");
                tokens.push(Spanned::new(token, Span::with_position(start, start + 1, line, 1)));
            }
            None => {
                source.push('\n');
                line += 1;
            }
        }
    }
    let end = source.len();
    tokens.push(Spanned::new(Token::Eof, Span::with_position(end, end, line, 1)));

    let mut parser = sift::parser::Parser::new(&tokens, &source);
    let _ = parser.parse_program();
});
