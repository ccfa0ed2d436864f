use logos::{Lexer, Logos};
use serde::Serialize;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("fn")]
    Fn,
    #[token("type")]
    Type,
    #[token("abstract")]
    Abstract,
    #[token("match")]
    Match,
    #[token("trait")]
    Trait,
    #[token("impl")]
    Impl,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("for")]
    For,

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLit(i64),

    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLit(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        Some(unescape(&s[1..s.len() - 1]))
    })]
    #[token("\"\"\"", lex_triple_quoted)]
    StringLit(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Operators
    #[token(":=")]
    ColonEq,
    #[token("=>")]
    FatArrow,
    #[token("<:")]
    Subtype,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,
    #[token("?")]
    Question,
    #[token("#")]
    Hash,
    #[token("|")]
    Pipe,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,

    // Comments: `// ...` and `# ...` (the space keeps `#expr` quoting unambiguous)
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"#[ \t][^\n]*", logos::skip)]
    Comment,

    /// A run of digits too large for `Int`. Pushed by `lex` where the scanner
    /// rejects the literal, so the parser can name it.
    IntOverflow(String),

    /// Appended by `lex`, never produced by the scanner itself.
    Eof,
}

/// Coarse token classification exposed to tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Keyword,
    Operator,
    Punctuation,
    Eof,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Fn
            | Token::Type
            | Token::Abstract
            | Token::Match
            | Token::Trait
            | Token::Impl
            | Token::True
            | Token::False
            | Token::For => TokenKind::Keyword,
            Token::IntLit(_) | Token::FloatLit(_) | Token::IntOverflow(_) => TokenKind::Number,
            Token::StringLit(_) => TokenKind::String,
            Token::Ident(_) => TokenKind::Identifier,
            Token::LParen
            | Token::RParen
            | Token::LBracket
            | Token::RBracket
            | Token::LBrace
            | Token::RBrace
            | Token::Comma
            | Token::Semicolon
            | Token::Dot
            | Token::Colon
            | Token::Comment => TokenKind::Punctuation,
            Token::Eof => TokenKind::Eof,
            _ => TokenKind::Operator,
        }
    }
}

/// Scan the body of a `"""` string up to the closing delimiter.
fn lex_triple_quoted(lex: &mut Lexer<Token>) -> Option<String> {
    let rest = lex.remainder();
    let end = rest.find("\"\"\"")?;
    let body = unescape(&rest[..end]);
    lex.bump(end + 3);
    Some(body)
}

pub fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Returns true if the given string is a reserved word.
pub fn is_keyword(s: &str) -> bool {
    matches!(s, "fn" | "type" | "abstract" | "match" | "trait" | "impl" | "true" | "false" | "for")
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Fn => write!(f, "'fn'"),
            Token::Type => write!(f, "'type'"),
            Token::Abstract => write!(f, "'abstract'"),
            Token::Match => write!(f, "'match'"),
            Token::Trait => write!(f, "'trait'"),
            Token::Impl => write!(f, "'impl'"),
            Token::True => write!(f, "'true'"),
            Token::False => write!(f, "'false'"),
            Token::For => write!(f, "'for'"),
            Token::IntLit(n) => write!(f, "'{n}'"),
            Token::FloatLit(n) => write!(f, "'{n}'"),
            Token::StringLit(s) => write!(f, "\"{s}\""),
            Token::Ident(name) => write!(f, "identifier '{name}'"),
            Token::ColonEq => write!(f, "':='"),
            Token::FatArrow => write!(f, "'=>'"),
            Token::Subtype => write!(f, "'<:'"),
            Token::EqEq => write!(f, "'=='"),
            Token::BangEq => write!(f, "'!='"),
            Token::LtEq => write!(f, "'<='"),
            Token::GtEq => write!(f, "'>='"),
            Token::AmpAmp => write!(f, "'&&'"),
            Token::PipePipe => write!(f, "'||'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::Caret => write!(f, "'^'"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::Bang => write!(f, "'!'"),
            Token::Eq => write!(f, "'='"),
            Token::Question => write!(f, "'?'"),
            Token::Hash => write!(f, "'#'"),
            Token::Pipe => write!(f, "'|'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Comma => write!(f, "','"),
            Token::Semicolon => write!(f, "';'"),
            Token::Dot => write!(f, "'.'"),
            Token::Colon => write!(f, "':'"),
            Token::Comment => write!(f, "comment"),
            Token::IntOverflow(s) => write!(f, "integer literal {s}"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
