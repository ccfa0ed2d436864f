// Property-based tests for the sift lexer
//
// These check invariants over random input rather than fixed examples:
// - the lexer never panics and always terminates the stream with Eof
// - spans are ordered, in bounds and on UTF-8 boundaries
// - well-formed literals and identifiers lex to exactly one token
//
// Run with more cases:
//   PROPTEST_CASES=1000 cargo test --test lexer_properties

use proptest::prelude::*;
use sift::lexer::{is_keyword, lex, Token};

// =============================================================================
// Safety and determinism
// =============================================================================

#[test]
fn prop_lexer_never_panics() {
    proptest!(|(source in "\\PC{0,1000}")| {
        let _ = lex(&source);
    });
}

#[test]
fn prop_stream_ends_with_a_single_eof() {
    proptest!(|(source in "\\PC{0,500}")| {
        let tokens = lex(&source);
        prop_assert_eq!(tokens.last().map(|t| &t.node), Some(&Token::Eof));
        let eofs = tokens.iter().filter(|t| t.node == Token::Eof).count();
        prop_assert_eq!(eofs, 1);
    });
}

#[test]
fn prop_lexing_is_deterministic() {
    proptest!(|(source in "\\PC{0,500}")| {
        prop_assert_eq!(lex(&source), lex(&source));
    });
}

#[test]
fn empty_input_is_just_eof() {
    let tokens = lex("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].node, Token::Eof);
    assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
}

// =============================================================================
// Span structure
// =============================================================================

#[test]
fn prop_spans_never_overlap() {
    proptest!(|(source in "\\PC{0,500}")| {
        let tokens = lex(&source);
        for pair in tokens.windows(2) {
            prop_assert!(
                pair[0].span.end <= pair[1].span.start,
                "overlap: {:?} then {:?}", pair[0], pair[1]
            );
        }
    });
}

#[test]
fn prop_spans_are_in_bounds_and_aligned() {
    proptest!(|(source in "\\PC{0,500}")| {
        for tok in lex(&source) {
            prop_assert!(tok.span.start <= tok.span.end);
            prop_assert!(tok.span.end <= source.len());
            prop_assert!(source.is_char_boundary(tok.span.start));
            prop_assert!(source.is_char_boundary(tok.span.end));
        }
    });
}

#[test]
fn prop_only_eof_is_empty() {
    proptest!(|(source in "\\PC{0,300}")| {
        for tok in lex(&source) {
            if tok.node != Token::Eof {
                prop_assert!(tok.span.start < tok.span.end, "empty span for {:?}", tok.node);
            }
        }
    });
}

#[test]
fn prop_lines_count_newlines_before_the_token() {
    proptest!(|(lines in prop::collection::vec("[a-z]{1,8}", 1..10))| {
        let source = lines.join("\n");
        let tokens = lex(&source);
        for (i, tok) in tokens.iter().filter(|t| t.node != Token::Eof).enumerate() {
            prop_assert_eq!(tok.span.line, i + 1);
            prop_assert_eq!(tok.span.column, 1);
        }
    });
}

// =============================================================================
// Well-formed input
// =============================================================================

fn valid_identifiers() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,30}")
        .unwrap_or_else(|e| panic!("{e}"))
        .prop_filter("not a keyword", |s| !is_keyword(s))
}

fn single(source: &str) -> Token {
    let tokens = lex(source);
    assert_eq!(tokens.len(), 2, "expected one token for {source:?}, got {tokens:?}");
    tokens[0].node.clone()
}

#[test]
fn prop_integers_lex_to_one_token() {
    proptest!(|(n in 0i64..=i64::MAX)| {
        prop_assert_eq!(single(&n.to_string()), Token::IntLit(n));
    });
}

#[test]
fn prop_floats_lex_to_one_token() {
    proptest!(|(whole in 0u32..100_000, frac in 0u32..100_000)| {
        let text = format!("{whole}.{frac}");
        let expected: f64 = text.parse().unwrap_or_else(|e| panic!("{e}"));
        prop_assert_eq!(single(&text), Token::FloatLit(expected));
    });
}

#[test]
fn prop_identifiers_lex_to_one_token() {
    proptest!(|(ident in valid_identifiers())| {
        prop_assert_eq!(single(&ident), Token::Ident(ident.clone()));
    });
}

#[test]
fn prop_plain_strings_keep_their_contents() {
    proptest!(|(body in "[a-zA-Z0-9 ,.:;!?()\\[\\]{}+=*/-]{0,60}")| {
        prop_assert_eq!(single(&format!("\"{body}\"")), Token::StringLit(body.clone()));
    });
}

#[test]
fn prop_comments_produce_no_tokens() {
    proptest!(|(text in "[a-zA-Z0-9 ]{0,40}")| {
        prop_assert_eq!(lex(&format!("// {text}")).len(), 1);
        prop_assert_eq!(lex(&format!("# {text}")).len(), 1);
    });
}

fn arith_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![(0i64..1000).prop_map(|n| n.to_string()), valid_identifiers()];
    leaf.prop_recursive(3, 64, 4, |inner| {
        prop_oneof![
            (inner.clone(), prop::sample::select(vec!["+", "-", "*", "/", "%", "^"]), inner.clone())
                .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            inner.prop_map(|e| format!("({e})")),
        ]
    })
}

#[test]
fn prop_expressions_have_balanced_parens() {
    proptest!(|(expr in arith_expr())| {
        let tokens = lex(&expr);
        let open = tokens.iter().filter(|t| t.node == Token::LParen).count();
        let close = tokens.iter().filter(|t| t.node == Token::RParen).count();
        prop_assert_eq!(open, close);
    });
}
