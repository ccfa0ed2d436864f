use super::*;

fn string(s: &str) -> Token {
    Token::StringLit(s.to_string())
}

#[test]
fn plain_string() {
    assert_tokens(r#""hello world""#, &[string("hello world")]);
}

#[test]
fn empty_string() {
    assert_tokens(r#""""#, &[string("")]);
}

#[test]
fn known_escapes_are_unescaped() {
    assert_tokens(r#""a\nb\tc\rd\\e\"f""#, &[string("a\nb\tc\rd\\e\"f")]);
}

#[test]
fn unknown_escape_keeps_backslash() {
    assert_tokens(r#""a\qb""#, &[string("a\\qb")]);
}

#[test]
fn strings_may_span_lines() {
    assert_tokens("\"one\ntwo\"", &[string("one\ntwo")]);
}

#[test]
fn triple_quoted_string() {
    assert_tokens(r#""""say "hi" now""""#, &[string("say \"hi\" now")]);
}

#[test]
fn triple_quoted_spans_lines() {
    let src = "\"\"\"\nline one\nline two\n\"\"\" x";
    assert_tokens(src, &[string("\nline one\nline two\n"), ident("x")]);
}

#[test]
fn unterminated_string_is_not_a_string() {
    let toks = tokens("\"abc");
    assert!(!toks.iter().any(|(t, _)| matches!(t, Token::StringLit(_))), "{toks:?}");
}

#[test]
fn keywords_inside_strings_stay_strings() {
    assert_tokens(r#""fn match""#, &[string("fn match")]);
}
