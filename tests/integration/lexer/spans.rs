use super::*;

#[test]
fn single_character_token() {
    assert_span("+", 0, 0, 1);
}

#[test]
fn multi_character_operator() {
    assert_span(":=", 0, 0, 2);
}

#[test]
fn string_span_includes_quotes() {
    assert_span(r#"x "abc""#, 1, 2, 7);
}

#[test]
fn lines_and_columns_are_one_based() {
    let toks = tokens("x := 1\n  y := 2");
    let (_, x) = &toks[0];
    assert_eq!((x.line, x.column), (1, 1));
    let (_, y) = &toks[3];
    assert_eq!((y.line, y.column), (2, 3));
}

#[test]
fn columns_after_a_multiline_string() {
    let toks = tokens("\"a\nbc\" z");
    let (_, z) = &toks[1];
    assert_eq!((z.line, z.column), (2, 5));
}

#[test]
fn eof_sits_at_the_end() {
    let all = lex("ab\ncd");
    let eof = all.last().unwrap();
    assert_eq!(eof.node, Token::Eof);
    assert_eq!((eof.span.start, eof.span.end), (5, 5));
    assert_eq!(eof.span.line, 2);
}
