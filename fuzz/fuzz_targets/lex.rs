#![no_main]
use libfuzzer_sys::fuzz_target;
use sift::lexer::{lex, Token};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let tokens = lex(s);
        assert_eq!(tokens.last().map(|t| &t.node), Some(&Token::Eof));
    }
});
