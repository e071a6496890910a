#![no_main]

use libfuzzer_sys::fuzz_target;
use schemelet::TokenKind;

// Backtracking is exponential in the nesting of malformed special forms, so
// long inputs only measure that and time out
const MAX_INPUT_LEN: usize = 256;

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_LEN {
        return;
    }
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(tokens) = schemelet::tokenizer::tokenize(s)
    {
        let tokens: Vec<_> = tokens
            .into_iter()
            .filter(|token| token.kind != TokenKind::Newline)
            .collect();
        let _ = schemelet::parser::parse_form(&tokens);
    }
});
