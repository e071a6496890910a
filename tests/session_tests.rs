#![allow(clippy::unwrap_used)]

use std::io;

use schemelet::session::{read_form, run, run_interactive};
use schemelet::{
    CONTINUATION_PROMPT, Form, Outcome, PRIMARY_PROMPT, PromptedReader, Session, Tokenizer,
    Value,
};

/// Run `src` as an interactive session, returning (outcome, prompts, output)
fn interactive(session: &Session, src: &str) -> (Outcome, String, String) {
    let mut prompts = Vec::new();
    let mut out = Vec::new();
    let outcome = {
        let reader = PromptedReader::new(src.as_bytes(), &mut prompts);
        run(&mut Tokenizer::new(reader), session, &mut out).unwrap()
    };
    (
        outcome,
        String::from_utf8(prompts).unwrap(),
        String::from_utf8(out).unwrap(),
    )
}

#[test]
fn test_prompts_follow_form_boundaries() {
    let session = Session::new();
    let (outcome, prompts, out) = interactive(&session, "\n(+ 1\n2)\n5\n");
    assert_eq!(outcome, Outcome::EndOfInput);
    assert_eq!(out, "3\n5\n");

    let p = PRIMARY_PROMPT;
    let c = CONTINUATION_PROMPT;
    // blank line, "(+ 1", "2)", "5", then the read that hits end of input
    assert_eq!(prompts, format!("{p}{p}{c}{p}{p}"));
}

#[test]
fn test_quit_leaves_remaining_input_unread() {
    let session = Session::new();
    let (outcome, _, out) = interactive(&session, "(set a 1)\nquit\n(set a 2)\n");
    assert_eq!(outcome, Outcome::Quit);
    assert_eq!(out, "1\n");
    assert_eq!(session.global().get("a"), Some(Value::Number(1)));
}

#[test]
fn test_interactive_input_ends_on_a_fresh_line() {
    for (src, expected) in [("1\nquit\n", Outcome::Quit), ("1\n", Outcome::EndOfInput)] {
        let session = Session::new();
        let mut out = Vec::new();
        let mut tokenizer = Tokenizer::new(PromptedReader::silent(src.as_bytes()));
        let outcome = run_interactive(&mut tokenizer, &session, &mut out).unwrap();
        assert_eq!(outcome, expected);
        assert_eq!(String::from_utf8(out).unwrap(), "1\n\n");
    }
}

#[test]
fn test_definitions_survive_switching_input() {
    // A source file is run silently, then interactive input continues the session
    let session = Session::new();
    let mut out = Vec::new();
    let file = "(set double (lambda (x) (+ x x)))\n; helpers loaded\n";
    let mut silent = Tokenizer::new(PromptedReader::silent(file.as_bytes()));
    assert_eq!(
        run(&mut silent, &session, &mut out).unwrap(),
        Outcome::EndOfInput
    );
    assert_eq!(String::from_utf8(out).unwrap(), "<closure>\n");

    let (outcome, _, out) = interactive(&session, "(double 21)\n");
    assert_eq!(outcome, Outcome::EndOfInput);
    assert_eq!(out, "42\n");
}

#[test]
fn test_errors_are_reported_and_reading_continues() {
    let session = Session::new();
    let (_, _, out) = interactive(
        &session,
        "(car 1)\n\n(f\n  ())\n(print '(a b))\n",
    );
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("type error: car requires a pair"));
    assert!(lines[0].ends_with("(on input that started on line 1)"));
    assert_eq!(lines[1], "syntax error on input that started on line 3");
    assert_eq!(lines[2], "(a b)");
    assert_eq!(lines[3], "(a b)");
}

#[test]
fn test_read_form_groups_tokens_per_form() {
    let mut tokenizer = Tokenizer::new(PromptedReader::silent(
        "  ; comment only\n(a\n  (b))\n".as_bytes(),
    ));
    match read_form(&mut tokenizer).unwrap() {
        Some(Form::Tokens(tokens)) => {
            let text: Vec<&str> = tokens.iter().map(|t| t.text()).collect();
            assert_eq!(text, vec!["(", "a", "(", "b", ")", ")"]);
            assert_eq!(tokens[0].line, 2);
        }
        other => panic!("unexpected form: {other:?}"),
    }
    assert_eq!(read_form(&mut tokenizer).unwrap(), None);
    assert_eq!(tokenizer.line_number(), 4);
}

#[test]
fn test_session_output_goes_to_given_sink() {
    let session = Session::new();
    let results = session
        .eval_source("(print 7)\n", &mut io::sink())
        .unwrap();
    assert_eq!(results, vec![Ok(Value::Number(7))]);
}
