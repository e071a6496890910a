#![allow(clippy::unwrap_used)]

use std::io;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use schemelet::parser::parse_form;
use schemelet::tokenizer::tokenize;
use schemelet::{Env, Expr, Session, Token, TokenKind, evaluator};

const SIMPLE: &str = "(+ 1 2)";
const NESTED: &str = "(if (> (* 5 2) 8) (cons 10 '(5 20)) '())";

// Recursive factorial through self-application, so no global binding is needed
const FACTORIAL: &str =
    "((lambda (f x) (f f x)) (lambda (self n) (if (< n 2) 1 (* n (self self (- n 1))))) 10)";

const COUNTING_LOOP: &str = "(set i 0)\n(while (< i 1000) (set i (+ i 1)))\ni\n";

fn form_tokens(src: &str) -> Vec<Token> {
    tokenize(src)
        .unwrap()
        .into_iter()
        .filter(|token| token.kind != TokenKind::Newline)
        .collect()
}

fn parse(src: &str) -> Expr {
    parse_form(&form_tokens(src)).unwrap()
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parsing");

    group.bench_function("Tokenize Factorial", |b| {
        b.iter(|| tokenize(black_box(FACTORIAL)))
    });

    for (name, src) in [("Simple", SIMPLE), ("Nested", NESTED), ("Factorial", FACTORIAL)] {
        let tokens = form_tokens(src);
        group.bench_function(format!("Parse {name}"), |b| {
            b.iter(|| parse_form(black_box(&tokens)))
        });
    }

    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Evaluation");

    let env = Env::global();
    for (name, src) in [("Simple", SIMPLE), ("Nested", NESTED), ("Factorial", FACTORIAL)] {
        let expr = parse(src);
        group.bench_function(format!("Eval {name}"), |b| {
            b.iter(|| evaluator::eval(black_box(&expr), &env.extend(), &mut io::sink()))
        });
    }

    group.bench_function("Session Counting Loop", |b| {
        b.iter(|| {
            Session::new()
                .eval_source(black_box(COUNTING_LOOP), &mut io::sink())
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_evaluation);
criterion_main!(benches);
