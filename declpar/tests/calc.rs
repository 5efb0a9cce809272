use std::{cell::RefCell, rc::Rc};

use declgrammar::{AStackType, GrammarBuilder, GrammarErrorKind, Span};
use decllex::{LexErrorKind, RuleKind, RuleOrigin};
use declpar::{BuildError, CompiledGrammar, LexParseError, ParserBuilder, RecoveryKind};
use decltable::StateTableErrorKind;
use proptest::prelude::*;

fn val(a: &AStackType<i64>) -> i64 {
    a.as_action().cloned().unwrap_or_default()
}

/// A calculator over `;`-terminated statements. Each statement's value is appended to the
/// parameter; the parse's value is that of the last statement.
fn calc_builder() -> GrammarBuilder<i64, Vec<i64>> {
    GrammarBuilder::new()
        .token("NUMBER", "[0-9]+")
        .token_with("ID", "[a-z]+", |t| {
            if t.value == "print" {
                t.name = "PRINT".to_owned();
            }
            true
        })
        .token_with("WS", "[ \t]+", |_| false)
        .token_with("NEWLINE", "\n+", |_| false)
        .keyword("PRINT")
        .literals("+-*/();")
        .left(&["+", "-"])
        .left(&["*", "/"])
        .right(&["UMINUS"])
        .production_with("stmts : stmts stmt | stmt", |_, args| {
            args.last().map(val).unwrap_or_default()
        })
        .production_with("stmt : expr ';' | PRINT expr ';'", |out: &mut Vec<i64>, args| {
            let v = val(&args[args.len() - 2]);
            out.push(v);
            v
        })
        .production_with(
            "expr : expr '+' expr | expr '-' expr | expr '*' expr | expr '/' expr",
            |_, args| {
                let (l, r) = (val(&args[0]), val(&args[2]));
                match args[1].value_str() {
                    "+" => l + r,
                    "-" => l - r,
                    "*" => l * r,
                    _ => l / r,
                }
            },
        )
        .production_with("expr : '-' expr %prec UMINUS", |_, args| -val(&args[1]))
        .production_with("expr : '(' expr ')'", |_, args| val(&args[1]))
        .production_with("expr : NUMBER", |_, args| {
            args[0].value_str().parse().unwrap()
        })
        .production_with("expr : ID", |_, args| args[0].value_str().len() as i64)
}

fn calc() -> CompiledGrammar<i64, Vec<i64>> {
    CompiledGrammar::new(calc_builder().build()).unwrap()
}

fn eval(cg: &CompiledGrammar<i64, Vec<i64>>, text: &str) -> Vec<i64> {
    let mut out = Vec::new();
    cg.parse(text, &mut out).unwrap();
    out
}

#[test]
fn arithmetic() {
    let cg = calc();
    assert!(cg.warnings().is_none());
    assert_eq!(eval(&cg, "3+4*2;"), vec![11]);
    assert_eq!(eval(&cg, "1-2-3;"), vec![-4]);
    assert_eq!(eval(&cg, "8/2/2;"), vec![2]);
    assert_eq!(eval(&cg, "2*(3+4);"), vec![14]);
    assert_eq!(eval(&cg, "-3+5;"), vec![2]);
    assert_eq!(eval(&cg, "2*-3;"), vec![-6]);
    assert_eq!(eval(&cg, "--3;"), vec![3]);
    assert_eq!(eval(&cg, " 1 ;\n\n 2*2 ;\n"), vec![1, 4]);
    let mut out = Vec::new();
    assert_eq!(cg.parse("1; 10-3;", &mut out).unwrap(), 7);
}

#[test]
fn keyword_promotion() {
    let cg = calc();
    assert_eq!(eval(&cg, "print 1+1; abc * 2;"), vec![2, 6]);
    let toks = cg
        .tokens("print ab;")
        .map(|t| t.map(|t| (t.name, t.value)))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        toks,
        vec![
            ("PRINT".to_owned(), "print".to_owned()),
            ("ID".to_owned(), "ab".to_owned()),
            (";".to_owned(), ";".to_owned())
        ]
    );
}

#[test]
fn reuse() {
    let cg = calc();
    let inputs = ["1+2;", "3 * (4 - 5);", "print 7; 8;", "1+2;"];
    let first = inputs.iter().map(|s| eval(&cg, s)).collect::<Vec<_>>();
    let second = inputs.iter().map(|s| eval(&cg, s)).collect::<Vec<_>>();
    let fresh = calc();
    let third = inputs.iter().map(|s| eval(&fresh, s)).collect::<Vec<_>>();
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(first[0], first[3]);
}

#[test]
fn lexical_error_coordinates() {
    let cg = calc();
    match cg.parse("1 + $;", &mut Vec::new()) {
        Err(LexParseError::LexError(e)) => {
            assert_eq!((e.line, e.column, e.text.as_str()), (1, 5, "$"));
            assert_eq!(e.span(), Span::new(4, 5));
        }
        _ => panic!(),
    }
    match cg.parse("1;\n  2 ? 3;", &mut Vec::new()) {
        Err(LexParseError::LexError(e)) => {
            assert_eq!((e.line, e.column, e.text.as_str()), (2, 5, "?"));
            assert_eq!(e.span(), Span::new(7, 8));
        }
        _ => panic!(),
    }
}

#[test]
fn lexical_error_handler() {
    let skipped = Rc::new(RefCell::new(Vec::new()));
    let skipped2 = Rc::clone(&skipped);
    let cg = CompiledGrammar::new(
        calc_builder()
            .on_lex_error(move |t| {
                assert_eq!(t.name, "error");
                skipped2.borrow_mut().push(t.value.clone());
                1
            })
            .build(),
    )
    .unwrap();
    assert_eq!(eval(&cg, "1 + $2;"), vec![3]);
    assert_eq!(*skipped.borrow(), vec!["$2;".to_owned()]);
}

/// `#line N` makes the following line number N.
fn calc_with_line_directives() -> CompiledGrammar<i64, Vec<i64>> {
    CompiledGrammar::new(
        calc_builder()
            .token_with("LINE", "#line [0-9]+", |t| {
                t.line = t.value["#line ".len()..].parse::<usize>().unwrap() - 1;
                false
            })
            .build(),
    )
    .unwrap()
}

#[test]
fn line_directives() {
    let cg = calc_with_line_directives();
    let src = "1;\n#line 100\n2;\n\n  3;\n#line 7\n4;";
    assert_eq!(eval(&cg, src), vec![1, 2, 3, 4]);
    let nums = cg
        .tokens(src)
        .map(|t| t.unwrap())
        .filter(|t| t.name == "NUMBER")
        .map(|t| (t.value, t.line, t.column))
        .collect::<Vec<_>>();
    assert_eq!(
        nums,
        vec![
            ("1".to_owned(), 1, 1),
            ("2".to_owned(), 100, 1),
            ("3".to_owned(), 102, 3),
            ("4".to_owned(), 7, 1)
        ]
    );

    match cg.parse("1;\n#line 100\n2;\n3 $;", &mut Vec::new()) {
        Err(LexParseError::LexError(e)) => {
            assert_eq!((e.line, e.column, e.text.as_str()), (101, 3, "$"));
        }
        _ => panic!(),
    }
    match cg.parse("#line 50\n1;\n\n2 2;", &mut Vec::new()) {
        Err(LexParseError::ParseError(e)) => {
            let t = e.token().unwrap();
            assert_eq!((t.value.as_str(), t.line, t.column), ("2", 52, 3));
        }
        _ => panic!(),
    }
}

#[test]
fn syntax_error_at_end() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen2 = Rc::clone(&seen);
    let cg = CompiledGrammar::new(
        calc_builder()
            .on_syntax_error(move |t| seen2.borrow_mut().push(t.cloned()))
            .build(),
    )
    .unwrap();
    match cg.parse("1 +", &mut Vec::new()) {
        Err(LexParseError::ParseError(e)) => {
            assert!(e.token().is_none());
            for n in ["NUMBER", "ID", "(", "-"] {
                assert!(e.expected().iter().any(|x| x == n));
            }
            assert!(!e.expected().iter().any(|x| x == "$end"));
        }
        _ => panic!(),
    }
    assert_eq!(*seen.borrow(), vec![None]);
}

#[test]
fn syntax_error_token() {
    let cg = calc();
    let mut out = Vec::new();
    match cg.parse("1 2;", &mut out) {
        Err(LexParseError::ParseError(e)) => {
            let t = e.token().unwrap();
            assert_eq!((t.name.as_str(), t.value.as_str()), ("NUMBER", "2"));
            assert_eq!((t.line, t.column, t.span), (1, 3, Span::new(2, 3)));
            assert!(e.expected().iter().any(|x| x == ";"));
            assert!(e.expected().iter().any(|x| x == "+"));
        }
        _ => panic!(),
    }
    assert!(out.is_empty());
}

#[test]
fn panic_recovery() {
    let cg = ParserBuilder::new(calc_builder().build())
        .recoverer(RecoveryKind::Panic)
        .build()
        .unwrap();
    let mut out = Vec::new();
    let (res, errs) = cg.parse_actions("1+2; 3 + + 4; 5;", &mut out);
    assert_eq!(res, Some(5));
    assert_eq!(out, vec![3, 7, 5]);
    assert_eq!(errs.len(), 1);
    match &errs[0] {
        LexParseError::ParseError(e) => assert_eq!(e.token().unwrap().column, 10),
        _ => panic!(),
    }

    let mut out = Vec::new();
    let (res, errs) = cg.parse_actions("1; ) 2;", &mut out);
    assert_eq!(res, Some(2));
    assert_eq!(out, vec![1, 2]);
    assert_eq!(errs.len(), 1);
    // `parse` reports the first error even when recovery succeeded.
    assert!(cg.parse("1; ) 2;", &mut Vec::new()).is_err());
}

#[test]
fn no_recovery_by_default() {
    let cg = calc();
    let mut out = Vec::new();
    let (res, errs) = cg.parse_actions("1+2; 3 + + 4; 5;", &mut out);
    assert!(res.is_none());
    assert_eq!(errs.len(), 1);
    assert_eq!(out, vec![3]);
}

#[test]
fn duplicate_names() {
    match CompiledGrammar::new(calc_builder().token("NUMBER", "0x[0-9a-f]+").build()) {
        Err(BuildError::Lex(errs)) => {
            assert_eq!(errs.len(), 1);
            assert_eq!(errs[0].name, "NUMBER");
            assert_eq!(
                errs[0].kind,
                LexErrorKind::DuplicateName(vec![
                    RuleOrigin {
                        kind: RuleKind::Token,
                        index: 0
                    },
                    RuleOrigin {
                        kind: RuleKind::Token,
                        index: 1
                    }
                ])
            );
        }
        _ => panic!(),
    }
}

#[test]
fn unknown_token() {
    match CompiledGrammar::new(calc_builder().production("expr : '@'").build()) {
        Err(BuildError::Grammar(errs)) => {
            assert_eq!(errs[0].kind, GrammarErrorKind::UnknownToken("@".to_owned()));
        }
        _ => panic!(),
    }
}

#[test]
fn nonassoc() {
    let g = GrammarBuilder::<i64, ()>::new()
        .token("N", "[0-9]+")
        .literals("<")
        .nonassoc(&["<"])
        .production("e : e '<' e | N")
        .build();
    match CompiledGrammar::new(g) {
        Err(BuildError::Table(e)) => {
            assert!(matches!(e.kind, StateTableErrorKind::UnresolvableConflict(_)));
        }
        _ => panic!(),
    }
}

proptest! {
    #[test]
    fn evaluates_like_rust(a in 0i64..1000, b in 0i64..1000, c in 1i64..1000, d in 0i64..1000) {
        let cg = calc();
        let text = format!("{} - {} * -{} + {} / {};", a, b, c, d, c);
        prop_assert_eq!(eval(&cg, &text), vec![a - b * -c + d / c]);
    }
}
