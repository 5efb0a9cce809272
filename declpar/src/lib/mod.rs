#![allow(clippy::new_without_default)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![forbid(unsafe_code)]

//! `declpar` runs shift-reduce parsers for grammars declared with
//! [`declgrammar::GrammarBuilder`]. Grammars are compiled at run-time: the token rules become a
//! [`decllex::LexerDef`] and the productions an SLR(1) [`decltable::StateTable`], both of which
//! are built once and then reused for any number of parses.
//!
//! ## Example
//!
//! A calculator whose productions compute the value of the expression being parsed:
//!
//! ```rust
//! use declgrammar::GrammarBuilder;
//! use declpar::CompiledGrammar;
//!
//! let grammar = GrammarBuilder::<i64, ()>::new()
//!     .token("INT", "[0-9]+")
//!     .token_with("WS", "[ \t]+", |_| false)
//!     .literals("+*()")
//!     .left(&["+"])
//!     .left(&["*"])
//!     .production_with("Expr : Expr '+' Expr", |_, args| {
//!         args[0].as_action().unwrap() + args[2].as_action().unwrap()
//!     })
//!     .production_with("Expr : Expr '*' Expr", |_, args| {
//!         args[0].as_action().unwrap() * args[2].as_action().unwrap()
//!     })
//!     .production_with("Expr : '(' Expr ')'", |_, mut args| {
//!         args.remove(1).into_action().unwrap()
//!     })
//!     .production_with("Expr : INT", |_, args| args[0].value_str().parse().unwrap())
//!     .build();
//! let calc = CompiledGrammar::new(grammar).unwrap();
//! assert_eq!(calc.parse("2 + 3 * (4 + 1)", &mut ()).unwrap(), 17);
//! ```
//!
//! Each production's handler receives the values of the production's symbols in order: a
//! [`declgrammar::AStackType::Lexeme`] for each terminal and a
//! [`declgrammar::AStackType::ActionType`] holding the value computed for each nonterminal.
//! Productions declared without a handler produce `ActionT::default()`.
//!
//! By default parsing stops at the first syntax error. [`ParserBuilder::recoverer`] can instead
//! select [`RecoveryKind::Panic`], which resynchronises and carries on parsing so that several
//! syntax errors can be reported in one go.

mod builder;
mod panic;
mod parser;

pub use crate::{
    builder::{BuildError, CompiledGrammar, ConflictKind, ParserBuilder},
    parser::{LexParseError, ParseError, RTParserBuilder, RecoveryKind},
};
