#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]
#![allow(clippy::upper_case_acronyms)]

//! A library for declaring and manipulating the grammars consumed by `decllex` and `declpar`.
//!
//! Grammars are not read from a file: they are registered explicitly, in order, through a
//! [`GrammarBuilder`]. A grammar author declares:
//!
//!   * *simple tokens*: `(name, pattern)` pairs;
//!   * *handler tokens*: `(name, pattern, handler)` triples where the handler may rewrite the
//!     matched [`Token`] and decides whether it is kept or discarded;
//!   * *literals*: single characters which are terminals named by themselves;
//!   * *keywords*: terminals without a pattern of their own;
//!   * a *precedence table*;
//!   * *productions*, written as grammar-rule text such as `expr : expr '+' expr | 'n'`,
//!     each paired with an optional action handler.
//!
//! We use the following terminology throughout the workspace:
//!
//!   * A *grammar* is an ordered sequence of *productions*.
//!   * A *production* is an ordered sequence of *symbols*.
//!   * A *rule* maps a name (a nonterminal) to one or more productions.
//!   * A *token* is the name of a terminal.
//!
//! The declarations are turned into an index-based [`CfGrammar`] by
//! [`CfGrammar::new`](rules/grammar/struct.CfGrammar.html#method.new), which makes the following
//! guarantees:
//!
//!   * Productions are numbered from `0` to `prods_len() - 1` (inclusive).
//!   * Rules are numbered from `0` to `rules_len() - 1` (inclusive).
//!   * Tokens are numbered from `0` to `tokens_len() - 1` (inclusive).
//!   * The StorageT type used to store productions, rules, and token indices can be infallibly
//!     converted into usize (see [`TIdx`](struct.TIdx.html) and friends for more details).

mod decl;
mod idxnewtype;
pub mod newlinecache;
pub mod rules;
pub mod span;
mod token;

pub use decl::{
    AStackType, ActionHandler, Grammar, GrammarBuilder, LexErrorHandler, PrecedenceDecl,
    ProductionDecl, SyntaxErrorHandler, TokenDecl, TokenHandler,
};
pub use newlinecache::NewlineCache;
pub use rules::{AssocKind, CfGrammar, GrammarError, GrammarErrorKind, Precedence};
pub use span::Span;
pub use token::Token;

/// A type specifically for rule indices.
pub use crate::idxnewtype::{PIdx, RIdx, SIdx, TIdx};

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Symbol<StorageT> {
    Rule(RIdx<StorageT>),
    Token(TIdx<StorageT>),
}
