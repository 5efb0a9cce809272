//! `decllex` turns the token rules of a [declgrammar::Grammar] into a lexer. All of a grammar's
//! token rules are merged into one anchored alternation, ordered by priority: rules with a
//! handler come first (in declaration order), followed by the remaining rules in descending order
//! of pattern length. The resulting [LexerDef] can then be given an input string, from which it
//! instantiates an [LRLexer]. This is an iterator which produces the sequence of
//! [declgrammar::Token]s for that input and can answer basic queries about [declgrammar::Span]s
//! (e.g. extracting substrings, calculating line and column numbers).

#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]
#![allow(clippy::upper_case_acronyms)]

use std::{error::Error, fmt};

mod lexer;

pub use crate::lexer::{LRLexer, LexerDef, Rule};

use declgrammar::Span;

pub type LexBuildResult<T> = Result<T, Vec<LexBuildError>>;

/// Any error from building a [LexerDef] returns an instance of this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexBuildError {
    pub kind: LexErrorKind,
    /// The name of the rule (or literal) at fault.
    pub name: String,
}

impl Error for LexBuildError {}

/// The kinds of declaration a lexer rule name can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Token,
    HandlerToken,
    Keyword,
    Literal,
}

/// Where a name was declared: the kind of declaration and its index amongst declarations of
/// that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOrigin {
    pub kind: RuleKind,
    pub index: usize,
}

/// The various different possible lexer build errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Contains the origin of every declaration using the name.
    DuplicateName(Vec<RuleOrigin>),
    /// The rule's pattern is not a valid regular expression.
    RegexError(String),
    /// The rule's pattern can match the empty string.
    EmptyMatch,
}

impl fmt::Display for LexBuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            LexErrorKind::DuplicateName(origins) => write!(
                f,
                "Rule name '{}' declared {} times",
                self.name,
                origins.len()
            ),
            LexErrorKind::RegexError(e) => {
                write!(f, "Invalid regular expression in rule '{}': {}", self.name, e)
            }
            LexErrorKind::EmptyMatch => {
                write!(f, "Rule '{}' can match the empty string", self.name)
            }
        }
    }
}

/// A lexing error: neither a rule nor a literal matched at `span.start()` and the grammar's
/// lexical error handler didn't skip any input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub span: Span,
    /// The unmatched character.
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl LexError {
    pub fn new(span: Span, text: &str, line: usize, column: usize) -> Self {
        LexError {
            span,
            text: text.to_owned(),
            line,
            column,
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

impl Error for LexError {}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Couldn't lex input {:?} at line {} column {}",
            self.text, self.line, self.column
        )
    }
}
