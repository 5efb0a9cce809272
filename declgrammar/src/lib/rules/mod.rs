#![deny(unreachable_pub)]

//! Turning production declarations (grammar-rule text plus a precedence table) into an
//! index-based [`CfGrammar`].

pub mod ast;
pub mod firsts;
pub mod follows;
pub mod grammar;
mod parser;

pub use self::{
    grammar::{AssocKind, CfGrammar, Precedence, PrecedenceLevel},
    parser::{GrammarError, GrammarErrorKind},
};
