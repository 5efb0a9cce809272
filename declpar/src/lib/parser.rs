use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display},
    hash::Hash,
};

use declgrammar::{AStackType, CfGrammar, Grammar, PIdx, TIdx, Token};
use decllex::LexError;
use decltable::{Action, StIdx, StateTable};
use log::debug;
use num_traits::{AsPrimitive, PrimInt, Unsigned};

use crate::panic::{self, Recovery};

pub(crate) type PStack = Vec<StIdx>; // Parse stack
pub(crate) type AStack<ActionT> = Vec<AStackType<ActionT>>; // Value stack

/// What the parser does after reporting a syntax error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryKind {
    /// Resynchronise by popping states and discarding input until a state has an action for the
    /// lookahead.
    Panic,
    /// Stop at the first syntax error.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexParseError {
    LexError(LexError),
    ParseError(ParseError),
}

impl Error for LexParseError {}

impl fmt::Display for LexParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LexParseError::LexError(ref e) => Display::fmt(e, f),
            LexParseError::ParseError(ref e) => Display::fmt(e, f),
        }
    }
}

impl From<LexError> for LexParseError {
    fn from(err: LexError) -> LexParseError {
        LexParseError::LexError(err)
    }
}

impl From<ParseError> for LexParseError {
    fn from(err: ParseError) -> LexParseError {
        LexParseError::ParseError(err)
    }
}

/// Records a single syntax error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    stidx: StIdx,
    token: Option<Token>,
    expected: Vec<String>,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.token {
            Some(ref t) => write!(
                f,
                "Syntax error at line {} column {}: unexpected {} {:?}",
                t.line, t.column, t.name, t.value
            )?,
            None => write!(f, "Syntax error: unexpected end of input")?,
        }
        if !self.expected.is_empty() {
            write!(f, " (expected one of: {})", self.expected.join(", "))?;
        }
        Ok(())
    }
}

impl Error for ParseError {}

impl ParseError {
    /// Return the state table index where this error was detected.
    pub fn stidx(&self) -> StIdx {
        self.stidx
    }

    /// Return the token where this error was detected, or `None` if the input ended
    /// unexpectedly.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// The names of the tokens which would have been valid instead (`$end` denoting the end of
    /// the input).
    pub fn expected(&self) -> &[String] {
        &self.expected
    }
}

pub(crate) struct Parser<'a, ActionT, ParamT, StorageT: Eq + Hash> {
    pub(crate) rcvry_kind: RecoveryKind,
    pub(crate) grammar: &'a Grammar<ActionT, ParamT>,
    pub(crate) grm: &'a CfGrammar<StorageT>,
    pub(crate) stable: &'a StateTable<StorageT>,
    tokens_map: HashMap<&'a str, TIdx<StorageT>>,
}

impl<'a, ActionT: Default, ParamT, StorageT: 'static + Hash + PrimInt + Unsigned>
    Parser<'a, ActionT, ParamT, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Parse the tokens produced by `lexer` until the input is accepted or an unrecoverable error
    /// occurs. Every error encountered is appended to `errors`; the parse's value is returned if
    /// the input was accepted (possibly after recovering from errors).
    fn lr<I>(
        &self,
        lexer: &mut I,
        param: &mut ParamT,
        errors: &mut Vec<LexParseError>,
    ) -> Option<ActionT>
    where
        I: Iterator<Item = Result<Token, LexError>>,
    {
        let mut pstack: PStack = vec![self.stable.start_state()];
        let mut astack: AStack<ActionT> = Vec::new();
        let mut la = match lexer.next().transpose() {
            Ok(t) => t,
            Err(e) => {
                errors.push(e.into());
                return None;
            }
        };
        // Set after a recovery which didn't discard any input, until the next shift.
        let mut resynced = false;
        loop {
            let stidx = *pstack.last().unwrap();
            let action = match self.la_tidx(la.as_ref()) {
                Some(tidx) => self.stable.action(stidx, tidx),
                None => Action::Error,
            };

            match action {
                Action::Shift(state_id) => {
                    // The end token is never shifted, so there is always a token here.
                    if let Some(t) = la.take() {
                        astack.push(AStackType::Lexeme(t));
                    }
                    pstack.push(state_id);
                    resynced = false;
                    la = match lexer.next().transpose() {
                        Ok(t) => t,
                        Err(e) => {
                            errors.push(e.into());
                            return None;
                        }
                    };
                }
                Action::Reduce(pidx) => {
                    let ridx = self.grm.prod_to_rule(pidx);
                    let pop_idx = pstack.len() - self.grm.prod(pidx).len();
                    let args = astack.drain(pop_idx - 1..).collect::<Vec<_>>();
                    astack.push(AStackType::ActionType(self.reduce(pidx, args, param)));

                    pstack.drain(pop_idx..);
                    let prior = *pstack.last().unwrap();
                    pstack.push(self.stable.goto(prior, ridx).unwrap());
                }
                Action::Accept => {
                    debug_assert!(la.is_none());
                    debug_assert_eq!(astack.len(), 1);
                    return astack.pop().and_then(AStackType::into_action);
                }
                Action::Error => {
                    (self.grammar.syntax_error_handler())(la.as_ref());
                    let err = ParseError {
                        stidx,
                        token: la.clone(),
                        expected: self.expected(stidx),
                    };
                    debug!("{}", err);
                    errors.push(err.into());
                    match self.rcvry_kind {
                        RecoveryKind::None => return None,
                        RecoveryKind::Panic => {
                            match panic::recover(
                                self,
                                &mut pstack,
                                &mut astack,
                                lexer,
                                la.take(),
                                resynced,
                                errors,
                            ) {
                                Recovery::Resume(new_la, discarded) => {
                                    la = new_la;
                                    resynced = !discarded;
                                }
                                Recovery::GiveUp => return None,
                            }
                        }
                    }
                }
            }
        }
    }

    /// Compute the value of production `pidx` from the values of its symbols.
    fn reduce(
        &self,
        pidx: PIdx<StorageT>,
        args: Vec<AStackType<ActionT>>,
        param: &mut ParamT,
    ) -> ActionT {
        match self
            .grm
            .prod_decl(pidx)
            .and_then(|decl| self.grammar.action(decl))
        {
            Some(handler) => handler(param, args),
            None => ActionT::default(),
        }
    }

    /// Return the `TIdx` of the lookahead `la` (`None` being the end of the input), or `None` if
    /// the token's name isn't a terminal of the grammar.
    pub(crate) fn la_tidx(&self, la: Option<&Token>) -> Option<TIdx<StorageT>> {
        match la {
            Some(t) => self.tokens_map.get(t.name.as_str()).cloned(),
            None => Some(self.grm.eof_token_idx()),
        }
    }

    /// The names of the tokens with an action in state `stidx`.
    fn expected(&self, stidx: StIdx) -> Vec<String> {
        self.stable
            .state_actions(stidx)
            .map(|tidx| self.grm.token_name(tidx).unwrap_or("$end").to_owned())
            .collect()
    }
}

/// Drive a grammar's state table over a token stream, running the grammar's production handlers.
pub struct RTParserBuilder<'a, ActionT, ParamT, StorageT: Eq + Hash = u32> {
    grammar: &'a Grammar<ActionT, ParamT>,
    grm: &'a CfGrammar<StorageT>,
    stable: &'a StateTable<StorageT>,
    recoverer: RecoveryKind,
}

impl<'a, ActionT: Default, ParamT, StorageT: 'static + Hash + PrimInt + Unsigned>
    RTParserBuilder<'a, ActionT, ParamT, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Create a parser for `grammar`, whose compiled form is `grm` and `stable`. By default
    /// parsing stops at the first syntax error.
    pub fn new(
        grammar: &'a Grammar<ActionT, ParamT>,
        grm: &'a CfGrammar<StorageT>,
        stable: &'a StateTable<StorageT>,
    ) -> Self {
        RTParserBuilder {
            grammar,
            grm,
            stable,
            recoverer: RecoveryKind::None,
        }
    }

    /// Set the recoverer for this parser to `rk`.
    pub fn recoverer(mut self, rk: RecoveryKind) -> Self {
        self.recoverer = rk;
        self
    }

    /// Parse the tokens of `lexer`, passing `param` to every production handler. Returns the
    /// value of the start rule (if the input was accepted) and every error encountered. A lexing
    /// error always ends the parse.
    pub fn parse_actions<I>(
        &self,
        lexer: &mut I,
        param: &mut ParamT,
    ) -> (Option<ActionT>, Vec<LexParseError>)
    where
        I: Iterator<Item = Result<Token, LexError>>,
    {
        let psr = Parser {
            rcvry_kind: self.recoverer,
            grammar: self.grammar,
            grm: self.grm,
            stable: self.stable,
            tokens_map: self.grm.tokens_map(),
        };
        let mut errors = Vec::new();
        let res = psr.lr(lexer, param, &mut errors);
        debug_assert!(res.is_some() || !errors.is_empty());
        (res, errors)
    }
}
