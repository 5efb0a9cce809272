use std::hash::Hash;

use declgrammar::Token;
use decllex::LexError;
use decltable::Action;
use log::debug;
use num_traits::{AsPrimitive, PrimInt, Unsigned};

use crate::parser::{AStack, LexParseError, PStack, Parser};

/// The outcome of a panic mode recovery.
pub(crate) enum Recovery {
    /// Continue parsing with the given lookahead. The flag records whether any input was
    /// discarded to get there.
    Resume(Option<Token>, bool),
    /// No state accepts any of the remaining input.
    GiveUp,
}

/// Panic mode recovery, based on that in Compiler Design in C by Allen I. Holub p.348: starting
/// with the lookahead `la` which caused an error, search the parse stack from the top for a state
/// which has an action for the lookahead. If one is found, the stacks are truncated to that state
/// and parsing resumes; if not, the lookahead is discarded and the search is repeated with the
/// next token. Recovery gives up if the end of the input is reached without finding such a state.
///
/// If `must_discard` is set, the parser has already resynchronised on `la` without shifting
/// anything since, so `la` is discarded before searching. This guarantees that consecutive
/// recoveries consume input.
pub(crate) fn recover<ActionT: Default, ParamT, StorageT: 'static + Hash + PrimInt + Unsigned, I>(
    parser: &Parser<ActionT, ParamT, StorageT>,
    pstack: &mut PStack,
    astack: &mut AStack<ActionT>,
    lexer: &mut I,
    mut la: Option<Token>,
    must_discard: bool,
    errors: &mut Vec<LexParseError>,
) -> Recovery
where
    usize: AsPrimitive<StorageT>,
    I: Iterator<Item = Result<Token, LexError>>,
{
    let mut discarded = false;
    let mut skip = must_discard;
    loop {
        if !skip {
            let found = parser.la_tidx(la.as_ref()).and_then(|tidx| {
                pstack
                    .iter()
                    .rposition(|st| parser.stable.action(*st, tidx) != Action::Error)
            });
            if let Some(st_i) = found {
                debug!(
                    "Recovered in state {} ({} states popped)",
                    pstack[st_i],
                    pstack.len() - st_i - 1
                );
                pstack.truncate(st_i + 1);
                astack.truncate(st_i);
                return Recovery::Resume(la, discarded);
            }
        }
        skip = false;
        match la.as_ref() {
            Some(t) => debug!("Discarding {}", t),
            None => {
                debug!("Reached the end of the input while recovering");
                return Recovery::GiveUp;
            }
        }
        discarded = true;
        la = match lexer.next().transpose() {
            Ok(t) => t,
            Err(e) => {
                errors.push(e.into());
                return Recovery::GiveUp;
            }
        };
    }
}
