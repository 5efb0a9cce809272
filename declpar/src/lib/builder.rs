use std::{error::Error, fmt};

use declgrammar::{CfGrammar, Grammar, GrammarError};
use decllex::{LRLexer, LexBuildError, LexerDef};
use decltable::{from_grammar, StateTable, StateTableError};
use log::debug;

use crate::{LexParseError, RTParserBuilder, RecoveryKind};

/// Which kind of conflict a [`BuildError::Conflicts`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConflictKind::ShiftReduce => write!(f, "shift/reduce"),
            ConflictKind::ReduceReduce => write!(f, "reduce/reduce"),
        }
    }
}

/// Any of the errors which can occur while compiling a [`Grammar`].
#[derive(Debug)]
pub enum BuildError {
    /// The grammar's token rules are invalid.
    Lex(Vec<LexBuildError>),
    /// The grammar's productions or precedence declarations are invalid.
    Grammar(Vec<GrammarError>),
    /// The state table could not be built.
    Table(StateTableError<u32>),
    /// The grammar has a different number of conflicts than it declared (or, if warnings are
    /// errors, has undeclared conflicts).
    Conflicts {
        kind: ConflictKind,
        expected: usize,
        found: usize,
        /// The pretty-printed conflicts.
        report: String,
    },
}

impl Error for BuildError {}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::Lex(errs) => {
                let s = errs.iter().map(|e| e.to_string()).collect::<Vec<_>>();
                write!(f, "{}", s.join("\n"))
            }
            BuildError::Grammar(errs) => {
                let s = errs.iter().map(|e| e.to_string()).collect::<Vec<_>>();
                write!(f, "{}", s.join("\n"))
            }
            BuildError::Table(e) => write!(f, "{}", e),
            BuildError::Conflicts {
                kind,
                expected,
                found,
                report,
            } => write!(
                f,
                "Expected {} {} conflicts, found {}\n{}",
                expected, kind, found, report
            ),
        }
    }
}

/// Configures and compiles a [`Grammar`] into a [`CompiledGrammar`].
pub struct ParserBuilder<ActionT, ParamT> {
    grammar: Grammar<ActionT, ParamT>,
    recoverer: RecoveryKind,
    warnings_are_errors: bool,
}

impl<ActionT, ParamT> ParserBuilder<ActionT, ParamT> {
    /// Create a new `ParserBuilder` for `grammar`. By default parsers stop at the first syntax
    /// error and undeclared conflicts are only warnings.
    pub fn new(grammar: Grammar<ActionT, ParamT>) -> Self {
        ParserBuilder {
            grammar,
            recoverer: RecoveryKind::None,
            warnings_are_errors: false,
        }
    }

    /// Set the recoverer used by the compiled parser. Defaults to `RecoveryKind::None`.
    pub fn recoverer(mut self, rk: RecoveryKind) -> Self {
        self.recoverer = rk;
        self
    }

    /// If set to true, any shift/reduce or reduce/reduce conflict not covered by the grammar's
    /// `expect`/`expect_rr` declarations is a build error. Defaults to `false`.
    pub fn warnings_are_errors(mut self, flag: bool) -> Self {
        self.warnings_are_errors = flag;
        self
    }

    /// Compile the lexer and the state table.
    pub fn build(self) -> Result<CompiledGrammar<ActionT, ParamT>, BuildError> {
        let lexerdef = LexerDef::new(&self.grammar).map_err(BuildError::Lex)?;
        let grm = CfGrammar::new(&self.grammar).map_err(BuildError::Grammar)?;
        let (_, stable) = from_grammar(&grm).map_err(BuildError::Table)?;

        let conflicts = stable.conflicts();
        let counts = [
            (ConflictKind::ShiftReduce, grm.expect(), conflicts.sr_len()),
            (ConflictKind::ReduceReduce, grm.expectrr(), conflicts.rr_len()),
        ];
        for (kind, expected, found) in counts {
            let mismatch = match expected {
                Some(n) => n != found,
                None => self.warnings_are_errors && found > 0,
            };
            if mismatch {
                return Err(BuildError::Conflicts {
                    kind,
                    expected: expected.unwrap_or(0),
                    found,
                    report: conflicts.pp(&grm),
                });
            }
        }
        let warnings = if conflicts.sr_len() + conflicts.rr_len() > 0 {
            Some(conflicts.pp(&grm))
        } else {
            None
        };
        debug!(
            "Compiled grammar: {} rules, {} productions, {} tokens, {} states",
            usize::from(grm.rules_len()),
            usize::from(grm.prods_len()),
            usize::from(grm.tokens_len()),
            usize::from(stable.states_len())
        );

        Ok(CompiledGrammar {
            grammar: self.grammar,
            lexerdef,
            grm,
            stable,
            recoverer: self.recoverer,
            warnings,
        })
    }
}

/// A grammar whose lexer and parse table have been built. A `CompiledGrammar` can be used for
/// any number of parses: each starts from a fresh lexer and fresh stacks.
pub struct CompiledGrammar<ActionT, ParamT> {
    grammar: Grammar<ActionT, ParamT>,
    lexerdef: LexerDef,
    grm: CfGrammar,
    stable: StateTable<u32>,
    recoverer: RecoveryKind,
    warnings: Option<String>,
}

impl<ActionT: Default, ParamT> CompiledGrammar<ActionT, ParamT> {
    /// Compile `grammar` with the default [`ParserBuilder`] settings.
    pub fn new(grammar: Grammar<ActionT, ParamT>) -> Result<Self, BuildError> {
        ParserBuilder::new(grammar).build()
    }

    /// Parse `text`, returning the value of the start rule or the first error encountered.
    pub fn parse(&self, text: &str, param: &mut ParamT) -> Result<ActionT, LexParseError> {
        let (res, errs) = self.parse_actions(text, param);
        match (res, errs.into_iter().next()) {
            (_, Some(e)) => Err(e),
            (Some(v), None) => Ok(v),
            (None, None) => unreachable!(),
        }
    }

    /// Parse `text`, returning the value of the start rule (if the input was accepted, possibly
    /// after recovering from syntax errors) and every error encountered.
    pub fn parse_actions(
        &self,
        text: &str,
        param: &mut ParamT,
    ) -> (Option<ActionT>, Vec<LexParseError>) {
        let mut lexer = self.lexerdef.lexer(text);
        RTParserBuilder::new(&self.grammar, &self.grm, &self.stable)
            .recoverer(self.recoverer)
            .parse_actions(&mut lexer, param)
    }
}

impl<ActionT, ParamT> CompiledGrammar<ActionT, ParamT> {
    /// Return a lexer over `text`.
    pub fn tokens<'a>(&'a self, text: &'a str) -> LRLexer<'a, 'a> {
        self.lexerdef.lexer(text)
    }

    /// The pretty-printed conflicts which were resolved while building the state table, if
    /// there were any.
    pub fn warnings(&self) -> Option<&str> {
        self.warnings.as_deref()
    }

    pub fn grammar(&self) -> &Grammar<ActionT, ParamT> {
        &self.grammar
    }

    pub fn lexerdef(&self) -> &LexerDef {
        &self.lexerdef
    }

    pub fn cfgrammar(&self) -> &CfGrammar {
        &self.grm
    }

    pub fn statetable(&self) -> &StateTable<u32> {
        &self.stable
    }
}

#[cfg(test)]
mod test {
    use declgrammar::{AStackType, GrammarBuilder};

    use super::{BuildError, CompiledGrammar, ConflictKind, ParserBuilder};

    fn ambiguous() -> GrammarBuilder<u32, ()> {
        GrammarBuilder::new()
            .token("N", "[0-9]+")
            .literals("+")
            .production("E : E '+' E | N")
    }

    #[test]
    fn undeclared_conflicts_are_warnings() {
        let cg = CompiledGrammar::new(ambiguous().build()).unwrap();
        let w = cg.warnings().unwrap();
        assert!(w.starts_with("1 Shift/Reduce\n"));
        assert!(cg.parse("1+2+3", &mut ()).is_ok());
    }

    #[test]
    fn warnings_are_errors() {
        match ParserBuilder::new(ambiguous().build())
            .warnings_are_errors(true)
            .build()
        {
            Err(BuildError::Conflicts {
                kind: ConflictKind::ShiftReduce,
                expected: 0,
                found: 1,
                ..
            }) => (),
            _ => panic!(),
        }
        assert!(ParserBuilder::new(ambiguous().expect(1).build())
            .warnings_are_errors(true)
            .build()
            .is_ok());
    }

    #[test]
    fn expect_mismatch() {
        match CompiledGrammar::new(ambiguous().expect(2).build()) {
            Err(BuildError::Conflicts {
                kind: ConflictKind::ShiftReduce,
                expected: 2,
                found: 1,
                ..
            }) => (),
            _ => panic!(),
        }
        match CompiledGrammar::new(ambiguous().expect(1).expect_rr(1).build()) {
            Err(e @ BuildError::Conflicts { .. }) => {
                assert!(e
                    .to_string()
                    .starts_with("Expected 1 reduce/reduce conflicts, found 0"));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn reduce_clashing_with_accept() {
        // SLR puts the end token in FOLLOW(A) because of `S : 'w' A`, so the accepting state can
        // also reduce the empty `A` on it.
        let concat = |_: &mut (), args: Vec<AStackType<String>>| {
            args.iter()
                .map(|a| a.as_action().map(String::as_str).unwrap_or(a.value_str()))
                .collect::<String>()
        };
        let cg = CompiledGrammar::new(
            GrammarBuilder::<String, ()>::new()
                .literals("abwx")
                .production_with("S : S A 'b' | 'x' | 'w' A", concat)
                .production_with("A : | 'a'", concat)
                .build(),
        )
        .unwrap();
        let w = cg.warnings().unwrap();
        assert!(w.starts_with("3 Shift/Reduce\n"));
        assert!(w.contains("   Shift: $end\n"));
        for s in ["x", "xb", "xab", "xbab", "w", "wa", "wb"] {
            assert_eq!(cg.parse(s, &mut ()).unwrap(), s);
        }
        assert!(cg.parse("xa", &mut ()).is_err());
        assert!(cg.parse("b", &mut ()).is_err());
    }

    #[test]
    fn no_conflicts() {
        let cg = CompiledGrammar::new(
            GrammarBuilder::<u32, ()>::new()
                .token("N", "[0-9]+")
                .production("E : N")
                .build(),
        )
        .unwrap();
        assert!(cg.warnings().is_none());
        assert_eq!(cg.cfgrammar().rules_len().0, 2);
        assert_eq!(
            cg.tokens("12").map(|t| t.unwrap().name).collect::<Vec<_>>(),
            vec!["N"]
        );
    }
}
