use lazy_static::lazy_static;
use regex::Regex;
use std::{collections::HashSet, error::Error, fmt};

use crate::Span;

use super::ast::{GrammarAST, Symbol};

type RuleResult<T> = Result<T, GrammarError>;

/// The various different possible grammar errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind {
    IllegalName,
    IllegalString,
    MissingColon,
    PrecNotFollowedByToken,
    PrecNotLast,
    EmptyGrammar,
    InvalidStartRule(String),
    UnknownRuleRef(String),
    UnknownToken(String),
    NoPrecForToken(String),
    DuplicatePrecedence(String),
    DuplicateProduction(String),
    TokenAsRule(String),
}

/// Any error found while turning declarations into a grammar returns an instance of this struct.
/// `prod` is the index of the production declaration the error was found in (if any) and `span`
/// is relative to that declaration's rule text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError {
    pub kind: GrammarErrorKind,
    pub prod: Option<usize>,
    pub span: Span,
}

impl Error for GrammarError {}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.prod {
            Some(p) => write!(
                f,
                "{} (production declaration {}, offset {})",
                self.kind,
                p,
                self.span.start()
            ),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl fmt::Display for GrammarErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            GrammarErrorKind::IllegalName => "Illegal name",
            GrammarErrorKind::IllegalString => "Illegal string",
            GrammarErrorKind::MissingColon => "Missing ':'",
            GrammarErrorKind::PrecNotFollowedByToken => "%prec not followed by token name",
            GrammarErrorKind::PrecNotLast => "%prec must come at the end of an alternative",
            GrammarErrorKind::EmptyGrammar => "No productions declared",
            GrammarErrorKind::InvalidStartRule(name) => {
                return write!(f, "Start rule '{}' does not appear in grammar", name)
            }
            GrammarErrorKind::UnknownRuleRef(name) => {
                return write!(f, "Unknown reference to rule '{}'", name)
            }
            GrammarErrorKind::UnknownToken(name) => {
                return write!(f, "Unknown token '{}'", name)
            }
            GrammarErrorKind::NoPrecForToken(name) => {
                return write!(
                    f,
                    "Token '{}' used in %prec has no precedence attached",
                    name
                )
            }
            GrammarErrorKind::DuplicatePrecedence(name) => {
                return write!(f, "Token '{}' has multiple precedences specified", name)
            }
            GrammarErrorKind::DuplicateProduction(prod) => {
                return write!(f, "Duplicated production '{}'", prod)
            }
            GrammarErrorKind::TokenAsRule(name) => {
                return write!(f, "Token '{}' cannot be the left-hand side of a rule", name)
            }
        };
        write!(f, "{}", s)
    }
}

lazy_static! {
    static ref RE_NAME: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*").unwrap();
    static ref RE_SYMBOL: Regex = Regex::new(r#"^(?:'[^']*'|"[^"]*"|[^\s|'"]+)"#).unwrap();
}

/// Parses the rule text of one production declaration, e.g. `expr : expr '+' expr | NUM`, and
/// adds the productions it describes to a [`GrammarAST`]. A name is a terminal if it is in
/// `terminals`; every other name refers to a rule.
pub(crate) struct RuleParser<'a> {
    src: &'a str,
    decl: usize,
    terminals: &'a HashSet<String>,
}

impl<'a> RuleParser<'a> {
    pub(crate) fn new(src: &'a str, decl: usize, terminals: &'a HashSet<String>) -> Self {
        RuleParser {
            src,
            decl,
            terminals,
        }
    }

    pub(crate) fn parse(&self, ast: &mut GrammarAST) -> RuleResult<()> {
        let mut i = self.parse_ws(0);
        let (j, lhs) = self.parse_name(i)?;
        let lhs_span = Span::new(i, j);
        if self.terminals.contains(&lhs) {
            return Err(self.mk_error(GrammarErrorKind::TokenAsRule(lhs), lhs_span));
        }
        i = self.parse_ws(j);
        match self.lookahead_is(":", i) {
            Some(j) => i = j,
            None => return Err(self.mk_error(GrammarErrorKind::MissingColon, Span::new(i, i))),
        }

        let mut alts = Vec::new();
        let mut syms = Vec::new();
        let mut prec = None;
        i = self.parse_ws(i);
        while i < self.src.len() {
            if let Some(j) = self.lookahead_is("|", i) {
                alts.push((std::mem::take(&mut syms), prec.take()));
                i = self.parse_ws(j);
                continue;
            }
            if prec.is_some() {
                return Err(self.mk_error(GrammarErrorKind::PrecNotLast, Span::new(i, i)));
            }
            if let Some(j) = self.lookahead_is("%prec", i) {
                let k = self.parse_ws(j);
                if k == j && k < self.src.len() {
                    // `%precX` is not a `%prec` clause.
                    return Err(self.mk_error(GrammarErrorKind::IllegalName, Span::new(i, i)));
                }
                match self.parse_symbol(k) {
                    Ok((l, name, span)) if !name.is_empty() => {
                        prec = Some((name, span));
                        i = l;
                    }
                    _ => {
                        return Err(
                            self.mk_error(GrammarErrorKind::PrecNotFollowedByToken, Span::new(k, k))
                        )
                    }
                }
            } else {
                let quoted = self.src[i..].starts_with(|c| c == '\'' || c == '"');
                let (j, name, span) = self.parse_symbol(i)?;
                if quoted {
                    syms.push(Symbol::Token(name, span));
                } else {
                    if !RE_NAME
                        .find(&name)
                        .map_or(false, |m| m.end() == name.len())
                    {
                        return Err(self.mk_error(GrammarErrorKind::IllegalName, span));
                    }
                    if self.terminals.contains(&name) {
                        syms.push(Symbol::Token(name, span));
                    } else {
                        syms.push(Symbol::Rule(name, span));
                    }
                }
                i = j;
            }
            i = self.parse_ws(i);
        }
        alts.push((syms, prec));

        ast.add_rule(lhs.clone(), lhs_span, self.decl);
        for (syms, prec) in alts {
            ast.add_prod(lhs.clone(), syms, prec, self.decl);
        }
        Ok(())
    }

    fn parse_name(&self, i: usize) -> RuleResult<(usize, String)> {
        match RE_NAME.find(&self.src[i..]) {
            Some(m) => Ok((i + m.end(), self.src[i..i + m.end()].to_string())),
            None => Err(self.mk_error(GrammarErrorKind::IllegalName, Span::new(i, i))),
        }
    }

    /// Parse a bare name or a quoted single character. A quoted symbol's span excludes its quotes.
    fn parse_symbol(&self, i: usize) -> RuleResult<(usize, String, Span)> {
        match RE_SYMBOL.find(&self.src[i..]) {
            Some(m) => {
                let end = i + m.end();
                match self.src[i..].chars().next() {
                    Some('"') | Some('\'') => {
                        let (st, en) = (i + 1, end - 1);
                        let s = &self.src[st..en];
                        if s.chars().count() != 1 {
                            return Err(
                                self.mk_error(GrammarErrorKind::IllegalString, Span::new(i, end))
                            );
                        }
                        Ok((end, s.to_string(), Span::new(st, en)))
                    }
                    _ => Ok((end, self.src[i..end].to_string(), Span::new(i, end))),
                }
            }
            None => match self.src[i..].chars().next() {
                // An unterminated quote.
                Some('"') | Some('\'') => Err(self.mk_error(
                    GrammarErrorKind::IllegalString,
                    Span::new(i, self.src.len()),
                )),
                _ => Ok((i, String::new(), Span::new(i, i))),
            },
        }
    }

    fn parse_ws(&self, i: usize) -> usize {
        let rest = &self.src[i..];
        i + (rest.len() - rest.trim_start().len())
    }

    fn lookahead_is(&self, s: &'static str, i: usize) -> Option<usize> {
        if self.src[i..].starts_with(s) {
            Some(i + s.len())
        } else {
            None
        }
    }

    fn mk_error(&self, kind: GrammarErrorKind, span: Span) -> GrammarError {
        GrammarError {
            kind,
            prod: Some(self.decl),
            span,
        }
    }
}
