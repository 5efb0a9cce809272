use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use indexmap::{IndexMap, IndexSet};

use super::{
    parser::{GrammarError, GrammarErrorKind, RuleParser},
    Precedence,
};
use crate::{Grammar, Span};

/// An AST representing a grammar's productions. It is built from a [`Grammar`]'s declarations
/// by [`GrammarAST::from_decls`], which also validates it.
#[derive(Debug)]
pub struct GrammarAST {
    pub start: Option<String>,
    /// Map from a rule name to the rule. Rules are kept in the order they were first declared.
    pub rules: IndexMap<String, Rule>,
    pub prods: Vec<Production>,
    /// Every terminal name: tokens, keywords, literals, then names which only appear in the
    /// precedence table.
    pub tokens: IndexSet<String>,
    pub precs: HashMap<String, Precedence>,
    pub expect: Option<usize>,
    pub expectrr: Option<usize>,
}

#[derive(Debug)]
pub struct Rule {
    pub name: (String, Span),
    /// The production declaration the rule was first seen in.
    pub decl: usize,
    pub pidxs: Vec<usize>, // index into GrammarAST.prod
}

#[derive(Debug, Eq, PartialEq)]
pub struct Production {
    pub symbols: Vec<Symbol>,
    pub precedence: Option<(String, Span)>,
    /// The production declaration this production came from, and thus its action.
    pub decl: usize,
}

#[derive(Clone, Debug, Eq)]
pub enum Symbol {
    Rule(String, Span),
    Token(String, Span),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Rule(n, _) | Symbol::Token(n, _) => n,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Symbol::Rule(_, s) | Symbol::Token(_, s) => *s,
        }
    }
}

/// Symbols are equal if they are of the same kind and name: their spans are irrelevant.
impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Symbol::Rule(x, _), Symbol::Rule(y, _)) | (Symbol::Token(x, _), Symbol::Token(y, _)) => {
                x == y
            }
            _ => false,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Precedence names may be written either bare (`+`) or quoted like a literal (`'+'`).
fn unquote(name: &str) -> &str {
    let mut cs = name.chars();
    match (cs.next(), cs.next(), cs.next(), cs.next()) {
        (Some(q1), Some(_), Some(q2), None) if q1 == q2 && (q1 == '\'' || q1 == '"') => {
            &name[1..name.len() - 1]
        }
        _ => name,
    }
}

impl GrammarAST {
    pub fn new() -> GrammarAST {
        GrammarAST {
            start: None,
            rules: IndexMap::new(),
            prods: Vec::new(),
            tokens: IndexSet::new(),
            precs: HashMap::new(),
            expect: None,
            expectrr: None,
        }
    }

    /// Build and validate the AST for `grammar`'s declarations. Every error found is returned.
    pub fn from_decls<ActionT, ParamT>(
        grammar: &Grammar<ActionT, ParamT>,
    ) -> Result<GrammarAST, Vec<GrammarError>> {
        let mut ast = GrammarAST::new();
        let mut errs = Vec::new();

        for t in grammar.tokens() {
            ast.tokens.insert(t.name.clone());
        }
        for k in grammar.keywords() {
            ast.tokens.insert(k.clone());
        }
        for c in grammar.literals() {
            ast.tokens.insert(c.to_string());
        }
        // Only names the lexer can produce are treated as terminals in rule text.
        let terminals = ast.tokens.iter().cloned().collect::<HashSet<_>>();

        for (i, level) in grammar.precedence().iter().enumerate() {
            for n in &level.names {
                let n = unquote(n);
                if ast.precs.contains_key(n) {
                    errs.push(GrammarError {
                        kind: GrammarErrorKind::DuplicatePrecedence(n.to_owned()),
                        prod: None,
                        span: Span::new(0, 0),
                    });
                    continue;
                }
                ast.precs.insert(
                    n.to_owned(),
                    Precedence {
                        level: (i + 1) as u64,
                        kind: level.assoc,
                    },
                );
                ast.tokens.insert(n.to_owned());
            }
        }

        for (decl, p) in grammar.productions().iter().enumerate() {
            if let Err(e) = RuleParser::new(&p.rule, decl, &terminals).parse(&mut ast) {
                errs.push(e);
            }
        }
        if !errs.is_empty() {
            return Err(errs);
        }
        if ast.prods.is_empty() {
            return Err(vec![GrammarError {
                kind: GrammarErrorKind::EmptyGrammar,
                prod: None,
                span: Span::new(0, 0),
            }]);
        }

        ast.start = Some(match grammar.start() {
            Some(s) => s.to_owned(),
            None => ast.rules[0].name.0.clone(),
        });
        ast.expect = grammar.expect();
        ast.expectrr = grammar.expect_rr();
        ast.validate()?;
        Ok(ast)
    }

    pub fn add_rule(&mut self, name: String, span: Span, decl: usize) {
        self.rules.entry(name.clone()).or_insert_with(|| Rule {
            name: (name, span),
            decl,
            pidxs: Vec::new(),
        });
    }

    /// Add a production to the rule `key`, which must already have been added.
    pub fn add_prod(
        &mut self,
        key: String,
        symbols: Vec<Symbol>,
        precedence: Option<(String, Span)>,
        decl: usize,
    ) {
        if let Some(rule) = self.rules.get_mut(&key) {
            rule.pidxs.push(self.prods.len());
        }
        self.prods.push(Production {
            symbols,
            precedence,
            decl,
        });
    }

    /// Check that:
    ///   1) The start rule references a rule in the grammar
    ///   2) Every rule reference references a rule in the grammar
    ///   3) Every token reference references a declared token
    ///   4) If a production has a precedence token, then it has a precedence level
    ///   5) No rule has the same production twice
    fn validate(&self) -> Result<(), Vec<GrammarError>> {
        let mut errs = Vec::new();
        if let Some(s) = &self.start {
            if !self.rules.contains_key(s) {
                errs.push(GrammarError {
                    kind: GrammarErrorKind::InvalidStartRule(s.clone()),
                    prod: None,
                    span: Span::new(0, 0),
                });
            }
        }
        for rule in self.rules.values() {
            for (i, &pidx) in rule.pidxs.iter().enumerate() {
                let prod = &self.prods[pidx];
                if let Some((n, span)) = &prod.precedence {
                    if !self.precs.contains_key(n) {
                        errs.push(GrammarError {
                            kind: GrammarErrorKind::NoPrecForToken(n.clone()),
                            prod: Some(prod.decl),
                            span: *span,
                        });
                    }
                }
                for sym in &prod.symbols {
                    let kind = match sym {
                        Symbol::Rule(name, _) if !self.rules.contains_key(name) => {
                            GrammarErrorKind::UnknownRuleRef(name.clone())
                        }
                        Symbol::Token(name, _) if !self.tokens.contains(name) => {
                            GrammarErrorKind::UnknownToken(name.clone())
                        }
                        _ => continue,
                    };
                    errs.push(GrammarError {
                        kind,
                        prod: Some(prod.decl),
                        span: sym.span(),
                    });
                }
                if rule.pidxs[..i]
                    .iter()
                    .any(|&prev| self.prods[prev].symbols == prod.symbols)
                {
                    errs.push(GrammarError {
                        kind: GrammarErrorKind::DuplicateProduction(self.pp_prod(&rule.name.0, pidx)),
                        prod: Some(prod.decl),
                        span: prod.symbols.first().map_or(Span::new(0, 0), |s| s.span()),
                    });
                }
            }
        }
        if errs.is_empty() {
            Ok(())
        } else {
            Err(errs)
        }
    }

    fn pp_prod(&self, name: &str, pidx: usize) -> String {
        let mut s = format!("{} :", name);
        for sym in &self.prods[pidx].symbols {
            s.push(' ');
            s.push_str(sym.name());
        }
        s
    }
}
