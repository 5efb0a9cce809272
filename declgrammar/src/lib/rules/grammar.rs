use std::{collections::HashMap, fmt};

use num_traits::{self, AsPrimitive, PrimInt, Unsigned};

use super::{
    ast::{self, GrammarAST},
    firsts::Firsts,
    follows::Follows,
    parser::GrammarError,
};
use crate::{Grammar, PIdx, RIdx, SIdx, Symbol, TIdx};

const START_RULE: &str = "^";

pub type PrecedenceLevel = u64;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Precedence {
    /// Levels start at 1; a higher level binds tighter.
    pub level: PrecedenceLevel,
    pub kind: AssocKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssocKind {
    Left,
    Right,
    Nonassoc,
}

impl fmt::Display for AssocKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AssocKind::Left => "left",
            AssocKind::Right => "right",
            AssocKind::Nonassoc => "nonassoc",
        };
        write!(f, "{}", s)
    }
}

/// Representation of a `CfGrammar`. See the [top-level documentation](../../index.html) for the
/// guarantees this struct makes about rules, tokens, productions, and symbols.
pub struct CfGrammar<StorageT = u32> {
    /// How many rules does this grammar have?
    rules_len: RIdx<StorageT>,
    /// A mapping from `RIdx` -> `String`.
    rule_names: Vec<String>,
    /// A mapping from `TIdx` -> `Option<String>`. Every declared token has a name, but the end
    /// token inserted by `CfGrammar` doesn't.
    token_names: Vec<Option<String>>,
    /// A mapping from `TIdx` -> `Option<Precedence>`
    token_precs: Vec<Option<Precedence>>,
    /// How many tokens does this grammar have?
    tokens_len: TIdx<StorageT>,
    /// The offset of the end token.
    eof_token_idx: TIdx<StorageT>,
    /// How many productions does this grammar have?
    prods_len: PIdx<StorageT>,
    /// Which production is the sole production of the start rule?
    start_prod: PIdx<StorageT>,
    /// A list of all productions.
    prods: Vec<Vec<Symbol<StorageT>>>,
    /// A mapping from rules to their productions. Note that 1) the order of rules is identical to
    /// that of `rule_names` 2) every rule will have at least 1 production 3) productions
    /// are not necessarily stored sequentially.
    rules_prods: Vec<Vec<PIdx<StorageT>>>,
    /// A mapping from productions to their corresponding rule indexes.
    prods_rules: Vec<RIdx<StorageT>>,
    /// The precedence of each production.
    prod_precs: Vec<Option<Precedence>>,
    /// The production declaration each production came from (`None` for the start production).
    prod_decls: Vec<Option<usize>>,
    /// How many shift/reduce conflicts the grammar author expected (if any).
    expect: Option<usize>,
    /// How many reduce/reduce conflicts the grammar author expected (if any).
    expectrr: Option<usize>,
}

// Internally, we assume that a grammar's start rule has a single production. Since we manually
// create the start rule ourselves (without relying on user input), this is a safe assumption.

impl CfGrammar<u32> {
    pub fn new<ActionT, ParamT>(
        grammar: &Grammar<ActionT, ParamT>,
    ) -> Result<Self, Vec<GrammarError>> {
        CfGrammar::new_with_storaget(grammar)
    }
}

impl<StorageT: 'static + PrimInt + Unsigned> CfGrammar<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Takes a [`Grammar`]'s declarations and returns a `CfGrammar` (or every
    /// [`GrammarError`](../parser/struct.GrammarError.html) found).
    ///
    /// As we're compiling the `CfGrammar`, we add a new start rule `^` with a single production
    /// that references the user defined start rule.
    pub fn new_with_storaget<ActionT, ParamT>(
        grammar: &Grammar<ActionT, ParamT>,
    ) -> Result<Self, Vec<GrammarError>> {
        let ast = GrammarAST::from_decls(grammar)?;

        // Check that StorageT is big enough to hold RIdx/PIdx/SIdx/TIdx values; after these
        // checks we can guarantee that things like RIdx(ast.rules.len().as_()) are safe.
        let max = num_traits::cast::<StorageT, usize>(StorageT::max_value()).unwrap_or(usize::MAX);
        if ast.rules.len() >= max {
            panic!("StorageT is not big enough to store this grammar's rules.");
        }
        if ast.tokens.len() >= max {
            panic!("StorageT is not big enough to store this grammar's tokens.");
        }
        if ast.prods.len() >= max {
            panic!("StorageT is not big enough to store this grammar's productions.");
        }
        for p in &ast.prods {
            if p.symbols.len() >= max {
                panic!("StorageT is not big enough to store the symbols of at least one of this grammar's productions.");
            }
        }

        // Rule names in rule text must start with a letter or underscore, so `^` can't clash with
        // a user rule.
        let mut rule_names = Vec::with_capacity(ast.rules.len() + 1);
        rule_names.push(START_RULE.to_string());
        rule_names.extend(ast.rules.keys().cloned());
        let mut rule_map = HashMap::<&str, RIdx<StorageT>>::new();
        for (i, v) in rule_names.iter().enumerate() {
            rule_map.insert(v.as_str(), RIdx(i.as_()));
        }

        let mut token_names = Vec::with_capacity(ast.tokens.len() + 1);
        let mut token_precs = Vec::with_capacity(ast.tokens.len() + 1);
        for k in &ast.tokens {
            token_names.push(Some(k.clone()));
            token_precs.push(ast.precs.get(k).cloned());
        }
        let eof_token_idx = TIdx(token_names.len().as_());
        token_names.push(None);
        token_precs.push(None);
        let mut token_map = HashMap::<&str, TIdx<StorageT>>::new();
        for (i, k) in ast.tokens.iter().enumerate() {
            token_map.insert(k.as_str(), TIdx(i.as_()));
        }

        // Productions keep their AST indices, which follow declaration order even when the
        // declarations of different rules are interleaved. The start production is added last.
        let mut rules_prods = vec![Vec::new(); rule_names.len()];
        let mut prods_rules = vec![RIdx(0usize.as_()); ast.prods.len()];
        for (lhs, rule) in &ast.rules {
            let ridx = rule_map[lhs.as_str()];
            for &pidx in &rule.pidxs {
                rules_prods[usize::from(ridx)].push(PIdx(pidx.as_()));
                prods_rules[pidx] = ridx;
            }
        }
        let mut prods = Vec::with_capacity(ast.prods.len() + 1);
        let mut prod_precs = Vec::with_capacity(ast.prods.len() + 1);
        let mut prod_decls = Vec::with_capacity(ast.prods.len() + 1);
        for astprod in &ast.prods {
            prods.push(
                astprod
                    .symbols
                    .iter()
                    .map(|astsym| match astsym {
                        ast::Symbol::Rule(n, _) => Symbol::Rule(rule_map[n.as_str()]),
                        ast::Symbol::Token(n, _) => Symbol::Token(token_map[n.as_str()]),
                    })
                    .collect::<Vec<_>>(),
            );
            let prec = match astprod.precedence {
                Some((ref n, _)) => Some(ast.precs[n]),
                None => astprod
                    .symbols
                    .iter()
                    .rev()
                    .find_map(|astsym| match astsym {
                        ast::Symbol::Token(n, _) => Some(ast.precs.get(n).cloned()),
                        ast::Symbol::Rule(..) => None,
                    })
                    .flatten(),
            };
            prod_precs.push(prec);
            prod_decls.push(Some(astprod.decl));
        }

        // Add the special start rule `^: S`.
        let start_ridx = RIdx(0usize.as_());
        let start_prod = PIdx(prods.len().as_());
        let user_start = ast
            .start
            .as_deref()
            .and_then(|s| rule_map.get(s))
            .cloned()
            .unwrap_or_else(|| RIdx(1usize.as_()));
        rules_prods[usize::from(start_ridx)].push(start_prod);
        prods.push(vec![Symbol::Rule(user_start)]);
        prod_precs.push(None);
        prods_rules.push(start_ridx);
        prod_decls.push(None);

        Ok(CfGrammar {
            rules_len: RIdx(rule_names.len().as_()),
            rule_names,
            tokens_len: TIdx(token_names.len().as_()),
            eof_token_idx,
            token_names,
            token_precs,
            prods_len: PIdx(prods.len().as_()),
            start_prod,
            rules_prods,
            prods_rules,
            prods,
            prod_precs,
            prod_decls,
            expect: ast.expect,
            expectrr: ast.expectrr,
        })
    }

    /// How many productions does this grammar have?
    pub fn prods_len(&self) -> PIdx<StorageT> {
        self.prods_len
    }

    /// Return an iterator which produces (in order from `0..self.prods_len()`) all this
    /// grammar's valid `PIdx`s.
    pub fn iter_pidxs(&self) -> impl Iterator<Item = PIdx<StorageT>> {
        // We can use as_ safely, because we know that we're only generating integers from
        // 0..self.prods_len() and, since prods_len() returns a PIdx<StorageT>, then by
        // definition the integers we're creating fit within StorageT.
        (0..usize::from(self.prods_len())).map(|x| PIdx(x.as_()))
    }

    /// Get the sequence of symbols for production `pidx`. Panics if `pidx` doesn't exist.
    pub fn prod(&self, pidx: PIdx<StorageT>) -> &[Symbol<StorageT>] {
        &self.prods[usize::from(pidx)]
    }

    /// How many symbols does production `pidx` have? Panics if `pidx` doesn't exist.
    pub fn prod_len(&self, pidx: PIdx<StorageT>) -> SIdx<StorageT> {
        SIdx(self.prods[usize::from(pidx)].len().as_())
    }

    /// Return the rule index of the production `pidx`. Panics if `pidx` doesn't exist.
    pub fn prod_to_rule(&self, pidx: PIdx<StorageT>) -> RIdx<StorageT> {
        self.prods_rules[usize::from(pidx)]
    }

    /// Return the precedence of production `pidx` (where `None` indicates "no precedence
    /// specified"). Panics if `pidx` doesn't exist.
    pub fn prod_precedence(&self, pidx: PIdx<StorageT>) -> Option<Precedence> {
        self.prod_precs[usize::from(pidx)]
    }

    /// Return the index of the production declaration `pidx` came from, which is also the index
    /// of its action. The start production returns `None`.
    pub fn prod_decl(&self, pidx: PIdx<StorageT>) -> Option<usize> {
        self.prod_decls[usize::from(pidx)]
    }

    /// Return the production index of the start rule's sole production.
    pub fn start_prod(&self) -> PIdx<StorageT> {
        self.start_prod
    }

    /// How many rules does this grammar have?
    pub fn rules_len(&self) -> RIdx<StorageT> {
        self.rules_len
    }

    /// Return an iterator which produces (in order from `0..self.rules_len()`) all this
    /// grammar's valid `RIdx`s.
    pub fn iter_rules(&self) -> impl Iterator<Item = RIdx<StorageT>> {
        (0..usize::from(self.rules_len())).map(|x| RIdx(x.as_()))
    }

    /// Return the productions for rule `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule_to_prods(&self, ridx: RIdx<StorageT>) -> &[PIdx<StorageT>] {
        &self.rules_prods[usize::from(ridx)]
    }

    /// Return the name of rule `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule_name_str(&self, ridx: RIdx<StorageT>) -> &str {
        &self.rule_names[usize::from(ridx)]
    }

    /// Return the index of the rule named `n` or `None` if it doesn't exist.
    pub fn rule_idx(&self, n: &str) -> Option<RIdx<StorageT>> {
        self.rule_names
            .iter()
            .position(|x| x == n)
            .map(|x| RIdx(x.as_()))
    }

    /// What is the index of the start rule? Note that `CfGrammar` will have inserted a rule
    /// "above" the user's start rule.
    pub fn start_rule_idx(&self) -> RIdx<StorageT> {
        self.prod_to_rule(self.start_prod)
    }

    /// How many tokens does this grammar have?
    pub fn tokens_len(&self) -> TIdx<StorageT> {
        self.tokens_len
    }

    /// Return an iterator which produces (in order from `0..self.tokens_len()`) all this
    /// grammar's valid `TIdx`s.
    pub fn iter_tidxs(&self) -> impl Iterator<Item = TIdx<StorageT>> {
        (0..usize::from(self.tokens_len())).map(|x| TIdx(x.as_()))
    }

    /// Return the index of the end token.
    pub fn eof_token_idx(&self) -> TIdx<StorageT> {
        self.eof_token_idx
    }

    /// Return the name of token `tidx` (where `None` indicates "the token has no name", which is
    /// only true of the end token). Panics if `tidx` doesn't exist.
    pub fn token_name(&self, tidx: TIdx<StorageT>) -> Option<&str> {
        self.token_names[usize::from(tidx)].as_deref()
    }

    /// Return the precedence of token `tidx` (where `None` indicates "no precedence specified").
    /// Panics if `tidx` doesn't exist.
    pub fn token_precedence(&self, tidx: TIdx<StorageT>) -> Option<Precedence> {
        self.token_precs[usize::from(tidx)]
    }

    /// Returns a map from names to `TIdx`s of all named tokens.
    pub fn tokens_map(&self) -> HashMap<&str, TIdx<StorageT>> {
        let mut m = HashMap::with_capacity(usize::from(self.tokens_len) - 1);
        for tidx in self.iter_tidxs() {
            if let Some(n) = self.token_names[usize::from(tidx)].as_ref() {
                m.insert(n.as_str(), tidx);
            }
        }
        m
    }

    /// Return the index of the token named `n` or `None` if it doesn't exist.
    pub fn token_idx(&self, n: &str) -> Option<TIdx<StorageT>> {
        self.token_names
            .iter()
            .position(|x| x.as_deref() == Some(n))
            .map(|x| TIdx(x.as_()))
    }

    /// How many shift/reduce conflicts were expected?
    pub fn expect(&self) -> Option<usize> {
        self.expect
    }

    /// How many reduce/reduce conflicts were expected?
    pub fn expectrr(&self) -> Option<usize> {
        self.expectrr
    }

    /// Returns the string representation of a given production `pidx`.
    pub fn pp_prod(&self, pidx: PIdx<StorageT>) -> String {
        let mut sprod = String::new();
        let ridx = self.prod_to_rule(pidx);
        sprod.push_str(self.rule_name_str(ridx));
        sprod.push(':');
        for sym in self.prod(pidx) {
            let s = match sym {
                Symbol::Token(tidx) => self.token_name(*tidx).unwrap_or("$end"),
                Symbol::Rule(ridx) => self.rule_name_str(*ridx),
            };
            sprod.push_str(&format!(" \"{}\"", s));
        }
        sprod
    }

    /// Return a `Firsts` struct for this grammar.
    pub fn firsts(&self) -> Firsts<StorageT> {
        Firsts::new(self)
    }

    /// Return a `Follows` struct for this grammar.
    pub fn follows(&self) -> Follows<StorageT> {
        Follows::new(self)
    }
}
