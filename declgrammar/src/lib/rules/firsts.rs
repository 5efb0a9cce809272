use std::marker::PhantomData;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

use super::CfGrammar;
use crate::{RIdx, Symbol, TIdx};

/// `Firsts` stores all the first sets for a given grammar. For example, given this grammar:
/// ```text
///   S : A 'b'
///   A : 'a' |
/// ```
/// then the following assertions (and only the following assertions) about the firsts set are
/// correct:
/// ```text
///   assert!(firsts.is_set(grm.rule_idx("S").unwrap(), grm.token_idx("a").unwrap()));
///   assert!(firsts.is_set(grm.rule_idx("S").unwrap(), grm.token_idx("b").unwrap()));
///   assert!(firsts.is_set(grm.rule_idx("A").unwrap(), grm.token_idx("a").unwrap()));
///   assert!(firsts.is_epsilon_set(grm.rule_idx("A").unwrap()));
/// ```
#[derive(Debug)]
pub struct Firsts<StorageT> {
    firsts: Vec<Vob>,
    epsilons: Vob,
    phantom: PhantomData<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> Firsts<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the firsts set for the given grammar.
    pub fn new(grm: &CfGrammar<StorageT>) -> Self {
        let mut firsts = Firsts {
            firsts: vec![
                Vob::from_elem(false, usize::from(grm.tokens_len()));
                usize::from(grm.rules_len())
            ],
            epsilons: Vob::from_elem(false, usize::from(grm.rules_len())),
            phantom: PhantomData,
        };

        // Iterate to a fixed point: each round, every production of a rule E contributes the
        // firsts of its leading symbols (as far as they can derive the empty string) to E.
        loop {
            let mut changed = false;
            for pidx in grm.iter_pidxs() {
                let ridx = grm.prod_to_rule(pidx);
                let mut nullable = true;
                for sym in grm.prod(pidx) {
                    match *sym {
                        Symbol::Token(s_tidx) => {
                            if !firsts.set(ridx, s_tidx) {
                                changed = true;
                            }
                            nullable = false;
                        }
                        Symbol::Rule(s_ridx) => {
                            // A no-op if E refers to itself.
                            if s_ridx != ridx {
                                let (dst, src) = firsts.pair_mut(ridx, s_ridx);
                                if dst.or(src) {
                                    changed = true;
                                }
                            }
                            nullable = firsts.is_epsilon_set(s_ridx);
                        }
                    }
                    if !nullable {
                        break;
                    }
                }
                if nullable && !firsts.is_epsilon_set(ridx) {
                    firsts.epsilons.set(usize::from(ridx), true);
                    changed = true;
                }
            }
            if !changed {
                return firsts;
            }
        }
    }

    fn pair_mut(&mut self, dst: RIdx<StorageT>, src: RIdx<StorageT>) -> (&mut Vob, &Vob) {
        let (dst, src) = (usize::from(dst), usize::from(src));
        debug_assert_ne!(dst, src);
        if dst < src {
            let (l, r) = self.firsts.split_at_mut(src);
            (&mut l[dst], &r[0])
        } else {
            let (l, r) = self.firsts.split_at_mut(dst);
            (&mut r[0], &l[src])
        }
    }

    /// Return all the firsts for rule `ridx`.
    pub fn firsts(&self, ridx: RIdx<StorageT>) -> &Vob {
        &self.firsts[usize::from(ridx)]
    }

    /// Returns true if the token `tidx` is in the first set for rule `ridx`.
    pub fn is_set(&self, ridx: RIdx<StorageT>, tidx: TIdx<StorageT>) -> bool {
        self.firsts[usize::from(ridx)][usize::from(tidx)]
    }

    /// Returns true if the rule `ridx` has epsilon in its first set.
    pub fn is_epsilon_set(&self, ridx: RIdx<StorageT>) -> bool {
        self.epsilons[usize::from(ridx)]
    }

    /// Ensures that the firsts bit for token `tidx` rule `ridx` is set. Returns true if
    /// it was already set, or false otherwise.
    pub fn set(&mut self, ridx: RIdx<StorageT>, tidx: TIdx<StorageT>) -> bool {
        let r = &mut self.firsts[usize::from(ridx)];
        if r[usize::from(tidx)] {
            true
        } else {
            r.set(usize::from(tidx), true);
            false
        }
    }
}
