use std::marker::PhantomData;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

use super::CfGrammar;
use crate::{RIdx, Symbol, TIdx};

/// `Follows` stores all the Follow sets for a given grammar. For example, given this grammar:
/// ```text
///   S : A 'b'
///   A : 'a' |
/// ```
/// then the following assertions (and only the following assertions) about the Follows set are
/// correct:
/// ```text
///   assert!(follows.is_set(grm.rule_idx("S").unwrap(), grm.eof_token_idx());
///   assert!(follows.is_set(grm.rule_idx("A").unwrap(), grm.token_idx("b").unwrap()));
/// ```
#[derive(Debug)]
pub struct Follows<StorageT> {
    follows: Vec<Vob>,
    phantom: PhantomData<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> Follows<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the Follows set for the given grammar.
    pub fn new(grm: &CfGrammar<StorageT>) -> Self {
        let mut follows = vec![
            Vob::from_elem(false, usize::from(grm.tokens_len()));
            usize::from(grm.rules_len())
        ];
        follows[usize::from(grm.start_rule_idx())].set(usize::from(grm.eof_token_idx()), true);

        let firsts = grm.firsts();
        loop {
            let mut changed = false;
            for pidx in grm.iter_pidxs() {
                let ridx = grm.prod_to_rule(pidx);
                let prod = grm.prod(pidx);
                // Walk the production right to left, keeping the first set of the suffix to the
                // right of the current symbol in `suffix`. While that suffix can derive the empty
                // string, nonterminals also inherit the production's rule's Follow set.
                let mut suffix = Vob::from_elem(false, usize::from(grm.tokens_len()));
                let mut epsilon = true;
                for sym in prod.iter().rev() {
                    match *sym {
                        Symbol::Token(tidx) => {
                            suffix = Vob::from_elem(false, usize::from(grm.tokens_len()));
                            suffix.set(usize::from(tidx), true);
                            epsilon = false;
                        }
                        Symbol::Rule(s_ridx) => {
                            if follows[usize::from(s_ridx)].or(&suffix) {
                                changed = true;
                            }
                            if epsilon && s_ridx != ridx {
                                let rule_follows = follows[usize::from(ridx)].clone();
                                if follows[usize::from(s_ridx)].or(&rule_follows) {
                                    changed = true;
                                }
                            }
                            if firsts.is_epsilon_set(s_ridx) {
                                suffix.or(firsts.firsts(s_ridx));
                            } else {
                                suffix = firsts.firsts(s_ridx).clone();
                                epsilon = false;
                            }
                        }
                    }
                }
            }
            if !changed {
                return Follows {
                    follows,
                    phantom: PhantomData,
                };
            }
        }
    }

    /// Return the Follows `Vob` for rule `ridx`.
    pub fn follows(&self, ridx: RIdx<StorageT>) -> &Vob {
        &self.follows[usize::from(ridx)]
    }

    /// Returns true if the token `tidx` is in the follow set for rule `ridx`.
    pub fn is_set(&self, ridx: RIdx<StorageT>, tidx: TIdx<StorageT>) -> bool {
        self.follows[usize::from(ridx)][usize::from(tidx)]
    }
}
