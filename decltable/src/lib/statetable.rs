use std::{error::Error, fmt, hash::Hash, marker::PhantomData};

use declgrammar::{AssocKind, CfGrammar, PIdx, RIdx, Symbol, TIdx};
use log::warn;
use num_traits::{AsPrimitive, PrimInt, Unsigned};
use packedvec::PackedVec;
use vob::{IterSetBits, Vob};

use crate::{stategraph::StateGraph, StIdx, StIdxStorageT};

/// The kinds of conflict which can't be resolved when building a [StateTable].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateTableErrorKind<StorageT> {
    /// A shift/reduce conflict between a token and a production at the same precedence level
    /// whose associativity is `nonassoc`.
    UnresolvableConflict(TIdx<StorageT>),
}

/// Any error from building a [StateTable] returns an instance of this struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTableError<StorageT> {
    pub kind: StateTableErrorKind<StorageT>,
    /// The production involved in the conflict.
    pub pidx: PIdx<StorageT>,
    /// The state in which the conflict arose.
    pub stidx: StIdx,
}

impl<StorageT: fmt::Debug> Error for StateTableError<StorageT> {}

impl<StorageT> fmt::Display for StateTableError<StorageT> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self.kind {
            StateTableErrorKind::UnresolvableConflict(_) => {
                "Shift/reduce conflict between nonassociative operators"
            }
        };
        write!(f, "{} in state {}", s, self.stidx)
    }
}

/// The conflicts resolved by default while building a [StateTable]: shift/reduce conflicts
/// where the token or the production lacks a precedence (resolved as a shift) and
/// reduce/reduce conflicts (resolved in favour of the earlier production).
#[derive(Debug)]
pub struct Conflicts<StorageT> {
    /// `(token, production, state)`.
    shift_reduce: Vec<(TIdx<StorageT>, PIdx<StorageT>, StIdx)>,
    /// `(kept production, discarded production, state)`.
    reduce_reduce: Vec<(PIdx<StorageT>, PIdx<StorageT>, StIdx)>,
}

impl<StorageT: 'static + Hash + PrimInt + Unsigned> Conflicts<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Return an iterator over all shift/reduce conflicts.
    pub fn sr_conflicts(&self) -> impl Iterator<Item = &(TIdx<StorageT>, PIdx<StorageT>, StIdx)> {
        self.shift_reduce.iter()
    }

    /// Return an iterator over all reduce/reduce conflicts.
    pub fn rr_conflicts(&self) -> impl Iterator<Item = &(PIdx<StorageT>, PIdx<StorageT>, StIdx)> {
        self.reduce_reduce.iter()
    }

    /// How many shift/reduce conflicts are there?
    pub fn sr_len(&self) -> usize {
        self.shift_reduce.len()
    }

    /// How many reduce/reduce conflicts are there?
    pub fn rr_len(&self) -> usize {
        self.reduce_reduce.len()
    }

    /// Returns a pretty-printed version of the shift/reduce conflicts.
    pub fn pp_sr(&self, grm: &CfGrammar<StorageT>) -> String {
        self.sr_conflicts()
            .map(|(tidx, pidx, stidx)| {
                format!(
                    "Shift/Reduce conflict in state {}:\n   Shift: {}\n   Reduce: {}\n",
                    stidx,
                    grm.token_name(*tidx).unwrap_or("$end"),
                    grm.pp_prod(*pidx)
                )
            })
            .collect()
    }

    /// Returns a pretty-printed version of the reduce/reduce conflicts.
    pub fn pp_rr(&self, grm: &CfGrammar<StorageT>) -> String {
        self.rr_conflicts()
            .map(|(pidx, r_pidx, stidx)| {
                format!(
                    "Reduce/Reduce conflict in state {}:\n   Reduce: {}\n   Reduce: {}\n",
                    stidx,
                    grm.pp_prod(*pidx),
                    grm.pp_prod(*r_pidx)
                )
            })
            .collect()
    }

    /// Returns a pretty-printed version of all conflicts.
    pub fn pp(&self, grm: &CfGrammar<StorageT>) -> String {
        let mut s = String::new();
        if self.sr_len() > 0 {
            s.push_str(&format!("{} Shift/Reduce\n", self.sr_len()));
            s.push_str(&self.pp_sr(grm));
        }
        if self.rr_len() > 0 {
            s.push_str(&format!("{} Reduce/Reduce\n", self.rr_len()));
            s.push_str(&self.pp_rr(grm));
        }
        s
    }
}

/// A representation of a `StateTable` for a grammar. `actions` and `gotos` are split into two
/// separate tables due to the different types of their values.
#[derive(Debug)]
pub struct StateTable<StorageT> {
    // We use the normal statetable representation where rows represent states and columns
    // represent tokens. Each action is encoded as a usize (see `encode`) so that the table can
    // be stored in a `PackedVec`.
    actions: PackedVec<usize>,
    /// The cells of `actions` which are not `Error`.
    state_actions: Vob,
    gotos: Vec<Option<StIdx>>,
    rules_len: RIdx<StorageT>,
    tokens_len: TIdx<StorageT>,
    start_state: StIdx,
    final_state: StIdx,
    conflicts: Conflicts<StorageT>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action<StorageT> {
    /// Shift to state X in the statetable.
    Shift(StIdx),
    /// Reduce production X in the grammar.
    Reduce(PIdx<StorageT>),
    /// Accept this input.
    Accept,
    /// No valid action.
    Error,
}

const SHIFT: usize = 1;
const REDUCE: usize = 2;
const ACCEPT: usize = 3;
const ERROR: usize = 0;

impl<StorageT: 'static + Hash + PrimInt + Unsigned> StateTable<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Build the SLR(1) table for `grm` from the state graph `sg`.
    ///
    /// Complete items `A -> α •` reduce on every token in FOLLOW(A); `^ -> S •` accepts on the
    /// end token. Conflicts are resolved as follows:
    ///
    ///   * shift/reduce: if the token and the production both have a precedence, the higher
    ///     level wins. At equal levels, `left` reduces, `right` shifts and `nonassoc` is an
    ///     [UnresolvableConflict](enum.StateTableErrorKind.html#variant.UnresolvableConflict).
    ///     Otherwise the shift wins and the conflict is recorded.
    ///   * reduce/reduce: the earlier production wins and the conflict is recorded.
    ///   * accept/reduce: accepting is treated as shifting the end token, which has no
    ///     precedence, so the accept wins and the conflict is recorded as a shift/reduce
    ///     conflict.
    pub fn new(
        grm: &CfGrammar<StorageT>,
        sg: &StateGraph<StorageT>,
    ) -> Result<Self, StateTableError<StorageT>> {
        let states_len = usize::from(sg.all_states_len());
        let tokens_len = usize::from(grm.tokens_len());
        let rules_len = usize::from(grm.rules_len());
        let maxa = states_len
            .checked_mul(tokens_len)
            .expect("State table too large");
        let maxg = states_len
            .checked_mul(rules_len)
            .expect("Goto table too large");
        // We only have usize-2 bits to store state IDs and production indexes.
        assert!(states_len < usize::MAX >> 2);
        assert!(usize::from(grm.prods_len()) < usize::MAX >> 2);
        let mut actions = vec![ERROR; maxa];
        let mut gotos = vec![None; maxg];
        let mut conflicts = Conflicts {
            shift_reduce: Vec::new(),
            reduce_reduce: Vec::new(),
        };
        let mut final_state = None;
        let follows = grm.follows();

        for stidx in sg.iter_stidxs() {
            // Populate reduces.
            let mut accepts = false;
            for pidx in sg.closed_state(stidx).complete_items(grm) {
                if pidx == grm.start_prod() {
                    accepts = true;
                    continue;
                }
                let ridx = grm.prod_to_rule(pidx);
                for tidx in follows.follows(ridx).iter_set_bits(..) {
                    // Since the follows set is exactly tokens_len bits long, the call to as_ is
                    // safe.
                    let off = actions_offset(grm.tokens_len(), stidx, TIdx(tidx.as_()));
                    match StateTable::decode(actions[off]) {
                        Action::Error => {
                            actions[off] = StateTable::encode(Action::Reduce(pidx));
                        }
                        Action::Reduce(r_pidx) => {
                            if r_pidx == pidx {
                                continue;
                            }
                            // Resolved in favour of the earlier production in the grammar.
                            let (keep, discard) = if pidx < r_pidx {
                                (pidx, r_pidx)
                            } else {
                                (r_pidx, pidx)
                            };
                            actions[off] = StateTable::encode(Action::Reduce(keep));
                            warn!(
                                "Reduce/reduce conflict in state {} on {}: reducing {} rather than {}",
                                stidx,
                                grm.token_name(TIdx(tidx.as_())).unwrap_or("$end"),
                                grm.pp_prod(keep),
                                grm.pp_prod(discard)
                            );
                            if !conflicts
                                .reduce_reduce
                                .contains(&(keep, discard, stidx))
                            {
                                conflicts.reduce_reduce.push((keep, discard, stidx));
                            }
                        }
                        Action::Accept | Action::Shift(_) => panic!("Internal error"),
                    }
                }
            }

            // `^ -> S •` accepts on the end token, as if it were shifted.
            if accepts {
                let eof_tidx = grm.eof_token_idx();
                let off = actions_offset(grm.tokens_len(), stidx, eof_tidx);
                let action = match StateTable::decode(actions[off]) {
                    Action::Error => Action::Accept,
                    Action::Reduce(r_pidx) => resolve_shift_reduce(
                        grm,
                        &mut conflicts,
                        stidx,
                        eof_tidx,
                        r_pidx,
                        Action::Accept,
                    )?,
                    Action::Accept | Action::Shift(_) => panic!("Internal error"),
                };
                if action == Action::Accept {
                    final_state = Some(stidx);
                }
                actions[off] = StateTable::encode(action);
            }

            // Populate shifts, checking each against any reduce already in its cell.
            for s_tidx in grm.iter_tidxs() {
                let ref_stidx = match sg.edge(stidx, Symbol::Token(s_tidx)) {
                    Some(x) => x,
                    None => continue,
                };
                let off = actions_offset(grm.tokens_len(), stidx, s_tidx);
                match StateTable::decode(actions[off]) {
                    Action::Error => {
                        actions[off] = StateTable::encode(Action::Shift(ref_stidx));
                    }
                    Action::Reduce(r_pidx) => {
                        let action = resolve_shift_reduce(
                            grm,
                            &mut conflicts,
                            stidx,
                            s_tidx,
                            r_pidx,
                            Action::Shift(ref_stidx),
                        )?;
                        actions[off] = StateTable::encode(action);
                    }
                    // The end token never appears in a production, so can't be shifted.
                    Action::Accept | Action::Shift(_) => panic!("Internal error"),
                }
            }

            // Populate gotos.
            for ridx in grm.iter_rules() {
                if let Some(ref_stidx) = sg.edge(stidx, Symbol::Rule(ridx)) {
                    gotos[usize::from(stidx) * rules_len + usize::from(ridx)] = Some(ref_stidx);
                }
            }
        }
        assert!(final_state.is_some());

        let mut state_actions = Vob::from_elem(false, maxa);
        for (off, &a) in actions.iter().enumerate() {
            if a != ERROR {
                state_actions.set(off, true);
            }
        }

        Ok(StateTable {
            actions: PackedVec::<usize, usize>::new(actions),
            state_actions,
            gotos,
            rules_len: grm.rules_len(),
            tokens_len: grm.tokens_len(),
            start_state: sg.start_state(),
            final_state: final_state.unwrap(),
            conflicts,
        })
    }

    fn decode(bits: usize) -> Action<StorageT> {
        let action = bits & 0b11;
        let val = bits >> 2;

        match action {
            SHIFT => {
                // Since val was originally stored in an StIdxStorageT, we know that it's safe to
                // cast it back to an StIdxStorageT here.
                Action::Shift(StIdx::from(val as StIdxStorageT))
            }
            REDUCE => Action::Reduce(PIdx(val.as_())),
            ACCEPT => Action::Accept,
            ERROR => Action::Error,
            _ => unreachable!(),
        }
    }

    fn encode(action: Action<StorageT>) -> usize {
        match action {
            Action::Shift(stidx) => SHIFT | (usize::from(stidx) << 2),
            Action::Reduce(pidx) => REDUCE | (usize::from(pidx) << 2),
            Action::Accept => ACCEPT,
            Action::Error => ERROR,
        }
    }

    /// Return the action for `stidx` and `tidx`.
    pub fn action(&self, stidx: StIdx, tidx: TIdx<StorageT>) -> Action<StorageT> {
        let off = actions_offset(self.tokens_len, stidx, tidx);
        match self.actions.get(off) {
            Some(bits) => StateTable::decode(bits),
            None => Action::Error,
        }
    }

    /// Return an iterator over the indexes of all non-error actions of `stidx`, i.e. the tokens
    /// which are valid in that state.
    pub fn state_actions(&self, stidx: StIdx) -> StateActionsIterator<StorageT> {
        let start = usize::from(stidx) * usize::from(self.tokens_len);
        let end = start + usize::from(self.tokens_len);
        StateActionsIterator {
            iter: self.state_actions.iter_set_bits(start..end),
            start,
            phantom: PhantomData,
        }
    }

    /// Return the goto state for `stidx` and `ridx`, or `None` if there isn't any.
    pub fn goto(&self, stidx: StIdx, ridx: RIdx<StorageT>) -> Option<StIdx> {
        let off = usize::from(stidx) * usize::from(self.rules_len) + usize::from(ridx);
        self.gotos.get(off).cloned().flatten()
    }

    /// Return this state table's start state.
    pub fn start_state(&self) -> StIdx {
        self.start_state
    }

    /// Return the state which accepts on the end token.
    pub fn final_state(&self) -> StIdx {
        self.final_state
    }

    /// Return the conflicts resolved by default while building this table.
    pub fn conflicts(&self) -> &Conflicts<StorageT> {
        &self.conflicts
    }

    /// How many states does this table have?
    pub fn states_len(&self) -> StIdx {
        StIdx::from(self.state_actions.len() / usize::from(self.tokens_len))
    }
}

fn actions_offset<StorageT: PrimInt + Unsigned>(
    tokens_len: TIdx<StorageT>,
    stidx: StIdx,
    tidx: TIdx<StorageT>,
) -> usize {
    usize::from(stidx) * usize::from(tokens_len) + usize::from(tidx)
}

pub struct StateActionsIterator<'a, StorageT> {
    iter: IterSetBits<'a, usize>,
    start: usize,
    phantom: PhantomData<StorageT>,
}

impl<'a, StorageT: 'static + PrimInt + Unsigned> Iterator for StateActionsIterator<'a, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    type Item = TIdx<StorageT>;

    fn next(&mut self) -> Option<TIdx<StorageT>> {
        // Since self.iter's IterSetBits range is exactly tokens_len long, by definition `i -
        // self.start` fits into StorageT and thus the as_ call here is safe.
        self.iter.next().map(|i| TIdx((i - self.start).as_()))
    }
}

/// Decide between shifting `tidx` (with the action `shift`, which is either a `Shift` or, for the
/// end token, an `Accept`) and reducing `pidx` in state `in_stidx`.
fn resolve_shift_reduce<StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &CfGrammar<StorageT>,
    conflicts: &mut Conflicts<StorageT>,
    in_stidx: StIdx,
    tidx: TIdx<StorageT>,
    pidx: PIdx<StorageT>,
    shift: Action<StorageT>,
) -> Result<Action<StorageT>, StateTableError<StorageT>>
where
    usize: AsPrimitive<StorageT>,
{
    match (grm.token_precedence(tidx), grm.prod_precedence(pidx)) {
        (Some(token_prec), Some(prod_prec)) => {
            if token_prec.level > prod_prec.level {
                Ok(shift)
            } else if token_prec.level < prod_prec.level {
                Ok(Action::Reduce(pidx))
            } else {
                // All tokens at one level share its associativity.
                match token_prec.kind {
                    AssocKind::Left => Ok(Action::Reduce(pidx)),
                    AssocKind::Right => Ok(shift),
                    AssocKind::Nonassoc => Err(StateTableError {
                        kind: StateTableErrorKind::UnresolvableConflict(tidx),
                        pidx,
                        stidx: in_stidx,
                    }),
                }
            }
        }
        _ => {
            // If the token and production don't both have precedences, we use Yacc's default
            // resolution, which is in favour of the shift.
            warn!(
                "Shift/reduce conflict in state {}: shifting {} rather than reducing {}",
                in_stidx,
                grm.token_name(tidx).unwrap_or("$end"),
                grm.pp_prod(pidx)
            );
            conflicts.shift_reduce.push((tidx, pidx, in_stidx));
            Ok(shift)
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use declgrammar::{CfGrammar, GrammarBuilder, Symbol};

    use super::{Action, StateTable, StateTableError, StateTableErrorKind};
    use crate::{from_grammar, stategraph::StateGraph, StIdx};

    type Builder = GrammarBuilder<(), ()>;

    fn cfg(b: Builder) -> CfGrammar {
        CfGrammar::new(&b.build()).unwrap()
    }

    fn prod(grm: &CfGrammar, rule: &str, off: usize) -> declgrammar::PIdx<u32> {
        grm.rule_to_prods(grm.rule_idx(rule).unwrap())[off]
    }

    #[test]
    #[rustfmt::skip]
    fn test_statetable() {
        // Taken from p19 of www.cs.umd.edu/~mvz/cmsc430-s07/M10lr.pdf
        let grm = cfg(Builder::new()
            .token("ID", "[a-z]+")
            .literals("-*")
            .production("Expr : Term '-' Expr | Term")
            .production("Term : Factor '*' Term | Factor")
            .production("Factor : ID"));
        let sg = StateGraph::new(&grm);
        assert_eq!(sg.all_states_len(), StIdx::from(9usize));

        let s0 = StIdx::from(0usize);
        let s1 = sg.edge(s0, Symbol::Rule(grm.rule_idx("Expr").unwrap())).unwrap();
        let s2 = sg.edge(s0, Symbol::Rule(grm.rule_idx("Term").unwrap())).unwrap();
        let s3 = sg.edge(s0, Symbol::Rule(grm.rule_idx("Factor").unwrap())).unwrap();
        let s4 = sg.edge(s0, Symbol::Token(grm.token_idx("ID").unwrap())).unwrap();
        let s5 = sg.edge(s2, Symbol::Token(grm.token_idx("-").unwrap())).unwrap();
        let s6 = sg.edge(s3, Symbol::Token(grm.token_idx("*").unwrap())).unwrap();
        let s7 = sg.edge(s5, Symbol::Rule(grm.rule_idx("Expr").unwrap())).unwrap();
        let s8 = sg.edge(s6, Symbol::Rule(grm.rule_idx("Term").unwrap())).unwrap();

        let st = StateTable::new(&grm, &sg).unwrap();

        // Actions
        assert_eq!(st.actions.len(), 9 * 4);
        assert_eq!(st.states_len(), StIdx::from(9usize));
        let assert_reduce = |stidx: StIdx, tn: Option<&str>, rule: &str, prod_off: usize| {
            let tidx = match tn {
                Some(n) => grm.token_idx(n).unwrap(),
                None => grm.eof_token_idx(),
            };
            assert_eq!(st.action(stidx, tidx), Action::Reduce(prod(&grm, rule, prod_off)));
        };

        assert_eq!(st.action(s0, grm.token_idx("ID").unwrap()), Action::Shift(s4));
        assert_eq!(st.action(s1, grm.eof_token_idx()), Action::Accept);
        assert_eq!(st.final_state(), s1);
        assert_eq!(st.start_state(), s0);
        assert_eq!(st.action(s2, grm.token_idx("-").unwrap()), Action::Shift(s5));
        assert_reduce(s2, None, "Expr", 1);
        assert_reduce(s3, Some("-"), "Term", 1);
        assert_eq!(st.action(s3, grm.token_idx("*").unwrap()), Action::Shift(s6));
        assert_reduce(s3, None, "Term", 1);
        assert_reduce(s4, Some("-"), "Factor", 0);
        assert_reduce(s4, Some("*"), "Factor", 0);
        assert_reduce(s4, None, "Factor", 0);
        assert_eq!(st.action(s5, grm.token_idx("ID").unwrap()), Action::Shift(s4));
        assert_eq!(st.action(s6, grm.token_idx("ID").unwrap()), Action::Shift(s4));
        assert_reduce(s7, None, "Expr", 0);
        assert_reduce(s8, Some("-"), "Term", 0);
        assert_reduce(s8, None, "Term", 0);
        assert_eq!(st.action(s8, grm.token_idx("*").unwrap()), Action::Error);

        let s4_actions = [grm.token_idx("-").unwrap(), grm.token_idx("*").unwrap(), grm.eof_token_idx()]
            .iter()
            .cloned()
            .collect::<HashSet<_>>();
        assert_eq!(st.state_actions(s4).collect::<HashSet<_>>(), s4_actions);

        // Gotos
        assert_eq!(st.gotos.len(), 9 * 4);
        assert_eq!(st.goto(s0, grm.rule_idx("Expr").unwrap()).unwrap(), s1);
        assert_eq!(st.goto(s0, grm.rule_idx("Term").unwrap()).unwrap(), s2);
        assert_eq!(st.goto(s0, grm.rule_idx("Factor").unwrap()).unwrap(), s3);
        assert_eq!(st.goto(s5, grm.rule_idx("Expr").unwrap()).unwrap(), s7);
        assert_eq!(st.goto(s5, grm.rule_idx("Term").unwrap()).unwrap(), s2);
        assert_eq!(st.goto(s5, grm.rule_idx("Factor").unwrap()).unwrap(), s3);
        assert_eq!(st.goto(s6, grm.rule_idx("Term").unwrap()).unwrap(), s8);
        assert_eq!(st.goto(s6, grm.rule_idx("Factor").unwrap()).unwrap(), s3);
        assert_eq!(st.goto(s1, grm.rule_idx("Term").unwrap()), None);
        assert_eq!(st.conflicts().sr_len() + st.conflicts().rr_len(), 0);
    }

    #[test]
    fn test_determinism() {
        // Every non-error cell must be justified by exactly one edge or complete item.
        let grm = cfg(Builder::new()
            .token("ID", "[a-z]+")
            .literals("+*()")
            .left(&["+"])
            .left(&["*"])
            .production("E : E '+' E | E '*' E | '(' E ')' | ID"));
        let (sg, st) = from_grammar(&grm).unwrap();
        let follows = grm.follows();
        for stidx in sg.iter_stidxs() {
            for tidx in grm.iter_tidxs() {
                let shift = sg.edge(stidx, Symbol::Token(tidx));
                let reduces = sg
                    .closed_state(stidx)
                    .complete_items(&grm)
                    .filter(|&pidx| {
                        pidx != grm.start_prod() && follows.is_set(grm.prod_to_rule(pidx), tidx)
                    })
                    .collect::<Vec<_>>();
                match st.action(stidx, tidx) {
                    Action::Shift(x) => assert_eq!(Some(x), shift),
                    Action::Reduce(pidx) => assert!(reduces.contains(&pidx)),
                    Action::Accept => {
                        assert_eq!(stidx, st.final_state());
                        assert_eq!(tidx, grm.eof_token_idx());
                    }
                    Action::Error => {
                        assert!(shift.is_none());
                        assert!(reduces.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_default_reduce_reduce() {
        let grm = cfg(Builder::new()
            .literals("ax")
            .production("A : B 'x' | C 'x' 'x'")
            .production("B : 'a'")
            .production("C : 'a'"));
        let (sg, st) = from_grammar(&grm).unwrap();

        let s0 = StIdx::from(0usize);
        let s4 = sg
            .edge(s0, Symbol::Token(grm.token_idx("a").unwrap()))
            .unwrap();
        assert_eq!(
            st.action(s4, grm.token_idx("x").unwrap()),
            Action::Reduce(prod(&grm, "B", 0))
        );
        assert_eq!(st.conflicts().rr_len(), 1);
        assert_eq!(
            st.conflicts().rr_conflicts().next(),
            Some(&(prod(&grm, "B", 0), prod(&grm, "C", 0), s4))
        );
        assert_eq!(
            st.conflicts().pp(&grm),
            format!(
                "1 Reduce/Reduce\nReduce/Reduce conflict in state {}:\n   Reduce: B: \"a\"\n   Reduce: C: \"a\"\n",
                s4
            )
        );
    }

    #[test]
    fn test_default_shift_reduce() {
        let grm = cfg(Builder::new()
            .literals("+*i")
            .production("Expr : Expr '+' Expr | Expr '*' Expr | 'i'"));
        let (sg, st) = from_grammar(&grm).unwrap();

        let s0 = StIdx::from(0usize);
        let s1 = sg.edge(s0, Symbol::Rule(grm.rule_idx("Expr").unwrap())).unwrap();
        let s3 = sg.edge(s1, Symbol::Token(grm.token_idx("+").unwrap())).unwrap();
        let s4 = sg.edge(s1, Symbol::Token(grm.token_idx("*").unwrap())).unwrap();
        let s5 = sg.edge(s4, Symbol::Rule(grm.rule_idx("Expr").unwrap())).unwrap();
        let s6 = sg.edge(s3, Symbol::Rule(grm.rule_idx("Expr").unwrap())).unwrap();

        let plus = grm.token_idx("+").unwrap();
        let times = grm.token_idx("*").unwrap();
        assert_eq!(st.action(s5, plus), Action::Shift(s3));
        assert_eq!(st.action(s5, times), Action::Shift(s4));
        assert_eq!(st.action(s6, plus), Action::Shift(s3));
        assert_eq!(st.action(s6, times), Action::Shift(s4));
        // The end token has no shift, so reducing is the only option.
        assert_eq!(
            st.action(s6, grm.eof_token_idx()),
            Action::Reduce(prod(&grm, "Expr", 0))
        );
        assert_eq!(st.conflicts().sr_len(), 4);
        assert_eq!(st.conflicts().rr_len(), 0);
        assert!(st
            .conflicts()
            .sr_conflicts()
            .any(|&c| c == (times, prod(&grm, "Expr", 0), s6)));
    }

    #[test]
    fn test_precedence() {
        let grm = cfg(Builder::new()
            .literals("+*i")
            .left(&["+"])
            .left(&["*"])
            .production("Expr : Expr '+' Expr | Expr '*' Expr | 'i'"));
        let (sg, st) = from_grammar(&grm).unwrap();

        let s0 = StIdx::from(0usize);
        let s1 = sg.edge(s0, Symbol::Rule(grm.rule_idx("Expr").unwrap())).unwrap();
        let s3 = sg.edge(s1, Symbol::Token(grm.token_idx("+").unwrap())).unwrap();
        let s4 = sg.edge(s1, Symbol::Token(grm.token_idx("*").unwrap())).unwrap();
        let s5 = sg.edge(s4, Symbol::Rule(grm.rule_idx("Expr").unwrap())).unwrap();
        let s6 = sg.edge(s3, Symbol::Rule(grm.rule_idx("Expr").unwrap())).unwrap();

        let plus = grm.token_idx("+").unwrap();
        let times = grm.token_idx("*").unwrap();
        // `e * e . +` and `e * e . *`: multiplication binds tighter / is left associative.
        assert_eq!(st.action(s5, plus), Action::Reduce(prod(&grm, "Expr", 1)));
        assert_eq!(st.action(s5, times), Action::Reduce(prod(&grm, "Expr", 1)));
        // `e + e . +` is left associative; `e + e . *` shifts the tighter operator.
        assert_eq!(st.action(s6, plus), Action::Reduce(prod(&grm, "Expr", 0)));
        assert_eq!(st.action(s6, times), Action::Shift(s4));
        assert_eq!(st.conflicts().sr_len(), 0);
    }

    #[test]
    fn test_right_assoc_and_prec() {
        let grm = cfg(Builder::new()
            .literals("#-i")
            .left(&["-"])
            .right(&["#"])
            .right(&["UMINUS"])
            .production("E : E '#' E | E '-' E | '-' E %prec UMINUS | 'i'"));
        let (sg, st) = from_grammar(&grm).unwrap();

        let s0 = StIdx::from(0usize);
        let s1 = sg.edge(s0, Symbol::Rule(grm.rule_idx("E").unwrap())).unwrap();
        let pow = grm.token_idx("#").unwrap();
        let minus = grm.token_idx("-").unwrap();
        let s_pow = sg.edge(s1, Symbol::Token(pow)).unwrap();
        let s_pow_e = sg.edge(s_pow, Symbol::Rule(grm.rule_idx("E").unwrap())).unwrap();
        assert_eq!(st.action(s_pow_e, pow), Action::Shift(s_pow));
        assert_eq!(st.action(s_pow_e, minus), Action::Reduce(prod(&grm, "E", 0)));

        let s_neg = sg.edge(s0, Symbol::Token(minus)).unwrap();
        let s_neg_e = sg.edge(s_neg, Symbol::Rule(grm.rule_idx("E").unwrap())).unwrap();
        assert_eq!(st.action(s_neg_e, minus), Action::Reduce(prod(&grm, "E", 2)));
        assert_eq!(st.action(s_neg_e, pow), Action::Reduce(prod(&grm, "E", 2)));
        assert_eq!(st.conflicts().sr_len(), 0);
    }

    #[test]
    fn test_nonassoc() {
        let grm = cfg(Builder::new()
            .literals("<i")
            .nonassoc(&["<"])
            .production("E : E '<' E | 'i'"));
        match from_grammar(&grm) {
            Err(StateTableError {
                kind: StateTableErrorKind::UnresolvableConflict(tidx),
                pidx,
                ..
            }) => {
                assert_eq!(tidx, grm.token_idx("<").unwrap());
                assert_eq!(pidx, prod(&grm, "E", 0));
            }
            _ => panic!("Nonassociative conflict not detected"),
        }
    }

    #[test]
    fn test_epsilon_reduce() {
        let grm = cfg(Builder::new()
            .literals("ab")
            .production("S : A 'b'")
            .production("A : 'a' |"));
        let (_, st) = from_grammar(&grm).unwrap();
        let s0 = st.start_state();
        assert_eq!(
            st.action(s0, grm.token_idx("b").unwrap()),
            Action::Reduce(prod(&grm, "A", 1))
        );
        assert!(matches!(
            st.action(s0, grm.token_idx("a").unwrap()),
            Action::Shift(_)
        ));
        assert_eq!(st.action(s0, grm.eof_token_idx()), Action::Error);
    }

    #[test]
    fn test_accept_reduce() {
        let grm = cfg(Builder::new()
            .literals("ax")
            .production("S : S A | 'x'")
            .production("A : 'a' |"));
        let (sg, st) = from_grammar(&grm).unwrap();
        let s1 = sg
            .edge(st.start_state(), Symbol::Rule(grm.rule_idx("S").unwrap()))
            .unwrap();
        let eof = grm.eof_token_idx();
        assert_eq!(st.action(s1, eof), Action::Accept);
        assert_eq!(st.final_state(), s1);
        assert!(st
            .conflicts()
            .sr_conflicts()
            .any(|&c| c == (eof, prod(&grm, "A", 1), s1)));
        assert!(st
            .conflicts()
            .pp_sr(&grm)
            .contains("   Shift: $end\n   Reduce: A:\n"));
    }

    #[test]
    fn test_follow_clashes_with_accept() {
        // FOLLOW(A) contains the end token only because of `S : 'w' A`; in the accepting state
        // `A` is always followed by 'b'.
        let grm = cfg(Builder::new()
            .literals("abwx")
            .production("S : S A 'b' | 'x' | 'w' A")
            .production("A : | 'a'"));
        let (sg, st) = from_grammar(&grm).unwrap();
        let s0 = st.start_state();
        let s1 = sg.edge(s0, Symbol::Rule(grm.rule_idx("S").unwrap())).unwrap();
        let eof = grm.eof_token_idx();
        let a = grm.token_idx("a").unwrap();
        let b = grm.token_idx("b").unwrap();
        assert_eq!(st.final_state(), s1);
        assert_eq!(st.action(s1, eof), Action::Accept);
        assert_eq!(st.action(s1, b), Action::Reduce(prod(&grm, "A", 0)));
        assert!(matches!(st.action(s1, a), Action::Shift(_)));

        let s_w = sg.edge(s0, Symbol::Token(grm.token_idx("w").unwrap())).unwrap();
        assert_eq!(st.action(s_w, eof), Action::Reduce(prod(&grm, "A", 0)));
        // The clash with the accept plus `'a'` against the empty `A` in both states.
        assert_eq!(st.conflicts().sr_len(), 3);
        assert_eq!(st.conflicts().rr_len(), 0);
    }
}
