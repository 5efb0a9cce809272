use std::{collections::VecDeque, hash::Hash};

use declgrammar::{CfGrammar, SIdx, Symbol};
use fnv::FnvHashMap;
use num_traits::{AsPrimitive, PrimInt, Unsigned};

use crate::{itemset::Itemset, StIdx, StIdxStorageT};

/// The canonical collection of LR(0) item sets for a grammar, and the edges between them.
#[derive(Debug)]
pub struct StateGraph<StorageT: Eq + Hash> {
    /// A vector of `(core_states, closed_states)` tuples.
    states: Vec<(Itemset<StorageT>, Itemset<StorageT>)>,
    start_state: StIdx,
    /// For each state in `states`, edges is a hashmap from symbols to state offsets.
    edges: Vec<FnvHashMap<Symbol<StorageT>, StIdx>>,
}

impl<StorageT: 'static + Hash + PrimInt + Unsigned> StateGraph<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Build the state graph for `grm` breadth-first from the closure of `{^ -> • S}`. Each
    /// distinct kernel becomes one state; states are numbered in the order they are discovered,
    /// so the start state is always state 0.
    pub fn new(grm: &CfGrammar<StorageT>) -> Self {
        let mut start = Itemset::new();
        start.add(grm.start_prod(), SIdx(0usize.as_()));
        let start_state = StIdx::from(0usize);

        let mut kernels = FnvHashMap::<Itemset<StorageT>, StIdx>::default();
        kernels.insert(start.clone(), start_state);
        let closed = start.close(grm);
        let mut states = vec![(start, closed)];
        let mut edges = Vec::new();

        let mut todo = VecDeque::new();
        todo.push_back(start_state);
        while let Some(stidx) = todo.pop_front() {
            // Edges are followed in the order their symbols first appear in the closed state.
            let mut syms = Vec::new();
            for &(pidx, dot) in &states[usize::from(stidx)].1.items {
                if let Some(sym) = Itemset::next_sym(grm, pidx, dot) {
                    if !syms.contains(&sym) {
                        syms.push(sym);
                    }
                }
            }
            let mut st_edges = FnvHashMap::default();
            for sym in syms {
                let kernel = states[usize::from(stidx)].1.goto(grm, &sym);
                let dest = match kernels.get(&kernel) {
                    Some(&dest) => dest,
                    None => {
                        let dest = StIdx::from(states.len());
                        let closed = kernel.close(grm);
                        kernels.insert(kernel.clone(), dest);
                        states.push((kernel, closed));
                        todo.push_back(dest);
                        dest
                    }
                };
                st_edges.insert(sym, dest);
            }
            // States are popped in creation order, so this is the entry for `stidx`.
            debug_assert_eq!(edges.len(), usize::from(stidx));
            edges.push(st_edges);
        }

        StateGraph {
            states,
            start_state,
            edges,
        }
    }

    /// Return this state graph's start state.
    pub fn start_state(&self) -> StIdx {
        self.start_state
    }

    /// Return an iterator which produces (in order from `0..self.all_states_len()`) all this
    /// graph's valid `StIdx`s.
    pub fn iter_stidxs(&self) -> impl Iterator<Item = StIdx> {
        (0..self.states.len()).map(StIdx::from)
    }

    /// Return the itemset for closed state `stidx`. Panics if `stidx` doesn't exist.
    pub fn closed_state(&self, stidx: StIdx) -> &Itemset<StorageT> {
        &self.states[usize::from(stidx)].1
    }

    /// Return an iterator over all closed states in this `StateGraph`.
    pub fn iter_closed_states(&self) -> impl Iterator<Item = &Itemset<StorageT>> {
        self.states.iter().map(|x| &x.1)
    }

    /// Return the itemset for core state `stidx`. Panics if `stidx` doesn't exist.
    pub fn core_state(&self, stidx: StIdx) -> &Itemset<StorageT> {
        &self.states[usize::from(stidx)].0
    }

    /// How many states does this `StateGraph` contain? NB: By definition the `StateGraph` contains
    /// the same number of core and closed states.
    pub fn all_states_len(&self) -> StIdx {
        StIdx::from(self.states.len())
    }

    /// Return the state pointed to by `sym` from `stidx` or `None` otherwise.
    pub fn edge(&self, stidx: StIdx, sym: Symbol<StorageT>) -> Option<StIdx> {
        self.edges
            .get(usize::from(stidx))
            .and_then(|x| x.get(&sym))
            .cloned()
    }

    /// Return the edges for state `stidx`. Panics if `stidx` doesn't exist.
    pub fn edges(&self, stidx: StIdx) -> &FnvHashMap<Symbol<StorageT>, StIdx> {
        &self.edges[usize::from(stidx)]
    }

    /// How many edges does this `StateGraph` contain?
    pub fn all_edges_len(&self) -> usize {
        self.edges.iter().fold(0, |a, x| a + x.len())
    }

    /// Pretty print this stategraph as a `String`. If `core_states` is set to true, only the core
    /// states are pretty printed; if set to false, all states (including non-core states) are
    /// pretty printed.
    pub fn pp(&self, grm: &CfGrammar<StorageT>, core_states: bool) -> String {
        fn num_digits(i: usize) -> usize {
            i.to_string().len()
        }

        fn fmt_sym<StorageT: 'static + PrimInt + Unsigned>(
            grm: &CfGrammar<StorageT>,
            sym: Symbol<StorageT>,
        ) -> String
        where
            usize: AsPrimitive<StorageT>,
        {
            match sym {
                Symbol::Rule(ridx) => grm.rule_name_str(ridx).to_string(),
                Symbol::Token(tidx) => format!("'{}'", grm.token_name(tidx).unwrap_or("$")),
            }
        }

        let width = num_digits(self.states.len());
        let mut o = String::new();
        for (stidx, (core_st, closed_st)) in self.iter_stidxs().zip(self.states.iter()) {
            if stidx != self.start_state {
                o.push('\n');
            }
            o.push_str(&format!(
                "{}:{}",
                StIdxStorageT::from(stidx),
                " ".repeat(width - num_digits(usize::from(stidx)))
            ));

            let st = if core_states { core_st } else { closed_st };
            for (i, &(pidx, sidx)) in st.items.iter().enumerate() {
                if i > 0 {
                    // Extra space to compensate for ":" printed above
                    o.push_str(&format!("\n {}", " ".repeat(width)));
                }
                o.push_str(&format!(
                    " [{} ->",
                    grm.rule_name_str(grm.prod_to_rule(pidx))
                ));
                for (i_sidx, i_ssym) in grm.prod(pidx).iter().enumerate() {
                    if i_sidx == usize::from(sidx) {
                        o.push_str(" .");
                    }
                    o.push_str(&format!(" {}", fmt_sym(grm, *i_ssym)));
                }
                if usize::from(sidx) == grm.prod(pidx).len() {
                    o.push_str(" .");
                }
                o.push(']');
            }
            let mut edges = self.edges(stidx).iter().collect::<Vec<_>>();
            edges.sort_by_key(|(_, e_stidx)| **e_stidx);
            for (esym, e_stidx) in edges {
                o.push_str(&format!(
                    "\n{}{} -> {}",
                    " ".repeat(width + 2),
                    fmt_sym(grm, *esym),
                    e_stidx
                ));
            }
        }
        o
    }

    /// Return a pretty printed version of the core states, and all edges.
    pub fn pp_core_states(&self, grm: &CfGrammar<StorageT>) -> String {
        self.pp(grm, true)
    }

    /// Return a pretty printed version of the closed states, and all edges.
    pub fn pp_closed_states(&self, grm: &CfGrammar<StorageT>) -> String {
        self.pp(grm, false)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::hash::Hash;

    use declgrammar::{CfGrammar, GrammarBuilder, SIdx, Symbol};
    use num_traits::{AsPrimitive, PrimInt, Unsigned};

    use super::StateGraph;
    use crate::{itemset::Itemset, StIdx};

    /// Panic unless the item for production `prod_off` of rule `rn` with the dot at `dot` is in
    /// `is`.
    pub(crate) fn item_exists<StorageT: 'static + Hash + PrimInt + Unsigned>(
        grm: &CfGrammar<StorageT>,
        is: &Itemset<StorageT>,
        rn: &str,
        prod_off: usize,
        dot: usize,
    ) where
        usize: AsPrimitive<StorageT>,
    {
        let pidx = grm.rule_to_prods(grm.rule_idx(rn).unwrap())[prod_off];
        if !is.items.contains(&(pidx, SIdx(dot.as_()))) {
            panic!(
                "Item with dot {} in production {} of {} not found",
                dot, prod_off, rn
            );
        }
    }

    fn brackets() -> CfGrammar {
        // Taken from p13 of https://link.springer.com/article/10.1007/s00236-010-0115-6
        CfGrammar::new(
            &GrammarBuilder::<(), ()>::new()
                .literals("()ab")
                .production("A : '(' A ')' | 'a' | 'b'")
                .build(),
        )
        .unwrap()
    }

    #[test]
    #[rustfmt::skip]
    fn test_stategraph() {
        let grm = brackets();
        let sg = StateGraph::new(&grm);
        assert_eq!(sg.all_states_len(), StIdx::from(7usize));
        assert_eq!(sg.states.iter().fold(0, |a, x| a + x.0.items.len()), 7);
        assert_eq!(sg.all_edges_len(), 9);

        let s0 = sg.start_state();
        assert_eq!(s0, StIdx::from(0usize));
        let s1 = sg.edge(s0, Symbol::Rule(grm.rule_idx("A").unwrap())).unwrap();
        item_exists(&grm, sg.core_state(s1), "^", 0, 1);
        let s2 = sg.edge(s0, Symbol::Token(grm.token_idx("a").unwrap())).unwrap();
        let s3 = sg.edge(s0, Symbol::Token(grm.token_idx("b").unwrap())).unwrap();
        let s5 = sg.edge(s0, Symbol::Token(grm.token_idx("(").unwrap())).unwrap();
        assert_eq!(s2, sg.edge(s5, Symbol::Token(grm.token_idx("a").unwrap())).unwrap());
        assert_eq!(s3, sg.edge(s5, Symbol::Token(grm.token_idx("b").unwrap())).unwrap());
        assert_eq!(s5, sg.edge(s5, Symbol::Token(grm.token_idx("(").unwrap())).unwrap());
        let s4 = sg.edge(s5, Symbol::Rule(grm.rule_idx("A").unwrap())).unwrap();
        let s6 = sg.edge(s4, Symbol::Token(grm.token_idx(")").unwrap())).unwrap();
        item_exists(&grm, sg.closed_state(s6), "A", 0, 3);
        assert!(sg.edge(s6, Symbol::Token(grm.token_idx(")").unwrap())).is_none());
        assert_eq!(sg.closed_state(s5).items.len(), 4);
        assert_eq!(sg.iter_closed_states().count(), 7);

        assert_eq!(sg.edges(s0).len(), 4);
        assert_eq!(sg.edges(s5).get(&Symbol::Rule(grm.rule_idx("A").unwrap())), Some(&s4));
        assert!(sg.edges(s6).is_empty());
        assert_eq!(sg.iter_stidxs().map(|x| sg.edges(x).len()).sum::<usize>(), sg.all_edges_len());
    }

    #[test]
    fn test_pp() {
        let grm = CfGrammar::new(
            &GrammarBuilder::<(), ()>::new()
                .literals("a")
                .production("S : 'a'")
                .build(),
        )
        .unwrap();
        let sg = StateGraph::new(&grm);
        assert_eq!(
            sg.pp_core_states(&grm),
            "0: [^ -> . S]\n   S -> 1\n   'a' -> 2\n1: [^ -> S .]\n2: [S -> 'a' .]"
        );
        assert_eq!(
            sg.pp_closed_states(&grm),
            "0: [^ -> . S]\n   [S -> . 'a']\n   S -> 1\n   'a' -> 2\n1: [^ -> S .]\n2: [S -> 'a' .]"
        );
    }
}
