use std::hash::Hash;

use declgrammar::{CfGrammar, PIdx, SIdx, Symbol};
use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

/// A set of LR(0) items `(production, dot)`. Items are kept in insertion order; the kernel of a
/// state created by [`goto`](#method.goto) is sorted so that equal kernels compare and hash
/// equally.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Itemset<StorageT> {
    pub items: Vec<(PIdx<StorageT>, SIdx<StorageT>)>,
}

impl<StorageT: 'static + Hash + PrimInt + Unsigned> Itemset<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Create a blank Itemset.
    pub fn new() -> Self {
        Itemset { items: Vec::new() }
    }

    /// Add an item `(pidx, dot)` to this itemset. Returns true if the item was not already
    /// present.
    pub fn add(&mut self, pidx: PIdx<StorageT>, dot: SIdx<StorageT>) -> bool {
        if self.items.contains(&(pidx, dot)) {
            false
        } else {
            self.items.push((pidx, dot));
            true
        }
    }

    /// The symbol after the dot of item `(pidx, dot)`, or `None` if the item is complete.
    pub fn next_sym(
        grm: &CfGrammar<StorageT>,
        pidx: PIdx<StorageT>,
        dot: SIdx<StorageT>,
    ) -> Option<Symbol<StorageT>> {
        grm.prod(pidx).get(usize::from(dot)).cloned()
    }

    /// Create a new itemset which is a closed version of `self`: whenever the dot is before a
    /// rule `B`, every `B -> • γ` is added.
    pub fn close(&self, grm: &CfGrammar<StorageT>) -> Self {
        let mut new_is = self.clone();
        // All of a rule's productions are added at once, so each rule need only be expanded
        // once.
        let mut expanded = Vob::from_elem(false, usize::from(grm.rules_len()));
        let mut i = 0;
        while i < new_is.items.len() {
            let (pidx, dot) = new_is.items[i];
            i += 1;
            if let Some(Symbol::Rule(ridx)) = Itemset::next_sym(grm, pidx, dot) {
                if expanded.set(usize::from(ridx), true) {
                    for &ref_pidx in grm.rule_to_prods(ridx) {
                        new_is.add(ref_pidx, SIdx(0usize.as_()));
                    }
                }
            }
        }
        new_is
    }

    /// Create a new Itemset based on calculating the goto of `sym` on the current Itemset. The
    /// result is a kernel: it is not closed.
    pub fn goto(&self, grm: &CfGrammar<StorageT>, sym: &Symbol<StorageT>) -> Self {
        let mut newis = Itemset::new();
        for &(pidx, dot) in &self.items {
            if Itemset::next_sym(grm, pidx, dot).as_ref() == Some(sym) {
                newis.add(pidx, SIdx((usize::from(dot) + 1).as_()));
            }
        }
        newis.items.sort();
        newis
    }

    /// The complete items, i.e. those whose dot is at the end of their production.
    pub fn complete_items<'a>(
        &'a self,
        grm: &'a CfGrammar<StorageT>,
    ) -> impl Iterator<Item = PIdx<StorageT>> + 'a {
        self.items
            .iter()
            .filter(move |&&(pidx, dot)| dot == grm.prod_len(pidx))
            .map(|&(pidx, _)| pidx)
    }
}
