#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]

//! Compile a [`CfGrammar`] into an SLR(1) state table. The canonical collection of LR(0) item
//! sets forms a [`StateGraph`]; complete items reduce on the FOLLOW set of their rule, and
//! shift/reduce and reduce/reduce conflicts are resolved Yacc-style (see
//! [`StateTable::new`](statetable/struct.StateTable.html#method.new)).

use std::{fmt, hash::Hash};

use declgrammar::CfGrammar;
use log::debug;
use num_traits::{AsPrimitive, PrimInt, Unsigned};

mod itemset;
mod stategraph;
pub mod statetable;

pub use crate::{
    itemset::Itemset,
    stategraph::StateGraph,
    statetable::{Action, Conflicts, StateTable, StateTableError, StateTableErrorKind},
};

type StIdxStorageT = u32;

/// StIdx is a wrapper for a 32-bit state index.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StIdx(StIdxStorageT);

impl From<StIdxStorageT> for StIdx {
    fn from(v: StIdxStorageT) -> Self {
        StIdx(v)
    }
}

impl From<usize> for StIdx {
    fn from(v: usize) -> Self {
        if v > StIdxStorageT::MAX as usize {
            panic!("Overflow");
        }
        StIdx(v as StIdxStorageT)
    }
}

impl From<StIdx> for usize {
    fn from(st: StIdx) -> Self {
        st.0 as usize
    }
}

impl From<StIdx> for StIdxStorageT {
    fn from(st: StIdx) -> Self {
        st.0
    }
}

impl fmt::Display for StIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Create the LR(0) state graph and the SLR(1) state table for `grm`.
pub fn from_grammar<StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &CfGrammar<StorageT>,
) -> Result<(StateGraph<StorageT>, StateTable<StorageT>), StateTableError<StorageT>>
where
    usize: AsPrimitive<StorageT>,
{
    let sg = StateGraph::new(grm);
    debug!(
        "{} states, {} edges",
        usize::from(sg.all_states_len()),
        sg.all_edges_len()
    );
    let st = StateTable::new(grm, &sg)?;
    Ok((sg, st))
}
