// Index newtypes expose a usize API while storing values in a (possibly smaller) StorageT.

use std::{fmt, mem::size_of};

use num_traits::{self, PrimInt, Unsigned};

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident, $prefix: expr) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $n<T>(pub T);

        impl<T: PrimInt + Unsigned> From<$n<T>> for usize {
            fn from(st: $n<T>) -> Self {
                debug_assert!(size_of::<usize>() >= size_of::<T>());
                num_traits::cast(st.0).unwrap()
            }
        }

        impl<T: PrimInt + Unsigned> From<$n<T>> for u32 {
            fn from(st: $n<T>) -> Self {
                debug_assert!(size_of::<u32>() >= size_of::<T>());
                num_traits::cast(st.0).unwrap()
            }
        }

        impl<T: PrimInt + Unsigned> $n<T> {
            pub fn as_storaget(&self) -> T {
                self.0
            }
        }

        impl<T: PrimInt + Unsigned + fmt::Display> fmt::Display for $n<T> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    }
}

IdxNewtype!(
    /// A type specifically for rule (i.e. nonterminal) indices.
    ///
    /// `RIdx` can be converted, without loss of precision, to `usize` with `usize::from(ridx)`.
    RIdx, "r");
IdxNewtype!(
    /// A type specifically for production indices: a rule `E : A | B` has two productions for
    /// the single rule `E`.
    ///
    /// `PIdx` can be converted, without loss of precision, to `usize` with `usize::from(pidx)`.
    PIdx, "p");
IdxNewtype!(
    /// A type specifically for symbol indices within a production, i.e. the position of the dot
    /// in an LR item.
    SIdx, "s");
IdxNewtype!(
    /// A type specifically for token (i.e. terminal) indices.
    ///
    /// `TIdx` can be converted, without loss of precision, to `usize` with `usize::from(tidx)`.
    TIdx, "t");
