//! Ordering of pending transactions for block building and broadcast.
#![warn(missing_docs)]

mod ordering;

pub use self::ordering::{OrderedHead, TransactionsByPriceAndNonce};
