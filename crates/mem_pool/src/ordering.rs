use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
    sync::Arc,
};

use indexmap::IndexMap;
use kaia_primitives::Address;
use kaia_transaction::Transaction;

/// Pending transactions of a single account, sorted by nonce.
#[derive(Clone, Debug)]
struct AccountQueue {
    sender: Address,
    transactions: VecDeque<Arc<Transaction>>,
}

/// The heap's view of an account queue's head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeadEntry {
    effective_tip: u128,
    arrival: u64,
    queue: usize,
}

impl HeadEntry {
    fn new(transaction: &Transaction, queue: usize, base_fee: Option<u128>) -> Self {
        Self {
            effective_tip: transaction.inner().effective_gas_tip(base_fee),
            arrival: transaction.arrival(),
            queue,
        }
    }
}

impl Ord for HeadEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.effective_tip
            .cmp(&other.effective_tip)
            // Earlier arrivals rank higher
            .then_with(|| other.arrival.cmp(&self.arrival))
            .then_with(|| other.queue.cmp(&self.queue))
    }
}

impl PartialOrd for HeadEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The highest-ranked pending transaction.
#[derive(Debug)]
pub struct OrderedHead<'queue> {
    /// The account that sent the transaction
    pub sender: Address,
    /// The transaction
    pub transaction: &'queue Arc<Transaction>,
    /// The tip per gas the transaction pays after the base fee
    pub effective_tip: u128,
}

/// Pending transactions ordered by effective tip, respecting each account's
/// nonce order.
///
/// Only the lowest-nonce transaction of every account competes for the next
/// slot. Equal tips are ranked by arrival, earliest first.
///
/// Cloning is shallow: transactions are shared between clones, but each clone
/// advances independently.
#[derive(Clone, Debug)]
pub struct TransactionsByPriceAndNonce {
    queues: Vec<AccountQueue>,
    heap: BinaryHeap<HeadEntry>,
    base_fee: Option<u128>,
}

impl TransactionsByPriceAndNonce {
    /// Constructs an instance from per-account queues. Each queue must be
    /// sorted by nonce. Empty queues are ignored.
    pub fn new(
        transactions: IndexMap<Address, Vec<Arc<Transaction>>>,
        base_fee: Option<u128>,
    ) -> Self {
        let mut queues = Vec::with_capacity(transactions.len());
        let mut heap = BinaryHeap::with_capacity(transactions.len());

        for (sender, transactions) in transactions {
            let transactions = VecDeque::from(transactions);
            let Some(head) = transactions.front() else {
                continue;
            };

            heap.push(HeadEntry::new(head, queues.len(), base_fee));
            queues.push(AccountQueue {
                sender,
                transactions,
            });
        }

        Self {
            queues,
            heap,
            base_fee,
        }
    }

    /// Returns the base fee that effective tips are computed against.
    pub fn base_fee(&self) -> Option<u128> {
        self.base_fee
    }

    /// Returns the number of accounts with pending transactions.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the highest-ranked transaction, if any.
    pub fn peek(&self) -> Option<OrderedHead<'_>> {
        let entry = self.heap.peek()?;
        let queue = self.queues.get(entry.queue)?;

        queue.transactions.front().map(|transaction| OrderedHead {
            sender: queue.sender,
            transaction,
            effective_tip: entry.effective_tip,
        })
    }

    /// Removes the highest-ranked transaction and promotes the next
    /// transaction of the same account.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn shift(&mut self) {
        let Some(entry) = self.heap.pop() else {
            return;
        };

        let Some(queue) = self.queues.get_mut(entry.queue) else {
            return;
        };

        queue.transactions.pop_front();
        if let Some(next) = queue.transactions.front() {
            self.heap
                .push(HeadEntry::new(next, entry.queue, self.base_fee));
        }
    }

    /// Removes the highest-ranked transaction together with the remaining
    /// transactions of its account.
    ///
    /// Used when the transaction cannot be executed, as none of the account's
    /// later nonces can be executed either. Returns the discarded
    /// transactions.
    pub fn pop(&mut self) -> Option<Vec<Arc<Transaction>>> {
        let entry = self.heap.pop()?;
        let queue = self.queues.get_mut(entry.queue)?;

        let discarded: Vec<_> = queue.transactions.drain(..).collect();
        log::warn!(
            "Discarding {} pending transaction(s) of account {}",
            discarded.len(),
            queue.sender
        );

        Some(discarded)
    }
}

impl Iterator for TransactionsByPriceAndNonce {
    type Item = Arc<Transaction>;

    fn next(&mut self) -> Option<Self::Item> {
        let transaction = Arc::clone(self.peek()?.transaction);
        self.shift();

        Some(transaction)
    }
}

#[cfg(test)]
mod tests {
    use kaia_test_transaction::{
        address_of, dummy_eip1559_transaction, dummy_fee_delegated_value_transfer,
        dummy_legacy_transaction, dummy_secret_key, dummy_value_transfer, SecretKey,
    };
    use kaia_transaction::{signer::SignerError, TransactionVariant as _};

    use super::*;

    type Constructor = fn(&SecretKey, u64, u128) -> Result<Transaction, SignerError>;

    fn pending(
        queues: Vec<(Address, Vec<Arc<Transaction>>)>,
    ) -> IndexMap<Address, Vec<Arc<Transaction>>> {
        queues.into_iter().collect()
    }

    fn with_arrival(transaction: Transaction, arrival: u64) -> Arc<Transaction> {
        Arc::new(Transaction::with_arrival(transaction.into_inner(), arrival))
    }

    /// Drains the instance, returning every transaction's sender and nonce.
    fn drain(ordering: &mut TransactionsByPriceAndNonce) -> Vec<(Address, u64)> {
        let mut order = Vec::new();
        while let Some(head) = ordering.peek() {
            order.push((head.sender, head.transaction.inner().nonce()));
            ordering.shift();
        }

        order
    }

    macro_rules! impl_test_ordering {
        ($(
            $name:ident => $constructor:expr,
        )+) => {
            $(
                paste::item! {
                    #[test]
                    fn [<priority_ordering_ $name>]() -> anyhow::Result<()> {
                        let constructor: Constructor = $constructor;

                        let key1 = dummy_secret_key(1)?;
                        let key2 = dummy_secret_key(2)?;
                        let key3 = dummy_secret_key(3)?;

                        let mut ordering = TransactionsByPriceAndNonce::new(
                            pending(vec![
                                (
                                    address_of(&key1),
                                    vec![
                                        Arc::new(constructor(&key1, 0, 10)?),
                                        Arc::new(constructor(&key1, 1, 30)?),
                                    ],
                                ),
                                (address_of(&key2), vec![Arc::new(constructor(&key2, 0, 20)?)]),
                                (address_of(&key3), vec![Arc::new(constructor(&key3, 0, 5)?)]),
                            ]),
                            None,
                        );
                        assert_eq!(ordering.len(), 3);

                        assert_eq!(
                            drain(&mut ordering),
                            vec![
                                (address_of(&key2), 0),
                                (address_of(&key1), 0),
                                (address_of(&key1), 1),
                                (address_of(&key3), 0),
                            ]
                        );
                        assert!(ordering.is_empty());

                        Ok(())
                    }

                    #[test]
                    fn [<equal_tips_rank_by_arrival_ $name>]() -> anyhow::Result<()> {
                        let constructor: Constructor = $constructor;

                        let keys = [dummy_secret_key(1)?, dummy_secret_key(2)?, dummy_secret_key(3)?];

                        // Inserted in reverse arrival order
                        let mut queues = Vec::new();
                        for (arrival, key) in keys.iter().enumerate().rev() {
                            let transaction = constructor(key, 0, 10)?;
                            queues.push((address_of(key), vec![with_arrival(transaction, arrival as u64)]));
                        }

                        let mut ordering = TransactionsByPriceAndNonce::new(pending(queues), None);

                        let order: Vec<_> = drain(&mut ordering)
                            .into_iter()
                            .map(|(sender, _nonce)| sender)
                            .collect();
                        assert_eq!(order, keys.iter().map(address_of).collect::<Vec<_>>());

                        Ok(())
                    }
                }
            )+
        };
    }

    impl_test_ordering! {
        legacy => dummy_legacy_transaction,
        value_transfer => dummy_value_transfer,
    }

    #[test]
    fn fee_delegated_ranks_by_gas_price() -> anyhow::Result<()> {
        let sender = dummy_secret_key(1)?;
        let other = dummy_secret_key(2)?;
        let fee_payer = dummy_secret_key(3)?;

        let mut ordering = TransactionsByPriceAndNonce::new(
            pending(vec![
                (
                    address_of(&sender),
                    vec![Arc::new(dummy_fee_delegated_value_transfer(
                        &sender, &fee_payer, 0, 50,
                    )?)],
                ),
                (
                    address_of(&other),
                    vec![Arc::new(dummy_value_transfer(&other, 0, 40)?)],
                ),
            ]),
            None,
        );

        let head = ordering.peek().expect("has pending transactions");
        assert_eq!(head.sender, address_of(&sender));
        assert_eq!(head.effective_tip, 50);

        Ok(())
    }

    #[test]
    fn base_fee_is_subtracted() -> anyhow::Result<()> {
        let legacy_key = dummy_secret_key(1)?;
        let dynamic_fee_key = dummy_secret_key(2)?;
        let capped_key = dummy_secret_key(3)?;

        let queues = pending(vec![
            (
                address_of(&legacy_key),
                vec![Arc::new(dummy_legacy_transaction(&legacy_key, 0, 60)?)],
            ),
            (
                address_of(&dynamic_fee_key),
                vec![Arc::new(dummy_eip1559_transaction(
                    &dynamic_fee_key,
                    0,
                    100,
                    50,
                )?)],
            ),
            (
                address_of(&capped_key),
                vec![Arc::new(dummy_eip1559_transaction(&capped_key, 0, 20, 20)?)],
            ),
        ]);

        // Without a base fee, tips are the raw tip caps
        let mut ordering = TransactionsByPriceAndNonce::new(queues.clone(), None);
        let tips: Vec<_> = std::iter::from_fn(|| {
            let tip = ordering.peek().map(|head| (head.sender, head.effective_tip));
            ordering.shift();
            tip
        })
        .collect();
        assert_eq!(
            tips,
            vec![
                (address_of(&legacy_key), 60),
                (address_of(&dynamic_fee_key), 50),
                (address_of(&capped_key), 20),
            ]
        );

        let mut ordering = TransactionsByPriceAndNonce::new(queues, Some(30));
        assert_eq!(ordering.base_fee(), Some(30));
        let tips: Vec<_> = std::iter::from_fn(|| {
            let tip = ordering.peek().map(|head| (head.sender, head.effective_tip));
            ordering.shift();
            tip
        })
        .collect();
        assert_eq!(
            tips,
            vec![
                (address_of(&dynamic_fee_key), 50),
                (address_of(&legacy_key), 30),
                // The fee cap is below the base fee
                (address_of(&capped_key), 0),
            ]
        );

        Ok(())
    }

    #[test]
    fn pop_discards_account() -> anyhow::Result<()> {
        let key1 = dummy_secret_key(1)?;
        let key2 = dummy_secret_key(2)?;

        let mut ordering = TransactionsByPriceAndNonce::new(
            pending(vec![
                (
                    address_of(&key1),
                    vec![
                        Arc::new(dummy_legacy_transaction(&key1, 0, 30)?),
                        Arc::new(dummy_legacy_transaction(&key1, 1, 30)?),
                    ],
                ),
                (
                    address_of(&key2),
                    vec![Arc::new(dummy_legacy_transaction(&key2, 0, 10)?)],
                ),
            ]),
            None,
        );

        let discarded = ordering.pop().expect("has pending transactions");
        let nonces: Vec<_> = discarded
            .iter()
            .map(|transaction| transaction.inner().nonce())
            .collect();
        assert_eq!(nonces, vec![0, 1]);

        assert_eq!(drain(&mut ordering), vec![(address_of(&key2), 0)]);
        assert!(ordering.pop().is_none());

        Ok(())
    }

    #[test]
    fn clones_advance_independently() -> anyhow::Result<()> {
        let key1 = dummy_secret_key(1)?;
        let key2 = dummy_secret_key(2)?;

        let mut ordering = TransactionsByPriceAndNonce::new(
            pending(vec![
                (
                    address_of(&key1),
                    vec![Arc::new(dummy_value_transfer(&key1, 0, 20)?)],
                ),
                (
                    address_of(&key2),
                    vec![Arc::new(dummy_value_transfer(&key2, 0, 10)?)],
                ),
            ]),
            None,
        );

        let copy = ordering.clone();
        ordering.shift();

        let original_head = ordering.peek().expect("has pending transactions");
        assert_eq!(original_head.sender, address_of(&key2));

        let copy_head = copy.peek().expect("has pending transactions");
        assert_eq!(copy_head.sender, address_of(&key1));

        // Transactions are shared
        let shared = copy.clone().nth(1).expect("two transactions");
        assert!(Arc::ptr_eq(&shared, original_head.transaction));

        Ok(())
    }

    #[test]
    fn empty_queues_are_ignored() -> anyhow::Result<()> {
        let key = dummy_secret_key(1)?;

        let ordering = TransactionsByPriceAndNonce::new(
            pending(vec![
                (Address::repeat_byte(0x01), Vec::new()),
                (
                    address_of(&key),
                    vec![Arc::new(dummy_legacy_transaction(&key, 0, 1)?)],
                ),
            ]),
            None,
        );

        assert_eq!(ordering.len(), 1);
        assert_eq!(ordering.count(), 1);

        Ok(())
    }
}
