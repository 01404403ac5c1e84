//! State fingerprint and equality over the logical book content.
//!
//! Two books are equal when both sides hold the same buckets in the same
//! priority order, each with the same orders (id, uid, remaining size,
//! mode, arrival timestamp) in the same queue order. The representation,
//! the symbol and internal bookkeeping (slot indices, hot-zone window)
//! do not take part.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::arena::OrderNode;
use crate::book_side::BookSide;
use crate::command::Side;
use crate::order_book::{LimitBook, OrderBook};

type OrderKey = (u64, u64, u64, u8, u64);

#[inline]
fn order_key(order: &OrderNode) -> OrderKey {
    (
        order.order_id,
        order.uid,
        order.remaining(),
        order.mode.code(),
        order.timestamp,
    )
}

/// Deterministic hash of the logical book content.
///
/// Stable across runs and processes (`FxHasher` is unseeded), so it can be
/// stored next to persisted state and compared after a reload.
pub fn state_hash<B: OrderBook + ?Sized>(book: &B) -> u64 {
    let mut hasher = FxHasher::default();
    for side in [Side::Ask, Side::Bid] {
        (side as u8).hash(&mut hasher);
        for bucket in book.buckets(side) {
            bucket.price.hash(&mut hasher);
            bucket.num_orders().hash(&mut hasher);
            for order in bucket.orders() {
                order_key(order).hash(&mut hasher);
            }
        }
        // Side separator
        u64::MAX.hash(&mut hasher);
    }
    hasher.finish()
}

/// Compare the logical content of two books of any representation.
pub fn books_equal<A, B>(a: &A, b: &B) -> bool
where
    A: OrderBook + ?Sized,
    B: OrderBook + ?Sized,
{
    [Side::Ask, Side::Bid].into_iter().all(|side| {
        let mut left = a.buckets(side);
        let mut right = b.buckets(side);
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if x.price != y.price
                        || !x.orders().map(order_key).eq(y.orders().map(order_key))
                    {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    })
}

impl<S: BookSide, T: BookSide> PartialEq<LimitBook<T>> for LimitBook<S> {
    fn eq(&self, other: &LimitBook<T>) -> bool {
        books_equal(self, other)
    }
}

impl PartialEq for dyn OrderBook {
    fn eq(&self, other: &Self) -> bool {
        books_equal(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{OrderCommand, OrderMode};
    use crate::config::BookConfig;
    use crate::order_book::{FastOrderBook, NaiveOrderBook, SymbolType};

    fn apply(book: &mut dyn OrderBook, commands: &[(u64, Side, u64, u64)]) {
        for &(id, side, price, size) in commands {
            let mut cmd = OrderCommand::place(OrderMode::Gtc, id, id, price, size, side);
            book.new_order(&mut cmd);
        }
    }

    const COMMANDS: [(u64, Side, u64, u64); 5] = [
        (1, Side::Bid, 100, 10),
        (2, Side::Bid, 100, 5),
        (3, Side::Ask, 103, 7),
        (4, Side::Ask, 100, 6),
        (5, Side::Bid, 90, 1),
    ];

    fn pair() -> (NaiveOrderBook, FastOrderBook) {
        let config = BookConfig::default().with_hot_width(16);
        (
            NaiveOrderBook::new(1, SymbolType::CurrencyExchangePair, config.clone()),
            FastOrderBook::new(2, SymbolType::FuturesContract, config),
        )
    }

    #[test]
    fn test_empty_books_equal() {
        let (naive, fast) = pair();
        assert!(naive == fast);
        assert_eq!(state_hash(&naive), state_hash(&fast));
    }

    #[test]
    fn test_variants_hash_identically() {
        let (mut naive, mut fast) = pair();
        apply(&mut naive, &COMMANDS);
        apply(&mut fast, &COMMANDS);

        assert!(naive == fast);
        assert_eq!(state_hash(&naive), state_hash(&fast));
    }

    #[test]
    fn test_queue_order_matters() {
        let (mut a, _) = pair();
        let (mut b, _) = pair();
        apply(&mut a, &[(1, Side::Bid, 100, 10), (2, Side::Bid, 100, 10)]);
        apply(&mut b, &[(2, Side::Bid, 100, 10), (1, Side::Bid, 100, 10)]);

        assert!(a != b);
        assert_ne!(state_hash(&a), state_hash(&b));
    }

    #[test]
    fn test_remaining_size_matters() {
        let (mut a, mut b) = pair();
        apply(&mut a, &[(1, Side::Bid, 100, 10)]);
        apply(&mut b, &[(1, Side::Bid, 100, 9)]);
        assert!(a != b);
        assert_ne!(state_hash(&a), state_hash(&b));
    }

    #[test]
    fn test_side_matters() {
        let (mut a, mut b) = pair();
        apply(&mut a, &[(1, Side::Bid, 100, 10)]);
        apply(&mut b, &[(1, Side::Ask, 100, 10)]);
        assert!(a != b);
        assert_ne!(state_hash(&a), state_hash(&b));
    }

    #[test]
    fn test_hash_ignores_fill_history() {
        let (mut a, mut b) = pair();
        // Order 1 rests with 4 of 10 filled in `a`, fresh with 6 in `b`
        apply(&mut a, &[(1, Side::Bid, 100, 10), (2, Side::Ask, 100, 4)]);
        apply(&mut b, &[(1, Side::Bid, 100, 6)]);
        assert!(a == b);
        assert_eq!(state_hash(&a), state_hash(&b));
    }

    #[test]
    fn test_boxed_books_compare() {
        let (mut naive, mut fast) = pair();
        apply(&mut naive, &COMMANDS);
        apply(&mut fast, &COMMANDS[..4]);

        let a: Box<dyn OrderBook> = Box::new(naive);
        let b: Box<dyn OrderBook> = Box::new(fast);
        assert!(a != b);
    }
}
