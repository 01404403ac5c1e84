//! Book Side - the ordered index of price levels for one side of the book.
//!
//! `BookSide` is the seam between the matching algorithm and the price
//! level storage. Two strategies implement it:
//!
//! - [`TreeSide`]: a `BTreeMap` keyed by price. Unbounded range, O(log n)
//!   best-price access.
//! - [`HotZoneSide`](crate::hot_zone::HotZoneSide): a dense array over a
//!   window around the best price with a `BTreeMap` overflow.
//!
//! Both must never hold an empty level; the book removes a level the
//! moment its last order leaves.

use std::collections::BTreeMap;

use crate::command::Side;
use crate::config::BookConfig;
use crate::error::BookCorruption;
use crate::order_book::OrderBookImplType;
use crate::price_level::PriceLevel;

/// Price-ordered collection of levels for one side.
///
/// "Priority order" means ascending prices for asks and descending
/// prices for bids: the best price comes first.
pub trait BookSide: Send + Sized {
    /// Implementation tag written to persisted state.
    const IMPL_TYPE: OrderBookImplType;

    fn new(side: Side, config: &BookConfig) -> Self;

    fn side(&self) -> Side;

    /// Best (first in priority order) price, if any.
    fn best_price(&self) -> Option<u64>;

    fn level(&self, price: u64) -> Option<&PriceLevel>;

    fn level_mut(&mut self, price: u64) -> Option<&mut PriceLevel>;

    /// Get or create the level at `price`.
    fn level_or_insert(&mut self, price: u64) -> &mut PriceLevel;

    /// Drop the (now empty) level at `price`.
    fn remove_level(&mut self, price: u64);

    /// Number of non-empty levels.
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Levels in priority order.
    fn iter(&self) -> Box<dyn Iterator<Item = (u64, &PriceLevel)> + '_>;

    /// Representation-specific consistency checks (diagnostics only).
    fn validate(&self) -> Result<(), BookCorruption> {
        Ok(())
    }
}

/// General strategy: ordered map, unbounded price range.
#[derive(Debug, Clone)]
pub struct TreeSide {
    side: Side,
    levels: BTreeMap<u64, PriceLevel>,
}

impl BookSide for TreeSide {
    const IMPL_TYPE: OrderBookImplType = OrderBookImplType::Naive;

    fn new(side: Side, _config: &BookConfig) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    #[inline]
    fn side(&self) -> Side {
        self.side
    }

    #[inline]
    fn best_price(&self) -> Option<u64> {
        match self.side {
            Side::Ask => self.levels.first_key_value().map(|(p, _)| *p),
            Side::Bid => self.levels.last_key_value().map(|(p, _)| *p),
        }
    }

    #[inline]
    fn level(&self, price: u64) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    #[inline]
    fn level_mut(&mut self, price: u64) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    #[inline]
    fn level_or_insert(&mut self, price: u64) -> &mut PriceLevel {
        self.levels.entry(price).or_insert_with(PriceLevel::new)
    }

    #[inline]
    fn remove_level(&mut self, price: u64) {
        self.levels.remove(&price);
    }

    #[inline]
    fn len(&self) -> usize {
        self.levels.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (u64, &PriceLevel)> + '_> {
        let levels = self.levels.iter().map(|(p, l)| (*p, l));
        match self.side {
            Side::Ask => Box::new(levels),
            Side::Bid => Box::new(levels.rev()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_level() -> PriceLevel {
        PriceLevel {
            count: 1,
            total_qty: 10,
            ..PriceLevel::new()
        }
    }

    #[test]
    fn test_empty_side() {
        let side = TreeSide::new(Side::Ask, &BookConfig::default());
        assert!(side.is_empty());
        assert_eq!(side.best_price(), None);
        assert_eq!(side.iter().count(), 0);
    }

    #[test]
    fn test_ask_priority_is_ascending() {
        let mut side = TreeSide::new(Side::Ask, &BookConfig::default());
        for price in [105, 101, 103] {
            *side.level_or_insert(price) = filled_level();
        }
        assert_eq!(side.best_price(), Some(101));
        let prices: Vec<u64> = side.iter().map(|(p, _)| p).collect();
        assert_eq!(prices, vec![101, 103, 105]);
    }

    #[test]
    fn test_bid_priority_is_descending() {
        let mut side = TreeSide::new(Side::Bid, &BookConfig::default());
        for price in [99, 97, 98] {
            *side.level_or_insert(price) = filled_level();
        }
        assert_eq!(side.best_price(), Some(99));
        let prices: Vec<u64> = side.iter().map(|(p, _)| p).collect();
        assert_eq!(prices, vec![99, 98, 97]);
    }

    #[test]
    fn test_remove_best_level() {
        let mut side = TreeSide::new(Side::Bid, &BookConfig::default());
        *side.level_or_insert(100) = filled_level();
        *side.level_or_insert(90) = filled_level();

        side.remove_level(100);
        assert_eq!(side.best_price(), Some(90));
        assert_eq!(side.len(), 1);
        assert!(side.level(100).is_none());
    }
}
