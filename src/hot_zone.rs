//! Hot Zone - dense price-level array around the best price.
//!
//! Prices inside `[base, base + width)` map straight to a slot in a
//! fixed array, giving O(1) level access where almost all activity
//! happens. Prices outside the window live in a `BTreeMap` overflow.
//! When the best price drifts within `margin` ticks of either edge the
//! window is recentered on it, migrating levels between the array and
//! the overflow.
//!
//! Invariant: no overflow key ever falls inside the window, so the
//! ordered walk is `overflow below ++ window ++ overflow above`.

use std::collections::BTreeMap;
use std::ops::Bound;

use tracing::debug;

use crate::book_side::BookSide;
use crate::command::Side;
use crate::config::BookConfig;
use crate::error::BookCorruption;
use crate::order_book::OrderBookImplType;
use crate::price_level::PriceLevel;

/// Bounded strategy: dense window plus ordered overflow.
pub struct HotZoneSide {
    side: Side,
    /// Lowest price covered by `slots`
    base: u64,
    /// Vacant slots hold an empty `PriceLevel`
    slots: Box<[PriceLevel]>,
    /// Number of non-vacant slots
    occupied: usize,
    overflow: BTreeMap<u64, PriceLevel>,
    /// Cached best price
    best: Option<u64>,
    margin: u64,
    recenters: u64,
}

impl HotZoneSide {
    #[inline]
    fn width(&self) -> u64 {
        self.slots.len() as u64
    }

    #[inline]
    fn window_end(&self) -> u64 {
        self.base + self.width()
    }

    #[inline]
    fn slot_of(&self, price: u64) -> Option<usize> {
        if price >= self.base && price - self.base < self.width() {
            Some((price - self.base) as usize)
        } else {
            None
        }
    }

    /// Current window as `(base, end)`, end exclusive.
    pub fn window(&self) -> (u64, u64) {
        (self.base, self.window_end())
    }

    /// Number of times the window has moved.
    pub fn recenter_count(&self) -> u64 {
        self.recenters
    }

    /// Levels currently held in the overflow map.
    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }

    #[inline]
    fn needs_recenter(&self, best: u64) -> bool {
        let low = self.base.saturating_add(self.margin);
        let high = self.window_end().saturating_sub(self.margin);
        best < low || best >= high
    }

    #[inline]
    fn centered_base(&self, price: u64) -> u64 {
        price
            .saturating_sub(self.width() / 2)
            .min(u64::MAX - self.width())
    }

    /// Move the window so that `center` sits in its middle.
    fn recenter(&mut self, center: u64) {
        let new_base = self.centered_base(center);
        if new_base == self.base {
            return;
        }

        let old_base = self.base;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !slot.is_empty() {
                self.overflow.insert(old_base + i as u64, std::mem::take(slot));
            }
        }
        self.occupied = 0;
        self.base = new_base;

        let inside: Vec<u64> = self
            .overflow
            .range(new_base..self.window_end())
            .map(|(p, _)| *p)
            .collect();
        for price in inside {
            if let Some(level) = self.overflow.remove(&price) {
                self.slots[(price - new_base) as usize] = level;
                self.occupied += 1;
            }
        }

        self.recenters += 1;
        debug!(
            side = ?self.side,
            old_base,
            new_base,
            dense = self.occupied,
            overflow = self.overflow.len(),
            "hot zone recentered"
        );
    }

    /// Pick the better of two candidate prices for this side.
    #[inline]
    fn better_of(&self, a: Option<u64>, b: Option<u64>) -> Option<u64> {
        match (a, b) {
            (Some(x), Some(y)) => Some(if self.side.is_better(x, y) { x } else { y }),
            (x, None) => x,
            (None, y) => y,
        }
    }

    /// Next price in priority order strictly after `price`.
    fn next_best_after(&self, price: u64) -> Option<u64> {
        let base = self.base;
        match self.side {
            Side::Ask => {
                let over = self
                    .overflow
                    .range((Bound::Excluded(price), Bound::Unbounded))
                    .next()
                    .map(|(p, _)| *p);
                let start = if price < base {
                    0
                } else {
                    (price - base).saturating_add(1) as usize
                };
                let dense = self
                    .slots
                    .get(start..)
                    .and_then(|s| s.iter().position(|l| !l.is_empty()))
                    .map(|i| base + (start + i) as u64);
                self.better_of(over, dense)
            }
            Side::Bid => {
                let over = self.overflow.range(..price).next_back().map(|(p, _)| *p);
                let end = if price <= base {
                    0
                } else {
                    (price - base).min(self.width()) as usize
                };
                let dense = self.slots[..end]
                    .iter()
                    .rposition(|l| !l.is_empty())
                    .map(|i| base + i as u64);
                self.better_of(over, dense)
            }
        }
    }
}

impl BookSide for HotZoneSide {
    const IMPL_TYPE: OrderBookImplType = OrderBookImplType::Fast;

    fn new(side: Side, config: &BookConfig) -> Self {
        let width = config.hot_width.max(1) as usize;
        Self {
            side,
            base: 0,
            slots: vec![PriceLevel::new(); width].into_boxed_slice(),
            occupied: 0,
            overflow: BTreeMap::new(),
            best: None,
            margin: u64::from(config.recenter_margin).min(width as u64 / 2),
            recenters: 0,
        }
    }

    #[inline]
    fn side(&self) -> Side {
        self.side
    }

    #[inline]
    fn best_price(&self) -> Option<u64> {
        self.best
    }

    #[inline]
    fn level(&self, price: u64) -> Option<&PriceLevel> {
        match self.slot_of(price) {
            Some(i) => Some(&self.slots[i]).filter(|l| !l.is_empty()),
            None => self.overflow.get(&price),
        }
    }

    #[inline]
    fn level_mut(&mut self, price: u64) -> Option<&mut PriceLevel> {
        match self.slot_of(price) {
            Some(i) => Some(&mut self.slots[i]).filter(|l| !l.is_empty()),
            None => self.overflow.get_mut(&price),
        }
    }

    fn level_or_insert(&mut self, price: u64) -> &mut PriceLevel {
        let becomes_best = self.best.map_or(true, |best| self.side.is_better(price, best));
        if becomes_best {
            self.best = Some(price);
            if self.needs_recenter(price) {
                self.recenter(price);
            }
        }

        match self.slot_of(price) {
            Some(i) => {
                if self.slots[i].is_empty() {
                    self.occupied += 1;
                }
                &mut self.slots[i]
            }
            None => self.overflow.entry(price).or_insert_with(PriceLevel::new),
        }
    }

    fn remove_level(&mut self, price: u64) {
        match self.slot_of(price) {
            Some(i) => {
                debug_assert!(self.occupied > 0);
                self.slots[i] = PriceLevel::new();
                self.occupied = self.occupied.saturating_sub(1);
            }
            None => {
                self.overflow.remove(&price);
            }
        }

        if self.best == Some(price) {
            self.best = self.next_best_after(price);
            if let Some(best) = self.best {
                if self.needs_recenter(best) {
                    self.recenter(best);
                }
            }
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.occupied + self.overflow.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (u64, &PriceLevel)> + '_> {
        let base = self.base;
        let below = self.overflow.range(..base).map(|(p, l)| (*p, l));
        let above = self.overflow.range(self.window_end()..).map(|(p, l)| (*p, l));
        let dense = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.is_empty())
            .map(move |(i, l)| (base + i as u64, l));

        match self.side {
            Side::Ask => Box::new(below.chain(dense).chain(above)),
            Side::Bid => Box::new(above.rev().chain(dense.rev()).chain(below.rev())),
        }
    }

    fn validate(&self) -> Result<(), BookCorruption> {
        let corrupt = |detail: String| BookCorruption::HotZone {
            side: self.side,
            detail,
        };

        let dense = self.slots.iter().filter(|l| !l.is_empty()).count();
        if dense != self.occupied {
            return Err(corrupt(format!(
                "occupied counter {} but {} non-empty slots",
                self.occupied, dense
            )));
        }
        if let Some((price, _)) = self.overflow.range(self.base..self.window_end()).next() {
            return Err(corrupt(format!(
                "overflow level {} inside window [{}, {})",
                price,
                self.base,
                self.window_end()
            )));
        }
        let actual = self.iter().next().map(|(p, _)| p);
        if actual != self.best {
            return Err(BookCorruption::BestPrice {
                side: self.side,
                cached: self.best,
                actual,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for HotZoneSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotZoneSide")
            .field("side", &self.side)
            .field("window", &self.window())
            .field("dense_levels", &self.occupied)
            .field("overflow_levels", &self.overflow.len())
            .field("best", &self.best)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(side: Side, width: u32) -> HotZoneSide {
        HotZoneSide::new(side, &BookConfig::default().with_hot_width(width))
    }

    /// Create a level and mark it non-empty the way the book does.
    fn add(side: &mut HotZoneSide, price: u64) {
        let level = side.level_or_insert(price);
        level.count += 1;
        level.total_qty += 10;
    }

    fn prices(side: &HotZoneSide) -> Vec<u64> {
        side.iter().map(|(p, _)| p).collect()
    }

    #[test]
    fn test_first_insert_centers_window() {
        let mut asks = side(Side::Ask, 64);
        add(&mut asks, 10_000);

        assert_eq!(asks.window(), (10_000 - 32, 10_000 + 32));
        assert_eq!(asks.best_price(), Some(10_000));
        assert_eq!(asks.overflow_len(), 0);
        assert!(asks.validate().is_ok());
    }

    #[test]
    fn test_far_prices_go_to_overflow() {
        let mut asks = side(Side::Ask, 64);
        add(&mut asks, 10_000);
        add(&mut asks, 50_000);

        assert_eq!(asks.overflow_len(), 1);
        assert_eq!(asks.len(), 2);
        assert_eq!(prices(&asks), vec![10_000, 50_000]);
        assert!(asks.validate().is_ok());
    }

    #[test]
    fn test_ask_iteration_spans_overflow_and_window() {
        let mut asks = side(Side::Ask, 64);
        for price in [1_000, 1_010, 990, 5_000, 1_020] {
            add(&mut asks, price);
        }
        assert_eq!(prices(&asks), vec![990, 1_000, 1_010, 1_020, 5_000]);
        assert_eq!(asks.best_price(), Some(990));
        assert!(asks.validate().is_ok());
    }

    #[test]
    fn test_bid_iteration_is_descending() {
        let mut bids = side(Side::Bid, 64);
        for price in [1_000, 980, 1_005, 10, 1_001] {
            add(&mut bids, price);
        }
        assert_eq!(prices(&bids), vec![1_005, 1_001, 1_000, 980, 10]);
        assert_eq!(bids.best_price(), Some(1_005));
        assert!(bids.validate().is_ok());
    }

    #[test]
    fn test_removing_best_walks_to_next() {
        let mut asks = side(Side::Ask, 64);
        for price in [1_000, 1_003, 1_007] {
            add(&mut asks, price);
        }

        asks.level_mut(1_000).unwrap().count = 0;
        asks.remove_level(1_000);
        assert_eq!(asks.best_price(), Some(1_003));

        asks.remove_level(1_003);
        assert_eq!(asks.best_price(), Some(1_007));

        asks.remove_level(1_007);
        assert_eq!(asks.best_price(), None);
        assert!(asks.is_empty());
        assert!(asks.validate().is_ok());
    }

    #[test]
    fn test_best_moving_into_overflow_recenters() {
        let mut bids = side(Side::Bid, 64);
        add(&mut bids, 1_000);
        add(&mut bids, 500);
        let before = bids.recenter_count();

        bids.remove_level(1_000);
        assert_eq!(bids.best_price(), Some(500));
        assert!(bids.recenter_count() > before);

        let (base, end) = bids.window();
        assert!(base <= 500 && 500 < end);
        assert_eq!(bids.overflow_len(), 0);
        assert!(bids.validate().is_ok());
    }

    #[test]
    fn test_recenter_migrates_levels_both_ways() {
        let mut asks = side(Side::Ask, 16);
        for price in [100, 101, 102, 103] {
            add(&mut asks, price);
        }
        // A much better price pulls the window down and pushes the old
        // levels out to the overflow.
        add(&mut asks, 40);
        assert_eq!(asks.best_price(), Some(40));
        assert_eq!(asks.overflow_len(), 4);
        assert_eq!(prices(&asks), vec![40, 100, 101, 102, 103]);

        asks.remove_level(40);
        assert_eq!(asks.best_price(), Some(100));
        assert_eq!(asks.overflow_len(), 0);
        assert_eq!(prices(&asks), vec![100, 101, 102, 103]);
        assert!(asks.validate().is_ok());
    }

    #[test]
    fn test_extreme_prices() {
        let mut bids = side(Side::Bid, 64);
        add(&mut bids, u64::MAX);
        add(&mut bids, 0);
        add(&mut bids, u64::MAX - 1);

        assert_eq!(bids.best_price(), Some(u64::MAX));
        assert_eq!(prices(&bids), vec![u64::MAX, u64::MAX - 1, 0]);
        assert!(bids.validate().is_ok());

        bids.remove_level(u64::MAX);
        assert_eq!(bids.best_price(), Some(u64::MAX - 1));
        bids.remove_level(u64::MAX - 1);
        assert_eq!(bids.best_price(), Some(0));
        assert!(bids.validate().is_ok());
    }
}
