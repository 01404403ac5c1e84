//! Order Book - the central limit order book for one instrument.
//!
//! [`OrderBook`] is the capability every representation offers: command
//! handlers plus the read-only accessors that the shared utilities
//! ([`dispatch`](crate::dispatch), [`snapshot`](crate::snapshot),
//! [`fingerprint`](crate::fingerprint), [`persist`](crate::persist))
//! are written against.
//!
//! [`LimitBook`] is the single state container, generic over the side
//! index strategy. Orders live in an [`Arena`]; price levels link them by
//! slot index; the order lookup maps id to (side, price, slot). Nothing
//! but the book owns an order.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};
use crate::book_side::{BookSide, TreeSide};
use crate::command::{OrderCommand, OrderMode, ResultCode, Side};
use crate::config::BookConfig;
use crate::error::BookCorruption;
use crate::hot_zone::HotZoneSide;
use crate::price_level::BucketView;

/// Which representation produced a book (and its persisted state).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderBookImplType {
    /// Ordered map per side
    Naive = 0,
    /// Dense hot-zone window per side
    Fast = 1,
}

impl OrderBookImplType {
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OrderBookImplType::Naive),
            1 => Some(OrderBookImplType::Fast),
            _ => None,
        }
    }
}

/// Instrument kind. Carried for the validation layer, ignored by matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolType {
    CurrencyExchangePair,
    FuturesContract,
}

/// Owned copy of a resting order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub uid: u64,
    pub price: u64,
    pub size: u64,
    pub filled: u64,
    pub action: Side,
    pub mode: OrderMode,
    pub timestamp: u64,
    pub user_cookie: i32,
}

impl Order {
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.size - self.filled
    }
}

impl From<&OrderNode> for Order {
    fn from(node: &OrderNode) -> Self {
        Self {
            order_id: node.order_id,
            uid: node.uid,
            price: node.price,
            size: node.size,
            filled: node.filled,
            action: node.action,
            mode: node.mode,
            timestamp: node.timestamp,
            user_cookie: node.user_cookie,
        }
    }
}

/// Contract shared by every order book representation.
///
/// Not internally synchronized: one command at a time, from one thread.
pub trait OrderBook: Send {
    /// Match a new order and rest any GTC remainder.
    fn new_order(&mut self, cmd: &mut OrderCommand) -> ResultCode;

    /// Remove a resting order. Returns false if the id is unknown.
    fn cancel_order(&mut self, cmd: &mut OrderCommand) -> bool;

    /// Reprice and/or downsize a resting order.
    fn move_order(&mut self, cmd: &mut OrderCommand) -> ResultCode;

    fn order_count(&self) -> usize;

    fn get_order(&self, order_id: u64) -> Option<Order>;

    fn best_ask(&self) -> Option<u64>;

    fn best_bid(&self) -> Option<u64>;

    /// Buckets of one side in priority order.
    fn buckets(&self, side: Side) -> Box<dyn Iterator<Item = BucketView<'_>> + '_>;

    fn total_buckets(&self, side: Side) -> usize;

    /// Full structural check. Diagnostics only, never on the hot path.
    fn validate_internal_state(&self) -> Result<(), BookCorruption>;

    fn impl_type(&self) -> OrderBookImplType;

    fn symbol_id(&self) -> u32;

    fn symbol_type(&self) -> SymbolType;

    /// Pre-fault order storage before taking traffic.
    fn warm_up(&mut self);
}

/// Build an empty book of the requested representation.
pub fn create(
    impl_type: OrderBookImplType,
    symbol_id: u32,
    symbol_type: SymbolType,
    config: BookConfig,
) -> Box<dyn OrderBook> {
    match impl_type {
        OrderBookImplType::Naive => Box::new(NaiveOrderBook::new(symbol_id, symbol_type, config)),
        OrderBookImplType::Fast => Box::new(FastOrderBook::new(symbol_id, symbol_type, config)),
    }
}

/// Where a resting order lives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OrderInfo {
    pub arena_index: ArenaIndex,
    pub side: Side,
    pub price: u64,
}

/// Why an order could not rest
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RestError {
    /// Every order slot is live
    Capacity,
    /// The level's total volume would pass `u64::MAX`
    VolumeOverflow,
}

/// Book state generic over the side index strategy.
pub struct LimitBook<S: BookSide> {
    pub(crate) symbol_id: u32,
    pub(crate) symbol_type: SymbolType,
    pub(crate) config: BookConfig,
    pub(crate) arena: Arena,
    pub(crate) asks: S,
    pub(crate) bids: S,
    /// Order lookup: OrderId -> OrderInfo
    pub(crate) order_map: FxHashMap<u64, OrderInfo>,
}

/// Ordered-map representation.
pub type NaiveOrderBook = LimitBook<TreeSide>;

/// Hot-zone representation.
pub type FastOrderBook = LimitBook<HotZoneSide>;

impl<S: BookSide> LimitBook<S> {
    pub fn new(symbol_id: u32, symbol_type: SymbolType, config: BookConfig) -> Self {
        Self {
            symbol_id,
            symbol_type,
            arena: Arena::new(config.order_capacity),
            asks: S::new(Side::Ask, &config),
            bids: S::new(Side::Bid, &config),
            order_map: FxHashMap::with_capacity_and_hasher(
                config.order_capacity as usize,
                Default::default(),
            ),
            config,
        }
    }

    #[inline]
    pub fn side(&self, side: Side) -> &S {
        match side {
            Side::Ask => &self.asks,
            Side::Bid => &self.bids,
        }
    }

    #[inline]
    pub(crate) fn side_mut(&mut self, side: Side) -> &mut S {
        match side {
            Side::Ask => &mut self.asks,
            Side::Bid => &mut self.bids,
        }
    }

    #[inline]
    pub fn contains_order(&self, order_id: u64) -> bool {
        self.order_map.contains_key(&order_id)
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Rest a new order at the back of its price level.
    ///
    /// The caller guarantees `order_id` is not already resting and that
    /// `node.size > node.filled`. On error nothing has changed.
    pub(crate) fn insert_order(&mut self, node: OrderNode) -> Result<ArenaIndex, RestError> {
        debug_assert!(!self.order_map.contains_key(&node.order_id));
        debug_assert!(node.remaining() > 0);

        let queued = self
            .side(node.action)
            .level(node.price)
            .map_or(0, |level| level.total_qty);
        if queued.checked_add(node.remaining()).is_none() {
            return Err(RestError::VolumeOverflow);
        }

        let Self {
            arena,
            asks,
            bids,
            order_map,
            ..
        } = self;

        let arena_index = arena.insert(node).ok_or(RestError::Capacity)?;

        order_map.insert(
            node.order_id,
            OrderInfo {
                arena_index,
                side: node.action,
                price: node.price,
            },
        );

        let book_side = match node.action {
            Side::Ask => asks,
            Side::Bid => bids,
        };
        book_side.level_or_insert(node.price).push_back(arena, arena_index);

        Ok(arena_index)
    }

    /// Unlink a resting order and free its slot.
    ///
    /// Returns a copy of the removed order, or `None` if not found.
    pub(crate) fn remove_order(&mut self, order_id: u64) -> Option<OrderNode> {
        let info = self.order_map.remove(&order_id)?;

        let Self {
            arena, asks, bids, ..
        } = self;
        let book_side = match info.side {
            Side::Ask => asks,
            Side::Bid => bids,
        };

        if let Some(level) = book_side.level_mut(info.price) {
            if level.remove(arena, info.arena_index) {
                book_side.remove_level(info.price);
            }
        }

        Some(arena.remove(info.arena_index))
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    fn validate_side(
        &self,
        side: Side,
        seen: &mut FxHashSet<u64>,
    ) -> Result<usize, BookCorruption> {
        let book_side = self.side(side);
        book_side.validate()?;

        let mut resting = 0usize;
        let mut previous: Option<u64> = None;

        for (price, level) in book_side.iter() {
            if let Some(prev) = previous {
                if !side.is_better(prev, price) {
                    return Err(BookCorruption::PriorityOrder { side, price });
                }
            }
            previous = Some(price);

            if level.is_empty() {
                return Err(BookCorruption::EmptyBucket { side, price });
            }

            let mut volume = 0u64;
            let mut count = 0u32;
            let mut expected_prev = NULL_INDEX;
            let mut cursor = level.head;

            while cursor != NULL_INDEX {
                let node = self.arena.get(cursor);
                if node.prev != expected_prev || count > level.count {
                    return Err(BookCorruption::BrokenLink {
                        side,
                        price,
                        order_id: node.order_id,
                    });
                }
                if node.price != price || node.action != side {
                    return Err(BookCorruption::MisplacedOrder {
                        side,
                        price,
                        order_id: node.order_id,
                    });
                }
                if node.filled >= node.size {
                    return Err(BookCorruption::FilledOrderResting {
                        order_id: node.order_id,
                    });
                }
                if node.mode == OrderMode::Ioc {
                    return Err(BookCorruption::IocResting {
                        order_id: node.order_id,
                    });
                }
                let expected = OrderInfo {
                    arena_index: cursor,
                    side,
                    price,
                };
                if self.order_map.get(&node.order_id) != Some(&expected) {
                    return Err(BookCorruption::LookupMismatch {
                        order_id: node.order_id,
                    });
                }
                if !seen.insert(node.order_id) {
                    return Err(BookCorruption::DuplicateOrder {
                        order_id: node.order_id,
                    });
                }

                volume = volume.saturating_add(node.remaining());
                count += 1;
                expected_prev = cursor;
                cursor = node.next;
            }

            if expected_prev != level.tail {
                return Err(BookCorruption::BrokenLink {
                    side,
                    price,
                    order_id: 0,
                });
            }
            if count != level.count {
                return Err(BookCorruption::CountMismatch {
                    side,
                    price,
                    cached: level.count,
                    actual: count,
                });
            }
            if volume != level.total_qty {
                return Err(BookCorruption::VolumeMismatch {
                    side,
                    price,
                    cached: level.total_qty,
                    actual: volume,
                });
            }
            resting += count as usize;
        }

        let actual_best = book_side.iter().next().map(|(p, _)| p);
        if actual_best != book_side.best_price() {
            return Err(BookCorruption::BestPrice {
                side,
                cached: book_side.best_price(),
                actual: actual_best,
            });
        }

        Ok(resting)
    }
}

impl<S: BookSide> OrderBook for LimitBook<S> {
    fn new_order(&mut self, cmd: &mut OrderCommand) -> ResultCode {
        self.place(cmd)
    }

    fn cancel_order(&mut self, cmd: &mut OrderCommand) -> bool {
        self.cancel(cmd)
    }

    fn move_order(&mut self, cmd: &mut OrderCommand) -> ResultCode {
        self.reprice(cmd)
    }

    #[inline]
    fn order_count(&self) -> usize {
        self.order_map.len()
    }

    fn get_order(&self, order_id: u64) -> Option<Order> {
        self.order_map
            .get(&order_id)
            .map(|info| Order::from(self.arena.get(info.arena_index)))
    }

    #[inline]
    fn best_ask(&self) -> Option<u64> {
        self.asks.best_price()
    }

    #[inline]
    fn best_bid(&self) -> Option<u64> {
        self.bids.best_price()
    }

    fn buckets(&self, side: Side) -> Box<dyn Iterator<Item = BucketView<'_>> + '_> {
        let arena = &self.arena;
        Box::new(
            self.side(side)
                .iter()
                .map(move |(price, level)| BucketView::new(price, level, arena)),
        )
    }

    fn total_buckets(&self, side: Side) -> usize {
        self.side(side).len()
    }

    fn validate_internal_state(&self) -> Result<(), BookCorruption> {
        let mut seen = FxHashSet::default();
        let resting =
            self.validate_side(Side::Ask, &mut seen)? + self.validate_side(Side::Bid, &mut seen)?;

        if resting != self.order_map.len() || self.arena.len() != resting {
            return Err(BookCorruption::OrderCount {
                indexed: self.order_map.len(),
                resting,
            });
        }

        if let (Some(bid), Some(ask)) = (self.bids.best_price(), self.asks.best_price()) {
            if bid >= ask {
                return Err(BookCorruption::Crossed { bid, ask });
            }
        }
        Ok(())
    }

    #[inline]
    fn impl_type(&self) -> OrderBookImplType {
        S::IMPL_TYPE
    }

    fn symbol_id(&self) -> u32 {
        self.symbol_id
    }

    fn symbol_type(&self) -> SymbolType {
        self.symbol_type
    }

    fn warm_up(&mut self) {
        self.arena.warm_up();
    }
}

impl<S: BookSide> std::fmt::Debug for LimitBook<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitBook")
            .field("impl", &S::IMPL_TYPE)
            .field("symbol_id", &self.symbol_id)
            .field("best_bid", &self.bids.best_price())
            .field("best_ask", &self.asks.best_price())
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("order_count", &self.order_map.len())
            .finish()
    }
}
