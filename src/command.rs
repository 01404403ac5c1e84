//! Command and Event types for the order book.
//!
//! Commands arrive one at a time from the upstream sequencer, already
//! risk-checked. Events are produced for downstream consumers
//! (settlement, reporting) and travel back attached to the command.

use serde::{Deserialize, Serialize};

use crate::snapshot::L2MarketData;

/// Order side (bid = buy, ask = sell)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Bid = 0,
    /// Sell side (asks)
    Ask = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Returns true if `price` is strictly better than `other` on this side.
    #[inline]
    pub const fn is_better(self, price: u64, other: u64) -> bool {
        match self {
            Side::Bid => price > other,
            Side::Ask => price < other,
        }
    }
}

/// Time-in-force of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderMode {
    /// Good-Till-Canceled: unmatched remainder rests in the book
    Gtc = 0,
    /// Immediate-Or-Cancel: unmatched remainder is rejected
    Ioc = 1,
}

impl OrderMode {
    /// Wire code used by the persisted format.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OrderMode::Gtc),
            1 => Some(OrderMode::Ioc),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    PlaceOrder,
    CancelOrder,
    MoveOrder,
    OrderBookRequest,
    BalanceAdjustment,
    Nop,
}

/// Outcome of a command.
///
/// Codes other than the `Matching*` family and `Success` are assigned
/// upstream and only ever echoed back by the book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    New,
    ValidForMatchingEngine,
    Success,
    InvalidSymbol,
    RiskNsf,
    MatchingUnknownOrderId,
    MatchingUnsupportedCommand,
    MatchingDuplicateOrderId,
    MatchingMoveRejectedSizeIncrease,
    MatchingCapacityExceeded,
    MatchingVolumeOverflow,
}

// ============================================================================
// Input Command
// ============================================================================

/// A single command for one instrument.
///
/// The meaning of `price` and `size` depends on `command`:
/// - place: limit price and quantity
/// - move: new price (0 = keep) and new remaining size (0 = keep)
/// - order book request: `size` is the requested depth per side
#[derive(Clone, Debug, PartialEq)]
pub struct OrderCommand {
    pub command: CommandType,
    /// External order ID (client-assigned)
    pub order_id: u64,
    /// Owner identity, opaque to the book
    pub uid: u64,
    pub price: u64,
    pub size: u64,
    pub action: Side,
    pub mode: OrderMode,
    /// Arrival sequence assigned by the sequencer
    pub timestamp: u64,
    /// Opaque pass-through
    pub user_cookie: i32,
    pub result_code: ResultCode,
    /// Events produced while processing this command
    pub events: Vec<MatcherEvent>,
    /// Filled by order book requests
    pub market_data: Option<L2MarketData>,
}

impl OrderCommand {
    fn blank(command: CommandType) -> Self {
        Self {
            command,
            order_id: 0,
            uid: 0,
            price: 0,
            size: 0,
            action: Side::Bid,
            mode: OrderMode::Gtc,
            timestamp: 0,
            user_cookie: 0,
            result_code: ResultCode::New,
            events: Vec::new(),
            market_data: None,
        }
    }

    /// A place command already marked valid for matching.
    pub fn place(
        mode: OrderMode,
        order_id: u64,
        uid: u64,
        price: u64,
        size: u64,
        action: Side,
    ) -> Self {
        Self {
            order_id,
            uid,
            price,
            size,
            action,
            mode,
            timestamp: order_id,
            result_code: ResultCode::ValidForMatchingEngine,
            ..Self::blank(CommandType::PlaceOrder)
        }
    }

    pub fn cancel(order_id: u64, uid: u64) -> Self {
        Self {
            order_id,
            uid,
            ..Self::blank(CommandType::CancelOrder)
        }
    }

    /// Move to `new_price` (0 keeps the price) and/or down to `new_size`.
    ///
    /// Like `place`, the timestamp defaults to the order id.
    pub fn move_order(order_id: u64, uid: u64, new_price: u64, new_size: u64) -> Self {
        Self {
            order_id,
            uid,
            price: new_price,
            size: new_size,
            timestamp: order_id,
            ..Self::blank(CommandType::MoveOrder)
        }
    }

    /// Depth request; a negative depth asks for every level.
    pub fn depth_request(depth: i64) -> Self {
        Self {
            size: u64::try_from(depth).unwrap_or(u64::MAX),
            ..Self::blank(CommandType::OrderBookRequest)
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Requested depth for an order book request (`None` = all levels).
    pub fn requested_depth(&self) -> Option<usize> {
        match usize::try_from(self.size) {
            Ok(depth) if self.size < u64::MAX => Some(depth),
            _ => None,
        }
    }

    /// Trades produced by this command, in execution order.
    pub fn trades(&self) -> impl Iterator<Item = &TradeEvent> {
        self.events.iter().filter_map(|e| match e {
            MatcherEvent::Trade(t) => Some(t),
            _ => None,
        })
    }

    pub fn rejects(&self) -> impl Iterator<Item = &RejectEvent> {
        self.events.iter().filter_map(|e| match e {
            MatcherEvent::Reject(r) => Some(r),
            _ => None,
        })
    }
}

// ============================================================================
// Output Events
// ============================================================================

/// A trade was executed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Aggressive (incoming) order ID
    pub active_order_id: u64,
    pub active_uid: u64,
    /// Side of the incoming order
    pub active_action: Side,
    /// True if the incoming order has nothing left to match
    pub active_order_completed: bool,
    /// Resting order ID
    pub matched_order_id: u64,
    pub matched_uid: u64,
    /// True if the resting order was fully filled and left the book
    pub matched_order_completed: bool,
    /// Execution price (always the resting order's price)
    pub price: u64,
    /// Executed quantity
    pub size: u64,
}

/// Unmatched remainder of an IOC order was discarded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectEvent {
    pub order_id: u64,
    pub uid: u64,
    pub price: u64,
    pub unmatched_size: u64,
}

/// A resting order lost volume without trading (cancel or downsize)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceEvent {
    pub order_id: u64,
    pub uid: u64,
    pub price: u64,
    pub reduced_size: u64,
    /// True if the order left the book
    pub order_completed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatcherEvent {
    Trade(TradeEvent),
    Reject(RejectEvent),
    Reduce(ReduceEvent),
}
