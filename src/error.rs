//! Error types.
//!
//! Expected command outcomes are `ResultCode`s, not errors. The types here
//! cover configuration mistakes, unusable persisted state, and structural
//! corruption found by the diagnostics pass.

use thiserror::Error;

use crate::command::Side;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("hot zone width must be positive")]
    ZeroHotWidth,

    #[error("recenter margin {margin} leaves no usable window of width {width}")]
    MarginTooWide { margin: u32, width: u32 },
}

/// Persisted book state could not be loaded. There is no partial recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("empty input, no implementation tag")]
    MissingTag,

    #[error("unknown order book implementation tag {0}")]
    UnknownTag(u8),

    #[error("truncated state: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("{0} trailing bytes after book state")]
    TrailingBytes(usize),

    #[error("{side:?} bucket at price {price} has no orders")]
    EmptyBucket { side: Side, price: u64 },

    #[error("{side:?} bucket at price {price} is out of priority order")]
    BucketOrder { side: Side, price: u64 },

    #[error("order {order_id} has zero remaining size")]
    ZeroRemaining { order_id: u64 },

    #[error("order {order_id} has invalid mode code {code}")]
    InvalidMode { order_id: u64, code: u8 },

    #[error("duplicate order id {0}")]
    DuplicateOrderId(u64),

    #[error("restored book is crossed: bid {bid} >= ask {ask}")]
    Crossed { bid: u64, ask: u64 },

    #[error("order slots exhausted")]
    CapacityExceeded,

    #[error("{side:?} bucket at price {price} holds more than u64::MAX")]
    VolumeOverflow { side: Side, price: u64 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Structural corruption reported by `validate_internal_state`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookCorruption {
    #[error("{side:?} bucket at price {price} is empty")]
    EmptyBucket { side: Side, price: u64 },

    #[error("{side:?} bucket at price {price}: cached volume {cached}, actual {actual}")]
    VolumeMismatch {
        side: Side,
        price: u64,
        cached: u64,
        actual: u64,
    },

    #[error("{side:?} bucket at price {price}: cached count {cached}, actual {actual}")]
    CountMismatch {
        side: Side,
        price: u64,
        cached: u32,
        actual: u32,
    },

    #[error("{side:?} bucket at price {price}: broken queue links at order {order_id}")]
    BrokenLink { side: Side, price: u64, order_id: u64 },

    #[error("order {order_id} does not belong in {side:?} bucket at price {price}")]
    MisplacedOrder { side: Side, price: u64, order_id: u64 },

    #[error("order {order_id} is fully filled but still resting")]
    FilledOrderResting { order_id: u64 },

    #[error("IOC order {order_id} is resting")]
    IocResting { order_id: u64 },

    #[error("order {order_id} is missing from the lookup index or points elsewhere")]
    LookupMismatch { order_id: u64 },

    #[error("order {order_id} appears more than once")]
    DuplicateOrder { order_id: u64 },

    #[error("{side:?} side out of priority order at price {price}")]
    PriorityOrder { side: Side, price: u64 },

    #[error("book is crossed: bid {bid} >= ask {ask}")]
    Crossed { bid: u64, ask: u64 },

    #[error("lookup index holds {indexed} orders, buckets hold {resting}")]
    OrderCount { indexed: usize, resting: usize },

    #[error("{side:?} side cached best price {cached:?}, actual {actual:?}")]
    BestPrice {
        side: Side,
        cached: Option<u64>,
        actual: Option<u64>,
    },

    #[error("{side:?} hot zone: {detail}")]
    HotZone { side: Side, detail: String },
}
