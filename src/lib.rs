//! # matchbook
//!
//! Deterministic limit order book and matching core for a single
//! instrument.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: One thread owns a book exclusively (no locks)
//! - **Price-Time Priority**: Best price first, FIFO within a price
//! - **Cache-Optimized**: 64-byte aligned order nodes, 32-bit slot indices
//! - **Interchangeable Representations**: an ordered-map book and a
//!   hot-zone book with identical observable behavior
//!
//! ## Architecture
//!
//! ```text
//! [Sequencer] --> [SPSC Ring Buffer] --> [Engine Thread (Pinned)]
//!                                               |
//!                                  process_command(&mut dyn OrderBook)
//!                                               |
//!                              [Commands + Trade/Reject/Reduce Events]
//! ```
//!
//! Snapshots, fingerprints and persistence are free functions over the
//! read-only [`OrderBook`] accessors, so they behave the same for every
//! representation.

pub mod arena;
pub mod book_side;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod hot_zone;
pub mod matching;
pub mod order_book;
pub mod persist;
pub mod price_level;
pub mod snapshot;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};
pub use book_side::{BookSide, TreeSide};
pub use command::{
    CommandType, MatcherEvent, OrderCommand, OrderMode, ReduceEvent, RejectEvent, ResultCode,
    Side, TradeEvent,
};
pub use config::{BookConfig, MoveSizePolicy};
pub use dispatch::process_command;
pub use engine::Engine;
pub use error::{BookCorruption, ConfigError, PersistError};
pub use fingerprint::{books_equal, state_hash};
pub use hot_zone::HotZoneSide;
pub use order_book::{
    create, FastOrderBook, LimitBook, NaiveOrderBook, Order, OrderBook, OrderBookImplType,
    SymbolType,
};
pub use persist::{deserialize, deserialize_as, serialize};
pub use price_level::{BucketView, PriceLevel};
pub use snapshot::{find_user_orders, l2_snapshot, publish_l2, DepthLevel, L2Fixed, L2MarketData};
