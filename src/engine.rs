//! Engine - per-instrument event loop with CPU pinning and warm-up.
//!
//! Owns one order book and feeds it commands strictly one at a time.
//! With the `runtime` feature the loop reads commands from an rtrb SPSC
//! ring and hands each processed command (result code and events
//! attached) to an output ring.

use tracing::info;

use crate::command::{OrderCommand, ResultCode};
use crate::config::BookConfig;
use crate::dispatch::process_command;
use crate::error::{ConfigError, PersistError};
use crate::fingerprint::state_hash;
use crate::order_book::{create, OrderBook, OrderBookImplType, SymbolType};
use crate::persist;
use crate::snapshot::{l2_snapshot, L2MarketData};

/// Single-writer owner of one instrument's book.
pub struct Engine {
    book: Box<dyn OrderBook>,
}

impl Engine {
    /// Create an engine around an empty book.
    pub fn new(
        impl_type: OrderBookImplType,
        symbol_id: u32,
        symbol_type: SymbolType,
        config: BookConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_book(create(impl_type, symbol_id, symbol_type, config)))
    }

    pub fn from_book(book: Box<dyn OrderBook>) -> Self {
        Self { book }
    }

    /// Resume from persisted state, keeping the representation that wrote it.
    pub fn restore(
        bytes: &[u8],
        symbol_id: u32,
        symbol_type: SymbolType,
        config: BookConfig,
    ) -> Result<Self, PersistError> {
        let book = persist::deserialize(bytes, symbol_id, symbol_type, config)?;
        info!(
            symbol = symbol_id,
            impl_type = ?book.impl_type(),
            orders = book.order_count(),
            "order book restored"
        );
        Ok(Self::from_book(book))
    }

    /// Run the engine event loop.
    ///
    /// # Arguments
    /// * `input` - Consumer end of the command ring buffer
    /// * `output` - Producer end of the processed command ring buffer
    /// * `pin_to_core` - Whether to pin to the last available CPU core
    ///
    /// Returns once the input producer is dropped and the ring is drained.
    #[cfg(feature = "runtime")]
    pub fn run(
        &mut self,
        input: &mut rtrb::Consumer<OrderCommand>,
        output: &mut rtrb::Producer<OrderCommand>,
        pin_to_core: bool,
    ) {
        if pin_to_core {
            self.pin_to_core();
        }
        self.warm_up();
        info!(
            symbol = self.book.symbol_id(),
            impl_type = ?self.book.impl_type(),
            "engine loop started"
        );

        let mut processed = 0u64;
        loop {
            while let Ok(mut cmd) = input.pop() {
                self.process_command(&mut cmd);
                processed += 1;

                // Wait for the consumer unless it is gone
                let mut pending = cmd;
                while let Err(rtrb::PushError::Full(back)) = output.push(pending) {
                    if output.is_abandoned() {
                        break;
                    }
                    pending = back;
                    std::hint::spin_loop();
                }
            }
            if input.is_abandoned() && input.is_empty() {
                break;
            }
            std::hint::spin_loop();
        }

        info!(
            symbol = self.book.symbol_id(),
            processed,
            hash = self.state_hash(),
            "engine loop stopped"
        );
    }

    /// Process a single command in place.
    ///
    /// This is the main entry point for synchronous usage (testing, benchmarks).
    #[inline]
    pub fn process_command(&mut self, cmd: &mut OrderCommand) -> ResultCode {
        process_command(self.book.as_mut(), cmd)
    }

    /// Pin the current thread to the last available CPU core.
    ///
    /// The last core is typically isolated from OS interrupts.
    pub fn pin_to_core(&self) {
        if let Some(core_ids) = core_affinity::get_core_ids() {
            if let Some(last_core) = core_ids.last() {
                core_affinity::set_for_current(*last_core);
            }
        }
    }

    /// Warm up the engine by pre-faulting order storage.
    pub fn warm_up(&mut self) {
        self.book.warm_up();
    }

    #[inline]
    pub fn book(&self) -> &dyn OrderBook {
        self.book.as_ref()
    }

    #[inline]
    pub fn best_bid(&self) -> Option<u64> {
        self.book.best_bid()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<u64> {
        self.book.best_ask()
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    pub fn snapshot(&self, depth: Option<usize>) -> L2MarketData {
        l2_snapshot(self.book.as_ref(), depth)
    }

    /// Deterministic fingerprint of the book content.
    pub fn state_hash(&self) -> u64 {
        state_hash(self.book.as_ref())
    }

    pub fn serialize(&self) -> Vec<u8> {
        persist::serialize(self.book.as_ref())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("symbol_id", &self.book.symbol_id())
            .field("impl_type", &self.book.impl_type())
            .field("order_count", &self.book.order_count())
            .finish()
    }
}
