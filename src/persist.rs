//! Binary persistence of book state.
//!
//! # Format
//!
//! All integers little-endian.
//!
//! ```text
//! u8   implementation tag (0 = Naive, 1 = Fast)
//! asks, then bids:
//!   u32  bucket count
//!   per bucket, in priority order:
//!     u64  price
//!     u32  order count (> 0)
//!     per order, in queue order:
//!       u64 order_id | u64 uid | u64 remaining (> 0) | u8 mode | u64 timestamp
//! ```
//!
//! Both representations write the same body, so state written by one can
//! be loaded as the other. The hot-zone window is not stored; it follows
//! the best price on reload. A restored order has `size == remaining`.

use tracing::warn;

use crate::arena::OrderNode;
use crate::book_side::{BookSide, TreeSide};
use crate::command::{OrderMode, Side};
use crate::config::BookConfig;
use crate::error::PersistError;
use crate::hot_zone::HotZoneSide;
use crate::order_book::{LimitBook, OrderBook, OrderBookImplType, RestError, SymbolType};

const BUCKET_HEADER_LEN: usize = 8 + 4;
const ORDER_RECORD_LEN: usize = 8 + 8 + 8 + 1 + 8;

/// Append the persisted form of `book` to `out`.
pub fn write_state<B: OrderBook + ?Sized>(book: &B, out: &mut Vec<u8>) {
    out.push(book.impl_type().code());
    for side in [Side::Ask, Side::Bid] {
        let count = book.total_buckets(side) as u32;
        out.extend_from_slice(&count.to_le_bytes());
        for bucket in book.buckets(side) {
            out.extend_from_slice(&bucket.price.to_le_bytes());
            out.extend_from_slice(&bucket.num_orders().to_le_bytes());
            for order in bucket.orders() {
                out.extend_from_slice(&order.order_id.to_le_bytes());
                out.extend_from_slice(&order.uid.to_le_bytes());
                out.extend_from_slice(&order.remaining().to_le_bytes());
                out.push(order.mode.code());
                out.extend_from_slice(&order.timestamp.to_le_bytes());
            }
        }
    }
}

/// Persisted form of `book`.
pub fn serialize<B: OrderBook + ?Sized>(book: &B) -> Vec<u8> {
    let buckets = book.total_buckets(Side::Ask) + book.total_buckets(Side::Bid);
    let mut out = Vec::with_capacity(
        1 + 2 * 4 + buckets * BUCKET_HEADER_LEN + book.order_count() * ORDER_RECORD_LEN,
    );
    write_state(book, &mut out);
    out
}

/// Rebuild a book as the representation named by the state's tag.
pub fn deserialize(
    bytes: &[u8],
    symbol_id: u32,
    symbol_type: SymbolType,
    config: BookConfig,
) -> Result<Box<dyn OrderBook>, PersistError> {
    let impl_type = match read_tag(bytes) {
        Ok(impl_type) => impl_type,
        Err(e) => {
            warn!(symbol = symbol_id, error = %e, "rejected persisted order book");
            return Err(e);
        }
    };
    deserialize_as(impl_type, bytes, symbol_id, symbol_type, config)
}

/// Rebuild a book as `impl_type`, whichever representation wrote it.
pub fn deserialize_as(
    impl_type: OrderBookImplType,
    bytes: &[u8],
    symbol_id: u32,
    symbol_type: SymbolType,
    config: BookConfig,
) -> Result<Box<dyn OrderBook>, PersistError> {
    let restored = match impl_type {
        OrderBookImplType::Naive => restore::<TreeSide>(bytes, symbol_id, symbol_type, config)
            .map(|book| Box::new(book) as Box<dyn OrderBook>),
        OrderBookImplType::Fast => restore::<HotZoneSide>(bytes, symbol_id, symbol_type, config)
            .map(|book| Box::new(book) as Box<dyn OrderBook>),
    };
    if let Err(e) = &restored {
        warn!(symbol = symbol_id, ?impl_type, error = %e, "rejected persisted order book");
    }
    restored
}

fn read_tag(bytes: &[u8]) -> Result<OrderBookImplType, PersistError> {
    let tag = *bytes.first().ok_or(PersistError::MissingTag)?;
    OrderBookImplType::from_code(tag).ok_or(PersistError::UnknownTag(tag))
}

/// Rebuild a concrete book from persisted state.
pub fn restore<S: BookSide>(
    bytes: &[u8],
    symbol_id: u32,
    symbol_type: SymbolType,
    config: BookConfig,
) -> Result<LimitBook<S>, PersistError> {
    config.validate()?;
    read_tag(bytes)?;

    let mut reader = StateReader::new(&bytes[1..], 1);
    let mut book = LimitBook::<S>::new(symbol_id, symbol_type, config);
    for side in [Side::Ask, Side::Bid] {
        restore_side(&mut book, &mut reader, side)?;
    }
    reader.finish()?;

    if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
        if bid >= ask {
            return Err(PersistError::Crossed { bid, ask });
        }
    }
    Ok(book)
}

fn restore_side<S: BookSide>(
    book: &mut LimitBook<S>,
    reader: &mut StateReader<'_>,
    side: Side,
) -> Result<(), PersistError> {
    let buckets = reader.u32()?;
    let mut previous: Option<u64> = None;

    for _ in 0..buckets {
        let price = reader.u64()?;
        let count = reader.u32()?;
        if count == 0 {
            return Err(PersistError::EmptyBucket { side, price });
        }
        if previous.is_some_and(|prev| !side.is_better(prev, price)) {
            return Err(PersistError::BucketOrder { side, price });
        }
        previous = Some(price);

        for _ in 0..count {
            let order_id = reader.u64()?;
            let uid = reader.u64()?;
            let remaining = reader.u64()?;
            let mode = reader.u8()?;
            let timestamp = reader.u64()?;

            if remaining == 0 {
                return Err(PersistError::ZeroRemaining { order_id });
            }
            if OrderMode::from_code(mode) != Some(OrderMode::Gtc) {
                return Err(PersistError::InvalidMode { order_id, code: mode });
            }
            if book.contains_order(order_id) {
                return Err(PersistError::DuplicateOrderId(order_id));
            }

            let node = OrderNode {
                price,
                size: remaining,
                order_id,
                uid,
                timestamp,
                action: side,
                mode: OrderMode::Gtc,
                ..OrderNode::empty()
            };
            book.insert_order(node).map_err(|err| match err {
                RestError::Capacity => PersistError::CapacityExceeded,
                RestError::VolumeOverflow => PersistError::VolumeOverflow { side, price },
            })?;
        }
    }
    Ok(())
}

/// Little-endian cursor over persisted bytes.
struct StateReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Offset of `bytes[0]` in the full input, for error reporting
    base: usize,
}

impl<'a> StateReader<'a> {
    fn new(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, pos: 0, base }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], PersistError> {
        let chunk = self
            .bytes
            .get(self.pos..self.pos + N)
            .ok_or(PersistError::Truncated {
                offset: self.base + self.pos,
                needed: N,
            })?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(chunk);
        self.pos += N;
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, PersistError> {
        Ok(self.take::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, PersistError> {
        self.take().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Result<u64, PersistError> {
        self.take().map(u64::from_le_bytes)
    }

    fn finish(&self) -> Result<(), PersistError> {
        match self.bytes.len() - self.pos {
            0 => Ok(()),
            extra => Err(PersistError::TrailingBytes(extra)),
        }
    }
}
