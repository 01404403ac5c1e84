//! Depth snapshots (L2 market data) built from the read-only bucket
//! accessors, so every representation produces the same view.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::command::Side;
use crate::order_book::{Order, OrderBook};
use crate::price_level::BucketView;

/// Levels per side in the fixed-capacity publish form.
pub const L2_SIZE: usize = 32;

/// Aggregated view of one price level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: u64,
    /// Sum of remaining sizes
    pub volume: u64,
    pub orders: u32,
}

impl From<BucketView<'_>> for DepthLevel {
    fn from(bucket: BucketView<'_>) -> Self {
        Self {
            price: bucket.price,
            volume: bucket.total_volume(),
            orders: bucket.num_orders(),
        }
    }
}

/// Both sides of the book, best level first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2MarketData {
    pub asks: Vec<DepthLevel>,
    pub bids: Vec<DepthLevel>,
}

/// Up to `depth` levels per side (`None` = every level).
pub fn l2_snapshot<B: OrderBook + ?Sized>(book: &B, depth: Option<usize>) -> L2MarketData {
    let levels = |side| -> Vec<DepthLevel> {
        let limit = depth.unwrap_or(usize::MAX);
        book.buckets(side).take(limit).map(DepthLevel::from).collect()
    };
    L2MarketData {
        asks: levels(Side::Ask),
        bids: levels(Side::Bid),
    }
}

/// Fixed-capacity snapshot for publishing without heap allocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct L2Fixed {
    pub asks: ArrayVec<DepthLevel, L2_SIZE>,
    pub bids: ArrayVec<DepthLevel, L2_SIZE>,
}

/// Overwrite `out` with the top `L2_SIZE` levels per side.
pub fn publish_l2<B: OrderBook + ?Sized>(book: &B, out: &mut L2Fixed) {
    out.asks.clear();
    out.bids.clear();
    out.asks
        .extend(book.buckets(Side::Ask).take(L2_SIZE).map(DepthLevel::from));
    out.bids
        .extend(book.buckets(Side::Bid).take(L2_SIZE).map(DepthLevel::from));
}

/// All resting orders owned by `uid`, asks first.
///
/// Walks the whole book; not for the hot path.
pub fn find_user_orders<B: OrderBook + ?Sized>(book: &B, uid: u64) -> Vec<Order> {
    let mut found = Vec::new();
    for side in [Side::Ask, Side::Bid] {
        for bucket in book.buckets(side) {
            found.extend(bucket.orders().filter(|o| o.uid == uid).map(Order::from));
        }
    }
    found
}
