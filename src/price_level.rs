//! Price Level - FIFO queue of resting orders at one price.
//!
//! The queue is a doubly-linked list threaded through the arena's
//! `next`/`prev` fields, so any member can be unlinked in O(1). `total_qty`
//! always equals the sum of the members' remaining sizes and is adjusted
//! on every mutation, never recomputed.

use crate::arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};

/// Orders at one price, oldest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceLevel {
    /// Oldest order, first to match
    pub head: ArenaIndex,
    /// Newest order
    pub tail: ArenaIndex,
    /// Sum of members' remaining quantity
    pub total_qty: u64,
    pub count: u32,
}

impl PriceLevel {
    #[inline]
    pub const fn new() -> Self {
        Self {
            head: NULL_INDEX,
            tail: NULL_INDEX,
            total_qty: 0,
            count: 0,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Slot of the order with time priority, if any.
    #[inline]
    pub const fn front(&self) -> Option<ArenaIndex> {
        if self.head == NULL_INDEX {
            None
        } else {
            Some(self.head)
        }
    }

    /// Queue an unlinked order behind every existing member.
    #[inline]
    pub fn push_back(&mut self, arena: &mut Arena, index: ArenaIndex) {
        let tail = self.tail;
        let node = arena.get_mut(index);
        debug_assert!(!node.is_linked(), "order {} already queued", node.order_id);
        node.prev = tail;
        node.next = NULL_INDEX;
        self.total_qty += node.remaining();

        match tail {
            NULL_INDEX => self.head = index,
            _ => arena.get_mut(tail).next = index,
        }
        self.tail = index;
        self.count += 1;
    }

    /// Unlink the front order. Its slot stays live in the arena.
    #[inline]
    pub fn pop_front(&mut self, arena: &mut Arena) -> Option<ArenaIndex> {
        let head = self.front()?;
        self.unlink(arena, head);
        Some(head)
    }

    /// Unlink `index` from anywhere in the queue; returns whether the
    /// level is now empty. The slot stays live in the arena.
    #[inline]
    pub fn remove(&mut self, arena: &mut Arena, index: ArenaIndex) -> bool {
        self.unlink(arena, index);
        self.is_empty()
    }

    fn unlink(&mut self, arena: &mut Arena, index: ArenaIndex) {
        let node = arena.get_mut(index);
        let (prev, next) = (node.prev, node.next);
        node.prev = NULL_INDEX;
        node.next = NULL_INDEX;
        let qty = node.remaining();

        match prev {
            NULL_INDEX => {
                debug_assert_eq!(self.head, index);
                self.head = next;
            }
            _ => arena.get_mut(prev).next = next,
        }
        match next {
            NULL_INDEX => {
                debug_assert_eq!(self.tail, index);
                self.tail = prev;
            }
            _ => arena.get_mut(next).prev = prev,
        }

        debug_assert!(self.count > 0 && self.total_qty >= qty);
        self.count -= 1;
        self.total_qty -= qty;
    }

    /// Account for `qty` taken off a member in place (fill or downsize).
    #[inline]
    pub fn reduce(&mut self, qty: u64) {
        debug_assert!(self.total_qty >= qty);
        self.total_qty -= qty;
    }

    #[inline]
    pub fn iter<'a>(&self, arena: &'a Arena) -> LevelIter<'a> {
        LevelIter {
            arena,
            cursor: self.head,
        }
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Members of one level in time priority.
pub struct LevelIter<'a> {
    arena: &'a Arena,
    cursor: ArenaIndex,
}

impl<'a> Iterator for LevelIter<'a> {
    type Item = &'a OrderNode;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NULL_INDEX {
            return None;
        }
        let node = self.arena.get(self.cursor);
        self.cursor = node.next;
        Some(node)
    }
}

/// Read-only view of one bucket, the same for every side representation.
#[derive(Clone, Copy)]
pub struct BucketView<'a> {
    pub price: u64,
    level: &'a PriceLevel,
    arena: &'a Arena,
}

impl<'a> BucketView<'a> {
    #[inline]
    pub fn new(price: u64, level: &'a PriceLevel, arena: &'a Arena) -> Self {
        Self {
            price,
            level,
            arena,
        }
    }

    /// Cached aggregate remaining volume
    #[inline]
    pub fn total_volume(&self) -> u64 {
        self.level.total_qty
    }

    #[inline]
    pub fn num_orders(&self) -> u32 {
        self.level.count
    }

    #[inline]
    pub fn orders(&self) -> LevelIter<'a> {
        self.level.iter(self.arena)
    }
}

impl std::fmt::Debug for BucketView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("price", &self.price)
            .field("volume", &self.total_volume())
            .field("orders", &self.orders().map(|o| o.order_id).collect::<Vec<_>>())
            .finish()
    }
}
