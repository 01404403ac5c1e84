//! Order slot map.
//!
//! Every resting order occupies one 64-byte slot of a single `Vec`.
//! Price levels link slots by 32-bit index and the order lookup stores
//! the index, so nothing outside the arena owns an order. Vacated slots
//! go on a LIFO free stack and are handed out again before the arena
//! grows. Growth doubles the slot count, so steady-state trading does
//! not allocate.

use std::fmt;

use crate::command::{OrderMode, Side};

/// Link value meaning "no slot"
pub const NULL_INDEX: u32 = u32::MAX;

/// Slot handle. Half the width of a pointer, stable across growth.
pub type ArenaIndex = u32;

/// One resting order, one cache line.
///
/// | Field       | Type  | Offset |
/// |-------------|-------|--------|
/// | price       | u64   | 0      |
/// | size        | u64   | 8      |
/// | filled      | u64   | 16     |
/// | order_id    | u64   | 24     |
/// | uid         | u64   | 32     |
/// | timestamp   | u64   | 40     |
/// | user_cookie | i32   | 48     |
/// | next        | u32   | 52     |
/// | prev        | u32   | 56     |
/// | action      | u8    | 60     |
/// | mode        | u8    | 61     |
#[repr(C)]
#[repr(align(64))]
#[derive(Clone, Copy)]
pub struct OrderNode {
    pub price: u64,
    /// Original quantity, lowered by a downsizing move
    pub size: u64,
    pub filled: u64,
    pub order_id: u64,
    pub uid: u64,
    /// Arrival sequence used for time priority
    pub timestamp: u64,
    pub user_cookie: i32,

    /// Younger neighbour in the price level queue
    pub next: ArenaIndex,
    /// Older neighbour in the price level queue
    pub prev: ArenaIndex,

    pub action: Side,
    pub mode: OrderMode,
}

const _: () = assert!(
    std::mem::size_of::<OrderNode>() == 64,
    "OrderNode must fill exactly one cache line"
);

const _: () = assert!(
    std::mem::align_of::<OrderNode>() == 64,
    "OrderNode must be cache-line aligned"
);

impl OrderNode {
    /// Blank unlinked node, used as a struct-update base.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            price: 0,
            size: 0,
            filled: 0,
            order_id: 0,
            uid: 0,
            timestamp: 0,
            user_cookie: 0,
            next: NULL_INDEX,
            prev: NULL_INDEX,
            action: Side::Bid,
            mode: OrderMode::Gtc,
        }
    }

    #[inline]
    pub const fn remaining(&self) -> u64 {
        self.size - self.filled
    }

    #[inline]
    pub const fn is_linked(&self) -> bool {
        self.next != NULL_INDEX || self.prev != NULL_INDEX
    }
}

impl fmt::Debug for OrderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderNode")
            .field("order_id", &self.order_id)
            .field("uid", &self.uid)
            .field("action", &self.action)
            .field("mode", &self.mode)
            .field("price", &self.price)
            .field("remaining", &self.remaining())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Growable slot map of [`OrderNode`]s.
pub struct Arena {
    slots: Vec<OrderNode>,
    /// Vacant slot indices, most recently vacated on top
    vacant: Vec<ArenaIndex>,
}

impl Arena {
    /// Largest number of slots; `NULL_INDEX` is never handed out.
    pub const MAX_CAPACITY: u32 = NULL_INDEX - 1;

    /// Smallest growth step once the initial slots are used up
    const MIN_GROWTH: u32 = 64;

    /// Arena with `capacity` slots reserved up front.
    pub fn new(capacity: u32) -> Self {
        let mut arena = Self {
            slots: Vec::new(),
            vacant: Vec::new(),
        };
        arena.grow_to(capacity.min(Self::MAX_CAPACITY));
        arena
    }

    fn grow_to(&mut self, target: u32) {
        let current = self.capacity();
        if target <= current {
            return;
        }
        self.slots.resize(target as usize, OrderNode::empty());
        self.vacant.reserve((target - current) as usize);
        // Lowest index ends on top of the stack
        self.vacant.extend((current..target).rev());
    }

    /// Store `node` in a vacant slot and return its index.
    ///
    /// The stored copy starts unlinked whatever links `node` carried.
    /// Returns `None` when `MAX_CAPACITY` orders are already live.
    #[inline]
    pub fn insert(&mut self, node: OrderNode) -> Option<ArenaIndex> {
        if self.vacant.is_empty() {
            let capacity = self.capacity();
            if capacity >= Self::MAX_CAPACITY {
                return None;
            }
            let target = capacity
                .saturating_mul(2)
                .clamp(Self::MIN_GROWTH, Self::MAX_CAPACITY);
            self.grow_to(target);
        }

        let index = self.vacant.pop()?;
        self.slots[index as usize] = OrderNode {
            next: NULL_INDEX,
            prev: NULL_INDEX,
            ..node
        };
        Some(index)
    }

    /// Vacate a live slot and return what it held.
    ///
    /// `index` must be live; releasing a slot twice corrupts the arena.
    #[inline]
    pub fn remove(&mut self, index: ArenaIndex) -> OrderNode {
        debug_assert!(index < self.capacity(), "slot {index} out of range");

        let node = std::mem::replace(&mut self.slots[index as usize], OrderNode::empty());
        self.vacant.push(index);
        node
    }

    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &OrderNode {
        &self.slots[index as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> &mut OrderNode {
        &mut self.slots[index as usize]
    }

    /// Live orders
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots allocated so far, live or vacant
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Touch every slot so its pages are resident before trading starts.
    pub fn warm_up(&mut self) {
        for slot in &mut self.slots {
            // SAFETY: `slot` is a valid, exclusive reference into the Vec
            unsafe {
                std::ptr::write_volatile(&mut slot.user_cookie, slot.user_cookie);
            }
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .field("live", &self.len())
            .finish()
    }
}
