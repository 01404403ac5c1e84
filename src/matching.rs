//! Matching - place, cancel and move for [`LimitBook`].
//!
//! Implements the cross/rest algorithm:
//! 1. CROSSING: Match the incoming order against the opposite side,
//!    best price first, FIFO within a level
//! 2. RESTING: Place the GTC remainder in the book (IOC remainder is
//!    rejected)
//!
//! A move to a new price is a cancel followed by a re-entry through the
//! same two phases, so a move can trade but never leaves the book crossed.

use crate::arena::OrderNode;
use crate::book_side::BookSide;
use crate::command::{
    MatcherEvent, OrderCommand, OrderMode, ReduceEvent, RejectEvent, ResultCode, Side, TradeEvent,
};
use crate::config::MoveSizePolicy;
use crate::order_book::{LimitBook, RestError};

/// The aggressive side of a match
#[derive(Clone, Copy, Debug)]
struct Taker {
    order_id: u64,
    uid: u64,
    price: u64,
    action: Side,
}

/// Check if an incoming limit price crosses the opposite best price.
#[inline]
fn prices_cross(order_price: u64, opposite_best: u64, order_side: Side) -> bool {
    match order_side {
        // Buyer willing to pay >= lowest ask
        Side::Bid => order_price >= opposite_best,
        // Seller willing to accept <= highest bid
        Side::Ask => order_price <= opposite_best,
    }
}

impl<S: BookSide> LimitBook<S> {
    /// Process a place order command.
    ///
    /// # Algorithm
    /// 1. Reject a duplicate order ID
    /// 2. Cross against the opposite side
    /// 3. Rest (GTC) or reject (IOC) whatever is left
    pub(crate) fn place(&mut self, cmd: &mut OrderCommand) -> ResultCode {
        if cmd.size == 0 {
            return ResultCode::Success;
        }
        if self.order_map.contains_key(&cmd.order_id) {
            return ResultCode::MatchingDuplicateOrderId;
        }

        let taker = Taker {
            order_id: cmd.order_id,
            uid: cmd.uid,
            price: cmd.price,
            action: cmd.action,
        };

        // Phase 1: CROSSING
        let filled = self.cross(&taker, cmd.size, &mut cmd.events);
        if filled == cmd.size {
            return ResultCode::Success;
        }

        // Phase 2: RESTING
        match cmd.mode {
            OrderMode::Ioc => {
                cmd.events.push(MatcherEvent::Reject(RejectEvent {
                    order_id: cmd.order_id,
                    uid: cmd.uid,
                    price: cmd.price,
                    unmatched_size: cmd.size - filled,
                }));
                ResultCode::Success
            }
            OrderMode::Gtc => {
                let node = OrderNode {
                    price: cmd.price,
                    size: cmd.size,
                    filled,
                    order_id: cmd.order_id,
                    uid: cmd.uid,
                    timestamp: cmd.timestamp,
                    user_cookie: cmd.user_cookie,
                    action: cmd.action,
                    mode: OrderMode::Gtc,
                    ..OrderNode::empty()
                };
                self.rest(node, &mut cmd.events)
            }
        }
    }

    /// Process a cancel order command.
    ///
    /// Returns false (and changes nothing) if the order is not resting.
    pub(crate) fn cancel(&mut self, cmd: &mut OrderCommand) -> bool {
        let removed = match self.remove_order(cmd.order_id) {
            Some(node) => node,
            None => return false,
        };

        cmd.action = removed.action;
        cmd.events.push(MatcherEvent::Reduce(ReduceEvent {
            order_id: removed.order_id,
            uid: removed.uid,
            price: removed.price,
            reduced_size: removed.remaining(),
            order_completed: true,
        }));
        true
    }

    /// Process a move order command.
    ///
    /// `cmd.price` is the new price (0 keeps the current one) and
    /// `cmd.size` the desired remaining size (0 keeps the current one).
    /// A downsize keeps queue position; a reprice goes to the back of the
    /// destination level.
    pub(crate) fn reprice(&mut self, cmd: &mut OrderCommand) -> ResultCode {
        let info = match self.order_map.get(&cmd.order_id) {
            Some(info) => *info,
            None => return ResultCode::MatchingUnknownOrderId,
        };

        let remaining = self.arena.get(info.arena_index).remaining();
        if cmd.size > remaining && self.config.move_size_policy == MoveSizePolicy::RejectIncrease {
            return ResultCode::MatchingMoveRejectedSizeIncrease;
        }
        cmd.action = info.side;

        if cmd.size > 0 && cmd.size < remaining {
            let delta = remaining - cmd.size;
            let node = self.arena.get_mut(info.arena_index);
            node.size -= delta;
            let uid = node.uid;

            if let Some(level) = self.side_mut(info.side).level_mut(info.price) {
                level.reduce(delta);
            }
            cmd.events.push(MatcherEvent::Reduce(ReduceEvent {
                order_id: cmd.order_id,
                uid,
                price: info.price,
                reduced_size: delta,
                order_completed: false,
            }));
        }

        if cmd.price == 0 || cmd.price == info.price {
            return ResultCode::Success;
        }

        let moved = match self.remove_order(cmd.order_id) {
            Some(node) => node,
            None => return ResultCode::MatchingUnknownOrderId,
        };

        let taker = Taker {
            order_id: moved.order_id,
            uid: moved.uid,
            price: cmd.price,
            action: moved.action,
        };
        let open = moved.remaining();
        let filled = self.cross(&taker, open, &mut cmd.events);
        if filled == open {
            return ResultCode::Success;
        }

        let node = OrderNode {
            price: cmd.price,
            filled: moved.filled + filled,
            timestamp: cmd.timestamp,
            ..moved
        };
        self.rest(node, &mut cmd.events)
    }

    /// Insert a GTC remainder, rejecting it if order slots are exhausted
    /// or its level cannot hold the extra volume.
    fn rest(&mut self, node: OrderNode, events: &mut Vec<MatcherEvent>) -> ResultCode {
        let code = match self.insert_order(node) {
            Ok(_) => return ResultCode::Success,
            Err(RestError::Capacity) => ResultCode::MatchingCapacityExceeded,
            Err(RestError::VolumeOverflow) => ResultCode::MatchingVolumeOverflow,
        };
        events.push(MatcherEvent::Reject(RejectEvent {
            order_id: node.order_id,
            uid: node.uid,
            price: node.price,
            unmatched_size: node.remaining(),
        }));
        code
    }

    /// Cross an incoming order against the opposite side.
    ///
    /// # Returns
    /// Quantity matched, at most `size`
    fn cross(&mut self, taker: &Taker, size: u64, events: &mut Vec<MatcherEvent>) -> u64 {
        let Self {
            arena,
            asks,
            bids,
            order_map,
            ..
        } = self;
        let makers = match taker.action {
            Side::Bid => asks,
            Side::Ask => bids,
        };

        let mut filled = 0u64;

        while filled < size {
            let best = match makers.best_price() {
                Some(price) => price,
                None => break,
            };
            if !prices_cross(taker.price, best, taker.action) {
                break;
            }
            let level = match makers.level_mut(best) {
                Some(level) => level,
                None => break,
            };

            // Match against the level head-first
            while filled < size {
                let Some(maker_idx) = level.front() else {
                    break;
                };

                let maker = arena.get_mut(maker_idx);
                let trade_qty = (size - filled).min(maker.remaining());
                maker.filled += trade_qty;
                let maker_order_id = maker.order_id;
                let maker_uid = maker.uid;
                let maker_completed = maker.remaining() == 0;

                filled += trade_qty;
                level.reduce(trade_qty);

                events.push(MatcherEvent::Trade(TradeEvent {
                    active_order_id: taker.order_id,
                    active_uid: taker.uid,
                    active_action: taker.action,
                    active_order_completed: filled == size,
                    matched_order_id: maker_order_id,
                    matched_uid: maker_uid,
                    matched_order_completed: maker_completed,
                    price: best,
                    size: trade_qty,
                }));

                if maker_completed {
                    level.pop_front(arena);
                    order_map.remove(&maker_order_id);
                    arena.remove(maker_idx);
                }
            }

            if level.is_empty() {
                makers.remove_level(best);
            }
        }

        filled
    }
}
