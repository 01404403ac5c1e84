//! Command dispatch shared by every order book representation.

use tracing::debug;

use crate::command::{CommandType, OrderCommand, ResultCode};
use crate::order_book::OrderBook;
use crate::snapshot::l2_snapshot;

/// Execute one command against `book` and record its result code.
///
/// A place command only runs when upstream marked it
/// `ValidForMatchingEngine`; any other pre-set code is echoed back with
/// the book untouched.
pub fn process_command<B: OrderBook + ?Sized>(book: &mut B, cmd: &mut OrderCommand) -> ResultCode {
    let result = match cmd.command {
        CommandType::PlaceOrder => {
            if cmd.result_code != ResultCode::ValidForMatchingEngine {
                return cmd.result_code;
            }
            book.new_order(cmd)
        }
        CommandType::CancelOrder => {
            if book.cancel_order(cmd) {
                ResultCode::Success
            } else {
                ResultCode::MatchingUnknownOrderId
            }
        }
        CommandType::MoveOrder => book.move_order(cmd),
        CommandType::OrderBookRequest => {
            cmd.market_data = Some(l2_snapshot(book, cmd.requested_depth()));
            ResultCode::Success
        }
        CommandType::BalanceAdjustment | CommandType::Nop => {
            debug!(command = ?cmd.command, symbol = book.symbol_id(), "unsupported command");
            ResultCode::MatchingUnsupportedCommand
        }
    };
    cmd.result_code = result;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{OrderMode, Side};
    use crate::config::BookConfig;
    use crate::order_book::{create, OrderBookImplType, SymbolType};

    fn book() -> Box<dyn OrderBook> {
        create(
            OrderBookImplType::Naive,
            3,
            SymbolType::CurrencyExchangePair,
            BookConfig::default(),
        )
    }

    #[test]
    fn test_place_requires_validation() {
        let mut book = book();
        let mut cmd = OrderCommand::place(OrderMode::Gtc, 1, 1, 100, 10, Side::Bid);
        cmd.result_code = ResultCode::RiskNsf;

        assert_eq!(process_command(book.as_mut(), &mut cmd), ResultCode::RiskNsf);
        assert_eq!(cmd.result_code, ResultCode::RiskNsf);
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_place_cancel_roundtrip() {
        let mut book = book();
        let mut place = OrderCommand::place(OrderMode::Gtc, 1, 1, 100, 10, Side::Bid);
        assert_eq!(process_command(book.as_mut(), &mut place), ResultCode::Success);

        let mut cancel = OrderCommand::cancel(1, 1);
        assert_eq!(process_command(book.as_mut(), &mut cancel), ResultCode::Success);

        let mut again = OrderCommand::cancel(1, 1);
        assert_eq!(
            process_command(book.as_mut(), &mut again),
            ResultCode::MatchingUnknownOrderId
        );
    }

    #[test]
    fn test_move_unknown() {
        let mut book = book();
        let mut cmd = OrderCommand::move_order(42, 1, 100, 0);
        assert_eq!(
            process_command(book.as_mut(), &mut cmd),
            ResultCode::MatchingUnknownOrderId
        );
    }

    #[test]
    fn test_depth_request_attaches_snapshot() {
        let mut book = book();
        for (id, price) in [(1, 100), (2, 99), (3, 98)] {
            let mut cmd = OrderCommand::place(OrderMode::Gtc, id, 1, price, 5, Side::Bid);
            process_command(book.as_mut(), &mut cmd);
        }

        let mut cmd = OrderCommand::depth_request(2);
        assert_eq!(process_command(book.as_mut(), &mut cmd), ResultCode::Success);
        let data = cmd.market_data.expect("snapshot attached");
        assert_eq!(data.bids.len(), 2);
        assert_eq!(data.bids[0].price, 100);
        assert!(data.asks.is_empty());
    }

    #[test]
    fn test_unsupported_command() {
        let mut book = book();
        let mut cmd = OrderCommand::place(OrderMode::Gtc, 1, 1, 100, 10, Side::Bid);
        cmd.command = CommandType::BalanceAdjustment;

        assert_eq!(
            process_command(book.as_mut(), &mut cmd),
            ResultCode::MatchingUnsupportedCommand
        );
        assert_eq!(book.order_count(), 0);
    }
}
