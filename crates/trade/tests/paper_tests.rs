use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tupo_core::test_utils::MockFeed;
use tupo_core::trade::port::{TradeError, TradePort};
use tupo_trade::paper::PaperTrader;

const TICKER: &str = "KRW-BTC";

fn trader(initial_cash: Decimal, price: f64) -> (Arc<MockFeed>, PaperTrader) {
    let feed = Arc::new(MockFeed::new(Vec::new(), price));
    let trader = PaperTrader::new(feed.clone(), initial_cash);
    (feed, trader)
}

#[tokio::test]
async fn test_buy_deducts_cash_and_records_position() {
    let (_feed, trader) = trader(dec!(1_000_000), 50_000.0);

    let outcome = trader.buy(TICKER, dec!(100_000)).await.unwrap();
    // 手续费 0.05%：净额 99,950 / 50,000 = 1.999
    assert_eq!(outcome.avg_price, dec!(50_000));
    assert_eq!(outcome.volume, dec!(1.999));

    let snapshot = trader.snapshot().await;
    assert_eq!(snapshot.cash, dec!(900_000));
    assert_eq!(snapshot.positions.get(TICKER), Some(&dec!(1.999)));
}

#[tokio::test]
async fn test_buy_rejects_insufficient_funds() {
    let (_feed, trader) = trader(dec!(50_000), 50_000.0);

    let err = trader.buy(TICKER, dec!(100_000)).await.unwrap_err();
    assert!(matches!(err, TradeError::InsufficientFunds { .. }));

    // 失败的委托不产生任何状态变更
    let snapshot = trader.snapshot().await;
    assert_eq!(snapshot.cash, dec!(50_000));
    assert!(snapshot.positions.is_empty());
}

#[tokio::test]
async fn test_sell_rejects_insufficient_position() {
    let (_feed, trader) = trader(dec!(1_000_000), 50_000.0);

    let err = trader.sell(TICKER, dec!(1)).await.unwrap_err();
    assert!(matches!(err, TradeError::InsufficientPosition { .. }));
}

#[tokio::test]
async fn test_round_trip_pays_fees_both_ways() {
    let (_feed, trader) = trader(dec!(1_000_000), 50_000.0);

    let bought = trader.buy(TICKER, dec!(100_000)).await.unwrap();
    let sold = trader.sell(TICKER, bought.volume).await.unwrap();
    assert_eq!(sold.volume, bought.volume);

    let snapshot = trader.snapshot().await;
    // 双边手续费导致现金低于初始值，持仓清零后条目被移除
    assert!(snapshot.cash < dec!(1_000_000));
    assert!(snapshot.cash > dec!(999_000));
    assert!(snapshot.positions.is_empty());
}

#[tokio::test]
async fn test_partial_sell_keeps_remaining_position() {
    let (_feed, trader) = trader(dec!(1_000_000), 50_000.0);

    trader.buy(TICKER, dec!(100_000)).await.unwrap();
    trader.sell(TICKER, dec!(1)).await.unwrap();

    let snapshot = trader.snapshot().await;
    assert_eq!(snapshot.positions.get(TICKER), Some(&dec!(0.999)));
}

#[tokio::test]
async fn test_rejects_non_positive_fill_price() {
    let (feed, trader) = trader(dec!(1_000_000), 50_000.0);
    feed.set_price(0.0);

    let err = trader.buy(TICKER, dec!(100_000)).await.unwrap_err();
    assert!(matches!(err, TradeError::InternalError(_)));
}
