use tupo_core::common::TimeFrame;
use tupo_core::market::port::ExchangeFeed;
use tupo_feed::upbit::UpbitFeed;

/// # Summary
/// Upbit 行情获取的集成测试（访问真实交易所，默认跳过）。
///
/// # Logic
/// 1. 初始化 UpbitFeed。
/// 2. 抓取 KRW-BTC 最近 504 根小时线（跨三页）。
/// 3. 断言根数与升序排列。
#[tokio::test]
#[ignore = "hits the live Upbit API"]
async fn test_upbit_real_fetch_paginates() -> anyhow::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let feed = UpbitFeed::new()?;

    let candles = feed.fetch_candles("KRW-BTC", TimeFrame::Hour1, 504).await?;
    assert_eq!(candles.len(), 504);
    assert!(candles.windows(2).all(|w| w[0].time < w[1].time));

    println!(
        "Fetched {} hourly candles, last close = {}",
        candles.len(),
        candles[candles.len() - 1].close
    );
    Ok(())
}

/// # Summary
/// Upbit 现价获取的集成测试（访问真实交易所，默认跳过）。
#[tokio::test]
#[ignore = "hits the live Upbit API"]
async fn test_upbit_real_current_price() -> anyhow::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let feed = UpbitFeed::new()?;

    let price = feed.current_price("KRW-BTC").await?;
    assert!(price > 0.0);
    Ok(())
}
