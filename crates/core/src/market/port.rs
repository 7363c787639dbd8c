use crate::common::TimeFrame;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 交易所行情数据提供者接口（原始数据源）。
/// 聚合器与采集器只依赖此端口，不感知具体交易所的报文结构。
///
/// # Invariants
/// - 重试与退避是实现方的责任，本端口的调用方只做"成功或放弃本轮"处理。
/// - 返回的 K 线应按时间升序排列，调用方不依赖该顺序做正确性假设。
#[async_trait]
pub trait ExchangeFeed: Send + Sync {
    /// # Summary
    /// 获取特定标的最近 `count` 根指定周期的 K 线。
    ///
    /// # Logic
    /// 1. 构建数据源请求。
    /// 2. 执行网络请求并解析响应数据。
    ///
    /// # Arguments
    /// * `ticker`: 标的代码。
    /// * `timeframe`: K 线周期。
    /// * `count`: 请求根数。
    ///
    /// # Returns
    /// 成功返回 K 线列表，失败返回 MarketError。
    async fn fetch_candles(
        &self,
        ticker: &str,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError>;

    /// # Summary
    /// 获取特定标的当前成交价。
    ///
    /// # Arguments
    /// * `ticker`: 标的代码。
    ///
    /// # Returns
    /// 成功返回最新价，失败返回 MarketError。
    async fn current_price(&self, ticker: &str) -> Result<f64, MarketError>;
}
