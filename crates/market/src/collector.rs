use crate::aggregator::aggregate_half_days;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tupo_core::cache::port::{Cache, CacheExt, CacheKind};
use tupo_core::common::{Clock, TimeFrame};
use tupo_core::market::entity::{DataCacheRecord, RollingWindow};
use tupo_core::market::error::MarketError;
use tupo_core::market::port::ExchangeFeed;

/// # Summary
/// 按标的刷新滚动窗口的采集器：缓存优先，缺失或过期时才访问交易所。
///
/// # Invariants
/// - 同一本地日历日内，每个标的最多发起一次小时线拉取。
/// - 缓存损坏、结构不符（根数异常）一律降级为未命中并重新拉取，永不致命。
pub struct DataCollector {
    // 行情数据源端口
    feed: Arc<dyn ExchangeFeed>,
    // 持久化缓存端口
    cache: Arc<dyn Cache>,
    // 时间供给器
    clock: Arc<dyn Clock>,
}

impl DataCollector {
    /// # Summary
    /// 创建 DataCollector 实例，依赖全部通过构造注入。
    ///
    /// # Arguments
    /// * `feed` - 行情数据源端口实现。
    /// * `cache` - 持久化缓存端口实现。
    /// * `clock` - 时间供给器实现。
    ///
    /// # Returns
    /// 初始化后的采集器实例。
    pub fn new(
        feed: Arc<dyn ExchangeFeed>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { feed, cache, clock }
    }

    /// # Summary
    /// 产出指定标的当前可用的滚动窗口。
    ///
    /// # Logic
    /// 1. 容错读取 DataCacheRecord；命中且 `last_update_date` 为今天、
    ///    存量数据仍能通过窗口校验时直接返回（零交易所调用）。
    /// 2. 否则拉取 `(days + 1) * 24` 根小时线。多拉一天是对调度延迟、
    ///    接口延迟与边界缺根的冗余，聚合的"排除今天"规则会裁回 `days` 天。
    /// 3. 聚合为半日线并构造窗口（根数校验在此触发）。
    /// 4. 以今天为戳持久化新快照；落盘失败仅告警，不影响返回。
    ///
    /// # Arguments
    /// * `ticker`: 标的代码。
    /// * `days`: 窗口覆盖天数。
    ///
    /// # Returns
    /// 成功返回校验过的滚动窗口；拉取或校验失败返回 MarketError。
    pub async fn collect(
        &self,
        ticker: &str,
        days: usize,
    ) -> Result<RollingWindow, MarketError> {
        let today = self.clock.today();
        let key = CacheKind::Data.key(ticker);

        if let Some(record) = self.cache.get_or_miss::<DataCacheRecord>(&key).await {
            if record.last_update_date == today {
                match RollingWindow::try_new(record.window) {
                    Ok(window) => {
                        debug!("Data cache hit for {} ({})", ticker, today);
                        return Ok(window);
                    }
                    Err(e) => {
                        warn!("Cached window for {} invalid, refetching: {}", ticker, e);
                    }
                }
            }
        }

        let count = (days + 1) * 24;
        info!("Refreshing window for {}: fetching {} hourly candles", ticker, count);
        let candles = self.feed.fetch_candles(ticker, TimeFrame::Hour1, count).await?;

        let offset = *self.clock.now().offset();
        let half_days = aggregate_half_days(&candles, days, today, offset);
        let window = RollingWindow::try_new(half_days)?;

        let record = DataCacheRecord {
            ticker: ticker.to_string(),
            last_update_date: today,
            window: window.candles().to_vec(),
        };
        if let Err(e) = self.cache.set(&key, &record).await {
            warn!("Failed to persist data cache for {}: {}", ticker, e);
        }

        Ok(window)
    }
}
