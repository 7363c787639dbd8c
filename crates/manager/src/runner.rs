use crate::signal;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use tupo_core::cache::error::CacheError;
use tupo_core::cache::port::{Cache, CacheExt, CacheKind};
use tupo_core::common::Clock;
use tupo_core::config::AppConfig;
use tupo_core::market::entity::{RollingWindow, StrategyCacheRecord};
use tupo_core::market::error::MarketError;
use tupo_core::market::port::ExchangeFeed;
use tupo_core::trade::port::{TradeError, TradePort};
use tupo_market::collector::DataCollector;

/// # Summary
/// 策略运行层的统一错误类型。
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
    #[error("Trade error: {0}")]
    Trade(#[from] TradeError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// # Summary
/// 幂等策略状态机：对单个标的，保证每个日历日内
/// 每条策略至多买入一次、卖出一次，且跨进程重启不重复、不丢失。
/// 编译期仅依赖 `tupo-core` 中的端口定义，所有具体实现通过构造函数注入。
///
/// # Invariants
/// - 买卖守卫完全由持久化的 `*_execution_volume` 字段驱动，
///   与 `run()` 的调用次数无关。
/// - 任何信号计算或下单失败只影响本轮，不污染失败前的内存与磁盘状态，
///   下一轮调度自动重试同一决策。
/// - 每次影响重启安全性的状态变更后立即落盘。
pub struct StrategyRunner {
    // 不可变运行配置
    config: AppConfig,
    // 时间供给器
    clock: Arc<dyn Clock>,
    // 行情数据源端口
    feed: Arc<dyn ExchangeFeed>,
    // 订单执行端口
    trade: Arc<dyn TradePort>,
    // 持久化缓存端口
    cache: Arc<dyn Cache>,
    // 窗口采集器
    collector: DataCollector,
    // 当日策略状态（内存权威副本，变更后落盘）
    state: StrategyCacheRecord,
}

impl StrategyRunner {
    /// # Summary
    /// 构造状态机并恢复当日状态。
    ///
    /// # Logic
    /// 1. 容错加载 StrategyCacheRecord（损坏按未命中处理）。
    /// 2. 记录存在且 `last_run_date` 为今天时原样复用。
    /// 3. 否则尝试整体刷新；刷新失败时保留旧记录（或空白占位），
    ///    由下一次 `run()` 重试，构造本身不失败。
    ///
    /// # Arguments
    /// * `config` - 校验过的应用配置。
    /// * `clock` / `feed` / `trade` / `cache` - 各端口的具体实现。
    ///
    /// # Returns
    /// 可立即进入调度循环的状态机实例。
    pub async fn init(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        feed: Arc<dyn ExchangeFeed>,
        trade: Arc<dyn TradePort>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        let collector = DataCollector::new(feed.clone(), cache.clone(), clock.clone());
        let key = CacheKind::Strategy.key(&config.ticker);
        let today = clock.today();

        let loaded = cache.get_or_miss::<StrategyCacheRecord>(&key).await;
        let state = match loaded {
            Some(record) if record.last_run_date == today => {
                info!("Reusing strategy state for {} ({})", config.ticker, today);
                record
            }
            other => {
                match Self::compute_fresh_state(&config, &collector, cache.as_ref(), today).await
                {
                    Ok(state) => state,
                    Err(e) => {
                        warn!(
                            "Initial refresh for {} failed, will retry on next tick: {}",
                            config.ticker, e
                        );
                        other.unwrap_or_else(|| {
                            StrategyCacheRecord::fresh(
                                config.ticker.clone(),
                                NaiveDate::MIN,
                                0.0,
                                0.0,
                            )
                        })
                    }
                }
            }
        };

        Self {
            config,
            clock,
            feed,
            trade,
            cache,
            collector,
            state,
        }
    }

    /// 当日策略状态的只读视图（诊断与测试用）
    pub fn state(&self) -> &StrategyCacheRecord {
        &self.state
    }

    /// # Summary
    /// 调度器入口：预期每分钟被外部触发一次。
    ///
    /// # Logic
    /// 1. 日期前进时先整体刷新当日状态；刷新失败则跳过本轮。
    /// 2. 依次独立评估波动率突破与上午-下午反转两条策略，
    ///    任一失败只记日志，不中断另一条，也不返回错误。
    pub async fn run(&mut self) {
        let today = self.clock.today();
        if today != self.state.last_run_date {
            match Self::compute_fresh_state(
                &self.config,
                &self.collector,
                self.cache.as_ref(),
                today,
            )
            .await
            {
                Ok(state) => {
                    info!("Daily refresh for {} complete ({})", self.config.ticker, today);
                    self.state = state;
                }
                Err(e) => {
                    warn!(
                        "Daily refresh for {} failed, skipping tick: {}",
                        self.config.ticker, e
                    );
                    return;
                }
            }
        }

        if let Err(e) = self.run_volatility_breakout().await {
            warn!("Volatility breakout tick failed: {}", e);
        }
        if let Err(e) = self.run_morning_afternoon().await {
            warn!("Morning-afternoon tick failed: {}", e);
        }
    }

    /// # Summary
    /// 重算某一天的全新策略状态并落盘。
    ///
    /// # Logic
    /// 1. 经采集器取得当日窗口（通常命中数据缓存）。
    /// 2. 仓位 = 波动率目标仓位 × 均线评分（评分作为置信度乘数）。
    /// 3. 触发价缺失时仓位一并归零，突破策略当天静默。
    /// 4. 执行水位全部归零，戳上今天并持久化。
    async fn compute_fresh_state(
        config: &AppConfig,
        collector: &DataCollector,
        cache: &dyn Cache,
        today: NaiveDate,
    ) -> Result<StrategyCacheRecord, RunnerError> {
        let window = collector.collect(&config.ticker, config.window_days).await?;

        let raw_size = signal::position_size(
            window.yesterday_morning().and_then(|c| c.volatility()),
            config.target_volatility,
        );
        let (position_size, threshold) = match signal::breakout_threshold(&window) {
            Some(threshold) => (raw_size * window.ma_score(), threshold),
            None => (0.0, 0.0),
        };

        let state = StrategyCacheRecord::fresh(
            config.ticker.clone(),
            today,
            position_size,
            threshold,
        );
        cache
            .set(&CacheKind::Strategy.key(&config.ticker), &state)
            .await?;
        info!(
            "Strategy state for {} refreshed: position_size={:.4}, threshold={:.2}",
            config.ticker, position_size, threshold
        );
        Ok(state)
    }

    /// 状态变更后的尽力落盘；失败只告警，内存副本仍是当日权威
    async fn persist_state(&self) {
        let key = CacheKind::Strategy.key(&self.state.ticker);
        if let Err(e) = self.cache.set(&key, &self.state).await {
            warn!(
                "Failed to persist strategy state for {}: {}",
                self.state.ticker, e
            );
        }
    }

    /// # Summary
    /// 波动率突破策略的单轮评估。
    ///
    /// # Logic
    /// 上午：尚未买入、仓位为正且现价突破触发价时市价买入一次，
    /// 成交量记入 `volatility_execution_volume`。
    /// 下午：存在未清算的执行量时全量卖出一次并清零。
    async fn run_volatility_breakout(&mut self) -> Result<(), RunnerError> {
        if self.clock.is_morning() {
            if self.state.volatility_execution_volume > Decimal::ZERO {
                return Ok(());
            }
            if self.state.volatility_position_size <= 0.0 {
                return Ok(());
            }

            let price = self.feed.current_price(&self.config.ticker).await?;
            if price <= self.state.volatility_threshold {
                return Ok(());
            }

            let amount = self.order_amount(self.state.volatility_position_size);
            if amount < self.config.min_order_amount {
                debug!(
                    "Breakout buy for {} below minimum order amount, skipping",
                    self.config.ticker
                );
                return Ok(());
            }

            let outcome = self.trade.buy(&self.config.ticker, amount).await?;
            info!(
                "Breakout buy for {}: volume={} avg_price={}",
                self.config.ticker, outcome.volume, outcome.avg_price
            );
            self.state.volatility_execution_volume = outcome.volume;
            self.persist_state().await;
        } else if self.state.volatility_execution_volume > Decimal::ZERO {
            let volume = self.state.volatility_execution_volume;
            let outcome = self.trade.sell(&self.config.ticker, volume).await?;
            info!(
                "Breakout sell for {}: volume={} avg_price={}",
                self.config.ticker, outcome.volume, outcome.avg_price
            );
            self.state.volatility_execution_volume = Decimal::ZERO;
            self.persist_state().await;
        }
        Ok(())
    }

    /// # Summary
    /// 上午-下午反转策略的单轮评估。
    ///
    /// # Logic
    /// 上午：尚未买入、昨天下午收益为正且量能放大时按反转仓位买入一次。
    /// 下午：存在未清算的执行量时全量卖出一次并清零。
    async fn run_morning_afternoon(&mut self) -> Result<(), RunnerError> {
        if self.clock.is_morning() {
            if self.state.morning_afternoon_execution_volume > Decimal::ZERO {
                return Ok(());
            }

            let window = self.daily_window().await?;
            if !signal::reversal_signal(&window) {
                return Ok(());
            }
            let size = signal::reversal_size(&window, self.config.target_volatility);
            if size <= 0.0 {
                return Ok(());
            }

            let amount = self.order_amount(size);
            if amount < self.config.min_order_amount {
                debug!(
                    "Reversal buy for {} below minimum order amount, skipping",
                    self.config.ticker
                );
                return Ok(());
            }

            let outcome = self.trade.buy(&self.config.ticker, amount).await?;
            info!(
                "Reversal buy for {}: volume={} avg_price={}",
                self.config.ticker, outcome.volume, outcome.avg_price
            );
            self.state.morning_afternoon_execution_volume = outcome.volume;
            self.persist_state().await;
        } else if self.state.morning_afternoon_execution_volume > Decimal::ZERO {
            let volume = self.state.morning_afternoon_execution_volume;
            let outcome = self.trade.sell(&self.config.ticker, volume).await?;
            info!(
                "Reversal sell for {}: volume={} avg_price={}",
                self.config.ticker, outcome.volume, outcome.avg_price
            );
            self.state.morning_afternoon_execution_volume = Decimal::ZERO;
            self.persist_state().await;
        }
        Ok(())
    }

    /// 当日窗口（通常命中数据缓存，零交易所调用）
    async fn daily_window(&self) -> Result<RollingWindow, RunnerError> {
        Ok(self
            .collector
            .collect(&self.config.ticker, self.config.window_days)
            .await?)
    }

    /// 仓位比例换算为报价货币下单金额
    fn order_amount(&self, size: f64) -> Decimal {
        let size = Decimal::from_f64_retain(size).unwrap_or(Decimal::ZERO);
        self.config.order_budget * size
    }
}
