//! 测试辅助：各端口的可编排 Mock 实现。
//! 仅在 `test-utils` 特性或本 crate 的单元测试下编译。

use crate::common::TimeFrame;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use crate::market::port::ExchangeFeed;
use crate::trade::entity::OrderOutcome;
use crate::trade::port::{TradeError, TradePort};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// # Summary
/// 可编排的行情数据源 Mock：返回预置 K 线与现价，并统计调用次数。
/// 用于验证采集器的缓存命中语义（命中时零次交易所调用）。
pub struct MockFeed {
    candles: Mutex<Vec<Candle>>,
    price: Mutex<f64>,
    fetch_calls: AtomicUsize,
    fail_fetch: AtomicBool,
}

impl MockFeed {
    pub fn new(candles: Vec<Candle>, price: f64) -> Self {
        Self {
            candles: Mutex::new(candles),
            price: Mutex::new(price),
            fetch_calls: AtomicUsize::new(0),
            fail_fetch: AtomicBool::new(false),
        }
    }

    /// 替换预置 K 线
    pub fn set_candles(&self, candles: Vec<Candle>) {
        *lock(&self.candles) = candles;
    }

    /// 替换预置现价
    pub fn set_price(&self, price: f64) {
        *lock(&self.price) = price;
    }

    /// 令后续 fetch_candles 全部失败（模拟交易所故障）
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// 至今发生的 fetch_candles 调用次数
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeFeed for MockFeed {
    async fn fetch_candles(
        &self,
        _ticker: &str,
        _timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(MarketError::Network("mock feed down".to_string()));
        }
        let candles = lock(&self.candles);
        let start = candles.len().saturating_sub(count);
        Ok(candles[start..].to_vec())
    }

    async fn current_price(&self, _ticker: &str) -> Result<f64, MarketError> {
        Ok(*lock(&self.price))
    }
}

/// # Summary
/// Mock 收到的一条委托记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOrder {
    Buy { ticker: String, amount: Decimal },
    Sell { ticker: String, volume: Decimal },
}

/// # Summary
/// 可编排的订单执行 Mock：按固定价格全额成交并记录全部委托。
/// `set_fail` 可模拟券商通道故障，验证策略层的失败重试语义。
pub struct MockTrade {
    orders: Mutex<Vec<MockOrder>>,
    fill_price: Mutex<Decimal>,
    fail: AtomicBool,
}

impl MockTrade {
    pub fn new(fill_price: Decimal) -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            fill_price: Mutex::new(fill_price),
            fail: AtomicBool::new(false),
        }
    }

    /// 令后续买卖全部失败
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// 收到的全部委托（按时间顺序）
    pub fn orders(&self) -> Vec<MockOrder> {
        lock(&self.orders).clone()
    }

    /// 至今收到的买入委托次数
    pub fn buy_count(&self) -> usize {
        lock(&self.orders)
            .iter()
            .filter(|o| matches!(o, MockOrder::Buy { .. }))
            .count()
    }

    /// 至今收到的卖出委托次数
    pub fn sell_count(&self) -> usize {
        lock(&self.orders)
            .iter()
            .filter(|o| matches!(o, MockOrder::Sell { .. }))
            .count()
    }
}

#[async_trait]
impl TradePort for MockTrade {
    async fn buy(&self, ticker: &str, amount: Decimal) -> Result<OrderOutcome, TradeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TradeError::BrokerIntegrationError(
                "mock broker down".to_string(),
            ));
        }
        let price = *lock(&self.fill_price);
        if price <= Decimal::ZERO {
            return Err(TradeError::InternalError("mock fill price not set".to_string()));
        }
        lock(&self.orders).push(MockOrder::Buy {
            ticker: ticker.to_string(),
            amount,
        });
        Ok(OrderOutcome {
            volume: amount / price,
            avg_price: price,
        })
    }

    async fn sell(&self, ticker: &str, volume: Decimal) -> Result<OrderOutcome, TradeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TradeError::BrokerIntegrationError(
                "mock broker down".to_string(),
            ));
        }
        let price = *lock(&self.fill_price);
        lock(&self.orders).push(MockOrder::Sell {
            ticker: ticker.to_string(),
            volume,
        });
        Ok(OrderOutcome {
            volume,
            avg_price: price,
        })
    }
}
