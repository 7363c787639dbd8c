use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tupo_core::market::port::ExchangeFeed;
use tupo_core::trade::entity::OrderOutcome;
use tupo_core::trade::port::{TradeError, TradePort};

/// 纸面成交的双边手续费率（0.05%，对齐交易所挂牌费率）
fn fee_rate() -> Decimal {
    Decimal::new(5, 4)
}

/// # Summary
/// 纸面账户的内部状态。
/// 通过 RwLock 保护以防御并发条件下的竞态数据错乱。
struct PaperAccount {
    /// 可用报价货币现金
    cash: Decimal,
    /// 单个标的的持仓数量映射
    positions: HashMap<String, Decimal>,
}

/// # Summary
/// 纸面账户的对外只读快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperSnapshot {
    pub cash: Decimal,
    pub positions: HashMap<String, Decimal>,
}

/// # Summary
/// 纸面撮合的订单执行实现：不触达真实交易所，
/// 以行情端口的最新成交价作为成交价，在本地账户上记账。
///
/// # Invariants
/// - 买入前校验可用现金，卖出前校验可卖持仓，失败的委托不产生任何状态变更。
/// - 买卖双边均按 `fee_rate` 扣除手续费。
pub struct PaperTrader {
    /// 成交价来源
    feed: Arc<dyn ExchangeFeed>,
    /// 账户状态
    account: RwLock<PaperAccount>,
}

impl PaperTrader {
    /// 使用指定初始现金创建纸面账户
    pub fn new(feed: Arc<dyn ExchangeFeed>, initial_cash: Decimal) -> Self {
        Self {
            feed,
            account: RwLock::new(PaperAccount {
                cash: initial_cash,
                positions: HashMap::new(),
            }),
        }
    }

    /// 账户当前状态的只读快照（诊断与测试用）
    pub async fn snapshot(&self) -> PaperSnapshot {
        let account = self.account.read().await;
        PaperSnapshot {
            cash: account.cash,
            positions: account.positions.clone(),
        }
    }

    /// 经行情端口取得成交价并换算为 Decimal
    async fn fill_price(&self, ticker: &str) -> Result<Decimal, TradeError> {
        let price = self
            .feed
            .current_price(ticker)
            .await
            .map_err(|e| TradeError::BrokerIntegrationError(e.to_string()))?;
        Decimal::from_f64_retain(price)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| TradeError::InternalError(format!("bad fill price: {price}")))
    }
}

#[async_trait]
impl TradePort for PaperTrader {
    /// # Summary
    /// 按报价货币金额纸面买入。
    ///
    /// # Logic
    /// 1. 取最新成交价作为成交价。
    /// 2. 校验可用现金覆盖委托金额。
    /// 3. 扣除手续费后的净额换算为成交量，全额记账。
    async fn buy(&self, ticker: &str, amount: Decimal) -> Result<OrderOutcome, TradeError> {
        let price = self.fill_price(ticker).await?;

        let mut account = self.account.write().await;
        if account.cash < amount {
            return Err(TradeError::InsufficientFunds {
                required: amount,
                actual: account.cash,
            });
        }

        let fee = amount * fee_rate();
        let volume = (amount - fee) / price;
        account.cash -= amount;
        *account
            .positions
            .entry(ticker.to_string())
            .or_insert(Decimal::ZERO) += volume;

        info!(
            "Paper buy {}: amount={} price={} volume={} fee={}",
            ticker, amount, price, volume, fee
        );
        Ok(OrderOutcome {
            volume,
            avg_price: price,
        })
    }

    /// # Summary
    /// 按标的数量纸面卖出。
    ///
    /// # Logic
    /// 1. 取最新成交价作为成交价。
    /// 2. 校验可卖持仓覆盖委托数量。
    /// 3. 所得扣除手续费后入账，持仓清零时移除条目。
    async fn sell(&self, ticker: &str, volume: Decimal) -> Result<OrderOutcome, TradeError> {
        let price = self.fill_price(ticker).await?;

        let mut account = self.account.write().await;
        let held = account
            .positions
            .get(ticker)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if held < volume {
            return Err(TradeError::InsufficientPosition {
                required: volume,
                actual: held,
            });
        }

        let proceeds = volume * price;
        let fee = proceeds * fee_rate();
        account.cash += proceeds - fee;

        let remaining = held - volume;
        if remaining.is_zero() {
            account.positions.remove(ticker);
        } else if let Some(position) = account.positions.get_mut(ticker) {
            *position = remaining;
        }

        info!(
            "Paper sell {}: volume={} price={} proceeds={} fee={}",
            ticker, volume, price, proceeds, fee
        );
        Ok(OrderOutcome {
            volume,
            avg_price: price,
        })
    }
}
