use crate::trade::entity::OrderOutcome;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// # Summary
/// 交易执行环节中可能发生的错误。
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("可用资金不足. 需要: {required}, 实际: {actual}")]
    InsufficientFunds {
        required: Decimal,
        actual: Decimal,
    },
    #[error("可卖持仓不足. 需要: {required}, 实际: {actual}")]
    InsufficientPosition {
        required: Decimal,
        actual: Decimal,
    },
    #[error("委托被拒绝: {0}")]
    Rejected(String),
    #[error("底层券商通道错误: {0}")]
    BrokerIntegrationError(String),
    #[error("内部系统错误: {0}")]
    InternalError(String),
}

/// # Summary
/// 订单执行端口。策略状态机通过它下发市价买卖意图，
/// 它是业务逻辑向底层基础设施（纸面撮合或物理交易所 API）发送请求的唯一门户。
///
/// # Invariants
/// - 此接口必须是异步且线程安全的 (`Send + Sync`)。
/// - 成交回报必须完整计入全部成交量，策略缓存以其作为持仓代理。
#[async_trait]
pub trait TradePort: Send + Sync {
    /// # Summary
    /// 按报价货币金额市价买入。
    ///
    /// # Arguments
    /// * `ticker` - 标的代码。
    /// * `amount` - 投入的报价货币金额（例如 KRW）。
    ///
    /// # Returns
    /// * `Ok(OrderOutcome)` - 实际成交量与均价。
    /// * `Err(TradeError)` - 资金不足、风控拦截或通道失败。
    async fn buy(&self, ticker: &str, amount: Decimal) -> Result<OrderOutcome, TradeError>;

    /// # Summary
    /// 按标的数量市价卖出（清算此前记录的执行量）。
    ///
    /// # Arguments
    /// * `ticker` - 标的代码。
    /// * `volume` - 卖出的标的数量。
    ///
    /// # Returns
    /// * `Ok(OrderOutcome)` - 实际成交量与均价。
    /// * `Err(TradeError)` - 持仓不足或通道失败。
    async fn sell(&self, ticker: &str, volume: Decimal) -> Result<OrderOutcome, TradeError>;
}
