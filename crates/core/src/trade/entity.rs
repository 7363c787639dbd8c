use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 一笔市价委托的成交回报。
/// 本系统将回报中的 `volume` 作为持仓代理记入策略缓存，
/// 配对卖出时原样消费，因此实现方必须把全部成交量如实计入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOutcome {
    // 实际成交数量（标的计价，例如 BTC 数量）
    pub volume: Decimal,
    // 实际成交均价（报价货币计价）
    pub avg_price: Decimal,
}
