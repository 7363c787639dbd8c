use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 全局应用配置。所有字段在启动时通过 `validate` 校验一次，
/// 运行期内不可变，策略层不再做任何配置合法性判断。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // 标的代码 (例如: KRW-BTC)
    pub ticker: String,
    // 交易所本地时区相对 UTC 的小时偏移 (例如首尔为 9)
    pub utc_offset_hours: i32,
    // 缓存文件根目录
    pub data_dir: String,
    // 波动率突破策略的目标波动率
    pub target_volatility: f64,
    // 单次买入可动用的报价货币预算
    pub order_budget: Decimal,
    // 交易所允许的最小下单金额，低于该值的买入意图直接跳过
    pub min_order_amount: Decimal,
    // 调度器触发 run() 的间隔秒数
    pub tick_interval_secs: u64,
    // 滚动窗口覆盖的日历天数
    pub window_days: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ticker: "KRW-BTC".to_string(),
            utc_offset_hours: 9,
            data_dir: "data".to_string(),
            target_volatility: 0.02,
            order_budget: Decimal::from(1_000_000i64),
            min_order_amount: Decimal::from(5_000i64),
            tick_interval_secs: 60,
            window_days: 20,
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 启动期一次性校验。
    ///
    /// # Returns
    /// 任一字段非法时返回对人类友好的错误描述。
    pub fn validate(&self) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err("ticker must not be empty".to_string());
        }
        if !(-23..=23).contains(&self.utc_offset_hours) {
            return Err(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            ));
        }
        if self.target_volatility <= 0.0 {
            return Err(format!(
                "target_volatility must be positive: {}",
                self.target_volatility
            ));
        }
        if self.order_budget <= Decimal::ZERO {
            return Err(format!("order_budget must be positive: {}", self.order_budget));
        }
        if self.min_order_amount < Decimal::ZERO {
            return Err(format!(
                "min_order_amount must not be negative: {}",
                self.min_order_amount
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err("tick_interval_secs must be positive".to_string());
        }
        if self.window_days == 0 {
            return Err("window_days must be positive".to_string());
        }
        Ok(())
    }

    /// 配置时区对应的 `FixedOffset`（`validate` 通过后必然可用）
    pub fn timezone(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ticker, "KRW-BTC");
        assert_eq!(config.utc_offset_hours, 9);
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.window_days, 20);
        assert!(config.validate().is_ok());
        assert!(config.timezone().is_some());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut config = AppConfig::default();
        config.ticker = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.utc_offset_hours = 30;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.target_volatility = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.order_budget = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.tick_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
