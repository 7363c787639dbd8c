use tupo_core::market::entity::RollingWindow;

/// # Summary
/// 波动率目标仓位：target_vol / volatility，限幅在 [0, 1]。
///
/// # Arguments
/// * `volatility`: 昨天上午的波动率；None 表示数据无意义（open <= 0）。
/// * `target_vol`: 目标波动率。
///
/// # Returns
/// 波动率缺失或非正时返回 0（显式的"无信号"，不抛错）。
pub fn position_size(volatility: Option<f64>, target_vol: f64) -> f64 {
    match volatility {
        Some(v) if v > 0.0 => (target_vol / v).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// # Summary
/// 波动率突破触发价：昨日收盘 + 昨日全天高低价差 × 上午噪声均值。
/// 锚点取昨天下午的收盘价（即今天的参考开盘），噪声均值充当 k 系数。
///
/// # Returns
/// 窗口缺少昨日任一半日线时返回 None，调用方按"无信号"处理。
pub fn breakout_threshold(window: &RollingWindow) -> Option<f64> {
    let morning = window.yesterday_morning()?;
    let afternoon = window.yesterday_afternoon()?;

    let day_high = morning.high.max(afternoon.high);
    let day_low = morning.low.min(afternoon.low);
    Some(afternoon.close + (day_high - day_low) * window.morning_noise_average())
}

/// # Summary
/// 上午-下午反转策略的买入条件：
/// 昨天下午收益率为正，且昨天上午成交量小于昨天下午成交量。
///
/// # Returns
/// 任一数据缺失或收益率无意义时返回 false。
pub fn reversal_signal(window: &RollingWindow) -> bool {
    let (Some(morning), Some(afternoon)) =
        (window.yesterday_morning(), window.yesterday_afternoon())
    else {
        return false;
    };
    match afternoon.return_rate() {
        Some(rate) => rate > 0.0 && morning.volume < afternoon.volume,
        None => false,
    }
}

/// # Summary
/// 上午-下午反转策略的仓位：target_vol / max(昨天上午波动率, 0.01)，
/// 限幅在 [0, 1]（可用预算是隐式上限）。
///
/// # Returns
/// 昨天上午缺失或波动率无意义时返回 0。
pub fn reversal_size(window: &RollingWindow, target_vol: f64) -> f64 {
    let Some(morning) = window.yesterday_morning() else {
        return 0.0;
    };
    match morning.volatility() {
        Some(v) => (target_vol / v.max(0.01)).clamp(0.0, 1.0),
        None => 0.0,
    }
}
