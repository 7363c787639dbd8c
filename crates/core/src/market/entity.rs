use crate::market::error::MarketError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 滚动窗口覆盖的完整日历天数（不含今天）
pub const WINDOW_DAYS: usize = 20;

/// 滚动窗口的固定容量（每天上午、下午各一根半日 K 线）
pub const WINDOW_LEN: usize = WINDOW_DAYS * 2;

/// # Summary
/// 单根小时 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - `high` 必须大于或等于 `low`, `open`, `close`（由数据源保证，本地不做校验）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: f64,
}

/// # Summary
/// 半日桶标识：本地时刻 `[00:00, 12:00)` 为上午，其余为下午。
///
/// # Invariants
/// - 排序语义固定为 Morning < Afternoon，与窗口全序定义一致。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HalfDayPeriod {
    Morning,
    Afternoon,
}

impl std::fmt::Display for HalfDayPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HalfDayPeriod::Morning => write!(f, "morning"),
            HalfDayPeriod::Afternoon => write!(f, "afternoon"),
        }
    }
}

/// # Summary
/// 半日 K 线聚合实体：同一本地日期、同一半日桶内全部小时线的归并结果。
///
/// # Invariants
/// - open 取桶内首根小时线的开盘价，close 取末根的收盘价。
/// - high/low 分别为桶内极值，volume 为桶内总和。
/// - 全序：先按 `date` 升序，同日 Morning 先于 Afternoon。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfDayCandle {
    // 本地日历日期
    pub date: NaiveDate,
    // 半日桶
    pub period: HalfDayPeriod,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: f64,
}

impl HalfDayCandle {
    /// 高低价差（振幅的绝对值）
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// # Summary
    /// 波动率 = range / open。
    ///
    /// # Returns
    /// `open <= 0` 时数据无意义，返回 None，由信号层显式按"无信号"处理。
    pub fn volatility(&self) -> Option<f64> {
        if self.open <= 0.0 {
            return None;
        }
        Some(self.range() / self.open)
    }

    /// # Summary
    /// 噪声值：高低振幅中未被开收实体解释的比例。
    ///
    /// # Returns
    /// range 为 0（一字线）时定义为 0。
    pub fn noise(&self) -> f64 {
        let range = self.range();
        if range == 0.0 {
            return 0.0;
        }
        1.0 - (self.open - self.close).abs() / range
    }

    /// # Summary
    /// 半日收益率 = (close - open) / open。
    ///
    /// # Returns
    /// `open <= 0` 时返回 None，由信号层显式按"无信号"处理。
    pub fn return_rate(&self) -> Option<f64> {
        if self.open <= 0.0 {
            return None;
        }
        Some((self.close - self.open) / self.open)
    }

    /// 窗口全序比较键：(date, period)
    fn sort_key(&self) -> (NaiveDate, HalfDayPeriod) {
        (self.date, self.period)
    }
}

/// # Summary
/// 40 根半日 K 线的固定滚动窗口，覆盖最近 20 个已完结日历日。
/// 今天的数据不完整，永远被排除在外。
///
/// # Invariants
/// - 构造时根数必须恰好为 `WINDOW_LEN`，否则返回 `MarketError::WindowSize`。
/// - 内部始终保持 (date, period) 全序，与输入顺序无关。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindow {
    candles: Vec<HalfDayCandle>,
}

impl RollingWindow {
    /// # Summary
    /// 校验根数并排序，构造滚动窗口。
    ///
    /// # Arguments
    /// * `candles`: 任意顺序的半日 K 线集合。
    ///
    /// # Returns
    /// 根数不等于 `WINDOW_LEN` 时返回 `MarketError::WindowSize`。
    pub fn try_new(mut candles: Vec<HalfDayCandle>) -> Result<Self, MarketError> {
        if candles.len() != WINDOW_LEN {
            return Err(MarketError::WindowSize {
                expected: WINDOW_LEN,
                actual: candles.len(),
            });
        }
        candles.sort_by_key(HalfDayCandle::sort_key);
        Ok(Self { candles })
    }

    /// 按全序排列的全部半日 K 线
    pub fn candles(&self) -> &[HalfDayCandle] {
        &self.candles
    }

    /// 按日期升序的全部上午半日 K 线
    pub fn morning_candles(&self) -> Vec<&HalfDayCandle> {
        self.candles
            .iter()
            .filter(|c| c.period == HalfDayPeriod::Morning)
            .collect()
    }

    /// 按日期升序的全部下午半日 K 线
    pub fn afternoon_candles(&self) -> Vec<&HalfDayCandle> {
        self.candles
            .iter()
            .filter(|c| c.period == HalfDayPeriod::Afternoon)
            .collect()
    }

    /// 最近一个已完结的上午半日 K 线（即"昨天上午"）
    pub fn yesterday_morning(&self) -> Option<&HalfDayCandle> {
        self.morning_candles().last().copied()
    }

    /// 最近一个已完结的下午半日 K 线（即"昨天下午"）
    pub fn yesterday_afternoon(&self) -> Option<&HalfDayCandle> {
        self.afternoon_candles().last().copied()
    }

    /// # Summary
    /// 全部上午半日 K 线噪声值的算术平均。
    ///
    /// # Returns
    /// 上午桶为空时返回 0（构造不变量下不会发生，仅作兜底）。
    pub fn morning_noise_average(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0.0;
        for candle in self.morning_candles() {
            sum += candle.noise();
            count += 1.0;
        }
        if count == 0.0 {
            return 0.0;
        }
        sum / count
    }

    /// # Summary
    /// 均线多头评分：对周期 {3, 5, 10, 20}，计算最近 N 根上午线收盘均值，
    /// 统计其中有几个高于昨天上午的收盘价，除以 4 得到 [0, 1] 评分。
    ///
    /// # Invariants
    /// - 比较基准是"昨天上午"的收盘价而非今天的现价，该口径为既定产品行为，
    ///   修改前需产品侧确认。
    ///
    /// # Returns
    /// 上午桶为空时返回 0。
    pub fn ma_score(&self) -> f64 {
        const PERIODS: [usize; 4] = [3, 5, 10, 20];

        let mornings = self.morning_candles();
        let Some(reference) = mornings.last() else {
            return 0.0;
        };
        let reference_close = reference.close;

        let mut satisfied = 0u8;
        for n in PERIODS {
            let tail = if mornings.len() > n {
                &mornings[mornings.len() - n..]
            } else {
                &mornings[..]
            };
            let mut sum = 0.0;
            let mut count = 0.0;
            for candle in tail {
                sum += candle.close;
                count += 1.0;
            }
            if count > 0.0 && sum / count > reference_close {
                satisfied += 1;
            }
        }
        f64::from(satisfied) / 4.0
    }
}

/// # Summary
/// 行情数据缓存记录：某个标的最近一次聚合出的窗口快照。
/// 同一日历日内重复拉取时直接复用，避免冗余的交易所调用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCacheRecord {
    // 标的代码
    pub ticker: String,
    // 最近一次成功聚合的本地日期
    pub last_update_date: NaiveDate,
    // 窗口快照（40 根半日线，重新加载时需再次过窗口校验）
    pub window: Vec<HalfDayCandle>,
}

/// # Summary
/// 策略运行状态缓存记录：某个标的当天的决策参数与执行水位。
/// `*_execution_volume` 是"今天/本半日是否已买入、买了多少"的权威记录，
/// 同时充当配对卖出的下单量，替代真实持仓查询。
///
/// # Invariants
/// - 每个日历日最多被整体刷新一次（`last_run_date` 变更时）。
/// - 每次影响重启安全性的变更后必须立即落盘。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyCacheRecord {
    // 标的代码
    pub ticker: String,
    // 最近一次整体刷新的本地日期
    pub last_run_date: NaiveDate,
    // 波动率突破策略的仓位比例（已乘均线评分，范围 [0, 1]）
    pub volatility_position_size: f64,
    // 波动率突破策略的触发价格
    pub volatility_threshold: f64,
    // 波动率突破策略今日已成交的买入量（0 表示尚未买入）
    pub volatility_execution_volume: Decimal,
    // 上午-下午反转策略今日已成交的买入量（0 表示尚未买入）
    pub morning_afternoon_execution_volume: Decimal,
}

impl StrategyCacheRecord {
    /// # Logic
    /// 以全零执行水位创建某一天的全新策略状态。
    pub fn fresh(
        ticker: String,
        run_date: NaiveDate,
        position_size: f64,
        threshold: f64,
    ) -> Self {
        Self {
            ticker,
            last_run_date: run_date,
            volatility_position_size: position_size,
            volatility_threshold: threshold,
            volatility_execution_volume: Decimal::ZERO,
            morning_afternoon_execution_volume: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn half_day(d: u32, period: HalfDayPeriod, close: f64) -> HalfDayCandle {
        HalfDayCandle {
            date: date(d),
            period,
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close,
            volume: 1000.0,
        }
    }

    fn full_window_with_closes(closes: impl Fn(u32) -> f64) -> Vec<HalfDayCandle> {
        let mut candles = Vec::new();
        for d in 1..=20 {
            candles.push(half_day(d, HalfDayPeriod::Morning, closes(d)));
            candles.push(half_day(d, HalfDayPeriod::Afternoon, closes(d)));
        }
        candles
    }

    #[test]
    fn test_half_day_metrics() {
        // 场景：open=50000, high=51000, low=49000, close=50500
        let candle = HalfDayCandle {
            date: date(1),
            period: HalfDayPeriod::Morning,
            open: 50000.0,
            high: 51000.0,
            low: 49000.0,
            close: 50500.0,
            volume: 10.0,
        };
        assert_eq!(candle.range(), 2000.0);
        assert!((candle.volatility().unwrap() - 0.04).abs() < 1e-12);
        assert!((candle.noise() - 0.75).abs() < 1e-12);
        assert!((candle.return_rate().unwrap() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_on_non_positive_open() {
        let mut candle = half_day(1, HalfDayPeriod::Morning, 100.0);
        candle.open = 0.0;
        assert!(candle.volatility().is_none());
        assert!(candle.return_rate().is_none());
    }

    #[test]
    fn test_noise_on_flat_candle() {
        let candle = HalfDayCandle {
            date: date(1),
            period: HalfDayPeriod::Morning,
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 0.0,
        };
        assert_eq!(candle.noise(), 0.0);
    }

    #[test]
    fn test_window_rejects_wrong_count() {
        let err = RollingWindow::try_new(vec![half_day(1, HalfDayPeriod::Morning, 1.0)]);
        assert!(matches!(
            err,
            Err(MarketError::WindowSize {
                expected: WINDOW_LEN,
                actual: 1
            })
        ));

        let mut too_many = full_window_with_closes(|_| 100.0);
        too_many.push(half_day(21, HalfDayPeriod::Morning, 100.0));
        assert!(RollingWindow::try_new(too_many).is_err());
    }

    #[test]
    fn test_window_sorts_regardless_of_input_order() {
        let mut candles = full_window_with_closes(|d| f64::from(d));
        candles.reverse();
        candles.swap(3, 30);

        let window = RollingWindow::try_new(candles).unwrap();
        let sorted = window.candles();
        for pair in sorted.windows(2) {
            let a = (pair[0].date, pair[0].period);
            let b = (pair[1].date, pair[1].period);
            assert!(a < b);
        }
        // 同日内上午必须先于下午
        assert_eq!(sorted[0].period, HalfDayPeriod::Morning);
        assert_eq!(sorted[1].period, HalfDayPeriod::Afternoon);
    }

    #[test]
    fn test_yesterday_accessors() {
        let window = RollingWindow::try_new(full_window_with_closes(f64::from)).unwrap();
        let ym = window.yesterday_morning().unwrap();
        let ya = window.yesterday_afternoon().unwrap();
        assert_eq!(ym.date, date(20));
        assert_eq!(ym.period, HalfDayPeriod::Morning);
        assert_eq!(ya.date, date(20));
        assert_eq!(ya.period, HalfDayPeriod::Afternoon);
    }

    #[test]
    fn test_ma_score_zero_when_reference_is_peak() {
        // 每日收盘递增：昨天上午收盘为全窗口最高，任何均线都不会高于它
        let window = RollingWindow::try_new(full_window_with_closes(f64::from)).unwrap();
        assert_eq!(window.ma_score(), 0.0);
    }

    #[test]
    fn test_ma_score_full_when_reference_is_bottom() {
        // 每日收盘递减：昨天上午收盘为全窗口最低，4 条均线全部高于它
        let window =
            RollingWindow::try_new(full_window_with_closes(|d| f64::from(21 - d))).unwrap();
        assert_eq!(window.ma_score(), 1.0);
    }

    #[test]
    fn test_ma_score_is_quarter_fraction() {
        let window = RollingWindow::try_new(full_window_with_closes(f64::from)).unwrap();
        let score = window.ma_score();
        assert!((0.0..=1.0).contains(&score));
        let quarters = score * 4.0;
        assert!((quarters - quarters.round()).abs() < 1e-12);
    }

    #[test]
    fn test_data_cache_record_persists_window_field() {
        let record = DataCacheRecord {
            ticker: "KRW-BTC".to_string(),
            last_update_date: date(21),
            window: full_window_with_closes(|_| 100.0),
        };
        // 落盘字段名固定为 window，是缓存文件的对外契约
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("window").is_some());
        assert!(json.get("candles").is_none());
    }

    #[test]
    fn test_morning_noise_average() {
        // 所有上午线同构，均值等于单根噪声
        let window = RollingWindow::try_new(full_window_with_closes(|_| 105.0)).unwrap();
        let expected = half_day(1, HalfDayPeriod::Morning, 105.0).noise();
        assert!((window.morning_noise_average() - expected).abs() < 1e-12);
    }
}
