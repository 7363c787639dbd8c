use chrono::{FixedOffset, NaiveDate, Timelike};
use std::collections::BTreeMap;
use tupo_core::market::entity::{Candle, HalfDayCandle, HalfDayPeriod};

/// 同一本地日期的上午/下午原始小时线分桶
#[derive(Default)]
struct DayBuckets {
    morning: Vec<Candle>,
    afternoon: Vec<Candle>,
}

/// # Summary
/// 将任意顺序的小时 K 线序列聚合为按 (date, period) 升序的半日 K 线序列。
/// 纯函数：无网络、无磁盘 I/O，"今天"由调用方显式传入。
///
/// # Logic
/// 1. 将每根小时线换算到配置时区，丢弃日期等于 `today` 的未完结数据。
/// 2. 按本地日期分桶，桶内再按小时 (<12 上午) 分半日。
/// 3. 只保留最近 `days` 个不同日期（升序保持不变）。
/// 4. 每个非空半日桶归并为一根半日线：首开、末收、极高、极低、量和。
///
/// # Arguments
/// * `candles`: 小时 K 线序列，内部顺序不限。
/// * `days`: 保留的最近日历天数。
/// * `today`: 当前本地日期，该日数据一律排除。
/// * `offset`: 交易所本地时区偏移。
///
/// # Returns
/// 半日 K 线序列。可用日期不足 `days` 时返回现有全部，不视为错误；
/// 40 根固定容量约束由下游窗口构造负责。
pub fn aggregate_half_days(
    candles: &[Candle],
    days: usize,
    today: NaiveDate,
    offset: FixedOffset,
) -> Vec<HalfDayCandle> {
    let mut buckets: BTreeMap<NaiveDate, DayBuckets> = BTreeMap::new();

    for candle in candles {
        let local = candle.time.with_timezone(&offset);
        let date = local.date_naive();
        if date == today {
            continue;
        }
        let day = buckets.entry(date).or_default();
        if local.hour() < 12 {
            day.morning.push(candle.clone());
        } else {
            day.afternoon.push(candle.clone());
        }
    }

    let skip = buckets.len().saturating_sub(days);
    let mut result = Vec::with_capacity(days * 2);
    for (date, mut day) in buckets.into_iter().skip(skip) {
        if let Some(candle) = reduce_bucket(date, HalfDayPeriod::Morning, &mut day.morning) {
            result.push(candle);
        }
        if let Some(candle) = reduce_bucket(date, HalfDayPeriod::Afternoon, &mut day.afternoon) {
            result.push(candle);
        }
    }
    result
}

/// # Summary
/// 将单个半日桶归并为一根半日 K 线。
///
/// # Logic
/// 桶内先按时间升序排序，再做 首开/末收/极高/极低/量和 归并。
///
/// # Returns
/// 空桶返回 None。
fn reduce_bucket(
    date: NaiveDate,
    period: HalfDayPeriod,
    bucket: &mut [Candle],
) -> Option<HalfDayCandle> {
    bucket.sort_by_key(|c| c.time);
    let first = bucket.first()?;
    let last = bucket.last()?;

    let mut high = f64::MIN;
    let mut low = f64::MAX;
    let mut volume = 0.0;
    for candle in bucket.iter() {
        high = high.max(candle.high);
        low = low.min(candle.low);
        volume += candle.volume;
    }

    Some(HalfDayCandle {
        date,
        period,
        open: first.open,
        high,
        low,
        close: last.close,
        volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        kst()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn hourly(time: DateTime<Utc>, open: f64, close: f64) -> Candle {
        Candle {
            time,
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 10.0,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    /// 生成 `days` 个完整日历日的 24 根小时线
    fn full_days(days: u32, close_of_day: impl Fn(u32) -> f64) -> Vec<Candle> {
        let mut candles = Vec::new();
        for d in 1..=days {
            for h in 0..24 {
                candles.push(hourly(local(2024, 3, d, h), 100.0, close_of_day(d)));
            }
        }
        candles
    }

    #[test]
    fn test_excludes_today() {
        let candles = full_days(3, |_| 100.0);
        let result = aggregate_half_days(&candles, 20, date(3), kst());
        // 第 3 天被排除，剩余 2 天各 2 根
        assert_eq!(result.len(), 4);
        assert!(result.iter().all(|c| c.date != date(3)));
    }

    #[test]
    fn test_keeps_last_n_days_ascending() {
        let candles = full_days(6, f64::from);
        let result = aggregate_half_days(&candles, 3, date(7), kst());
        assert_eq!(result.len(), 6);
        assert_eq!(result[0].date, date(4));
        assert_eq!(result[5].date, date(6));
        for pair in result.windows(2) {
            assert!((pair[0].date, pair[0].period) < (pair[1].date, pair[1].period));
        }
    }

    #[test]
    fn test_bucket_reduction_rule() {
        // 上午桶：3 根乱序小时线
        let candles = vec![
            hourly(local(2024, 3, 1, 2), 105.0, 103.0),
            hourly(local(2024, 3, 1, 0), 100.0, 102.0),
            hourly(local(2024, 3, 1, 11), 103.0, 110.0),
        ];
        let result = aggregate_half_days(&candles, 20, date(2), kst());
        assert_eq!(result.len(), 1);
        let morning = &result[0];
        assert_eq!(morning.period, HalfDayPeriod::Morning);
        // 首根 (00时) 的开盘、末根 (11时) 的收盘
        assert_eq!(morning.open, 100.0);
        assert_eq!(morning.close, 110.0);
        // 极值与量和
        assert_eq!(morning.high, 111.0);
        assert_eq!(morning.low, 99.0);
        assert_eq!(morning.volume, 30.0);
    }

    #[test]
    fn test_half_day_boundary_at_noon() {
        let candles = vec![
            hourly(local(2024, 3, 1, 11), 100.0, 101.0),
            hourly(local(2024, 3, 1, 12), 101.0, 102.0),
        ];
        let result = aggregate_half_days(&candles, 20, date(2), kst());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].period, HalfDayPeriod::Morning);
        assert_eq!(result[1].period, HalfDayPeriod::Afternoon);
    }

    #[test]
    fn test_classification_uses_local_timezone() {
        // UTC 23 时 = KST 次日 08 时，应归入次日上午桶
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).single().unwrap();
        let candles = vec![hourly(time, 100.0, 101.0)];
        let result = aggregate_half_days(&candles, 20, date(3), kst());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].date, date(2));
        assert_eq!(result[0].period, HalfDayPeriod::Morning);
    }

    #[test]
    fn test_fewer_days_than_requested_is_not_an_error() {
        let candles = full_days(2, |_| 100.0);
        let result = aggregate_half_days(&candles, 20, date(3), kst());
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_empty_input() {
        let result = aggregate_half_days(&[], 20, date(1), kst());
        assert!(result.is_empty());
    }
}
