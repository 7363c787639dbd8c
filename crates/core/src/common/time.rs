use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use std::sync::RwLock;

/// # Summary
/// 时间供给器接口，用于劫持和隔离物理系统时钟。
/// 所有半日分类（上午/下午）与"今天"的判定必须通过此接口完成，
/// 策略层不得直接读取操作系统时间。
///
/// # Invariants
/// - `now()` 返回的时间已固定在交易所配置时区内。
/// - 上午定义为本地时刻 `[00:00, 12:00)`，下午为其补集。
pub trait Clock: Send + Sync {
    /// 获取当前挂载的时间（已带配置时区偏移）
    fn now(&self) -> DateTime<FixedOffset>;

    /// 由 `now()` 推导出的本地日历日期
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// 本地时刻是否处于上午半日桶 `[00:00, 12:00)`
    fn is_morning(&self) -> bool {
        self.now().hour() < 12
    }

    /// 本地时刻是否处于下午半日桶（上午的补集）
    fn is_afternoon(&self) -> bool {
        !self.is_morning()
    }
}

/// # Summary
/// 针对实盘运行的真实时钟，将操作系统当前时间换算到配置时区。
pub struct SystemClock {
    // 交易所本地时区偏移
    offset: FixedOffset,
}

impl SystemClock {
    /// 使用指定的时区偏移创建真实时钟
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// # Summary
/// 测试专用固定时钟，允许用例主动拨快或回退时间。
///
/// # Invariants
/// - 并发安全：内部利用 `RwLock` 提供给多线程安全修改和读取时间的权限。
pub struct FixedClock {
    current_time: RwLock<DateTime<FixedOffset>>,
}

impl FixedClock {
    /// 使用指定的初始时间创建固定时钟
    pub fn new(initial_time: DateTime<FixedOffset>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 强制修改时钟的当前时间
    pub fn set_time(&self, new_time: DateTime<FixedOffset>) {
        let mut time = self.current_time.write().unwrap_or_else(|e| e.into_inner());
        *time = new_time;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self
            .current_time
            .read()
            .unwrap_or_else(|e| e.into_inner())
    }
}
