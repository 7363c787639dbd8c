use std::sync::Arc;
use std::time::Duration;

use config::{Config, Environment, File};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tupo_cache::file::FileCache;
use tupo_core::common::SystemClock;
use tupo_core::config::AppConfig;
use tupo_feed::upbit::UpbitFeed;
use tupo_manager::runner::StrategyRunner;
use tupo_trade::paper::PaperTrader;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 StrategyRunner，
/// 然后以固定间隔驱动状态机直至收到退出信号。
///
/// # Logic
/// 1. 初始化全局日志（控制台 + 按日滚动文件）。
/// 2. 分层加载配置（内置默认值 < 配置文件 < TUPO_* 环境变量）并校验。
/// 3. 实例化基础设施层（Clock、FileCache、UpbitFeed、PaperTrader）。
/// 4. 构造应用服务层（StrategyRunner）。
/// 5. 进入调度循环，等待外部信号退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 初始化日志
    let file_appender = tracing_appender::rolling::daily("logs", "tupo.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .init();
    info!("Tupo runner starting...");

    // reqwest 以 rustls-no-provider 构建，进程级 TLS 算法提供者在此装载
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();

    // 2. 分层加载配置
    let settings = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("TUPO"))
        .build()?;
    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    info!(
        "Config loaded: ticker={} window_days={} tick_interval={}s",
        config.ticker, config.window_days, config.tick_interval_secs
    );

    // 3. 实例化基础设施层
    let offset = config
        .timezone()
        .ok_or("utc_offset_hours does not form a valid timezone")?;
    let clock = Arc::new(SystemClock::new(offset));
    let cache = Arc::new(FileCache::new(config.data_dir.clone()));
    let feed = Arc::new(UpbitFeed::new()?);
    // 两条策略各自最多动用一份预算
    let trade = Arc::new(PaperTrader::new(
        feed.clone(),
        config.order_budget * Decimal::from(2),
    ));

    // 4. 构造应用服务层（注入 Core Trait 抽象）
    let tick_interval = Duration::from_secs(config.tick_interval_secs);
    let mut runner = StrategyRunner::init(config, clock, feed, trade, cache).await;
    info!("StrategyRunner initialized. Entering tick loop...");

    // 5. 调度循环，等待外部退出信号
    let mut ticker = tokio::time::interval(tick_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => runner.run().await,
            _ = &mut shutdown => {
                info!("Shutdown signal received. Exiting...");
                break;
            }
        }
    }

    Ok(())
}
