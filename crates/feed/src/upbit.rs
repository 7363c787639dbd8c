use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use tupo_core::common::TimeFrame;
use tupo_core::market::entity::Candle;
use tupo_core::market::error::MarketError;
use tupo_core::market::port::ExchangeFeed;

/// Upbit 单次请求允许的最大 K 线根数
const MAX_PAGE: usize = 200;
/// 分页请求之间的间隔，遵守交易所限速
const PAGE_INTERVAL: Duration = Duration::from_millis(120);

/// # Summary
/// Upbit 现货行情数据源实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯。
/// - 返回的 K 线按时间升序排列。
#[derive(Clone)]
pub struct UpbitFeed {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// API 基地址（测试时可指向本地桩服务器）
    base_url: String,
}

impl UpbitFeed {
    /// # Summary
    /// 创建一个新的 UpbitFeed 实例。
    ///
    /// # Logic
    /// 1. 配置 10 秒超时。
    /// 2. 初始化 reqwest 客户端。
    ///
    /// # Returns
    /// 成功返回初始化后的 UpbitFeed，客户端构建失败返回 MarketError。
    pub fn new() -> Result<Self, MarketError> {
        Self::with_base_url("https://api.upbit.com")
    }

    /// 使用指定 API 基地址创建实例
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// # Summary
    /// 抓取单页 K 线（交易所按新到旧返回）。
    ///
    /// # Arguments
    /// * `ticker`: 市场代码，例如 `KRW-BTC`。
    /// * `timeframe`: K 线周期。
    /// * `count`: 本页根数，不超过 `MAX_PAGE`。
    /// * `to`: 分页游标，只返回严格早于该时刻的 K 线。
    async fn fetch_page(
        &self,
        ticker: &str,
        timeframe: TimeFrame,
        count: usize,
        to: Option<&str>,
    ) -> Result<Vec<UpbitCandle>, MarketError> {
        let url = format!(
            "{}/v1/candles/{}",
            self.base_url,
            candle_path(timeframe)
        );

        let count_param = count.to_string();
        let mut query = vec![("market", ticker), ("count", count_param.as_str())];
        if let Some(to) = to {
            query.push(("to", to));
        }

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        resp.json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))
    }
}

/// 周期到 Upbit K 线端点路径的映射
fn candle_path(timeframe: TimeFrame) -> &'static str {
    match timeframe {
        TimeFrame::Hour1 => "minutes/60",
        TimeFrame::Day1 => "days",
    }
}

/// # Summary
/// Upbit K 线接口的单条响应报文。
#[derive(Deserialize, Debug)]
struct UpbitCandle {
    /// UTC 开盘时刻，格式 `2024-03-22T09:00:00`
    candle_date_time_utc: String,
    /// 开盘价
    opening_price: f64,
    /// 最高价
    high_price: f64,
    /// 最低价
    low_price: f64,
    /// 收盘价（最新成交价）
    trade_price: f64,
    /// 累计成交量
    candle_acc_trade_volume: f64,
}

impl UpbitCandle {
    /// 换算为内部 K 线实体；时间戳非法时返回 Parse 错误
    fn into_candle(self) -> Result<Candle, MarketError> {
        let time = NaiveDateTime::parse_from_str(&self.candle_date_time_utc, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| {
                MarketError::Parse(format!(
                    "bad candle timestamp {:?}: {}",
                    self.candle_date_time_utc, e
                ))
            })?
            .and_utc();
        Ok(Candle {
            time,
            open: self.opening_price,
            high: self.high_price,
            low: self.low_price,
            close: self.trade_price,
            volume: self.candle_acc_trade_volume,
        })
    }
}

/// # Summary
/// Upbit 现价接口的单条响应报文。
#[derive(Deserialize, Debug)]
struct UpbitTicker {
    /// 最新成交价
    trade_price: f64,
}

#[async_trait]
impl ExchangeFeed for UpbitFeed {
    /// # Summary
    /// 抓取最近 `count` 根 K 线，按时间升序返回。
    ///
    /// # Logic
    /// 1. 单页上限 200 根，超出时以最老一根的时刻为游标继续翻页。
    /// 2. 页间保持最小间隔，遵守交易所限速。
    /// 3. 交易所返回空页或短页时视为历史尽头，提前结束。
    /// 4. 全部报文换算为内部实体后整体反转为升序。
    async fn fetch_candles(
        &self,
        ticker: &str,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let mut collected: Vec<Candle> = Vec::with_capacity(count);
        let mut cursor: Option<String> = None;

        while collected.len() < count {
            let page_size = (count - collected.len()).min(MAX_PAGE);
            let page = self
                .fetch_page(ticker, timeframe, page_size, cursor.as_deref())
                .await?;
            if page.is_empty() {
                break;
            }

            let short_page = page.len() < page_size;
            if let Some(oldest) = page.last() {
                // `to` 为排他游标，用最老一根自身的时刻翻页不会产生重复
                cursor = Some(format!("{}Z", oldest.candle_date_time_utc));
            }
            for raw in page {
                collected.push(raw.into_candle()?);
            }
            if short_page {
                break;
            }
            if collected.len() < count {
                tokio::time::sleep(PAGE_INTERVAL).await;
            }
        }

        // 新到旧的页序整体反转为升序
        collected.reverse();
        debug!(
            "Fetched {} of {} requested candles for {}",
            collected.len(),
            count,
            ticker
        );
        Ok(collected)
    }

    /// # Summary
    /// 获取标的当前成交价。
    async fn current_price(&self, ticker: &str) -> Result<f64, MarketError> {
        let url = format!("{}/v1/ticker", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("markets", ticker)])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        let tickers: Vec<UpbitTicker> = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;
        tickers
            .first()
            .map(|t| t.trade_price)
            .ok_or(MarketError::NotFound)
    }
}
