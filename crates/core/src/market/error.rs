use thiserror::Error;

/// # Summary
/// 市场数据域错误枚举，处理网络、解析、数据缺失及窗口校验问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 数据解析错误，如 JSON 格式不匹配
    #[error("Parse error: {0}")]
    Parse(String),
    // 请求的数据未找到 (404 或内容为空)
    #[error("Data not found")]
    NotFound,
    // 滚动窗口根数不满足固定容量约束
    #[error("Window size mismatch: expected {expected}, actual {actual}")]
    WindowSize { expected: usize, actual: usize },
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}
