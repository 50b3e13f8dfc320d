use crate::common::ChartRequest;
use thiserror::Error;

/// # Summary
/// 抓取与解析域错误枚举，处理网络、页面解析及数据完整性问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 网络失败必须携带原始请求参数，以便批量任务逐单元报告。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    // 传输层失败、非成功状态码或请求超时
    #[error("Fetch error for {request}: {reason}")]
    Fetch {
        request: ChartRequest,
        reason: String,
    },
    // 页面结构或数值字段无法解析
    #[error("Parse error: {0}")]
    Parse(String),
    // 页面中的 K 线数量不足
    #[error("Incomplete chart: found {found} candles, need {required}")]
    IncompleteChart { found: usize, required: usize },
}
