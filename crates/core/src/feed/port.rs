use crate::common::{ChartRequest, DayLayout};
use crate::feed::entity::ParsedChart;
use crate::feed::error::FeedError;
use async_trait::async_trait;

/// # Summary
/// 图表数据提供者接口 (原始数据源)。
///
/// # Invariants
/// - 每次调用都是独立的工作单元，实现者不得在调用之间共享可变状态。
/// - 网络调用必须带超时，超时需转换为 `FeedError::Fetch` 而不是挂起。
#[async_trait]
pub trait ChartProvider: Send + Sync {
    /// # Summary
    /// 抓取并解析一张图表。
    ///
    /// # Logic
    /// 1. 根据请求构建数据源地址并发起请求。
    /// 2. 校验响应状态。
    /// 3. 从页面中提取 K 线与元数据。
    ///
    /// # Arguments
    /// * `request`: 证券、周期与日期对。
    /// * `layout`: 图表形态参数。
    ///
    /// # Returns
    /// 成功返回 `ParsedChart`，失败返回 `FeedError`。
    async fn fetch_chart(
        &self,
        request: &ChartRequest,
        layout: &DayLayout,
    ) -> Result<ParsedChart, FeedError>;
}
