use super::error::StoreError;
use crate::chart::entity::{Chart, ChartMeta, ChartTable, RowId};
use async_trait::async_trait;

/// # Summary
/// 原始图表存储接口，负责抓取结果 (K 线 + 元数据) 的持久化与读取。
///
/// # Invariants
/// - 行标识按写入顺序递增，`load_table` 按行标识升序返回。
/// - 写入应由单一写者串行执行，实现者只需保证单次写入的原子性。
#[async_trait]
pub trait ChartStore: Send + Sync {
    /// # Summary
    /// 保存一张图表及其元数据。
    ///
    /// # Logic
    /// 1. 写入元数据行并获得新的行标识。
    /// 2. 按下标写入全部 K 线。
    ///
    /// # Arguments
    /// * `meta`: 图表元数据。
    /// * `chart`: 按时间排序的 K 线序列。
    ///
    /// # Returns
    /// 成功返回分配的行标识。
    async fn save_chart(&self, meta: &ChartMeta, chart: &Chart) -> Result<RowId, StoreError>;

    /// # Summary
    /// 加载全部已保存的图表。
    ///
    /// # Returns
    /// 返回按行标识排序的 `ChartTable`，元数据挂在同一行标识下。
    async fn load_table(&self) -> Result<ChartTable, StoreError>;

    /// 已保存的图表数量。
    async fn count(&self) -> Result<usize, StoreError>;
}
