use crate::chart::entity::FlatTable;
use crate::cluster::entity::ClusterAssignment;
use crate::cluster::error::ClusterError;

/// # Summary
/// 聚类服务契约。本系统只负责提供 X 特征矩阵并消费其输出，
/// 聚类算法本身 (例如 k-means) 由外部实现。
pub trait ClusterModel: Send + Sync {
    /// # Summary
    /// 对特征表做聚类。
    ///
    /// # Arguments
    /// * `features`: X 特征表 (默认 316 列)。
    /// * `clusters`: 期望的簇数量。
    ///
    /// # Returns
    /// 成功返回每行标签与簇中心。
    fn fit(&self, features: &FlatTable, clusters: usize) -> Result<ClusterAssignment, ClusterError>;
}
