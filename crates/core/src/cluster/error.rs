use crate::chart::error::ChartError;
use thiserror::Error;

/// # Summary
/// 聚类协作方错误枚举。
#[derive(Error, Debug)]
pub enum ClusterError {
    // 外部聚类模型执行失败
    #[error("Cluster model error: {0}")]
    Model(String),
    // 聚类结果与特征表形状不一致
    #[error(transparent)]
    Chart(#[from] ChartError),
}
