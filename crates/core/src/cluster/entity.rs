use serde::{Deserialize, Serialize};

/// # Summary
/// 外部聚类模型的输出：每行一个簇标签，以及位于同一特征空间内的簇中心。
///
/// # Invariants
/// - `labels.len()` 等于输入特征表的行数。
/// - 每个中心向量的长度等于输入特征表的列数 (默认 316)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub labels: Vec<usize>,
    pub centers: Vec<Vec<f64>>,
}

impl ClusterAssignment {
    pub fn cluster_count(&self) -> usize {
        self.centers.len()
    }

    /// 属于簇 `label` 的行下标 (按输入顺序)。
    pub fn members(&self, label: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == label)
            .map(|(i, _)| i)
            .collect()
    }
}
