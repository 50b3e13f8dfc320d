use crate::codec::float_chart_to_candles;
use crate::count_as_f64;
use rousoku_core::chart::entity::{Chart, FlatTable};
use rousoku_core::chart::error::ChartError;
use rousoku_core::cluster::entity::ClusterAssignment;
use rousoku_core::cluster::error::ClusterError;
use serde::Serialize;

/// # Summary
/// 将每个簇中心还原为图表，供可视化协作方使用。
pub fn center_charts(assignment: &ClusterAssignment) -> Result<Vec<Chart>, ChartError> {
    assignment
        .centers
        .iter()
        .map(|center| float_chart_to_candles(center))
        .collect()
}

/// # Summary
/// 簇内成对距离 (欧氏或余弦) 的统计量，已在全部簇上取平均。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DistanceSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// # Summary
/// 聚类结果摘要：簇大小分布，以及 X / y 空间内的簇内欧氏距离与余弦距离。
///
/// # Invariants
/// - 成员数不超过 1 的簇在距离统计中按 0 计入。
/// - 余弦距离取值于 [0, 2]；零向量与零向量的距离为 0，与非零向量的距离为 1。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub sizes: Vec<usize>,
    pub min_size: usize,
    pub max_size: usize,
    pub mean_size: f64,
    pub x_distance: DistanceSummary,
    pub y_distance: DistanceSummary,
    pub x_similarity: DistanceSummary,
    pub y_similarity: DistanceSummary,
}

impl ClusterReport {
    /// # Summary
    /// 根据聚类输出与 X / y 特征表构建摘要。
    ///
    /// # Logic
    /// 1. 校验标签数量与 X、y 行数一致，且标签均小于簇数量。
    /// 2. 统计每个簇的成员数。
    /// 3. 分别在 X 与 y 空间内计算每个簇的成对距离均值 / 最小值 / 最大值，再对全部簇取平均。
    /// 4. 欧氏距离与余弦距离各统计一次。
    ///
    /// # Arguments
    /// * `x`: 参与聚类的特征表。
    /// * `y`: 与 X 逐行对应的目标表。
    /// * `assignment`: 外部聚类模型的输出。
    ///
    /// # Returns
    /// 成功返回 `ClusterReport`，形状不一致返回 `ClusterError::Chart`。
    pub fn build(
        x: &FlatTable,
        y: &FlatTable,
        assignment: &ClusterAssignment,
    ) -> Result<Self, ClusterError> {
        let rows = assignment.labels.len();
        if x.len() != rows || y.len() != rows {
            return Err(ChartError::Shape(format!(
                "{rows} labels for {} X rows and {} y rows",
                x.len(),
                y.len()
            ))
            .into());
        }
        let clusters = assignment.cluster_count();
        if let Some(bad) = assignment.labels.iter().find(|l| **l >= clusters) {
            return Err(ChartError::Shape(format!(
                "label {bad} out of range for {clusters} clusters"
            ))
            .into());
        }

        let members: Vec<Vec<usize>> = (0..clusters).map(|i| assignment.members(i)).collect();
        let sizes: Vec<usize> = members.iter().map(Vec::len).collect();

        Ok(Self {
            min_size: sizes.iter().copied().min().unwrap_or(0),
            max_size: sizes.iter().copied().max().unwrap_or(0),
            mean_size: mean(
                sizes
                    .iter()
                    .map(|s| count_as_f64(*s))
                    .collect::<Result<Vec<_>, _>>()?,
            )?,
            x_distance: summarize(x, &members, euclidean)?,
            y_distance: summarize(y, &members, euclidean)?,
            x_similarity: summarize(x, &members, cosine_distance)?,
            y_similarity: summarize(y, &members, cosine_distance)?,
            sizes,
        })
    }
}

fn mean(values: Vec<f64>) -> Result<f64, ChartError> {
    if values.is_empty() {
        return Ok(0.0);
    }
    Ok(values.iter().sum::<f64>() / count_as_f64(values.len())?)
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// 余弦距离 `1 - a·b / (|a| |b|)`。
fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(p, q)| p * q).sum();
    let norm_a = a.iter().map(|p| p * p).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|q| q * q).sum::<f64>().sqrt();
    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        // 浮点误差可能使比值略超出 [-1, 1]
        (false, false) => 1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0),
    }
}

fn summarize(
    table: &FlatTable,
    members: &[Vec<usize>],
    metric: fn(&[f64], &[f64]) -> f64,
) -> Result<DistanceSummary, ChartError> {
    let per_cluster = members
        .iter()
        .map(|rows| -> Result<DistanceSummary, ChartError> {
            let mut distances = Vec::new();
            for (k, &i) in rows.iter().enumerate() {
                for &j in &rows[k + 1..] {
                    distances.push(metric(&table.rows()[i].values, &table.rows()[j].values));
                }
            }
            if distances.is_empty() {
                return Ok(DistanceSummary::default());
            }
            Ok(DistanceSummary {
                min: distances.iter().copied().fold(f64::INFINITY, f64::min),
                max: distances.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                mean: mean(distances)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DistanceSummary {
        mean: mean(per_cluster.iter().map(|s| s.mean).collect())?,
        min: mean(per_cluster.iter().map(|s| s.min).collect())?,
        max: mean(per_cluster.iter().map(|s| s.max).collect())?,
    })
}
