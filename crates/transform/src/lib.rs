//! # rousoku-transform
//!
//! 图表级纯函数变换：归一化流水线、扁平化编解码、特征加权与聚类结果汇总。
//! 所有函数均为逐行无状态操作，参数显式传入，可安全并发调用。

pub mod cluster;
pub mod codec;
pub mod features;
pub mod normalize;
pub mod pipeline;

use rousoku_core::chart::entity::RowId;
use rousoku_core::chart::error::ChartError;
use std::fmt;

/// # Summary
/// 表格处理中单行失败的记录。
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub id: RowId,
    pub error: ChartError,
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.id, self.error)
    }
}

/// # Summary
/// 逐行处理表格的结果：成功的行组成的输出表，以及被跳过的失败行。
///
/// # Invariants
/// - 任一行的失败都不会影响其他行的输出。
#[derive(Debug, Clone, PartialEq)]
pub struct Processed<T> {
    pub output: T,
    pub failures: Vec<RowFailure>,
}

/// 计数转浮点，超出 `u32` 范围的计数返回 `ChartError::Shape`。
pub(crate) fn count_as_f64(n: usize) -> Result<f64, ChartError> {
    u32::try_from(n)
        .map(f64::from)
        .map_err(|_| ChartError::Shape(format!("count {n} is too large to average")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_as_f64() {
        assert_eq!(count_as_f64(0).unwrap(), 0.0);
        assert_eq!(count_as_f64(85).unwrap(), 85.0);
        let max = usize::try_from(u32::MAX).unwrap();
        assert_eq!(count_as_f64(max).unwrap(), f64::from(u32::MAX));
        if usize::BITS > u32::BITS {
            assert!(matches!(count_as_f64(usize::MAX), Err(ChartError::Shape(_))));
        }
    }
}
