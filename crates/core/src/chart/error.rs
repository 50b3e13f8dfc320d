use thiserror::Error;

/// # Summary
/// 图表变换与编解码错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 单行数据的错误不得影响同一表格内其他行的处理结果。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    // 列数、长度或列名与期望形状不符
    #[error("Shape error: {0}")]
    Shape(String),
    // 除数为零 (平坦图表归一化或标量除零)
    #[error("Division error: {0}")]
    Division(String),
    // 输入集合为空
    #[error("Empty input: {0}")]
    EmptyInput(String),
}
