use thiserror::Error;

/// # Summary
/// 批量抓取层的统一错误类型。
///
/// # Invariants
/// - 单个工作单元的抓取 / 解析 / 写入失败不会出现在这里，而是记入 `BatchReport`。
/// - 批次结束时的存储计数失败只记录警告，不会使已完成的批次失败。
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Symbol list error: {0}")]
    Symbols(String),
    #[error("Worker task failed: {0}")]
    Worker(String),
}
