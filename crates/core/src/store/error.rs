use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理数据库、文件读写及表格格式问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库操作失败
    #[error("Database error: {0}")]
    Database(String),
    /// 文件读写失败
    #[error("IO error: {0}")]
    Io(String),
    /// 表格内容与约定格式不符 (表头、数值、行标识)
    #[error("Format error: {0}")]
    Format(String),
}
