//! 存储适配器：原始图表的 SQLite 持久化与扁平表格的 CSV 读写。

pub mod chart;
pub mod config;
pub mod table;
