//! # rousoku-core
//!
//! 领域核心：K 线实体、图表表格、错误枚举与各层端口 (Port) 定义。
//! 本 crate 不包含任何 IO 实现，具体适配器由 feed / store 等 crate 提供。

pub mod chart;
pub mod cluster;
pub mod common;
pub mod config;
pub mod feed;
pub mod store;
