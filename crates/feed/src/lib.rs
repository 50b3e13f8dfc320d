//! # rousoku-feed
//!
//! 图表数据源适配器：页面解析器与基于 reqwest 的 HTTP 抓取实现。

pub mod barchart;
pub mod parser;
