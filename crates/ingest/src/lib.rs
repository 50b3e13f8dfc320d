//! 批量抓取：把 (证券, 日期对) 工作单元分发给固定数量的 worker，
//! 抓取结果经队列汇入唯一的写入任务。

pub mod error;
pub mod manager;
pub mod plan;
