use crate::chart::entity::{Candle, Chart, ChartMeta};
use serde::{Deserialize, Serialize};

/// # Summary
/// 解析器输出：按时间正序排列的 `[open, high, low, close]` 数值元组及图表元数据。
///
/// # Invariants
/// - `bars` 长度等于 `DayLayout::chart_len()` (默认 85)，由解析器保证。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedChart {
    pub bars: Vec<[f64; 4]>,
    pub meta: ChartMeta,
}

impl ParsedChart {
    /// 纯映射，不附加任何逻辑。
    pub fn to_chart(&self) -> Chart {
        self.bars.iter().copied().map(Candle::from_fields).collect()
    }
}
