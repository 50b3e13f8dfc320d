use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 单个交易日的盘中 K 线数量 (5 分钟周期)。
pub const CANDLES_IN_DAY: usize = 79;

/// 每张图表额外保留的次日 K 线数量。
pub const NUM_OF_NEXT_DAY_TO_KEEP: usize = 6;

/// 数据源页面至少需要包含的原始 K 线数量 (两个接近完整的交易日)。
pub const MIN_RAW_CANDLES: usize = 156;

/// # Summary
/// 单次抓取请求，对应一个 (证券, 日期对) 工作单元。
///
/// # Invariants
/// - `start` 与 `end` 均为包含边界。
/// - 请求在批量任务中作为失败报告的身份标识，因此必须可克隆且可序列化。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartRequest {
    // 证券代码 (例如: AAPL)
    pub symbol: String,
    // K 线周期 (分钟)
    pub interval_minutes: u32,
    // 开始日期
    pub start: NaiveDate,
    // 结束日期
    pub end: NaiveDate,
}

impl ChartRequest {
    pub fn new(symbol: impl Into<String>, interval_minutes: u32, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            interval_minutes,
            start,
            end,
        }
    }
}

impl fmt::Display for ChartRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}m [{} .. {}]",
            self.symbol, self.interval_minutes, self.start, self.end
        )
    }
}

/// # Summary
/// 图表形态参数：描述一张图表由多少根当日 K 线与次日 K 线组成。
///
/// # Invariants
/// - 所有依赖固定下标的变换都必须从这里显式取参，不得读取全局常量。
/// - `min_raw_candles` 与修复逻辑强绑定于数据源页面布局，数据源变更时需重新评估。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayLayout {
    // 当日盘中 K 线数量
    pub candles_in_day: usize,
    // 保留的次日 K 线数量
    pub next_day_keep: usize,
    // 页面中最少应出现的原始 K 线数量
    pub min_raw_candles: usize,
}

impl Default for DayLayout {
    fn default() -> Self {
        Self {
            candles_in_day: CANDLES_IN_DAY,
            next_day_keep: NUM_OF_NEXT_DAY_TO_KEEP,
            min_raw_candles: MIN_RAW_CANDLES,
        }
    }
}

impl DayLayout {
    /// 一张完整图表的 K 线总数 (默认 85)。
    pub fn chart_len(&self) -> usize {
        self.candles_in_day + self.next_day_keep
    }

    /// 当日收盘 K 线下标 (默认 78)。
    pub fn session_close_index(&self) -> usize {
        self.candles_in_day.saturating_sub(1)
    }

    /// 次日第一根 K 线下标 (默认 79)，元数据 `second_day` 亦取自此处。
    pub fn next_day_index(&self) -> usize {
        self.candles_in_day
    }
}

/// # Summary
/// 生成 `[start, end)` 区间内连续工作日组成的日期对。
///
/// # Logic
/// 1. 逐日遍历区间，仅保留周一至周五。
/// 2. 将相邻的两个工作日配对：`(d0, d1), (d1, d2), ...`。
///
/// # Arguments
/// * `start`: 区间起点 (包含)。
/// * `end`: 区间终点 (不包含)。
///
/// # Returns
/// 日期对列表；区间内不足两个工作日时返回空列表。
pub fn weekday_pairs(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let weekdays: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|d| *d < end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect();

    weekdays.windows(2).map(|w| (w[0], w[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_layout() {
        let layout = DayLayout::default();
        assert_eq!(layout.chart_len(), 85);
        assert_eq!(layout.session_close_index(), 78);
        assert_eq!(layout.next_day_index(), 79);
        assert_eq!(layout.min_raw_candles, 156);
    }

    #[test]
    fn test_weekday_pairs_skip_weekend() {
        // 2014-03-06 是周四
        let pairs = weekday_pairs(date(2014, 3, 6), date(2014, 3, 12));
        assert_eq!(
            pairs,
            vec![
                (date(2014, 3, 6), date(2014, 3, 7)),
                (date(2014, 3, 7), date(2014, 3, 10)),
                (date(2014, 3, 10), date(2014, 3, 11)),
            ]
        );
    }

    #[test]
    fn test_weekday_pairs_empty_range() {
        assert!(weekday_pairs(date(2014, 3, 8), date(2014, 3, 10)).is_empty());
        assert!(weekday_pairs(date(2014, 3, 10), date(2014, 3, 10)).is_empty());
    }

    #[test]
    fn test_request_display() {
        let req = ChartRequest::new("AAPL", 5, date(2014, 3, 6), date(2014, 3, 7));
        assert_eq!(req.to_string(), "AAPL 5m [2014-03-06 .. 2014-03-07]");
    }
}
