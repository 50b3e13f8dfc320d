use crate::count_as_f64;
use rousoku_core::chart::entity::{Candle, Chart};
use rousoku_core::chart::error::ChartError;

/// # Summary
/// 将隔夜跳空并入当日收盘 K 线。
///
/// # Logic
/// 1. 取 `index` 处 K 线的开盘价作为新开盘价。
/// 2. 取 `index + 1` 处 (次日第一根) K 线的开盘价作为新收盘价。
/// 3. 最高价 / 最低价取两个开盘价中的较大 / 较小者。
/// 4. 仅替换 `index` 处的 K 线，其余保持不变。
///
/// # Arguments
/// * `chart`: 原始图表。
/// * `index`: 当日收盘 K 线下标，常规取 `DayLayout::session_close_index()`。
///
/// # Returns
/// 调整后的新图表；`index + 1` 越界时返回 `ChartError::Shape`。
pub fn end_of_day_adjust(chart: &Chart, index: usize) -> Result<Chart, ChartError> {
    let candles = chart.candles();
    let next = index.checked_add(1).and_then(|i| candles.get(i));
    let (Some(session_close), Some(next_open)) = (candles.get(index), next) else {
        return Err(ChartError::Shape(format!(
            "end of day adjust needs candles {index} and {}, chart has {}",
            index.saturating_add(1),
            candles.len()
        )));
    };

    let open = session_close.open;
    let close = next_open.open;
    let (low, high) = if open <= close {
        (open, close)
    } else {
        (close, open)
    };

    let mut adjusted = candles.to_vec();
    adjusted[index] = Candle::new(open, high, low, close);
    Ok(Chart::new(adjusted))
}

/// # Summary
/// 整图平移，使全图最低价变为 0。保留价格变动的相对形态与绝对幅度。
///
/// # Returns
/// 平移后的新图表；空图返回 `ChartError::EmptyInput`。
pub fn zero_chart(chart: &Chart) -> Result<Chart, ChartError> {
    let bot = chart
        .min_low()
        .ok_or_else(|| ChartError::EmptyInput("cannot zero an empty chart".into()))?;
    Ok(chart.map(|c| c.sub_scalar(bot)))
}

/// # Summary
/// 整图线性缩放到 `[0, 100]`，消除价格水平差异。
///
/// # Logic
/// 1. `top = max(high)`，`bot = min(low)`。
/// 2. 每根 K 线计算 `(candle - bot) / (top - bot) * 100`。
///    先除后乘，保证原最高价恰好映射为 100、原最低价恰好映射为 0。
///
/// # Returns
/// 缩放后的新图表。空图返回 `ChartError::EmptyInput`；
/// `top == bot` (完全平坦) 或区间非有限值时返回 `ChartError::Division`。
pub fn normalize_chart(chart: &Chart) -> Result<Chart, ChartError> {
    let (Some(top), Some(bot)) = (chart.max_high(), chart.min_low()) else {
        return Err(ChartError::EmptyInput("cannot normalize an empty chart".into()));
    };
    let range = top - bot;
    if range == 0.0 || !range.is_finite() {
        return Err(ChartError::Division(format!(
            "chart range is degenerate (high {top}, low {bot})"
        )));
    }
    chart.try_map(|c| Ok(c.sub_scalar(bot).div_scalar(range)?.mul_scalar(100.0)))
}

/// # Summary
/// 每根 K 线独立下移至最低价为 0，去除 K 线之间的相对位置，只保留单根形态。
pub fn lower_chart(chart: &Chart) -> Chart {
    chart.map(Candle::shift_to_zero)
}

/// # Summary
/// 对一组处于相同语义位置的 K 线逐字段求算术平均。
///
/// # Returns
/// 平均后的 K 线；输入为空返回 `ChartError::EmptyInput`。
pub fn average_candles(candles: &[Candle]) -> Result<Candle, ChartError> {
    if candles.is_empty() {
        return Err(ChartError::EmptyInput("no candles to average".into()));
    }
    let total = candles
        .iter()
        .fold(Candle::new(0.0, 0.0, 0.0, 0.0), |acc, c| acc.add_candle(c));
    total.div_scalar(count_as_f64(candles.len())?)
}

/// # Summary
/// 按位置对多张等长图表求平均，得到一张平均图表。
///
/// # Logic
/// 1. 校验输入非空且所有图表长度一致。
/// 2. 对每个下标收集各图表该位置的 K 线并调用 `average_candles`。
///
/// # Returns
/// 平均图表；输入为空返回 `ChartError::EmptyInput`，长度不一致返回 `ChartError::Shape`。
pub fn average_charts(charts: &[Chart]) -> Result<Chart, ChartError> {
    let first = charts
        .first()
        .ok_or_else(|| ChartError::EmptyInput("no charts to average".into()))?;
    let len = first.len();
    if let Some(bad) = charts.iter().find(|c| c.len() != len) {
        return Err(ChartError::Shape(format!(
            "cannot average charts of length {len} and {}",
            bad.len()
        )));
    }

    (0..len)
        .map(|i| {
            let column: Vec<Candle> = charts.iter().map(|c| c.candles()[i]).collect();
            average_candles(&column)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Chart::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(bars: &[[f64; 4]]) -> Chart {
        bars.iter().copied().map(Candle::from_fields).collect()
    }

    #[test]
    fn test_end_of_day_adjust_folds_overnight_gap() {
        let mut bars = vec![[1.0, 1.0, 1.0, 1.0]; 85];
        bars[78] = [8.0, 9.5, 7.5, 9.0];
        bars[79] = [10.0, 11.0, 9.0, 10.5];
        let adjusted = end_of_day_adjust(&chart(&bars), 78).unwrap();

        assert_eq!(adjusted.candles()[78], Candle::new(8.0, 10.0, 8.0, 10.0));
        assert_eq!(adjusted.candles()[79], Candle::new(10.0, 11.0, 9.0, 10.5));
        assert_eq!(adjusted.len(), 85);
    }

    #[test]
    fn test_end_of_day_adjust_gap_down() {
        let adjusted = end_of_day_adjust(&chart(&[[12.0, 13.0, 11.0, 12.5], [9.0, 9.0, 9.0, 9.0]]), 0).unwrap();
        assert_eq!(adjusted.candles()[0], Candle::new(12.0, 12.0, 9.0, 9.0));
    }

    #[test]
    fn test_end_of_day_adjust_out_of_range() {
        let short = chart(&[[1.0, 2.0, 0.5, 1.5]]);
        assert!(matches!(end_of_day_adjust(&short, 0), Err(ChartError::Shape(_))));
        assert!(matches!(
            end_of_day_adjust(&short, usize::MAX),
            Err(ChartError::Shape(_))
        ));
    }

    #[test]
    fn test_zero_chart_shifts_uniformly() {
        let original = chart(&[[12.0, 14.0, 11.0, 13.0], [13.0, 15.0, 10.5, 11.0]]);
        let zeroed = zero_chart(&original).unwrap();

        assert_eq!(zeroed.min_low(), Some(0.0));
        for (before, after) in original.candles().iter().zip(zeroed.candles()) {
            for (b, a) in before.fields().iter().zip(after.fields()) {
                assert_eq!(b - a, 10.5);
            }
        }
    }

    #[test]
    fn test_normalize_chart_range() {
        let original = chart(&[
            [20.0, 23.0, 19.0, 22.0],
            [22.0, 29.3, 21.7, 28.1],
            [28.0, 28.5, 17.35, 18.0],
        ]);
        let normed = normalize_chart(&original).unwrap();

        for candle in normed.candles() {
            for v in candle.fields() {
                assert!((0.0..=100.0).contains(&v), "{v} out of range");
            }
        }
        assert_eq!(normed.candles()[1].high, 100.0);
        assert_eq!(normed.candles()[2].low, 0.0);
    }

    #[test]
    fn test_normalize_flat_chart_is_division_error() {
        let flat = chart(&[[5.0, 5.0, 5.0, 5.0], [5.0, 5.0, 5.0, 5.0]]);
        assert!(matches!(normalize_chart(&flat), Err(ChartError::Division(_))));
        assert!(matches!(
            normalize_chart(&Chart::default()),
            Err(ChartError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_lower_chart_drops_sequence() {
        let lowered = lower_chart(&chart(&[[12.0, 14.0, 11.0, 13.0], [3.0, 5.0, 2.0, 4.0]]));
        assert_eq!(lowered.candles()[0], lowered.candles()[1]);
        assert_eq!(lowered.candles()[0], Candle::new(1.0, 3.0, 0.0, 2.0));
    }

    #[test]
    fn test_average_candles() {
        let avg = average_candles(&[Candle::new(1.0, 2.0, 0.0, 1.0), Candle::new(3.0, 4.0, 2.0, 3.0)]).unwrap();
        assert_eq!(avg, Candle::new(2.0, 3.0, 1.0, 2.0));
        assert!(matches!(average_candles(&[]), Err(ChartError::EmptyInput(_))));
    }

    #[test]
    fn test_average_charts() {
        let a = chart(&[[1.0, 2.0, 0.0, 1.0], [10.0, 10.0, 10.0, 10.0]]);
        let b = chart(&[[3.0, 4.0, 2.0, 3.0], [20.0, 20.0, 20.0, 20.0]]);
        let avg = average_charts(&[a.clone(), b]).unwrap();
        assert_eq!(avg, chart(&[[2.0, 3.0, 1.0, 2.0], [15.0, 15.0, 15.0, 15.0]]));

        assert!(matches!(average_charts(&[]), Err(ChartError::EmptyInput(_))));
        let short = chart(&[[1.0, 1.0, 1.0, 1.0]]);
        assert!(matches!(average_charts(&[a, short]), Err(ChartError::Shape(_))));
    }
}
