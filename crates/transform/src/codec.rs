use crate::{Processed, RowFailure};
use rousoku_core::chart::entity::{Candle, Chart, ChartTable, FlatTable};
use rousoku_core::chart::error::ChartError;
use rousoku_core::common::DayLayout;
use tracing::warn;

/// 每根 K 线展开后的字段后缀，顺序即扁平化顺序。
pub const FIELD_SUFFIXES: [&str; 4] = ["o", "h", "l", "c"];

/// `index` 号 K 线的四个列名：`{index}_o`, `{index}_h`, `{index}_l`, `{index}_c`。
pub fn candle_columns(index: usize) -> [String; 4] {
    FIELD_SUFFIXES.map(|suffix| format!("{index}_{suffix}"))
}

/// 下标区间内全部 K 线的列名，按下标与字段顺序排列。
pub fn column_names(indices: std::ops::Range<usize>) -> Vec<String> {
    indices.flat_map(candle_columns).collect()
}

/// 单张图表展开为 `4 * len` 个数值，逐根 K 线按 o/h/l/c 顺序输出。
pub fn flatten_chart(chart: &Chart) -> Vec<f64> {
    chart.candles().iter().flat_map(Candle::fields).collect()
}

/// # Summary
/// 将图表表格展开为扁平特征表。
///
/// # Logic
/// 1. 以第一行的图表长度确定列数，列名为 `0_o .. {n-1}_c`。
/// 2. 逐行展开；长度与首行不一致的行记录为 `ChartError::Shape` 失败并跳过。
/// 3. 行标识与行顺序原样保留，元数据不进入数值表。
///
/// # Arguments
/// * `table`: 图表表格。
///
/// # Returns
/// 返回 `Processed<FlatTable>`。
pub fn flatten_table(table: &ChartTable) -> Processed<FlatTable> {
    let candles = table.charts().next().map_or(0, Chart::len);
    let mut output = FlatTable::new(column_names(0..candles));
    let mut failures = Vec::new();

    for row in table.rows() {
        if let Err(error) = output.push_row(row.id, flatten_chart(&row.chart)) {
            warn!("Row {} cannot be flattened: {}", row.id, error);
            failures.push(RowFailure { id: row.id, error });
        }
    }

    Processed { output, failures }
}

/// # Summary
/// 将单行扁平数值还原为图表，每 4 个值组成一根 K 线。
///
/// # Returns
/// 还原后的图表；长度不是 4 的倍数时返回 `ChartError::Shape`。
pub fn float_chart_to_candles(values: &[f64]) -> Result<Chart, ChartError> {
    if values.len() % 4 != 0 {
        return Err(ChartError::Shape(format!(
            "{} values cannot be grouped into candles",
            values.len()
        )));
    }
    Ok(values
        .chunks_exact(4)
        .map(|q| Candle::new(q[0], q[1], q[2], q[3]))
        .collect())
}

/// # Summary
/// 扁平特征表还原为图表表格 (`flatten_table` 的逆运算)。
///
/// # Logic
/// 1. 校验列数是 4 的倍数。
/// 2. 按列位置 (而非列名) 每 4 列组成一根 K 线，保持扁平化时的顺序。
///
/// # Returns
/// 还原后的图表表格 (不含元数据)；列数不是 4 的倍数时返回 `ChartError::Shape`。
pub fn merge_table(table: &FlatTable) -> Result<ChartTable, ChartError> {
    if table.width() % 4 != 0 {
        return Err(ChartError::Shape(format!(
            "{} columns cannot be grouped into candles",
            table.width()
        )));
    }

    let mut output = ChartTable::new();
    for row in table.rows() {
        output.insert(row.id, float_chart_to_candles(&row.values)?, None);
    }
    Ok(output)
}

/// # Summary
/// 按日分界把扁平特征表切分为模型输入 X 与目标 y。
///
/// # Logic
/// 1. 校验列数等于 `4 * layout.chart_len()`。
/// 2. X 取下标 `0 .. candles_in_day` 的列，y 取 `candles_in_day .. chart_len` 的列。
/// 3. 按列名选列，任一期望列名缺失返回 `ChartError::Shape`。
///
/// # Returns
/// `(X, y)`，默认分别为 316 列与 24 列，行标识保持一致。
pub fn day_split(table: &FlatTable, layout: &DayLayout) -> Result<(FlatTable, FlatTable), ChartError> {
    let expected = layout.chart_len() * 4;
    if table.width() != expected {
        return Err(ChartError::Shape(format!(
            "day split expects {expected} columns, table has {}",
            table.width()
        )));
    }

    let x = table.select(&column_names(0..layout.candles_in_day))?;
    let y = table.select(&column_names(layout.candles_in_day..layout.chart_len()))?;
    Ok((x, y))
}
