use rousoku_core::chart::entity::FlatTable;
use rousoku_core::chart::error::ChartError;

/// 默认的初始权重。
pub const DEFAULT_WEIGHT_ADJUST: f64 = 0.03;

/// # Summary
/// 生成按 K 线递减再反转的特征权重向量，使越接近收盘的 K 线权重越大。
///
/// # Logic
/// 1. `w_0 = adjust`，`w_{k+1} = w_k * (1 - w_k)`。
/// 2. 每个权重重复 4 次 (对应 o/h/l/c 四列)。
/// 3. 整体反转。
///
/// # Arguments
/// * `candles`: K 线数量 (列数 / 4)。
/// * `adjust`: 初始权重。
pub fn feature_weights(candles: usize, adjust: f64) -> Vec<f64> {
    let mut weights = Vec::with_capacity(candles * 4);
    let mut w = adjust;
    for _ in 0..candles {
        weights.extend([w; 4]);
        w *= 1.0 - w;
    }
    weights.reverse();
    weights
}

/// # Summary
/// 对 X 特征表逐行按 `feature_weights` 加权，返回新表。
///
/// # Returns
/// 加权后的特征表；列数不是 4 的倍数时返回 `ChartError::Shape`。
pub fn weight_features(table: &FlatTable, adjust: f64) -> Result<FlatTable, ChartError> {
    if table.width() % 4 != 0 {
        return Err(ChartError::Shape(format!(
            "{} columns cannot be weighted per candle",
            table.width()
        )));
    }
    let weights = feature_weights(table.width() / 4, adjust);

    let mut output = FlatTable::new(table.columns().to_vec());
    for row in table.rows() {
        let values = row.values.iter().zip(&weights).map(|(v, w)| v * w).collect();
        output.push_row(row.id, values)?;
    }
    Ok(output)
}
