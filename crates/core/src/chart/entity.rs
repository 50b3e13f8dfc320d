use crate::chart::error::ChartError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// # Summary
/// 单根 K 线数据实体，记录一个时间区间内的价格波动。
///
/// # Invariants
/// - 经济意义上应满足 `low <= open, close <= high`，但构造时不做强制校验，
///   抓取到的脏数据必须能被容忍而不是导致崩溃。
/// - 所有算术操作均返回新实例，不修改自身。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// 从 `[open, high, low, close]` 顺序的数组构造。
    pub fn from_fields(fields: [f64; 4]) -> Self {
        let [open, high, low, close] = fields;
        Self::new(open, high, low, close)
    }

    /// 按扁平化顺序 `[open, high, low, close]` 返回四个字段。
    pub fn fields(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.open), f(self.high), f(self.low), f(self.close))
    }

    fn zip(&self, other: &Candle, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(
            f(self.open, other.open),
            f(self.high, other.high),
            f(self.low, other.low),
            f(self.close, other.close),
        )
    }

    pub fn add_scalar(&self, num: f64) -> Self {
        self.map(|v| v + num)
    }

    pub fn sub_scalar(&self, num: f64) -> Self {
        self.map(|v| v - num)
    }

    pub fn mul_scalar(&self, num: f64) -> Self {
        self.map(|v| v * num)
    }

    /// # Summary
    /// 四个字段同时除以一个标量。
    ///
    /// # Logic
    /// 除数为 0 时直接返回 `ChartError::Division`，
    /// 不产生 inf/NaN 这类"看起来合法"的浮点结果。
    ///
    /// # Arguments
    /// * `num`: 除数。
    ///
    /// # Returns
    /// 成功返回新 K 线，除数为零返回 `ChartError::Division`。
    pub fn div_scalar(&self, num: f64) -> Result<Self, ChartError> {
        if num == 0.0 {
            return Err(ChartError::Division(format!(
                "cannot divide candle ({self}) by zero"
            )));
        }
        Ok(self.map(|v| v / num))
    }

    pub fn add_candle(&self, other: &Candle) -> Self {
        self.zip(other, |a, b| a + b)
    }

    pub fn sub_candle(&self, other: &Candle) -> Self {
        self.zip(other, |a, b| a - b)
    }

    /// 收盘价高于开盘价 (阳线)。
    pub fn is_gain(&self) -> bool {
        self.close > self.open
    }

    /// 收盘价低于开盘价 (阴线)。
    pub fn is_loss(&self) -> bool {
        self.close < self.open
    }

    /// 收盘价等于开盘价 (十字线)。
    pub fn is_flat(&self) -> bool {
        self.close == self.open
    }

    /// 影线全长：最高价 - 最低价。
    pub fn total_length(&self) -> f64 {
        self.high - self.low
    }

    /// 实体长度：收盘价 - 开盘价 (阴线为负)。
    pub fn body_length(&self) -> f64 {
        self.close - self.open
    }

    /// # Summary
    /// 将 K 线整体下移至最低价为 0，仅保留其自身形态。
    ///
    /// # Logic
    /// 四个字段同时减去 `low`，返回新实例。不提供原地修改版本。
    pub fn shift_to_zero(&self) -> Self {
        self.sub_scalar(self.low)
    }
}

impl fmt::Display for Candle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Open: {}, High: {}, Low: {}, Close: {}",
            self.open, self.high, self.low, self.close
        )
    }
}

/// # Summary
/// 按时间顺序排列的 K 线序列。下标即交易日内 (或跨日) 的时间步。
///
/// # Invariants
/// - 顺序具有语义，所有变换都必须保持原有顺序。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chart(Vec<Candle>);

impl Chart {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self(candles)
    }

    pub fn candles(&self) -> &[Candle] {
        &self.0
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.0.get(index)
    }

    /// 全图最低价；空图返回 None。NaN 字段会被跳过。
    pub fn min_low(&self) -> Option<f64> {
        self.0.iter().map(|c| c.low).reduce(f64::min)
    }

    /// 全图最高价；空图返回 None。
    pub fn max_high(&self) -> Option<f64> {
        self.0.iter().map(|c| c.high).reduce(f64::max)
    }

    /// 对每根 K 线独立应用 `f`，保持顺序与长度。
    pub fn map(&self, f: impl Fn(&Candle) -> Candle) -> Self {
        Self(self.0.iter().map(f).collect())
    }

    /// 同 `map`，但任一 K 线失败即整体失败。
    pub fn try_map(
        &self,
        f: impl Fn(&Candle) -> Result<Candle, ChartError>,
    ) -> Result<Self, ChartError> {
        self.0.iter().map(f).collect::<Result<Vec<_>, _>>().map(Self)
    }
}

impl From<Vec<Candle>> for Chart {
    fn from(candles: Vec<Candle>) -> Self {
        Self(candles)
    }
}

impl FromIterator<Candle> for Chart {
    fn from_iter<I: IntoIterator<Item = Candle>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// # Summary
/// 表格行标识，按插入顺序递增分配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// # Summary
/// 单张图表的元数据，与数值表格分开保存，永远不参与算术变换。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    // 第一个交易日 (例如: 03/06)
    pub first_day: String,
    // 年份
    pub year: String,
    // 证券代码
    pub symbol: String,
    // 第二个交易日
    pub second_day: String,
}

/// # Summary
/// 图表表格中的一行。
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    pub id: RowId,
    pub chart: Chart,
}

/// # Summary
/// 行标识到图表的映射，外加一张独立的行标识到元数据的映射。
///
/// # Invariants
/// - 行顺序与插入顺序一致。
/// - 元数据只通过行标识关联，不存放在数值行内。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartTable {
    rows: Vec<ChartRow>,
    meta: BTreeMap<RowId, ChartMeta>,
}

impl ChartTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定行标识插入一行；`meta` 为 None 时不写入元数据。
    pub fn insert(&mut self, id: RowId, chart: Chart, meta: Option<ChartMeta>) {
        if let Some(meta) = meta {
            self.meta.insert(id, meta);
        }
        self.rows.push(ChartRow { id, chart });
    }

    /// 追加一行并自动分配下一个行标识。
    pub fn push(&mut self, chart: Chart, meta: Option<ChartMeta>) -> RowId {
        let id = self
            .rows
            .iter()
            .map(|r| r.id.0 + 1)
            .max()
            .map_or(RowId(0), RowId);
        self.insert(id, chart, meta);
        id
    }

    pub fn rows(&self) -> &[ChartRow] {
        &self.rows
    }

    pub fn meta(&self) -> &BTreeMap<RowId, ChartMeta> {
        &self.meta
    }

    pub fn meta_for(&self, id: RowId) -> Option<&ChartMeta> {
        self.meta.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        self.rows.iter().map(|r| &r.chart)
    }

    pub fn into_parts(self) -> (Vec<ChartRow>, BTreeMap<RowId, ChartMeta>) {
        (self.rows, self.meta)
    }

    pub fn from_parts(rows: Vec<ChartRow>, meta: BTreeMap<RowId, ChartMeta>) -> Self {
        Self { rows, meta }
    }
}

/// # Summary
/// 扁平特征表中的一行数值。
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub id: RowId,
    pub values: Vec<f64>,
}

/// # Summary
/// 扁平数值特征表：一组有序列名加若干等宽数值行。
///
/// # Invariants
/// - 每一行的值个数必须与列数相同，由 `push_row` 保证。
/// - 列名与列顺序需逐位可复现，下游工具依赖列位置。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTable {
    columns: Vec<String>,
    rows: Vec<FlatRow>,
}

impl FlatTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// # Summary
    /// 追加一行数值。
    ///
    /// # Logic
    /// 长度与列数不一致时拒绝写入，返回 `ChartError::Shape`。
    pub fn push_row(&mut self, id: RowId, values: Vec<f64>) -> Result<(), ChartError> {
        if values.len() != self.columns.len() {
            return Err(ChartError::Shape(format!(
                "row {id} has {} values, table has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        self.rows.push(FlatRow { id, values });
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// # Summary
    /// 按列名投影出一张新表。
    ///
    /// # Logic
    /// 1. 逐个查找列名对应的下标，任一缺失即返回 `ChartError::Shape`。
    /// 2. 按给定列名顺序复制每一行的对应值。
    pub fn select(&self, names: &[String]) -> Result<FlatTable, ChartError> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| ChartError::Shape(format!("missing column '{name}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| FlatRow {
                id: row.id,
                values: indices.iter().map(|&i| row.values[i]).collect(),
            })
            .collect();

        Ok(FlatTable {
            columns: names.to_vec(),
            rows,
        })
    }
}
