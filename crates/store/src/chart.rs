use async_trait::async_trait;
use rousoku_core::chart::entity::{Candle, Chart, ChartMeta, ChartRow, ChartTable, RowId};
use rousoku_core::store::error::StoreError;
use rousoku_core::store::port::ChartStore;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// 默认原始图表数据库文件名
const DEFAULT_CHART_DB: &str = "charts.db";

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// ChartStore 的 SQLite 实现。
///
/// # Summary
/// 把抓取到的原始图表保存在单个 SQLite 数据库中：
/// `charts` 表存元数据，`chart_candles` 表按 (chart_id, idx) 存 K 线。
///
/// # Invariants
/// * 行标识即 `charts.id`，由 SQLite 自增分配，严格递增。
/// * 每张图表及其全部 K 线在同一事务内写入。
pub struct SqliteChartStore {
    pool: SqlitePool,
}

impl SqliteChartStore {
    /// 在配置的数据根目录下打开 (或创建) `charts.db`。
    pub async fn new() -> Result<Self, StoreError> {
        let root = crate::config::get_root_dir();
        fs::create_dir_all(&root).map_err(|e| StoreError::Io(e.to_string()))?;
        Self::open(&root.join(DEFAULT_CHART_DB)).await
    }

    /// 打开指定路径的数据库并初始化表结构。
    ///
    /// # Logic
    /// 1. 配置 SQLite 连接选项，开启 `create_if_missing`。
    /// 2. 连接并执行建表 DDL。
    ///
    /// # Arguments
    /// * `db_path` - 数据库文件路径。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或数据库错误。
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS charts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                first_day TEXT NOT NULL,
                year TEXT NOT NULL,
                second_day TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chart_candles (
                chart_id INTEGER NOT NULL REFERENCES charts(id),
                idx INTEGER NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                PRIMARY KEY (chart_id, idx)
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(db_error)?;

        debug!("Chart store opened at {}", db_path.display());
        Ok(Self { pool })
    }
}

#[async_trait]
impl ChartStore for SqliteChartStore {
    /// # Summary
    /// 在一个事务内写入元数据与全部 K 线。
    ///
    /// # Logic
    /// 1. 插入 `charts` 行，取自增主键作为行标识。
    /// 2. 按下标逐根插入 `chart_candles`。
    /// 3. 提交事务；任一步失败则整体回滚。
    async fn save_chart(&self, meta: &ChartMeta, chart: &Chart) -> Result<RowId, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let chart_id = sqlx::query(
            "INSERT INTO charts (symbol, first_day, year, second_day) VALUES (?, ?, ?, ?)",
        )
        .bind(&meta.symbol)
        .bind(&meta.first_day)
        .bind(&meta.year)
        .bind(&meta.second_day)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .last_insert_rowid();

        for (idx, candle) in chart.candles().iter().enumerate() {
            let idx = i64::try_from(idx).map_err(|e| StoreError::Format(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO chart_candles (chart_id, idx, open, high, low, close)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(chart_id)
            .bind(idx)
            .bind(candle.open)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.close)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;

        let id = u64::try_from(chart_id).map_err(|e| StoreError::Format(e.to_string()))?;
        Ok(RowId(id))
    }

    /// # Summary
    /// 读出全部图表。
    ///
    /// # Logic
    /// 1. 按 id 升序读取 `charts`。
    /// 2. 按 (chart_id, idx) 升序读取全部 K 线并挂到对应行下。
    async fn load_table(&self) -> Result<ChartTable, StoreError> {
        let records = sqlx::query_as::<_, (i64, String, String, String, String)>(
            "SELECT id, symbol, first_day, year, second_day FROM charts ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let candle_records = sqlx::query_as::<_, (i64, f64, f64, f64, f64)>(
            r#"
            SELECT chart_id, open, high, low, close
            FROM chart_candles
            ORDER BY chart_id ASC, idx ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut candles: BTreeMap<i64, Vec<Candle>> = BTreeMap::new();
        for (chart_id, open, high, low, close) in candle_records {
            candles
                .entry(chart_id)
                .or_default()
                .push(Candle::new(open, high, low, close));
        }

        let mut rows = Vec::with_capacity(records.len());
        let mut meta = BTreeMap::new();
        for (chart_id, symbol, first_day, year, second_day) in records {
            let id = RowId(u64::try_from(chart_id).map_err(|e| StoreError::Format(e.to_string()))?);
            let chart = Chart::new(candles.remove(&chart_id).unwrap_or_default());
            rows.push(ChartRow { id, chart });
            meta.insert(
                id,
                ChartMeta {
                    first_day,
                    year,
                    symbol,
                    second_day,
                },
            );
        }

        Ok(ChartTable::from_parts(rows, meta))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM charts")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        usize::try_from(count).map_err(|e| StoreError::Format(e.to_string()))
    }
}
