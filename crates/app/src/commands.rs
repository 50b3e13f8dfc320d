use chrono::NaiveDate;
use rousoku_core::chart::stage::Stage;
use rousoku_core::config::AppConfig;
use rousoku_core::store::port::ChartStore;
use rousoku_feed::barchart::BarchartProvider;
use rousoku_ingest::manager::IngestManager;
use rousoku_ingest::plan::{load_symbols, plan_requests};
use rousoku_store::chart::SqliteChartStore;
use rousoku_store::table::{read_flat_table, write_flat_table, write_meta_table};
use rousoku_transform::codec::{day_split, flatten_table};
use rousoku_transform::features::weight_features;
use rousoku_transform::pipeline::Pipeline;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

type CmdResult = Result<(), Box<dyn Error>>;

/// `<out>{suffix}.csv`，与 `out` 位于同一目录。
pub fn output_path(out: &Path, suffix: &str) -> PathBuf {
    let stem = out
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out.with_file_name(format!("{stem}{suffix}.csv"))
}

/// 抓取参数，对应 `pull` 子命令。
pub struct PullArgs {
    pub symbols: PathBuf,
    pub from_index: usize,
    pub to_index: Option<usize>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: u32,
    pub report: Option<PathBuf>,
}

/// # Summary
/// 批量抓取并保存原始图表。
///
/// # Logic
/// 1. 读取证券代码列表并按工作日配对生成请求。
/// 2. 组装 BarchartProvider、SqliteChartStore 与 IngestManager。
/// 3. 执行批量抓取，将报告以 JSON 写入磁盘。
pub async fn pull(config: &AppConfig, args: PullArgs) -> CmdResult {
    let symbols = load_symbols(&args.symbols, args.from_index, args.to_index)?;
    let requests = plan_requests(&symbols, args.start, args.end, args.interval);
    info!(
        "Pulling {} symbols, {} requests",
        symbols.len(),
        requests.len()
    );

    let provider = Arc::new(BarchartProvider::new(&config.feed)?);
    let store = Arc::new(SqliteChartStore::new().await?);
    let manager = IngestManager::new(provider, store, config.layout, config.feed.workers);

    let report = manager.run_batch(requests).await?;

    let report_path = args
        .report
        .unwrap_or_else(|| Path::new(&config.storage.data_dir).join("pull_report.json"));
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    info!(
        "{} charts saved, {} failures, report written to {}",
        report.succeeded,
        report.failures.len(),
        report_path.display()
    );
    Ok(())
}

/// # Summary
/// 对已保存的图表执行归一化并导出。
///
/// # Logic
/// 1. 从存储加载全部原始图表。
/// 2. 执行流水线 (`stages` 为 None 时使用配置)，失败行记录警告后丢弃。
/// 3. 扁平化后写出 `<out>.csv`，并写出仅包含保留行的 `<out>_meta.csv`。
pub async fn clean(config: &AppConfig, out: &Path, stages: Option<Vec<Stage>>) -> CmdResult {
    let store = SqliteChartStore::new().await?;
    let table = store.load_table().await?;

    let pipeline = Pipeline::new(
        stages.unwrap_or_else(|| config.pipeline.stages.clone()),
        config.layout,
    );
    let processed = pipeline.apply_table(&table);
    let flat = flatten_table(&processed.output);

    for failure in processed.failures.iter().chain(&flat.failures) {
        warn!("Dropped {}", failure);
    }

    let kept: BTreeMap<_, _> = flat
        .output
        .rows()
        .iter()
        .filter_map(|row| {
            processed
                .output
                .meta_for(row.id)
                .map(|meta| (row.id, meta.clone()))
        })
        .collect();

    write_flat_table(&output_path(out, ""), &flat.output)?;
    write_meta_table(&output_path(out, "_meta"), &kept)?;
    info!(
        "Cleaned {} of {} charts ({} dropped)",
        flat.output.len(),
        table.len(),
        processed.failures.len() + flat.failures.len()
    );
    Ok(())
}

/// # Summary
/// 按日分界切分扁平表，可选对 X 加权。
pub fn split(config: &AppConfig, input: &Path, out: &Path, weight: Option<f64>) -> CmdResult {
    let table = read_flat_table(input)?;
    let (x, y) = day_split(&table, &config.layout)?;
    let x = match weight {
        Some(adjust) => weight_features(&x, adjust)?,
        None => x,
    };

    write_flat_table(&output_path(out, "_X"), &x)?;
    write_flat_table(&output_path(out, "_y"), &y)?;
    info!(
        "Split {} rows into {} X columns and {} y columns",
        table.len(),
        x.width(),
        y.width()
    );
    Ok(())
}
