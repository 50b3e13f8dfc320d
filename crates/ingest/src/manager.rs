use crate::error::IngestError;
use rousoku_core::chart::entity::RowId;
use rousoku_core::common::{ChartRequest, DayLayout};
use rousoku_core::feed::entity::ParsedChart;
use rousoku_core::feed::error::FeedError;
use rousoku_core::feed::port::ChartProvider;
use rousoku_core::store::port::ChartStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 单个失败的工作单元及其原因。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitFailure {
    pub request: ChartRequest,
    pub cause: String,
}

/// # Summary
/// 一次批量抓取的结果汇总。
///
/// # Invariants
/// - `succeeded == saved.len()`，`succeeded + failures.len()` 等于提交的工作单元数。
/// - 失败列表的顺序取决于抓取完成顺序，不保证与提交顺序一致。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub saved: Vec<RowId>,
    pub failures: Vec<UnitFailure>,
}

/// # Summary
/// 批量抓取管理器，编译期只依赖 `rousoku-core` 中的端口定义。
///
/// # Invariants
/// - 同时进行中的抓取不超过 `workers` 个。
/// - 只有写入任务会调用 `ChartStore::save_chart`，写入天然串行。
pub struct IngestManager {
    provider: Arc<dyn ChartProvider>,
    store: Arc<dyn ChartStore>,
    layout: DayLayout,
    workers: usize,
}

type Outcome = (ChartRequest, Result<ParsedChart, FeedError>);

impl IngestManager {
    /// # Summary
    /// 创建 IngestManager 实例。
    ///
    /// # Arguments
    /// * `provider` - 图表数据源。
    /// * `store` - 原始图表存储。
    /// * `layout` - 图表形态参数，原样传给数据源解析。
    /// * `workers` - worker 数量，至少为 1。
    pub fn new(
        provider: Arc<dyn ChartProvider>,
        store: Arc<dyn ChartStore>,
        layout: DayLayout,
        workers: usize,
    ) -> Self {
        Self {
            provider,
            store,
            layout,
            workers: workers.max(1),
        }
    }

    /// # Summary
    /// 执行一批抓取请求。
    ///
    /// # Logic
    /// 1. 全部请求放入任务队列，`workers` 个 worker 协程从队列中竞争领取。
    /// 2. 每个 worker 抓取并解析后，把 (请求, 结果) 发往结果队列。
    /// 3. 唯一的写入协程按完成顺序消费结果：成功的保存到存储，失败的连同请求记入报告。
    /// 4. 等待全部 worker 与写入协程结束，记录存储中的图表总数后返回报告。
    ///
    /// # Arguments
    /// * `requests` - 工作单元列表。
    ///
    /// # Returns
    /// * `Result<BatchReport, IngestError>` - 仅在任务队列关闭或协程异常退出时返回错误。
    pub async fn run_batch(&self, requests: Vec<ChartRequest>) -> Result<BatchReport, IngestError> {
        let total = requests.len();
        info!("Starting batch of {} requests with {} workers", total, self.workers);

        let (job_tx, job_rx) = mpsc::unbounded_channel::<ChartRequest>();
        for request in requests {
            if job_tx.send(request).is_err() {
                return Err(IngestError::Worker("job queue closed".into()));
            }
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let (result_tx, result_rx) = mpsc::channel::<Outcome>(self.workers);
        let writer = self.spawn_writer(result_rx);

        let workers: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|n| {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let provider = self.provider.clone();
                let layout = self.layout;
                tokio::spawn(async move {
                    loop {
                        // 锁只在领取任务期间持有
                        let next = job_rx.lock().await.recv().await;
                        let Some(request) = next else { break };
                        debug!("Worker {} fetching {}", n, request);
                        let result = provider.fetch_chart(&request, &layout).await;
                        if result_tx.send((request, result)).await.is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);

        for worker in workers {
            worker
                .await
                .map_err(|e| IngestError::Worker(e.to_string()))?;
        }
        let report = writer
            .await
            .map_err(|e| IngestError::Worker(e.to_string()))?;

        // 计数只用于日志，失败不影响报告
        match self.store.count().await {
            Ok(stored) => info!(
                "Batch finished: {} of {} succeeded, {} failed, store holds {} charts",
                report.succeeded,
                total,
                report.failures.len(),
                stored
            ),
            Err(e) => warn!(
                "Batch finished: {} of {} succeeded, {} failed, store count unavailable: {}",
                report.succeeded,
                total,
                report.failures.len(),
                e
            ),
        }
        Ok(report)
    }

    /// 写入协程：唯一的存储写者，同时负责汇总报告。
    fn spawn_writer(&self, mut results: mpsc::Receiver<Outcome>) -> JoinHandle<BatchReport> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut report = BatchReport::default();
            while let Some((request, result)) = results.recv().await {
                let cause = match result {
                    Ok(parsed) => match store.save_chart(&parsed.meta, &parsed.to_chart()).await {
                        Ok(id) => {
                            debug!("Saved {} as row {}", request, id);
                            report.succeeded += 1;
                            report.saved.push(id);
                            continue;
                        }
                        Err(e) => e.to_string(),
                    },
                    Err(e) => e.to_string(),
                };
                warn!("Chart pull failed for {}: {}", request, cause);
                report.failures.push(UnitFailure { request, cause });
            }
            report
        })
    }
}
