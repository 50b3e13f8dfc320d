use crate::normalize::{end_of_day_adjust, lower_chart, normalize_chart, zero_chart};
use crate::{Processed, RowFailure};
use rousoku_core::chart::entity::{Chart, ChartTable};
use rousoku_core::chart::error::ChartError;
use rousoku_core::chart::stage::Stage;
use rousoku_core::common::DayLayout;
use tracing::{debug, info, warn};

/// # Summary
/// 由有序命名阶段组成的归一化流水线。
///
/// # Invariants
/// - 阶段严格按列表顺序从左到右执行。
/// - 每个阶段都是图表到图表的纯函数，流水线本身不持有可变状态。
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
    layout: DayLayout,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>, layout: DayLayout) -> Self {
        Self { stages, layout }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// # Summary
    /// 对单张图表执行一个阶段。
    ///
    /// # Logic
    /// `EndOfDay` 未指定下标时使用 `DayLayout::session_close_index()`。
    pub fn apply_stage(&self, stage: Stage, chart: &Chart) -> Result<Chart, ChartError> {
        match stage {
            Stage::EndOfDay { index } => {
                end_of_day_adjust(chart, index.unwrap_or(self.layout.session_close_index()))
            }
            Stage::Zero => zero_chart(chart),
            Stage::Normalize => normalize_chart(chart),
            Stage::Lower => Ok(lower_chart(chart)),
        }
    }

    /// 依次执行全部阶段，任一阶段失败即返回该错误。
    pub fn apply(&self, chart: &Chart) -> Result<Chart, ChartError> {
        self.stages
            .iter()
            .try_fold(chart.clone(), |acc, stage| self.apply_stage(*stage, &acc))
    }

    /// # Summary
    /// 对整张图表表格逐行执行流水线。
    ///
    /// # Logic
    /// 1. 每行独立执行 `apply`。
    /// 2. 成功的行连同其元数据写入输出表，保持原行标识与顺序。
    /// 3. 失败的行记录到 failures 并记录警告日志，不影响其他行。
    ///
    /// # Arguments
    /// * `table`: 输入图表表格。
    ///
    /// # Returns
    /// 返回 `Processed<ChartTable>`。
    pub fn apply_table(&self, table: &ChartTable) -> Processed<ChartTable> {
        info!(
            "Applying pipeline [{}] to {} charts",
            self.stages
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            table.len()
        );

        let mut output = ChartTable::new();
        let mut failures = Vec::new();
        for row in table.rows() {
            match self.apply(&row.chart) {
                Ok(chart) => {
                    output.insert(row.id, chart, table.meta_for(row.id).cloned());
                }
                Err(error) => {
                    warn!("Row {} dropped by pipeline: {}", row.id, error);
                    failures.push(RowFailure { id: row.id, error });
                }
            }
        }
        debug!(
            "Pipeline finished: {} ok, {} failed",
            output.len(),
            failures.len()
        );

        Processed { output, failures }
    }
}
