use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rousoku_core::chart::stage::Stage;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 配置文件路径，不存在时使用默认配置
    #[arg(short, long, default_value = "rousoku.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 抓取证券列表中每个代码在日期区间内的全部工作日图表
    Pull {
        /// 证券代码列表文件，每行一个代码
        symbols: PathBuf,

        #[arg(long, default_value_t = 0)]
        from_index: usize,

        #[arg(long)]
        to_index: Option<usize>,

        /// 区间起点 (YYYY-MM-DD，包含)
        #[arg(long)]
        start: NaiveDate,

        /// 区间终点 (YYYY-MM-DD，不包含)
        #[arg(long)]
        end: NaiveDate,

        /// K 线周期 (分钟)
        #[arg(long, default_value_t = 5)]
        interval: u32,

        /// 批量报告 (JSON) 输出路径，默认 `<data_dir>/pull_report.json`
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// 对已抓取的图表执行归一化流水线并导出扁平表与元数据表
    Clean {
        /// 输出前缀：写出 `<out>.csv` 与 `<out>_meta.csv`
        #[arg(long)]
        out: PathBuf,

        /// 覆盖配置中的阶段列表，例如 `end_of_day,zero,normalize`
        #[arg(long, value_delimiter = ',')]
        stages: Option<Vec<Stage>>,
    },

    /// 按日分界把扁平表切分为 X / y
    Split {
        /// `clean` 导出的扁平表
        input: PathBuf,

        /// 输出前缀：写出 `<out>_X.csv` 与 `<out>_y.csv`
        #[arg(long)]
        out: PathBuf,

        /// 对 X 应用时间衰减权重，参数为首根 K 线的权重
        #[arg(long)]
        weight: Option<f64>,
    },
}
