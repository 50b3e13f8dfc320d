mod cli;
mod commands;
mod logging;
mod settings;

use clap::Parser;
use cli::{Cli, Command};
use commands::PullArgs;
use std::path::PathBuf;
use tracing::info;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责加载配置、初始化日志，并把具体实现组装后交给各子命令。
///
/// # Logic
/// 1. 解析命令行并加载配置。
/// 2. 设置存储根目录，初始化全局日志。
/// 3. 执行子命令。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let app_config = settings::load_config(&cli.config)?;

    let data_dir = PathBuf::from(&app_config.storage.data_dir);
    rousoku_store::config::set_root_dir(data_dir.clone());
    let _guard = logging::init_logging(&data_dir)?;
    info!("Rousoku starting, data dir {}", data_dir.display());

    match cli.command {
        Command::Pull {
            symbols,
            from_index,
            to_index,
            start,
            end,
            interval,
            report,
        } => {
            let args = PullArgs {
                symbols,
                from_index,
                to_index,
                start,
                end,
                interval,
                report,
            };
            commands::pull(&app_config, args).await?;
        }
        Command::Clean { out, stages } => commands::clean(&app_config, &out, stages).await?,
        Command::Split { input, out, weight } => {
            commands::split(&app_config, &input, &out, weight)?;
        }
    }

    Ok(())
}
