use rousoku_core::config::AppConfig;
use std::path::Path;

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 读取可选的 TOML 配置文件 (不存在时跳过)。
/// 2. 叠加 `ROUSOKU__` 前缀的环境变量，层级以 `__` 分隔，
///    例如 `ROUSOKU__FEED__WORKERS=3`、`ROUSOKU__PIPELINE__STAGES=end_of_day,zero`。
/// 3. 反序列化为 `AppConfig`，缺失字段取默认值。
pub fn load_config(path: &Path) -> Result<AppConfig, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("ROUSOKU")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("pipeline.stages"),
        )
        .build()?;

    settings.try_deserialize()
}
