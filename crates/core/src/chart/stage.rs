use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// # Summary
/// 归一化流水线中的单个命名阶段。
///
/// # Invariants
/// - 阶段按配置列表从左到右依次执行，顺序即语义。
/// - 以字符串形式出现在配置文件与命令行中，`FromStr` 与 `Display` 互为逆运算。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Stage {
    // 收盘 K 线并入隔夜跳空；None 表示使用 DayLayout 的收盘下标
    EndOfDay { index: Option<usize> },
    // 整图下移至最低价为 0
    Zero,
    // 整图线性缩放到 [0, 100]
    Normalize,
    // 每根 K 线独立下移至最低价为 0
    Lower,
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (name, arg) = match lowered.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (lowered.as_str(), None),
        };
        match (name, arg) {
            ("end_of_day" | "eod", None) => Ok(Stage::EndOfDay { index: None }),
            ("end_of_day" | "eod", Some(arg)) => arg
                .parse::<usize>()
                .map(|index| Stage::EndOfDay { index: Some(index) })
                .map_err(|e| format!("Invalid end_of_day index '{arg}': {e}")),
            ("zero", None) => Ok(Stage::Zero),
            ("normalize" | "norm", None) => Ok(Stage::Normalize),
            ("lower", None) => Ok(Stage::Lower),
            _ => Err(format!("Unknown Stage: {}", s)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::EndOfDay { index: None } => write!(f, "end_of_day"),
            Stage::EndOfDay { index: Some(i) } => write!(f, "end_of_day:{i}"),
            Stage::Zero => write!(f, "zero"),
            Stage::Normalize => write!(f, "normalize"),
            Stage::Lower => write!(f, "lower"),
        }
    }
}

impl TryFrom<String> for Stage {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.to_string()
    }
}
