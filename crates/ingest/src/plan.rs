use crate::error::IngestError;
use chrono::NaiveDate;
use rousoku_core::common::{ChartRequest, weekday_pairs};
use std::path::Path;

/// # Summary
/// 解析证券代码列表文本：每行一个代码，忽略空行与首尾空白。
///
/// # Arguments
/// * `text`: 列表文件内容。
/// * `from`: 起始下标 (包含)。
/// * `to`: 结束下标 (不包含)，None 表示到列表末尾。
///
/// # Returns
/// 截取后的代码列表；区间越界或反向时返回 `IngestError::Symbols`。
pub fn parse_symbols(text: &str, from: usize, to: Option<usize>) -> Result<Vec<String>, IngestError> {
    let symbols: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    let to = to.unwrap_or(symbols.len());
    symbols
        .get(from..to)
        .map(<[String]>::to_vec)
        .ok_or_else(|| {
            IngestError::Symbols(format!(
                "range {from}..{to} is invalid for {} symbols",
                symbols.len()
            ))
        })
}

/// 读取证券代码列表文件，规则同 `parse_symbols`。
pub fn load_symbols(path: &Path, from: usize, to: Option<usize>) -> Result<Vec<String>, IngestError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| IngestError::Symbols(format!("{}: {e}", path.display())))?;
    parse_symbols(&text, from, to)
}

/// # Summary
/// 为每个证券代码生成按工作日配对的抓取请求。
///
/// # Logic
/// 1. 由 `weekday_pairs(start, end)` 得到日期对 `(d0, d1), (d1, d2), ...`。
/// 2. 每个 (代码, 日期对) 生成一个 `ChartRequest`，顺序为代码优先。
pub fn plan_requests(
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    interval_minutes: u32,
) -> Vec<ChartRequest> {
    let pairs = weekday_pairs(start, end);
    symbols
        .iter()
        .flat_map(|symbol| {
            pairs
                .iter()
                .map(move |(d0, d1)| ChartRequest::new(symbol.clone(), interval_minutes, *d0, *d1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols_slices_list() {
        let text = "AAPL\n\n  MSFT \nIBM\r\nGOOG\n";
        assert_eq!(parse_symbols(text, 0, None).unwrap(), vec!["AAPL", "MSFT", "IBM", "GOOG"]);
        assert_eq!(parse_symbols(text, 1, Some(3)).unwrap(), vec!["MSFT", "IBM"]);
        assert!(parse_symbols(text, 0, Some(0)).unwrap().is_empty());
        assert!(matches!(parse_symbols(text, 3, Some(9)), Err(IngestError::Symbols(_))));
        assert!(matches!(parse_symbols(text, 3, Some(1)), Err(IngestError::Symbols(_))));
    }

    #[test]
    fn test_plan_requests_pairs_weekdays() {
        let symbols = vec!["AAPL".to_string(), "IBM".to_string()];
        // 2014-03-06 周四 .. 2014-03-11 周二 (不含)
        let requests = plan_requests(
            &symbols,
            NaiveDate::from_ymd_opt(2014, 3, 6).unwrap(),
            NaiveDate::from_ymd_opt(2014, 3, 11).unwrap(),
            5,
        );
        // 工作日: 06, 07, 10 -> 两个日期对
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].symbol, "AAPL");
        assert_eq!(requests[1].start, NaiveDate::from_ymd_opt(2014, 3, 7).unwrap());
        assert_eq!(requests[1].end, NaiveDate::from_ymd_opt(2014, 3, 10).unwrap());
        assert_eq!(requests[2].symbol, "IBM");
        assert!(requests.iter().all(|r| r.interval_minutes == 5));
    }

    #[test]
    fn test_load_symbols_missing_file() {
        let result = load_symbols(Path::new("/nonexistent/symbols.txt"), 0, None);
        assert!(matches!(result, Err(IngestError::Symbols(_))));
    }
}
