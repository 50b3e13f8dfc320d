use csv::{Reader, Writer};
use rousoku_core::chart::entity::{ChartMeta, FlatTable, RowId};
use rousoku_core::store::error::StoreError;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// 行标识列的表头名，位于每个导出表格的第一列。
pub const ROW_COLUMN: &str = "row";

/// 元数据表的列名，顺序固定。
pub const META_COLUMNS: [&str; 4] = ["firstDay", "year", "symbol", "secondDay"];

fn io_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Io(e.to_string())
}

fn parse_row_id(raw: &str) -> Result<RowId, StoreError> {
    raw.trim()
        .parse::<u64>()
        .map(RowId)
        .map_err(|e| StoreError::Format(format!("invalid row id '{raw}': {e}")))
}

/// # Summary
/// 将扁平特征表写为 CSV。
///
/// # Logic
/// 1. 表头为 `row` 加全部列名。
/// 2. 每行先写行标识，再按列顺序写数值 (最短可逆的十进制表示)。
///
/// # Arguments
/// * `path`: 目标文件路径，已存在则覆盖。
/// * `table`: 扁平特征表。
pub fn write_flat_table(path: &Path, table: &FlatTable) -> Result<(), StoreError> {
    let mut writer = Writer::from_path(path).map_err(io_error)?;

    let header = std::iter::once(ROW_COLUMN).chain(table.columns().iter().map(String::as_str));
    writer.write_record(header).map_err(io_error)?;

    for row in table.rows() {
        let record = std::iter::once(row.id.to_string())
            .chain(row.values.iter().map(ToString::to_string));
        writer.write_record(record).map_err(io_error)?;
    }

    writer.flush().map_err(io_error)?;
    info!("Wrote {} rows x {} columns to {}", table.len(), table.width(), path.display());
    Ok(())
}

/// # Summary
/// 读取 `write_flat_table` 写出的 CSV。
///
/// # Logic
/// 1. 表头第一列必须是 `row`，其余为列名。
/// 2. 每行解析行标识与数值，宽度与表头不符或数值非法时返回 `StoreError::Format`。
pub fn read_flat_table(path: &Path) -> Result<FlatTable, StoreError> {
    let mut reader = Reader::from_path(path).map_err(io_error)?;

    let headers = reader.headers().map_err(io_error)?.clone();
    if headers.get(0) != Some(ROW_COLUMN) {
        return Err(StoreError::Format(format!(
            "first column of {} must be '{ROW_COLUMN}'",
            path.display()
        )));
    }
    let mut table = FlatTable::new(headers.iter().skip(1).map(String::from).collect());

    for result in reader.records() {
        let record = result.map_err(|e| StoreError::Format(e.to_string()))?;
        let id = parse_row_id(record.get(0).unwrap_or_default())?;
        let values = record
            .iter()
            .skip(1)
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| StoreError::Format(format!("row {id}: invalid value '{v}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        table
            .push_row(id, values)
            .map_err(|e| StoreError::Format(e.to_string()))?;
    }

    Ok(table)
}

/// # Summary
/// 将行标识到元数据的映射写为 CSV (表头 `row,firstDay,year,symbol,secondDay`)。
pub fn write_meta_table(path: &Path, meta: &BTreeMap<RowId, ChartMeta>) -> Result<(), StoreError> {
    let mut writer = Writer::from_path(path).map_err(io_error)?;
    writer
        .write_record(std::iter::once(ROW_COLUMN).chain(META_COLUMNS))
        .map_err(io_error)?;

    for (id, m) in meta {
        writer
            .write_record([
                id.to_string().as_str(),
                m.first_day.as_str(),
                m.year.as_str(),
                m.symbol.as_str(),
                m.second_day.as_str(),
            ])
            .map_err(io_error)?;
    }

    writer.flush().map_err(io_error)
}

/// 读取 `write_meta_table` 写出的元数据表。
pub fn read_meta_table(path: &Path) -> Result<BTreeMap<RowId, ChartMeta>, StoreError> {
    let mut reader = Reader::from_path(path).map_err(io_error)?;

    let headers = reader.headers().map_err(io_error)?;
    let expected: Vec<&str> = std::iter::once(ROW_COLUMN).chain(META_COLUMNS).collect();
    if headers.iter().collect::<Vec<_>>() != expected {
        return Err(StoreError::Format(format!(
            "unexpected meta header in {}",
            path.display()
        )));
    }

    let mut meta = BTreeMap::new();
    for result in reader.records() {
        let record = result.map_err(|e| StoreError::Format(e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        meta.insert(
            parse_row_id(&field(0))?,
            ChartMeta {
                first_day: field(1),
                year: field(2),
                symbol: field(3),
                second_day: field(4),
            },
        );
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_id_parsing() {
        assert_eq!(parse_row_id(" 42").unwrap(), RowId(42));
        assert!(matches!(parse_row_id("-1"), Err(StoreError::Format(_))));
        assert!(matches!(parse_row_id(""), Err(StoreError::Format(_))));
    }
}
