// ==========================================
// PI 产能对账引擎 - 文件解析器
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv) / JSON (.json，仅工作项)
// 产能表: 无表头的原始二维网格
// 工作项: 首行为表头的行记录
// ==========================================

use crate::domain::capacity::CapacityGrid;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 文件扩展名（小写）
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

/// 读取 CSV 为原始行（不区分表头）
fn read_csv_rows(path: &Path) -> ImportResult<Vec<Vec<String>>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // 允许行长度不一致
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|v| v.trim().to_string()).collect());
    }
    Ok(rows)
}

/// 读取 Excel 工作表为原始行（未指定时取第一个工作表）
fn read_excel_rows(path: &Path, sheet: Option<&str>) -> ImportResult<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.trim().eq_ignore_ascii_case(name.trim()))
            .cloned()
            .ok_or_else(|| ImportError::SheetNotFound(name.to_string()))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;

    // Range 从首个非空单元格开始，补齐左上角偏移以保持原始坐标
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row];
    for data_row in range.rows() {
        let mut row = vec![String::new(); start_col];
        row.extend(data_row.iter().map(|cell| cell.to_string().trim().to_string()));
        rows.push(row);
    }
    Ok(rows)
}

// ==========================================
// GridParser - 产能表解析
// ==========================================
pub struct GridParser;

impl GridParser {
    /// 解析产能表为不可变网格快照
    pub fn parse<P: AsRef<Path>>(&self, file_path: P, sheet: Option<&str>) -> ImportResult<CapacityGrid> {
        let path = file_path.as_ref();
        ensure_exists(path)?;

        let rows = match extension_of(path).as_str() {
            "csv" => read_csv_rows(path)?,
            "xlsx" | "xls" | "xlsm" => read_excel_rows(path, sheet)?,
            ext => return Err(ImportError::UnsupportedFormat(ext.to_string())),
        };

        tracing::debug!(path = %path.display(), rows = rows.len(), "产能表解析完成");
        Ok(CapacityGrid::new(rows))
    }
}

// ==========================================
// IssueFileParser - 工作项文件解析
// ==========================================
pub struct IssueFileParser;

impl IssueFileParser {
    /// 解析为行记录（HashMap<列名, 值>）
    pub fn parse_to_raw_records<P: AsRef<Path>>(
        &self,
        file_path: P,
    ) -> ImportResult<Vec<HashMap<String, String>>> {
        let path = file_path.as_ref();
        ensure_exists(path)?;

        match extension_of(path).as_str() {
            "csv" => Ok(rows_to_records(read_csv_rows(path)?)),
            "xlsx" | "xls" | "xlsm" => Ok(rows_to_records(read_excel_rows(path, None)?)),
            "json" => {
                let text = std::fs::read_to_string(path)?;
                json_to_records(&text)
            }
            ext => Err(ImportError::UnsupportedFormat(ext.to_string())),
        }
    }
}

/// 首行作表头，其余行转为记录；跳过完全空白的行
fn rows_to_records(rows: Vec<Vec<String>>) -> Vec<HashMap<String, String>> {
    let mut iter = rows.into_iter();
    let headers: Vec<String> = match iter.next() {
        Some(h) => h.into_iter().map(|s| s.trim().to_string()).collect(),
        None => return Vec::new(),
    };

    iter.filter_map(|row| {
        let record: HashMap<String, String> = headers
            .iter()
            .zip(row)
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v.trim().to_string()))
            .collect();
        if record.values().all(|v| v.is_empty()) {
            None
        } else {
            Some(record)
        }
    })
    .collect()
}

/// JSON 工作项：顶层数组，或 {"issues": [...]} 包装
pub fn json_to_records(text: &str) -> ImportResult<Vec<HashMap<String, String>>> {
    let value: Value = serde_json::from_str(text)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("issues") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ImportError::JsonParseError(
                    "期望数组或包含 issues 数组的对象".to_string(),
                ))
            }
        },
        _ => {
            return Err(ImportError::JsonParseError(
                "期望数组或包含 issues 数组的对象".to_string(),
            ))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(
                obj.into_iter()
                    .map(|(k, v)| (k, json_scalar_to_string(&v)))
                    .collect(),
            ),
            _ => None,
        })
        .collect())
}

fn json_scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(json_scalar_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn temp_with_suffix(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_grid_from_csv_keeps_ragged_rows() {
        let file = temp_with_suffix(".csv", "MMPM,,\nBorg\nAllocation Type,x,y,z\n");
        let grid = GridParser.parse(file.path(), None).unwrap();

        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.cell(0, 0), "MMPM");
        assert_eq!(grid.cell(1, 0), "Borg");
        assert_eq!(grid.cell(2, 3), "z");
        assert_eq!(grid.column_count(), 4);
    }

    #[test]
    fn test_grid_file_not_found() {
        let result = GridParser.parse("non_existent_capacity.csv", None);
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let file = temp_with_suffix(".txt", "x");
        assert!(matches!(
            GridParser.parse(file.path(), None),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_issue_csv_skips_blank_rows() {
        let file = temp_with_suffix(
            ".csv",
            "Issue key,Issue Type,Scrum Team\nABC-1,Story,Borg\n,,\nABC-2,Bug,Hive\n",
        );
        let records = IssueFileParser.parse_to_raw_records(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Issue key"), Some(&"ABC-1".to_string()));
        assert_eq!(records[1].get("Scrum Team"), Some(&"Hive".to_string()));
    }

    #[test]
    fn test_json_records_flatten_scalars() {
        let records = json_to_records(
            r#"{"issues": [
                {"key": "ABC-1", "storyPoints": 3.5, "labels": ["BE", "urgent"], "epicLink": null},
                "ignored"
            ]}"#,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["key"], "ABC-1");
        assert_eq!(records[0]["storyPoints"], "3.5");
        assert_eq!(records[0]["labels"], "BE,urgent");
        assert_eq!(records[0]["epicLink"], "");
    }

    #[test]
    fn test_json_wrong_shape() {
        assert!(matches!(
            json_to_records(r#"{"total": 0}"#),
            Err(ImportError::JsonParseError(_))
        ));
    }
}
