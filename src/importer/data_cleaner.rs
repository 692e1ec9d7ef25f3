// ==========================================
// PI 产能对账引擎 - 数据清洗器
// ==========================================
// 职责: TRIM / NULL 标准化 / 宽松数值解析 / 点数向上取整
// 红线: 数值单元格解析失败一律按 0 处理，不报错
// ==========================================

/// 宽松数值解析
///
/// - 空串、占位符 "-"、非数值 → 0
/// - 去除千分位逗号与首尾空白
/// - NaN / 无穷 → 0
pub fn parse_lenient_number(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return 0.0;
    }

    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// 点数向上取整（导入阶段唯一的取整点）
pub fn ceil_value(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    // 负零统一为 0
    let ceiled = value.ceil();
    if ceiled == 0.0 {
        0
    } else {
        ceiled as i64
    }
}

/// 解析并向上取整
///
/// # 示例
/// ```
/// use pi_capacity_recon::importer::data_cleaner::ceil_points;
/// assert_eq!(ceil_points("3.2"), 4);
/// assert_eq!(ceil_points("-"), 0);
/// ```
pub fn ceil_points(value: &str) -> i64 {
    ceil_value(parse_lenient_number(value))
}

// ==========================================
// DataCleaner - 文本清洗
// ==========================================
pub struct DataCleaner;

impl DataCleaner {
    pub fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// 空白值归一为 None
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 拆分标签（逗号 / 分号 / 空白），去重保序
    pub fn split_labels(&self, value: &str) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for token in value.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
            let token = token.trim();
            if !token.is_empty() && !labels.iter().any(|l| l == token) {
                labels.push(token.to_string());
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient_number() {
        assert_eq!(parse_lenient_number("12.5"), 12.5);
        assert_eq!(parse_lenient_number("  8 "), 8.0);
        assert_eq!(parse_lenient_number("1,200"), 1200.0);
        assert_eq!(parse_lenient_number("-"), 0.0);
        assert_eq!(parse_lenient_number(""), 0.0);
        assert_eq!(parse_lenient_number("TBD"), 0.0);
        assert_eq!(parse_lenient_number("NaN"), 0.0);
        assert_eq!(parse_lenient_number("-3"), -3.0);
    }

    #[test]
    fn test_ceil_points() {
        assert_eq!(ceil_points("3.2"), 4);
        assert_eq!(ceil_points("2.1"), 3);
        assert_eq!(ceil_points("5"), 5);
        assert_eq!(ceil_points("-0.5"), 0);
        assert_eq!(ceil_points("abc"), 0);
        assert_eq!(ceil_value(f64::INFINITY), 0);
    }

    #[test]
    fn test_normalize_null() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ".to_string())), None);
        assert_eq!(
            cleaner.normalize_null(Some("  value  ".to_string())),
            Some("value".to_string())
        );
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_split_labels() {
        let cleaner = DataCleaner;
        assert_eq!(
            cleaner.split_labels("BE, pi-26.1;BE  urgent"),
            vec!["BE", "pi-26.1", "urgent"]
        );
        assert!(cleaner.split_labels("  ").is_empty());
    }
}
