use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `"created_at desc, title"` and check every column against the
    /// resource's sortable columns.
    pub fn validate_and_parse(spec: &str, allowed: &[&str]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = Self::parse_order_string(spec)?;
        for info in &infos {
            if !allowed.contains(&info.column.as_str()) {
                return Err(FilterError::InvalidSort(format!(
                    "cannot sort by '{}', expected one of: {}",
                    info.column,
                    allowed.join(", ")
                )));
            }
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                // "-created_at" is shorthand for "created_at desc"
                let (col, default_sort) = match col.strip_prefix('-') {
                    Some(stripped) => (stripped, SortDirection::Desc),
                    None => (col, SortDirection::Asc),
                };
                let sort = match it.next() {
                    None => default_sort,
                    Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                    Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                    Some(dir) => {
                        return Err(FilterError::InvalidSort(format!("unknown direction '{}'", dir)));
                    }
                };
                if it.next().is_some() {
                    return Err(FilterError::InvalidSort(format!("malformed sort term '{}'", trimmed)));
                }
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
