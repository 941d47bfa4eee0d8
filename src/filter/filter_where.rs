use super::types::{FilterOp, FilterWhereInfo, FilterWhereOptions, SqlValue};

/// Conjunction of conditions. Every condition is AND-ed; multi-column
/// substring matches are OR-ed inside their own parentheses.
#[derive(Debug, Clone, Default)]
pub struct FilterWhere {
    param_values: Vec<SqlValue>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: FilterWhereInfo) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[FilterWhereInfo] {
        &self.conditions
    }

    pub fn generate(&self, options: &FilterWhereOptions) -> (String, Vec<SqlValue>) {
        let mut builder = Self {
            param_values: vec![],
            param_index: 0,
            conditions: vec![],
        };

        let mut sql_conditions = vec![];
        if options.soft_delete && !options.include_deleted {
            sql_conditions.push("\"deleted_at\" IS NULL".to_string());
        }
        for condition in &self.conditions {
            sql_conditions.push(builder.build_sql_condition(condition));
        }

        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        (where_clause, builder.param_values)
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        let quoted: Vec<String> = condition.columns.iter().map(|c| format!("\"{}\"", c)).collect();
        let first = quoted.first().cloned().unwrap_or_default();

        match condition.operator {
            FilterOp::Eq | FilterOp::Neq => match condition.data.first() {
                None | Some(SqlValue::Null) => {
                    let op = if condition.operator == FilterOp::Eq { "IS NULL" } else { "IS NOT NULL" };
                    format!("{} {}", first, op)
                }
                Some(value) => {
                    let p = self.param(value.clone());
                    format!("{} {} {}", first, condition.operator.to_sql(), p)
                }
            },
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let value = condition.data.first().cloned().unwrap_or(SqlValue::Null);
                let p = self.param(value);
                format!("{} {} {}", first, condition.operator.to_sql(), p)
            }
            FilterOp::Contains => {
                let value = condition.data.first().cloned().unwrap_or(SqlValue::Null);
                let p = self.param(value);
                let parts: Vec<String> = quoted
                    .iter()
                    .map(|c| format!("{} LIKE {} ESCAPE '\\'", c, p))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
            FilterOp::In => {
                if condition.data.is_empty() {
                    return "1=0".to_string();
                }
                let params: Vec<String> = condition.data.iter().map(|v| self.param(v.clone())).collect();
                format!("{} IN ({})", first, params.join(", "))
            }
            FilterOp::IsNull | FilterOp::IsNotNull => format!("{} {}", first, condition.operator.to_sql()),
        }
    }

    fn param(&mut self, value: SqlValue) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("?{}", self.param_index)
    }
}

/// Wrap a user search term for `LIKE ... ESCAPE '\'`, treating `%` and `_`
/// literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
