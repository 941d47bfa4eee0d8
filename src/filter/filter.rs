use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{like_pattern, FilterWhere};
use super::types::{FilterOp, FilterOrderInfo, FilterWhereInfo, FilterWhereOptions, SortDirection, SqlResult, SqlValue};

/// Single-table SELECT builder. Conditions are AND-ed; every optional
/// helper (`eq_opt`, `gte_opt`, ...) is a no-op when given `None`, so a
/// search request maps onto a filter field by field.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    where_data: FilterWhere,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            where_data: FilterWhere::new(),
            order_data: vec![],
            limit: None,
            offset: None,
            options: FilterWhereOptions::default(),
        })
    }

    /// Mark the table as soft-deletable so `deleted_at IS NULL` is implied.
    pub fn soft_delete(&mut self, enabled: bool) -> &mut Self {
        self.options.soft_delete = enabled;
        self
    }

    pub fn include_deleted(&mut self, include: bool) -> &mut Self {
        self.options.include_deleted = include;
        self
    }

    pub fn condition(&mut self, column: &str, operator: FilterOp, value: impl Into<SqlValue>) -> &mut Self {
        self.where_data.push(FilterWhereInfo {
            columns: vec![column.to_string()],
            operator,
            data: vec![value.into()],
        });
        self
    }

    pub fn eq(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.condition(column, FilterOp::Eq, value)
    }

    pub fn eq_opt<V: Into<SqlValue>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.eq(column, v);
        }
        self
    }

    pub fn gte_opt<V: Into<SqlValue>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.condition(column, FilterOp::Gte, v);
        }
        self
    }

    pub fn lte_opt<V: Into<SqlValue>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.condition(column, FilterOp::Lte, v);
        }
        self
    }

    /// `column IN (...)`; an empty list matches nothing.
    pub fn in_opt<V: Into<SqlValue>>(&mut self, column: &str, values: Option<Vec<V>>) -> &mut Self {
        if let Some(values) = values {
            self.where_data.push(FilterWhereInfo {
                columns: vec![column.to_string()],
                operator: FilterOp::In,
                data: values.into_iter().map(Into::into).collect(),
            });
        }
        self
    }

    /// `true` keeps rows where `column` is NULL, `false` where it is set.
    pub fn null_opt(&mut self, column: &str, is_null: Option<bool>) -> &mut Self {
        if let Some(is_null) = is_null {
            let operator = if is_null { FilterOp::IsNull } else { FilterOp::IsNotNull };
            self.where_data.push(FilterWhereInfo { columns: vec![column.to_string()], operator, data: vec![] });
        }
        self
    }

    /// Case-insensitive (ASCII) substring search across `columns`. Blank
    /// terms are ignored.
    pub fn contains_opt(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let term = match term.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return self,
        };
        self.where_data.push(FilterWhereInfo {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            operator: FilterOp::Contains,
            data: vec![SqlValue::Text(like_pattern(term))],
        });
        self
    }

    /// Apply a client sort spec, falling back to `default` when absent.
    /// `id` is always appended as the final tie-breaker so pages are stable.
    pub fn order(&mut self, spec: Option<&str>, allowed: &[&str], default: &str) -> Result<&mut Self, FilterError> {
        let spec = match spec.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => default,
        };
        let mut infos = FilterOrder::validate_and_parse(spec, allowed)?;
        if !infos.iter().any(|i| i.column == "id") {
            infos.push(FilterOrderInfo { column: "id".to_string(), sort: SortDirection::Asc });
        }
        self.order_data = infos;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: i64) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if offset < 0 {
            return Err(FilterError::InvalidPage("Offset must be non-negative".to_string()));
        }
        self.limit = Some(limit);
        self.offset = Some(offset);
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        self.validate_where_columns()?;
        let (where_clause, params) = self.where_data.generate(&self.options);
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        self.validate_where_columns()?;
        let (where_clause, params) = self.where_data.generate(&self.options);
        let query = format!(
            "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
            self.table_name, where_clause
        );
        Ok(SqlResult { query, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if !Self::is_identifier(name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: '{}'", name)));
        }
        Ok(())
    }

    fn validate_columns(columns: &[String]) -> Result<(), FilterError> {
        for column in columns {
            if !Self::is_identifier(column) {
                return Err(FilterError::InvalidColumn(format!("Invalid column name format: '{}'", column)));
            }
        }
        Ok(())
    }

    fn validate_where_columns(&self) -> Result<(), FilterError> {
        for condition in self.where_data.conditions() {
            Self::validate_columns(&condition.columns)?;
        }
        Ok(())
    }

    fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}
