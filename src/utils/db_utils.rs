use sqlx::{
    Postgres,
    postgres::PgArguments,
    query::{QueryAs, QueryScalar},
};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    I64(i64),
    Text(String),
    I64Array(Vec<i64>),
}

/// ===============================
/// Dynamic WHERE clause builder
/// ===============================
///
/// Conditions use `{}` for their parameter; every occurrence is replaced by the
/// same positional `$n` placeholder.
#[derive(Debug, Default)]
pub struct SqlFilter {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: &str, value: SqlValue) -> &mut Self {
        self.values.push(value);
        let placeholder = format!("${}", self.values.len());
        self.conditions.push(condition.replace("{}", &placeholder));
        self
    }

    pub fn push_opt<T>(&mut self, condition: &str, value: Option<T>) -> &mut Self
    where
        T: Into<SqlValue>,
    {
        if let Some(value) = value {
            self.push(condition, value.into());
        }
        self
    }

    /// `" WHERE a AND b"`, or empty when no condition was pushed.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Index of the next positional parameter after the filter values.
    pub fn next_param(&self) -> usize {
        self.values.len() + 1
    }

    pub fn bind_as<'q, O>(
        &self,
        mut query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for value in &self.values {
            query = match value.clone() {
                SqlValue::I64(v) => query.bind(v),
                SqlValue::Text(v) => query.bind(v),
                SqlValue::I64Array(v) => query.bind(v),
            };
        }
        query
    }

    pub fn bind_scalar<'q, O>(
        &self,
        mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    ) -> QueryScalar<'q, Postgres, O, PgArguments> {
        for value in &self.values {
            query = match value.clone() {
                SqlValue::I64(v) => query.bind(v),
                SqlValue::Text(v) => query.bind(v),
                SqlValue::I64Array(v) => query.bind(v),
            };
        }
        query
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<i64>> for SqlValue {
    fn from(v: Vec<i64>) -> Self {
        SqlValue::I64Array(v)
    }
}

/// ===============================
/// Pagination
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, 100),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

/// `%term%` for ILIKE with the wildcard characters of the term escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where() {
        let filter = SqlFilter::new();
        assert_eq!(filter.where_clause(), "");
        assert_eq!(filter.next_param(), 1);
    }

    #[test]
    fn placeholders_are_numbered_in_push_order() {
        let mut filter = SqlFilter::new();
        filter
            .push("e.branch_id = ANY({})", SqlValue::I64Array(vec![1, 2]))
            .push_opt("e.id = {}", None::<i64>)
            .push("(e.name ILIKE {} OR e.code ILIKE {})", SqlValue::Text("%a%".into()));

        assert_eq!(
            filter.where_clause(),
            " WHERE e.branch_id = ANY($1) AND (e.name ILIKE $2 OR e.code ILIKE $2)"
        );
        assert_eq!(filter.next_param(), 3);
    }

    #[test]
    fn page_is_clamped() {
        let page = Page::new(Some(0), Some(1_000));
        assert_eq!(page, Page { page: 1, per_page: 100 });
        assert_eq!(page.offset(), 0);

        let page = Page::new(Some(3), None);
        assert_eq!(page.limit(), 20);
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }
}
