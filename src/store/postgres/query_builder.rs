use serde_json::Value;
use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};

use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData};
use crate::store::StoreError;

pub struct QueryBuilder<T> {
    table_name: String,
    filter: Option<Filter>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>) -> Result<Self, StoreError> {
        let name = table_name.into();
        // Reuse Filter table name validation
        Filter::new(&name)?;
        Ok(Self {
            table_name: name,
            filter: None,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, StoreError> {
        let mut filter = Filter::new(&self.table_name)?;
        filter.assign(filter_data)?;
        self.filter = Some(filter);
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, StoreError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn select_optional(self, pool: &PgPool) -> Result<Option<T>, StoreError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_optional(pool).await?)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, StoreError> {
        let sql_result = match self.filter {
            Some(filter) => filter.to_count_sql()?,
            None => SqlResult { query: format!("SELECT COUNT(*) as count FROM \"{}\"", self.table_name), params: vec![] },
        };

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    fn sql_result(&self) -> Result<SqlResult, StoreError> {
        match &self.filter {
            Some(filter) => Ok(filter.to_sql()?),
            None => Ok(SqlResult { query: format!("SELECT * FROM \"{}\"", self.table_name), params: vec![] }),
        }
    }
}

/// Parameters travel as JSON. Strings always bind as text; the placeholder's
/// `::uuid` or `::timestamptz` cast, taken from the column's field kind,
/// converts them on the server.
enum Bound<'q> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'q str),
    Json(Value),
}

fn classify(v: &Value) -> Bound<'_> {
    match v {
        Value::Null => Bound::Null,
        Value::Bool(b) => Bound::Bool(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Bound::Int(i),
            (None, Some(f)) => Bound::Float(f),
            _ => Bound::Json(v.clone()),
        },
        Value::String(s) => Bound::Text(s),
        // Arrays are expanded by FilterWhere before binding
        Value::Array(_) | Value::Object(_) => Bound::Json(v.clone()),
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match classify(v) {
        Bound::Null => q.bind(None::<String>),
        Bound::Bool(b) => q.bind(b),
        Bound::Int(i) => q.bind(i),
        Bound::Float(f) => q.bind(f),
        Bound::Text(s) => q.bind(s),
        Bound::Json(j) => q.bind(j),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match classify(v) {
        Bound::Null => q.bind(None::<String>),
        Bound::Bool(b) => q.bind(b),
        Bound::Int(i) => q.bind(i),
        Bound::Float(f) => q.bind(f),
        Bound::Text(s) => q.bind(s),
        Bound::Json(j) => q.bind(j),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_bind_as_text_whatever_their_shape() {
        assert!(matches!(classify(&json!("2020-01-01T00:00:00Z")), Bound::Text("2020-01-01T00:00:00Z")));
        assert!(matches!(classify(&json!("5d713995-b721-c3bb-38c1-81d8ae6a1a5e")), Bound::Text(_)));
        assert!(matches!(classify(&json!("(111) 111-1111")), Bound::Text(_)));
    }

    #[test]
    fn numbers_keep_their_width() {
        assert!(matches!(classify(&json!(10000)), Bound::Int(10000)));
        assert!(matches!(classify(&json!(4.5)), Bound::Float(_)));
        assert!(matches!(classify(&json!(true)), Bound::Bool(true)));
        assert!(matches!(classify(&Value::Null), Bound::Null));
    }
}
