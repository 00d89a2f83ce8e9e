use serde_json::json;
use sqlx::{postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use super::query_builder::QueryBuilder;
use crate::filter::{FilterData, ListQuery, ResourceSchema};
use crate::store::{Page, StoreError};

/// Read side of one table: filtered selects and counts driven by `FilterData`.
pub struct Repository<'a, T> {
    schema: &'a ResourceSchema,
    pool: &'a PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<'a, T> Repository<'a, T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(schema: &'a ResourceSchema, pool: &'a PgPool) -> Self {
        Self {
            schema,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_any(&self, mut filter_data: FilterData) -> Result<Vec<T>, StoreError> {
        filter_data.casts = self.schema.casts();
        QueryBuilder::<T>::new(self.schema.table)?
            .filter(filter_data)?
            .select_all(self.pool)
            .await
    }

    pub async fn select_one(&self, mut filter_data: FilterData) -> Result<Option<T>, StoreError> {
        filter_data.casts = self.schema.casts();
        QueryBuilder::<T>::new(self.schema.table)?
            .filter(filter_data)?
            .select_optional(self.pool)
            .await
    }

    pub async fn count(&self, mut filter_data: FilterData) -> Result<i64, StoreError> {
        filter_data.casts = self.schema.casts();
        QueryBuilder::<T>::new(self.schema.table)?
            .filter(filter_data)?
            .count(self.pool)
            .await
    }

    pub async fn select_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.select_one(FilterData {
            where_clause: Some(json!({ "id": id })),
            ..Default::default()
        })
        .await
    }

    pub async fn select_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let filter = FilterData {
            where_clause: Some(json!({ "id": { "$in": ids } })),
            ..Default::default()
        };
        self.select_any(filter).await
    }

    pub async fn select_where(&self, column: &str, value: serde_json::Value) -> Result<Vec<T>, StoreError> {
        let mut where_clause = serde_json::Map::new();
        where_clause.insert(column.to_string(), value);
        self.select_any(FilterData {
            where_clause: Some(where_clause.into()),
            order: Some(json!(["created_at asc", "id asc"])),
            ..Default::default()
        })
        .await
    }

    /// One page of `query` plus the total number of matching rows.
    pub async fn page(&self, query: &ListQuery) -> Result<Page<T>, StoreError> {
        let filter_data = query.to_filter_data(self.schema);
        let total = self
            .count(FilterData {
                where_clause: filter_data.where_clause.clone(),
                ..Default::default()
            })
            .await?;
        let items = self.select_any(filter_data).await?;
        Ok(Page { items, total: total.max(0) as u64 })
    }
}
