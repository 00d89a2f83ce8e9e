use chrono::{DateTime, Utc};
use serde_json::{json, Map, Number, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::schema::{FieldKind, FieldSpec, ResourceSchema};
use super::types::{FilterData, FilterOp, SortDirection};
use crate::config::ApiConfig;

const RESERVED: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: &'static FieldSpec,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: &'static FieldSpec,
    pub direction: SortDirection,
}

/// A parsed list request: `field[op]=value` filters, `select`, `sort`,
/// `page` and `limit`, validated against one resource's queryable fields.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub conditions: Vec<Condition>,
    pub sort: Vec<SortKey>,
    pub select: Option<Vec<&'static str>>,
    pub page: u64,
    pub limit: u64,
}

fn split_key(key: &str) -> Result<(&str, Option<&str>), FilterError> {
    match key.split_once('[') {
        Some((name, rest)) => match rest.strip_suffix(']') {
            Some(op) => Ok((name, Some(op))),
            None => Err(FilterError::UnknownField(key.to_string())),
        },
        None => Ok((key, None)),
    }
}

fn parse_paging(raw: Option<&str>, name: &'static str, default: u64) -> Result<u64, FilterError> {
    match raw {
        None => Ok(default),
        Some(s) => match s.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(FilterError::InvalidPaging(name)),
            Ok(n) => Ok(n),
        },
    }
}

fn typed_value(field: &FieldSpec, raw: &str) -> Result<Value, FilterError> {
    let invalid = || FilterError::InvalidValue {
        field: field.name.to_string(),
        value: raw.to_string(),
    };
    let raw = raw.trim();
    Ok(match field.kind {
        FieldKind::Text | FieldKind::TextArray => Value::String(raw.to_string()),
        FieldKind::Number => {
            if let Ok(i) = raw.parse::<i64>() {
                json!(i)
            } else {
                let f = raw.parse::<f64>().map_err(|_| invalid())?;
                Number::from_f64(f).map(Value::Number).ok_or_else(invalid)?
            }
        }
        FieldKind::Bool => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        FieldKind::Uuid => {
            let id = uuid::Uuid::parse_str(raw).map_err(|_| invalid())?;
            Value::String(id.to_string())
        }
        FieldKind::Timestamp => {
            let ts = DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?;
            Value::String(ts.with_timezone(&Utc).to_rfc3339())
        }
    })
}

impl ListQuery {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            conditions: vec![],
            sort: vec![],
            select: None,
            page: 1,
            limit: u64::from(config.default_page_size),
        }
    }

    pub fn parse(params: &[(String, String)], schema: &ResourceSchema, config: &ApiConfig) -> Result<Self, FilterError> {
        let lookup = |name: &str| schema.field(name).ok_or_else(|| FilterError::UnknownField(name.to_string()));
        let param = |name: &str| params.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.as_str());

        let mut query = Self::new(config);
        query.page = parse_paging(param("page"), "page", 1)?;
        query.limit = parse_paging(param("limit"), "limit", u64::from(config.default_page_size))?
            .min(u64::from(config.max_page_size));
        // The row offset must stay representable as a SQL bigint
        let in_range = (query.page - 1)
            .checked_mul(query.limit)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(FilterError::InvalidPaging("page"));
        }

        if let Some(select) = param("select") {
            let mut fields = Vec::new();
            for name in select.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                fields.push(lookup(name)?.name);
            }
            query.select = Some(fields);
        }

        if let Some(sort) = param("sort") {
            for token in sort.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let (name, direction) = match token.strip_prefix('-') {
                    Some(name) => (name, SortDirection::Desc),
                    None => (token, SortDirection::Asc),
                };
                query.sort.push(SortKey { field: lookup(name)?, direction });
            }
        }

        for (key, raw) in params {
            let (name, op) = split_key(key)?;
            if op.is_none() && RESERVED.contains(&name) {
                continue;
            }
            let field = lookup(name)?;
            let op = match op {
                Some(op) => FilterOp::from_query(op).ok_or_else(|| FilterError::UnsupportedOperator(op.to_string()))?,
                None => FilterOp::Eq,
            };
            query.push_condition(field, op, raw)?;
        }

        Ok(query)
    }

    fn push_condition(&mut self, field: &'static FieldSpec, op: FilterOp, raw: &str) -> Result<(), FilterError> {
        let value = match op {
            FilterOp::In => Value::Array(
                raw.split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| typed_value(field, s))
                    .collect::<Result<_, _>>()?,
            ),
            _ => typed_value(field, raw)?,
        };
        // Array columns match on membership of any listed value
        let (op, value) = match (field.kind, op) {
            (FieldKind::TextArray, FilterOp::Eq) => (FilterOp::Any, Value::Array(vec![value])),
            (FieldKind::TextArray, FilterOp::In) => (FilterOp::Any, value),
            (FieldKind::TextArray, other) => {
                return Err(FilterError::UnsupportedOperator(format!("{} on {}", other.key(), field.name)))
            }
            (_, op) => (op, value),
        };
        self.conditions.push(Condition { field, op, value });
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Sort keys as given, or newest first, always ending with `id` so pages
    /// are stable.
    pub fn effective_sort(&self, schema: &ResourceSchema) -> Vec<SortKey> {
        let mut keys = self.sort.clone();
        if keys.is_empty() {
            if let Some(created) = schema.field("createdAt") {
                keys.push(SortKey { field: created, direction: SortDirection::Desc });
            }
        }
        if !keys.iter().any(|k| k.field.name == "id") {
            if let Some(id) = schema.field("id") {
                keys.push(SortKey { field: id, direction: SortDirection::Asc });
            }
        }
        keys
    }

    /// Column-level filter for the SQL backend.
    pub fn to_filter_data(&self, schema: &ResourceSchema) -> FilterData {
        let mut where_map = Map::new();
        for c in &self.conditions {
            let entry = where_map
                .entry(c.field.column.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = entry {
                ops.insert(c.op.key().to_string(), c.value.clone());
            }
        }
        let order = self
            .effective_sort(schema)
            .iter()
            .map(|k| Value::String(format!("{} {}", k.field.column, k.direction.to_sql().to_lowercase())))
            .collect();

        FilterData {
            where_clause: Some(Value::Object(where_map)),
            order: Some(Value::Array(order)),
            limit: Some(self.limit as i64),
            offset: Some(self.offset() as i64),
            casts: schema.casts(),
        }
    }

    /// Evaluate the conditions against a record serialized with its API field names.
    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|c| {
            let actual = lookup_path(record, c.field.name);
            condition_holds(c, actual)
        })
    }

    /// Ordering for in-memory sorting. Missing values sort last ascending,
    /// first descending, like PostgreSQL NULLs.
    pub fn compare(&self, schema: &ResourceSchema, a: &Value, b: &Value) -> Ordering {
        for key in self.effective_sort(schema) {
            let left = lookup_path(a, key.field.name);
            let right = lookup_path(b, key.field.name);
            let ord = compare_nullable(key.field.kind, left, right);
            let ord = match key.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Keep only the selected fields (plus `id`) of a serialized record.
    pub fn project(&self, record: Value) -> Value {
        let Some(select) = &self.select else {
            return record;
        };
        match record {
            Value::Object(mut map) => {
                map.retain(|k, _| k == "id" || select.iter().any(|s| s.split('.').next() == Some(k.as_str())));
                Value::Object(map)
            }
            other => other,
        }
    }
}

fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    if current.is_null() { None } else { Some(current) }
}

fn compare_values(kind: FieldKind, a: &Value, b: &Value) -> Option<Ordering> {
    match kind {
        FieldKind::Number => a.as_f64()?.partial_cmp(&b.as_f64()?),
        FieldKind::Bool => Some(a.as_bool()?.cmp(&b.as_bool()?)),
        FieldKind::Timestamp => {
            let a = DateTime::parse_from_rfc3339(a.as_str()?).ok()?;
            let b = DateTime::parse_from_rfc3339(b.as_str()?).ok()?;
            Some(a.cmp(&b))
        }
        FieldKind::Text | FieldKind::Uuid | FieldKind::TextArray => Some(a.as_str()?.cmp(b.as_str()?)),
    }
}

fn compare_nullable(kind: FieldKind, a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_values(kind, a, b).unwrap_or(Ordering::Equal),
    }
}

fn condition_holds(c: &Condition, actual: Option<&Value>) -> bool {
    let kind = c.field.kind;
    match c.op {
        FilterOp::Eq if c.value.is_null() => actual.is_none(),
        FilterOp::Ne if c.value.is_null() => actual.is_some(),
        FilterOp::Eq => actual.is_some_and(|a| compare_values(kind, a, &c.value) == Some(Ordering::Equal)),
        FilterOp::Ne => actual.map_or(true, |a| compare_values(kind, a, &c.value) != Some(Ordering::Equal)),
        FilterOp::Gt => actual.is_some_and(|a| compare_values(kind, a, &c.value) == Some(Ordering::Greater)),
        FilterOp::Gte => actual.is_some_and(|a| matches!(compare_values(kind, a, &c.value), Some(Ordering::Greater | Ordering::Equal))),
        FilterOp::Lt => actual.is_some_and(|a| compare_values(kind, a, &c.value) == Some(Ordering::Less)),
        FilterOp::Lte => actual.is_some_and(|a| matches!(compare_values(kind, a, &c.value), Some(Ordering::Less | Ordering::Equal))),
        FilterOp::In => {
            let candidates = c.value.as_array().map(Vec::as_slice).unwrap_or_default();
            actual.is_some_and(|a| candidates.iter().any(|v| compare_values(kind, a, v) == Some(Ordering::Equal)))
        }
        FilterOp::Any => {
            let wanted = c.value.as_array().map(Vec::as_slice).unwrap_or_default();
            let present = actual.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
            present.iter().any(|p| wanted.contains(p))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::schema::{BOOTCAMPS, COURSES};

    fn api() -> ApiConfig {
        ApiConfig {
            default_page_size: 25,
            max_page_size: 100,
            max_request_size_bytes: 10 * 1024,
            rate_limit_requests: 0,
            rate_limit_window_secs: 900,
        }
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_operators_paging_and_sort() {
        let q = ListQuery::parse(
            &params(&[("averageCost[lte]", "10000"), ("sort", "-averageCost,name"), ("page", "2"), ("limit", "500")]),
            &BOOTCAMPS,
            &api(),
        )
        .unwrap();
        assert_eq!(q.page, 2);
        assert_eq!(q.limit, 100);
        assert_eq!(q.offset(), 100);
        assert_eq!(q.conditions.len(), 1);
        assert_eq!(q.conditions[0].op, FilterOp::Lte);
        assert_eq!(q.sort[0].direction, SortDirection::Desc);
        assert_eq!(q.sort[1].field.name, "name");
    }

    #[test]
    fn unknown_field_and_operator_are_rejected() {
        assert!(matches!(
            ListQuery::parse(&params(&[("password", "x")]), &BOOTCAMPS, &api()),
            Err(FilterError::UnknownField(_))
        ));
        assert!(matches!(
            ListQuery::parse(&params(&[("averageCost[regex]", "1")]), &BOOTCAMPS, &api()),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(ListQuery::parse(&params(&[("tuition", "cheap")]), &COURSES, &api()).is_err());
        assert!(ListQuery::parse(&params(&[("page", "0")]), &COURSES, &api()).is_err());
    }

    #[test]
    fn bare_field_is_an_equality_on_its_typed_value() {
        let q = ListQuery::parse(&params(&[("housing", "true"), ("averageCost[lt]", "500")]), &BOOTCAMPS, &api()).unwrap();
        assert_eq!(q.conditions[0].op, FilterOp::Eq);
        assert_eq!(q.conditions[0].value, Value::Bool(true));
        assert_eq!(q.conditions[1].op, FilterOp::Lt);
        assert_eq!(q.conditions[1].value, json!(500));
    }

    #[test]
    fn page_past_the_addressable_range_is_rejected() {
        let huge = u64::MAX.to_string();
        assert!(matches!(
            ListQuery::parse(&params(&[("page", huge.as_str())]), &BOOTCAMPS, &api()),
            Err(FilterError::InvalidPaging("page"))
        ));
        let mut q = ListQuery::parse(&params(&[]), &BOOTCAMPS, &api()).unwrap();
        q.page = u64::MAX;
        assert_eq!(q.offset(), u64::MAX);
    }

    #[test]
    fn builds_column_filter_with_default_sort() {
        let q = ListQuery::parse(
            &params(&[("careers[in]", "Business,UI/UX"), ("housing", "true")]),
            &BOOTCAMPS,
            &api(),
        )
        .unwrap();
        let data = q.to_filter_data(&BOOTCAMPS);
        assert_eq!(
            data.where_clause.unwrap(),
            json!({ "careers": { "$any": ["Business", "UI/UX"] }, "housing": { "$eq": true } })
        );
        assert_eq!(data.order.unwrap(), json!(["created_at desc", "id asc"]));
        assert_eq!(data.limit, Some(25));
        assert_eq!(data.offset, Some(0));
        assert_eq!(data.casts.get("careers"), Some(&"text"));
        assert_eq!(data.casts.get("housing"), None);
    }

    #[test]
    fn matches_and_sorts_serialized_records() {
        let q = ListQuery::parse(
            &params(&[("tuition[gte]", "5000"), ("sort", "tuition")]),
            &COURSES,
            &api(),
        )
        .unwrap();
        let cheap = json!({ "id": "a", "tuition": 1000.0 });
        let mid = json!({ "id": "b", "tuition": 5000.0 });
        let dear = json!({ "id": "c", "tuition": 12000.0 });
        assert!(!q.matches(&cheap));
        assert!(q.matches(&mid) && q.matches(&dear));
        assert_eq!(q.compare(&COURSES, &mid, &dear), Ordering::Less);
    }

    #[test]
    fn nested_location_fields_match() {
        let q = ListQuery::parse(&params(&[("location.state", "MA")]), &BOOTCAMPS, &api()).unwrap();
        assert!(q.matches(&json!({ "location": { "state": "MA" } })));
        assert!(!q.matches(&json!({ "location": null })));
    }

    #[test]
    fn projection_keeps_id() {
        let q = ListQuery::parse(&params(&[("select", "name,description")]), &BOOTCAMPS, &api()).unwrap();
        let projected = q.project(json!({ "id": "x", "name": "n", "description": "d", "housing": true }));
        assert_eq!(projected, json!({ "id": "x", "name": "n", "description": "d" }));
    }
}
