use std::collections::BTreeMap;

use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
    casts: BTreeMap<&'static str, &'static str>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
            casts: BTreeMap::new(),
        }
    }

    /// Render `{column: value | {"$op": value}}` as a parameterized predicate.
    /// Placeholders are numbered from `starting_param_index + 1`.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        Self::generate_cast(where_data, starting_param_index, &BTreeMap::new())
    }

    /// As `generate`, with each placeholder cast to its column's type in
    /// `casts` so text-bound values compare against typed columns.
    pub fn generate_cast(
        where_data: &Value,
        starting_param_index: usize,
        casts: &BTreeMap<&'static str, &'static str>,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.casts = casts.clone();
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions = std::mem::take(&mut self.conditions);
        for condition in &conditions {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, std::mem::take(&mut self.param_values)))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    super::filter::validate_identifier(key)?;
                    self.parse_field_condition(key, value)?;
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = Self::map_operator(op_key)?;
                self.conditions.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() });
        }
        Ok(())
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$any" => FilterOp::Any,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = condition.column.as_str();
        let quoted_column = format!("\"{}\"", column);
        let data = &condition.data;
        Ok(match condition.operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Eq => format!("{} = {}", quoted_column, self.param(column, data.clone())),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted_column),
            // Mongo-style $ne also matches rows where the column is unset
            FilterOp::Ne => format!("{} IS DISTINCT FROM {}", quoted_column, self.param(column, data.clone())),
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(column, data.clone())),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(column, data.clone())),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(column, data.clone())),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(column, data.clone())),
            FilterOp::In => match data {
                Value::Array(values) if values.is_empty() => "1=0".to_string(),
                Value::Array(values) => {
                    let params: Vec<String> = values.iter().map(|v| self.param(column, v.clone())).collect();
                    format!("{} IN ({})", quoted_column, params.join(", "))
                }
                _ => format!("{} = {}", quoted_column, self.param(column, data.clone())),
            },
            FilterOp::Any => match data {
                Value::Array(values) if values.is_empty() => "1=0".to_string(),
                Value::Array(values) => {
                    let params: Vec<String> = values.iter().map(|v| self.param(column, v.clone())).collect();
                    format!("{} && ARRAY[{}]", quoted_column, params.join(", "))
                }
                _ => format!("{} && ARRAY[{}]", quoted_column, self.param(column, data.clone())),
            },
        })
    }

    fn param(&mut self, column: &str, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        match self.casts.get(column) {
            Some(cast) => format!("${}::{}", self.param_index, cast),
            None => format!("${}", self.param_index),
        }
    }
}
