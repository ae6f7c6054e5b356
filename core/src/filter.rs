//! Filter clauses and ordering descriptors sent with table queries.
//!
//! # Design
//! On the wire a filter is a mapping of field name to a list of clauses,
//! each `{operation, value, type}`. Clauses on the same field are ANDed by
//! the server. Operations and value types are closed enums here, so an
//! unknown tag can only enter through `Filters::from_json`, which rejects it
//! with `Error::Validation` before any request is built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Comparison applied by a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum FilterOperation {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Regex,
    Between,
    Null,
    NotNull,
}

impl FilterOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperation::Eq => "EQ",
            FilterOperation::Neq => "NEQ",
            FilterOperation::Gt => "GT",
            FilterOperation::Gte => "GTE",
            FilterOperation::Lt => "LT",
            FilterOperation::Lte => "LTE",
            FilterOperation::Like => "LIKE",
            FilterOperation::Regex => "REGEX",
            FilterOperation::Between => "BETWEEN",
            FilterOperation::Null => "NULL",
            FilterOperation::NotNull => "NOT_NULL",
        }
    }
}

impl fmt::Display for FilterOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "EQ" => Ok(FilterOperation::Eq),
            "NEQ" => Ok(FilterOperation::Neq),
            "GT" => Ok(FilterOperation::Gt),
            "GTE" => Ok(FilterOperation::Gte),
            "LT" => Ok(FilterOperation::Lt),
            "LTE" => Ok(FilterOperation::Lte),
            "LIKE" => Ok(FilterOperation::Like),
            "REGEX" => Ok(FilterOperation::Regex),
            "BETWEEN" => Ok(FilterOperation::Between),
            "NULL" => Ok(FilterOperation::Null),
            "NOT_NULL" => Ok(FilterOperation::NotNull),
            other => Err(Error::Validation(format!("unknown filter operation: {other}"))),
        }
    }
}

impl TryFrom<String> for FilterOperation {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Type tag telling the server how to interpret a clause value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
}

impl ValueType {
    /// Infer the tag for a JSON value. Arrays, objects and null have no
    /// natural tag and are reported as `None`.
    pub fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(ValueType::String),
            Value::Bool(_) => Some(ValueType::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ValueType::Integer),
            Value::Number(_) => Some(ValueType::Float),
            _ => None,
        }
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "STRING" => Ok(ValueType::String),
            "INTEGER" => Ok(ValueType::Integer),
            "FLOAT" => Ok(ValueType::Float),
            "BOOLEAN" => Ok(ValueType::Boolean),
            "DATE" => Ok(ValueType::Date),
            "DATETIME" => Ok(ValueType::Datetime),
            other => Err(Error::Validation(format!("unknown value type: {other}"))),
        }
    }
}

impl TryFrom<String> for ValueType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// One condition on a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub operation: FilterOperation,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl FilterClause {
    pub fn new(operation: FilterOperation, value: impl Into<Value>, value_type: ValueType) -> Self {
        Self {
            operation,
            value: value.into(),
            value_type,
        }
    }

    /// Equality clause with the type inferred from the value. Values with no
    /// natural tag are sent as their JSON text with type `STRING`.
    pub fn equals(value: impl Into<Value>) -> Self {
        let value = value.into();
        match ValueType::infer(&value) {
            Some(value_type) => Self::new(FilterOperation::Eq, value, value_type),
            None => Self::new(FilterOperation::Eq, value.to_string(), ValueType::String),
        }
    }

    /// Inclusive range; the value is sent as a two-element array.
    pub fn between(low: impl Into<Value>, high: impl Into<Value>, value_type: ValueType) -> Self {
        Self::new(
            FilterOperation::Between,
            Value::Array(vec![low.into(), high.into()]),
            value_type,
        )
    }

    pub fn is_null(value_type: ValueType) -> Self {
        Self::new(FilterOperation::Null, Value::Null, value_type)
    }

    pub fn not_null(value_type: ValueType) -> Self {
        Self::new(FilterOperation::NotNull, Value::Null, value_type)
    }

    fn validate(&self, field: &str) -> Result<()> {
        match self.operation {
            FilterOperation::Between => match &self.value {
                Value::Array(bounds) if bounds.len() == 2 => Ok(()),
                _ => Err(Error::Validation(format!(
                    "BETWEEN on `{field}` needs a two-element array value"
                ))),
            },
            FilterOperation::Null | FilterOperation::NotNull => Ok(()),
            op if self.value.is_null() => Err(Error::Validation(format!(
                "{op} on `{field}` needs a value"
            ))),
            _ => Ok(()),
        }
    }
}

/// Field name to clauses. An empty mapping selects every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, Vec<FilterClause>>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// One equality clause per `(field, value)` pair, as used by
    /// `ExplorerClient::simple_query`.
    pub fn equals<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut filters = Self::new();
        for (field, value) in pairs {
            filters.push(field, FilterClause::equals(value));
        }
        filters
    }

    /// Parse and validate an untyped filter mapping, e.g. one read from a
    /// command line or a config file.
    pub fn from_json(value: Value) -> Result<Self> {
        let filters: Filters = serde_json::from_value(value)
            .map_err(|e| Error::Validation(format!("invalid filters: {e}")))?;
        filters.validate()?;
        Ok(filters)
    }

    /// Append a clause to `field`, keeping any clauses already present.
    pub fn push(&mut self, field: impl Into<String>, clause: FilterClause) -> &mut Self {
        self.0.entry(field.into()).or_default().push(clause);
        self
    }

    pub fn with(mut self, field: impl Into<String>, clause: FilterClause) -> Self {
        self.push(field, clause);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[FilterClause]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FilterClause])> {
        self.0.iter().map(|(field, clauses)| (field.as_str(), clauses.as_slice()))
    }

    /// Reject empty field names, empty clause lists and clauses whose value
    /// does not fit their operation.
    pub fn validate(&self) -> Result<()> {
        for (field, clauses) in &self.0 {
            if field.trim().is_empty() {
                return Err(Error::Validation("filter field name is empty".to_string()));
            }
            if clauses.is_empty() {
                return Err(Error::Validation(format!("no clauses for filter field `{field}`")));
            }
            for clause in clauses {
                clause.validate(field)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Filters {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| Error::Validation(format!("filters are not valid JSON: {e}")))?;
        Self::from_json(value)
    }
}

/// Sort direction for `OrderBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Ascending),
            "desc" | "descending" => Ok(Direction::Descending),
            other => Err(Error::Validation(format!("unknown sort direction: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}
