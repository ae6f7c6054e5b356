//! Turns Explorer response bodies into caller-facing shapes.
//!
//! The functions here assume the status has already passed
//! `http::check_status`; they only look at the body. The filter endpoints
//! may stream several JSON objects (JSON lines) while a query runs, in which
//! case the last object is the authoritative one.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::http::HttpResponse;
use crate::types::{Collection, QueryResult, Row, SchemaField, Table, TableSchema};

/// Outcome of one filter request.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPage {
    /// Rows are available.
    Ready(QueryResult),
    /// The server is still running the query; poll again with this token.
    Pending { next_page_token: String },
}

pub fn parse_collections(response: &HttpResponse) -> Result<Vec<Collection>> {
    parse_list(&response.body, "collections")
}

pub fn parse_tables(response: &HttpResponse) -> Result<Vec<Table>> {
    parse_list(&response.body, "tables")
}

pub fn parse_schema(response: &HttpResponse) -> Result<TableSchema> {
    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| Error::InvalidResponse(format!("schema is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::InvalidResponse("expected a schema object".to_string()));
    }
    Ok(TableSchema(value))
}

/// Flatten a schema into one entry per column. Accepts either a top-level
/// `fields` array or a JSON-schema style `data_model.properties` object.
pub fn schema_fields(schema: &TableSchema) -> Result<Vec<SchemaField>> {
    if let Some(Value::Array(fields)) = schema.as_value().get("fields") {
        return fields.iter().map(field_from_entry).collect();
    }
    let properties = schema
        .properties()
        .filter(|properties| !properties.is_empty())
        .ok_or_else(|| {
            Error::InvalidResponse("no schema (data_model.properties) found in response".to_string())
        })?;
    Ok(properties
        .iter()
        .map(|(name, definition)| SchemaField {
            field: name.clone(),
            field_type: render_type(definition),
            sql_type: string_field(definition, &["sqlType", "sql_type"]),
        })
        .collect())
}

pub fn parse_query(response: &HttpResponse) -> Result<QueryPage> {
    match last_json_value(&response.body)? {
        Value::Array(rows) => Ok(QueryPage::Ready(QueryResult {
            data: rows_from(rows)?,
            pagination: None,
        })),
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(rows)) => {
                let pagination = match object.remove("pagination") {
                    Some(Value::Null) | None => object
                        .remove("next_page_token")
                        .filter(|token| !token.is_null())
                        .map(|token| Value::Object(Map::from_iter([("next_page_token".to_string(), token)]))),
                    Some(pagination) => Some(pagination),
                };
                Ok(QueryPage::Ready(QueryResult {
                    data: rows_from(rows)?,
                    pagination,
                }))
            }
            Some(_) => Err(Error::InvalidResponse("query `data` is not an array".to_string())),
            None => match object.get("next_page_token") {
                Some(Value::String(token)) => Ok(QueryPage::Pending {
                    next_page_token: token.clone(),
                }),
                _ => Err(Error::InvalidResponse(format!(
                    "unexpected query response, keys: {:?}",
                    object.keys().collect::<Vec<_>>()
                ))),
            },
        },
        other => Err(Error::InvalidResponse(format!("unexpected query response: {other}"))),
    }
}

/// Count is either a bare integer or `{"count": n}`.
pub fn parse_count(response: &HttpResponse) -> Result<u64> {
    let value = last_json_value(&response.body)?;
    let count = match &value {
        Value::Number(_) => value.as_u64(),
        Value::Object(object) => object.get("count").and_then(Value::as_u64),
        _ => None,
    };
    count.ok_or_else(|| Error::InvalidResponse(format!("failed to parse count from response: {value}")))
}

/// Last complete JSON value in a body that may hold several.
fn last_json_value(body: &str) -> Result<Value> {
    let mut last = None;
    for value in serde_json::Deserializer::from_str(body).into_iter::<Value>() {
        let value = value.map_err(|e| Error::InvalidResponse(format!("failed to parse JSON response: {e}")))?;
        last = Some(value);
    }
    last.ok_or_else(|| Error::InvalidResponse("empty response body".to_string()))
}

fn parse_list<T: DeserializeOwned>(body: &str, what: &str) -> Result<Vec<T>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::InvalidResponse(format!("{what} response is not valid JSON: {e}")))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(Error::InvalidResponse(format!("expected a list of {what}"))),
        },
        _ => return Err(Error::InvalidResponse(format!("expected a list of {what}"))),
    };
    serde_json::from_value(Value::Array(items))
        .map_err(|e| Error::InvalidResponse(format!("malformed {what}: {e}")))
}

fn rows_from(rows: Vec<Value>) -> Result<Vec<Row>> {
    rows.into_iter()
        .map(|row| match row {
            Value::Object(row) => Ok(row),
            other => Err(Error::InvalidResponse(format!("query row is not an object: {other}"))),
        })
        .collect()
}

fn field_from_entry(entry: &Value) -> Result<SchemaField> {
    let field = string_field(entry, &["field", "name"]);
    if field.is_empty() {
        return Err(Error::InvalidResponse(format!("schema field without a name: {entry}")));
    }
    Ok(SchemaField {
        field,
        field_type: render_type(entry),
        sql_type: string_field(entry, &["sql_type", "sqlType"]),
    })
}

/// `type` may be a string or a list of strings; arrays show their item type.
fn render_type(definition: &Value) -> String {
    let field_type = join_type(definition.get("type"));
    if field_type == "array" {
        if let Some(items) = definition.get("items") {
            return format!("array<{}>", join_type(items.get("type")));
        }
    }
    field_type
}

fn join_type(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn string_field(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}
