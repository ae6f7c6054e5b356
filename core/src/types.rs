//! Records returned by the Explorer API.
//!
//! # Design
//! The server owns these schemas and adds fields over time, so each record
//! names the fields callers commonly need and keeps everything else in
//! `extra` instead of dropping it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A row of a query result, keyed by column name.
pub type Row = Map<String, Value>;

/// A named dataset grouping on an Explorer network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub name: String,
    /// Empty when the server omitted it.
    #[serde(default, alias = "slug", alias = "slug_name")]
    pub slug_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "updated_at")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A queryable table within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Qualified name, e.g. `collections.gnomad.variants`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
    /// Row count as reported by the server. Floats and numeric strings are
    /// truncated; anything else reads as unknown.
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Raw schema document returned by the table info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema(pub Value);

impl TableSchema {
    /// The `data_model.properties` object, when the server sent one.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.0.get("data_model")?.get("properties")?.as_object()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// One column of a table schema, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub sql_type: String,
}

/// Rows returned by a table query plus whatever paging state the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub data: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Token for the next page, if the server reported one.
    pub fn next_page_token(&self) -> Option<&str> {
        self.pagination.as_ref()?.get("next_page_token")?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_keeps_unknown_fields() {
        let collection: Collection = serde_json::from_value(json!({
            "name": "gnomAD",
            "slugName": "gnomad",
            "description": "Genome Aggregation Database",
            "tags": ["population"],
            "itemsCount": 4,
        }))
        .unwrap();
        assert_eq!(collection.slug_name, "gnomad");
        assert_eq!(collection.tags, vec![json!("population")]);
        assert_eq!(collection.extra["itemsCount"], 4);
        assert!(collection.created_at.is_none());
    }

    #[test]
    fn table_reads_display_name_and_size() {
        let table: Table = serde_json::from_value(json!({
            "name": "collections.gnomad.variants",
            "display_name": "Variants",
            "type": "table",
            "size": 759302267u64,
        }))
        .unwrap();
        assert_eq!(table.display_name.as_deref(), Some("Variants"));
        assert_eq!(table.table_type.as_deref(), Some("table"));
        assert_eq!(table.size, Some(759_302_267));
    }

    #[test]
    fn collection_tolerates_null_tags_and_missing_slug() {
        let collection: Collection = serde_json::from_value(json!({
            "name": "ASAP CRN",
            "tags": null,
        }))
        .unwrap();
        assert_eq!(collection.name, "ASAP CRN");
        assert_eq!(collection.slug_name, "");
        assert!(collection.tags.is_empty());
    }

    #[test]
    fn table_size_accepts_float_and_string() {
        let parse = |size: Value| -> Table {
            serde_json::from_value(json!({"name": "collections.asap.samples", "size": size})).unwrap()
        };
        assert_eq!(parse(json!(1.5e3)).size, Some(1500));
        assert_eq!(parse(json!("42")).size, Some(42));
        assert_eq!(parse(json!(null)).size, None);
        assert_eq!(parse(json!(-3.0)).size, None);
        assert_eq!(parse(json!({"rows": 1})).size, None);
    }

    #[test]
    fn next_page_token_reads_pagination() {
        let result = QueryResult {
            data: Vec::new(),
            pagination: Some(json!({"next_page_token": "abc"})),
        };
        assert_eq!(result.next_page_token(), Some("abc"));
        assert!(QueryResult::default().next_page_token().is_none());
    }
}
