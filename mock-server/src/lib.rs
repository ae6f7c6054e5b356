//! In-process stand-in for an Explorer network.
//!
//! Serves a fixed catalog (two collections, one table each) on the same
//! paths as the real API so the client can be exercised end to end. The
//! filter endpoint answers in JSON lines and can be told to report a query
//! as still running for a number of polls first.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub type Row = Map<String, Value>;

/// Behaviour switches for a mock instance.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// When set, every request must carry `Authorization: Bearer <token>`.
    pub required_token: Option<String>,
    /// Pending answers the filter endpoint gives before returning rows.
    pub pending_polls: u32,
    /// Answer count requests with a bare integer instead of `{"count": n}`.
    pub bare_count: bool,
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    catalog: Arc<Vec<CollectionEntry>>,
    polls: Arc<RwLock<HashMap<String, u32>>>,
}

struct CollectionEntry {
    meta: Value,
    slug: &'static str,
    tables: Vec<TableEntry>,
}

struct TableEntry {
    meta: Value,
    name: &'static str,
    schema: Value,
    rows: Vec<Row>,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        catalog: Arc::new(catalog()),
        polls: Arc::default(),
    };
    Router::new()
        .route("/api/collections", get(list_collections))
        .route("/api/collections/{collection}/tables", get(list_tables))
        .route(
            "/api/collection/{collection}/data-connect/table/{table}/info",
            get(table_info),
        )
        .route("/api/collections/{collection}/tables/{table}/filter", post(filter))
        .route(
            "/api/collections/{collection}/tables/{table}/filter/count",
            post(count),
        )
        .with_state(state)
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

/// Error answered as `{"message": ...}` with the given status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct Clause {
    pub operation: String,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type")]
    pub value_type: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub filters: HashMap<String, Vec<Clause>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<OrderBy>,
    pub next_page_token: Option<String>,
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &state.config.required_token else {
        return Ok(());
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    match provided {
        None => Err(ApiError::new(StatusCode::UNAUTHORIZED, "missing bearer token")),
        Some(value) if value == format!("Bearer {expected}") => Ok(()),
        Some(_) => Err(ApiError::new(StatusCode::FORBIDDEN, "token does not grant access")),
    }
}

fn find_collection<'a>(state: &'a AppState, slug: &str) -> Result<&'a CollectionEntry, ApiError> {
    state
        .catalog
        .iter()
        .find(|c| c.slug == slug)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("collection {slug} not found")))
}

fn find_table<'a>(state: &'a AppState, slug: &str, table: &str) -> Result<&'a TableEntry, ApiError> {
    find_collection(state, slug)?
        .tables
        .iter()
        .find(|t| t.name == table)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("table {table} not found")))
}

async fn list_collections(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<Value>>, ApiError> {
    authorize(&state, &headers)?;
    Ok(Json(state.catalog.iter().map(|c| c.meta.clone()).collect()))
}

async fn list_tables(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(collection): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    authorize(&state, &headers)?;
    let collection = find_collection(&state, &collection)?;
    Ok(Json(collection.tables.iter().map(|t| t.meta.clone()).collect()))
}

async fn table_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((collection, table)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    Ok(Json(find_table(&state, &collection, &table)?.schema.clone()))
}

async fn filter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((collection, table)): Path<(String, String)>,
    Json(request): Json<FilterRequest>,
) -> Result<Response, ApiError> {
    authorize(&state, &headers)?;
    let entry = find_table(&state, &collection, &table)?;

    if state.config.pending_polls > 0 {
        let mut polls = state.polls.write().await;
        match &request.next_page_token {
            None => {
                let token = Uuid::new_v4().to_string();
                polls.insert(token.clone(), state.config.pending_polls - 1);
                return Ok(json_lines(&[json!({ "next_page_token": token })]));
            }
            Some(token) => {
                let remaining = polls
                    .get(token)
                    .copied()
                    .ok_or_else(|| ApiError::bad_request(format!("unknown page token {token}")))?;
                if remaining > 0 {
                    polls.insert(token.clone(), remaining - 1);
                    return Ok(json_lines(&[json!({ "next_page_token": token })]));
                }
                polls.remove(token);
            }
        }
    }

    let mut rows = select(&entry.rows, &request.filters)?;
    if let Some(order) = &request.order_by {
        rows.sort_by(|a, b| {
            compare(field(a, &order.field), field(b, &order.field)).unwrap_or(Ordering::Equal)
        });
        if order.direction.eq_ignore_ascii_case("DESC") {
            rows.reverse();
        }
    }
    let total = rows.len();
    let limit = request.limit.unwrap_or(100);
    let offset = request.offset.unwrap_or(0);
    let page: Vec<Row> = rows.into_iter().skip(offset).take(limit).collect();

    Ok(json_lines(&[
        json!({}),
        json!({
            "data": page,
            "pagination": { "limit": limit, "offset": offset, "total": total },
        }),
    ]))
}

async fn count(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((collection, table)): Path<(String, String)>,
    Json(request): Json<FilterRequest>,
) -> Result<Response, ApiError> {
    authorize(&state, &headers)?;
    let entry = find_table(&state, &collection, &table)?;
    let total = select(&entry.rows, &request.filters)?.len();
    if state.config.bare_count {
        Ok(Json(json!(total)).into_response())
    } else {
        Ok(Json(json!({ "count": total })).into_response())
    }
}

fn json_lines(values: &[Value]) -> Response {
    let body: String = values.iter().map(|v| format!("{v}\n")).collect();
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Rows matching every clause of every field.
pub fn select(rows: &[Row], filters: &HashMap<String, Vec<Clause>>) -> Result<Vec<Row>, ApiError> {
    let mut selected = Vec::new();
    for row in rows {
        let mut keep = true;
        for (field, clauses) in filters {
            let value = self::field(row, field);
            for clause in clauses {
                if !matches(value, clause)? {
                    keep = false;
                }
            }
        }
        if keep {
            selected.push(row.clone());
        }
    }
    Ok(selected)
}

static NULL: Value = Value::Null;

/// Column value, with missing columns read as null.
fn field<'a>(row: &'a Row, name: &str) -> &'a Value {
    row.get(name).unwrap_or(&NULL)
}

fn matches(value: &Value, clause: &Clause) -> Result<bool, ApiError> {
    let ordering = compare(value, &clause.value);
    Ok(match clause.operation.as_str() {
        "EQ" => ordering == Some(Ordering::Equal),
        "NEQ" => ordering != Some(Ordering::Equal),
        "GT" => ordering == Some(Ordering::Greater),
        "GTE" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        "LT" => ordering == Some(Ordering::Less),
        "LTE" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        "NULL" => value.is_null(),
        "NOT_NULL" => !value.is_null(),
        "BETWEEN" => match clause.value.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                matches!(compare(value, low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(value, high), Some(Ordering::Less | Ordering::Equal))
            }
            _ => return Err(ApiError::bad_request("BETWEEN needs [low, high]")),
        },
        "LIKE" => match (value.as_str(), clause.value.as_str()) {
            (Some(text), Some(pattern)) => like(text, pattern),
            _ => false,
        },
        other => return Err(ApiError::bad_request(format!("unsupported operation {other}"))),
    })
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL `LIKE` with `%` wildcards only.
fn like(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return text == pattern;
    }
    let (first, rest) = (parts[0], &parts[1..]);
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}

fn rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect()
}

fn catalog() -> Vec<CollectionEntry> {
    vec![
        CollectionEntry {
            slug: "gnomad",
            meta: json!({
                "name": "gnomAD",
                "slugName": "gnomad",
                "description": "Genome Aggregation Database variant calls",
                "createdAt": "2024-01-15T10:00:00Z",
                "updatedAt": "2024-06-01T08:30:00Z",
                "tags": ["population", "variants"],
            }),
            tables: vec![TableEntry {
                name: "collections.gnomad.variants",
                meta: json!({
                    "name": "collections.gnomad.variants",
                    "display_name": "Variants",
                    "type": "table",
                    "size": 6,
                    "description": "Small variants",
                }),
                schema: json!({
                    "name": "collections.gnomad.variants",
                    "data_model": {"properties": {
                        "chrom": {"type": "string", "sqlType": "varchar"},
                        "pos": {"type": "integer", "sqlType": "bigint"},
                        "ref": {"type": "string", "sqlType": "varchar"},
                        "alt": {"type": "string", "sqlType": "varchar"},
                        "af": {"type": ["number", "null"], "sqlType": "double"},
                        "consequence": {"type": "array", "items": {"type": "string"}, "sqlType": "array(varchar)"},
                    }},
                }),
                rows: rows(vec![
                    json!({"chrom": "chr1", "pos": 12345, "ref": "A", "alt": "G", "af": 0.12, "consequence": ["missense_variant"]}),
                    json!({"chrom": "chr1", "pos": 22000, "ref": "C", "alt": "T", "af": 0.004, "consequence": ["synonymous_variant"]}),
                    json!({"chrom": "chr2", "pos": 500, "ref": "G", "alt": "A", "af": null, "consequence": []}),
                    json!({"chrom": "chr17", "pos": 43044295, "ref": "T", "alt": "C", "af": 0.0001, "consequence": ["missense_variant"]}),
                    json!({"chrom": "chr17", "pos": 43100000, "ref": "G", "alt": "GA", "af": 0.02, "consequence": ["frameshift_variant"]}),
                    json!({"chrom": "chrM", "pos": 73, "ref": "A", "alt": "G", "af": 0.9, "consequence": []}),
                ]),
            }],
        },
        CollectionEntry {
            slug: "virusseq",
            meta: json!({
                "name": "VirusSeq",
                "slugName": "virusseq",
                "description": "Viral genome submissions",
                "tags": [],
            }),
            tables: vec![TableEntry {
                name: "collections.virusseq.samples",
                meta: json!({
                    "name": "collections.virusseq.samples",
                    "display_name": "Samples",
                    "type": "table",
                    "size": 3,
                }),
                schema: json!({
                    "name": "collections.virusseq.samples",
                    "data_model": {"properties": {
                        "sample_id": {"type": "string", "sqlType": "varchar"},
                        "province": {"type": "string", "sqlType": "varchar"},
                        "lineage": {"type": "string", "sqlType": "varchar"},
                    }},
                }),
                rows: rows(vec![
                    json!({"sample_id": "QC-001", "province": "Quebec", "lineage": "BA.2"}),
                    json!({"sample_id": "ON-042", "province": "Ontario", "lineage": "XBB.1.5"}),
                    json!({"sample_id": "BC-007", "province": "British Columbia", "lineage": "BA.2"}),
                ]),
            }],
        },
    ]
}
