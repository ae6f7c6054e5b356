//! Builds `HttpRequest` values for each Explorer operation.
//!
//! # Design
//! `RequestBuilder` holds only the base URL and the user agent. Each
//! `build_*` method validates its inputs and produces a complete request
//! without I/O, so a bad filter or an empty identifier fails before a round
//! trip is wasted. Path segments go through `url`'s segment encoder because
//! table names are user input.
//!
//! The bearer token is not added here; `ExplorerClient` attaches it at send
//! time so that token changes never require rebuilding anything.

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::filter::{Filters, OrderBy};
use crate::http::{HttpMethod, HttpRequest};

/// Rows returned by a query when the caller does not choose a limit.
pub const DEFAULT_LIMIT: u32 = 100;

/// Filters, paging and ordering for a table query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub filters: Filters,
    pub limit: u32,
    pub offset: u64,
    pub order_by: Option<OrderBy>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            filters: Filters::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            order_by: None,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }
}

#[derive(Serialize)]
struct QueryBody<'a> {
    filters: &'a Filters,
    limit: u32,
    offset: u64,
    #[serde(rename = "orderBy", skip_serializing_if = "Option::is_none")]
    order_by: Option<&'a OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<&'a str>,
}

#[derive(Serialize)]
struct CountBody<'a> {
    filters: &'a Filters,
}

/// Stateless builder for Explorer API requests.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: Url,
    user_agent: String,
}

impl RequestBuilder {
    pub fn new(base_url: &str, user_agent: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Validation(format!("invalid base URL `{base_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Validation(format!("`{base_url}` cannot be used as a base URL")));
        }
        Ok(Self {
            base_url,
            user_agent: user_agent.into(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn build_list_collections(&self) -> Result<HttpRequest> {
        self.get(&["api", "collections"])
    }

    pub fn build_list_tables(&self, collection: &str) -> Result<HttpRequest> {
        require("collection", collection)?;
        self.get(&["api", "collections", collection, "tables"])
    }

    pub fn build_get_schema(&self, collection: &str, table: &str) -> Result<HttpRequest> {
        require("collection", collection)?;
        require("table", table)?;
        self.get(&["api", "collection", collection, "data-connect", "table", table, "info"])
    }

    /// Filter request. `page_token` is set only when polling for the result
    /// of an earlier request.
    pub fn build_query(
        &self,
        collection: &str,
        table: &str,
        options: &QueryOptions,
        page_token: Option<&str>,
    ) -> Result<HttpRequest> {
        require("collection", collection)?;
        require("table", table)?;
        if options.limit == 0 {
            return Err(Error::Validation("limit must be positive".to_string()));
        }
        if let Some(order_by) = &options.order_by {
            require("order-by field", &order_by.field)?;
        }
        options.filters.validate()?;

        let body = QueryBody {
            filters: &options.filters,
            limit: options.limit,
            offset: options.offset,
            order_by: options.order_by.as_ref(),
            next_page_token: page_token,
        };
        self.post(&["api", "collections", collection, "tables", table, "filter"], &body)
    }

    pub fn build_count(&self, collection: &str, table: &str, filters: &Filters) -> Result<HttpRequest> {
        require("collection", collection)?;
        require("table", table)?;
        filters.validate()?;
        self.post(
            &["api", "collections", collection, "tables", table, "filter", "count"],
            &CountBody { filters },
        )
    }

    fn url(&self, segments: &[&str]) -> Result<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Validation(format!("`{}` cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    fn default_headers(&self) -> Vec<(String, String)> {
        vec![
            ("accept".to_string(), "application/json".to_string()),
            ("user-agent".to_string(), self.user_agent.clone()),
        ]
    }

    fn get(&self, segments: &[&str]) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.url(segments)?,
            headers: self.default_headers(),
            body: None,
        })
    }

    fn post<B: Serialize>(&self, segments: &[&str], body: &B) -> Result<HttpRequest> {
        let body = serde_json::to_string(body)?;
        let mut headers = self.default_headers();
        headers.push(("content-type".to_string(), "application/json".to_string()));
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url(segments)?,
            headers,
            body: Some(body),
        })
    }
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{what} is required")));
    }
    // URL path normalization would drop or climb on these.
    if value == "." || value == ".." {
        return Err(Error::Validation(format!("{what} cannot be `{value}`")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterClause, FilterOperation, ValueType};
    use serde_json::{json, Value};

    fn builder() -> RequestBuilder {
        RequestBuilder::new("https://hifisolves.org", "test-agent").unwrap()
    }

    fn body(req: &HttpRequest) -> Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn list_collections_request() {
        let req = builder().build_list_collections().unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://hifisolves.org/api/collections");
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("user-agent"), Some("test-agent"));
        assert!(req.header("content-type").is_none());
        assert!(req.body.is_none());
    }

    #[test]
    fn dot_segments_are_rejected() {
        let b = builder();
        for name in [".", ".."] {
            assert!(matches!(b.build_list_tables(name), Err(Error::Validation(_))), "{name}");
            assert!(matches!(b.build_get_schema("gnomad", name), Err(Error::Validation(_))), "{name}");
            assert!(
                matches!(b.build_count(name, "t", &Filters::new()), Err(Error::Validation(_))),
                "{name}"
            );
        }
        let req = b.build_list_tables("...").unwrap();
        assert_eq!(req.url, "https://hifisolves.org/api/collections/.../tables");
    }

    #[test]
    fn list_tables_encodes_collection() {
        let req = builder().build_list_tables("my collection").unwrap();
        assert_eq!(req.url, "https://hifisolves.org/api/collections/my%20collection/tables");
    }

    #[test]
    fn schema_request_path() {
        let req = builder()
            .build_get_schema("gnomad", "collections.gnomad.variants")
            .unwrap();
        assert_eq!(
            req.url,
            "https://hifisolves.org/api/collection/gnomad/data-connect/table/collections.gnomad.variants/info"
        );
    }

    #[test]
    fn query_request_with_defaults() {
        let req = builder()
            .build_query("gnomad", "collections.gnomad.variants", &QueryOptions::new(), None)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.url,
            "https://hifisolves.org/api/collections/gnomad/tables/collections.gnomad.variants/filter"
        );
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(body(&req), json!({"filters": {}, "limit": 100, "offset": 0}));
    }

    #[test]
    fn query_request_with_filters_paging_and_order() {
        let options = QueryOptions::new()
            .filters(Filters::new().with(
                "pos",
                FilterClause::new(FilterOperation::Gte, 43_000_000, ValueType::Integer),
            ))
            .limit(20)
            .offset(40)
            .order_by(OrderBy::asc("pos"));
        let req = builder().build_query("gnomad", "variants", &options, None).unwrap();
        assert_eq!(
            body(&req),
            json!({
                "filters": {"pos": [{"operation": "GTE", "value": 43000000, "type": "INTEGER"}]},
                "limit": 20,
                "offset": 40,
                "orderBy": {"field": "pos", "direction": "ASC"},
            })
        );
    }

    #[test]
    fn query_request_carries_page_token_when_polling() {
        let req = builder()
            .build_query("gnomad", "variants", &QueryOptions::new(), Some("tok-1"))
            .unwrap();
        assert_eq!(body(&req)["next_page_token"], "tok-1");
    }

    #[test]
    fn count_request() {
        let filters = Filters::equals([("chrom", "chr1")]);
        let req = builder().build_count("gnomad", "variants", &filters).unwrap();
        assert_eq!(
            req.url,
            "https://hifisolves.org/api/collections/gnomad/tables/variants/filter/count"
        );
        assert_eq!(
            body(&req),
            json!({"filters": {"chrom": [{"operation": "EQ", "value": "chr1", "type": "STRING"}]}})
        );
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        let b = builder();
        assert!(matches!(b.build_list_tables(""), Err(Error::Validation(_))));
        assert!(matches!(b.build_get_schema("", "t"), Err(Error::Validation(_))));
        assert!(matches!(b.build_get_schema("c", " "), Err(Error::Validation(_))));
        assert!(matches!(b.build_count("c", "", &Filters::new()), Err(Error::Validation(_))));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = builder()
            .build_query("c", "t", &QueryOptions::new().limit(0), None)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn base_url_path_prefix_is_kept() {
        let b = RequestBuilder::new("http://127.0.0.1:3000/explorer/", "ua").unwrap();
        assert_eq!(b.base_url(), "http://127.0.0.1:3000/explorer");
        let req = b.build_list_collections().unwrap();
        assert_eq!(req.url, "http://127.0.0.1:3000/explorer/api/collections");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(RequestBuilder::new("not a url", "ua"), Err(Error::Validation(_))));
    }
}
