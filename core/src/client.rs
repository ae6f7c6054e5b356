//! The client applications hold.
//!
//! # Design
//! `ExplorerClient` composes the three layers: `RequestBuilder` produces a
//! request, a `Transport` performs exactly one round-trip, and the
//! `response` module shapes the body. Between the last two,
//! `http::check_status` classifies the status. The bearer token is the only
//! mutable state and is attached to each request at send time.
//!
//! Mutating the token takes `&mut self`, so sharing one client across
//! threads while changing its token needs an external lock.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::filter::Filters;
use crate::http::{check_status, HttpRequest, HttpResponse};
use crate::network;
use crate::request::{QueryOptions, RequestBuilder};
use crate::response::{self, QueryPage};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Collection, QueryResult, Row, SchemaField, Table, TableSchema};

/// How `ExplorerClient::query_with_polling` waits for asynchronous queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_polls: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_polls: 10,
            interval: Duration::from_secs(2),
        }
    }
}

/// Blocking client for one Explorer network.
pub struct ExplorerClient {
    requests: RequestBuilder,
    access_token: Option<String>,
    timeout: Duration,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for ExplorerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplorerClient")
            .field("base_url", &self.base_url())
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ExplorerClient {
    /// Client for `network`, which may be a known alias such as
    /// `"hifisolves"`, a bare domain or a full base URL.
    pub fn new(network: &str) -> Result<Self> {
        Self::from_config(ClientConfig::new(network))
    }

    pub fn with_access_token(network: &str, token: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(network).access_token(token))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }

    /// Client that sends requests through `transport` instead of the default
    /// `ureq` agent.
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Result<Self> {
        let base_url = network::base_url(&config.network);
        let requests = RequestBuilder::new(&base_url, config.user_agent)?;
        Ok(Self {
            requests,
            access_token: config.access_token,
            timeout: config.timeout,
            transport: Box::new(transport),
        })
    }

    pub fn base_url(&self) -> &str {
        self.requests.base_url()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    pub fn clear_access_token(&mut self) {
        self.access_token = None;
    }

    /// Request builder for callers that want to perform I/O themselves.
    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        let response = self.execute(self.requests.build_list_collections()?)?;
        response::parse_collections(&response)
    }

    pub fn list_tables(&self, collection: &str) -> Result<Vec<Table>> {
        let response = self.execute(self.requests.build_list_tables(collection)?)?;
        response::parse_tables(&response)
    }

    pub fn get_schema(&self, collection: &str, table: &str) -> Result<TableSchema> {
        let response = self.execute(self.requests.build_get_schema(collection, table)?)?;
        response::parse_schema(&response)
    }

    /// Schema flattened to `(field, type, sql_type)` entries.
    pub fn get_schema_fields(&self, collection: &str, table: &str) -> Result<Vec<SchemaField>> {
        let schema = self.get_schema(collection, table)?;
        response::schema_fields(&schema)
    }

    /// Run one filter request. If the server answers that the query is
    /// still running, the result has no rows and its pagination carries the
    /// `next_page_token` to poll with; `query_with_polling` does that loop.
    pub fn query(&self, collection: &str, table: &str, options: &QueryOptions) -> Result<QueryResult> {
        let request = self.requests.build_query(collection, table, options, None)?;
        match response::parse_query(&self.execute(request)?)? {
            QueryPage::Ready(result) => Ok(result),
            QueryPage::Pending { next_page_token } => Ok(QueryResult {
                data: Vec::new(),
                pagination: Some(json!({ "next_page_token": next_page_token })),
            }),
        }
    }

    /// Equality query built from `(field, value)` pairs, returning the rows.
    /// A query the server is still running fails with `Error::QueryPending`
    /// rather than looking like an empty match.
    ///
    /// ```no_run
    /// # use explorer_core::ExplorerClient;
    /// # fn main() -> explorer_core::Result<()> {
    /// let client = ExplorerClient::new("hifisolves")?;
    /// let rows = client.simple_query(
    ///     "gnomad",
    ///     "collections.gnomad.variants",
    ///     [("chrom", serde_json::json!("chr1")), ("pos", serde_json::json!(12345))],
    /// )?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn simple_query<I, K, V>(&self, collection: &str, table: &str, pairs: I) -> Result<Vec<Row>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let options = QueryOptions::new().filters(Filters::equals(pairs));
        let request = self.requests.build_query(collection, table, &options, None)?;
        match response::parse_query(&self.execute(request)?)? {
            QueryPage::Ready(result) => Ok(result.data),
            QueryPage::Pending { next_page_token } => Err(Error::QueryPending { next_page_token }),
        }
    }

    pub fn count(&self, collection: &str, table: &str, filters: &Filters) -> Result<u64> {
        let response = self.execute(self.requests.build_count(collection, table, filters)?)?;
        response::parse_count(&response)
    }

    /// Query that keeps re-posting with the server's `next_page_token` until
    /// rows arrive or `poll.max_polls` requests have been made. Errors from
    /// any attempt are returned immediately.
    pub fn query_with_polling(
        &self,
        collection: &str,
        table: &str,
        options: &QueryOptions,
        poll: &PollConfig,
    ) -> Result<QueryResult> {
        if poll.max_polls == 0 {
            return Err(Error::Validation("max_polls must be positive".to_string()));
        }
        let mut token: Option<String> = None;
        for attempt in 1..=poll.max_polls {
            let request = self
                .requests
                .build_query(collection, table, options, token.as_deref())?;
            match response::parse_query(&self.execute(request)?)? {
                QueryPage::Ready(result) => return Ok(result),
                QueryPage::Pending { next_page_token } => {
                    tracing::debug!(attempt, "query still running");
                    token = Some(next_page_token);
                    if attempt < poll.max_polls {
                        thread::sleep(poll.interval);
                    }
                }
            }
        }
        Err(Error::InvalidResponse(format!(
            "query did not complete after {} polls ({:?})",
            poll.max_polls,
            poll.interval * poll.max_polls
        )))
    }

    fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        if let Some(token) = &self.access_token {
            request.set_header("authorization", format!("Bearer {token}"));
        }
        tracing::debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = self.transport.send(&request)?;
        tracing::debug!(status = response.status, url = %request.url, "received response");
        check_status(&response, &request.url)?;
        Ok(response)
    }
}
