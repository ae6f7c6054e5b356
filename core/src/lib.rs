//! Blocking client for Omics AI Explorer networks.
//!
//! # Overview
//! Explorer deployments expose collections, tables, table schemas and
//! filtered tabular queries over a small REST API. `ExplorerClient` maps each
//! of those to one HTTP round-trip and returns typed results.
//!
//! # Design
//! - `request::RequestBuilder` builds `HttpRequest` values and
//!   `response` parses `HttpResponse` values without touching the network.
//! - `transport::Transport` is the single I/O seam; `UreqTransport` is the
//!   default, blocking, with a bounded timeout and no retries.
//! - `http::check_status` turns HTTP statuses into `Error` variants, so
//!   callers match on `Error::Authentication`, `Error::Network` and friends.
//! - The library emits `tracing` events at debug level and never installs a
//!   subscriber.
//!
//! ```no_run
//! use explorer_core::{ExplorerClient, Filters, QueryOptions};
//!
//! # fn main() -> explorer_core::Result<()> {
//! let client = ExplorerClient::new("hifisolves")?;
//! for collection in client.list_collections()? {
//!     println!("{} ({})", collection.name, collection.slug_name);
//! }
//! let options = QueryOptions::new()
//!     .filters(Filters::equals([("chrom", "chr1")]))
//!     .limit(10);
//! let result = client.query("gnomad", "collections.gnomad.variants", &options)?;
//! println!("{} rows", result.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod network;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

pub use client::{ExplorerClient, PollConfig};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use filter::{Direction, FilterClause, FilterOperation, Filters, OrderBy, ValueType};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::{QueryOptions, RequestBuilder, DEFAULT_LIMIT};
pub use transport::{Transport, UreqTransport};
pub use types::{Collection, QueryResult, Row, SchemaField, Table, TableSchema};
