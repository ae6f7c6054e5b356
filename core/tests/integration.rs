//! End-to-end tests against the mock Explorer server.
//!
//! # Design
//! Each test starts the mock server on a random port in a background tokio
//! runtime, then drives `ExplorerClient` over real HTTP through the default
//! `ureq` transport.

use std::net::SocketAddr;
use std::time::Duration;

use explorer_core::{
    ClientConfig, Error, ExplorerClient, FilterClause, FilterOperation, Filters, OrderBy, PollConfig,
    QueryOptions, ValueType,
};
use mock_server::MockConfig;
use serde_json::json;

const GNOMAD: &str = "gnomad";
const VARIANTS: &str = "collections.gnomad.variants";

/// Start a mock server on a random port and return its address.
fn start(config: MockConfig) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, config).await
        })
        .unwrap();
    });

    addr
}

fn client_for(addr: SocketAddr) -> ExplorerClient {
    ExplorerClient::from_config(ClientConfig::new(format!("http://{addr}")).timeout(Duration::from_secs(5)))
        .unwrap()
}

#[test]
fn browse_catalog() {
    let client = client_for(start(MockConfig::default()));

    let collections = client.list_collections().unwrap();
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0].slug_name, GNOMAD);
    assert_eq!(collections[0].tags, vec![json!("population"), json!("variants")]);

    let tables = client.list_tables(GNOMAD).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, VARIANTS);
    assert_eq!(tables[0].size, Some(6));

    let schema = client.get_schema(GNOMAD, VARIANTS).unwrap();
    assert!(schema.properties().unwrap().contains_key("chrom"));

    let fields = client.get_schema_fields(GNOMAD, VARIANTS).unwrap();
    let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
    assert_eq!(names, vec!["chrom", "pos", "ref", "alt", "af", "consequence"]);
    let af = fields.iter().find(|f| f.field == "af").unwrap();
    assert_eq!(af.field_type, "number, null");
    let consequence = fields.iter().find(|f| f.field == "consequence").unwrap();
    assert_eq!(consequence.field_type, "array<string>");
}

#[test]
fn query_with_filters_paging_and_order() {
    let client = client_for(start(MockConfig::default()));

    let options = QueryOptions::new()
        .filters(
            Filters::new()
                .with("chrom", FilterClause::equals("chr17"))
                .with("pos", FilterClause::new(FilterOperation::Gte, 43_000_000, ValueType::Integer))
                .with("pos", FilterClause::new(FilterOperation::Lte, 43_200_000, ValueType::Integer)),
        )
        .order_by(OrderBy::desc("pos"));
    let result = client.query(GNOMAD, VARIANTS, &options).unwrap();
    let positions: Vec<u64> = result.data.iter().map(|r| r["pos"].as_u64().unwrap()).collect();
    assert_eq!(positions, vec![43_100_000, 43_044_295]);
    assert_eq!(result.pagination.as_ref().unwrap()["total"], 2);

    let page = client
        .query(GNOMAD, VARIANTS, &QueryOptions::new().limit(2).offset(4))
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.pagination.unwrap()["total"], 6);
}

#[test]
fn simple_query_and_count() {
    let client = client_for(start(MockConfig::default()));

    let rows = client
        .simple_query(GNOMAD, VARIANTS, [("chrom", json!("chr1")), ("pos", json!(12345))])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["alt"], "G");

    let chr1 = Filters::equals([("chrom", "chr1")]);
    assert_eq!(client.count(GNOMAD, VARIANTS, &chr1).unwrap(), 2);
    assert_eq!(client.count(GNOMAD, VARIANTS, &Filters::new()).unwrap(), 6);
}

#[test]
fn bare_count_envelope() {
    let client = client_for(start(MockConfig {
        bare_count: true,
        ..MockConfig::default()
    }));
    assert_eq!(client.count(GNOMAD, VARIANTS, &Filters::new()).unwrap(), 6);
}

#[test]
fn polling_waits_for_rows() {
    let client = client_for(start(MockConfig {
        pending_polls: 2,
        ..MockConfig::default()
    }));
    let poll = PollConfig {
        max_polls: 5,
        interval: Duration::from_millis(10),
    };

    let pending = client.query(GNOMAD, VARIANTS, &QueryOptions::new()).unwrap();
    assert!(pending.is_empty());
    assert!(pending.next_page_token().is_some());

    let err = client
        .simple_query(GNOMAD, VARIANTS, [("chrom", json!("chr1"))])
        .unwrap_err();
    assert!(err.is_pending(), "{err}");

    let result = client
        .query_with_polling(GNOMAD, VARIANTS, &QueryOptions::new(), &poll)
        .unwrap();
    assert_eq!(result.len(), 6);
}

#[test]
fn token_lifecycle_against_protected_server() {
    let addr = start(MockConfig {
        required_token: Some("letmein".to_string()),
        ..MockConfig::default()
    });
    let mut client = client_for(addr);

    let err = client.list_collections().unwrap_err();
    assert!(matches!(err, Error::Authentication { status: 401, .. }), "{err}");

    client.set_access_token("wrong");
    let err = client.list_collections().unwrap_err();
    assert!(matches!(err, Error::Authentication { status: 403, .. }), "{err}");

    client.set_access_token("letmein");
    assert_eq!(client.list_collections().unwrap().len(), 2);

    client.clear_access_token();
    assert!(client.count(GNOMAD, VARIANTS, &Filters::new()).unwrap_err().is_authentication());
}

#[test]
fn missing_resources_and_server_errors() {
    let client = client_for(start(MockConfig::default()));

    let err = client.list_tables("does-not-exist").unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "{err}");

    let regex = Filters::new().with(
        "chrom",
        FilterClause::new(FilterOperation::Regex, "chr1.*", ValueType::String),
    );
    let err = client
        .query(GNOMAD, VARIANTS, &QueryOptions::new().filters(regex))
        .unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "unsupported operation REGEX");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[test]
fn unreachable_server_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = ExplorerClient::from_config(
        ClientConfig::new(format!("http://127.0.0.1:{port}")).timeout(Duration::from_secs(2)),
    )
    .unwrap();
    assert!(client.list_collections().unwrap_err().is_network());
}
