use httpmock::prelude::*;
use keyword_recon::adapters::{CrtShClient, FastRandSource, RdapWhoisClient};
use keyword_recon::domain::model::ResolutionSource;
use keyword_recon::domain::ports::{CtLogQuery, CtLogSource, WhoisSource};
use keyword_recon::{DiscoveryPipeline, LookupError, TomlConfig};
use std::sync::Arc;

#[tokio::test]
async fn test_crtsh_identity_query() {
    let server = MockServer::start();
    let ct_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/")
            .query_param("q", "%.example.com")
            .query_param("output", "json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!([
                {
                    "issuer_name": "C=US, O=Let's Encrypt",
                    "name_value": "example.com\nwww.example.com"
                },
                {"issuer_name": "C=US, O=Let's Encrypt", "name_value": "*.example.com"}
            ]));
    });

    let client = CrtShClient::new(server.url("/"));
    let entries = client
        .query_ct_log(&CtLogQuery::Identity("%.example.com".to_string()))
        .await
        .unwrap();

    ct_mock.assert();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name_value, "example.com\nwww.example.com");
}

#[tokio::test]
async fn test_crtsh_organization_query() {
    let server = MockServer::start();
    let ct_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/")
            .query_param("O", "Example Corporation")
            .query_param("output", "json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!([{"name_value": "example-labs.com"}]));
    });

    let client = CrtShClient::new(server.url("/"));
    let entries = client
        .query_ct_log(&CtLogQuery::Organization("Example Corporation".to_string()))
        .await
        .unwrap();

    ct_mock.assert();
    assert_eq!(entries[0].name_value, "example-labs.com");
}

#[tokio::test]
async fn test_crtsh_error_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(502);
    });

    let client = CrtShClient::new(server.url("/"));
    let result = client
        .query_ct_log(&CtLogQuery::Identity("%.example.com".to_string()))
        .await;

    assert!(matches!(result, Err(LookupError::Status(502))));
}

#[tokio::test]
async fn test_crtsh_html_body_is_malformed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200)
            .header("Content-Type", "text/html")
            .body("<html><body>Too many requests</body></html>");
    });

    let client = CrtShClient::new(server.url("/"));
    let result = client
        .query_ct_log(&CtLogQuery::Identity("%.example.com".to_string()))
        .await;

    assert!(matches!(result, Err(LookupError::Malformed(_))));
}

#[tokio::test]
async fn test_rdap_registrant_lookup() {
    let server = MockServer::start();
    let rdap_mock = server.mock(|when, then| {
        when.method(GET).path("/domain/example.com");
        then.status(200)
            .header("Content-Type", "application/rdap+json")
            .json_body(serde_json::json!({
                "objectClassName": "domain",
                "ldhName": "example.com",
                "entities": [{
                    "roles": ["registrant"],
                    "vcardArray": ["vcard", [
                        ["version", {}, "text", "4.0"],
                        ["org", {}, "text", "Example Corporation"]
                    ]]
                }]
            }));
    });

    let client = RdapWhoisClient::new(server.url("/domain/"));
    let org = client.query_whois("example.com").await.unwrap();

    rdap_mock.assert();
    assert_eq!(org.as_deref(), Some("Example Corporation"));
}

#[tokio::test]
async fn test_rdap_not_found_is_no_organization() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/domain/unknown.test");
        then.status(404);
    });

    let client = RdapWhoisClient::new(server.url("/domain/"));
    assert_eq!(client.query_whois("unknown.test").await.unwrap(), None);
}

#[tokio::test]
async fn test_rdap_server_error_is_lookup_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/domain/example.com");
        then.status(500);
    });

    let client = RdapWhoisClient::new(server.url("/domain/"));
    let result = client.query_whois("example.com").await;
    assert!(matches!(result, Err(LookupError::Status(500))));
}

#[tokio::test]
async fn test_end_to_end_pipeline_against_mock_services() {
    let server = MockServer::start();

    let rdap_mock = server.mock(|when, then| {
        when.method(GET).path("/domain/example.com");
        then.status(200).json_body(serde_json::json!({
            "entities": [{
                "roles": ["registrant"],
                "vcardArray": ["vcard", [["org", {}, "text", "Example Corporation"]]]
            }]
        }));
    });
    let by_domain_mock = server.mock(|when, then| {
        when.method(GET).path("/ct").query_param("q", "%.example.com");
        then.status(200).json_body(serde_json::json!([
            {"name_value": "example.com\nportal.example.com"},
            {"name_value": "*.example.com"}
        ]));
    });
    let by_org_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/ct")
            .query_param("O", "Example Corporation");
        then.status(200).json_body(serde_json::json!([
            {"name_value": "example-cdn.net"},
            {"name_value": "portal.example.com"}
        ]));
    });

    let mut config = TomlConfig::default();
    config.sources.ct_log_endpoint = server.url("/ct");
    config.sources.rdap_endpoint = server.url("/domain/");

    let mut pipeline =
        DiscoveryPipeline::from_config(&config, Arc::new(FastRandSource::with_seed(1))).unwrap();
    let outcome = pipeline.run_discovery("example.com").await.unwrap();

    rdap_mock.assert();
    by_domain_mock.assert();
    by_org_mock.assert();

    assert!(outcome
        .stages
        .iter()
        .all(|s| s.source == ResolutionSource::Primary));
    assert_eq!(outcome.report.name_keywords, vec!["Example Corporation"]);
    assert_eq!(
        outcome.report.domain_keywords,
        vec!["example-cdn.net", "example.com", "portal.example.com"]
    );
    assert_eq!(outcome.report.total_count, 4);
}

#[tokio::test]
async fn test_end_to_end_pipeline_with_services_down() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.any_request();
        then.status(503);
    });

    let mut config = TomlConfig::default();
    config.sources.ct_log_endpoint = server.url("/ct");
    config.sources.rdap_endpoint = server.url("/domain/");
    config.fallback.organizations = vec!["Acme Holdings".to_string()];

    let mut pipeline =
        DiscoveryPipeline::from_config(&config, Arc::new(FastRandSource::with_seed(1))).unwrap();
    let outcome = pipeline.run_discovery("acme.io").await.unwrap();

    assert!(outcome
        .stages
        .iter()
        .all(|s| s.source == ResolutionSource::Fallback));
    assert_eq!(outcome.organization.as_deref(), Some("Acme Holdings"));
    assert_eq!(outcome.report.total_count, 12);
}

#[tokio::test]
async fn test_offline_config_never_touches_the_network() {
    let server = MockServer::start();
    let any_mock = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });

    let mut config = TomlConfig::default();
    config.sources.ct_log_endpoint = server.url("/ct");
    config.sources.rdap_endpoint = server.url("/domain/");
    config.sources.offline = true;

    let mut pipeline =
        DiscoveryPipeline::from_config(&config, Arc::new(FastRandSource::with_seed(1))).unwrap();
    let outcome = pipeline.run_discovery("acme.io").await.unwrap();

    any_mock.assert_hits(0);
    assert_eq!(outcome.report.total_count, 12);
}
