//! Documentation oracle against canned and mock-served documents.

use std::path::Path;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kupa_docs::fakes::StaticFetcher;
use kupa_docs::{DocsConfig, DocsError, DocsOracle, HttpFetcher, TextFetcher};
use kupa_domain::{ChangeKind, KubeVersion, Oracle, Resource};

const CHANGELOG: &str = "\
# v1.22.0

## Deprecation

- The extensions/v1beta1 Ingress apiVersion is no longer served; use networking.k8s.io/v1.

## Bug fixes

- Ingress status is now reported correctly
";

const REFERENCE: &str = r#"<html><body>
<h2>CustomResourceDefinition v1 apiextensions.k8s.io</h2>
<p>Version apiextensions.k8s.io/v1beta1 is deprecated; use apiextensions.k8s.io/v1.</p>
</body></html>"#;

fn resource(kind: &str, api_version: &str) -> Resource {
    let body: serde_yaml::Value = serde_yaml::from_str(&format!(
        "apiVersion: {api_version}\nkind: {kind}\nmetadata:\n  name: sample\n"
    ))
    .unwrap();
    Resource::from_document(body, Path::new("x.yaml")).unwrap()
}

fn config() -> DocsConfig {
    DocsConfig {
        changelog_base_url: "https://docs.test/CHANGELOG".to_string(),
        api_reference_url: "https://docs.test/reference".to_string(),
        ..DocsConfig::default()
    }
}

#[tokio::test]
async fn test_changelog_verdict_for_matching_resource() {
    let fetcher = StaticFetcher::new()
        .with_document("https://docs.test/CHANGELOG/CHANGELOG-1.22.md", CHANGELOG)
        .with_document("https://docs.test/reference", REFERENCE);
    let oracle = DocsOracle::new(fetcher, config());
    let target = KubeVersion::parse("v1.22").unwrap();

    let response = oracle
        .consult(&resource("Ingress", "extensions/v1beta1"), &target)
        .await;

    assert!(response.breaking);
    assert_eq!(response.change_kind, Some(ChangeKind::Other("API_CHANGE".to_string())));
    assert_eq!(response.recommended_action, "Use networking.k8s.io/v1");
    let fixed = response.fixed_body.unwrap();
    assert_eq!(fixed["apiVersion"].as_str(), Some("networking.k8s.io/v1"));
}

#[tokio::test]
async fn test_reference_verdict_and_documents_fetched_once() {
    let fetcher = StaticFetcher::new().with_document("https://docs.test/reference", REFERENCE);
    let oracle = DocsOracle::new(fetcher, config());
    let target = KubeVersion::parse("v1.22.3").unwrap();
    let crd = resource("CustomResourceDefinition", "apiextensions.k8s.io/v1beta1");

    let first = oracle.lookup(&crd, &target).await;
    let second = oracle.lookup(&crd, &target).await;

    assert_eq!(first, second);
    assert_eq!(first.change_kind, Some(ChangeKind::ApiDeprecated));
    assert_eq!(first.recommended_action, "Use apiextensions.k8s.io/v1 instead");

    // Three changelog candidates (all missing) plus the reference page, once each.
    let requests = oracle.fetcher().requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[3], "https://docs.test/reference");
}

#[tokio::test]
async fn test_missing_documents_mean_no_change() {
    let fetcher = StaticFetcher::new();
    let oracle = DocsOracle::new(fetcher, config());
    let target = KubeVersion::parse("v1.25").unwrap();

    let response = oracle
        .lookup(&resource("Deployment", "apps/v1beta2"), &target)
        .await;

    assert!(!response.breaking);
}

#[tokio::test]
async fn test_http_fetcher_reports_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/CHANGELOG-1.25.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHANGELOG))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let body = fetcher
        .fetch(&format!("{}/CHANGELOG-1.25.md", server.uri()))
        .await
        .unwrap();
    assert!(body.contains("## Deprecation"));

    let missing = fetcher
        .fetch(&format!("{}/CHANGELOG-9.99.md", server.uri()))
        .await;
    assert!(matches!(missing, Err(DocsError::Status { status: 404, .. })));
}
