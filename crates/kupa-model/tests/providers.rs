//! Provider round trips against a mock HTTP server.

use std::path::Path;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kupa_domain::{ChangeKind, KubeVersion, Oracle, Resource};
use kupa_model::{HostedModelClient, LocalModelClient, ModelConfig, ModelProvider};

fn deployment() -> Resource {
    let body: serde_yaml::Value = serde_yaml::from_str(
        "apiVersion: apps/v1beta2\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 2\n",
    )
    .unwrap();
    Resource::from_document(body, Path::new("deploy.yaml")).unwrap()
}

fn target() -> KubeVersion {
    KubeVersion::parse("v1.25").unwrap()
}

fn hosted_config(server: &MockServer) -> ModelConfig {
    ModelConfig {
        api_base: server.uri(),
        ..ModelConfig::default()
    }
    .with_api_key("sk-test")
}

fn local_config(server: &MockServer, model: &str) -> ModelConfig {
    ModelConfig {
        local_url: server.uri(),
        model: model.to_string(),
        ..ModelConfig::default()
    }
    .with_provider(ModelProvider::Local)
}

#[tokio::test]
async fn test_hosted_breaking_verdict() {
    let server = MockServer::start().await;
    let content = json!({
        "has_breaking_change": true,
        "change_type": "API_REMOVED",
        "description": "apps/v1beta2 Deployment was removed in 1.16",
        "recommended_action": "Use apps/v1",
        "updated_content": {"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "web"}}
    })
    .to_string();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4-turbo",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HostedModelClient::new(&hosted_config(&server)).unwrap();
    let response = client.consult(&deployment(), &target()).await;

    assert!(response.is_actionable());
    assert_eq!(response.change_kind, Some(ChangeKind::ApiRemoved));
    let fixed = response.fixed_body.unwrap();
    assert_eq!(fixed["apiVersion"].as_str(), Some("apps/v1"));
}

#[tokio::test]
async fn test_hosted_low_confidence_is_not_actionable() {
    let server = MockServer::start().await;
    let content = json!({
        "has_breaking_change": true,
        "change_type": "API_DEPRECATED",
        "description": "Possibly deprecated",
        "confidence": 0.4
    })
    .to_string();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .mount(&server)
        .await;

    let client = HostedModelClient::new(&hosted_config(&server)).unwrap();
    let response = client.consult(&deployment(), &target()).await;

    assert!(response.is_actionable());
    assert_eq!(response.change_kind, Some(ChangeKind::ApiDeprecated));
    assert!(response.fixed_body.is_none());
}

#[tokio::test]
async fn test_hosted_http_error_degrades_to_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = HostedModelClient::new(&hosted_config(&server)).unwrap();
    let response = client.consult(&deployment(), &target()).await;

    assert!(!response.breaking);
    assert!(!response.confident);
    assert!(response.description.contains("429"));
}

#[tokio::test]
async fn test_local_substitutes_installed_model_and_parses_prose() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3:8b"}, {"name": "codellama:13b"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generated = format!(
        "Here is my answer:\n{}\nHope this helps.",
        json!({
            "has_breaking_change": true,
            "change_type": "API_REMOVED",
            "description": "removed",
            "recommended_action": "Use apps/v1"
        })
    );
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "codellama:13b", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": generated })))
        .expect(2)
        .mount(&server)
        .await;

    let client = LocalModelClient::new(&local_config(&server, "codellama:7b")).unwrap();
    let first = client.consult(&deployment(), &target()).await;
    let second = client.consult(&deployment(), &target()).await;

    assert!(first.is_actionable());
    assert_eq!(first.change_kind, Some(ChangeKind::ApiRemoved));
    // No fix proposed: the pipeline keeps the original body.
    assert!(first.fixed_body.is_none());
    assert_eq!(first, second);
    assert_eq!(client.model_name().await, "codellama:13b");
}

#[tokio::test]
async fn test_local_unparseable_reply_flags_deprecation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "codellama:7b"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "This Deployment looks outdated to me."
        })))
        .mount(&server)
        .await;

    let client = LocalModelClient::new(&local_config(&server, "codellama:7b")).unwrap();
    let response = client.consult(&deployment(), &target()).await;

    assert!(response.is_actionable());
    assert_eq!(response.change_kind, Some(ChangeKind::ApiDeprecated));
    assert!(response.fixed_body.is_none());
}

#[tokio::test]
async fn test_local_server_down_degrades_to_unavailable() {
    let server = MockServer::start().await;
    let config = local_config(&server, "codellama:7b");
    drop(server);

    let client = LocalModelClient::new(&config).unwrap();
    let response = client.consult(&deployment(), &target()).await;

    assert!(!response.breaking);
    assert!(!response.confident);
}
