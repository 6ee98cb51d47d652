//! Prompt construction.

use kupa_domain::{KubeVersion, Resource};

use crate::error::ModelError;

/// System message for chat-style providers.
pub const SYSTEM_PROMPT: &str = "You are a Kubernetes expert assistant that helps identify \
breaking changes in Kubernetes resources when upgrading versions.";

/// Render the question for one resource and target version.
///
/// The resource body is embedded as pretty JSON so the model can echo a fixed
/// copy back in `updated_content`.
pub fn build_prompt(resource: &Resource, target: &KubeVersion) -> Result<String, ModelError> {
    let body = serde_json::to_string_pretty(&resource.body)
        .map_err(|e| ModelError::Prompt(e.to_string()))?;

    Ok(format!(
        r#"I have a Kubernetes resource of kind {kind} with apiVersion {api_version}.
I want to know if there are any breaking changes when upgrading to Kubernetes version {target}.

Here is the resource:
```json
{body}
```

Please analyze this resource and tell me:
1. Are there any breaking changes for this resource in Kubernetes {target}?
2. If yes, what is the change type (API_DEPRECATED, API_REMOVED, FIELD_REMOVED, etc.)?
3. Description of the breaking change
4. Recommended action to fix it
5. The updated resource that would fix the issue

Respond with JSON only, using exactly this structure:
{{
    "has_breaking_change": true/false,
    "change_type": "string",
    "description": "string",
    "recommended_action": "string",
    "updated_content": {{}}
}}
"#,
        kind = resource.kind,
        api_version = resource.api_version,
        target = target,
        body = body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_prompt_embeds_resource_and_target() {
        let body: serde_yaml::Value = serde_yaml::from_str(
            "apiVersion: apps/v1beta2\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 3\n",
        )
        .unwrap();
        let resource = Resource::from_document(body, Path::new("d.yaml")).unwrap();
        let target = KubeVersion::parse("v1.25").unwrap();

        let prompt = build_prompt(&resource, &target).unwrap();

        assert!(prompt.contains("kind Deployment with apiVersion apps/v1beta2"));
        assert!(prompt.contains("Kubernetes version v1.25"));
        assert!(prompt.contains("\"replicas\": 3"));
        for field in [
            "has_breaking_change",
            "change_type",
            "description",
            "recommended_action",
            "updated_content",
        ] {
            assert!(prompt.contains(field), "prompt missing {field}");
        }
    }
}
