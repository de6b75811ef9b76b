//! External generative collaborator for AI-assisted conversion.
//!
//! One synchronous request/response round trip against an
//! OpenRouter-compatible chat endpoint. The collaborator is opaque to the
//! engine: it receives the canonical model and target dialect and must
//! answer with a structured JSON object. There is no retry loop; the
//! engine's deterministic fallback is the retry policy.

use async_trait::async_trait;
use thiserror::Error;

use crate::schema::CanonicalModel;

/// Default API base URL for OpenRouter
pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model to use
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-lite";

const SYSTEM_PROMPT: &str = r#"You are a database schema conversion assistant. You receive a JSON document with two fields: "model" (a canonical schema with entities, attributes, and relationships) and "target_dialect" (the database dialect to produce DDL for).

Respond with a single JSON object and nothing else:
{
  "ddl_text": "<complete DDL for the target dialect>",
  "mapping_explanations": [
    { "entity": "...", "attribute": "...", "source_type": "...", "target_type": "...", "reason": "..." }
  ]
}

Rules:
1. Produce one definition per entity (CREATE TABLE for relational targets, db.createCollection for MongoDB)
2. Render primary keys with the target dialect's identity idiom
3. Emit a foreign-key constraint for every relationship, on the entity that owns the foreign-key attribute
4. Include exactly one mapping explanation per attribute
5. Do not wrap the JSON in markdown fences or add commentary"#;

/// Failure of the collaborator call: transport, status, or response shape.
/// Recoverable by design; the engine absorbs it via deterministic fallback.
#[derive(Debug, Error)]
#[error("collaborator call failed: {0}")]
pub struct CollaboratorError(pub String);

/// A one-shot generative collaborator.
///
/// Implementations return the raw structured response; shape validation
/// happens in the conversion engine so every implementation is checked the
/// same way.
#[async_trait]
pub trait GenerativeCollaborator: Send + Sync {
    async fn generate_ddl(
        &self,
        model: &CanonicalModel,
        target_dialect: &str,
    ) -> Result<serde_json::Value, CollaboratorError>;
}

/// Collaborator configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct CollaboratorConfig {
    pub api_base: String,
    pub api_token: Option<String>,
    pub model: String,
}

impl CollaboratorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("OPENAPI_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            api_token: std::env::var("OPENAPI_TOKEN").ok(),
            model: std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }

    /// Check if an API token is configured
    pub fn has_token(&self) -> bool {
        self.api_token.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Reqwest-backed collaborator against an OpenRouter-compatible endpoint
pub struct HttpCollaborator {
    config: CollaboratorConfig,
    client: reqwest::Client,
}

impl HttpCollaborator {
    pub fn new(config: CollaboratorConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(CollaboratorConfig::from_env())
    }
}

#[async_trait]
impl GenerativeCollaborator for HttpCollaborator {
    async fn generate_ddl(
        &self,
        model: &CanonicalModel,
        target_dialect: &str,
    ) -> Result<serde_json::Value, CollaboratorError> {
        if !self.config.has_token() {
            return Err(CollaboratorError("no API token configured".into()));
        }
        let token = self.config.api_token.clone().unwrap_or_default();

        let request = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": serde_json::json!({
                        "model": model,
                        "target_dialect": target_dialect,
                    })
                    .to_string(),
                },
            ],
            "temperature": 0.2,
        });

        tracing::debug!(
            model = %self.config.model,
            target_dialect,
            entities = model.entities.len(),
            "sending collaborator request"
        );
        let response = self
            .client
            .post(&self.config.api_base)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {token}"))
            .header("X-Title", "schemamorph")
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError(format!("transport error: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CollaboratorError(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            tracing::warn!(%status, "collaborator returned an error response");
            return Err(CollaboratorError(format!("status {status}: {body}")));
        }

        let completion: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| CollaboratorError(format!("response is not JSON: {e}")))?;
        let content = completion
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CollaboratorError("unexpected completion shape".into()))?;
        serde_json::from_str(strip_code_fence(content))
            .map_err(|e| CollaboratorError(format!("completion content is not JSON: {e}")))
    }
}

/// Models sometimes wrap the JSON reply in a markdown fence despite the
/// instructions; accept both forms.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    match inner.trim_end().strip_suffix("```") {
        Some(body) => body.trim(),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_is_left_alone() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "```json\n{\"a\": 1}");
    }

    #[test]
    fn token_presence() {
        let config = CollaboratorConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            api_token: None,
            model: DEFAULT_MODEL.to_string(),
        };
        assert!(!config.has_token());

        let config = CollaboratorConfig {
            api_token: Some(String::new()),
            ..config
        };
        assert!(!config.has_token());

        let config = CollaboratorConfig {
            api_token: Some("sk-test".into()),
            ..config
        };
        assert!(config.has_token());
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let collaborator = HttpCollaborator::new(CollaboratorConfig {
            api_base: "http://127.0.0.1:1/unreachable".into(),
            api_token: None,
            model: DEFAULT_MODEL.into(),
        });
        let result = collaborator
            .generate_ddl(&CanonicalModel::new(), "postgresql")
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no API token"));
    }
}
