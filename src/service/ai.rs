//! Proxy to an external generative model.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AiConfig;
use crate::error::{IonixError, Result};

const DEFAULT_IMAGE_PROMPT: &str = "Analyze this image";
const DEFAULT_IMAGE_MIME: &str = "image/png";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: Option<String>,
    /// Data URL (`data:image/png;base64,...`) or bare base64.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

/// A validated prompt ready to send upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub image: Option<InlineImage>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// Split a data URL into MIME type and base64 body, validating the body.
pub fn parse_image(raw: &str) -> Result<InlineImage> {
    let (mime_type, data) = match raw.strip_prefix("data:").and_then(|r| r.split_once(',')) {
        Some((header, data)) => {
            let mime = header.trim_end_matches(";base64");
            let mime = if mime.is_empty() { DEFAULT_IMAGE_MIME } else { mime };
            (mime.to_string(), data.to_string())
        }
        None => (DEFAULT_IMAGE_MIME.to_string(), raw.to_string()),
    };

    STANDARD
        .decode(data.as_bytes())
        .map_err(|_| IonixError::validation("Invalid image payload"))?;

    Ok(InlineImage { mime_type, data })
}

impl Prompt {
    pub fn from_request(request: ChatRequest) -> Result<Self> {
        let text = request.prompt.filter(|p| !p.trim().is_empty());
        let image = request
            .image
            .filter(|i| !i.is_empty())
            .map(|i| parse_image(&i))
            .transpose()?;

        match (text, image) {
            (Some(text), image) => Ok(Self { text, image }),
            (None, Some(image)) => Ok(Self {
                text: DEFAULT_IMAGE_PROMPT.to_string(),
                image: Some(image),
            }),
            (None, None) => Err(IonixError::validation("Please provide a prompt")),
        }
    }
}

/// Validate the request, forward it, and collapse any upstream failure into
/// a generic error. No retries.
pub async fn chat(model: &dyn ChatModel, request: ChatRequest) -> Result<ChatResponse> {
    let prompt = Prompt::from_request(request)?;
    match model.generate(&prompt).await {
        Ok(reply) => Ok(ChatResponse { reply }),
        Err(e) => {
            tracing::warn!(error = %e, "AI request failed");
            Err(IonixError::Upstream("AI processing failed.".to_string()))
        }
    }
}

// ============================================================================
// Gemini
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Client for the Generative Language `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    config: AiConfig,
}

impl GeminiClient {
    pub fn new(config: AiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn request_body(prompt: &Prompt) -> serde_json::Value {
        let mut parts = vec![json!({ "text": prompt.text })];
        if let Some(image) = &prompt.image {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": image.data,
                }
            }));
        }
        json!({ "contents": [{ "parts": parts }] })
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| IonixError::Config("ai.api_key is not configured".to_string()))?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .http
            .post(url)
            .query(&[("key", api_key)])
            .json(&Self::request_body(prompt))
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(IonixError::Upstream("empty model response".to_string()));
        }
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Echoes the prompt back; fails when the prompt says "fail".
    pub(crate) struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn generate(&self, prompt: &Prompt) -> Result<String> {
            if prompt.text == "fail" {
                return Err(IonixError::Upstream("quota exceeded".to_string()));
            }
            let suffix = if prompt.image.is_some() { " [image]" } else { "" };
            Ok(format!("echo: {}{}", prompt.text, suffix))
        }
    }

    #[test]
    fn test_parse_data_url() {
        let image = parse_image("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "aGVsbG8=");
    }

    #[test]
    fn test_parse_bare_base64() {
        let image = parse_image("aGVsbG8=").unwrap();
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_image("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, IonixError::Validation(_)));
    }

    #[test]
    fn test_image_without_prompt_gets_default() {
        let prompt = Prompt::from_request(ChatRequest {
            prompt: Some("  ".to_string()),
            image: Some("data:image/png;base64,aGVsbG8=".to_string()),
        })
        .unwrap();
        assert_eq!(prompt.text, "Analyze this image");
    }

    #[test]
    fn test_empty_request_rejected() {
        let err = Prompt::from_request(ChatRequest::default()).unwrap_err();
        assert!(matches!(err, IonixError::Validation(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let prompt = Prompt {
            text: "hi".to_string(),
            image: Some(InlineImage {
                mime_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            }),
        };
        let body = GeminiClient::request_body(&prompt);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            body["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
    }

    #[tokio::test]
    async fn test_chat_maps_upstream_failure() {
        let reply = chat(
            &EchoModel,
            ChatRequest {
                prompt: Some("hello".to_string()),
                image: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(reply.reply, "echo: hello");

        let err = chat(
            &EchoModel,
            ChatRequest {
                prompt: Some("fail".to_string()),
                image: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IonixError::Upstream(ref m) if m == "AI processing failed."));
    }
}
