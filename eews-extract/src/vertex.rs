//! Vertex AI Gemini client
//!
//! Calls `generateContent` with a fixed generation configuration and all
//! safety categories set to `BLOCK_NONE`.

use async_trait::async_trait;
use eews_common::config::{GcpSettings, ModelSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::{AnnotationModel, AnnotationRequest, ModelError, PromptPart};

const USER_AGENT: &str = "eews-pipeline/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 120;

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const BLOCK_NONE: &str = "BLOCK_NONE";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Vertex AI client for one publisher model
pub struct VertexClient {
    http_client: reqwest::Client,
    endpoint: String,
    model_name: String,
    generation_config: GenerationConfig,
    access_token: String,
}

impl VertexClient {
    pub fn new(
        gcp: &GcpSettings,
        settings: &ModelSettings,
        access_token: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ModelError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: generate_content_url(gcp, &settings.model_name),
            model_name: settings.model_name.clone(),
            generation_config: GenerationConfig {
                max_output_tokens: settings.max_output_tokens,
                temperature: settings.temperature,
                top_p: settings.top_p,
            },
            access_token: access_token.into(),
        })
    }

    fn build_body(&self, request: &AnnotationRequest) -> GenerateContentRequest {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => RequestPart::Text { text: text.clone() },
                PromptPart::Image { uri, mime_type } => RequestPart::File {
                    file_data: FileData {
                        mime_type: mime_type.clone(),
                        file_uri: uri.clone(),
                    },
                },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![RequestContent { role: "user", parts }],
            generation_config: self.generation_config,
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: BLOCK_NONE,
                })
                .collect(),
        }
    }
}

/// `https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent`
fn generate_content_url(gcp: &GcpSettings, model_name: &str) -> String {
    format!(
        "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}:generateContent",
        loc = gcp.location,
        project = gcp.project_id,
        model = model_name
    )
}

/// Concatenated text of the first candidate
fn response_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    let block_reason = response
        .prompt_feedback
        .and_then(|f| f.block_reason);

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        ModelError::EmptyResponse(
            block_reason
                .map(|r| format!("prompt blocked: {}", r))
                .unwrap_or_else(|| "no candidates".to_string()),
        )
    })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse(format!(
            "no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[async_trait]
impl AnnotationModel for VertexClient {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, request: &AnnotationRequest) -> Result<String, ModelError> {
        let body = self.build_body(request);

        tracing::debug!(model = %self.model_name, parts = request.parts.len(), "Calling generateContent");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(ModelError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::ApiError(status.as_u16(), error_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::ParseError(e.to_string()))?;

        response_text(parsed)
    }
}
