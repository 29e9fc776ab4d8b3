//! Generative model seam
//!
//! The extractor only needs "prompt parts in, text out". Production uses
//! [`crate::vertex::VertexClient`]; tests substitute a scripted model.

use async_trait::async_trait;
use thiserror::Error;

/// Generative model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Unauthorized (check credentials)")]
    Unauthorized,

    #[error("Parse error: {0}")]
    ParseError(String),

    /// No candidate text, e.g. the prompt was blocked
    #[error("Empty response: {0}")]
    EmptyResponse(String),
}

/// One element of a multimodal prompt
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    /// Image referenced by storage URI
    Image { uri: String, mime_type: String },
}

impl PromptPart {
    pub fn image(uri: &str, mime_type: &str) -> Self {
        PromptPart::Image {
            uri: uri.to_string(),
            mime_type: mime_type.to_string(),
        }
    }
}

/// A complete single-turn request
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRequest {
    pub parts: Vec<PromptPart>,
}

#[async_trait]
pub trait AnnotationModel: Send + Sync {
    /// Model identifier for logging
    fn name(&self) -> &str;

    /// Run one generation and return the raw response text
    async fn generate(&self, request: &AnnotationRequest) -> Result<String, ModelError>;
}
