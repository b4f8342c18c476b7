use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::AppConfig;

use super::service::GeneratedDocument;

/// Body returned by every generation and conversion endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    #[schema(example = "sucesso")]
    pub status: String,
    #[schema(example = "autorizacao-de-venda")]
    pub tipo: String,
    pub pdf_name: String,
    pub docx_name: String,
    pub docx_url: String,
    pub pdf_url: String,
    /// Placeholders the template still contains (modelo livre only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

impl GenerationResponse {
    pub fn from_generated(document: GeneratedDocument, config: &AppConfig) -> Self {
        Self {
            status: "sucesso".to_string(),
            tipo: document.kind.to_string(),
            docx_url: config.download_url(&document.docx_name),
            pdf_url: config.download_url(&document.pdf_name),
            pdf_name: document.pdf_name,
            docx_name: document.docx_name,
            unresolved: document.unresolved,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GreetingResponse {
    pub message: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub converter: String,
    pub fonts_conf: Option<String>,
    pub font_families: Vec<String>,
    pub templates: Vec<String>,
}

/// Multipart body of `POST /api/convert`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertUploadRequest {
    #[allow(unused)]
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
