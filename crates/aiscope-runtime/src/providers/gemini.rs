//! Google Gemini provider implementation.
//!
//! Talks to the Generative Language REST API (`v1beta`): `generateContent`,
//! `models.list`, and the Files API used for reference uploads.
//!
//! ## Security
//!
//! The API key lives in an [`ApiCredential`] and is only exposed when the
//! `x-goog-api-key` header is set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use aiscope_core::{
    FileReference, FileState, GenerationRequest, MessagePart, ModelCatalogEntry,
};

use super::{
    secrets::{ApiCredential, CredentialSource},
    FileStore, GenerativeProvider, ProviderError,
};

/// Environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default API root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_VERSION: &str = "v1beta";
const LIST_PAGE_SIZE: u32 = 1000;

/// Gemini provider over `reqwest`.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider from an already-resolved credential.
    pub fn new(credential: ApiCredential, timeout: Duration) -> Result<Self, ProviderError> {
        if credential.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{} is empty",
                credential.name()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            credential,
            base_url: GEMINI_BASE_URL.to_string(),
            timeout,
            client,
        })
    }

    /// Create from a raw key.
    pub fn with_api_key(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Self::new(
            ApiCredential::new(api_key, CredentialSource::Programmatic, "Gemini API key"),
            timeout,
        )
    }

    /// Create from `GEMINI_API_KEY`.
    pub fn from_env(timeout: Duration) -> Result<Self, ProviderError> {
        Self::new(
            ApiCredential::from_env(GEMINI_API_KEY_ENV, "Gemini API key")?,
            timeout,
        )
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_VERSION, path)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        // SECURITY: Only expose the credential here, at the point of use
        let response = builder
            .header("x-goog-api-key", self.credential.expose())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else if e.is_connect() {
                    ProviderError::Unavailable(e.to_string())
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Map a non-success response to a structured error.
async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let (rpc_status, message) = match serde_json::from_str::<GoogleErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.status, envelope.error.message),
        Err(_) => (None, body),
    };

    match (status, rpc_status.as_deref()) {
        (429, _) | (_, Some("RESOURCE_EXHAUSTED")) => ProviderError::QuotaExhausted { message },
        (503, _) | (_, Some("UNAVAILABLE")) => ProviderError::Unavailable(message),
        (401, _) | (403, _) => ProviderError::AuthError(message),
        _ => ProviderError::ApiError { status, message },
    }
}

fn guess_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") | Some("markdown") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: WireContent,
    contents: Vec<WireContent>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: WireFileData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<WireModel>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireModel {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    display_name: Option<String>,
    mime_type: Option<String>,
    uri: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: WireFile,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
    status: Option<String>,
}

impl GenerateContentRequest {
    fn from_request(request: &GenerationRequest) -> Self {
        let mut contents: Vec<WireContent> = request
            .history
            .iter()
            .map(|turn| WireContent {
                role: Some(turn.role.as_str().to_string()),
                parts: vec![WirePart::Text {
                    text: turn.content.clone(),
                }],
            })
            .collect();

        let parts = request
            .message_parts()
            .into_iter()
            .map(|part| match part {
                MessagePart::File(file) => WirePart::FileData {
                    file_data: WireFileData {
                        mime_type: file.mime_type.clone(),
                        file_uri: file.uri.clone(),
                    },
                },
                MessagePart::Text(text) => WirePart::Text {
                    text: text.to_string(),
                },
            })
            .collect();

        contents.push(WireContent {
            role: Some("user".to_string()),
            parts,
        });

        let config = request.generation_config;
        Self {
            system_instruction: WireContent {
                role: None,
                parts: vec![WirePart::Text {
                    text: request.system_instruction.clone(),
                }],
            },
            contents,
            generation_config: WireGenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                max_output_tokens: config.max_output_tokens,
            },
        }
    }
}

impl GenerateContentResponse {
    fn into_text(self, model: &str) -> Result<String, ProviderError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::EmptyResponse {
                model: model.to_string(),
                reason: format!("prompt blocked: {}", reason),
            });
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::EmptyResponse {
                model: model.to_string(),
                reason: "no candidates".to_string(),
            }
        })?;

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| match part {
                WirePart::Text { text } => Some(text),
                WirePart::FileData { .. } => None,
            })
            .collect();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse {
                model: model.to_string(),
                reason: format!("no text (finish reason: {})", finish_reason),
            });
        }

        Ok(text)
    }
}

impl From<WireModel> for ModelCatalogEntry {
    fn from(model: WireModel) -> Self {
        ModelCatalogEntry {
            name: model.name,
            display_name: model.display_name,
            supported_generation_methods: model.supported_generation_methods,
        }
    }
}

impl WireFile {
    fn into_reference(self) -> Result<FileReference, ProviderError> {
        let state = match self.state.as_deref() {
            Some("ACTIVE") => FileState::Ready,
            Some("FAILED") => FileState::Failed,
            // PROCESSING and STATE_UNSPECIFIED
            _ => FileState::Pending,
        };
        let uri = self.uri.ok_or_else(|| {
            ProviderError::ParseError(format!("file {} has no uri", self.name))
        })?;

        Ok(FileReference {
            name: self.name,
            uri,
            mime_type: self
                .mime_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            display_name: self.display_name,
            state,
        })
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let body = GenerateContentRequest::from_request(request);
        let url = self.url(&format!("{}:generateContent", Self::model_path(model)));

        let response = self.send(self.client.post(url).json(&body)).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parsed.into_text(model)
    }

    async fn list_models(&self) -> Result<Vec<ModelCatalogEntry>, ProviderError> {
        let mut catalog = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let response = self
                .send(self.client.get(self.url("models")).query(&query))
                .await?;
            let page: ListModelsResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::ParseError(e.to_string()))?;

            catalog.extend(page.models.into_iter().map(ModelCatalogEntry::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(catalog)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl FileStore for GeminiProvider {
    async fn upload(
        &self,
        path: &Path,
        display_name: Option<&str>,
    ) -> Result<FileReference, ProviderError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ProviderError::Other(format!("reading {}: {}", path.display(), e)))?;
        let mime_type = guess_mime_type(path);
        let display_name = display_name
            .map(str::to_string)
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "reference".to_string());

        // Resumable protocol: start a session, then upload and finalize in one chunk.
        let start = self
            .client
            .post(format!("{}/upload/{}/files", self.base_url, API_VERSION))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }));
        let session = self.send(start).await?;

        let upload_url = session
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("missing x-goog-upload-url".to_string()))?;

        let finish = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .header("Content-Length", bytes.len().to_string())
            .body(bytes);
        let response = self.send(finish).await?;

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        uploaded.file.into_reference()
    }

    async fn get(&self, name: &str) -> Result<FileReference, ProviderError> {
        let response = self.send(self.client.get(self.url(name))).await?;
        let file: WireFile = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        file.into_reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiscope_core::{ChatTurn, GenerationConfig, RequestAssembler};

    fn ready_file() -> FileReference {
        FileReference {
            name: "files/ref1".to_string(),
            uri: "https://generativelanguage.googleapis.com/v1beta/files/ref1".to_string(),
            mime_type: "application/pdf".to_string(),
            display_name: Some("essay.pdf".to_string()),
            state: FileState::Ready,
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let history = vec![ChatTurn::from_label("user", "q1"), ChatTurn::from_label("assistant", "a1")];
        let request = RequestAssembler::new("system text", GenerationConfig::default())
            .build("The sky is blue.", &history, &[ready_file()])
            .unwrap();

        let json = serde_json::to_value(GenerateContentRequest::from_request(&request)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "system text");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "a1");

        let last = &json["contents"][2];
        assert_eq!(last["role"], "user");
        assert_eq!(last["parts"][0]["fileData"]["mimeType"], "application/pdf");
        assert_eq!(last["parts"][1]["text"], "The sky is blue.");

        let config = &json["generationConfig"];
        assert_eq!(config["maxOutputTokens"], 8192);
        assert!((config["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_response_text_joined() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"<<SCORE:12>>"},{"text":" Human-written."}]},"finishReason":"STOP"}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text("m").unwrap(), "<<SCORE:12>> Human-written.");
    }

    #[test]
    fn test_blocked_prompt_is_empty_response() {
        let body = r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let err = parsed.into_text("m").unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_catalog_entry_from_wire() {
        let body = r#"{"models":[{"name":"models/gemini-1.5-flash","displayName":"Gemini 1.5 Flash","supportedGenerationMethods":["generateContent","countTokens"]}]}"#;
        let page: ListModelsResponse = serde_json::from_str(body).unwrap();
        let entry = ModelCatalogEntry::from(page.models.into_iter().next().unwrap());

        assert!(entry.supports("generateContent"));
        assert_eq!(entry.display_name.as_deref(), Some("Gemini 1.5 Flash"));
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_file_states() {
        let file: WireFile = serde_json::from_str(
            r#"{"name":"files/x","uri":"https://f/x","mimeType":"text/plain","state":"PROCESSING"}"#,
        )
        .unwrap();
        assert_eq!(file.into_reference().unwrap().state, FileState::Pending);

        let file: WireFile = serde_json::from_str(
            r#"{"name":"files/x","uri":"https://f/x","state":"ACTIVE"}"#,
        )
        .unwrap();
        let reference = file.into_reference().unwrap();
        assert_eq!(reference.state, FileState::Ready);
        assert_eq!(reference.mime_type, "application/octet-stream");
    }

    #[test]
    fn test_model_path_normalization() {
        assert_eq!(GeminiProvider::model_path("gemini-pro"), "models/gemini-pro");
        assert_eq!(GeminiProvider::model_path("models/gemini-pro"), "models/gemini-pro");
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(guess_mime_type(Path::new("a/b.PDF")), "application/pdf");
        assert_eq!(guess_mime_type(Path::new("notes.md")), "text/markdown");
        assert_eq!(guess_mime_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret_key = "AIza-super-secret-key-12345";
        let provider = GeminiProvider::with_api_key(secret_key, Duration::from_secs(5)).unwrap();

        let debug_output = format!("{:?}", provider);
        assert!(!debug_output.contains(secret_key), "API key was exposed in Debug output!");
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = GeminiProvider::with_api_key("", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
