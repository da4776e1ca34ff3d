use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;

use crate::configuration::MediaSettings;
use crate::error::{MediaError, ValidationError};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Client for the external media-hosting service
///
/// Files are sent as the raw request body to `{base_url}/upload`; the service
/// answers with the public URL of the stored file.
#[derive(Clone)]
pub struct MediaClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(alias = "secure_url")]
    url: Option<String>,
}

impl MediaClient {
    pub fn new(base_url: String, api_key: String, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_settings(settings: &MediaSettings) -> Result<Self, MediaError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| MediaError::ServiceUnavailable(e.to_string()))?;

        Ok(Self::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            http_client,
        ))
    }

    fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url)
    }

    /// Upload a file and return its public URL
    pub async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, MediaError> {
        let size = bytes.len();
        let mut request = self
            .http_client
            .post(self.upload_url())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to reach media service");
            MediaError::ServiceUnavailable(e.to_string())
        })?;

        let response = response.error_for_status().map_err(|e| {
            tracing::error!(error = %e, "Media service rejected upload");
            MediaError::UploadFailed(e.to_string())
        })?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;

        let url = body
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| MediaError::InvalidResponse("response carries no url".to_string()))?;

        tracing::info!(bytes = size, url = %url, "File uploaded to media service");
        Ok(url)
    }
}

/// File carried inside a JSON body
///
/// Accepts a `data:<mime>;base64,<payload>` URL or bare base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl InlineFile {
    /// Decode `encoded`; a missing or blank value is `Ok(None)`
    pub fn parse(field: &str, encoded: Option<&str>) -> Result<Option<Self>, ValidationError> {
        let encoded = match encoded.map(str::trim).filter(|e| !e.is_empty()) {
            Some(encoded) => encoded,
            None => return Ok(None),
        };

        let (content_type, payload) = match encoded.strip_prefix("data:") {
            Some(rest) => {
                let (meta, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| ValidationError::InvalidFormat(field.to_string()))?;
                let mime = meta
                    .strip_suffix(";base64")
                    .ok_or_else(|| ValidationError::InvalidFormat(field.to_string()))?;
                let mime = if mime.is_empty() { DEFAULT_CONTENT_TYPE } else { mime };
                (mime.to_string(), payload)
            }
            None => (DEFAULT_CONTENT_TYPE.to_string(), encoded),
        };

        let bytes = BASE64
            .decode(payload)
            .map_err(|_| ValidationError::InvalidFormat(field.to_string()))?;
        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            bytes,
            content_type,
        }))
    }
}
