//! Transport collaborator: the single seam through which the strategy talks
//! to the network.
//!
//! The trait is annotated for `mockall` so consumers can test upload
//! orchestration without a server; [`RestTransport`] is the production
//! implementation over a shared `reqwest` client.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::codec::{EncodedBody, FieldValue, MultipartField};
use crate::error::{Result, TransmitError};
use crate::media::MediaType;

/// Request shape handed to the transport: url, method, content type, body.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub method: Method,
    pub content_type: Option<MediaType>,
    pub body: Option<EncodedBody>,
}

impl TransportRequest {
    /// Submission request carrying an encoded payload.
    pub fn post(url: impl Into<String>, content_type: MediaType, body: EncodedBody) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            content_type: Some(content_type),
            body: Some(body),
        }
    }

    /// Bare status-check request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            content_type: None,
            body: None,
        }
    }
}

/// What the remote end answered: either a bare resource locator, or an
/// object whose fields the strategy inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransportResponse {
    Locator(String),
    Fields(serde_json::Map<String, serde_json::Value>),
}

impl TransportResponse {
    /// The final resource locator, if the response already carries one: the
    /// string itself, or the object's `url` field.
    pub fn resource_url(&self) -> Option<&str> {
        match self {
            TransportResponse::Locator(locator) => Some(locator),
            TransportResponse::Fields(fields) => fields.get("url").and_then(|v| v.as_str()),
        }
    }

    /// The status URL of a submitted-but-unconfirmed upload, if the response
    /// is an acknowledgement rather than a completion.
    pub fn status_url(&self) -> Option<&str> {
        match self {
            TransportResponse::Locator(_) => None,
            TransportResponse::Fields(fields) => fields
                .get("statusUrl")
                .or_else(|| fields.get("status_url"))
                .and_then(|v| v.as_str()),
        }
    }
}

/// Generic HTTP transport the upload strategy submits through.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Production transport over a shared [`reqwest::Client`].
pub struct RestTransport {
    client: reqwest::Client,
}

impl RestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for RestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn fetch(&self, request: TransportRequest) -> Result<TransportResponse> {
        info!(url = %request.url, method = %request.method, "Dispatching transport request");
        let mut builder = self.client.request(request.method.clone(), &request.url);
        // Multipart bodies must keep the boundary header reqwest generates.
        if let (Some(content_type), false) = (
            request.content_type,
            matches!(request.body, Some(EncodedBody::Multipart(_))),
        ) {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type.header_value());
        }
        builder = match request.body {
            Some(EncodedBody::Multipart(fields)) => builder.multipart(into_form(fields)?),
            Some(EncodedBody::Json(value)) => builder.json(&value),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            error!(error = ?e, url = %request.url, "Transport request failed");
            TransmitError::Transport(e.to_string())
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(error = ?e, url = %request.url, "Failed to read transport response body");
            TransmitError::Transport(e.to_string())
        })?;
        if !status.is_success() {
            error!(%status, url = %request.url, "Transport returned non-success status");
            return Err(TransmitError::Transport(format!("HTTP {status}: {text}")));
        }
        debug!(%status, url = %request.url, "Transport request succeeded");
        // A JSON string or object parses structurally; anything else is a
        // bare locator in the response body.
        Ok(serde_json::from_str(&text).unwrap_or(TransportResponse::Locator(text)))
    }
}

fn into_form(fields: Vec<MultipartField>) -> Result<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for field in fields {
        form = match field.value {
            FieldValue::Text(text) => form.text(field.name, text),
            FieldValue::Bytes { data, media_type } => {
                let part = reqwest::multipart::Part::bytes(data)
                    .mime_str(media_type.as_ref())
                    .map_err(|e| {
                        TransmitError::Transport(format!("invalid multipart media type: {e}"))
                    })?;
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}
