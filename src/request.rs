//! Upload request model: caller options, strategy defaults, the merged
//! immutable request and the identity key used for deduplication.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mime::Mime;
use sha2::{Digest, Sha256};

use crate::error::{Result, TransmitError};
use crate::media::MediaType;

/// Where the bytes of a binary payload live.
#[derive(Debug, Clone, PartialEq)]
pub enum BlobSource {
    /// Bytes already held in memory.
    Memory(Vec<u8>),
    /// A blob-like handle that must be read asynchronously by the host.
    File(PathBuf),
}

/// A binary payload with its declared media type.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlob {
    pub media_type: Mime,
    pub source: BlobSource,
}

impl FileBlob {
    pub fn from_bytes(media_type: Mime, bytes: Vec<u8>) -> Self {
        Self {
            media_type,
            source: BlobSource::Memory(bytes),
        }
    }

    pub fn from_path(media_type: Mime, path: impl Into<PathBuf>) -> Self {
        Self {
            media_type,
            source: BlobSource::File(path.into()),
        }
    }

    /// Extension name derived from the media type: the subtype after the `/`.
    pub fn ext_name(&self) -> &str {
        self.media_type.subtype().as_str()
    }
}

/// What the caller hands over for transmission.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadPayload {
    /// Binary payload requiring wire encoding.
    Blob(FileBlob),
    /// Already-serializable data, forwarded unchanged.
    Values(serde_json::Value),
}

impl UploadPayload {
    /// Stable identity digest used for deduplication. Deriving the key never
    /// reads the blob: file-backed payloads hash their path, not their bytes.
    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            UploadPayload::Blob(blob) => match &blob.source {
                BlobSource::Memory(bytes) => hasher.update(bytes),
                BlobSource::File(path) => hasher.update(path.to_string_lossy().as_bytes()),
            },
            UploadPayload::Values(value) => hasher.update(value.to_string().as_bytes()),
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Caller-supplied partial request. Every unset field falls back to the
/// strategy-level [`UploadDefaults`]; a set field always wins.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub payload: Option<UploadPayload>,
    pub url: Option<String>,
    pub content_type: Option<MediaType>,
    pub field_name: Option<String>,
    pub extra_fields: BTreeMap<String, String>,
}

impl UploadOptions {
    pub fn new(payload: UploadPayload) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_content_type(mut self, content_type: MediaType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn with_extra_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.extra_fields.insert(name.into(), value.into());
        self
    }
}

/// Strategy-level defaults, injected at construction time.
#[derive(Debug, Clone)]
pub struct UploadDefaults {
    pub url: String,
    pub content_type: MediaType,
    pub field_name: String,
}

impl UploadDefaults {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: MediaType::Json,
            field_name: "file".to_string(),
        }
    }
}

/// The merged, immutable upload request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    payload: UploadPayload,
    url: String,
    content_type: MediaType,
    field_name: String,
    extra_fields: BTreeMap<String, String>,
}

impl UploadRequest {
    /// Merge caller options with strategy defaults. Caller-set fields win;
    /// unset fields inherit the defaults.
    pub fn from_options(options: UploadOptions, defaults: &UploadDefaults) -> Result<Self> {
        let payload = options
            .payload
            .ok_or_else(|| TransmitError::InvalidRequest("upload payload is required".into()))?;
        Ok(Self {
            payload,
            url: options.url.unwrap_or_else(|| defaults.url.clone()),
            content_type: options.content_type.unwrap_or(defaults.content_type),
            field_name: options
                .field_name
                .unwrap_or_else(|| defaults.field_name.clone()),
            extra_fields: options.extra_fields,
        })
    }

    pub fn payload(&self) -> &UploadPayload {
        &self.payload
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_type(&self) -> MediaType {
        self.content_type
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn extra_fields(&self) -> &BTreeMap<String, String> {
        &self.extra_fields
    }

    /// Identity under which concurrent uploads of the same logical file to
    /// the same destination are considered "the same upload".
    pub fn key(&self) -> UploadKey {
        UploadKey {
            payload_digest: self.payload.digest(),
            url: self.url.clone(),
            content_type: self.content_type,
        }
    }
}

/// Derived identity for deduplication: (payload digest, target URL, content type).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadKey {
    pub payload_digest: String,
    pub url: String,
    pub content_type: MediaType,
}
