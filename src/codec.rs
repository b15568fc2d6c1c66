//! Codec adapter: converts a merged [`UploadRequest`] into one of two wire
//! representations. `multipart/form-data` carries the raw payload as a form
//! part; the JSON default carries it as a base64 string. Payloads that are
//! already serializable pass through unchanged.
//!
//! Encoding a file-backed blob reads the handle asynchronously; an
//! unreadable handle fails with [`TransmitError::Environment`] before any
//! network call is attempted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use mime::Mime;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TransmitError};
use crate::media::MediaType;
use crate::request::{BlobSource, FileBlob, UploadPayload, UploadRequest};

/// Form field name carrying the payload's derived extension name.
const EXT_NAME_FIELD: &str = "extName";

/// A wire-ready request body, independent of any HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedBody {
    Multipart(Vec<MultipartField>),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultipartField {
    pub name: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bytes { data: Vec<u8>, media_type: Mime },
}

/// Encode the request for the wire.
pub async fn encode(request: &UploadRequest) -> Result<EncodedBody> {
    match request.payload() {
        UploadPayload::Values(value) => {
            debug!(url = %request.url(), "Payload already serializable, passing through");
            Ok(EncodedBody::Json(value.clone()))
        }
        UploadPayload::Blob(blob) => match request.content_type() {
            MediaType::FormData => encode_form(request, blob).await,
            MediaType::Json => encode_json(request, blob).await,
            other => Err(TransmitError::UnsupportedContentType(
                other.header_value().to_string(),
            )),
        },
    }
}

async fn encode_form(request: &UploadRequest, blob: &FileBlob) -> Result<EncodedBody> {
    let data = read_blob(blob).await?;
    debug!(
        field_name = request.field_name(),
        ext_name = blob.ext_name(),
        bytes = data.len(),
        "Encoded payload as multipart form"
    );
    let mut fields = vec![
        MultipartField {
            name: request.field_name().to_string(),
            value: FieldValue::Bytes {
                data,
                media_type: blob.media_type.clone(),
            },
        },
        MultipartField {
            name: EXT_NAME_FIELD.to_string(),
            value: FieldValue::Text(blob.ext_name().to_string()),
        },
    ];
    for (name, value) in request.extra_fields() {
        fields.push(MultipartField {
            name: name.clone(),
            value: FieldValue::Text(value.clone()),
        });
    }
    Ok(EncodedBody::Multipart(fields))
}

async fn encode_json(request: &UploadRequest, blob: &FileBlob) -> Result<EncodedBody> {
    let data = read_blob(blob).await?;
    let encoded = BASE64.encode(&data);
    debug!(
        field_name = request.field_name(),
        ext_name = blob.ext_name(),
        bytes = data.len(),
        "Encoded payload as base64 JSON"
    );
    let mut object = serde_json::Map::new();
    object.insert(request.field_name().to_string(), Value::String(encoded));
    object.insert(
        EXT_NAME_FIELD.to_string(),
        Value::String(blob.ext_name().to_string()),
    );
    for (name, value) in request.extra_fields() {
        object.insert(name.clone(), Value::String(value.clone()));
    }
    Ok(EncodedBody::Json(Value::Object(object)))
}

/// Read the blob's bytes. File-backed handles require a host with
/// filesystem capability; failure to read is an environment error, not a
/// transport one.
async fn read_blob(blob: &FileBlob) -> Result<Vec<u8>> {
    match &blob.source {
        BlobSource::Memory(bytes) => Ok(bytes.clone()),
        BlobSource::File(path) => tokio::fs::read(path).await.map_err(|e| {
            TransmitError::Environment(format!("cannot read blob handle {}: {e}", path.display()))
        }),
    }
}
