use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tempfile::NamedTempFile;

use file_transmit::codec::{self, EncodedBody, FieldValue};
use file_transmit::error::TransmitError;
use file_transmit::media::MediaType;
use file_transmit::request::{
    FileBlob, UploadDefaults, UploadOptions, UploadPayload, UploadRequest,
};

fn defaults() -> UploadDefaults {
    UploadDefaults::new("https://api.example.com/files/upload")
}

fn png_blob(bytes: &[u8]) -> UploadPayload {
    UploadPayload::Blob(FileBlob::from_bytes(
        "image/png".parse().expect("valid mime"),
        bytes.to_vec(),
    ))
}

#[tokio::test]
async fn form_encoding_carries_payload_field_and_ext_name() {
    let options = UploadOptions::new(png_blob(b"\x89PNG fake bytes"))
        .with_content_type(MediaType::FormData)
        .with_extra_field("album", "holiday");
    let request = UploadRequest::from_options(options, &defaults()).expect("valid request");

    let body = codec::encode(&request).await.expect("encoding succeeds");

    let fields = match body {
        EncodedBody::Multipart(fields) => fields,
        other => panic!("expected multipart body, got {other:?}"),
    };
    assert_eq!(fields.len(), 3);

    assert_eq!(fields[0].name, "file");
    match &fields[0].value {
        FieldValue::Bytes { data, media_type } => {
            assert_eq!(data, b"\x89PNG fake bytes");
            assert_eq!(media_type.essence_str(), "image/png");
        }
        other => panic!("expected bytes part, got {other:?}"),
    }

    assert_eq!(fields[1].name, "extName");
    assert_eq!(fields[1].value, FieldValue::Text("png".to_string()));

    assert_eq!(fields[2].name, "album");
    assert_eq!(fields[2].value, FieldValue::Text("holiday".to_string()));
}

#[tokio::test]
async fn json_encoding_base64_round_trips() {
    let original = b"binary payload \x00\x01\x02";
    let options = UploadOptions::new(png_blob(original)).with_field_name("avatar");
    let request = UploadRequest::from_options(options, &defaults()).expect("valid request");

    let body = codec::encode(&request).await.expect("encoding succeeds");

    let object = match body {
        EncodedBody::Json(serde_json::Value::Object(object)) => object,
        other => panic!("expected JSON object body, got {other:?}"),
    };
    assert_eq!(
        object.get("extName").and_then(|v| v.as_str()),
        Some("png"),
        "extName must be the MIME subtype"
    );
    let encoded = object
        .get("avatar")
        .and_then(|v| v.as_str())
        .expect("payload under caller field name");
    assert_eq!(BASE64.decode(encoded).expect("valid base64"), original);
}

#[tokio::test]
async fn serializable_payload_passes_through_unchanged() {
    let values = serde_json::json!({ "name": "report.txt", "content": "plain" });
    let options = UploadOptions::new(UploadPayload::Values(values.clone()))
        .with_content_type(MediaType::FormData);
    let request = UploadRequest::from_options(options, &defaults()).expect("valid request");

    let body = codec::encode(&request).await.expect("encoding succeeds");

    assert_eq!(body, EncodedBody::Json(values));
}

#[tokio::test]
async fn unrecognised_content_type_is_an_error_not_a_default() {
    let options = UploadOptions::new(png_blob(b"bytes")).with_content_type(MediaType::Text);
    let request = UploadRequest::from_options(options, &defaults()).expect("valid request");

    let err = codec::encode(&request).await.expect_err("must not encode");

    assert!(
        matches!(err, TransmitError::UnsupportedContentType(_)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn file_backed_blob_is_read_asynchronously() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(b"file-backed payload").expect("write");

    let payload = UploadPayload::Blob(FileBlob::from_path(
        "text/plain".parse().expect("valid mime"),
        file.path(),
    ));
    let request = UploadRequest::from_options(UploadOptions::new(payload), &defaults())
        .expect("valid request");

    let body = codec::encode(&request).await.expect("encoding succeeds");

    let object = match body {
        EncodedBody::Json(serde_json::Value::Object(object)) => object,
        other => panic!("expected JSON object body, got {other:?}"),
    };
    let encoded = object.get("file").and_then(|v| v.as_str()).expect("file field");
    assert_eq!(
        BASE64.decode(encoded).expect("valid base64"),
        b"file-backed payload"
    );
}

#[tokio::test]
async fn unreadable_blob_handle_is_an_environment_error() {
    let payload = UploadPayload::Blob(FileBlob::from_path(
        "image/png".parse().expect("valid mime"),
        "/nonexistent/blob/handle.png",
    ));
    let request = UploadRequest::from_options(UploadOptions::new(payload), &defaults())
        .expect("valid request");

    let err = codec::encode(&request).await.expect_err("must not encode");

    assert!(matches!(err, TransmitError::Environment(_)), "got {err:?}");
}
