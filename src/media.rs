use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of content-type tags consumed for encoding branching.
///
/// Only [`MediaType::FormData`] and [`MediaType::Json`] have an encoding for
/// binary payloads; requesting any other tag for a blob is an error rather
/// than a silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "multipart/form-data")]
    FormData,
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "text/plain")]
    Text,
    #[serde(rename = "application/octet-stream")]
    OctetStream,
}

impl MediaType {
    /// The value this tag carries on the wire in a `Content-Type` header.
    pub fn header_value(&self) -> &'static str {
        match self {
            MediaType::FormData => "multipart/form-data",
            MediaType::Json => "application/json",
            MediaType::Text => "text/plain",
            MediaType::OctetStream => "application/octet-stream",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value())
    }
}
