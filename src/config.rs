use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::media::MediaType;
use crate::poller::PollPolicy;
use crate::request::UploadDefaults;

/// Application-level configuration shape the upload defaults derive from.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// `http` or `https`.
    pub http_protocol: String,
    /// API domain the default upload URL is composed against.
    pub api_domain: String,
    /// Static resource domain; falls back to the API domain when absent.
    #[serde(default)]
    pub resource_domain: Option<String>,
    /// Explicit upload endpoint; overrides the composed default.
    #[serde(default)]
    pub upload_file_url: Option<String>,
}

impl AppConfig {
    /// The upload target URL: the explicit endpoint when configured,
    /// otherwise composed from protocol and API domain.
    pub fn upload_url(&self) -> String {
        self.upload_file_url
            .clone()
            .unwrap_or_else(|| format!("{}://{}/files/upload", self.http_protocol, self.api_domain))
    }

    pub fn trace_loaded(&self) {
        info!(
            http_protocol = %self.http_protocol,
            api_domain = %self.api_domain,
            upload_url = %self.upload_url(),
            "Loaded AppConfig"
        );
        debug!(?self, "AppConfig loaded (full debug)");
    }
}

/// Tuning for the upload strategy itself.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_field_name")]
    pub field_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: MediaType,
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
    /// Grace window in seconds before a completed upload is evicted from the
    /// cache; absent means completed entries live for the process lifetime.
    #[serde(default)]
    pub completed_ttl_secs: Option<u64>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            field_name: default_field_name(),
            content_type: default_content_type(),
            poll_interval_millis: default_poll_interval_millis(),
            poll_max_attempts: default_poll_max_attempts(),
            completed_ttl_secs: None,
        }
    }
}

fn default_field_name() -> String {
    "file".to_string()
}

fn default_content_type() -> MediaType {
    MediaType::Json
}

fn default_poll_interval_millis() -> u64 {
    1_000
}

fn default_poll_max_attempts() -> u32 {
    10
}

/// Full configuration for the transmission subsystem.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransmitConfig {
    pub app: AppConfig,
    #[serde(default)]
    pub upload: UploadSettings,
}

impl TransmitConfig {
    pub fn defaults(&self) -> UploadDefaults {
        UploadDefaults {
            url: self.app.upload_url(),
            content_type: self.upload.content_type,
            field_name: self.upload.field_name.clone(),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.upload.poll_interval_millis),
            self.upload.poll_max_attempts,
        )
    }

    pub fn completed_ttl(&self) -> Option<Duration> {
        self.upload.completed_ttl_secs.map(Duration::from_secs)
    }

    pub fn trace_loaded(&self) {
        self.app.trace_loaded();
        info!(
            field_name = %self.upload.field_name,
            content_type = %self.upload.content_type,
            poll_interval_millis = self.upload.poll_interval_millis,
            poll_max_attempts = self.upload.poll_max_attempts,
            "Loaded upload settings"
        );
    }
}
