//! Upload strategy: merges caller options with defaults, deduplicates
//! through the cache, encodes and submits through the transport, and polls
//! for completion when the transport only acknowledges receipt.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tracing::{debug, info};

use crate::cache::{UploadCache, UploadOperation};
use crate::codec;
use crate::error::{Result, TransmitError};
use crate::poller::{self, PollPolicy, PollStatus};
use crate::request::{UploadDefaults, UploadOptions, UploadRequest};
use crate::transport::{Transport, TransportRequest};

/// Contract for uploading one file and returning its final resource locator.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FileUploadStrategy: Send + Sync {
    async fn upload_file(&self, options: UploadOptions) -> Result<String>;
}

/// Default strategy.
///
/// `contentType == FormData` submits a multipart form; unset or `Json`
/// submits a base64 JSON body. Identical concurrent uploads share one
/// network submission through the [`UploadCache`].
pub struct DefaultFileUploadStrategy<T: Transport> {
    transport: Arc<T>,
    defaults: UploadDefaults,
    policy: PollPolicy,
    cache: UploadCache,
}

impl<T: Transport> DefaultFileUploadStrategy<T> {
    /// Defaults are injected explicitly; there is no global configuration
    /// registry behind this constructor.
    pub fn new(transport: Arc<T>, defaults: UploadDefaults) -> Self {
        Self {
            transport,
            defaults,
            policy: PollPolicy::default(),
            cache: UploadCache::new(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cache(mut self, cache: UploadCache) -> Self {
        self.cache = cache;
        self
    }

    /// The cache owning this strategy's operations, for invalidation and
    /// shutdown.
    pub fn cache(&self) -> &UploadCache {
        &self.cache
    }

    /// Drive one registered operation: encode, submit, and poll if the
    /// transport only acknowledged receipt.
    async fn submit(
        transport: &T,
        policy: PollPolicy,
        operation: Arc<UploadOperation>,
        request: UploadRequest,
    ) -> Result<String> {
        let body = codec::encode(&request).await?;
        operation.mark_submitted();
        let response = transport
            .fetch(TransportRequest::post(
                request.url(),
                request.content_type(),
                body,
            ))
            .await?;

        if let Some(locator) = response.resource_url() {
            info!(
                operation = %operation.id(),
                locator = %locator,
                "Upload completed on submission"
            );
            return Ok(locator.to_string());
        }

        let status_url = response
            .status_url()
            .ok_or_else(|| {
                TransmitError::Transport(
                    "acknowledgement carries neither resource locator nor status URL".into(),
                )
            })?
            .to_string();
        info!(
            operation = %operation.id(),
            status_url = %status_url,
            "Upload acknowledged, awaiting completion"
        );

        let check = move || {
            let status_url = status_url.clone();
            async move {
                let response = transport.fetch(TransportRequest::get(status_url)).await?;
                Ok(match response.resource_url() {
                    Some(locator) => PollStatus::Complete(locator.to_string()),
                    None => PollStatus::Pending,
                })
            }
        };
        poller::poll(&operation, &policy, check).await
    }
}

#[async_trait]
impl<T: Transport + 'static> FileUploadStrategy for DefaultFileUploadStrategy<T> {
    async fn upload_file(&self, options: UploadOptions) -> Result<String> {
        let request = UploadRequest::from_options(options, &self.defaults)?;
        let key = request.key();
        debug!(
            url = %request.url(),
            content_type = %request.content_type(),
            "Resolved upload request"
        );
        let transport = self.transport.clone();
        let policy = self.policy;
        self.cache
            .get_or_create(key, move |operation| async move {
                Self::submit(transport.as_ref(), policy, operation, request).await
            })
            .await
    }
}
