#![doc = "file-transmit: client-side file transmission subsystem."]

//! Accepts a pending file-upload request, decides how to encode it for the
//! wire, deduplicates concurrent identical uploads, submits the encoded
//! payload through a pluggable HTTP transport and, when the transport only
//! acknowledges receipt, polls for completion up to a bounded number of
//! attempts at a fixed interval.
//!
//! # Usage
//! Construct a [`strategy::DefaultFileUploadStrategy`] with a
//! [`transport::Transport`] implementation and explicit
//! [`request::UploadDefaults`], then call
//! [`strategy::FileUploadStrategy::upload_file`] with per-call
//! [`request::UploadOptions`]. The returned string is the final resource
//! locator of the uploaded file.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod load_config;
pub mod media;
pub mod poller;
pub mod request;
pub mod strategy;
pub mod transport;

pub use error::{Result, TransmitError};
pub use strategy::{DefaultFileUploadStrategy, FileUploadStrategy};
