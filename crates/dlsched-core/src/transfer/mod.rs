//! Byte transfer backends used by download tasks.
//!
//! A backend only moves bytes: it probes the remote resource and streams the
//! body into a sink. Status bookkeeping and retries stay in the task.

mod classify;
mod libcurl;
mod parse;

use std::collections::HashMap;
use std::io;

pub use classify::classify_curl_error;
pub use libcurl::CurlTransfer;

/// Target of a probe or fetch.
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
    pub url: &'a str,
    pub headers: &'a HashMap<String, String>,
}

/// Metadata learned from probing the remote resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// `Content-Type` value if present.
    pub content_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The sink asked to stop (pause or remove).
    #[error("transfer aborted")]
    Aborted,
    /// Timeout, connection, or name resolution failure; worth retrying.
    #[error("transient failure: {0}")]
    Retryable(String),
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("storage: {0}")]
    Storage(#[source] io::Error),
    #[error("{0}")]
    Protocol(String),
}

/// Receives body bytes during `Transfer::fetch`.
pub trait TransferSink {
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Polled during the transfer; returning true aborts it with `TransferError::Aborted`.
    fn should_abort(&self) -> bool;
}

pub trait Transfer: Send + Sync {
    fn probe(&self, request: &TransferRequest<'_>) -> Result<ProbeResult, TransferError>;

    /// Streams the body starting at byte `resume_from` into `sink`.
    /// Returns the final HTTP status code.
    fn fetch(
        &self,
        request: &TransferRequest<'_>,
        resume_from: u64,
        sink: &mut dyn TransferSink,
    ) -> Result<u32, TransferError>;
}
