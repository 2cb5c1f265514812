//! The request/response seam to the Tika server.
//!
//! ```text
//! DocumentParser ──▶ BackendHealth ──▶ TikaService::probe
//!        │                                 (GET /tika)
//!        └──────────▶ TikaService::put_metadata / put_content
//!                          (PUT /meta, PUT /tika)
//! ```
//!
//! 1. [`client`]  : the reqwest implementation of [`TikaService`]
//! 2. [`health`]  : readiness state machine and capability introspection
//! 3. [`launcher`]: best-effort `docker compose` start of the container
//!
//! Everything above this module talks to [`TikaService`] only, so tests can
//! swap the network for an in-memory double.

pub mod client;
pub mod health;
pub mod launcher;

use crate::config::OcrStrategy;
use crate::error::TransportError;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::future::Future;

pub use client::TikaClient;
pub use health::{BackendHealth, BackendState, ServiceCapabilities};
pub use launcher::ComposeLauncher;

/// A buffered response from the Tika server.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ServiceResponse {
    /// A `200 OK` response with no headers.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    pub fn with_status(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Operations the parser needs from a Tika server.
pub trait TikaService: Send + Sync {
    /// `GET /tika`: the cheap readiness probe.
    fn probe(&self) -> impl Future<Output = Result<StatusCode, TransportError>> + Send;

    /// `GET /version`.
    fn version(&self) -> impl Future<Output = Result<ServiceResponse, TransportError>> + Send;

    /// `GET /parsers/details` as JSON.
    fn parser_details(&self)
        -> impl Future<Output = Result<ServiceResponse, TransportError>> + Send;

    /// `PUT /meta` with the raw document, JSON accepted.
    fn put_metadata(
        &self,
        document: &[u8],
    ) -> impl Future<Output = Result<ServiceResponse, TransportError>> + Send;

    /// `PUT /tika` with the raw document, HTML accepted, OCR strategy hinted.
    fn put_content(
        &self,
        document: &[u8],
        ocr: OcrStrategy,
    ) -> impl Future<Output = Result<ServiceResponse, TransportError>> + Send;
}
