use crate::transport::{RequestBody, TransportResponse};
use crate::IngestError;
use async_trait::async_trait;
use reqwest::Method;

/// `target` is either an absolute URL, used as given, or a path relative to the
/// configured endpoint. HTTP error statuses are returned as responses; only
/// failures to complete the exchange are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        target: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<TransportResponse, IngestError>;
}
