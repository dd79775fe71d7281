use crate::config::BackendConfig;
use crate::traits::Transport;
use crate::IngestError;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: &'static str,
    pub payload: String,
}

impl RequestBody {
    pub fn json(value: &Value) -> Result<Self, IngestError> {
        Ok(Self {
            content_type: JSON_CONTENT_TYPE,
            payload: serde_json::to_string(value)?,
        })
    }

    pub fn ndjson(payload: String) -> Self {
        Self {
            content_type: NDJSON_CONTENT_TYPE,
            payload,
        }
    }
}

pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    authorization: String,
}

impl HttpTransport {
    pub fn new(config: BackendConfig) -> Result<Self, IngestError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            authorization: config.credentials.basic_auth_header(),
            endpoint: config.endpoint,
        })
    }

    pub fn resolve(&self, target: &str) -> Result<Url, IngestError> {
        resolve_target(&self.endpoint, target)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        target: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<TransportResponse, IngestError> {
        let url = self.resolve(target)?;
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(AUTHORIZATION, &self.authorization);

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, body.content_type)
                .body(body.payload);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(%method, %url, status, "backend request completed");

        Ok(TransportResponse { status, body })
    }
}

pub fn resolve_target(endpoint: &Url, target: &str) -> Result<Url, IngestError> {
    if let Ok(url) = Url::parse(target) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(url);
        }
    }

    let base = endpoint.as_str().trim_end_matches('/');
    let path = target.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

pub async fn check_connection<T>(transport: &T) -> Result<TransportResponse, IngestError>
where
    T: Transport + ?Sized,
{
    transport
        .request("/_cluster/health?pretty", Method::GET, None)
        .await
}
