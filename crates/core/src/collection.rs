use crate::models::CollectionStatus;
use crate::traits::Transport;
use crate::transport::RequestBody;
use crate::IngestError;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;

pub fn collection_schema() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": {"type": "keyword"},
                "name": {"type": "text", "fields": {"keyword": {"type": "keyword"}}},
                "description": {"type": "text"},
                "snippet": {"type": "text"},
                "muscles": {"type": "keyword"},
                "equipment": {"type": "keyword"},
                "difficulty": {"type": "keyword"},
                "tags": {"type": "keyword"},
                "source": {"type": "keyword"}
            }
        }
    })
}

pub struct CollectionManager<'a, T: Transport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> CollectionManager<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn ensure_collection(&self, name: &str) -> Result<CollectionStatus, IngestError> {
        if name.trim().is_empty() {
            return Err(IngestError::InvalidArgument(
                "collection name must not be empty".to_string(),
            ));
        }

        let path = format!("/{name}");
        let probe = self.transport.request(&path, Method::GET, None).await?;
        if probe.status == 200 {
            info!(collection = name, "collection already exists");
            return Ok(CollectionStatus::AlreadyExists);
        }

        info!(collection = name, probe_status = probe.status, "creating collection with default mapping");
        let body = RequestBody::json(&collection_schema())?;
        let response = self.transport.request(&path, Method::PUT, Some(body)).await?;

        if response.is_error() {
            return Err(IngestError::CollectionCreation {
                collection: name.to_string(),
                status: response.status,
                body: response.body,
            });
        }

        Ok(CollectionStatus::Created)
    }
}
