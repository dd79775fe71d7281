use crate::models::{BulkOptions, CanonicalDocument, FlushReport};
use crate::traits::Transport;
use crate::transport::RequestBody;
use crate::IngestError;
use reqwest::Method;
use serde_json::json;
use std::io::{self, Write};
use tracing::{info, warn};

enum Sink<'a, T: Transport + ?Sized> {
    Live { transport: &'a T, collection: String },
    Preview(Box<dyn Write + Send + 'a>),
}

pub struct BulkWriter<'a, T: Transport + ?Sized> {
    sink: Sink<'a, T>,
    options: BulkOptions,
    lines: Vec<String>,
    batch_documents: usize,
    total_documents: usize,
}

impl<'a, T: Transport + ?Sized> BulkWriter<'a, T> {
    pub fn new(
        transport: Option<&'a T>,
        collection: impl Into<String>,
        options: BulkOptions,
    ) -> Result<Self, IngestError> {
        if options.batch_size == 0 {
            return Err(IngestError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        let sink = match (options.dry_run, transport) {
            (true, _) => Sink::Preview(Box::new(io::stdout())),
            (false, Some(transport)) => Sink::Live {
                transport,
                collection: collection.into(),
            },
            (false, None) => {
                return Err(IngestError::InvalidArgument(
                    "bulk writes need a backend connection".to_string(),
                ))
            }
        };

        Ok(Self {
            sink,
            options,
            lines: Vec::new(),
            batch_documents: 0,
            total_documents: 0,
        })
    }

    pub fn with_preview_output(mut self, output: Box<dyn Write + Send + 'a>) -> Self {
        if let Sink::Preview(_) = self.sink {
            self.sink = Sink::Preview(output);
        }
        self
    }

    pub fn total_documents(&self) -> usize {
        self.total_documents
    }

    pub async fn push(
        &mut self,
        document: CanonicalDocument,
    ) -> Result<Option<FlushReport>, IngestError> {
        self.total_documents += 1;

        if let Sink::Preview(output) = &mut self.sink {
            serde_json::to_writer(&mut *output, &document)?;
            output.write_all(b"\n")?;
            return Ok(None);
        }

        let action = if self.options.suppress_id {
            json!({"index": {}})
        } else {
            json!({"index": {"_id": document.id}})
        };
        self.lines.push(serde_json::to_string(&action)?);
        self.lines.push(serde_json::to_string(&document)?);
        self.batch_documents += 1;

        if self.batch_documents >= self.options.batch_size {
            return self.flush(false).await.map(Some);
        }
        Ok(None)
    }

    pub async fn finish(mut self) -> Result<Option<FlushReport>, IngestError> {
        if let Sink::Preview(output) = &mut self.sink {
            output.flush()?;
            return Ok(None);
        }

        if self.lines.is_empty() {
            return Ok(None);
        }
        self.flush(true).await.map(Some)
    }

    async fn flush(&mut self, is_final: bool) -> Result<FlushReport, IngestError> {
        let Sink::Live {
            transport,
            collection,
        } = &self.sink
        else {
            return Err(IngestError::InvalidArgument(
                "dry-run writer cannot flush".to_string(),
            ));
        };

        let payload = encode_batch(&self.lines);
        let path = format!("/{collection}/_bulk");
        let response = transport
            .request(&path, Method::POST, Some(RequestBody::ndjson(payload)))
            .await?;

        let report = FlushReport {
            batch_documents: self.batch_documents,
            total_documents: self.total_documents,
            status: response.status,
            is_final,
        };
        self.lines.clear();
        self.batch_documents = 0;

        if report.failed() {
            warn!(
                collection = %collection,
                batch = report.batch_documents,
                total = report.total_documents,
                status = report.status,
                is_final,
                "bulk request rejected"
            );
        } else {
            info!(
                collection = %collection,
                batch = report.batch_documents,
                total = report.total_documents,
                status = report.status,
                is_final,
                "bulk sent"
            );
        }

        Ok(report)
    }
}

pub fn encode_batch(lines: &[String]) -> String {
    let mut payload = String::with_capacity(lines.iter().map(|line| line.len() + 1).sum());
    for line in lines {
        payload.push_str(line);
        payload.push('\n');
    }
    payload
}
