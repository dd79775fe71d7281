use crate::bulk::BulkWriter;
use crate::models::{FlushReport, IngestionReport};
use crate::normalize::{Clock, Normalizer};
use crate::reader::{InputReader, InputSource};
use crate::traits::Transport;
use crate::error::Result;
use futures_util::{pin_mut, stream::StreamExt};
use tracing::{info, warn};

pub async fn ingest<'a, R, W, C>(
    reader: InputReader<'a, R>,
    normalizer: &Normalizer<C>,
    writer: BulkWriter<'_, W>,
    sources: &'a [InputSource],
) -> Result<IngestionReport>
where
    R: Transport + ?Sized + 'a,
    W: Transport + ?Sized,
    C: Clock,
{
    ingest_with(reader, normalizer, writer, sources, |_| {}).await
}

pub async fn ingest_with<'a, R, W, C, F>(
    reader: InputReader<'a, R>,
    normalizer: &Normalizer<C>,
    mut writer: BulkWriter<'_, W>,
    sources: &'a [InputSource],
    mut on_flush: F,
) -> Result<IngestionReport>
where
    R: Transport + ?Sized + 'a,
    W: Transport + ?Sized,
    C: Clock,
    F: FnMut(&FlushReport),
{
    let records = reader.into_stream(sources);
    pin_mut!(records);

    let mut flushes = Vec::new();
    while let Some(record) = records.next().await {
        let document = normalizer.normalize(&record?)?;
        if let Some(report) = writer.push(document).await? {
            on_flush(&report);
            flushes.push(report);
        }
    }

    let documents = writer.total_documents();
    if let Some(report) = writer.finish().await? {
        on_flush(&report);
        flushes.push(report);
    }

    let report = IngestionReport { documents, flushes };
    let failed = report.failed_flushes().count();
    if failed > 0 {
        warn!(
            documents = report.documents,
            failed_batches = failed,
            "ingestion finished with rejected batches"
        );
    } else {
        info!(
            documents = report.documents,
            batches = report.flushes.len(),
            "ingestion finished"
        );
    }

    Ok(report)
}
