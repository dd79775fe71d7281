pub mod bulk;
pub mod collection;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod reader;
pub mod traits;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use bulk::{encode_batch, BulkWriter};
pub use collection::{collection_schema, CollectionManager};
pub use config::{BackendConfig, Credentials, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use error::{ConfigError, IngestError};
pub use ingest::{ingest, ingest_with};
pub use models::{
    BulkOptions, CanonicalDocument, CollectionStatus, FlushReport, IngestionReport, InputFormat,
    RawRecord, DEFAULT_BATCH_SIZE,
};
pub use normalize::{split_list, AliasTable, CanonicalField, Clock, Normalizer, SystemClock};
pub use reader::{detect_format, InputReader, InputSource, Records};
pub use traits::Transport;
pub use transport::{check_connection, HttpTransport, RequestBody, TransportResponse};
