use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed downloading {url}: {status}\n{body}")]
    RemoteFetch {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to create collection {collection}: {status}\n{body}")]
    CollectionCreation {
        collection: String,
        status: u16,
        body: String,
    },

    #[error("failed to parse {input}: {reason}")]
    Parse { input: String, reason: String },

    #[error("invalid record field `{field}`: {reason}")]
    InvalidRecord { field: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(String),

    #[error("invalid endpoint url {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
