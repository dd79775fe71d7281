use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type RawRecord = Map<String, Value>;

pub const DEFAULT_SOURCE: &str = "import";
pub const SNIPPET_MAX_CHARS: usize = 200;
pub const DEFAULT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalDocument {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub muscles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    pub batch_size: usize,
    pub dry_run: bool,
    pub suppress_id: bool,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
            suppress_id: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub batch_documents: usize,
    pub total_documents: usize,
    pub status: u16,
    pub is_final: bool,
}

impl FlushReport {
    pub fn failed(&self) -> bool {
        self.status >= 400
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub documents: usize,
    pub flushes: Vec<FlushReport>,
}

impl IngestionReport {
    pub fn failed_flushes(&self) -> impl Iterator<Item = &FlushReport> {
        self.flushes.iter().filter(|flush| flush.failed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    AlreadyExists,
    Created,
}
