use crate::models::{InputFormat, RawRecord};
use crate::traits::Transport;
use crate::IngestError;
use async_stream::try_stream;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use futures_core::Stream;
use reqwest::Method;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Local(PathBuf),
    Remote(Url),
}

impl InputSource {
    pub fn parse(raw: &str) -> Result<Self, IngestError> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Ok(Self::Remote(Url::parse(raw)?))
        } else {
            Ok(Self::Local(PathBuf::from(raw)))
        }
    }

    fn path_hint(&self) -> &str {
        match self {
            Self::Local(path) => path.to_str().unwrap_or_default(),
            Self::Remote(url) => url.path(),
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

type Detector = fn(&InputSource, &str) -> Option<InputFormat>;

// First definite verdict wins, CSV otherwise.
const DETECTORS: [Detector; 2] = [detect_by_extension, detect_by_json_content];

pub fn detect_format(source: &InputSource, content: &str) -> InputFormat {
    DETECTORS
        .iter()
        .find_map(|detector| detector(source, content))
        .unwrap_or(InputFormat::Csv)
}

fn detect_by_extension(source: &InputSource, _content: &str) -> Option<InputFormat> {
    let extension = Path::new(source.path_hint())
        .extension()
        .and_then(|ext| ext.to_str())?;

    if extension.eq_ignore_ascii_case("json") {
        Some(InputFormat::Json)
    } else if extension.eq_ignore_ascii_case("csv") {
        Some(InputFormat::Csv)
    } else {
        None
    }
}

fn detect_by_json_content(_source: &InputSource, content: &str) -> Option<InputFormat> {
    if serde_json::from_str::<Value>(content).is_ok() {
        return Some(InputFormat::Json);
    }

    let mut lines = content.lines().filter(|line| !line.trim().is_empty()).peekable();
    lines.peek()?;
    lines
        .all(|line| serde_json::from_str::<Value>(line).is_ok())
        .then_some(InputFormat::Json)
}

pub enum Records {
    Items(std::vec::IntoIter<Value>),
    Lines {
        input: String,
        lines: std::vec::IntoIter<(usize, String)>,
    },
    Csv {
        input: String,
        headers: StringRecord,
        rows: StringRecordsIntoIter<Cursor<Vec<u8>>>,
    },
}

impl Records {
    pub fn parse(input: &str, format: InputFormat, content: String) -> Result<Self, IngestError> {
        match format {
            InputFormat::Json => Ok(json_records(input, content)),
            InputFormat::Csv => csv_records(input, content),
        }
    }
}

impl Iterator for Records {
    type Item = Result<RawRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Items(items) => items.next().map(|item| Ok(into_record(item))),
            Self::Lines { input, lines } => {
                let (number, line) = lines.next()?;
                Some(
                    serde_json::from_str::<Value>(&line)
                        .map(into_record)
                        .map_err(|error| IngestError::Parse {
                            input: format!("{input} line {number}"),
                            reason: error.to_string(),
                        }),
                )
            }
            Self::Csv {
                input,
                headers,
                rows,
            } => {
                let row = rows.next()?;
                Some(csv_row(input, headers, row))
            }
        }
    }
}

fn json_records(input: &str, content: String) -> Records {
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => Records::Items(items.into_iter()),
        Ok(Value::Object(object)) => match object.values().position(Value::is_array) {
            Some(index) => match object.into_iter().nth(index) {
                Some((_, Value::Array(items))) => Records::Items(items.into_iter()),
                _ => Records::Items(Vec::new().into_iter()),
            },
            None => Records::Items(vec![Value::Object(object)].into_iter()),
        },
        Ok(_) => Records::Items(Vec::new().into_iter()),
        Err(_) => {
            let lines = content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(index, line)| (index + 1, line.to_string()))
                .collect::<Vec<_>>();
            Records::Lines {
                input: input.to_string(),
                lines: lines.into_iter(),
            }
        }
    }
}

fn csv_records(input: &str, content: String) -> Result<Records, IngestError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(Cursor::new(content.into_bytes()));
    let headers = reader
        .headers()
        .map_err(|error| IngestError::Parse {
            input: input.to_string(),
            reason: error.to_string(),
        })?
        .clone();

    Ok(Records::Csv {
        input: input.to_string(),
        headers,
        rows: reader.into_records(),
    })
}

fn csv_row(
    input: &str,
    headers: &StringRecord,
    row: csv::Result<StringRecord>,
) -> Result<RawRecord, IngestError> {
    let row = row.map_err(|error| IngestError::Parse {
        input: input.to_string(),
        reason: error.to_string(),
    })?;
    if row.len() > headers.len() {
        let line = row.position().map(|position| position.line()).unwrap_or_default();
        return Err(IngestError::Parse {
            input: format!("{input} line {line}"),
            reason: format!(
                "found record with {} fields, but the header has {}",
                row.len(),
                headers.len()
            ),
        });
    }

    Ok(headers
        .iter()
        .enumerate()
        .map(|(index, key)| {
            let value = row.get(index).unwrap_or_default();
            (key.to_string(), Value::String(value.to_string()))
        })
        .collect())
}

fn into_record(value: Value) -> RawRecord {
    match value {
        Value::Object(record) => record,
        Value::String(text) => single_name(text),
        other => single_name(other.to_string()),
    }
}

fn single_name(text: String) -> RawRecord {
    let mut record = Map::new();
    record.insert("name".to_string(), Value::String(text));
    record
}

pub struct InputReader<'a, T: Transport + ?Sized> {
    transport: Option<&'a T>,
}

impl<'a, T: Transport + ?Sized + 'a> InputReader<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    pub fn local_only() -> Self {
        Self { transport: None }
    }

    pub fn with_transport(transport: Option<&'a T>) -> Self {
        Self { transport }
    }

    pub async fn load(&self, source: &InputSource) -> Result<String, IngestError> {
        match source {
            InputSource::Local(path) => Ok(tokio::fs::read_to_string(path).await?),
            InputSource::Remote(url) => {
                let transport = self.transport.ok_or_else(|| {
                    IngestError::InvalidArgument(format!(
                        "remote source {url} needs a backend connection"
                    ))
                })?;
                let response = transport.request(url.as_str(), Method::GET, None).await?;
                if response.is_error() {
                    return Err(IngestError::RemoteFetch {
                        url: url.to_string(),
                        status: response.status,
                        body: response.body,
                    });
                }
                Ok(response.body)
            }
        }
    }

    pub async fn open(&self, source: &InputSource) -> Result<Records, IngestError> {
        let content = self.load(source).await?;
        let format = detect_format(source, &content);
        info!(source = %source, ?format, "reading input");
        Records::parse(&source.to_string(), format, content)
    }

    pub fn into_stream(
        self,
        sources: &'a [InputSource],
    ) -> impl Stream<Item = Result<RawRecord, IngestError>> + 'a {
        try_stream! {
            for source in sources {
                let records = self.open(source).await?;
                for record in records {
                    yield record?;
                }
            }
        }
    }
}
