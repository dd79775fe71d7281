use chrono::Utc;
use clap::Parser;
use exercise_ingest_core::{
    check_connection, ingest_with, BackendConfig, BulkOptions, BulkWriter, CollectionManager,
    CollectionStatus, HttpTransport, InputReader, InputSource, Normalizer, DEFAULT_BATCH_SIZE,
    DEFAULT_ENDPOINT,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "exercise-ingest", version)]
#[command(about = "Load exercise catalogues (JSON, NDJSON, CSV) into an Elasticsearch index")]
struct Cli {
    /// Index to write to.
    #[arg(long)]
    index: String,

    /// Local file paths or http(s) URLs.
    #[arg(long, num_args = 1..)]
    files: Vec<String>,

    /// Print normalized documents instead of indexing them.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Print cluster health and exit.
    #[arg(long, default_value_t = false)]
    check_connection: bool,

    /// Documents per bulk request.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch: usize,

    /// Let the backend assign document ids.
    #[arg(long, default_value_t = false)]
    no_id: bool,

    /// Per-request timeout in seconds.
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Elasticsearch base URL
    #[arg(long, env = "ELASTICSEARCH_URL", default_value = DEFAULT_ENDPOINT)]
    elasticsearch_url: String,

    /// Elasticsearch username
    #[arg(long, env = "ELASTIC_USERNAME")]
    username: Option<String>,

    /// Elasticsearch password
    #[arg(long, env = "ELASTIC_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl Cli {
    fn backend_config(&self) -> Result<BackendConfig, exercise_ingest_core::ConfigError> {
        Ok(BackendConfig::from_parts(
            &self.elasticsearch_url,
            self.username.clone(),
            self.password.clone(),
        )?
        .with_timeout(Duration::from_secs(self.timeout_secs)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "exercise-ingest boot"
    );

    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.check_connection {
        let transport = HttpTransport::new(cli.backend_config()?)?;
        let response = check_connection(&transport).await?;
        println!("{}", response.body);
        return Ok(if response.status == 200 {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(2)
        });
    }

    if cli.files.is_empty() {
        eprintln!("No input files provided. Use --files file1.json file2.csv or URLs.");
        return Ok(ExitCode::from(1));
    }

    let sources = cli
        .files
        .iter()
        .map(|raw| InputSource::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let options = BulkOptions {
        batch_size: cli.batch,
        dry_run: cli.dry_run,
        suppress_id: cli.no_id,
    };

    // Dry runs never talk to the index; a connection is only kept for remote inputs.
    let transport = match cli.backend_config() {
        Ok(config) => Some(HttpTransport::new(config)?),
        Err(error) if cli.dry_run => {
            debug!(%error, "no backend connection for dry run");
            None
        }
        Err(error) => return Err(error.into()),
    };

    // Invalid writer options must fail before the index is touched.
    let writer = BulkWriter::new(transport.as_ref(), cli.index.as_str(), options)?;

    if !cli.dry_run {
        if let Some(transport) = &transport {
            match CollectionManager::new(transport)
                .ensure_collection(&cli.index)
                .await?
            {
                CollectionStatus::AlreadyExists => println!("Index '{}' already exists", cli.index),
                CollectionStatus::Created => println!("Created index '{}'", cli.index),
            }
        }
    }

    let report = ingest_with(
        InputReader::with_transport(transport.as_ref()),
        &Normalizer::default(),
        writer,
        &sources,
        |flush| {
            let label = if flush.is_final { "Bulk sent final" } else { "Bulk sent" };
            println!(
                "{label}: {} docs ({} in batch), status {}",
                flush.total_documents, flush.batch_documents, flush.status
            );
        },
    )
    .await?;

    let failed = report.failed_flushes().count();
    if failed > 0 {
        warn!(failed_batches = failed, "some bulk requests were rejected; documents in them were not indexed");
    }

    Ok(ExitCode::SUCCESS)
}
