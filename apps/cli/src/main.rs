//! `promethium-upload`: uploads seismic datasets to a Promethium server in
//! chunks and browses the registered datasets.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use promethium_protocol::{DEFAULT_CHUNK_SIZE, DatasetRecord};
use promethium_upload::{HttpClient, UploadEvent, UploadOrchestrator, UploadRequest};
use tracing_subscriber::EnvFilter;

use config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "promethium-upload", version, about)]
struct Cli {
    /// API root, e.g. http://localhost:8000/api/v1.
    #[arg(long, global = true, env = "PROMETHIUM_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token for the API.
    #[arg(long, global = true, env = "PROMETHIUM_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path to a JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a file as a new dataset.
    Upload {
        file: PathBuf,

        /// Dataset name. Defaults to the file name.
        #[arg(long)]
        name: Option<String>,

        /// Declared format: SEGY, SAC or MINISEED (case-insensitive).
        #[arg(long)]
        format: String,

        /// Preferred chunk size in bytes, at most 5 MiB.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=DEFAULT_CHUNK_SIZE))]
        chunk_size: Option<u64>,

        /// List datasets after a successful upload.
        #[arg(long)]
        list: bool,
    },
    /// List registered datasets.
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Show one dataset as JSON.
    Show { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if cli.token.is_some() {
        config.token = cli.token;
    }

    let client = build_client(&config)?;

    match cli.command {
        Command::Upload {
            file,
            name,
            format,
            chunk_size,
            list,
        } => {
            if let Some(chunk_size) = chunk_size {
                config.upload.chunk_size = chunk_size;
            }
            let dataset = upload(client.clone(), &config, file, name, &format).await?;
            println!("{}", serde_json::to_string_pretty(&dataset)?);
            if list {
                print_datasets(&client.list_datasets(0, 100).await?);
            }
            Ok(())
        }
        Command::List { skip, limit } => {
            let datasets = client.list_datasets(skip, limit).await?;
            print_datasets(&datasets);
            Ok(())
        }
        Command::Show { id } => match client.get_dataset(id).await? {
            Some(dataset) => {
                println!("{}", serde_json::to_string_pretty(&dataset)?);
                Ok(())
            }
            None => anyhow::bail!("dataset {id} not found"),
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,promethium_upload=debug,promethium_transfer=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(config: &CliConfig) -> anyhow::Result<HttpClient> {
    let mut builder = HttpClient::builder(config.base_url.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs));
    if let Some(token) = &config.token {
        builder = builder.bearer_token(token);
    }
    builder
        .build()
        .with_context(|| format!("invalid API base URL {}", config.base_url))
}

async fn upload(
    client: HttpClient,
    config: &CliConfig,
    file: PathBuf,
    name: Option<String>,
    format: &str,
) -> anyhow::Result<DatasetRecord> {
    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let request = UploadRequest::from_path(&file, name, format)
        .await
        .with_context(|| format!("cannot upload {}", file.display()))?;

    tracing::info!(
        file = %file.display(),
        size = request.total_size(),
        base_url = %client.base_url(),
        "starting upload"
    );

    let orchestrator = UploadOrchestrator::with_config(Arc::new(client), config.upload.clone());
    let mut handle = orchestrator.spawn(request);
    let mut events = handle
        .take_events()
        .context("upload event channel already taken")?;

    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("#>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::Progress {
                percentage,
                acknowledged,
                total_chunks,
            } => {
                bar.set_position(u64::from(percentage));
                bar.set_message(format!("{acknowledged}/{total_chunks} chunks"));
            }
            UploadEvent::Complete { .. } => {
                bar.set_position(100);
                bar.finish_with_message("done");
            }
            UploadEvent::Error { error } => {
                bar.abandon_with_message(format!("failed: {error}"));
            }
        }
    }

    match handle.join().await.context("upload task panicked")? {
        Ok(dataset) => {
            tracing::info!(dataset_id = dataset.id, "dataset registered");
            Ok(dataset)
        }
        Err(e) => {
            let kind = e.kind();
            Err(anyhow::Error::new(e).context(format!("upload failed ({kind:?})")))
        }
    }
}

fn print_datasets(datasets: &[DatasetRecord]) {
    if datasets.is_empty() {
        println!("No datasets.");
        return;
    }
    println!("{:>6}  {:<9}  {:<25}  NAME", "ID", "FORMAT", "UPLOADED");
    for d in datasets {
        println!(
            "{:>6}  {:<9}  {:<25}  {}",
            d.id,
            d.format,
            d.upload_time.format("%Y-%m-%d %H:%M:%S UTC"),
            d.name
        );
    }
}
