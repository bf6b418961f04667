//! `vbot` command-line client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vbot_client::{
    failure_message, ApiClient, FormSelection, LastUrlStore, PollConfig, PollOutcome, Submitter,
    TerminalRenderer,
};
use vbot_models::{JobId, OutputFormat, Quality, StatusPayload};

#[derive(Parser, Debug)]
#[command(name = "vbot", version, about = "Convert online videos through a vbot server")]
struct Cli {
    /// Server root URL
    #[arg(long, env = "VBOT_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Delay between status requests in milliseconds
    #[arg(long, env = "VBOT_POLL_INTERVAL_MS", default_value_t = 1500)]
    poll_interval_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a URL and follow the job until it finishes
    Convert {
        /// Source URL; defaults to the last submitted one
        url: Option<String>,

        #[arg(short, long, default_value = "mp4")]
        format: OutputFormat,

        #[arg(short, long, default_value = "720p")]
        quality: Quality,

        /// Save the finished file here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Remove the file from the server after saving it
        #[arg(long, requires = "output")]
        delete_after: bool,
    },
    /// Print the current status of a job
    Status { job_id: String },
    /// Delete a finished job's file from the server
    Delete { job_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.api_url).context("invalid --api-url")?;

    match cli.command {
        Command::Convert {
            url,
            format,
            quality,
            output,
            delete_after,
        } => {
            let store = LastUrlStore::from_env();
            let url = match url {
                Some(url) => url,
                None => store
                    .load()
                    .await
                    .context("no URL given and no previous URL saved")?,
            };

            let config = PollConfig {
                poll_interval: Duration::from_millis(cli.poll_interval_ms.max(1)),
            };
            let mut submitter = Submitter::new(client.clone(), Arc::new(TerminalRenderer), config)
                .with_last_url_store(store);
            if let Ok(domains) = std::env::var("ALLOWED_DOMAINS") {
                let domains: Vec<String> = domains
                    .split(',')
                    .map(|d| d.trim().to_lowercase())
                    .filter(|d| !d.is_empty())
                    .collect();
                if !domains.is_empty() {
                    submitter = submitter.with_allowed_domains(domains);
                }
            }

            let submission = submitter.submit(&url, FormSelection::new(format, quality)).await?;
            let job_id = submission.job_id.clone();
            let marker = submission.marker.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    marker.cancel();
                }
            });

            match submission.outcome().await {
                PollOutcome::Done { .. } => {
                    if let Some(dest) = output {
                        let bytes = client.download_file(&job_id, &dest).await?;
                        println!("Saved {} ({} bytes)", dest.display(), bytes);
                        if delete_after {
                            client.delete_file(&job_id).await?;
                        }
                    }
                }
                PollOutcome::Failed { .. } => bail!("conversion failed"),
                PollOutcome::TransportFailed => bail!("lost contact with the server"),
                PollOutcome::Cancelled => println!("Cancelled"),
            }
        }
        Command::Status { job_id } => {
            let payload = client.status(&JobId::from(job_id)).await?;
            match &payload {
                StatusPayload::Done { filename, .. } => {
                    println!("done {}% {}", payload.progress(), filename)
                }
                StatusPayload::Error { error, reason, .. } => {
                    println!("error: {}", failure_message(error, reason.as_deref()))
                }
                _ => println!("{} {}% {}", payload.status(), payload.progress(), payload.message()),
            }
        }
        Command::Delete { job_id } => {
            client.delete_file(&JobId::from(job_id)).await?;
            println!("Deleted");
        }
    }

    Ok(())
}
