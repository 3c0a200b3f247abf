//! kratos - Verified streaming downloader for launcher artifacts
//!
//! This is the command line front end of the download engine in the
//! `kratos-net` crate.

mod cli;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use kratos_config::Config;
use kratos_errors::{Error, UserFacingError};
use kratos_events::{ProgressSink, SessionEvent, SessionReceiver, SinkReceiver};
use kratos_hash::{verify_file, Hash};
use kratos_net::{run_verified_download, DownloadAttempt, NetClient, NetConfig, VerifyOptions};
use kratos_types::DownloadTarget;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if json_mode {
            println!("{}", error_json(&e));
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting kratos v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.command);
    config.validate()?;

    let json = cli.global.json;
    match cli.command {
        Commands::Get {
            url,
            output,
            hash,
            headers,
            ..
        } => {
            let request = GetRequest {
                url,
                output,
                expected_hash: hash,
                headers,
            };
            get_command(&config, request, json).await
        }
        Commands::Hash { file, expect, .. } => {
            hash_command(&config, &file, expect.as_deref(), json).await
        }
    }
}

/// Apply CLI flags on top of file and environment configuration
fn apply_cli_config(config: &mut Config, command: &Commands) {
    let (algorithm, max_attempts) = match command {
        Commands::Get {
            algorithm,
            max_attempts,
            ..
        } => (algorithm, *max_attempts),
        Commands::Hash { algorithm, .. } => (algorithm, None),
    };

    if let Some(algorithm) = algorithm {
        config.verify.algorithm.clone_from(algorithm);
    }
    if let Some(max_attempts) = max_attempts {
        config.verify.max_attempts = max_attempts;
    }
}

struct GetRequest {
    url: String,
    output: PathBuf,
    expected_hash: Option<String>,
    headers: Vec<(String, String)>,
}

async fn get_command(config: &Config, request: GetRequest, json: bool) -> Result<(), CliError> {
    let target = DownloadTarget::new(&request.url, request.output)?;
    let client = NetClient::new(NetConfig::from(&config.network))?;

    let mut sink = ProgressSink::new();
    let mut sink_rx = sink.subscribe();

    let label = target
        .destination()
        .file_name()
        .map_or_else(|| request.url.clone(), |name| name.to_string_lossy().into_owned());
    let mut handler = EventHandler::new(&label, json);

    let result = if let Some(expected) = request.expected_hash.as_deref() {
        let (tx, session_rx) = kratos_events::channel();
        let mut options = VerifyOptions::from_config(&config.verify)
            .with_sink(&sink)
            .with_observer(tx);
        for (name, value) in &request.headers {
            options = options.with_header(name, value)?;
        }

        let download = run_verified_download(&client, target.clone(), expected, options);
        drive(download, &sink, &mut sink_rx, Some(session_rx), &mut handler).await
    } else {
        let mut attempt = DownloadAttempt::new(&target).with_sink(&sink);
        for (name, value) in &request.headers {
            attempt = attempt.with_header(name, value)?;
        }

        let download = single_attempt(&client, attempt);
        drive(download, &sink, &mut sink_rx, None, &mut handler).await
    };
    handler.finish();

    let target = result?;
    let verified = request.expected_hash.is_some();
    if json {
        let report = serde_json::json!({
            "url": target.source().as_str(),
            "destination": target.destination().display().to_string(),
            "bytes": sink.bytes_transferred(),
            "verified": verified,
        });
        println!("{report}");
    } else {
        println!(
            "Downloaded {} ({} bytes{})",
            target.destination().display(),
            sink.bytes_transferred(),
            if verified { ", verified" } else { "" }
        );
    }

    info!("Command completed successfully");
    Ok(())
}

async fn single_attempt(
    client: &NetClient,
    attempt: DownloadAttempt<'_>,
) -> Result<DownloadTarget, Error> {
    attempt.run(client).await.cloned()
}

/// Run a download while rendering the events it produces
async fn drive<F>(
    download: F,
    sink: &ProgressSink,
    sink_rx: &mut SinkReceiver,
    mut session_rx: Option<SessionReceiver>,
    handler: &mut EventHandler,
) -> Result<DownloadTarget, Error>
where
    F: Future<Output = Result<DownloadTarget, Error>>,
{
    tokio::pin!(download);

    loop {
        select! {
            result = &mut download => {
                // Drain any remaining events
                while let Ok(event) = sink_rx.try_recv() {
                    handler.handle_sink_event(&event, sink.expected_size());
                }
                if let Some(rx) = session_rx.as_mut() {
                    while let Ok(event) = rx.try_recv() {
                        handler.handle_session_event(&event);
                    }
                }
                return result;
            }
            Some(event) = sink_rx.recv() => {
                handler.handle_sink_event(&event, sink.expected_size());
            }
            Some(event) = next_session_event(&mut session_rx) => {
                handler.handle_session_event(&event);
            }
        }
    }
}

async fn next_session_event(rx: &mut Option<SessionReceiver>) -> Option<SessionEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn hash_command(
    config: &Config,
    file: &Path,
    expect: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let algorithm = config.hash_algorithm()?;

    if let Some(expected) = expect {
        if !verify_file(file, expected, algorithm).await? {
            let actual = Hash::hash_file(file, algorithm).await?;
            return Err(CliError::Mismatch {
                expected: expected.to_string(),
                actual: actual.to_hex(),
            });
        }
    }

    let hash = Hash::hash_file(file, algorithm).await?;

    if json {
        let report = serde_json::json!({
            "file": file.display().to_string(),
            "algorithm": algorithm.as_str(),
            "digest": hash.to_hex(),
            "verified": expect.is_some(),
        });
        println!("{report}");
    } else {
        println!("{}  {}", hash.to_hex(), file.display());
    }
    Ok(())
}

fn error_json(error: &CliError) -> serde_json::Value {
    match error {
        CliError::Ops(e) => serde_json::json!({
            "error": e.user_message(),
            "code": e.user_code(),
            "hint": e.user_hint(),
            "retryable": e.is_retryable(),
        }),
        other => serde_json::json!({ "error": other.to_string() }),
    }
}

/// Initialize tracing/logging; logs go to stderr so stdout stays parseable
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "debug,kratos=debug,kratos_net=debug"
    } else {
        "warn,kratos=warn,kratos_net=warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(debug_enabled)
            .init();
    }
}
