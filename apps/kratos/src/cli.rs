//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kratos - Verified streaming downloader for launcher artifacts
#[derive(Parser)]
#[command(name = "kratos")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verified streaming downloader for launcher artifacts")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Download a file, optionally verifying its digest
    Get {
        /// Source URL (http or https)
        url: String,

        /// Destination path
        #[arg(short, long, value_name = "DEST")]
        output: PathBuf,

        /// Expected hex digest; enables verification with retries
        #[arg(long, value_name = "HEX")]
        hash: Option<String>,

        /// Digest algorithm (sha1, sha256, sha512, blake3)
        #[arg(long, value_name = "NAME")]
        algorithm: Option<String>,

        /// Attempt budget for verified downloads
        #[arg(long, value_name = "N")]
        max_attempts: Option<u32>,

        /// Extra request header, repeatable
        #[arg(long = "header", value_name = "K:V", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Print the digest of a local file
    Hash {
        /// File to hash
        file: PathBuf,

        /// Digest algorithm (sha1, sha256, sha512, blake3)
        #[arg(long, value_name = "NAME")]
        algorithm: Option<String>,

        /// Compare against this hex digest instead of printing it
        #[arg(long, value_name = "HEX")]
        expect: Option<String>,
    },
}

/// Split a `Name: value` pair at the first colon
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
