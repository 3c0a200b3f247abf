#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Content hashing for kratos
//!
//! This crate provides the incremental [`HashAccumulator`] fed by downloads,
//! the [`Hash`] value it produces, and helpers to hash files already on disk.

mod accumulator;
mod algorithm;

pub use accumulator::HashAccumulator;
pub use algorithm::HashAlgorithm;

use kratos_errors::{Error, HashError, StorageError};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// A finalized digest together with the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    algorithm: HashAlgorithm,
    bytes: Vec<u8>,
}

impl Hash {
    pub(crate) fn from_parts(algorithm: HashAlgorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convert to lower-case hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Exact comparison against a hex digest as published in a manifest
    ///
    /// No case folding is applied, so an empty or upper-case string never matches.
    #[must_use]
    pub fn matches_hex(&self, expected: &str) -> bool {
        self.to_hex() == expected
    }

    /// Parse a hex digest produced by `algorithm`
    ///
    /// # Errors
    /// Returns an error if the input is not valid hexadecimal or has the wrong length for `algorithm`.
    pub fn from_hex(algorithm: HashAlgorithm, s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|e| HashError::InvalidHex {
            message: e.to_string(),
        })?;

        if bytes.len() != algorithm.digest_length() {
            return Err(HashError::InvalidHex {
                message: format!(
                    "{algorithm} digest must be {} bytes, got {}",
                    algorithm.digest_length(),
                    bytes.len()
                ),
            }
            .into());
        }

        Ok(Self::from_parts(algorithm, bytes))
    }

    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        let mut accumulator = HashAccumulator::with_algorithm(algorithm);
        accumulator.update(data);
        accumulator.digest()
    }

    /// Compute hash of a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, read, or if any I/O operation fails.
    pub async fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<Self, Error> {
        let mut file = File::open(path)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, path))?;

        let mut accumulator = HashAccumulator::with_algorithm(algorithm);
        let mut buffer = vec![0; CHUNK_SIZE];

        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| StorageError::from_io_with_path(&e, path))?;
            if n == 0 {
                break;
            }
            accumulator.update(&buffer[..n]);
        }

        Ok(accumulator.digest())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Verify a file matches an expected hex digest
///
/// # Errors
/// Returns an error if the file cannot be read or hashed.
pub async fn verify_file(
    path: &Path,
    expected_hex: &str,
    algorithm: HashAlgorithm,
) -> Result<bool, Error> {
    let actual = Hash::hash_file(path, algorithm).await?;
    Ok(actual.matches_hex(expected_hex))
}
