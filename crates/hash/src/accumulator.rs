//! Incremental digest computation over a streamed body

use crate::{Hash, HashAlgorithm};
use kratos_errors::Error;
use sha2::Digest;

/// Running state of one of the supported digests
#[derive(Clone)]
enum Digester {
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Digester {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => Self::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Sha512 => Self::Sha512(sha2::Sha512::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finish(&mut self) -> Vec<u8> {
        match self {
            Self::Sha1(h) => h.finalize_reset().to_vec(),
            Self::Sha256(h) => h.finalize_reset().to_vec(),
            Self::Sha512(h) => h.finalize_reset().to_vec(),
            Self::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

#[derive(Clone)]
enum State {
    Running(Digester),
    Finished(Hash),
}

/// Append-only digest over bytes fed in network order.
///
/// `digest` is terminal: the first call finalizes the state and every later
/// call returns the same [`Hash`]. Bytes fed after that are ignored.
#[derive(Clone)]
pub struct HashAccumulator {
    algorithm: HashAlgorithm,
    state: State,
    bytes_hashed: u64,
}

impl HashAccumulator {
    /// Create an accumulator for the algorithm called `name`
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is empty or not a supported algorithm.
    pub fn new(name: &str) -> Result<Self, Error> {
        Ok(Self::with_algorithm(HashAlgorithm::from_name(name)?))
    }

    #[must_use]
    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            state: State::Running(Digester::new(algorithm)),
            bytes_hashed: 0,
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Number of bytes fed so far
    #[must_use]
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished(_))
    }

    /// Feed the next chunk of the stream
    pub fn update(&mut self, chunk: &[u8]) {
        match &mut self.state {
            State::Running(digester) => {
                digester.update(chunk);
                self.bytes_hashed += chunk.len() as u64;
            }
            State::Finished(_) => {
                tracing::warn!(
                    algorithm = self.algorithm.as_str(),
                    bytes = chunk.len(),
                    "ignoring bytes fed to a finalized hash accumulator"
                );
            }
        }
    }

    /// Finalize and return the digest
    pub fn digest(&mut self) -> Hash {
        let hash = match &mut self.state {
            State::Finished(hash) => return hash.clone(),
            State::Running(digester) => Hash::from_parts(self.algorithm, digester.finish()),
        };
        self.state = State::Finished(hash.clone());
        hash
    }

    /// Finalize and return the lower-case hex digest
    pub fn hex_digest(&mut self) -> String {
        self.digest().to_hex()
    }
}

impl std::fmt::Debug for HashAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashAccumulator")
            .field("algorithm", &self.algorithm)
            .field("bytes_hashed", &self.bytes_hashed)
            .field("finished", &self.is_finished())
            .finish()
    }
}
