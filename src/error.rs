//! Error taxonomy
//!
//! Nothing here is fatal to a running process. Each error has a fixed
//! degradation path in the aggregator; only `ConfigError` stops startup.

use thiserror::Error;

/// Field value could not be decrypted; caller keeps the raw value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("ciphertext is not a whole number of blocks ({0} bytes)")]
    BlockLength(usize),
    #[error("bad padding (wrong key or corrupted payload)")]
    Padding,
    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

/// A single telemetry path could not be read
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("telemetry store unreachable: {0}")]
    Unreachable(String),
    #[error("telemetry store returned status {status} for {path}")]
    Status { path: String, status: u16 },
    #[error("malformed payload at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Outbound notification was not delivered
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("messaging transport failed: {0}")]
    Transport(String),
    #[error("messaging provider rejected alert with status {0}")]
    Rejected(u16),
}

/// AI triage request did not produce a brief
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("triage request timed out after {0} ms")]
    Timeout(u64),
    #[error("triage transport failed: {0}")]
    Transport(String),
    #[error("triage response invalid: {0}")]
    Invalid(String),
}

/// A polling cycle could not produce a document at all
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("telemetry store unreachable: {0}")]
    StoreUnreachable(String),
}

/// A pushed vitals snapshot was refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("ingest disabled: telemetry is read from a remote store")]
    Disabled,
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("temperature and heartRate are required")]
    MissingVitals,
}

/// Startup configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cipher {field} must be 16 bytes of hex, got {got}")]
    CipherMaterial { field: &'static str, got: String },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
