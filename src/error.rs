//! Error types for the gateway.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Policy store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Object store errors.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("Object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object key {key}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound mail transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Relay setup failed: {0}")]
    Setup(String),

    #[error("Invalid envelope: {0}")]
    Envelope(String),

    #[error("Submission failed: {0}")]
    Submit(String),
}

/// Document conversion errors.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter exited with code {code:?}: {output}")]
    NonZeroExit { code: Option<i32>, output: String },

    #[error("Converter timed out after {0:?}")]
    Timeout(Duration),

    #[error("Converted file {path} is missing or unreadable: {source}")]
    MissingOutput {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that terminate the processing of one inbound event.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("No destination on the receive domain among {0:?}")]
    NoLocalRecipient(Vec<String>),

    #[error("No policy record for recipient {0}")]
    UnknownRecipient(String),

    #[error("Sender {sender} is not approved for {recipient}")]
    UnauthorisedSender { sender: String, recipient: String },

    #[error("Policy lookup failed: {0}")]
    PolicyLookup(#[from] StoreError),

    #[error("Download failed: {0}")]
    DownloadFailed(#[source] ObjectStoreError),

    #[error("Failed to parse email: {0}")]
    ParseFailed(String),

    #[error("Attachment IO failed for {name}: {source}")]
    AttachmentIoFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion of {name} failed: {source}")]
    ConversionFailed {
        name: String,
        #[source]
        source: ConversionError,
    },

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    BuildFailed(String),

    #[error("Send to {destination} failed: {source}")]
    SendFailed {
        destination: String,
        #[source]
        source: TransportError,
    },
}
