//thiserror-based error types
use thiserror::Error;

/// The event sink could not durably record a security event.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO: {0}")] Io(#[from] std::io::Error),
    #[error("Encode: {0}")] Encode(#[from] serde_json::Error),
}

/// Fatal to the uplink receiver.
#[derive(Error, Debug)]
pub enum OcsError {
    #[error("Sink: {0}")] Sink(#[from] SinkError),
}
