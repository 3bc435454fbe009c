use std::time::Duration;
use thiserror::Error;

/// Why a live capability discovery attempt did not produce a catalog.
/// These never leave the catalog; every one of them ends in the builtin fallback.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to start capability provider: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Capability provider has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("Capability provider I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capability provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Capability provider closed its output without answering")]
    Closed,

    #[error("Malformed capability response: {0}")]
    Malformed(String),
}
