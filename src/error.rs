// Typed errors for the collaborators whose failures the scheduler handles differently.

use std::time::Duration;

use thiserror::Error;

/// Remote report delivery failed. Logged; the report stays in the local log.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// The recovery command could not be run or did not succeed.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("recovery command is empty")]
    EmptyCommand,

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Exit { program: String, status: String },

    #[error("recovery command timed out after {0:?}")]
    Timeout(Duration),
}

/// Faults that end the main loop. Everything else is logged and the loop continues.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("report log unwritable: {0:#}")]
    Persist(anyhow::Error),
}
