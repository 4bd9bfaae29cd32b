//! Top-level error composition: every error kind that can surface from a
//! run, matching the teacher's `DKGError`/`ShareError`/`NodeError` split —
//! one enum per concern, `#[from]`-composed here into the single type
//! `main()` matches on to pick an exit code (§7).

use crate::chain_gateway::GatewayError;
use crate::prover::ProverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error(transparent)]
    Chain(#[from] GatewayError),

    #[error(transparent)]
    Protocol(#[from] dkg_core::DkgError),

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error("an event subscriber task ended unexpectedly: {0}")]
    SubscriberLost(&'static str),

    #[error("the contract aborted the round")]
    Aborted,
}

impl RunError {
    /// The process exit code for this error (§7): every fatal kind exits 1,
    /// including an `Aborted` round — the binary never distinguishes them
    /// at the shell level, only in the log line that precedes the exit.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether this error was a contract-signalled abortion rather than a
    /// node-local failure, for choosing the log message (§7: "Exits code 1,
    /// message: aborted").
    pub fn is_abort(&self) -> bool {
        matches!(self, RunError::Aborted | RunError::Chain(GatewayError::Aborted))
    }
}
