use thiserror::Error;

/// Errors attributable to a specific dealer's broadcast. Recovered locally
/// per §7 of the "Peer-attributable" error kind: the dealer is marked
/// pending-dispute rather than failing the whole run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error("dealer {0}'s commitment vector has {1} entries, expected {2}")]
    WrongCommitmentLength(u32, usize, usize),
    #[error("dealer {0}'s commitment vector contains a malformed point")]
    MalformedCommitment(u32),
    #[error("dealer {0}'s dealer public key is malformed")]
    MalformedDealerKey(u32),
    #[error("dealer {0}'s share failed the Feldman check")]
    FeldmanCheckFailed(u32),
}

/// Top-level protocol errors, mirroring the "Protocol-fatal" and
/// "Protocol-abort" kinds of the error taxonomy.
#[derive(Debug, Error)]
pub enum DkgError {
    #[error("threshold {0} is invalid for {1} participants (need 2 <= t <= n)")]
    InvalidThreshold(usize, usize),
    #[error("own combined share does not satisfy the local sanity check (share*G != PubPoly(index))")]
    ShareSanityCheckFailed,
    #[error("not enough valid shares to compute the master key: have {0}, need {1}")]
    NotEnoughValidShares(usize, usize),
    #[error(transparent)]
    Share(#[from] ShareError),
}
