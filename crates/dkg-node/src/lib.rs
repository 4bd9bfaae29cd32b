//! Chain I/O, event subscription, CLI surface, and orchestration for a DKG
//! participant node. The protocol decisions themselves live in `dkg-core`;
//! everything in this crate is the I/O shell around them.

pub mod chain_gateway;
pub mod config;
pub mod contract;
pub mod error;
pub mod event_subscriber;
pub mod opts;
pub mod orchestrator;
pub mod prover;
pub mod wire;
