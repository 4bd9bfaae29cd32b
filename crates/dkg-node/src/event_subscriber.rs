//! A generic background event watcher.
//!
//! One instance per contract topic the Orchestrator cares about. Each
//! subscriber owns its subscription for its entire lifetime and is driven to
//! completion or cancellation independently — the Orchestrator never polls a
//! subscriber directly, it only ever receives what the subscriber forwards
//! on `tx`.

use ethers::contract::LogMeta;
use futures::StreamExt;
use std::fmt::Debug;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Whether a subscriber keeps forwarding events for the lifetime of the run,
/// or stops itself after the first one (`RegistrationEnd`, `DistributionEnd`,
/// `PublicKeySubmission` are all one-shot per §4.1 step 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Continuous,
    OneShot,
}

/// Spawns a task that drains `stream` and forwards each item through `tx`
/// until the stream ends, `shutdown` fires, or (in [`Mode::OneShot`]) one
/// item has been forwarded.
///
/// `name` is attached to every log line so a multi-subscriber run's tracing
/// output can be told apart by topic.
pub fn spawn<T, S>(
    name: &'static str,
    mode: Mode,
    mut stream: S,
    tx: mpsc::Sender<T>,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()>
where
    T: Debug + Send + 'static,
    S: futures::Stream<Item = (T, LogMeta)> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    debug!(subscriber = name, "shutting down on cancellation");
                    return;
                }
                item = stream.next() => {
                    match item {
                        Some((event, _meta)) => {
                            debug!(subscriber = name, ?event, "observed event");
                            if tx.send(event).await.is_err() {
                                // Orchestrator already gone; nothing left to forward to.
                                return;
                            }
                            if mode == Mode::OneShot {
                                return;
                            }
                        }
                        None => {
                            warn!(subscriber = name, "subscription stream ended");
                            return;
                        }
                    }
                }
            }
        }
    })
}
