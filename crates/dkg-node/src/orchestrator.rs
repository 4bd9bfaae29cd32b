//! The Orchestrator (§4.1): the single task that owns the node's protocol
//! state and drives it, phase by phase, from Registration through
//! Public-Key-Submission. Every protocol decision is delegated to
//! [`dkg_core::Round`]; this module's job is exclusively the I/O around it —
//! spawning subscribers, sending transactions, invoking the prover.

use std::time::{SystemTime, UNIX_EPOCH};

use dkg_core::{dispute, DkgError, LocalSecret, Participant, ParticipantSet, Round};
use dkg_crypto::{Point, Scalar};
use ethers::contract::builders::Event;
use ethers::contract::{EthLogDecode, LogMeta};
use ethers::core::types::{Address, H256, U256};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Provider};
use ethers::signers::LocalWallet;
use futures::stream::StreamExt;
use rand::RngCore;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::chain_gateway::{ChainGateway, GatewayError};
use crate::contract::{
    AbortionFilter, BroadcastSharesLogFilter, DisputeShareFilter, DistributionEndLogFilter,
    ExclusionFilter, PublicKeySubmissionFilter, RegistrationEndLogFilter,
};
use crate::error::RunError;
use crate::event_subscriber::{self, Mode};
use crate::prover::Prover;
use crate::wire::{
    point_to_u256, point_to_xy_u256, recipient_slot, scalar_to_u256, u256_to_point,
    u256_to_scalar, xy_u256_to_point,
};

/// The concrete middleware every contract call in this node goes through: an
/// HTTP provider wrapped with a local signing wallet.
type SignerM = SignerMiddleware<Provider<Http>, LocalWallet>;

/// The merged event stream every subscriber writes into (§4.1 step 1, §5:
/// "every event is forwarded to the Orchestrator for handling").
#[derive(Clone, Debug)]
enum NodeEvent {
    RegistrationEnd,
    BroadcastShares { broadcaster_index: u64, tx_hash: H256 },
    DistributionEnd,
    DisputeShare { disputer_index: u64, disputee_index: u64 },
    Exclusion { index: u64 },
    Abortion,
    PublicKeySubmission,
}

/// The outcome of a completed run (§4.1's `run() -> (master_public_key |
/// Aborted | Fatal)`, plus the `-broadcast-only` short-circuit of §6).
#[derive(Debug)]
pub enum Outcome {
    Done { master_public_key: Point },
    BroadcastOnly,
}

pub struct Orchestrator {
    gateway: ChainGateway,
    prover: Prover,
    own_address: Address,
    rogue: bool,
    ignore_invalid: bool,
    broadcast_only: bool,
}

impl Orchestrator {
    pub fn new(
        gateway: ChainGateway,
        prover: Prover,
        own_address: Address,
        rogue: bool,
        ignore_invalid: bool,
        broadcast_only: bool,
    ) -> Self {
        Orchestrator {
            gateway,
            prover,
            own_address,
            rogue,
            ignore_invalid,
            broadcast_only,
        }
    }

    #[tracing::instrument(skip(self, own_secret, rng))]
    pub async fn run<R: RngCore>(
        &self,
        own_secret: LocalSecret,
        rng: &mut R,
    ) -> Result<Outcome, RunError> {
        let (tx, mut rx) = mpsc::channel::<NodeEvent>(1024);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let handles = self.spawn_subscribers(tx, shutdown_tx.clone()).await?;
        let shutdown = |handles: Vec<JoinHandle<()>>| {
            let _ = shutdown_tx.send(());
            for h in handles {
                h.abort();
            }
        };

        // §4.1 step 2: register, then block on RegistrationEnd.
        let public_key = own_secret.public_key();
        info!(?public_key, "registering");
        if let Err(e) = self.gateway.send(self.gateway.dkg.register(point_to_u256(&public_key))).await {
            shutdown(handles);
            return Err(e.into());
        }
        if let Err(e) = self.await_one(&mut rx, |e| matches!(e, NodeEvent::RegistrationEnd)).await {
            shutdown(handles);
            return Err(e);
        }

        // §4.1 step 3: collect participants and this node's own index.
        let (own_index, participants) = match self.collect_participants().await {
            Ok(v) => v,
            Err(e) => {
                shutdown(handles);
                return Err(e);
            }
        };
        info!(own_index, n = participants.len(), threshold = participants.threshold(), "registration complete");

        let mut round = Round::new(own_index, own_secret, participants);
        round.set_ignore_invalid(self.ignore_invalid);

        // §4.1 step 4: generate and broadcast this node's contribution.
        let contribution = round.generate_own_contribution(self.rogue, rng);
        let commitments_u256: Vec<U256> = contribution.commitments.iter().map(point_to_u256).collect();
        let shares_u256: Vec<U256> = contribution.shares.iter().map(|(_, s)| scalar_to_u256(*s)).collect();
        info!(rogue = self.rogue, "broadcasting shares");
        if let Err(e) = self.gateway.send(self.gateway.dkg.broadcast_shares(commitments_u256, shares_u256)).await {
            shutdown(handles);
            return Err(e.into());
        }

        if self.broadcast_only {
            info!("broadcast-only mode: exiting without waiting for later phases");
            shutdown(handles);
            return Ok(Outcome::BroadcastOnly);
        }

        // §4.1 step 5/6: process broadcasts (verification is total and
        // immediate; disputes are only ever filed once drained below) until
        // DistributionEnd, then drain and file any pending disputes.
        if let Err(e) = self.drive_distribution(&mut rx, &mut round).await {
            shutdown(handles);
            return Err(e);
        }

        let pending = round.drain_pending_disputes();
        for d in &pending {
            if let Err(e) = self.file_dispute(d).await {
                warn!(dealer_index = d.dealer_index, error = %e, "disputeShare failed");
            }
        }

        // §4.1 step 6 (cont'd): dispute phase, gated by the re-armable
        // deadline and any further DisputeShare/Exclusion/Abortion events.
        if let Err(e) = self.drive_dispute_phase(&mut rx, &mut round).await {
            shutdown(handles);
            return Err(e);
        }

        // §4.1 step 7: resolve whatever the dispute window left open.
        if let Err(e) = self.apply_expired_disputes(&mut round).await {
            shutdown(handles);
            return Err(e);
        }

        // §4.1 step 8: combine and sanity-check.
        let (master_pk, _own_share) = match round.finalize() {
            Ok(v) => v,
            Err(e) => {
                shutdown(handles);
                return Err(RunError::Protocol(e));
            }
        };
        info!(?master_pk, "derived master public key");

        // §4.1 step 9: submit, or verify a winning peer's submission.
        let result = self.submit_or_verify(&round, master_pk).await;
        shutdown(handles);
        result.map(|()| Outcome::Done { master_public_key: master_pk })
    }

    async fn spawn_subscribers(
        &self,
        tx: mpsc::Sender<NodeEvent>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Result<Vec<JoinHandle<()>>, RunError> {
        let dkg = &self.gateway.dkg;
        let mut handles = Vec::with_capacity(7);

        handles.push(
            self.subscribe(
                dkg.registration_end_filter(),
                "registration_end",
                Mode::OneShot,
                |_: RegistrationEndLogFilter, _meta: LogMeta| NodeEvent::RegistrationEnd,
                tx.clone(),
                shutdown_tx.subscribe(),
            )
            .await?,
        );
        handles.push(
            self.subscribe(
                dkg.broadcast_shares_filter(),
                "broadcast_shares",
                Mode::Continuous,
                |e: BroadcastSharesLogFilter, meta: LogMeta| NodeEvent::BroadcastShares {
                    broadcaster_index: e.broadcaster_index,
                    tx_hash: meta.transaction_hash,
                },
                tx.clone(),
                shutdown_tx.subscribe(),
            )
            .await?,
        );
        handles.push(
            self.subscribe(
                dkg.distribution_end_filter(),
                "distribution_end",
                Mode::OneShot,
                |_: DistributionEndLogFilter, _meta: LogMeta| NodeEvent::DistributionEnd,
                tx.clone(),
                shutdown_tx.subscribe(),
            )
            .await?,
        );
        handles.push(
            self.subscribe(
                dkg.dispute_share_filter(),
                "dispute_share",
                Mode::Continuous,
                |e: DisputeShareFilter, _meta: LogMeta| NodeEvent::DisputeShare {
                    disputer_index: e.disputer_index,
                    disputee_index: e.disputee_index,
                },
                tx.clone(),
                shutdown_tx.subscribe(),
            )
            .await?,
        );
        handles.push(
            self.subscribe(
                dkg.exclusion_filter(),
                "exclusion",
                Mode::Continuous,
                |e: ExclusionFilter, _meta: LogMeta| NodeEvent::Exclusion { index: e.index },
                tx.clone(),
                shutdown_tx.subscribe(),
            )
            .await?,
        );
        handles.push(
            self.subscribe(
                dkg.abortion_filter(),
                "abortion",
                Mode::Continuous,
                |_: AbortionFilter, _meta: LogMeta| NodeEvent::Abortion,
                tx.clone(),
                shutdown_tx.subscribe(),
            )
            .await?,
        );
        handles.push(
            self.subscribe(
                dkg.public_key_submission_filter(),
                "public_key_submission",
                Mode::OneShot,
                |_: PublicKeySubmissionFilter, _meta: LogMeta| NodeEvent::PublicKeySubmission,
                tx.clone(),
                shutdown_tx.subscribe(),
            )
            .await?,
        );

        Ok(handles)
    }

    /// Turns one contract event filter into a subscriber task whose items
    /// are already folded into the shared [`NodeEvent`] enum, so every
    /// subscriber forwards into the same channel regardless of its
    /// underlying log type.
    async fn subscribe<D, F>(
        &self,
        event: Event<SignerM, D>,
        name: &'static str,
        mode: Mode,
        map: F,
        tx: mpsc::Sender<NodeEvent>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, RunError>
    where
        D: EthLogDecode + Clone + Send + Sync + 'static,
        F: Fn(D, LogMeta) -> NodeEvent + Send + Sync + 'static,
    {
        let stream = event
            .stream_with_meta()
            .await
            .map_err(|e| RunError::Chain(GatewayError::Call(anyhow::anyhow!(e))))?;

        let mapped = stream
            .filter_map(move |item| {
                let result = match item {
                    Ok((event, meta)) => Some((map(event, meta.clone()), meta)),
                    Err(e) => {
                        warn!(subscriber = name, error = %e, "event decode error");
                        None
                    }
                };
                async move { result }
            })
            .boxed();

        Ok(event_subscriber::spawn(name, mode, mapped, tx, shutdown))
    }

    async fn await_one(
        &self,
        rx: &mut mpsc::Receiver<NodeEvent>,
        matches_target: impl Fn(&NodeEvent) -> bool,
    ) -> Result<(), RunError> {
        loop {
            match rx.recv().await {
                Some(NodeEvent::Abortion) => return Err(RunError::Aborted),
                Some(event) if matches_target(&event) => return Ok(()),
                Some(_) => continue,
                None => return Err(RunError::SubscriberLost("event channel closed before target event")),
            }
        }
    }

    async fn collect_participants(&self) -> Result<(u32, ParticipantSet), RunError> {
        let dkg = &self.gateway.dkg;
        let (own_index, _own_pk) = dkg
            .participants(self.own_address)
            .call()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;

        let threshold = dkg
            .threshold()
            .call()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;

        let raw_keys = dkg
            .public_keys()
            .call()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;

        let mut participants = Vec::with_capacity(raw_keys.len());
        for (zero_based, raw) in raw_keys.into_iter().enumerate() {
            if raw.is_zero() {
                continue; // unregistered slot
            }
            let index = (zero_based + 1) as u32;
            let public_key = u256_to_point(raw).map_err(|e| {
                GatewayError::Call(anyhow::anyhow!("malformed public key for index {}: {}", index, e))
            })?;
            participants.push(Participant::new(index, public_key));
        }

        Ok((own_index as u32, ParticipantSet::new(participants, threshold.as_usize())))
    }

    /// Processes `BroadcastShares` events immediately as they arrive — the
    /// deferral the contract's phase ordering requires (§4.4) lives in
    /// `Round::pending_disputes`, not here, so there is no need to buffer
    /// raw events before `DistributionEnd`.
    async fn drive_distribution(
        &self,
        rx: &mut mpsc::Receiver<NodeEvent>,
        round: &mut Round,
    ) -> Result<(), RunError> {
        loop {
            match rx.recv().await {
                Some(NodeEvent::Abortion) => return Err(RunError::Aborted),
                Some(NodeEvent::BroadcastShares { broadcaster_index, tx_hash }) => {
                    self.process_broadcast(round, broadcaster_index as u32, tx_hash).await?;
                }
                Some(NodeEvent::DistributionEnd) => return Ok(()),
                Some(_) => continue,
                None => return Err(RunError::SubscriberLost("event channel closed before DistributionEnd")),
            }
        }
    }

    async fn process_broadcast(&self, round: &mut Round, dealer_index: u32, tx_hash: H256) -> Result<(), RunError> {
        if dealer_index == round.own_index() {
            return Ok(());
        }
        let Some(dealer_pubkey) = round.participants().get(dealer_index).map(|p| p.public_key) else {
            warn!(dealer_index, "broadcast from an index outside the participant set");
            return Ok(());
        };

        let decoded = self.gateway.decode_broadcast_tx(tx_hash).await?;
        let Some((commits_u256, shares_u256)) = decoded else {
            warn!(dealer_index, "broadcastShares transaction did not decode");
            round.on_broadcast(dealer_index, dealer_pubkey, Vec::new(), Scalar::from(0u64));
            return Ok(());
        };

        let commitments: Vec<Point> = match commits_u256.into_iter().map(u256_to_point).collect::<Result<_, _>>() {
            Ok(c) => c,
            Err(_) => {
                warn!(dealer_index, "dealer's commitment vector contains a malformed point");
                round.on_broadcast(dealer_index, dealer_pubkey, Vec::new(), Scalar::from(0u64));
                return Ok(());
            }
        };

        let slot = recipient_slot(dealer_index, round.own_index(), round.participants().len());
        let encrypted_share = slot
            .and_then(|s| shares_u256.get(s).copied())
            .map(u256_to_scalar)
            .unwrap_or(Scalar::from(0u64));

        round.on_broadcast(dealer_index, dealer_pubkey, commitments, encrypted_share);
        Ok(())
    }

    async fn file_dispute(&self, pending: &dkg_core::PendingDispute) -> Result<(), RunError> {
        info!(dealer_index = pending.dealer_index, "filing disputeShare");
        self.gateway
            .send(
                self.gateway
                    .dkg
                    .dispute_share(pending.dealer_index as u64, vec![scalar_to_u256(pending.alleged_share)]),
            )
            .await?;
        Ok(())
    }

    async fn drive_dispute_phase(
        &self,
        rx: &mut mpsc::Receiver<NodeEvent>,
        round: &mut Round,
    ) -> Result<(), RunError> {
        let phase_end = self.phase_end().await?;
        let mut deadline = dkg_core::Deadline::from_phase_end(phase_end, now_unix());
        let mut extended = false;

        loop {
            tokio::select! {
                biased;
                event = rx.recv() => {
                    match event {
                        Some(NodeEvent::Abortion) => return Err(RunError::Aborted),
                        Some(NodeEvent::BroadcastShares { broadcaster_index, tx_hash }) => {
                            self.process_broadcast(round, broadcaster_index as u32, tx_hash).await?;
                        }
                        Some(NodeEvent::DisputeShare { disputer_index, disputee_index }) => {
                            extended = true;
                            if disputee_index as u32 == round.own_index() {
                                if let Err(e) = self.defend_share(round, disputer_index as u32).await {
                                    warn!(disputer_index, error = %e, "defendShare failed");
                                }
                            }
                        }
                        Some(NodeEvent::Exclusion { index }) => round.on_exclusion(index as u32),
                        Some(_) => continue,
                        None => return Err(RunError::SubscriberLost("event channel closed during dispute phase")),
                    }
                }
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline.instant())) => {
                    if extended {
                        extended = false;
                        let new_end = self.phase_end().await?;
                        deadline.extend_to(new_end, now_unix());
                        continue;
                    }
                    return Ok(());
                }
            }
        }
    }

    async fn phase_end(&self) -> Result<u64, RunError> {
        self.gateway
            .dkg
            .phase_end()
            .call()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)).into())
    }

    async fn defend_share(&self, round: &Round, disputer_index: u32) -> Result<(), RunError> {
        let Some(commitments) = round.own_commitments() else {
            return Err(RunError::Protocol(DkgError::ShareSanityCheckFailed));
        };
        let Some(share_for_disputer) = round.own_share_for(disputer_index) else {
            return Ok(()); // not actually a registered recipient; nothing to defend
        };
        let Some(disputer) = round.participants().get(disputer_index) else {
            return Ok(());
        };

        let stored_hash = self.commitments_hash(self.own_address).await?;
        let inputs = dispute::defend_share_inputs(
            commitments,
            round.own_secret_scalar(),
            &round.own_public_key(),
            &disputer.public_key,
            disputer_index,
            share_for_disputer,
            &stored_hash,
        );

        let proof = self.prover.prove("poly_eval", &inputs).await?;
        self.gateway.send(self.gateway.dkg.defend_share(proof.proof)).await?;
        Ok(())
    }

    async fn commitments_hash(&self, addr: Address) -> Result<[u8; 32], RunError> {
        let h = self
            .gateway
            .dkg
            .commitment_hashes(addr)
            .call()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;
        Ok(h.0)
    }

    async fn apply_expired_disputes(&self, round: &mut Round) -> Result<(), RunError> {
        let expired = self
            .gateway
            .dkg
            .expired_disputes(now_unix())
            .call()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;

        let indices: Vec<u32> = expired
            .into_iter()
            .enumerate()
            .filter(|(_, is_expired)| *is_expired)
            .map(|(zero_based, _)| (zero_based + 1) as u32)
            .collect();
        if !indices.is_empty() {
            info!(?indices, "excluding dealers with expired, unresolved disputes");
        }
        round.on_expired_disputes(&indices);
        Ok(())
    }

    async fn submit_or_verify(&self, round: &Round, master_pk: Point) -> Result<(), RunError> {
        let proof = self.prove_key_deriv(round, &master_pk).await?;
        match self
            .gateway
            .send(self.gateway.dkg.submit_public_key(point_to_xy_u256(&master_pk), proof.proof))
            .await
        {
            Ok(_) => {
                info!("submitted master public key");
                Ok(())
            }
            Err(GatewayError::Aborted) => Err(RunError::Aborted),
            Err(e) => {
                warn!(error = %e, "own submitPublicKey did not land; checking for a winning peer submission");
                self.verify_peer_submission(round, master_pk).await
            }
        }
    }

    async fn verify_peer_submission(&self, round: &Round, expected: Point) -> Result<(), RunError> {
        let raw = self
            .gateway
            .dkg
            .public_keys()
            .call()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;
        if raw.len() < 2 {
            return Err(GatewayError::Call(anyhow::anyhow!("publicKeys() did not return an (x, y) pair")).into());
        }
        let submitted = xy_u256_to_point([raw[0], raw[1]])
            .map_err(|e| GatewayError::Call(anyhow::anyhow!("submitted public key is malformed: {}", e)))?;

        if submitted == expected {
            info!("a peer's submission matches our own computation");
            return Ok(());
        }

        warn!("submitted public key disagrees with local computation; filing disputePublicKey");
        let proof = self.prove_key_deriv(round, &expected).await?;
        self.gateway.send(self.gateway.dkg.dispute_public_key(proof.proof)).await?;
        Ok(())
    }

    async fn prove_key_deriv(
        &self,
        round: &Round,
        master_pk: &Point,
    ) -> Result<crate::prover::GeneratedProof, RunError> {
        let first_coefficients = round.first_coefficients_ordered();
        let inputs = dispute::submit_public_key_inputs(&first_coefficients, master_pk);
        Ok(self.prover.prove("key_deriv", &inputs).await?)
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_secs()
}
