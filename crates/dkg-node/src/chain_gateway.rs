//! Funnels every on-chain interaction through one gateway: gas estimation,
//! signed sends with receipt waiting, and decoding a peer's mined
//! `broadcastShares` calldata. Nothing else in this crate talks to the
//! provider directly.

use crate::contract::{decode_broadcast_shares_input, Dkg};
use ethers::prelude::*;
use ethers::types::{TransactionReceipt, H256, U256};
use ethers::utils::keccak256;
use thiserror::Error;
use tracing::{info, warn};

/// Fixed safety margin added on top of an `eth_estimateGas` result. The
/// contract's gas usage is data-dependent (commitment/share vector length)
/// and a tight estimate occasionally underestimates by a few thousand units
/// on the public testnets this was run against.
const GAS_MARGIN: U256 = U256([30_000, 0, 0, 0]);

/// Fixed gas price, matching a node running against a network with
/// negligible fee market contention (a private or test deployment).
const GAS_PRICE_GWEI: u64 = 1;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transaction reverted: {0:?}")]
    Reverted(H256),
    #[error("contract aborted the round")]
    Aborted,
    #[error("chain call failed: {0}")]
    Call(#[from] anyhow::Error),
}

pub struct ChainGateway {
    pub dkg: Dkg<SignerMiddleware<Provider<Http>, LocalWallet>>,
}

impl ChainGateway {
    pub fn new(dkg: Dkg<SignerMiddleware<Provider<Http>, LocalWallet>>) -> Self {
        ChainGateway { dkg }
    }

    /// Signs, sends, and waits for `call`'s receipt, applying the fixed gas
    /// price and a margin over the estimated gas. A receipt carrying the
    /// contract's `Abortion` topic is reported as [`GatewayError::Aborted`]
    /// rather than [`GatewayError::Reverted`] — the Orchestrator treats the
    /// two very differently (§4.1 step 9, §7).
    pub async fn send<D: Detokenize>(
        &self,
        call: ContractCall<SignerMiddleware<Provider<Http>, LocalWallet>, D>,
    ) -> Result<TransactionReceipt, GatewayError> {
        let estimated = call
            .estimate_gas()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;
        let call = call
            .gas(estimated + GAS_MARGIN)
            .gas_price(U256::from(GAS_PRICE_GWEI) * U256::exp10(9));

        let pending = call
            .send()
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;
        let tx_hash = *pending;
        let receipt = pending
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?
            .ok_or(GatewayError::Reverted(tx_hash))?;

        let abortion_topic = H256::from(keccak256(b"Abortion()"));
        if receipt.logs.iter().any(|l| l.topics.contains(&abortion_topic)) {
            return Err(GatewayError::Aborted);
        }

        if receipt.status == Some(0.into()) {
            warn!(tx = ?tx_hash, "transaction reverted");
            return Err(GatewayError::Reverted(tx_hash));
        }

        info!(tx = ?tx_hash, block = ?receipt.block_number, "transaction mined");
        Ok(receipt)
    }

    /// Fetches the raw mined transaction and decodes its
    /// `broadcastShares(commitments, shares)` calldata. Returns `None` if
    /// the transaction isn't a `broadcastShares` call at all (any other
    /// shape is the caller's bug, not this node's to recover from).
    pub async fn decode_broadcast_tx(
        &self,
        tx_hash: H256,
    ) -> Result<Option<(Vec<U256>, Vec<U256>)>, GatewayError> {
        let tx = self
            .dkg
            .client()
            .get_transaction(tx_hash)
            .await
            .map_err(|e| GatewayError::Call(anyhow::anyhow!(e)))?;
        Ok(tx.and_then(|tx| decode_broadcast_shares_input(&tx.input)))
    }
}
