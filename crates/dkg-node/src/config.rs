use anyhow::{Context, Result};
use dkg_crypto::Scalar;
use ethers::types::Address;
use serde::Deserialize;
use std::path::Path;

/// The node's JSON configuration document. Every field is required; there is
/// no notion of a partial/defaulted config, since a missing field here means
/// the node cannot safely participate (wrong key material, wrong contract).
#[derive(Debug, Deserialize)]
pub struct Config {
    pub ethereum_node: String,
    pub contract_address: Address,
    pub ethereum_private_key: String,
    pub dkg_private_key: String,
    pub mount_source: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config =
            serde_json::from_str(&raw).with_context(|| "config file is not valid JSON")?;
        Ok(config)
    }

    pub fn dkg_scalar(&self) -> Result<Scalar> {
        let hex = self.dkg_private_key.trim_start_matches("0x");
        let bytes = hex::decode(hex).context("dkg_private_key is not valid hex")?;
        Ok(dkg_crypto::scalar_from_bytes_be(&bytes))
    }
}
