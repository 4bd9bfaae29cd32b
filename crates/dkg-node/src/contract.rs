//! Hand-maintained bindings for the DKG bulletin-board contract.
//!
//! `ethers-rs`'s `abigen!` macro would normally generate this from Solidity
//! build artifacts at compile time; this workspace has no Solidity toolchain
//! wired into its build, so the ABI is declared inline and each method is
//! dispatched by name through [`ethers::contract::Contract::method`], which
//! looks up the function's selector from the ABI itself rather than a
//! hand-computed one. Getting a selector wrong here would silently call the
//! wrong function, so the ABI JSON below is the only source of truth.

use ethers::contract::{builders::ContractCall, builders::Event, Contract, Lazy};
use ethers::core::abi::Abi;
use ethers::core::types::{Address, Bytes, H256, U256};
use ethers::providers::Middleware;
use std::sync::Arc;

pub static DKG_ABI: Lazy<Abi> = Lazy::new(|| {
    serde_json::from_str(DKG_ABI_JSON).expect("static DKG ABI is well-formed JSON")
});

const DKG_ABI_JSON: &str = r#"[
    {"type":"function","name":"register","stateMutability":"payable",
     "inputs":[{"name":"publicKey","type":"uint256"}],"outputs":[]},
    {"type":"function","name":"broadcastShares","stateMutability":"nonpayable",
     "inputs":[{"name":"commitments","type":"uint256[]"},{"name":"shares","type":"uint256[]"}],"outputs":[]},
    {"type":"function","name":"disputeShare","stateMutability":"nonpayable",
     "inputs":[{"name":"disputeeIndex","type":"uint64"},{"name":"shares","type":"uint256[]"}],"outputs":[]},
    {"type":"function","name":"defendShare","stateMutability":"nonpayable",
     "inputs":[{"name":"a","type":"uint256[2]"},{"name":"b","type":"uint256[2][2]"},{"name":"c","type":"uint256[2]"}],"outputs":[]},
    {"type":"function","name":"disputePublicKey","stateMutability":"nonpayable",
     "inputs":[{"name":"a","type":"uint256[2]"},{"name":"b","type":"uint256[2][2]"},{"name":"c","type":"uint256[2]"}],"outputs":[]},
    {"type":"function","name":"submitPublicKey","stateMutability":"nonpayable",
     "inputs":[{"name":"publicKey","type":"uint256[2]"},{"name":"a","type":"uint256[2]"},{"name":"b","type":"uint256[2][2]"},{"name":"c","type":"uint256[2]"}],"outputs":[]},
    {"type":"function","name":"participants","stateMutability":"view",
     "inputs":[{"name":"addr","type":"address"}],
     "outputs":[{"name":"index","type":"uint64"},{"name":"publicKey","type":"uint256"}]},
    {"type":"function","name":"publicKeys","stateMutability":"view",
     "inputs":[],"outputs":[{"name":"","type":"uint256[]"}]},
    {"type":"function","name":"commitmentHashes","stateMutability":"view",
     "inputs":[{"name":"addr","type":"address"}],"outputs":[{"name":"","type":"bytes32"}]},
    {"type":"function","name":"shareHashes","stateMutability":"view",
     "inputs":[{"name":"addr","type":"address"}],"outputs":[{"name":"","type":"bytes32"}]},
    {"type":"function","name":"threshold","stateMutability":"view",
     "inputs":[],"outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"phaseEnd","stateMutability":"view",
     "inputs":[],"outputs":[{"name":"","type":"uint64"}]},
    {"type":"function","name":"expiredDisputes","stateMutability":"view",
     "inputs":[{"name":"now","type":"uint64"}],"outputs":[{"name":"","type":"bool[]"}]},
    {"type":"function","name":"addresses","stateMutability":"view",
     "inputs":[{"name":"idx","type":"uint64"}],"outputs":[{"name":"","type":"address"}]},
    {"type":"event","name":"RegistrationEndLog","anonymous":false,"inputs":[]},
    {"type":"event","name":"BroadcastSharesLog","anonymous":false,
     "inputs":[{"name":"sender","type":"address","indexed":true},{"name":"broadcasterIndex","type":"uint64","indexed":false}]},
    {"type":"event","name":"DistributionEndLog","anonymous":false,"inputs":[]},
    {"type":"event","name":"DisputeShare","anonymous":false,
     "inputs":[{"name":"disputerIndex","type":"uint64","indexed":false},{"name":"disputeeIndex","type":"uint64","indexed":false}]},
    {"type":"event","name":"Exclusion","anonymous":false,
     "inputs":[{"name":"index","type":"uint64","indexed":false}]},
    {"type":"event","name":"Abortion","anonymous":false,"inputs":[]},
    {"type":"event","name":"PublicKeySubmission","anonymous":false,"inputs":[]}
]"#;

/// A thin, deref-based wrapper over `ethers::contract::Contract`, in the
/// shape `abigen!` itself would produce, but calling through
/// [`Contract::method`] (name + ABI lookup) instead of a baked-in selector.
#[derive(Clone)]
pub struct Dkg<M>(Contract<M>);

impl<M> std::ops::Deref for Dkg<M> {
    type Target = Contract<M>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<M: Middleware> std::fmt::Debug for Dkg<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("Dkg").field(&self.0.address()).finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Proof {
    pub a: [U256; 2],
    pub b: [[U256; 2]; 2],
    pub c: [U256; 2],
}

impl<M: Middleware> Dkg<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Dkg(Contract::new(address, DKG_ABI.clone(), client))
    }

    pub fn register(&self, public_key: U256) -> ContractCall<M, ()> {
        self.0
            .method("register", public_key)
            .expect("register is in the static ABI")
    }

    pub fn broadcast_shares(
        &self,
        commitments: Vec<U256>,
        shares: Vec<U256>,
    ) -> ContractCall<M, ()> {
        self.0
            .method("broadcastShares", (commitments, shares))
            .expect("broadcastShares is in the static ABI")
    }

    pub fn dispute_share(&self, disputee_index: u64, shares: Vec<U256>) -> ContractCall<M, ()> {
        self.0
            .method("disputeShare", (disputee_index, shares))
            .expect("disputeShare is in the static ABI")
    }

    pub fn defend_share(&self, proof: Proof) -> ContractCall<M, ()> {
        self.0
            .method("defendShare", (proof.a, proof.b, proof.c))
            .expect("defendShare is in the static ABI")
    }

    pub fn dispute_public_key(&self, proof: Proof) -> ContractCall<M, ()> {
        self.0
            .method("disputePublicKey", (proof.a, proof.b, proof.c))
            .expect("disputePublicKey is in the static ABI")
    }

    pub fn submit_public_key(&self, public_key: [U256; 2], proof: Proof) -> ContractCall<M, ()> {
        self.0
            .method("submitPublicKey", (public_key, proof.a, proof.b, proof.c))
            .expect("submitPublicKey is in the static ABI")
    }

    pub fn participants(&self, addr: Address) -> ContractCall<M, (u64, U256)> {
        self.0
            .method("participants", addr)
            .expect("participants is in the static ABI")
    }

    pub fn public_keys(&self) -> ContractCall<M, Vec<U256>> {
        self.0
            .method("publicKeys", ())
            .expect("publicKeys is in the static ABI")
    }

    pub fn commitment_hashes(&self, addr: Address) -> ContractCall<M, H256> {
        self.0
            .method("commitmentHashes", addr)
            .expect("commitmentHashes is in the static ABI")
    }

    pub fn share_hashes(&self, addr: Address) -> ContractCall<M, H256> {
        self.0
            .method("shareHashes", addr)
            .expect("shareHashes is in the static ABI")
    }

    pub fn threshold(&self) -> ContractCall<M, U256> {
        self.0
            .method("threshold", ())
            .expect("threshold is in the static ABI")
    }

    pub fn phase_end(&self) -> ContractCall<M, u64> {
        self.0
            .method("phaseEnd", ())
            .expect("phaseEnd is in the static ABI")
    }

    pub fn expired_disputes(&self, now: u64) -> ContractCall<M, Vec<bool>> {
        self.0
            .method("expiredDisputes", now)
            .expect("expiredDisputes is in the static ABI")
    }

    pub fn addresses(&self, idx: u64) -> ContractCall<M, Address> {
        self.0
            .method("addresses", idx)
            .expect("addresses is in the static ABI")
    }

    pub fn broadcast_shares_filter(&self) -> Event<M, BroadcastSharesLogFilter> {
        self.0.event()
    }

    pub fn dispute_share_filter(&self) -> Event<M, DisputeShareFilter> {
        self.0.event()
    }

    pub fn exclusion_filter(&self) -> Event<M, ExclusionFilter> {
        self.0.event()
    }

    pub fn registration_end_filter(&self) -> Event<M, RegistrationEndLogFilter> {
        self.0.event()
    }

    pub fn distribution_end_filter(&self) -> Event<M, DistributionEndLogFilter> {
        self.0.event()
    }

    pub fn abortion_filter(&self) -> Event<M, AbortionFilter> {
        self.0.event()
    }

    pub fn public_key_submission_filter(&self) -> Event<M, PublicKeySubmissionFilter> {
        self.0.event()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, ethers::contract::EthEvent)]
#[ethevent(name = "RegistrationEndLog", abi = "RegistrationEndLog()")]
pub struct RegistrationEndLogFilter;

#[derive(Clone, Debug, Default, PartialEq, Eq, ethers::contract::EthEvent)]
#[ethevent(
    name = "BroadcastSharesLog",
    abi = "BroadcastSharesLog(address,uint64)"
)]
pub struct BroadcastSharesLogFilter {
    #[ethevent(indexed)]
    pub sender: Address,
    pub broadcaster_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, ethers::contract::EthEvent)]
#[ethevent(name = "DistributionEndLog", abi = "DistributionEndLog()")]
pub struct DistributionEndLogFilter;

#[derive(Clone, Debug, Default, PartialEq, Eq, ethers::contract::EthEvent)]
#[ethevent(name = "DisputeShare", abi = "DisputeShare(uint64,uint64)")]
pub struct DisputeShareFilter {
    pub disputer_index: u64,
    pub disputee_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, ethers::contract::EthEvent)]
#[ethevent(name = "Exclusion", abi = "Exclusion(uint64)")]
pub struct ExclusionFilter {
    pub index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, ethers::contract::EthEvent)]
#[ethevent(name = "Abortion", abi = "Abortion()")]
pub struct AbortionFilter;

#[derive(Clone, Debug, Default, PartialEq, Eq, ethers::contract::EthEvent)]
#[ethevent(name = "PublicKeySubmission", abi = "PublicKeySubmission()")]
pub struct PublicKeySubmissionFilter;

pub const BROADCAST_SHARES_SELECTOR_NAME: &str = "broadcastShares";

/// Splits off the 4-byte function selector from a raw transaction's input
/// and decodes the `broadcastShares(uint256[],uint256[])` arguments. Used by
/// the Chain Gateway to recover a peer's commitments/shares from their
/// mined transaction rather than from a (nonexistent) calldata event.
pub fn decode_broadcast_shares_input(input: &Bytes) -> Option<(Vec<U256>, Vec<U256>)> {
    use ethers::core::abi::{decode, ParamType};

    let func = DKG_ABI
        .function(BROADCAST_SHARES_SELECTOR_NAME)
        .expect("broadcastShares is in the static ABI");
    if input.0.len() < 4 || input.0[..4] != func.short_signature() {
        return None;
    }
    let tokens = decode(
        &[
            ParamType::Array(Box::new(ParamType::Uint(256))),
            ParamType::Array(Box::new(ParamType::Uint(256))),
        ],
        &input.0[4..],
    )
    .ok()?;
    let mut tokens = tokens.into_iter();
    let commitments = tokens
        .next()?
        .into_array()?
        .into_iter()
        .map(|t| t.into_uint())
        .collect::<Option<Vec<_>>>()?;
    let shares = tokens
        .next()?
        .into_array()?
        .into_iter()
        .map(|t| t.into_uint())
        .collect::<Option<Vec<_>>>()?;
    Some((commitments, shares))
}
