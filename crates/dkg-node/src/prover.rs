//! Prover Adapter (§4.6): the zkSNARK prover is treated as an opaque
//! command-line service operating against a pre-populated build directory.
//!
//! The source this was distilled from shelled out to a `zokrates/zokrates`
//! Docker container per circuit (`prover.go`); this generalises that to a
//! plain `zokrates` subprocess invocation against `mount_source/<circuit>`,
//! without assuming a container runtime is available. The two-call shape —
//! `compute-witness` then `generate-proof` — and the `proof.json` output
//! layout are carried over unchanged.

use dkg_crypto::{fq_from_hex_be, fq_to_decimal, Fq};
use ethers::core::types::U256;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::contract::Proof;

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("spawning `{0}` in {1:?} failed: {2}")]
    Spawn(&'static str, PathBuf, std::io::Error),
    #[error("`{0}` in {1:?} exited with status {2}")]
    NonZeroExit(&'static str, PathBuf, std::process::ExitStatus),
    #[error("reading proof output at {0:?}: {1}")]
    ReadProof(PathBuf, std::io::Error),
    #[error("parsing proof output at {0:?}: {1}")]
    ParseProof(PathBuf, serde_json::Error),
    #[error("proof output contained a malformed field element: {0}")]
    MalformedFieldElement(String),
}

/// The on-disk shape of `proof.json`, matching the original prover's JSON
/// layout: `inputs` as `"0x..."`-prefixed hex strings, `proof.{a,c}` as
/// 2-element hex arrays, `proof.b` as a 2x2 hex array.
#[derive(Debug, PartialEq, Eq, Deserialize)]
struct ProofFile {
    inputs: Vec<String>,
    proof: ZkProofFile,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
struct ZkProofFile {
    a: [String; 2],
    b: [[String; 2]; 2],
    c: [String; 2],
}

/// The decoded result of a completed proof: the echoed public inputs (for
/// a caller that wants to cross-check them against what it intended to
/// prove) and the Groth16 proof itself, ready for `defendShare` /
/// `submitPublicKey`.
#[derive(Debug, Clone)]
pub struct GeneratedProof {
    pub inputs: Vec<Fq>,
    pub proof: Proof,
}

/// Drives `zokrates compute-witness` / `zokrates generate-proof` against a
/// circuit's build directory under `mount_source`.
///
/// Proofs MUST NOT run concurrently (§5): the build directory's
/// `witness`/`proof.json` files are a resource shared across calls, so
/// every [`Prover::prove`] serialises behind `busy`.
pub struct Prover {
    mount_source: PathBuf,
    id_sink: Option<PathBuf>,
    busy: Arc<Mutex<()>>,
}

impl Prover {
    pub fn new(mount_source: PathBuf, id_sink: Option<PathBuf>) -> Self {
        Prover {
            mount_source,
            id_sink,
            busy: Arc::new(Mutex::new(())),
        }
    }

    /// Runs `circuit` against `args` (in the exact order its public inputs
    /// require — see §4.4) and returns the decoded proof. Both the witness
    /// computation and proof generation are blocking external calls; a
    /// non-zero exit from either is a fatal prover error.
    #[tracing::instrument(skip(self, args), fields(circuit = circuit))]
    pub async fn prove(&self, circuit: &str, args: &[Fq]) -> Result<GeneratedProof, ProverError> {
        let _guard = self.busy.lock().await;
        let build_dir = self.mount_source.join(circuit);

        let decimal_args: Vec<String> = args.iter().map(|s| fq_to_decimal(*s)).collect();
        self.compute_witness(&build_dir, &decimal_args).await?;
        self.generate_proof(&build_dir).await?;

        self.read_proof(&build_dir)
    }

    async fn compute_witness(&self, build_dir: &Path, args: &[String]) -> Result<(), ProverError> {
        let mut cmd = Command::new("zokrates");
        cmd.current_dir(build_dir)
            .arg("compute-witness")
            .arg("-o")
            .arg("./witness")
            .arg("-i")
            .arg("./out")
            .arg("-s")
            .arg("./abi.json")
            .arg("-a")
            .args(args);

        self.run(cmd, "zokrates compute-witness", build_dir).await
    }

    async fn generate_proof(&self, build_dir: &Path) -> Result<(), ProverError> {
        let mut cmd = Command::new("zokrates");
        cmd.current_dir(build_dir)
            .arg("generate-proof")
            .arg("-i")
            .arg("./out")
            .arg("--proof-path")
            .arg("./proof.json")
            .arg("-p")
            .arg("./proving.key")
            .arg("-w")
            .arg("./witness");

        self.run(cmd, "zokrates generate-proof", build_dir).await
    }

    async fn run(
        &self,
        mut cmd: Command,
        name: &'static str,
        build_dir: &Path,
    ) -> Result<(), ProverError> {
        let mut child = cmd
            .spawn()
            .map_err(|e| ProverError::Spawn(name, build_dir.to_path_buf(), e))?;

        if let (Some(sink), Some(pid)) = (&self.id_sink, child.id()) {
            if let Err(e) = std::fs::write(sink, pid.to_string()) {
                tracing::warn!(error = %e, "failed to write prover job id to id-pipe");
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ProverError::Spawn(name, build_dir.to_path_buf(), e))?;
        if !status.success() {
            return Err(ProverError::NonZeroExit(name, build_dir.to_path_buf(), status));
        }
        Ok(())
    }

    fn read_proof(&self, build_dir: &Path) -> Result<GeneratedProof, ProverError> {
        let path = build_dir.join("proof.json");
        let raw = std::fs::read_to_string(&path).map_err(|e| ProverError::ReadProof(path.clone(), e))?;
        let parsed: ProofFile =
            serde_json::from_str(&raw).map_err(|e| ProverError::ParseProof(path.clone(), e))?;

        let inputs = parsed
            .inputs
            .iter()
            .map(|h| hex_to_fq(h))
            .collect::<Result<Vec<_>, _>>()?;

        let proof = Proof {
            a: [hex_to_u256(&parsed.proof.a[0])?, hex_to_u256(&parsed.proof.a[1])?],
            b: [
                [hex_to_u256(&parsed.proof.b[0][0])?, hex_to_u256(&parsed.proof.b[0][1])?],
                [hex_to_u256(&parsed.proof.b[1][0])?, hex_to_u256(&parsed.proof.b[1][1])?],
            ],
            c: [hex_to_u256(&parsed.proof.c[0])?, hex_to_u256(&parsed.proof.c[1])?],
        };

        Ok(GeneratedProof { inputs, proof })
    }
}

fn hex_to_fq(s: &str) -> Result<Fq, ProverError> {
    fq_from_hex_be(s).map_err(|_| ProverError::MalformedFieldElement(s.to_string()))
}

fn hex_to_u256(s: &str) -> Result<U256, ProverError> {
    U256::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|_| ProverError::MalformedFieldElement(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_file_parses_original_shape() {
        let raw = r#"{
            "inputs": ["0x01", "0x2a"],
            "proof": {
                "a": ["0x1", "0x2"],
                "b": [["0x3", "0x4"], ["0x5", "0x6"]],
                "c": ["0x7", "0x8"]
            }
        }"#;
        let parsed: ProofFile = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.inputs, vec!["0x01", "0x2a"]);
        assert_eq!(parsed.proof.a, ["0x1", "0x2"]);
        assert_eq!(parsed.proof.b, [["0x3", "0x4"], ["0x5", "0x6"]]);
        assert_eq!(parsed.proof.c, ["0x7", "0x8"]);
    }

    #[test]
    fn hex_to_u256_strips_prefix() {
        assert_eq!(hex_to_u256("0x2a").unwrap(), U256::from(42u64));
        assert_eq!(hex_to_u256("2a").unwrap(), U256::from(42u64));
    }
}
