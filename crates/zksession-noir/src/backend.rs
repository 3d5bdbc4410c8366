//! [`ProofBackend`] over the `nargo` and `bb` command-line tools
//!
//! `execute` writes `Prover.toml` into the circuit package and runs
//! `nargo execute`; `prove` runs `bb prove` on the resulting witness and
//! reads the proof together with its public inputs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};
use zksession_core::{CircuitExecution, CircuitInputs, CircuitProof, ProofBackend, ProverError};

use crate::output::read_proof_dir;

/// Location of the compiled circuit and the tools used to prove it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoirConfig {
    /// Noir package directory (holds `Nargo.toml`)
    pub circuit_dir: PathBuf,
    /// Package name, which names `target/<name>.json`
    pub circuit_name: String,
    pub witness_name: String,
    pub nargo: String,
    pub bb: String,
}

impl Default for NoirConfig {
    fn default() -> Self {
        Self {
            circuit_dir: PathBuf::from("circuits/session"),
            circuit_name: "session".to_string(),
            witness_name: "witness".to_string(),
            nargo: "nargo".to_string(),
            bb: "bb".to_string(),
        }
    }
}

/// Proves session circuits by shelling out to `nargo` and `bb`
#[derive(Debug, Clone)]
pub struct NargoBackend {
    config: NoirConfig,
}

impl NargoBackend {
    pub fn new(config: NoirConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NoirConfig {
        &self.config
    }

    fn target_dir(&self) -> PathBuf {
        self.config.circuit_dir.join("target")
    }

    fn witness_path(&self) -> PathBuf {
        self.target_dir()
            .join(format!("{}.gz", self.config.witness_name))
    }

    fn bytecode_path(&self) -> PathBuf {
        self.target_dir()
            .join(format!("{}.json", self.config.circuit_name))
    }

    fn proof_dir(&self) -> PathBuf {
        self.target_dir().join("proof")
    }
}

/// Run a tool in `dir`, telling a missing binary apart from other IO errors
async fn run(program: &str, args: &[&str], dir: &Path) -> Result<Output, ProverError> {
    debug!(program, ?args, dir = %dir.display(), "Running prover tool");
    Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProverError::BinaryNotFound(program.to_string()),
            _ => ProverError::Io(e),
        })
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

impl ProofBackend for NargoBackend {
    async fn execute(&self, inputs: &CircuitInputs) -> Result<CircuitExecution, ProverError> {
        let prover_toml = inputs
            .to_prover_toml()
            .map_err(|e| ProverError::WitnessGeneration(e.to_string()))?;
        tokio::fs::write(self.config.circuit_dir.join("Prover.toml"), prover_toml).await?;

        let output = run(
            &self.config.nargo,
            &["execute", &self.config.witness_name],
            &self.config.circuit_dir,
        )
        .await?;
        if !output.status.success() {
            return Err(ProverError::WitnessGeneration(format!(
                "nargo execute failed: {}",
                stderr_of(&output)
            )));
        }

        let witness = tokio::fs::read(self.witness_path()).await?;
        info!(witness_bytes = witness.len(), "Circuit executed");
        Ok(CircuitExecution {
            witness,
            public_signals: Vec::new(),
        })
    }

    async fn prove(&self, execution: &CircuitExecution) -> Result<CircuitProof, ProverError> {
        let witness_path = self.witness_path();
        tokio::fs::create_dir_all(self.target_dir()).await?;
        tokio::fs::write(&witness_path, &execution.witness).await?;
        let proof_dir = self.proof_dir();
        tokio::fs::create_dir_all(&proof_dir).await?;

        let bytecode = self.bytecode_path().display().to_string();
        let witness = witness_path.display().to_string();
        let out = proof_dir.display().to_string();
        let output = run(
            &self.config.bb,
            &["prove", "-b", &bytecode, "-w", &witness, "-o", &out],
            &self.config.circuit_dir,
        )
        .await?;
        if !output.status.success() {
            return Err(ProverError::ProofGeneration(format!(
                "bb prove failed: {}",
                stderr_of(&output)
            )));
        }

        let (proof, public_signals) = read_proof_dir(&proof_dir).await?;
        info!(
            proof_bytes = proof.len(),
            public_signals = public_signals.len(),
            "Proof generated"
        );
        Ok(CircuitProof {
            proof,
            public_signals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};
    use zksession_core::{
        AddressAllowlist, CircuitInputBuilder, FieldElement, PublicChallenge, TransactionIntent,
        TreeConfig,
    };

    fn inputs() -> CircuitInputs {
        let recipient = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb1");
        let contracts = AddressAllowlist::from_addresses(TreeConfig::new(4), &[]).unwrap();
        let recipients = AddressAllowlist::from_addresses(TreeConfig::new(4), &[recipient]).unwrap();
        CircuitInputBuilder::new(&recipients, &contracts)
            .build(
                address!("1111111111111111111111111111111111111111"),
                address!("2222222222222222222222222222222222222222"),
                PublicChallenge::from_field(FieldElement::from_u64(9)),
                &[TransactionIntent::value_transfer(recipient, U256::from(5u64))],
            )
            .unwrap()
    }

    fn backend(dir: &Path) -> NargoBackend {
        NargoBackend::new(NoirConfig {
            circuit_dir: dir.to_path_buf(),
            nargo: "zksession-test-missing-nargo".to_string(),
            bb: "zksession-test-missing-bb".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_execute_writes_prover_toml_then_needs_nargo() {
        let dir = tempfile::tempdir().unwrap();
        let err = backend(dir.path()).execute(&inputs()).await.unwrap_err();
        assert!(matches!(err, ProverError::BinaryNotFound(ref name) if name == "zksession-test-missing-nargo"));

        let toml = std::fs::read_to_string(dir.path().join("Prover.toml")).unwrap();
        assert!(toml.contains("allowed_to_tree_root = "));
        assert!(toml.contains("op = \"0x9\""));
    }

    #[tokio::test]
    async fn test_prove_places_witness_then_needs_bb() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        let execution = CircuitExecution {
            witness: vec![0x1f, 0x8b, 0x08],
            public_signals: Vec::new(),
        };

        let err = backend.prove(&execution).await.unwrap_err();
        assert!(matches!(err, ProverError::BinaryNotFound(_)));
        assert_eq!(
            std::fs::read(dir.path().join("target/witness.gz")).unwrap(),
            vec![0x1f, 0x8b, 0x08]
        );
    }

    #[test]
    fn test_paths_follow_nargo_layout() {
        let backend = NargoBackend::new(NoirConfig::default());
        assert_eq!(
            backend.bytecode_path(),
            PathBuf::from("circuits/session/target/session.json")
        );
        assert_eq!(
            backend.witness_path(),
            PathBuf::from("circuits/session/target/witness.gz")
        );
    }
}
