//! Reading `bb` output files

use alloy_primitives::{Bytes, U256};
use std::path::Path;
use zksession_core::ProverError;

const FIELD_BYTES: usize = 32;

/// Split a `public_inputs` file into 32-byte big-endian field elements
pub fn parse_public_inputs(raw: &[u8]) -> Result<Vec<U256>, ProverError> {
    if raw.len() % FIELD_BYTES != 0 {
        return Err(ProverError::InvalidOutput(format!(
            "public inputs length {} is not a multiple of {}",
            raw.len(),
            FIELD_BYTES
        )));
    }
    Ok(raw.chunks_exact(FIELD_BYTES).map(U256::from_be_slice).collect())
}

/// Read `proof` and `public_inputs` from a `bb prove` output directory
pub async fn read_proof_dir(dir: &Path) -> Result<(Bytes, Vec<U256>), ProverError> {
    let proof = read_output(&dir.join("proof")).await?;
    if proof.is_empty() {
        return Err(ProverError::InvalidOutput("empty proof file".to_string()));
    }
    let public_inputs = read_output(&dir.join("public_inputs")).await?;
    Ok((proof.into(), parse_public_inputs(&public_inputs)?))
}

async fn read_output(path: &Path) -> Result<Vec<u8>, ProverError> {
    tokio::fs::read(path).await.map_err(|e| {
        ProverError::InvalidOutput(format!("cannot read {}: {}", path.display(), e))
    })
}
