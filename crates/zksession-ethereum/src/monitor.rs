//! Submission and inclusion tracking
//!
//! Receipt polling is the only retry loop in the pipeline. The delay between
//! polls doubles up to a ceiling and the whole wait is bounded by a hard
//! timeout, so a stuck operation surfaces as an error instead of hanging.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::bundler::Bundler;
use crate::error::SubmissionError;
use crate::user_operation::UserOperation;

/// Floor for the delay between polls
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Receipt polling schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the second poll
    #[serde(with = "millis")]
    pub interval: Duration,
    /// Upper bound for the doubling delay
    #[serde(with = "millis")]
    pub max_interval: Duration,
    /// Give up after this long
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1_000),
            max_interval: Duration::from_millis(5_000),
            timeout: Duration::from_secs(120),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Final outcome of a user operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionReceipt {
    pub user_op_hash: B256,
    pub transaction_hash: B256,
    pub success: bool,
}

/// Submits operations and waits for their receipts
pub struct SubmissionMonitor<'a, B> {
    bundler: &'a B,
    entry_point: Address,
}

impl<'a, B: Bundler> SubmissionMonitor<'a, B> {
    pub fn new(bundler: &'a B, entry_point: Address) -> Self {
        Self {
            bundler,
            entry_point,
        }
    }

    /// Hand the operation to the bundler
    pub async fn submit(&self, operation: &UserOperation) -> Result<B256, SubmissionError> {
        Ok(self
            .bundler
            .send_user_operation(operation, self.entry_point)
            .await?)
    }

    /// Poll for the operation's receipt until it lands or `poll.timeout` passes
    ///
    /// Transport failures while polling are retried; JSON-RPC errors are not.
    /// A receipt request still pending at the deadline is abandoned.
    /// An included operation whose execution failed is reported as
    /// [`SubmissionError::Reverted`].
    #[instrument(skip(self, poll), fields(user_op_hash = %user_op_hash))]
    pub async fn await_inclusion(
        &self,
        user_op_hash: B256,
        poll: &PollConfig,
    ) -> Result<InclusionReceipt, SubmissionError> {
        let start = Instant::now();
        let mut delay = poll.interval.max(MIN_POLL_INTERVAL);

        loop {
            let remaining = poll.timeout.saturating_sub(start.elapsed());
            let outcome =
                tokio::time::timeout(remaining, self.bundler.user_operation_receipt(user_op_hash))
                    .await;
            match outcome {
                Err(_) => warn!("Receipt poll still pending at the deadline"),
                Ok(Ok(Some(receipt))) => {
                    let transaction_hash = receipt.transaction_hash();
                    if !receipt.success {
                        let reason = receipt
                            .reason
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "execution reverted".to_string());
                        warn!(%transaction_hash, %reason, "User operation reverted");
                        return Err(SubmissionError::Reverted {
                            transaction_hash,
                            reason,
                        });
                    }
                    info!(%transaction_hash, "User operation included");
                    return Ok(InclusionReceipt {
                        user_op_hash,
                        transaction_hash,
                        success: true,
                    });
                }
                Ok(Ok(None)) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Receipt not available yet")
                }
                Ok(Err(e)) if e.is_transient() => warn!(error = %e, "Receipt poll failed, retrying"),
                Ok(Err(e)) => return Err(e.into()),
            }

            let elapsed = start.elapsed();
            if elapsed >= poll.timeout {
                return Err(SubmissionError::Timeout {
                    user_op_hash,
                    elapsed_secs: elapsed.as_secs(),
                });
            }

            tokio::time::sleep(delay.min(poll.timeout - elapsed)).await;
            delay = (delay * 2).min(poll.max_interval);
        }
    }
}
