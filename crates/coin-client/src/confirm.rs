//! Confirmation helper

use std::time::Duration;

use coin_core::{ClientError, Commitment, TxSignature};

use crate::{timed, Broadcaster, Confirmation, Result};

/// Wait for `signature` to reach `commitment`.
///
/// A cluster-reported failure becomes `SubmissionFailed`; running out of
/// time, locally or on the cluster side, becomes `ConfirmationTimeout`.
pub async fn confirm_signature(
    broadcaster: &dyn Broadcaster,
    signature: &TxSignature,
    commitment: Commitment,
    timeout: Duration,
) -> Result<()> {
    tracing::debug!("Confirming {} at {}", signature, commitment);

    let outcome = match timed(timeout, broadcaster.confirm(signature, commitment)).await {
        Ok(outcome) => outcome,
        Err(ClientError::Timeout { .. }) => Confirmation::Timeout,
        Err(e) => return Err(e),
    };

    match outcome {
        Confirmation::Confirmed => {
            tracing::info!("Transaction {} confirmed", signature);
            Ok(())
        }
        Confirmation::Failed { reason } => {
            tracing::warn!("Transaction {} failed: {}", signature, reason);
            Err(ClientError::SubmissionFailed { message: reason })
        }
        Confirmation::Timeout => {
            tracing::warn!("Transaction {} not confirmed in time", signature);
            Err(ClientError::ConfirmationTimeout {
                signature: signature.to_string(),
            })
        }
    }
}
