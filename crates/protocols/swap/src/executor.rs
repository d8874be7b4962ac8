//! Swap execution
//!
//! Signs, submits and confirms what the composer produced. Two-transaction
//! routes confirm the first leg before the second is even quoted, and size
//! the second leg by the reserve the first actually delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use coin_client::{confirm_signature, timed, SubmitVia};
use coin_core::{Address, ClientError, RawAmount, TxSignature, ValidationError};
use coin_tx::UnsignedTransaction;

use crate::composer::{fail_legs, SwapComposer};
use crate::progress::SwapProgress;
use crate::recovery::{PendingSecondLeg, UnconfirmedFirstLeg};
use crate::route::SwapRoute;
use crate::state::{SwapError, SwapOutcome, SwapRequest};

/// Shared cancellation flag, checked before each signing step
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct SwapExecutor {
    composer: SwapComposer,
}

impl SwapExecutor {
    pub fn new(composer: SwapComposer) -> Self {
        Self { composer }
    }

    pub fn composer(&self) -> &SwapComposer {
        &self.composer
    }

    /// Execute a swap end to end. No step is retried internally.
    pub async fn execute_swap(
        &self,
        request: &SwapRequest,
        cancel: &CancelFlag,
    ) -> Result<SwapOutcome, SwapError> {
        request.validate().map_err(SwapError::validation)?;
        let user = self.composer.services().signer.address();

        if cancel.is_cancelled() {
            return Err(cancelled_before_start(request, &self.composer));
        }

        let composed = self.composer.compose(request, &user).await?;
        let route = composed.route;
        let deferred = composed.deferred_leg().cloned();
        let mut progress = composed.progress;
        let mut first_signature = None;

        for planned in &composed.transactions {
            let sent = self
                .sign_send_confirm(
                    &planned.transaction,
                    planned.submit_via,
                    &planned.legs,
                    &mut progress,
                    Some(cancel),
                )
                .await;
            match sent {
                Ok(signature) => {
                    first_signature.get_or_insert(signature);
                }
                Err(e) => {
                    // A sent first leg may still land; keep what settling it needs
                    let unconfirmed = match (&deferred, progress.legs()[0].signature()) {
                        (Some(leg), Some(signature))
                            if !matches!(e, ClientError::SubmissionFailed { .. }) =>
                        {
                            Some(UnconfirmedFirstLeg {
                                leg: leg.clone(),
                                first_leg_signature: signature.clone(),
                                user: user.clone(),
                                reserve_balance_before: composed.reserve_balance_before,
                                minimum_output: composed.minimum_output,
                            })
                        }
                        _ => None,
                    };
                    return Err(
                        SwapError::from_progress(progress, &e, None).with_unconfirmed(unconfirmed)
                    );
                }
            }
        }

        let mut output_amount = composed.expected_output;

        if let (Some(leg), Some(first_leg_signature)) = (deferred, first_signature) {
            let amount = self
                .realised_reserve(&user, composed.reserve_balance_before, composed.minimum_output)
                .await;
            let pending = PendingSecondLeg {
                leg,
                amount,
                first_leg_signature,
                user: user.clone(),
            };
            tracing::info!(
                "First leg confirmed, {} {} available for second leg",
                pending.amount,
                pending.leg.input.symbol
            );

            // The first leg has landed: cancellation no longer applies
            let second = self.run_second_leg(&pending, &mut progress, 1, None).await;
            output_amount = match second {
                Ok(amount) => amount,
                Err(e) => return Err(SwapError::from_progress(progress, &e, Some(pending))),
            };
        }

        tracing::info!("Swap complete via {}", route);
        Ok(SwapOutcome {
            route,
            signatures: progress.signatures(),
            input_amount: composed.input_amount,
            output_amount,
            progress,
        })
    }

    /// Execute only the second leg of an interrupted mixed route
    pub async fn resume_second_leg(
        &self,
        pending: &PendingSecondLeg,
        cancel: &CancelFlag,
    ) -> Result<SwapOutcome, SwapError> {
        let user = self.composer.services().signer.address();
        if user != pending.user {
            return Err(SwapError::validation(ValidationError::InvalidAddress {
                address: pending.user.to_string(),
            }));
        }
        if pending.amount == 0 {
            return Err(SwapError::validation(ValidationError::ZeroAmount));
        }

        tracing::info!(
            "Resuming second leg after {} with {} {}",
            pending.first_leg_signature,
            pending.amount,
            pending.leg.input.symbol
        );
        let mut progress = SwapProgress::new(
            SwapRoute::MixedAggregatorAndBondingCurve,
            [pending.leg.venue],
        );
        let second = self
            .run_second_leg(pending, &mut progress, 0, Some(cancel))
            .await;
        let output_amount = match second {
            Ok(amount) => amount,
            Err(e) => return Err(SwapError::from_progress(progress, &e, Some(pending.clone()))),
        };

        let mut signatures = vec![pending.first_leg_signature.clone()];
        signatures.extend(progress.signatures());
        Ok(SwapOutcome {
            route: SwapRoute::MixedAggregatorAndBondingCurve,
            signatures,
            input_amount: pending.amount,
            output_amount,
            progress,
        })
    }

    /// Re-check the first leg of a mixed route that was sent but not seen
    /// confirmed. Returns the resume record once it is confirmed and `None`
    /// while it is still pending. A first leg that failed on chain moved
    /// nothing, so that is reported as `SubmissionFailed`.
    pub async fn settle_first_leg(
        &self,
        unconfirmed: &UnconfirmedFirstLeg,
    ) -> Result<Option<PendingSecondLeg>, ClientError> {
        let settings = self.composer.settings();
        let confirmed = confirm_signature(
            self.composer.services().broadcaster.as_ref(),
            &unconfirmed.first_leg_signature,
            settings.commitment,
            settings.confirm_timeout,
        )
        .await;
        match confirmed {
            Ok(()) => {}
            Err(ClientError::ConfirmationTimeout { .. }) => {
                tracing::debug!("{} still unconfirmed", unconfirmed.first_leg_signature);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        let amount = self
            .realised_reserve(
                &unconfirmed.user,
                unconfirmed.reserve_balance_before,
                unconfirmed.minimum_output,
            )
            .await;
        tracing::info!(
            "First leg {} settled, {} {} available for second leg",
            unconfirmed.first_leg_signature,
            amount,
            unconfirmed.leg.input.symbol
        );
        Ok(Some(unconfirmed.clone().into_pending(amount)))
    }

    /// Re-check legs that were sent but never confirmed. Returns whether the
    /// whole attempt is now confirmed. Never resubmits anything.
    pub async fn confirm_pending(&self, progress: &mut SwapProgress) -> Result<bool, ClientError> {
        let settings = self.composer.settings();
        let broadcaster = self.composer.services().broadcaster.as_ref();

        for signature in progress.signatures() {
            let legs: Vec<usize> = progress
                .legs()
                .iter()
                .enumerate()
                .filter(|(_, leg)| leg.signature() == Some(&signature) && !leg.is_confirmed())
                .map(|(i, _)| i)
                .collect();
            if legs.is_empty() {
                continue;
            }

            match confirm_signature(
                broadcaster,
                &signature,
                settings.commitment,
                settings.confirm_timeout,
            )
            .await
            {
                Ok(()) => {
                    for &i in &legs {
                        let leg = progress.leg_mut(i);
                        leg.reopen_sent();
                        leg.confirmed();
                    }
                }
                Err(ClientError::ConfirmationTimeout { .. }) => {
                    tracing::debug!("{} still unconfirmed", signature);
                }
                Err(ClientError::SubmissionFailed { message }) => {
                    for &i in &legs {
                        progress.leg_mut(i).fail(message.clone());
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(progress.is_complete())
    }

    /// Quote, build, sign, send and confirm the reserve-funded leg
    async fn run_second_leg(
        &self,
        pending: &PendingSecondLeg,
        progress: &mut SwapProgress,
        index: usize,
        cancel: Option<&CancelFlag>,
    ) -> Result<RawAmount, ClientError> {
        let quote = self
            .composer
            .quote_leg(&pending.leg, pending.amount, progress.leg_mut(index))
            .await?;
        let transaction = self
            .composer
            .build_leg(&quote, &pending.user)
            .await
            .map_err(|e| fail_legs(progress, &[index], e))?;
        progress.leg_mut(index).built();

        self.sign_send_confirm(
            &transaction,
            pending.leg.submit_via(),
            &[index],
            progress,
            cancel,
        )
        .await?;
        Ok(quote.out_amount)
    }

    async fn sign_send_confirm(
        &self,
        transaction: &UnsignedTransaction,
        via: SubmitVia,
        legs: &[usize],
        progress: &mut SwapProgress,
        cancel: Option<&CancelFlag>,
    ) -> Result<TxSignature, ClientError> {
        let services = self.composer.services();
        let settings = self.composer.settings();

        if cancel.is_some_and(CancelFlag::is_cancelled) {
            tracing::info!("Swap cancelled before signing");
            for &i in legs {
                progress.leg_mut(i).cancel();
            }
            return Err(ClientError::UserRejected);
        }

        let signed = match timed(settings.request_timeout, services.signer.sign(transaction)).await {
            Ok(signed) => signed,
            Err(e) if e.is_user_rejection() => {
                tracing::info!("User rejected signing");
                for &i in legs {
                    progress.leg_mut(i).cancel();
                }
                return Err(e);
            }
            Err(e) => return Err(fail_legs(progress, legs, e)),
        };
        for &i in legs {
            progress.leg_mut(i).signed();
        }

        let signature = timed(settings.request_timeout, services.broadcaster.send(&signed, via))
            .await
            .map_err(|e| fail_legs(progress, legs, e))?;
        tracing::info!("Sent {} via {:?}", signature, via);
        for &i in legs {
            progress.leg_mut(i).sent(signature.clone());
        }

        confirm_signature(
            services.broadcaster.as_ref(),
            &signature,
            settings.commitment,
            settings.confirm_timeout,
        )
        .await
        .map_err(|e| fail_legs(progress, legs, e))?;
        for &i in legs {
            progress.leg_mut(i).confirmed();
        }
        Ok(signature)
    }

    /// Reserve delivered by the first leg: the balance delta, or the quoted
    /// minimum when the delta cannot be measured
    async fn realised_reserve(
        &self,
        user: &Address,
        before: Option<RawAmount>,
        minimum: RawAmount,
    ) -> RawAmount {
        let settings = self.composer.settings();
        let reserve = &self.composer.context().reserve.token_id;
        let after = timed(
            settings.request_timeout,
            self.composer
                .services()
                .broadcaster
                .token_balance(user, reserve, settings.commitment),
        )
        .await;

        match (before, after) {
            (Some(before), Ok(after)) if after > before => after - before,
            (_, Ok(_)) => {
                tracing::warn!("No reserve balance increase observed, using quoted minimum {}", minimum);
                minimum
            }
            (_, Err(e)) => {
                tracing::warn!("Failed to read reserve balance ({}), using quoted minimum {}", e, minimum);
                minimum
            }
        }
    }
}

fn cancelled_before_start(request: &SwapRequest, composer: &SwapComposer) -> SwapError {
    let route = crate::route::classify(
        &request.pair.input.token_id,
        &request.pair.output.token_id,
        composer.context(),
    );
    let plans = crate::route::plan_legs(route, &request.pair, composer.context());
    let mut progress = SwapProgress::new(route, plans.iter().map(|p| p.venue));
    for i in 0..plans.len() {
        progress.leg_mut(i).cancel();
    }
    SwapError::from_progress(progress, &ClientError::UserRejected, None)
}
