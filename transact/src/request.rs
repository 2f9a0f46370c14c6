//! The payment lifecycle controller.
//!
//! A [`PaymentRequest`] walks one payment through its life:
//!
//! ```text
//! Created --assign address--> AddressAssigned --poll--> Funded | Expired
//!                                              \--cancel / node failing--> Aborted
//! ```
//!
//! The request borrows a [`NodeClient`] for its whole life and hands the
//! borrow on to the [`PaymentResult`] it produces, so several requests can
//! share one transport and be polled concurrently (`futures::join_all`,
//! `tokio::join!`). Within one request, polls are strictly sequential.
//!
//! # Timing
//!
//! Expiry is checked before every poll against a monotonic deadline. A
//! balance call already in flight when the deadline passes is allowed to
//! finish and its answer counts; the transport's request timeout bounds how
//! long that can take. The optional [`CancellationToken`] is raced against
//! both the in-flight call and the inter-poll delay and wins immediately.

use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::amount;
use crate::config::PaymentConfig;
use crate::error::{TransactError, ValidationError};
use crate::forward::ForwardPolicy;
use crate::node::NodeClient;
use crate::result::{ForwardOutcome, PaymentResult};
use crate::timestamp::UnixTimestamp;

/// Lifecycle state of a payment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentState {
    /// Validated, no address yet.
    Created,
    /// Address issued, waiting for funds.
    AddressAssigned,
    /// Required balance received with enough confirmations.
    Funded,
    /// Expiry reached before the balance was covered.
    Expired,
    /// Cancelled by the caller, or the node kept failing.
    Aborted,
}

impl PaymentState {
    /// Returns `true` for `Funded`, `Expired` and `Aborted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Funded | Self::Expired | Self::Aborted)
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::AddressAssigned => "address-assigned",
            Self::Funded => "funded",
            Self::Expired => "expired",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A request for a bitcoin payment to a fresh address within a time window.
pub struct PaymentRequest<'a, N: ?Sized> {
    node: &'a N,
    required_balance: Decimal,
    required_confirmations: u32,
    expiration: Duration,
    expires_at: UnixTimestamp,
    deadline: Instant,
    address: Option<String>,
    state: PaymentState,
    forward: Option<ForwardPolicy>,
    poll_interval: Duration,
    max_poll_failures: u32,
    conf_target: u32,
    cancel: CancellationToken,
}

impl<N: ?Sized> fmt::Debug for PaymentRequest<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("required_balance", &self.required_balance)
            .field("required_confirmations", &self.required_confirmations)
            .field("expires_at", &self.expires_at)
            .field("address", &self.address)
            .field("state", &self.state)
            .field("forward", &self.forward)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_failures", &self.max_poll_failures)
            .field("conf_target", &self.conf_target)
            .finish_non_exhaustive()
    }
}

impl<'a, N: NodeClient + ?Sized> PaymentRequest<'a, N> {
    /// Creates a request for `required_balance` BTC with `confirmations`
    /// confirmations, open for `expiration` from now.
    ///
    /// No network I/O happens until the address is assigned.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the balance is below one satoshi or
    /// the expiration is zero or too large to schedule.
    pub fn new(
        node: &'a N,
        required_balance: Decimal,
        expiration: Duration,
        confirmations: u32,
    ) -> Result<Self, ValidationError> {
        let required_balance = amount::quantize(required_balance);
        if required_balance <= Decimal::ZERO {
            return Err(ValidationError::new(format!(
                "required balance must be at least one satoshi, got {required_balance}"
            )));
        }
        if expiration.is_zero() {
            return Err(ValidationError::new("expiration must be greater than zero"));
        }
        let deadline = Instant::now()
            .checked_add(expiration)
            .ok_or_else(|| ValidationError::new(format!("expiration {expiration:?} is too large")))?;

        let defaults = PaymentConfig::default();
        Ok(Self {
            node,
            required_balance,
            required_confirmations: confirmations,
            expiration,
            expires_at: UnixTimestamp::now() + expiration,
            deadline,
            address: None,
            state: PaymentState::Created,
            forward: None,
            poll_interval: defaults.poll_interval(),
            max_poll_failures: defaults.max_poll_failures,
            conf_target: defaults.conf_target,
            cancel: CancellationToken::new(),
        })
    }

    /// Applies the poll cadence, failure budget and default forward
    /// confirmation target from `config`.
    #[must_use]
    pub const fn with_config(mut self, config: &PaymentConfig) -> Self {
        self.poll_interval = config.poll_interval();
        self.max_poll_failures = config.max_poll_failures;
        self.conf_target = config.conf_target;
        self
    }

    /// Attaches a forward policy, run once when the request is funded.
    #[must_use]
    pub fn with_forward(mut self, forward: ForwardPolicy) -> Self {
        self.forward = Some(forward);
        self
    }

    /// Sets the delay between two balance polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets how many consecutive failed polls are tolerated before aborting.
    #[must_use]
    pub const fn with_max_poll_failures(mut self, max: u32) -> Self {
        self.max_poll_failures = max;
        self
    }

    /// Aborts the poll loop as soon as `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Quantity requested, at satoshi precision.
    #[must_use]
    pub const fn required_balance(&self) -> Decimal {
        self.required_balance
    }

    /// Confirmations a transaction needs before its funds count.
    #[must_use]
    pub const fn required_confirmations(&self) -> u32 {
        self.required_confirmations
    }

    /// How long the request stays open.
    #[must_use]
    pub const fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Absolute expiry.
    #[must_use]
    pub const fn expires_at(&self) -> UnixTimestamp {
        self.expires_at
    }

    /// The assigned address, once [`PaymentRequest::assign_address`] has run.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PaymentState {
        self.state
    }

    /// Attached forward policy.
    #[must_use]
    pub const fn forward_policy(&self) -> Option<&ForwardPolicy> {
        self.forward.as_ref()
    }

    /// Asks the node for a fresh address. Runs once: later calls return the
    /// same address without touching the network.
    ///
    /// # Errors
    ///
    /// Returns the node's error if `getnewaddress` fails; the request stays
    /// `Created` and the call may be retried.
    pub async fn assign_address(&mut self) -> Result<&str, TransactError> {
        if self.address.is_none() {
            let address = self.node.get_new_address().await?;

            #[cfg(feature = "telemetry")]
            tracing::info!(
                address = %address,
                required = %self.required_balance,
                confirmations = self.required_confirmations,
                expires_at = %self.expires_at,
                "New payment request created"
            );

            self.address = Some(address);
            self.state = PaymentState::AddressAssigned;
        }
        Ok(self.address.as_deref().unwrap_or_default())
    }

    /// Assigns the address and returns the request, ready to be awaited with
    /// [`PaymentRequest::result`].
    ///
    /// # Errors
    ///
    /// Returns the node's error if `getnewaddress` fails.
    pub async fn open(mut self) -> Result<Self, TransactError> {
        self.assign_address().await?;
        Ok(self)
    }

    /// Polls until the request is funded, expires or is aborted, and returns
    /// the terminal result. Never fails: node errors end up in an
    /// unsuccessful result.
    pub async fn result(mut self) -> PaymentResult<'a, N> {
        let assigned = self.assign_address().await.map(str::to_owned);
        let address = match assigned {
            Ok(address) => address,
            Err(err) => {
                return self.finish(
                    String::new(),
                    PaymentState::Aborted,
                    format!("could not obtain a payment address: {err}"),
                );
            }
        };

        let mut failures: u32 = 0;
        loop {
            if Instant::now() >= self.deadline {
                let message = format!(
                    "payment request expired: {} BTC with {} confirmation(s) not received at {} within {}s",
                    self.required_balance,
                    self.required_confirmations,
                    address,
                    self.expiration.as_secs()
                );
                return self.finish(address, PaymentState::Expired, message);
            }

            let polled = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                polled = self.node.get_received_by_address(&address, self.required_confirmations) => Some(polled),
            };
            let Some(polled) = polled else {
                return self.finish(
                    address,
                    PaymentState::Aborted,
                    "payment request cancelled".to_owned(),
                );
            };

            match polled {
                Ok(balance) if balance >= self.required_balance => {
                    return self.fund(address, balance).await;
                }
                Ok(balance) => {
                    failures = 0;
                    #[cfg(feature = "telemetry")]
                    tracing::debug!(
                        address = %address,
                        balance = %balance,
                        required = %self.required_balance,
                        confirmations = self.required_confirmations,
                        "Waiting for payment"
                    );
                    #[cfg(not(feature = "telemetry"))]
                    let _ = balance;
                }
                Err(err) => {
                    failures += 1;
                    #[cfg(feature = "telemetry")]
                    tracing::warn!(
                        address = %address,
                        failures,
                        error = %err,
                        "Balance poll failed"
                    );
                    if failures > self.max_poll_failures {
                        return self.finish(
                            address,
                            PaymentState::Aborted,
                            format!("payment request aborted after {failures} failed poll(s): {err}"),
                        );
                    }
                }
            }

            let wake = Instant::now()
                .checked_add(self.poll_interval)
                .map_or(self.deadline, |next| next.min(self.deadline));
            let cancelled = tokio::select! {
                biased;
                () = self.cancel.cancelled() => true,
                () = tokio::time::sleep_until(wake) => false,
            };
            if cancelled {
                return self.finish(
                    address,
                    PaymentState::Aborted,
                    "payment request cancelled".to_owned(),
                );
            }
        }
    }

    /// Runs the forward policy, if any, and builds the successful result.
    async fn fund(mut self, address: String, balance: Decimal) -> PaymentResult<'a, N> {
        self.state = PaymentState::Funded;
        let forward = match self.forward.take() {
            Some(policy) if policy.conf_target().is_none() => {
                let policy = policy.with_conf_target(self.conf_target);
                Some(self.run_forward(&policy, balance).await)
            }
            Some(policy) => Some(self.run_forward(&policy, balance).await),
            None => None,
        };

        let received = format!("payment of {balance} BTC received at {address}");
        let message = match &forward {
            Some(ForwardOutcome::Sent { txid, amount }) => {
                format!("{received}; forwarded {amount} BTC in {txid}")
            }
            Some(ForwardOutcome::Failed { reason }) => {
                format!("{received}; forward failed: {reason}")
            }
            Some(ForwardOutcome::Skipped) | None => received,
        };

        #[cfg(feature = "telemetry")]
        tracing::info!(address = %address, balance = %balance, "Payment received");

        PaymentResult::new(
            self.node,
            address,
            PaymentState::Funded,
            message,
            balance,
            self.required_balance,
            self.expires_at,
            forward,
        )
    }

    async fn run_forward(&self, policy: &ForwardPolicy, balance: Decimal) -> ForwardOutcome {
        let amount = policy.forward_amount(self.required_balance);
        if amount.is_zero() {
            #[cfg(feature = "telemetry")]
            tracing::info!(to = %policy.address(), "Forward amount rounds to zero, skipping");
            return ForwardOutcome::Skipped;
        }
        match policy
            .dispatch(self.node, balance, self.required_balance)
            .await
        {
            Ok(txid) => ForwardOutcome::Sent { txid, amount },
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::error!(to = %policy.address(), error = %err, "Forward failed");
                ForwardOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Builds an unsuccessful result in `state`.
    fn finish(
        mut self,
        address: String,
        state: PaymentState,
        message: String,
    ) -> PaymentResult<'a, N> {
        self.state = state;

        #[cfg(feature = "telemetry")]
        tracing::info!(address = %address, state = %state, reason = %message, "Payment request ended");

        PaymentResult::new(
            self.node,
            address,
            state,
            message,
            Decimal::ZERO,
            self.required_balance,
            self.expires_at,
            None,
        )
    }
}
