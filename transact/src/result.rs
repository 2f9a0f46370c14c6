//! Terminal outcome of a payment request.
//!
//! A [`PaymentResult`] is produced exactly once, when a
//! [`PaymentRequest`](crate::PaymentRequest) reaches a terminal state. It is
//! immutable and borrows the node client it was created with, which it only
//! uses again to issue a refund or look up wallet transactions.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;

use crate::amount;
use crate::config::DEFAULT_CONF_TARGET;
use crate::error::{InvalidOperationError, TransactError, ValidationError};
use crate::node::{NodeClient, SendToAddress, WalletTransaction};
use crate::request::PaymentState;
use crate::timestamp::UnixTimestamp;

/// What happened to the forward policy of a funded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The forward transaction was broadcast.
    Sent {
        /// Transaction id of the forward.
        txid: String,
        /// Quantity forwarded.
        amount: Decimal,
    },
    /// The forward amount rounded to zero, nothing was sent.
    Skipped,
    /// The forward could not be sent; the payment itself still succeeded.
    Failed {
        /// Why the forward failed.
        reason: String,
    },
}

impl ForwardOutcome {
    /// Quantity that actually left the wallet through the forward.
    #[must_use]
    pub const fn forwarded(&self) -> Decimal {
        match self {
            Self::Sent { amount, .. } => *amount,
            Self::Skipped | Self::Failed { .. } => Decimal::ZERO,
        }
    }
}

/// The single, final outcome of a payment request.
pub struct PaymentResult<'a, N: ?Sized> {
    address: String,
    state: PaymentState,
    message: String,
    address_balance: Decimal,
    requested: Decimal,
    expires_at: UnixTimestamp,
    forward: Option<ForwardOutcome>,
    refunded: AtomicBool,
    node: &'a N,
}

impl<N: ?Sized> fmt::Debug for PaymentResult<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentResult")
            .field("address", &self.address)
            .field("state", &self.state)
            .field("message", &self.message)
            .field("address_balance", &self.address_balance)
            .field("requested", &self.requested)
            .field("expires_at", &self.expires_at)
            .field("forward", &self.forward)
            .field("refunded", &self.refunded.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<'a, N: NodeClient + ?Sized> PaymentResult<'a, N> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        node: &'a N,
        address: String,
        state: PaymentState,
        message: String,
        address_balance: Decimal,
        requested: Decimal,
        expires_at: UnixTimestamp,
        forward: Option<ForwardOutcome>,
    ) -> Self {
        debug_assert!(state.is_terminal(), "result built from non-terminal state");
        Self {
            address,
            state,
            message,
            address_balance,
            requested,
            expires_at,
            forward,
            refunded: AtomicBool::new(false),
            node,
        }
    }

    /// Address the payment was requested at.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// `true` only when the request was funded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.state == PaymentState::Funded
    }

    /// Terminal state the request ended in.
    #[must_use]
    pub const fn state(&self) -> PaymentState {
        self.state
    }

    /// Human-readable explanation of the outcome.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Balance observed at the address when the request was funded; zero otherwise.
    ///
    /// Forwarded funds are not subtracted.
    #[must_use]
    pub const fn address_balance(&self) -> Decimal {
        self.address_balance
    }

    /// Quantity originally requested.
    #[must_use]
    pub const fn requested(&self) -> Decimal {
        self.requested
    }

    /// Absolute expiry of the request.
    #[must_use]
    pub const fn expires_at(&self) -> UnixTimestamp {
        self.expires_at
    }

    /// Forward outcome, when a forward policy was attached and the request was funded.
    #[must_use]
    pub const fn forward(&self) -> Option<&ForwardOutcome> {
        self.forward.as_ref()
    }

    /// Returns `true` once a refund has been broadcast.
    #[must_use]
    pub fn is_refunded(&self) -> bool {
        self.refunded.load(Ordering::Acquire)
    }

    /// Refunds the requested quantity to `to_address` with the default
    /// confirmation target (6 blocks).
    ///
    /// # Errors
    ///
    /// See [`PaymentResult::refund_with_target`].
    pub async fn refund(&self, to_address: &str) -> Result<String, TransactError> {
        self.refund_with_target(to_address, DEFAULT_CONF_TARGET)
            .await
    }

    /// Refunds the requested quantity (not the observed balance) to `to_address`.
    ///
    /// At most one refund is issued per result. A refund whose send fails
    /// may be retried.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOperationError`] if the request was not funded or was
    /// already refunded (no network call is made), [`ValidationError`] if the
    /// balance left after forwarding cannot cover the refund, or the node's
    /// error if the send fails.
    pub async fn refund_with_target(
        &self,
        to_address: &str,
        conf_target: u32,
    ) -> Result<String, TransactError> {
        if !self.is_successful() {
            return Err(InvalidOperationError::new(format!(
                "cannot refund a payment request that ended {}",
                self.state
            ))
            .into());
        }

        let refund = amount::quantize(self.requested);
        let available = self.address_balance - self.forwarded();
        if refund > available {
            return Err(ValidationError::insufficient_funds("refund", refund, available).into());
        }

        if self
            .refunded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(InvalidOperationError::new("payment was already refunded").into());
        }

        let send = SendToAddress::new(to_address, refund).with_conf_target(conf_target);
        match self.node.send_to_address(&send).await {
            Ok(txid) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(
                    address = %self.address,
                    to = %to_address,
                    amount = %refund,
                    txid = %txid,
                    "Refunded payment"
                );
                Ok(txid)
            }
            Err(err) => {
                self.refunded.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    /// Wallet `receive` entries crediting this result's address, searched
    /// among the `count` most recent wallet transactions.
    ///
    /// # Errors
    ///
    /// Returns the node's error if `listtransactions` fails.
    pub async fn incoming_transactions(
        &self,
        count: u32,
    ) -> Result<Vec<WalletTransaction>, TransactError> {
        let listed = self.node.list_transactions("*", count).await?;
        Ok(listed
            .into_iter()
            .filter(|tx| tx.pays_to(&self.address))
            .collect())
    }

    /// Looks up a wallet transaction, e.g. a forward or refund, by id.
    ///
    /// # Errors
    ///
    /// Returns the node's error if `gettransaction` fails.
    pub async fn transaction(&self, txid: &str) -> Result<WalletTransaction, TransactError> {
        self.node.get_transaction(txid).await
    }

    fn forwarded(&self) -> Decimal {
        self.forward
            .as_ref()
            .map_or(Decimal::ZERO, ForwardOutcome::forwarded)
    }
}
