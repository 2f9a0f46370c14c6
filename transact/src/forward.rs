//! Post-receipt fund forwarding.
//!
//! A [`ForwardPolicy`] is attached to a payment request and runs once, right
//! after the request is funded. It sends either a fixed quantity or a
//! percentage of the *requested* quantity to another address.

use rust_decimal::Decimal;

use crate::amount;
use crate::config::DEFAULT_CONF_TARGET;
use crate::error::{TransactError, ValidationError};
use crate::node::{NodeClient, SendToAddress};

/// How much a [`ForwardPolicy`] moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardAmount {
    /// A fixed BTC quantity.
    Fixed(Decimal),
    /// A fraction of the requested quantity, normalized to `0..=1`.
    Fraction(Decimal),
}

/// Forwards part of a received payment to a second address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardPolicy {
    address: String,
    amount: ForwardAmount,
    conf_target: Option<u32>,
}

impl ForwardPolicy {
    /// Builds a policy from exactly one of `quantity` or `percentage` (`0..=100`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if both or neither are set, if the
    /// percentage is out of range, if the quantity is not positive, or if
    /// the address is empty.
    pub fn new(
        address: impl Into<String>,
        quantity: Option<Decimal>,
        percentage: Option<Decimal>,
    ) -> Result<Self, ValidationError> {
        let amount = match (quantity, percentage) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::new(
                    "both a BTC quantity and a percentage cannot be specified",
                ));
            }
            (None, None) => {
                return Err(ValidationError::new(
                    "a BTC quantity or a percentage to forward must be specified",
                ));
            }
            (Some(quantity), None) => {
                let quantized = amount::quantize(quantity);
                if quantized <= Decimal::ZERO {
                    return Err(ValidationError::new(format!(
                        "forward quantity must be at least one satoshi, got {quantity}"
                    )));
                }
                ForwardAmount::Fixed(quantized)
            }
            (None, Some(percentage)) => {
                if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
                    return Err(ValidationError::new(format!(
                        "'{percentage}' is not a valid percentage"
                    )));
                }
                ForwardAmount::Fraction(percentage / Decimal::ONE_HUNDRED)
            }
        };

        let address = address.into();
        if address.trim().is_empty() {
            return Err(ValidationError::new("forward address must not be empty"));
        }

        Ok(Self {
            address,
            amount,
            conf_target: None,
        })
    }

    /// Forwards a fixed quantity.
    ///
    /// # Errors
    ///
    /// See [`ForwardPolicy::new`].
    pub fn fixed(address: impl Into<String>, quantity: Decimal) -> Result<Self, ValidationError> {
        Self::new(address, Some(quantity), None)
    }

    /// Forwards a percentage (`0..=100`) of the requested quantity.
    ///
    /// # Errors
    ///
    /// See [`ForwardPolicy::new`].
    pub fn percentage(
        address: impl Into<String>,
        percentage: Decimal,
    ) -> Result<Self, ValidationError> {
        Self::new(address, None, Some(percentage))
    }

    /// Sets the confirmation target attached to the forward transaction.
    /// Without one, the request's configured target applies (6 by default).
    #[must_use]
    pub const fn with_conf_target(mut self, conf_target: u32) -> Self {
        self.conf_target = Some(conf_target);
        self
    }

    /// Destination of forwarded funds.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The configured amount.
    #[must_use]
    pub const fn amount(&self) -> ForwardAmount {
        self.amount
    }

    /// Confirmation target set on this policy, if any.
    #[must_use]
    pub const fn conf_target(&self) -> Option<u32> {
        self.conf_target
    }

    /// Quantity forwarded for a request of `requested` BTC, at satoshi precision.
    #[must_use]
    pub fn forward_amount(&self, requested: Decimal) -> Decimal {
        match self.amount {
            ForwardAmount::Fixed(quantity) => quantity,
            ForwardAmount::Fraction(fraction) => amount::quantize(requested * fraction),
        }
    }

    /// Sends the forward amount out of a balance of `balance` BTC.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the forward amount is zero or exceeds
    /// `balance`, or the node's error if the send fails.
    pub async fn dispatch<N: NodeClient + ?Sized>(
        &self,
        node: &N,
        balance: Decimal,
        requested: Decimal,
    ) -> Result<String, TransactError> {
        let forward = self.forward_amount(requested);
        if forward.is_zero() {
            return Err(ValidationError::new("forward amount rounds to zero").into());
        }
        if forward > balance {
            return Err(ValidationError::insufficient_funds("forward", forward, balance).into());
        }

        let send = SendToAddress::new(self.address.clone(), forward)
            .with_conf_target(self.conf_target.unwrap_or(DEFAULT_CONF_TARGET));
        let txid = node.send_to_address(&send).await?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            to = %self.address,
            amount = %forward,
            txid = %txid,
            "Forwarded payment"
        );

        Ok(txid)
    }
}
