//! Typed surface of the remote bitcoin wallet.
//!
//! The payment lifecycle never builds JSON-RPC requests itself. It talks to
//! the node through [`NodeClient`], one async method per remote method it
//! consumes. `transact-rpc` implements the trait over HTTP; tests implement
//! it with scripted responses.
//!
//! All methods return [`BoxFuture`] so the trait stays object-safe and the
//! futures can be driven from any multi-threaded runtime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::amount;
use crate::config::DEFAULT_CONF_TARGET;
use crate::error::{TransactError, ValidationError};

/// A boxed, sendable future borrowing from `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Wallet operations the payment lifecycle needs from a bitcoin node.
pub trait NodeClient: Send + Sync {
    /// `getnewaddress`: issues a fresh receiving address.
    fn get_new_address(&self) -> BoxFuture<'_, Result<String, TransactError>>;

    /// `getreceivedbyaddress`: total received at `address` in transactions
    /// with at least `min_conf` confirmations.
    fn get_received_by_address<'a>(
        &'a self,
        address: &'a str,
        min_conf: u32,
    ) -> BoxFuture<'a, Result<Decimal, TransactError>>;

    /// `sendtoaddress`: sends funds and returns the transaction id.
    fn send_to_address<'a>(
        &'a self,
        request: &'a SendToAddress,
    ) -> BoxFuture<'a, Result<String, TransactError>>;

    /// `listtransactions`: the most recent `count` wallet entries matching `label`
    /// (`"*"` for all).
    fn list_transactions<'a>(
        &'a self,
        label: &'a str,
        count: u32,
    ) -> BoxFuture<'a, Result<Vec<WalletTransaction>, TransactError>>;

    /// `gettransaction`: details of one wallet transaction.
    fn get_transaction<'a>(
        &'a self,
        txid: &'a str,
    ) -> BoxFuture<'a, Result<WalletTransaction, TransactError>>;
}

impl<T: NodeClient + ?Sized> NodeClient for Arc<T> {
    fn get_new_address(&self) -> BoxFuture<'_, Result<String, TransactError>> {
        (**self).get_new_address()
    }

    fn get_received_by_address<'a>(
        &'a self,
        address: &'a str,
        min_conf: u32,
    ) -> BoxFuture<'a, Result<Decimal, TransactError>> {
        (**self).get_received_by_address(address, min_conf)
    }

    fn send_to_address<'a>(
        &'a self,
        request: &'a SendToAddress,
    ) -> BoxFuture<'a, Result<String, TransactError>> {
        (**self).send_to_address(request)
    }

    fn list_transactions<'a>(
        &'a self,
        label: &'a str,
        count: u32,
    ) -> BoxFuture<'a, Result<Vec<WalletTransaction>, TransactError>> {
        (**self).list_transactions(label, count)
    }

    fn get_transaction<'a>(
        &'a self,
        txid: &'a str,
    ) -> BoxFuture<'a, Result<WalletTransaction, TransactError>> {
        (**self).get_transaction(txid)
    }
}

/// Arguments of a `sendtoaddress` call.
///
/// The amount is quantized on construction and again when encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendToAddress {
    /// Destination address.
    pub address: String,
    /// Amount in BTC.
    pub amount: Decimal,
    /// Wallet-local comment.
    pub comment: String,
    /// Wallet-local name of the recipient.
    pub comment_to: String,
    /// Deduct the fee from `amount` instead of adding it on top.
    pub subtract_fee_from_amount: bool,
    /// Signal BIP-125 replace-by-fee.
    pub replaceable: bool,
    /// Confirmation target in blocks used for fee estimation.
    pub conf_target: u32,
}

impl SendToAddress {
    /// Creates a send of `amount` to `address` with the default confirmation target.
    #[must_use]
    pub fn new(address: impl Into<String>, amount: Decimal) -> Self {
        Self {
            address: address.into(),
            amount: amount::quantize(amount),
            comment: String::new(),
            comment_to: String::new(),
            subtract_fee_from_amount: false,
            replaceable: false,
            conf_target: DEFAULT_CONF_TARGET,
        }
    }

    /// Sets the wallet comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Sets the recipient comment.
    #[must_use]
    pub fn with_comment_to(mut self, comment_to: impl Into<String>) -> Self {
        self.comment_to = comment_to.into();
        self
    }

    /// Deducts the fee from the sent amount.
    #[must_use]
    pub const fn subtract_fee(mut self, subtract: bool) -> Self {
        self.subtract_fee_from_amount = subtract;
        self
    }

    /// Marks the transaction as replaceable.
    #[must_use]
    pub const fn replaceable(mut self, replaceable: bool) -> Self {
        self.replaceable = replaceable;
        self
    }

    /// Sets the confirmation target.
    #[must_use]
    pub const fn with_conf_target(mut self, conf_target: u32) -> Self {
        self.conf_target = conf_target;
        self
    }

    /// Encodes the positional parameters in `sendtoaddress` order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the amount cannot be encoded.
    pub fn to_params(&self) -> Result<Vec<Value>, ValidationError> {
        Ok(vec![
            Value::String(self.address.clone()),
            amount::to_json(self.amount)?,
            Value::String(self.comment.clone()),
            Value::String(self.comment_to.clone()),
            Value::Bool(self.subtract_fee_from_amount),
            Value::Bool(self.replaceable),
            Value::from(self.conf_target),
        ])
    }
}

/// A wallet transaction as reported by `listtransactions` or `gettransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// Transaction id.
    pub txid: String,
    /// Address involved, for `listtransactions` entries.
    #[serde(default)]
    pub address: Option<String>,
    /// `send`, `receive`, `generate`, `immature` or `orphan`.
    #[serde(default)]
    pub category: Option<String>,
    /// Amount in BTC; negative for sends.
    pub amount: Decimal,
    /// Fee in BTC (negative), for sends.
    #[serde(default)]
    pub fee: Option<Decimal>,
    /// Confirmations; negative when conflicted.
    #[serde(default)]
    pub confirmations: i64,
    /// Hash of the containing block, once mined.
    #[serde(default)]
    pub blockhash: Option<String>,
    /// Time the wallet first saw the transaction.
    #[serde(default)]
    pub time: Option<u64>,
    /// Per-output breakdown, for `gettransaction`.
    #[serde(default)]
    pub details: Vec<TransactionDetail>,
}

impl WalletTransaction {
    /// Returns `true` for incoming payments.
    #[must_use]
    pub fn is_receive(&self) -> bool {
        self.category.as_deref() == Some("receive")
    }

    /// Returns `true` if this entry (or one of its details) credits `address`.
    #[must_use]
    pub fn pays_to(&self, address: &str) -> bool {
        (self.is_receive() && self.address.as_deref() == Some(address))
            || self
                .details
                .iter()
                .any(|d| d.category == "receive" && d.address.as_deref() == Some(address))
    }
}

/// One output of a wallet transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    /// Address of the output.
    #[serde(default)]
    pub address: Option<String>,
    /// `send` or `receive`.
    pub category: String,
    /// Amount in BTC.
    pub amount: Decimal,
    /// Output index.
    #[serde(default)]
    pub vout: Option<u32>,
}
