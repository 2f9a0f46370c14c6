#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Payment request lifecycle for bitcoin wallets.
//!
//! This crate turns "please pay me X BTC within N seconds" into a small state
//! machine driven against a bitcoin node's wallet. It is transport-agnostic:
//! everything it needs from the node goes through the [`node::NodeClient`]
//! trait, which `transact-rpc` implements over JSON-RPC.
//!
//! # Overview
//!
//! A [`PaymentRequest`] asks the node for a fresh address, then polls the
//! balance received at that address (filtered by a confirmation threshold)
//! until it covers the requested quantity or the request expires. On success
//! an optional [`ForwardPolicy`] moves part of the funds elsewhere. The
//! lifecycle ends with exactly one [`PaymentResult`], which can later refund
//! the sender.
//!
//! # Modules
//!
//! - [`amount`] - Satoshi-precision decimal codec
//! - [`config`] - Tunables for payment requests
//! - [`error`] - Error taxonomy shared with the transport
//! - [`forward`] - Post-receipt fund forwarding
//! - [`node`] - Typed surface of the remote wallet
//! - [`request`] - The payment lifecycle controller
//! - [`result`] - Terminal outcome and refunds
//! - [`timestamp`] - Wall-clock expiry timestamps
//!
//! # Feature Flags
//!
//! - `telemetry` - Emits `tracing` events for address issuance, confirmation
//!   progress and terminal outcomes

pub mod amount;
pub mod config;
pub mod error;
pub mod forward;
pub mod node;
pub mod request;
pub mod result;
pub mod timestamp;

#[cfg(test)]
mod testing;

pub use error::TransactError;
pub use forward::ForwardPolicy;
pub use request::{PaymentRequest, PaymentState};
pub use result::{ForwardOutcome, PaymentResult};
pub use rust_decimal::Decimal;
