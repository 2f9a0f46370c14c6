#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! JSON-RPC transport to a bitcoin node.
//!
//! Implements [`transact::node::NodeClient`] over the node's HTTP JSON-RPC
//! interface so [`transact`] payment requests can run against a real wallet.
//!
//! # Modules
//!
//! - [`client`] - [`BitcoinClient`], the entry point for payment requests
//! - [`config`] - TOML client configuration with environment expansion
//! - [`constants`] - Header values, defaults and environment variable names
//! - [`endpoint`] - Service URL, credentials, timeout and TLS roots
//! - [`envelope`] - JSON-RPC request and response envelopes
//! - [`proxy`] - The connection: single calls, batches, method proxies
//!
//! # Feature Flags
//!
//! - `telemetry` - Request spans and wire-level `tracing` events

pub mod client;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod envelope;
mod node;
pub mod proxy;

pub use client::BitcoinClient;
pub use config::{ClientConfig, ConfigError};
pub use endpoint::{RpcEndpoint, TlsContext};
pub use envelope::RpcCall;
pub use proxy::{AuthServiceProxy, MethodProxy};
