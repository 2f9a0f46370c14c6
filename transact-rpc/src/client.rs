//! Entry point tying a transport to payment requests.

use std::time::Duration;

use rust_decimal::Decimal;
use transact::config::PaymentConfig;
use transact::error::{TransactError, ValidationError};
use transact::request::PaymentRequest;

use crate::config::ClientConfig;
use crate::endpoint::RpcEndpoint;
use crate::proxy::AuthServiceProxy;

/// Owns the RPC transport and issues payment requests that borrow it.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use transact::Decimal;
/// use transact_rpc::BitcoinClient;
///
/// # async fn run() -> Result<(), transact::TransactError> {
/// let mut client = BitcoinClient::new("127.0.0.1", 8332, "rpcuser", "rpcpass")?;
/// let request = client.request_payment(Decimal::new(1, 2), Duration::from_secs(600), 1)?;
/// let result = request.result().await;
/// if result.is_successful() {
///     result.refund("bc1qsender").await?;
/// }
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BitcoinClient {
    proxy: AuthServiceProxy,
    payment: PaymentConfig,
}

impl BitcoinClient {
    /// Connects to `http://host:port` with the given RPC credentials.
    ///
    /// # Errors
    ///
    /// Returns [`TransactError::Transport`] if the endpoint is invalid.
    pub fn new(host: &str, port: u16, user: &str, password: &str) -> Result<Self, TransactError> {
        Self::from_endpoint(RpcEndpoint::new(host, port, user, password)?)
    }

    /// Connects to an already configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransactError::Transport`] if the HTTP client cannot be built.
    pub fn from_endpoint(endpoint: RpcEndpoint) -> Result<Self, TransactError> {
        Ok(Self {
            proxy: AuthServiceProxy::new(endpoint)?,
            payment: PaymentConfig::default(),
        })
    }

    /// Builds a client from a loaded [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`TransactError::Transport`] if the endpoint or its TLS roots
    /// are invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransactError> {
        Ok(Self::from_endpoint(config.endpoint()?)?.with_payment_config(config.payment.clone()))
    }

    /// Replaces the payment tunables applied to new requests.
    #[must_use]
    pub fn with_payment_config(mut self, payment: PaymentConfig) -> Self {
        self.payment = payment;
        self
    }

    /// Payment tunables applied to new requests.
    #[must_use]
    pub const fn payment_config(&self) -> &PaymentConfig {
        &self.payment
    }

    /// Requests `quantity` BTC with `confirmations` confirmations within
    /// `expiration`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a non-positive quantity or a zero
    /// expiration. No network call is made.
    pub fn request_payment(
        &self,
        quantity: Decimal,
        expiration: Duration,
        confirmations: u32,
    ) -> Result<PaymentRequest<'_, AuthServiceProxy>, ValidationError> {
        Ok(PaymentRequest::new(&self.proxy, quantity, expiration, confirmations)?
            .with_config(&self.payment))
    }

    /// Requests `quantity` BTC using the configured expiration and
    /// confirmations.
    ///
    /// # Errors
    ///
    /// See [`BitcoinClient::request_payment`].
    pub fn request(
        &self,
        quantity: Decimal,
    ) -> Result<PaymentRequest<'_, AuthServiceProxy>, ValidationError> {
        self.request_payment(
            quantity,
            self.payment.expiration(),
            self.payment.confirmations,
        )
    }

    /// The underlying transport, for calls outside the payment lifecycle.
    #[must_use]
    pub const fn proxy(&self) -> &AuthServiceProxy {
        &self.proxy
    }

    /// Releases the connection. Idempotent.
    pub fn close(&mut self) {
        self.proxy.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use transact::{ForwardOutcome, ForwardPolicy, PaymentState};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn json_reply(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/json")
    }

    async fn mount(server: &MockServer, rpc_method: &str, reply: &str) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(json_reply(reply))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> BitcoinClient {
        let addr = server.address();
        BitcoinClient::new(&addr.ip().to_string(), addr.port(), "rpcuser", "rpcpass")
            .unwrap()
            .with_payment_config(PaymentConfig {
                poll_interval_ms: 10,
                ..PaymentConfig::default()
            })
    }

    #[tokio::test]
    async fn test_funded_payment_with_forward_and_refund() {
        let server = MockServer::start().await;
        mount(&server, "getnewaddress", r#"{"result": "bc1qfresh", "error": null, "id": 1}"#).await;
        mount(&server, "getreceivedbyaddress", r#"{"result": 0.01000000, "error": null, "id": 2}"#).await;
        mount(&server, "sendtoaddress", r#"{"result": "f0rward", "error": null, "id": 3}"#).await;

        let client = client_for(&server);
        let forward = ForwardPolicy::percentage("bc1qforward", Decimal::from(25)).unwrap();
        let request = client
            .request_payment(Decimal::new(1, 2), Duration::from_secs(30), 1)
            .unwrap()
            .with_forward(forward);

        let result = request.result().await;
        assert!(result.is_successful(), "{}", result.message());
        assert_eq!(result.address(), "bc1qfresh");
        assert_eq!(result.address_balance(), Decimal::new(1, 2));
        assert_eq!(
            result.forward(),
            Some(&ForwardOutcome::Sent {
                txid: "f0rward".into(),
                amount: Decimal::new(25, 4),
            })
        );

        // 0.01 received, 0.0025 forwarded: a full refund no longer fits.
        let err = result.refund("bc1qsender").await.unwrap_err();
        assert!(matches!(err, TransactError::Validation(_)));

        let bodies: Vec<Value> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect();
        let sends: Vec<&Value> = bodies.iter().filter(|b| b["method"] == "sendtoaddress").collect();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0]["params"][0], "bc1qforward");
        assert_eq!(sends[0]["params"][1].to_string(), "0.0025");
    }

    #[tokio::test]
    async fn test_non_json_node_yields_failed_result() {
        let server = MockServer::start().await;
        mount(&server, "getnewaddress", r#"{"result": "bc1qfresh", "error": null, "id": 1}"#).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getreceivedbyaddress" })))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .request_payment(Decimal::new(1, 2), Duration::from_secs(30), 1)
            .unwrap()
            .result()
            .await;

        assert!(!result.is_successful());
        assert_eq!(result.state(), PaymentState::Aborted);
        assert!(result.message().contains("non-JSON"));
        assert!(matches!(
            result.refund("bc1qsender").await,
            Err(TransactError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_request_validates_without_network() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        assert!(client
            .request_payment(Decimal::ZERO, Duration::from_secs(30), 1)
            .is_err());
        assert!(client
            .request_payment(Decimal::ONE, Duration::ZERO, 1)
            .is_err());
        let request = client.request(Decimal::ONE).unwrap();
        assert_eq!(request.expiration(), Duration::from_secs(600));
        assert_eq!(request.required_confirmations(), 1);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_close_twice() {
        let mut client = BitcoinClient::new("127.0.0.1", 8332, "u", "p").unwrap();
        client.close();
        client.close();
        assert!(client.proxy().is_closed());
    }
}
