//! [`NodeClient`] over JSON-RPC.
//!
//! Each trait method maps to one bitcoind wallet call; results are decoded
//! into the typed views from [`transact::node`]. A result of the wrong shape
//! is a [`ProtocolError`].

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use transact::amount;
use transact::error::{PARSE_ERROR, ProtocolError, TransactError};
use transact::node::{BoxFuture, NodeClient, SendToAddress, WalletTransaction};

use crate::proxy::AuthServiceProxy;

fn decode<T: DeserializeOwned>(method: &str, result: Value) -> Result<T, TransactError> {
    serde_json::from_value(result).map_err(|e| {
        ProtocolError::new(PARSE_ERROR, format!("unexpected {method} result: {e}")).into()
    })
}

impl NodeClient for AuthServiceProxy {
    fn get_new_address(&self) -> BoxFuture<'_, Result<String, TransactError>> {
        Box::pin(async move {
            let result = self.call("getnewaddress", Vec::new()).await?;
            decode("getnewaddress", result)
        })
    }

    fn get_received_by_address<'a>(
        &'a self,
        address: &'a str,
        min_conf: u32,
    ) -> BoxFuture<'a, Result<Decimal, TransactError>> {
        Box::pin(async move {
            let result = self
                .call(
                    "getreceivedbyaddress",
                    vec![Value::from(address), Value::from(min_conf)],
                )
                .await?;
            amount::from_json(&result).map_err(|e| {
                ProtocolError::new(
                    PARSE_ERROR,
                    format!("unexpected getreceivedbyaddress result: {e}"),
                )
                .into()
            })
        })
    }

    fn send_to_address<'a>(
        &'a self,
        request: &'a SendToAddress,
    ) -> BoxFuture<'a, Result<String, TransactError>> {
        Box::pin(async move {
            let params = request.to_params()?;
            let result = self.call("sendtoaddress", params).await?;
            decode("sendtoaddress", result)
        })
    }

    fn list_transactions<'a>(
        &'a self,
        label: &'a str,
        count: u32,
    ) -> BoxFuture<'a, Result<Vec<WalletTransaction>, TransactError>> {
        Box::pin(async move {
            let result = self
                .call(
                    "listtransactions",
                    vec![Value::from(label), Value::from(count)],
                )
                .await?;
            decode("listtransactions", result)
        })
    }

    fn get_transaction<'a>(
        &'a self,
        txid: &'a str,
    ) -> BoxFuture<'a, Result<WalletTransaction, TransactError>> {
        Box::pin(async move {
            let result = self.call("gettransaction", vec![Value::from(txid)]).await?;
            decode("gettransaction", result)
        })
    }
}
