//! JSON-RPC request and response envelopes.
//!
//! Single calls use the 1.1 envelope (`"version": "1.1"`) the node has always
//! accepted; batch entries use 2.0 (`"jsonrpc": "2.0"`). Responses are kept
//! as raw [`Value`]s so a present `"result": null` can be told apart from a
//! missing `result`.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use transact::amount;
use transact::error::{PARSE_ERROR, ProtocolError, RpcError, TransactError, ValidationError};

use crate::constants::{BATCH_VERSION, SINGLE_CALL_VERSION};

/// One entry of a batch: a method name and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    /// Dot-qualified method name.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

impl RpcCall {
    /// Creates a batch entry.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Appends a positional parameter.
    #[must_use]
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Appends a BTC amount, truncated to satoshi precision.
    ///
    /// Serializing a [`Decimal`] directly keeps every fractional digit; the
    /// node rejects amounts finer than one satoshi.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the amount cannot be encoded.
    pub fn amount(mut self, value: Decimal) -> Result<Self, ValidationError> {
        self.params.push(amount::to_json(value)?);
        Ok(self)
    }
}

impl<M: Into<String>> From<(M, Vec<Value>)> for RpcCall {
    fn from((method, params): (M, Vec<Value>)) -> Self {
        Self::new(method, params)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SingleRequest<'a> {
    version: &'static str,
    method: &'a str,
    params: &'a [Value],
    id: u64,
}

impl<'a> SingleRequest<'a> {
    pub(crate) const fn new(method: &'a str, params: &'a [Value], id: u64) -> Self {
        Self {
            version: SINGLE_CALL_VERSION,
            method,
            params,
            id,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchEntry<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a [Value],
    id: u64,
}

impl<'a> BatchEntry<'a> {
    pub(crate) fn new(call: &'a RpcCall, id: u64) -> Self {
        Self {
            jsonrpc: BATCH_VERSION,
            method: &call.method,
            params: &call.params,
            id,
        }
    }
}

/// Turns the `error` member of an envelope into an [`RpcError`].
fn rpc_error(error: &Value) -> RpcError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), str::to_owned);
    RpcError::new(code, message)
}

fn embedded_error(envelope: &Value) -> Option<RpcError> {
    envelope
        .get("error")
        .filter(|error| !error.is_null())
        .map(rpc_error)
}

/// Extracts `result` from a single response envelope.
///
/// A non-null `error` wins over `result`.
pub(crate) fn into_result(envelope: Value) -> Result<Value, TransactError> {
    if let Some(error) = embedded_error(&envelope) {
        return Err(error.into());
    }
    match envelope {
        Value::Object(mut members) => members
            .remove("result")
            .ok_or_else(|| ProtocolError::missing_result().into()),
        other => Err(ProtocolError::new(
            PARSE_ERROR,
            format!("response is not a JSON-RPC envelope: {other}"),
        )
        .into()),
    }
}

/// Extracts the results of a batch, ordered like `ids`.
///
/// The response list is walked in order and the first failing entry fails
/// the whole batch.
pub(crate) fn batch_results(response: Value, ids: &[u64]) -> Result<Vec<Value>, TransactError> {
    let entries = match response {
        Value::Array(entries) => entries,
        single => {
            return Err(match embedded_error(&single) {
                Some(error) => error.into(),
                None => ProtocolError::parse_error().into(),
            });
        }
    };
    if entries.len() != ids.len() {
        return Err(ProtocolError::new(
            PARSE_ERROR,
            format!(
                "batch of {} calls answered with {} responses",
                ids.len(),
                entries.len()
            ),
        )
        .into());
    }

    let mut slots: Vec<Option<Value>> = vec![None; ids.len()];
    for entry in entries {
        let id = entry.get("id").and_then(Value::as_u64);
        let result = into_result(entry)?;
        let slot = id
            .and_then(|id| ids.iter().position(|issued| *issued == id))
            .and_then(|position| slots.get_mut(position))
            .filter(|slot| slot.is_none())
            .ok_or_else(|| {
                ProtocolError::new(
                    PARSE_ERROR,
                    format!("unexpected or repeated id {id:?} in batch response"),
                )
            })?;
        *slot = Some(result);
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use transact::error::MISSING_RESULT;

    #[test]
    fn test_single_request_shape() {
        let params = [json!("bc1q"), json!(1)];
        let body = serde_json::to_value(SingleRequest::new("getreceivedbyaddress", &params, 7)).unwrap();
        assert_eq!(
            body,
            json!({"version": "1.1", "method": "getreceivedbyaddress", "params": ["bc1q", 1], "id": 7})
        );
    }

    #[test]
    fn test_batch_entry_shape() {
        let call = RpcCall::from(("getblockcount", vec![]));
        let body = serde_json::to_value(BatchEntry::new(&call, 3)).unwrap();
        assert_eq!(
            body,
            json!({"jsonrpc": "2.0", "method": "getblockcount", "params": [], "id": 3})
        );
    }

    #[test]
    fn test_amount_param_is_truncated() {
        let call = RpcCall::new("sendtoaddress", vec![])
            .param("bc1qdest")
            .amount(Decimal::new(123_456_789, 9))
            .unwrap();
        assert_eq!(call.params[0], json!("bc1qdest"));
        assert_eq!(call.params[1].to_string(), "0.12345678");
    }

    #[test]
    fn test_null_result_is_valid() {
        let result = into_result(json!({"result": null, "error": null, "id": 1})).unwrap();
        assert!(result.is_null());
    }

    #[test]
    fn test_missing_result() {
        let err = into_result(json!({"error": null, "id": 1})).unwrap_err();
        assert_eq!(err.code(), Some(MISSING_RESULT));
    }

    #[test]
    fn test_error_wins() {
        let err = into_result(json!({
            "result": null,
            "error": {"code": -5, "message": "Invalid address"},
            "id": 1
        }))
        .unwrap_err();
        match err {
            TransactError::Rpc(e) => {
                assert_eq!(e.code, -5);
                assert_eq!(e.message, "Invalid address");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_batch_reordered_by_id() {
        let response = json!([
            {"result": "b", "error": null, "id": 11},
            {"result": "a", "error": null, "id": 10},
        ]);
        let results = batch_results(response, &[10, 11]).unwrap();
        assert_eq!(results, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_batch_single_object() {
        let err = batch_results(json!({"result": null, "error": null, "id": null}), &[1]).unwrap_err();
        assert_eq!(err.code(), Some(PARSE_ERROR));

        let err = batch_results(
            json!({"result": null, "error": {"code": -32600, "message": "Invalid Request"}, "id": null}),
            &[1],
        )
        .unwrap_err();
        assert_eq!(err.code(), Some(-32600));
    }

    #[test]
    fn test_batch_rejects_foreign_or_repeated_ids() {
        let foreign = json!([{"result": 1, "error": null, "id": 99}]);
        assert!(matches!(
            batch_results(foreign, &[1]),
            Err(TransactError::Protocol(_))
        ));

        let repeated = json!([
            {"result": 1, "error": null, "id": 1},
            {"result": 2, "error": null, "id": 1},
        ]);
        assert!(matches!(
            batch_results(repeated, &[1, 2]),
            Err(TransactError::Protocol(_))
        ));
    }

    #[test]
    fn test_batch_length_mismatch() {
        let short = json!([{"result": 1, "error": null, "id": 1}]);
        assert!(matches!(
            batch_results(short, &[1, 2]),
            Err(TransactError::Protocol(_))
        ));
    }
}
