//! Scripted [`NodeClient`] used by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::{TransactError, ValidationError};
use crate::node::{BoxFuture, NodeClient, SendToAddress, WalletTransaction};

/// Answers balance polls from a queue, then repeats `settled_balance`.
pub(crate) struct ScriptedNode {
    pub address: String,
    pub balances: Mutex<VecDeque<Result<Decimal, TransactError>>>,
    pub settled_balance: Decimal,
    pub poll_delay: Option<Duration>,
    pub address_error: Mutex<Option<TransactError>>,
    pub send_error: Mutex<Option<TransactError>>,
    pub transactions: Vec<WalletTransaction>,
    pub new_address_calls: AtomicUsize,
    pub polls: Mutex<Vec<(String, u32)>>,
    pub sends: Mutex<Vec<SendToAddress>>,
    pub listed: AtomicUsize,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self {
            address: "bc1qpaymentaddress".to_owned(),
            balances: Mutex::new(VecDeque::new()),
            settled_balance: Decimal::ZERO,
            poll_delay: None,
            address_error: Mutex::new(None),
            send_error: Mutex::new(None),
            transactions: Vec::new(),
            new_address_calls: AtomicUsize::new(0),
            polls: Mutex::new(Vec::new()),
            sends: Mutex::new(Vec::new()),
            listed: AtomicUsize::new(0),
        }
    }

    pub fn with_balances(self, balances: impl IntoIterator<Item = Decimal>) -> Self {
        self.balances
            .lock()
            .unwrap()
            .extend(balances.into_iter().map(Ok));
        self
    }

    pub fn with_poll_result(self, result: Result<Decimal, TransactError>) -> Self {
        self.balances.lock().unwrap().push_back(result);
        self
    }

    pub fn settled_at(mut self, balance: Decimal) -> Self {
        self.settled_balance = balance;
        self
    }

    /// Each balance poll takes `delay` before it answers.
    pub fn slow_polls(mut self, delay: Duration) -> Self {
        self.poll_delay = Some(delay);
        self
    }

    pub fn failing_address(self, error: TransactError) -> Self {
        *self.address_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_send(self, error: TransactError) -> Self {
        *self.send_error.lock().unwrap() = Some(error);
        self
    }

    pub fn poll_count(&self) -> usize {
        self.polls.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<SendToAddress> {
        self.sends.lock().unwrap().clone()
    }
}

impl NodeClient for ScriptedNode {
    fn get_new_address(&self) -> BoxFuture<'_, Result<String, TransactError>> {
        self.new_address_calls.fetch_add(1, Ordering::SeqCst);
        let result = match self.address_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(self.address.clone()),
        };
        Box::pin(async move { result })
    }

    fn get_received_by_address<'a>(
        &'a self,
        address: &'a str,
        min_conf: u32,
    ) -> BoxFuture<'a, Result<Decimal, TransactError>> {
        self.polls
            .lock()
            .unwrap()
            .push((address.to_owned(), min_conf));
        let next = self
            .balances
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.settled_balance));
        let delay = self.poll_delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            next
        })
    }

    fn send_to_address<'a>(
        &'a self,
        request: &'a SendToAddress,
    ) -> BoxFuture<'a, Result<String, TransactError>> {
        let result = match self.send_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => {
                let mut sends = self.sends.lock().unwrap();
                sends.push(request.clone());
                Ok(format!("txid-{}", sends.len()))
            }
        };
        Box::pin(async move { result })
    }

    fn list_transactions<'a>(
        &'a self,
        _label: &'a str,
        count: u32,
    ) -> BoxFuture<'a, Result<Vec<WalletTransaction>, TransactError>> {
        self.listed.fetch_add(1, Ordering::SeqCst);
        let listed = self
            .transactions
            .iter()
            .take(count as usize)
            .cloned()
            .collect();
        Box::pin(async move { Ok(listed) })
    }

    fn get_transaction<'a>(
        &'a self,
        txid: &'a str,
    ) -> BoxFuture<'a, Result<WalletTransaction, TransactError>> {
        let found = self
            .transactions
            .iter()
            .find(|tx| tx.txid == txid)
            .cloned()
            .ok_or_else(|| ValidationError::new(format!("unknown txid {txid}")).into());
        Box::pin(async move { found })
    }
}
