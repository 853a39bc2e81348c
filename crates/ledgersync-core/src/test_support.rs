//! In-memory stand-in for the remote store, used by unit tests

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::models::{
    wire_time, Account, Mutability, NewTransaction, Transaction, TransactionFilter, TransactionId,
    TransactionType,
};
use crate::store::{LedgerStore, StorePage};

pub(crate) fn account(number: &str, holder: &str, balance: i64) -> Account {
    Account {
        account_number: number.to_string(),
        account_holder: holder.to_string(),
        balance: Decimal::from(balance),
    }
}

pub(crate) fn transaction(
    id: TransactionId,
    kind: TransactionType,
    amount: i64,
    from: Option<&str>,
    to: Option<&str>,
) -> Transaction {
    Transaction {
        id,
        kind,
        amount: Decimal::from(amount),
        description: format!("tx {}", id),
        timestamp: wire_time::parse("2024-05-01T12:00:00Z").unwrap(),
        from_account_number: from.map(str::to_string),
        to_account_number: to.map(str::to_string),
        mutability: Mutability::Mutable,
    }
}

#[derive(Default)]
struct FakeState {
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    next_id: TransactionId,
    fail_reads: bool,
    fail_writes: bool,
    garble_replies: bool,
    calls: Vec<String>,
}

/// Keeps accounts and transactions in memory and moves balances on writes,
/// the way the real store does.
#[derive(Default)]
pub(crate) struct FakeStore {
    state: Mutex<FakeState>,
}

impl FakeStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.state.lock().unwrap().next_id = 100;
        store
    }

    pub fn with_accounts(self, accounts: Vec<Account>) -> Self {
        self.state.lock().unwrap().accounts = accounts;
        self
    }

    pub fn with_transactions(self, transactions: Vec<Transaction>) -> Self {
        self.state.lock().unwrap().transactions = transactions;
        self
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Apply writes but answer with a body that is not a transaction
    pub fn garble_replies(&self, garble: bool) {
        self.state.lock().unwrap().garble_replies = garble;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn write_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("POST") || c.starts_with("PUT") || c.starts_with("DELETE"))
            .count()
    }

    pub fn add_account(&self, account: Account) {
        self.state.lock().unwrap().accounts.push(account);
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

fn apply_effect(accounts: &mut [Account], tx: &Transaction, sign: Decimal) {
    let amount = tx.amount * sign;
    for account in accounts.iter_mut() {
        if tx.from_account_number.as_deref() == Some(account.account_number.as_str()) {
            account.balance -= amount;
        }
        if tx.to_account_number.as_deref() == Some(account.account_number.as_str()) {
            account.balance += amount;
        }
    }
}

fn matches(tx: &Transaction, filter: &TransactionFilter) -> bool {
    filter.kind.map_or(true, |k| tx.kind == k)
        && filter.account.as_deref().map_or(true, |a| tx.involves_account(a))
}

fn read_failure(resource: &str) -> CoreError {
    CoreError::Fetch {
        resource: resource.to_string(),
        message: "HTTP 500 Internal Server Error".to_string(),
        status: Some(500),
    }
}

fn unreadable_reply(id: Option<TransactionId>) -> CoreError {
    CoreError::UnreadableAcknowledgment {
        id,
        message: "expected a transaction".to_string(),
    }
}

fn write_failure(id: Option<TransactionId>) -> CoreError {
    CoreError::Permission {
        id,
        message: "store rejected the write".to_string(),
    }
}

#[async_trait]
impl LedgerStore for FakeStore {
    async fn list_accounts(&self) -> CoreResult<Vec<Account>> {
        let state = self.record("GET /accounts".to_string());
        if state.fail_reads {
            return Err(read_failure("accounts"));
        }
        Ok(state.accounts.clone())
    }

    async fn list_transactions(
        &self,
        page: StorePage,
        size: u32,
        filter: &TransactionFilter,
    ) -> CoreResult<Vec<Transaction>> {
        let state = self.record(format!("GET /transactions?page={}&size={}", page.index(), size));
        if state.fail_reads {
            return Err(read_failure("transactions"));
        }
        Ok(state
            .transactions
            .iter()
            .filter(|t| matches(t, filter))
            .skip((page.index() * size) as usize)
            .take(size as usize)
            .cloned()
            .collect())
    }

    async fn count_transactions(&self, size: u32, filter: &TransactionFilter) -> CoreResult<u64> {
        let state = self.record(format!("GET /transactions/count?size={}", size));
        if state.fail_reads {
            return Err(read_failure("transaction count"));
        }
        Ok(state.transactions.iter().filter(|t| matches(t, filter)).count() as u64)
    }

    async fn get_transaction(&self, id: TransactionId) -> CoreResult<Transaction> {
        let state = self.record(format!("GET /transactions/{}", id));
        if state.fail_reads {
            return Err(read_failure("transaction"));
        }
        state
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(CoreError::TransactionNotFound { id })
    }

    async fn create_transaction(&self, body: &NewTransaction) -> CoreResult<Transaction> {
        let mut state = self.record("POST /transactions".to_string());
        if state.fail_writes {
            return Err(write_failure(None));
        }
        state.next_id += 1;
        let created = Transaction {
            id: state.next_id,
            kind: body.kind,
            amount: body.amount,
            description: body.description.clone(),
            timestamp: body.timestamp,
            from_account_number: body.from_account_number.clone(),
            to_account_number: body.to_account_number.clone(),
            mutability: Mutability::Mutable,
        };
        apply_effect(&mut state.accounts, &created, Decimal::ONE);
        state.transactions.push(created.clone());
        if state.garble_replies {
            return Err(unreadable_reply(None));
        }
        Ok(created)
    }

    async fn update_transaction(&self, id: TransactionId, body: &Transaction) -> CoreResult<Transaction> {
        let mut state = self.record(format!("PUT /transactions/{}", id));
        if state.fail_writes {
            return Err(write_failure(Some(id)));
        }
        let garble = state.garble_replies;
        let FakeState {
            accounts,
            transactions,
            ..
        } = &mut *state;
        let existing = transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(CoreError::TransactionNotFound { id })?;
        if !existing.is_mutable() {
            return Err(write_failure(Some(id)));
        }
        apply_effect(accounts, existing, Decimal::NEGATIVE_ONE);
        let mut updated = body.clone();
        updated.id = id;
        updated.mutability = Mutability::Locked;
        apply_effect(accounts, &updated, Decimal::ONE);
        *existing = updated.clone();
        if garble {
            return Err(unreadable_reply(Some(id)));
        }
        Ok(updated)
    }

    async fn delete_transaction(&self, id: TransactionId) -> CoreResult<()> {
        let mut state = self.record(format!("DELETE /transactions/{}", id));
        if state.fail_writes {
            return Err(write_failure(Some(id)));
        }
        let position = state
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or(CoreError::TransactionNotFound { id })?;
        if !state.transactions[position].is_mutable() {
            return Err(write_failure(Some(id)));
        }
        let removed = state.transactions.remove(position);
        apply_effect(&mut state.accounts, &removed, Decimal::NEGATIVE_ONE);
        Ok(())
    }
}
