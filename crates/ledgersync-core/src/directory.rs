//! Account directory: the sorted snapshot of every account

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{CoreResult, ErrorDetails};
use crate::models::Account;
use crate::pages::LoadOutcome;
use crate::store::LedgerStore;

#[derive(Debug, Default)]
struct DirectoryState {
    accounts: Vec<Account>,
    error: Option<ErrorDetails>,
    /// Ticket of the newest reload
    issued: u64,
    in_flight: usize,
}

/// Holds the accounts from the last reload, sorted by account number.
///
/// The only way to change the contents is a full [`reload`](Self::reload).
#[derive(Debug, Default)]
pub struct AccountDirectory {
    state: RwLock<DirectoryState>,
}

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch every account and replace the whole set.
    ///
    /// On failure the directory is emptied and the error is kept for display.
    /// When reloads overlap, only the one started last is applied.
    pub async fn reload(&self, store: &dyn LedgerStore) -> CoreResult<LoadOutcome> {
        let ticket = {
            let mut state = self.write();
            state.issued += 1;
            state.in_flight += 1;
            state.issued
        };

        let result = store.list_accounts().await;

        let mut state = self.write();
        state.in_flight -= 1;
        if ticket != state.issued {
            log::debug!(
                target: "ledgersync::directory",
                "Dropping account reload {} (newest is {})",
                ticket,
                state.issued
            );
            return Ok(LoadOutcome::Discarded);
        }
        match result {
            Ok(mut accounts) => {
                accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));
                log::debug!(
                    target: "ledgersync::directory",
                    "Loaded {} accounts",
                    accounts.len()
                );
                state.accounts = accounts;
                state.error = None;
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                log::warn!(target: "ledgersync::directory", "Account reload failed: {}", e);
                state.accounts.clear();
                state.error = Some(e.to_details());
                Err(e)
            }
        }
    }

    /// All accounts, ascending by account number
    pub fn list(&self) -> Vec<Account> {
        self.read().accounts.clone()
    }

    /// Look up an account by number
    pub fn find(&self, account_number: &str) -> Option<Account> {
        let state = self.read();
        state
            .accounts
            .binary_search_by(|a| a.account_number.as_str().cmp(account_number))
            .ok()
            .map(|i| state.accounts[i].clone())
    }

    pub fn contains(&self, account_number: &str) -> bool {
        self.find(account_number).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().accounts.is_empty()
    }

    /// Error from the last reload, if it failed
    pub fn error(&self) -> Option<ErrorDetails> {
        self.read().error.clone()
    }

    /// True while any reload is in flight
    pub fn is_loading(&self) -> bool {
        self.read().in_flight > 0
    }
}
