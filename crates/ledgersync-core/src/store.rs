//! The remote transaction store, as seen from this crate

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::models::{Account, NewTransaction, Transaction, TransactionFilter, TransactionId};

/// Store reference type
pub type StoreRef = Arc<dyn LedgerStore>;

/// Zero-based page index used in the store's query string.
///
/// Everything above the store speaks 1-based page numbers; conversions go
/// through this type only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StorePage(u32);

impl StorePage {
    /// Convert a 1-based page number. Page 0 has no store counterpart.
    pub fn from_page_number(page: u32) -> Option<Self> {
        page.checked_sub(1).map(StorePage)
    }

    /// Raw index, as sent on the wire
    pub fn index(&self) -> u32 {
        self.0
    }

    /// Back to the 1-based page number
    pub fn page_number(&self) -> u32 {
        self.0 + 1
    }
}

/// Operations the remote store offers.
///
/// Implementations report read failures as `CoreError::Fetch` and rejected
/// writes as `CoreError::Permission`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// `GET /accounts`
    async fn list_accounts(&self) -> CoreResult<Vec<Account>>;

    /// `GET /transactions?page=..&size=..`
    async fn list_transactions(
        &self,
        page: StorePage,
        size: u32,
        filter: &TransactionFilter,
    ) -> CoreResult<Vec<Transaction>>;

    /// `GET /transactions/count`; pages or items depending on the store
    async fn count_transactions(&self, size: u32, filter: &TransactionFilter) -> CoreResult<u64>;

    /// `GET /transactions/{id}`
    async fn get_transaction(&self, id: TransactionId) -> CoreResult<Transaction>;

    /// `POST /transactions`
    async fn create_transaction(&self, body: &NewTransaction) -> CoreResult<Transaction>;

    /// `PUT /transactions/{id}`
    async fn update_transaction(&self, id: TransactionId, body: &Transaction) -> CoreResult<Transaction>;

    /// `DELETE /transactions/{id}`
    async fn delete_transaction(&self, id: TransactionId) -> CoreResult<()>;
}
