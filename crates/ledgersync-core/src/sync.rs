//! Sync coordinator: sequences loads and writes across the directory and
//! the page cache

use serde::{Deserialize, Serialize};

use ledgersync_config::PaginationConfig;

use crate::directory::AccountDirectory;
use crate::error::{CoreError, CoreResult, ErrorDetails};
use crate::form::{MutationForm, MutationRequest};
use crate::models::{Account, Mutability, Transaction, TransactionFilter, TransactionId};
use crate::pages::{LoadOutcome, PageCache, PageRequest, PageView};
use crate::store::StoreRef;

/// Combined accounts and current transaction page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerView {
    pub accounts: Vec<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_error: Option<ErrorDetails>,
    pub page: PageView,
    /// No load is in flight
    pub settled: bool,
}

/// Owns the directory and the page cache and talks to the store.
///
/// A write is always followed by a reload of both collections, and only
/// once the store has acknowledged it.
pub struct SyncCoordinator {
    store: StoreRef,
    directory: AccountDirectory,
    pages: PageCache,
}

impl SyncCoordinator {
    pub fn new(store: StoreRef, pagination: &PaginationConfig) -> Self {
        Self {
            store,
            directory: AccountDirectory::new(),
            pages: PageCache::new(pagination.page_size, pagination.count_semantics),
        }
    }

    pub fn directory(&self) -> &AccountDirectory {
        &self.directory
    }

    pub fn pages(&self) -> &PageCache {
        &self.pages
    }

    /// Load the accounts and page 1 together
    pub async fn initialize(&self) -> LedgerView {
        let size = self.pages.page_size();
        let (_, _) = tokio::join!(
            self.directory.reload(self.store.as_ref()),
            self.pages.load_page(self.store.as_ref(), 1, size),
        );
        log::info!(
            target: "ledgersync::sync",
            "Initialized: {} accounts, {} transactions on page 1",
            self.directory.len(),
            self.pages.transactions().len()
        );
        self.view()
    }

    /// Reload both collections, keeping the selected page and filter
    pub async fn refresh(&self) -> LedgerView {
        let request = self.pages.selected();
        let page = request.page;
        let (_, _) = tokio::join!(
            self.directory.reload(self.store.as_ref()),
            self.pages.load(self.store.as_ref(), request),
        );
        log::info!(target: "ledgersync::sync", "Refreshed ledger view at page {}", page);
        self.view()
    }

    /// Load another page; the directory is left alone
    pub async fn change_page(&self, page: u32) -> CoreResult<LoadOutcome> {
        let request = self.pages.selected().with_page(page)?;
        self.pages.load(self.store.as_ref(), request).await
    }

    /// Switch to page 1 of a new filter
    pub async fn set_filter(&self, filter: TransactionFilter) -> CoreResult<LoadOutcome> {
        let request = PageRequest::new(1, self.pages.page_size(), filter)?;
        self.pages.load(self.store.as_ref(), request).await
    }

    /// Current page row, or the store's copy when it is not cached
    async fn resolve(&self, id: TransactionId) -> CoreResult<Transaction> {
        match self.pages.find(id) {
            Some(tx) => Ok(tx),
            None => {
                log::debug!(target: "ledgersync::sync", "Transaction {} not cached, fetching", id);
                self.store.get_transaction(id).await
            }
        }
    }

    /// Open `form` on transaction `id`
    pub async fn edit(&self, form: &mut MutationForm, id: TransactionId) -> CoreResult<()> {
        let tx = self.resolve(id).await?;
        form.open(Some(&tx))
    }

    /// Validate the form, write it, and refresh once the store acknowledges.
    ///
    /// On failure the draft stays open and nothing is reloaded. An
    /// acknowledgment whose body cannot be read still closes the form and
    /// refreshes before the error is returned.
    pub async fn submit(&self, form: &mut MutationForm) -> CoreResult<Transaction> {
        let request = form.validate(&self.directory)?;

        let result = match &request {
            MutationRequest::Create(body) => self.store.create_transaction(body).await,
            MutationRequest::Update { id, transaction } => {
                let cached_locked = self
                    .pages
                    .find(*id)
                    .map_or(false, |tx| !tx.is_mutable());
                if cached_locked || transaction.mutability == Mutability::Locked {
                    let e = CoreError::locked(*id);
                    log::error!(target: "ledgersync::sync", "Refusing update: {}", e);
                    return Err(e);
                }
                self.store.update_transaction(*id, transaction).await
            }
        };

        match result {
            Ok(saved) => {
                log::info!(
                    target: "ledgersync::sync",
                    "Saved transaction {} ({} {})",
                    saved.id,
                    saved.kind,
                    saved.amount
                );
                form.close();
                self.refresh().await;
                Ok(saved)
            }
            Err(e) if e.is_acknowledged() => {
                log::warn!(target: "ledgersync::sync", "Write accepted, refreshing: {}", e);
                form.close();
                self.refresh().await;
                Err(e)
            }
            Err(e) => {
                log::error!(target: "ledgersync::sync", "Write failed, draft kept: {}", e);
                Err(e)
            }
        }
    }

    /// Delete a mutable transaction and refresh once the store acknowledges
    pub async fn delete(&self, id: TransactionId) -> CoreResult<()> {
        let row = self.resolve(id).await?;
        if !row.is_mutable() {
            let e = CoreError::locked(id);
            log::error!(target: "ledgersync::sync", "Refusing delete: {}", e);
            return Err(e);
        }

        match self.store.delete_transaction(id).await {
            Ok(()) => {}
            Err(e) if e.is_acknowledged() => {
                log::warn!(target: "ledgersync::sync", "Delete of {} accepted: {}", id, e);
            }
            Err(e) => {
                log::error!(target: "ledgersync::sync", "Delete of {} failed: {}", id, e);
                return Err(e);
            }
        }

        self.pages.remove(id);
        log::info!(target: "ledgersync::sync", "Deleted transaction {}", id);
        self.refresh().await;
        Ok(())
    }

    /// True when neither collection is loading
    pub fn is_settled(&self) -> bool {
        !self.directory.is_loading() && !self.pages.is_loading()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.directory.list()
    }

    pub fn view(&self) -> LedgerView {
        LedgerView {
            accounts: self.directory.list(),
            directory_error: self.directory.error(),
            page: self.pages.view(),
            settled: self.is_settled(),
        }
    }
}
