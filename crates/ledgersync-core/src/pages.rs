//! Transaction page cache
//!
//! Holds exactly one page of transactions. Every selection hands out a
//! ticket; a response is applied only when it carries the newest ticket and
//! still matches the selected page, size and filter. Anything else is a
//! stale response and is dropped without touching the cache.

use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ledgersync_config::CountSemantics;

use crate::error::{CoreError, CoreResult, ErrorDetails, ValidationIssue};
use crate::models::{Transaction, TransactionFilter, TransactionId};
use crate::store::{LedgerStore, StorePage};

/// Page selection: 1-based page number, page size and filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    #[serde(default, skip_serializing_if = "TransactionFilter::is_empty")]
    pub filter: TransactionFilter,
}

impl PageRequest {
    pub fn new(page: u32, size: u32, filter: TransactionFilter) -> CoreResult<Self> {
        if page == 0 || size == 0 {
            return Err(CoreError::invalid(ValidationIssue::InvalidPage));
        }
        Ok(Self { page, size, filter })
    }

    /// Same request on another page
    pub fn with_page(&self, page: u32) -> CoreResult<Self> {
        Self::new(page, self.size, self.filter.clone())
    }

    /// Zero-based index for the store
    pub fn store_page(&self) -> CoreResult<StorePage> {
        match StorePage::from_page_number(self.page) {
            Some(page) if self.size > 0 => Ok(page),
            _ => Err(CoreError::invalid(ValidationIssue::InvalidPage)),
        }
    }
}

/// Handle for one in-flight page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    seq: u64,
    request: PageRequest,
}

impl PageTicket {
    pub fn request(&self) -> &PageRequest {
        &self.request
    }
}

/// What happened to a page response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOutcome {
    /// The response became the cache contents
    Applied,
    /// A newer request superseded it
    Discarded,
}

/// Successful answer to a page request
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub transactions: Vec<Transaction>,
    /// Raw value from the count endpoint
    pub reported_count: u64,
}

/// Snapshot of the cache for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub page: u32,
    pub size: u32,
    pub total_pages: u64,
    #[serde(default, skip_serializing_if = "TransactionFilter::is_empty")]
    pub filter: TransactionFilter,
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    pub loading: bool,
}

#[derive(Debug)]
struct PageState {
    selected: PageRequest,
    issued: u64,
    pending: Option<u64>,
    transactions: Vec<Transaction>,
    total_pages: u64,
    error: Option<ErrorDetails>,
}

/// One page of transactions plus pagination metadata
#[derive(Debug)]
pub struct PageCache {
    counting: CountSemantics,
    state: RwLock<PageState>,
}

impl PageCache {
    /// Empty cache positioned on page 1
    pub fn new(page_size: u32, counting: CountSemantics) -> Self {
        Self {
            counting,
            state: RwLock::new(PageState {
                selected: PageRequest {
                    page: 1,
                    size: page_size.max(1),
                    filter: TransactionFilter::default(),
                },
                issued: 0,
                pending: None,
                transactions: Vec::new(),
                total_pages: 0,
                error: None,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PageState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PageState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `request` the selected page and issue a ticket for it.
    ///
    /// Any ticket handed out earlier becomes stale.
    pub fn select(&self, request: PageRequest) -> PageTicket {
        let mut state = self.write();
        state.issued += 1;
        state.pending = Some(state.issued);
        state.selected = request.clone();
        PageTicket {
            seq: state.issued,
            request,
        }
    }

    /// Apply the outcome of a ticket's request.
    ///
    /// Returns `StaleResponse` without touching the cache when the ticket is
    /// not the most recent one. A fetch error clears the rows but keeps the
    /// selected page so the same page can be retried.
    pub fn apply(&self, ticket: &PageTicket, outcome: CoreResult<PageResponse>) -> CoreResult<()> {
        let mut state = self.write();

        if ticket.seq != state.issued || ticket.request != state.selected {
            return Err(CoreError::StaleResponse {
                requested: ticket.request.page,
                selected: state.selected.page,
            });
        }
        state.pending = None;

        match outcome {
            Ok(response) => {
                state.total_pages = self
                    .counting
                    .page_count(response.reported_count, ticket.request.size);
                state.transactions = response.transactions;
                state.error = None;
                Ok(())
            }
            Err(e) => {
                state.transactions.clear();
                state.error = Some(e.to_details());
                Err(e)
            }
        }
    }

    /// Select `request`, fetch the page and the count, and apply the result
    /// if nothing newer was selected in the meantime.
    pub async fn load(&self, store: &dyn LedgerStore, request: PageRequest) -> CoreResult<LoadOutcome> {
        let store_page = request.store_page()?;
        let ticket = self.select(request);
        let request = ticket.request();

        log::debug!(
            target: "ledgersync::pages",
            "Requesting page {} (store index {}), size {}",
            store_page.page_number(),
            store_page.index(),
            request.size
        );

        let (rows, count) = tokio::join!(
            store.list_transactions(store_page, request.size, &request.filter),
            store.count_transactions(request.size, &request.filter),
        );
        let outcome = rows.and_then(|transactions| {
            count.map(|reported_count| PageResponse {
                transactions,
                reported_count,
            })
        });

        match self.apply(&ticket, outcome) {
            Ok(()) => Ok(LoadOutcome::Applied),
            Err(e @ CoreError::StaleResponse { .. }) => {
                log::debug!(target: "ledgersync::pages", "Dropping response: {}", e);
                Ok(LoadOutcome::Discarded)
            }
            Err(e) => {
                log::warn!(
                    target: "ledgersync::pages",
                    "Loading page {} failed: {}",
                    ticket.request().page,
                    e
                );
                Err(e)
            }
        }
    }

    /// Load `page` with the given size, keeping the current filter
    pub async fn load_page(&self, store: &dyn LedgerStore, page: u32, size: u32) -> CoreResult<LoadOutcome> {
        let filter = self.read().selected.filter.clone();
        let request = PageRequest::new(page, size, filter)?;
        self.load(store, request).await
    }

    /// Currently selected request
    pub fn selected(&self) -> PageRequest {
        self.read().selected.clone()
    }

    /// Currently selected page number (1-based)
    pub fn current_page(&self) -> u32 {
        self.read().selected.page
    }

    pub fn page_size(&self) -> u32 {
        self.read().selected.size
    }

    /// Page count as last reported by the store
    pub fn total_pages(&self) -> u64 {
        self.read().total_pages
    }

    /// Rows of the current page in store order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.read().transactions.clone()
    }

    pub fn find(&self, id: TransactionId) -> Option<Transaction> {
        self.read().transactions.iter().find(|t| t.id == id).cloned()
    }

    /// Drop a row after the store acknowledged its deletion
    pub fn remove(&self, id: TransactionId) -> Option<Transaction> {
        let mut state = self.write();
        let position = state.transactions.iter().position(|t| t.id == id)?;
        Some(state.transactions.remove(position))
    }

    pub fn error(&self) -> Option<ErrorDetails> {
        self.read().error.clone()
    }

    /// True while the newest request has not been answered
    pub fn is_loading(&self) -> bool {
        self.read().pending.is_some()
    }

    pub fn view(&self) -> PageView {
        let state = self.read();
        PageView {
            page: state.selected.page,
            size: state.selected.size,
            total_pages: state.total_pages,
            filter: state.selected.filter.clone(),
            transactions: state.transactions.clone(),
            error: state.error.clone(),
            loading: state.pending.is_some(),
        }
    }
}
