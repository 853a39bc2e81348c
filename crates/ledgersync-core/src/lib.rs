//! Core ledger view synchronization
//!
//! Keeps a ledger view (all accounts plus one page of transactions) in step
//! with a remote transaction store, and turns form input into validated
//! mutation requests. The store itself is a collaborator behind
//! [`LedgerStore`].

pub mod directory;
pub mod error;
pub mod form;
pub mod models;
pub mod pages;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use directory::AccountDirectory;
pub use error::{CoreError, CoreResult, ErrorCode, ErrorDetails, ErrorSeverity, ValidationIssue};
pub use form::{
    field_requirements, FieldRequirements, FieldRule, FormField, FormMode, MutationForm,
    MutationRequest, RowState,
};
pub use models::{
    Account, Mutability, NewTransaction, Transaction, TransactionFilter, TransactionId,
    TransactionType,
};
pub use pages::{LoadOutcome, PageCache, PageRequest, PageView};
pub use store::{LedgerStore, StorePage, StoreRef};
pub use sync::{LedgerView, SyncCoordinator};
