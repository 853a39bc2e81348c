//! REST client for the remote transaction store
//!
//! [`HttpStore`] implements [`LedgerStore`] on top of `reqwest`. Page numbers
//! arrive here already translated to the store's 0-based index.

pub mod error;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use ledgersync_config::StoreConfig;
use ledgersync_core::{
    Account, CoreError, CoreResult, LedgerStore, NewTransaction, StorePage, Transaction,
    TransactionFilter, TransactionId,
};

pub use error::{HttpError, HttpResult};

/// Transaction store reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    /// Build a client with the configured base URL and timeout
    pub fn new(config: &StoreConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(HttpError::Client)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the response if it was a 2xx
    async fn send(&self, request: RequestBuilder, url: &str) -> HttpResult<reqwest::Response> {
        log::debug!(target: "ledgersync::http", "{}", url);
        let response = request.send().await.map_err(|source| HttpError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> HttpResult<T> {
        self.send(request, url)
            .await?
            .json::<T>()
            .await
            .map_err(|source| HttpError::Decode {
                url: url.to_string(),
                source,
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> HttpResult<T> {
        let url = self.url(path);
        let request = self.client.get(&url).query(query);
        self.send_json(request, &url).await
    }
}

fn read_failed(resource: &str, e: HttpError) -> CoreError {
    log::warn!(target: "ledgersync::http", "Reading {} failed: {}", resource, e);
    e.into_read_error(resource)
}

fn write_failed(id: Option<TransactionId>, e: HttpError) -> CoreError {
    let error = e.into_write_error(id);
    if error.is_acknowledged() {
        log::warn!(target: "ledgersync::http", "{}", error);
    } else {
        log::error!(target: "ledgersync::http", "Write rejected: {}", error);
    }
    error
}

#[async_trait]
impl LedgerStore for HttpStore {
    async fn list_accounts(&self) -> CoreResult<Vec<Account>> {
        self.get_json("/accounts", &[])
            .await
            .map_err(|e| read_failed("accounts", e))
    }

    async fn list_transactions(
        &self,
        page: StorePage,
        size: u32,
        filter: &TransactionFilter,
    ) -> CoreResult<Vec<Transaction>> {
        let mut query = vec![("page", page.index().to_string()), ("size", size.to_string())];
        query.extend(filter.query_pairs());
        self.get_json("/transactions", &query)
            .await
            .map_err(|e| read_failed("transactions", e))
    }

    async fn count_transactions(&self, size: u32, filter: &TransactionFilter) -> CoreResult<u64> {
        let mut query = vec![("size", size.to_string())];
        query.extend(filter.query_pairs());
        self.get_json("/transactions/count", &query)
            .await
            .map_err(|e| read_failed("transaction count", e))
    }

    async fn get_transaction(&self, id: TransactionId) -> CoreResult<Transaction> {
        let resource = format!("transaction {}", id);
        match self.get_json(&format!("/transactions/{}", id), &[]).await {
            Ok(tx) => Ok(tx),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND.as_u16()) => {
                Err(CoreError::TransactionNotFound { id })
            }
            Err(e) => Err(read_failed(&resource, e)),
        }
    }

    async fn create_transaction(&self, body: &NewTransaction) -> CoreResult<Transaction> {
        let url = self.url("/transactions");
        let request = self.client.post(&url).json(body);
        self.send_json(request, &url)
            .await
            .map_err(|e| write_failed(None, e))
    }

    async fn update_transaction(&self, id: TransactionId, body: &Transaction) -> CoreResult<Transaction> {
        let url = self.url(&format!("/transactions/{}", id));
        let request = self.client.put(&url).json(body);
        self.send_json(request, &url)
            .await
            .map_err(|e| write_failed(Some(id), e))
    }

    async fn delete_transaction(&self, id: TransactionId) -> CoreResult<()> {
        let url = self.url(&format!("/transactions/{}", id));
        let request = self.client.delete(&url);
        self.send(request, &url)
            .await
            .map(|_| ())
            .map_err(|e| write_failed(Some(id), e))
    }
}
