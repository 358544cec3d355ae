//! Transaction history and transfers

use super::endpoints;
use super::types::{Page, PageRequest, RawPage, Transaction, TransferRequest, TransferResponse};
use crate::error::Result;
use crate::http::ApiClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct TransactionService {
    client: Arc<ApiClient>,
}

impl TransactionService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn by_account(&self, account_id: i64, request: &PageRequest) -> Result<Page<Transaction>> {
        let raw: RawPage<Transaction> = self
            .client
            .get(&endpoints::transactions_by_account(account_id), &request.query())
            .await?;
        Ok(Page::from_raw(raw, request))
    }

    pub async fn by_rib(&self, rib: &str, request: &PageRequest) -> Result<Page<Transaction>> {
        let raw: RawPage<Transaction> = self
            .client
            .get(&endpoints::transactions_by_rib(rib), &request.query())
            .await?;
        Ok(Page::from_raw(raw, request))
    }

    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferResponse> {
        let response: Option<TransferResponse> =
            self.client.post(endpoints::TRANSFER, request).await?;
        Ok(response.unwrap_or_default())
    }
}
