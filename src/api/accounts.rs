//! Bank account service

use super::endpoints;
use super::types::{AccountStatus, BankAccount, CreateBankAccountRequest, Page, PageRequest, RawPage};
use crate::error::Result;
use crate::http::ApiClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AccountService {
    client: Arc<ApiClient>,
}

impl AccountService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreateBankAccountRequest) -> Result<BankAccount> {
        self.client.post(endpoints::ACCOUNTS, request).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<BankAccount> {
        self.client.get(&endpoints::account_by_id(id), &[]).await
    }

    pub async fn get_by_rib(&self, rib: &str) -> Result<BankAccount> {
        self.client.get(&endpoints::account_by_rib(rib), &[]).await
    }

    /// Accounts of one customer; missing envelope fields fall back to the request
    pub async fn list_by_customer(
        &self,
        customer_id: i64,
        request: &PageRequest,
    ) -> Result<Page<BankAccount>> {
        let raw: Option<RawPage<BankAccount>> = self
            .client
            .get(
                &endpoints::accounts_by_customer(customer_id),
                &request.sorted_query(),
            )
            .await?;
        let raw = raw.unwrap_or(RawPage {
            content: Vec::new(),
            total_elements: 0,
            total_pages: 0,
            pageable: None,
        });
        Ok(Page::from_raw(raw, request))
    }

    pub async fn list_all(&self) -> Result<Vec<BankAccount>> {
        let accounts: Option<Vec<BankAccount>> = self.client.get(endpoints::ACCOUNTS, &[]).await?;
        Ok(accounts.unwrap_or_default())
    }

    pub async fn update_status(&self, id: i64, status: AccountStatus) -> Result<BankAccount> {
        self.client
            .patch(
                &endpoints::account_status(id),
                &[("status", status.as_str().to_string())],
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client.delete(&endpoints::account_by_id(id)).await
    }
}
