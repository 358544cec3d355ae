//! Agent console: customer administration and their bank accounts

use super::forms::{CreateAccountForm, CreateCustomerForm};
use super::pagination::ListState;
use super::sequence::{RequestSequencer, Ticket};
use crate::api::types::{
    AccountStatus, BankAccount, ClientCreationResponse, Customer, Page, PageRequest,
};
use crate::api::{AccountService, ClientService};
use crate::error::Result;
use futures::future::join_all;

pub struct AgentConsole {
    clients: ClientService,
    accounts: AccountService,
    list: ListState,
    sequencer: RequestSequencer,
    customers: Vec<Customer>,
    selected: Option<i64>,
    error: Option<String>,
}

impl AgentConsole {
    pub fn new(clients: ClientService, accounts: AccountService) -> Self {
        Self {
            clients,
            accounts,
            list: ListState::default(),
            sequencer: RequestSequencer::new(),
            customers: Vec::new(),
            selected: None,
            error: None,
        }
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn list(&self) -> &ListState {
        &self.list
    }

    /// Paging and sorting; call `load` afterwards
    pub fn list_mut(&mut self) -> &mut ListState {
        &mut self.list
    }

    /// Inline error of the last listing attempt
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected(&self) -> Option<&Customer> {
        let id = self.selected?;
        self.customers.iter().find(|customer| customer.id == id)
    }

    /// Select a customer; selecting the selected one clears the selection
    pub fn toggle_selection(&mut self, customer_id: i64) {
        self.selected = match self.selected {
            Some(current) if current == customer_id => None,
            _ => Some(customer_id),
        };
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Fetch the current page and apply it
    pub async fn load(&mut self) -> Result<()> {
        let (ticket, request) = self.begin_load();
        let result = self.fetch_page(&request).await;
        self.apply(ticket, result)
    }

    /// Start a fetch for the current list state
    pub fn begin_load(&self) -> (Ticket, PageRequest) {
        (self.sequencer.issue(), self.list.request())
    }

    /// One page of customers with their account flag re-checked.
    ///
    /// The listing's `hasBankAccount` can lag behind reality, so each
    /// customer's first account page is fetched; on error the backend's flag
    /// is kept.
    pub async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Customer>> {
        let mut page = self.clients.list_paginated(request).await?;

        let probe = PageRequest::new(0, 1);
        let checks = page
            .content
            .iter()
            .map(|customer| self.accounts.list_by_customer(customer.id, &probe));
        let results = join_all(checks).await;

        for (customer, result) in page.content.iter_mut().zip(results) {
            match result {
                Ok(accounts) => customer.has_bank_account = !accounts.is_empty(),
                Err(e) => tracing::warn!(
                    customer_id = customer.id,
                    error = %e,
                    "Could not verify bank accounts, keeping listed flag"
                ),
            }
        }
        Ok(page)
    }

    /// Apply a fetch result unless a newer fetch has been started since
    pub fn apply(&mut self, ticket: Ticket, result: Result<Page<Customer>>) -> Result<()> {
        let Some(result) = self.sequencer.accept(ticket, result) else {
            return Ok(());
        };
        match result {
            Ok(page) => {
                self.list.record(&page);
                self.customers = page.content;
                if self.selected().is_none() {
                    self.selected = None;
                }
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.user_message("Failed to load customers"));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Create a customer, then show the first page again
    pub async fn create_customer(&mut self, form: &CreateCustomerForm) -> Result<ClientCreationResponse> {
        let request = form.validate()?;
        let created = self.clients.create(&request).await?;
        tracing::info!(username = %request.username, "Customer created");
        self.list.reset();
        self.reload().await;
        Ok(created)
    }

    pub async fn delete_customer(&mut self, user_id: i64) -> Result<()> {
        self.clients.delete_by_user_id(user_id).await?;
        tracing::info!(user_id, "Customer deleted");
        if self.selected().is_some_and(|c| c.user_id == user_id) {
            self.selected = None;
        }
        self.reload().await;
        Ok(())
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn customer_accounts(&self, customer_id: i64, request: &PageRequest) -> Result<Page<BankAccount>> {
        self.accounts.list_by_customer(customer_id, request).await
    }

    /// Open an account for a customer and refresh the listing's flags
    pub async fn create_account(&mut self, customer_id: i64, form: &CreateAccountForm) -> Result<BankAccount> {
        let request = form.validate(customer_id)?;
        let account = self.accounts.create(&request).await?;
        tracing::info!(customer_id, rib = %account.rib, "Bank account created");
        self.reload().await;
        Ok(account)
    }

    pub async fn set_account_status(&self, account_id: i64, status: AccountStatus) -> Result<BankAccount> {
        let account = self.accounts.update_status(account_id, status).await?;
        tracing::info!(account_id, status = status.as_str(), "Account status changed");
        Ok(account)
    }

    pub async fn delete_account(&mut self, account_id: i64) -> Result<()> {
        self.accounts.delete(account_id).await?;
        tracing::info!(account_id, "Bank account deleted");
        self.reload().await;
        Ok(())
    }

    /// Reload after a write the backend already accepted; a failure stays
    /// in `error` and does not undo the write's result
    async fn reload(&mut self) {
        if let Err(e) = self.load().await {
            tracing::warn!(error = %e, "Customer listing not refreshed after change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::SortDir;
    use crate::http::ApiClient;
    use crate::session::MemoryStorage;
    use crate::testing::FakeBackend;
    use std::sync::Arc;

    fn console(backend: &FakeBackend) -> AgentConsole {
        let client = Arc::new(
            ApiClient::new(&backend.api_config(), Arc::new(MemoryStorage::new())).unwrap(),
        );
        AgentConsole::new(ClientService::new(client.clone()), AccountService::new(client))
    }

    fn flags(console: &AgentConsole) -> Vec<(i64, bool)> {
        console
            .customers()
            .iter()
            .map(|c| (c.id, c.has_bank_account))
            .collect()
    }

    #[tokio::test]
    async fn test_load_verifies_account_flags() {
        let backend = FakeBackend::start().await;
        let mut console = console(&backend);

        console.load().await.unwrap();
        // 1: listed false but has accounts; 2: listed true but has none;
        // 3: verification fails, listed flag kept
        assert_eq!(flags(&console), vec![(1, true), (2, false), (3, true)]);
        assert_eq!(console.list().total_elements(), 3);
        assert!(console.error().is_none());
        assert!(backend
            .state
            .requests()
            .iter()
            .any(|r| r.starts_with("GET /api/accounts/customer/1?page=0&size=1")));
    }

    #[tokio::test]
    async fn test_sorting_and_paging_drive_the_request() {
        let backend = FakeBackend::start().await;
        let mut console = console(&backend);

        console.list_mut().set_size(2);
        console.list_mut().sort("lastname");
        console.list_mut().sort("lastname");
        console.load().await.unwrap();

        assert_eq!(console.list().sort_dir(), SortDir::Desc);
        assert_eq!(console.customers()[0].lastname, "Petit");
        assert_eq!(console.list().total_pages(), 2);

        console.list_mut().next();
        console.load().await.unwrap();
        assert_eq!(console.customers().len(), 1);
        assert_eq!(console.list().range(), Some((3, 3)));
    }

    #[tokio::test]
    async fn test_stale_page_is_discarded() {
        let backend = FakeBackend::start().await;
        let mut console = console(&backend);

        let (first, first_request) = console.begin_load();
        console.list_mut().set_size(1);
        let (second, second_request) = console.begin_load();

        let (old, new) = tokio::join!(
            console.fetch_page(&first_request),
            console.fetch_page(&second_request)
        );
        console.apply(second, new).unwrap();
        console.apply(first, old).unwrap();

        assert_eq!(console.customers().len(), 1);
        assert_eq!(console.list().total_pages(), 3);
    }

    #[tokio::test]
    async fn test_selection_toggles() {
        let backend = FakeBackend::start().await;
        let mut console = console(&backend);
        console.load().await.unwrap();

        console.toggle_selection(2);
        assert_eq!(console.selected().map(|c| c.id), Some(2));
        console.toggle_selection(2);
        assert!(console.selected().is_none());
    }

    #[tokio::test]
    async fn test_customer_and_account_lifecycle() {
        let backend = FakeBackend::start().await;
        let mut console = console(&backend);
        console.load().await.unwrap();
        console.list_mut().next();

        let created = console
            .create_customer(&CreateCustomerForm {
                username: "dave".into(),
                password: "secret1".into(),
                email: "dave@example.com".into(),
                firstname: "Dave".into(),
                lastname: "Moreau".into(),
                birthdate: "1985-02-03".into(),
                postal_address: "1 rue de la Paix".into(),
                identity_ref: "ID-42".into(),
            })
            .await
            .unwrap();
        let customer = created.customer.unwrap();
        assert_eq!(console.list().page(), 0);
        assert_eq!(console.list().total_elements(), 4);

        let account = console
            .create_account(
                customer.id,
                &CreateAccountForm {
                    rib: "FR7600000000099".into(),
                    amount: "100".into(),
                },
            )
            .await
            .unwrap();
        let listed = console
            .customers()
            .iter()
            .find(|c| c.id == customer.id)
            .map(|c| c.has_bank_account);
        assert_eq!(listed, Some(true));

        let blocked = console
            .set_account_status(account.id, AccountStatus::Suspended)
            .await
            .unwrap();
        assert_eq!(blocked.account_status, AccountStatus::Suspended);

        console.delete_account(account.id).await.unwrap();
        let page = console
            .customer_accounts(customer.id, &PageRequest::default())
            .await
            .unwrap();
        assert!(page.is_empty());

        console.toggle_selection(customer.id);
        console.delete_customer(customer.user_id).await.unwrap();
        assert!(console.selected().is_none());
    }

    #[tokio::test]
    async fn test_writes_succeed_when_listing_refresh_fails() {
        let backend = FakeBackend::start().await;
        let mut console = console(&backend);
        console.load().await.unwrap();
        backend.state.fail_reads("/api/clients/clients");

        let created = console
            .create_customer(&CreateCustomerForm {
                username: "erin".into(),
                password: "secret1".into(),
                email: "erin@example.com".into(),
                firstname: "Erin".into(),
                lastname: "Roux".into(),
                birthdate: "1992-07-08".into(),
                postal_address: "2 rue du Bac".into(),
                identity_ref: "ID-43".into(),
            })
            .await
            .unwrap();
        assert!(created.customer.is_some());
        assert_eq!(console.error(), Some("Service unavailable"));

        let account = console
            .create_account(
                1,
                &CreateAccountForm {
                    rib: "FR7600000000077".into(),
                    amount: "10".into(),
                },
            )
            .await
            .unwrap();
        console.delete_account(account.id).await.unwrap();
        assert_eq!(console.error(), Some("Service unavailable"));
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let backend = FakeBackend::start().await;
        let mut console = console(&backend);

        let err = console
            .create_account(1, &CreateAccountForm::default())
            .await
            .unwrap_err();
        assert_eq!(err.user_message("Failed"), "RIB is required");
        assert!(backend.state.requests().is_empty());
    }
}
