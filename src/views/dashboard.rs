//! Client dashboard: own accounts, transaction history and transfers

use super::forms::TransferForm;
use super::pagination::ListState;
use super::sequence::{RequestSequencer, Ticket};
use crate::api::types::{BankAccount, Customer, Page, PageRequest, Transaction, TransferResponse};
use crate::api::{AccountService, ClientService, TransactionService};
use crate::error::Result;

/// Accounts fetched for the dashboard in one page
const ACCOUNTS_PAGE_SIZE: u32 = 100;

/// Shown when a transfer went through but the screen could not be reloaded
pub const TRANSFER_NOT_REFRESHED: &str = "Transfer completed but balances could not be refreshed";

pub struct ClientDashboard {
    clients: ClientService,
    accounts: AccountService,
    transactions: TransactionService,
    user_id: i64,
    customer: Option<Customer>,
    owned: Vec<BankAccount>,
    selected: Option<i64>,
    history: Vec<Transaction>,
    history_state: ListState,
    sequencer: RequestSequencer,
    error: Option<String>,
}

impl ClientDashboard {
    pub fn new(
        clients: ClientService,
        accounts: AccountService,
        transactions: TransactionService,
        user_id: i64,
    ) -> Self {
        Self {
            clients,
            accounts,
            transactions,
            user_id,
            customer: None,
            owned: Vec::new(),
            selected: None,
            history: Vec::new(),
            history_state: ListState::default(),
            sequencer: RequestSequencer::new(),
            error: None,
        }
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn accounts(&self) -> &[BankAccount] {
        &self.owned
    }

    pub fn selected_account(&self) -> Option<&BankAccount> {
        let id = self.selected?;
        self.owned.iter().find(|account| account.id == id)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.history
    }

    pub fn history_state(&self) -> &ListState {
        &self.history_state
    }

    pub fn history_state_mut(&mut self) -> &mut ListState {
        &mut self.history_state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Total balance over all owned accounts
    pub fn total_balance(&self) -> f64 {
        self.owned.iter().map(|account| account.amount).sum()
    }

    /// Load the customer and its accounts; the first account is selected
    pub async fn load(&mut self) -> Result<()> {
        match self.load_inner().await {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.user_message("Failed to load data"));
                Err(e)
            }
        }
    }

    async fn load_inner(&mut self) -> Result<()> {
        let customer = self.clients.get_by_user_id(self.user_id).await?;
        let page = self
            .accounts
            .list_by_customer(customer.id, &PageRequest::new(0, ACCOUNTS_PAGE_SIZE))
            .await?;
        self.customer = Some(customer);
        self.owned = page.content;
        self.selected = self.owned.first().map(|account| account.id);
        self.history_state.reset();
        Ok(())
    }

    /// Select an account by RIB; history goes back to its first page
    pub fn select_account(&mut self, rib: &str) -> bool {
        match self.owned.iter().find(|account| account.rib == rib) {
            Some(account) => {
                self.selected = Some(account.id);
                self.history.clear();
                self.history_state.reset();
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    pub async fn load_transactions(&mut self) -> Result<()> {
        let Some(account) = self.selected_account().cloned() else {
            self.history.clear();
            return Ok(());
        };
        let (ticket, request) = self.begin_history();
        let result = self.fetch_history(&account, &request).await;
        self.apply_history(ticket, result)
    }

    pub fn begin_history(&self) -> (Ticket, PageRequest) {
        (self.sequencer.issue(), self.history_state.request())
    }

    /// History by RIB, or by account id when the account has no RIB
    pub async fn fetch_history(
        &self,
        account: &BankAccount,
        request: &PageRequest,
    ) -> Result<Page<Transaction>> {
        if account.rib.is_empty() {
            self.transactions.by_account(account.id, request).await
        } else {
            self.transactions.by_rib(&account.rib, request).await
        }
    }

    pub fn apply_history(&mut self, ticket: Ticket, result: Result<Page<Transaction>>) -> Result<()> {
        let Some(result) = self.sequencer.accept(ticket, result) else {
            return Ok(());
        };
        match result {
            Ok(page) => {
                self.history_state.record(&page);
                self.history = page.content;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.user_message("Failed to load transactions"));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Transfer
    // =========================================================================

    /// Validate and submit a transfer, then refresh balances and restart
    /// the history at its first page.
    ///
    /// Once the backend accepts the transfer the result is `Ok`; a failed
    /// refresh only leaves [`TRANSFER_NOT_REFRESHED`] in `error`.
    pub async fn transfer(&mut self, form: &TransferForm) -> Result<TransferResponse> {
        let source = self
            .owned
            .iter()
            .find(|account| account.rib == form.source_rib.trim());
        let request = form.validate(source)?;

        let response = self.transactions.transfer(&request).await?;
        tracing::info!(
            source = %request.source_rib,
            destination = %request.destination_rib,
            amount = request.amount,
            "Transfer submitted"
        );

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Transfer done, dashboard refresh failed");
            self.error = Some(TRANSFER_NOT_REFRESHED.to_string());
        }
        Ok(response)
    }

    async fn refresh(&mut self) -> Result<()> {
        self.refresh_accounts().await?;
        self.history_state.reset();
        self.load_transactions().await
    }

    async fn refresh_accounts(&mut self) -> Result<()> {
        let Some(customer_id) = self.customer.as_ref().map(|c| c.id) else {
            return Ok(());
        };
        let page = self
            .accounts
            .list_by_customer(customer_id, &PageRequest::new(0, ACCOUNTS_PAGE_SIZE))
            .await?;
        self.owned = page.content;
        if self.selected_account().is_none() {
            self.selected = self.owned.first().map(|account| account.id);
        }
        Ok(())
    }
}
