//! Application wiring
//!
//! Builds the HTTP client, the backend services and the session store from
//! one [`PortalConfig`], and registers the store and the login redirect as
//! listeners of the client's 401 events.

use crate::api::{AccountService, AuthService, ClientService, TransactionService};
use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::router::{LoginRedirect, Navigator};
use crate::session::{FileStorage, MemoryStorage, Session, SessionStorage, SessionStore};
use crate::views::{AgentConsole, ClientDashboard, ProfileView};
use std::sync::Arc;

/// A fully wired bank portal
pub struct PortalApp {
    config: PortalConfig,
    client: Arc<ApiClient>,
    auth: AuthService,
    clients: ClientService,
    accounts: AccountService,
    transactions: TransactionService,
    store: Arc<SessionStore>,
    redirects: Arc<LoginRedirect>,
}

impl PortalApp {
    fn new(config: PortalConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let client = Arc::new(ApiClient::new(&config.api, storage.clone())?);
        let auth = AuthService::new(client.clone());
        let store = SessionStore::new(Arc::new(auth.clone()), storage, &config.session);
        let redirects = Arc::new(LoginRedirect::new());

        client.add_listener(store.clone());
        client.add_listener(redirects.clone());

        tracing::debug!(base_url = %client.base_url(), "Bank portal initialized");

        Ok(Self {
            clients: ClientService::new(client.clone()),
            accounts: AccountService::new(client.clone()),
            transactions: TransactionService::new(client.clone()),
            config,
            client,
            auth,
            store,
            redirects,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn clients(&self) -> &ClientService {
        &self.clients
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Navigator sharing this app's session and 401 redirects
    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.store.clone(), self.redirects.clone())
    }

    /// Current session, restoring the persisted one first if needed
    pub async fn session(&self) -> Result<Session> {
        self.store
            .restore()
            .await
            .session
            .ok_or_else(|| Error::Session("Not logged in".to_string()))
    }

    pub fn agent_console(&self) -> AgentConsole {
        AgentConsole::new(self.clients.clone(), self.accounts.clone())
    }

    pub fn client_dashboard(&self, user_id: i64) -> ClientDashboard {
        ClientDashboard::new(
            self.clients.clone(),
            self.accounts.clone(),
            self.transactions.clone(),
            user_id,
        )
    }

    pub fn profile(&self, session: Session) -> ProfileView {
        ProfileView::new(self.auth.clone(), self.clients.clone(), session)
    }
}

/// Builder for [`PortalApp`]
pub struct PortalBuilder {
    config: PortalConfig,
    storage: Option<Arc<dyn SessionStorage>>,
}

impl PortalBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: PortalConfig::default(),
            storage: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: PortalConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the backend base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = Some(url.into());
        self
    }

    /// Use `storage` instead of the configured session file
    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Keep the session in memory only
    pub fn in_memory(self) -> Self {
        self.storage(Arc::new(MemoryStorage::new()))
    }

    /// Build the app
    pub fn build(self) -> Result<PortalApp> {
        let storage = match self.storage {
            Some(storage) => storage,
            None => Arc::new(FileStorage::new(self.config.storage.session_file.clone())),
        };
        PortalApp::new(self.config, storage)
    }
}

impl Default for PortalBuilder {
    fn default() -> Self {
        Self::new()
    }
}
