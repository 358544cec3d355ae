//! Bank portal - terminal client for the bank's self-service backend
//!
//! Every command runs through the same navigation as the portal screens:
//! the persisted session is restored, the target screen's guard is applied
//! and a 401 from any call ends the session.

use anyhow::{bail, Result};
use bankportal::{
    api::{types::PageRequest, AccountStatus, RegisterRequest, SortDir},
    config::{PortalConfig, BASE_URL_ENV},
    router::{Navigation, Navigator, Screen},
    session::{mask_token, Session},
    views::{
        AgentConsole, ChangePasswordForm, CreateAccountForm, CreateCustomerForm, ListState,
        LoginForm, TransferForm,
    },
    PortalApp, PortalBuilder,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bankportal")]
#[command(author = "E-Bank Portal Team")]
#[command(version)]
#[command(about = "Bank portal client for customers and counter agents")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BANKPORTAL_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the configuration)
    #[arg(long, env = BASE_URL_ENV)]
    api_base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "BANKPORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a user and sign in as that user
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "BANKPORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(short, long)]
        email: String,

        /// Explicit role (e.g. AGENT_GUICHET)
        #[arg(long)]
        role: Option<String>,
    },

    /// Clear the persisted session
    Logout,

    /// Show the current session
    Whoami,

    /// Ask the backend whether the session is still accepted
    Validate,

    /// Profile screen
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Customer administration (agents)
    Customers {
        #[command(subcommand)]
        action: CustomerAction,
    },

    /// Bank account administration (agents)
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Own accounts (clients)
    Dashboard,

    /// Transaction history of an own account (clients)
    Transactions {
        /// Account RIB; defaults to the first account
        #[arg(long)]
        rib: Option<String>,

        #[command(flatten)]
        paging: Paging,
    },

    /// Transfer money from an own account (clients)
    Transfer {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        motif: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show account details
    Show,

    /// Change the password
    ChangePassword {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,

        #[arg(long)]
        confirm: String,
    },
}

#[derive(Subcommand)]
enum CustomerAction {
    /// List customers page by page
    List {
        #[command(flatten)]
        paging: Paging,

        /// Field to sort by
        #[arg(long, default_value = "id")]
        sort_by: String,

        /// ASC or DESC
        #[arg(long, default_value = "ASC")]
        sort_dir: String,
    },

    /// Show one customer
    Show { id: i64 },

    /// Create a customer and its user
    Create(CustomerFields),

    /// Delete a customer by user id
    Delete { user_id: i64 },

    /// List a customer's accounts
    Accounts {
        customer_id: i64,

        #[command(flatten)]
        paging: Paging,
    },
}

#[derive(Args)]
struct CustomerFields {
    #[arg(long)]
    username: String,
    #[arg(long, env = "BANKPORTAL_NEW_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    firstname: String,
    #[arg(long)]
    lastname: String,
    /// YYYY-MM-DD
    #[arg(long)]
    birthdate: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    identity_ref: String,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Show an account by id or RIB
    Show {
        id: Option<i64>,

        #[arg(long, conflicts_with = "id")]
        rib: Option<String>,
    },

    /// Open an account for a customer
    Create {
        #[arg(long)]
        customer: i64,

        #[arg(long)]
        rib: String,

        /// Initial balance
        #[arg(long, default_value = "")]
        amount: String,
    },

    /// Change an account's status (OPENED, SUSPENDED, CLOSED)
    Status { id: i64, status: String },

    /// Delete an account
    Delete { id: i64 },
}

#[derive(Args)]
struct Paging {
    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    page: u32,

    #[arg(long, default_value_t = 10)]
    size: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("bankportal={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let mut config = match cli.config.or_else(default_config_path) {
        Some(path) => PortalConfig::load(&path)?,
        None => PortalConfig::default(),
    };
    if let Some(url) = cli.api_base_url {
        config.api.base_url = Some(url);
    }

    if let Commands::Config { default } = cli.command {
        return show_config(if default { None } else { Some(&config) });
    }

    let app = PortalBuilder::new().config(config).build()?;
    let mut navigator = app.navigator();

    match cli.command {
        Commands::Login { username, password } => {
            let form = LoginForm { username, password };
            login(&app, &mut navigator, &form).await?;
        }
        Commands::Register {
            username,
            password,
            email,
            role,
        } => {
            let request = RegisterRequest {
                username,
                password,
                email,
            };
            let session = app.store().register(&request, role.as_deref()).await?;
            println!("Registered and signed in as {}", session.username);
            report(navigator.after_login().await?);
        }
        Commands::Logout => {
            app.store().logout();
            println!("Signed out");
        }
        Commands::Whoami => whoami(&app).await?,
        Commands::Validate => {
            let session = app.session().await?;
            if app.store().check_remote().await? {
                println!("Session of {} is valid", session.username);
            } else {
                bail!("Session of {} was rejected by the backend", session.username);
            }
        }
        Commands::Profile { action } => {
            let session = enter(&app, &mut navigator, "/profile").await?;
            run_profile(&app, session, action).await?;
        }
        Commands::Customers { action } => {
            enter(&app, &mut navigator, "/agent/customers").await?;
            run_customers(&app, action).await?;
        }
        Commands::Accounts { action } => {
            enter(&app, &mut navigator, "/agent/accounts").await?;
            run_accounts(&app, action).await?;
        }
        Commands::Dashboard => {
            let session = enter(&app, &mut navigator, "/client").await?;
            dashboard(&app, &session).await?;
        }
        Commands::Transactions { rib, paging } => {
            let session = enter(&app, &mut navigator, "/client/transactions").await?;
            transactions(&app, &session, rib.as_deref(), &paging).await?;
        }
        Commands::Transfer {
            from,
            to,
            amount,
            motif,
        } => {
            let session = enter(&app, &mut navigator, "/client/transfer").await?;
            let form = TransferForm {
                source_rib: from,
                destination_rib: to,
                amount,
                motif,
            };
            transfer(&app, &session, &form).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir()
        .map(|dir| dir.join("bankportal").join("config.toml"))
        .filter(|path| path.exists())
}

fn show_config(config: Option<&PortalConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}

/// Navigate to `location` and return the session allowed to see it
async fn enter(app: &PortalApp, navigator: &mut Navigator, location: &str) -> Result<Session> {
    match navigator.navigate(location).await? {
        Navigation::Rendered {
            screen: Screen::Login,
            ..
        } => bail!("Not signed in. Run `bankportal login` first."),
        Navigation::Rendered { screen, .. } => {
            tracing::debug!(screen = screen.title(), "Screen entered");
            Ok(app.session().await?)
        }
        Navigation::Forbidden { notice, .. } => {
            if let Some(notice) = notice {
                eprintln!("{}", notice);
            }
            report(navigator.acknowledge().await?);
            bail!("This command is not available for your account")
        }
    }
}

fn report(navigation: Navigation) {
    match navigation {
        Navigation::Rendered { screen, location } => {
            println!("{} ({})", screen.title(), location)
        }
        Navigation::Forbidden { notice, redirect } => {
            if let Some(notice) = notice {
                eprintln!("{}", notice);
            }
            println!("Redirected to {}", redirect);
        }
    }
}

// =============================================================================
// Session commands
// =============================================================================

async fn login(app: &PortalApp, navigator: &mut Navigator, form: &LoginForm) -> Result<()> {
    form.validate()?;
    let session = app
        .store()
        .login(form.username.trim(), &form.password)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Invalid username or password")))?;
    println!("Signed in as {}", session.username);
    report(navigator.after_login().await?);
    Ok(())
}

async fn whoami(app: &PortalApp) -> Result<()> {
    let session = app.session().await?;
    let roles: Vec<&str> = session.roles.iter().map(|role| role.as_str()).collect();
    println!("Username: {}", session.username);
    println!("User id:  {}", session.user_id);
    println!("Roles:    {}", roles.join(", "));
    println!("Home:     {}", session.home_path());
    println!("Token:    {}", mask_token(session.token.as_str()));
    if let Some(exp) = session.token.expires_at() {
        if let Some(at) = chrono::DateTime::from_timestamp(exp as i64, 0) {
            println!("Expires:  {}", at.to_rfc3339());
        }
    }
    Ok(())
}

// =============================================================================
// Profile
// =============================================================================

async fn run_profile(app: &PortalApp, session: Session, action: ProfileAction) -> Result<()> {
    let mut view = app.profile(session);
    match action {
        ProfileAction::Show => {
            view.load().await;
            let session = view.session();
            println!("Username: {}", session.username);
            match (view.details(), view.details_error()) {
                (Some(details), _) => {
                    let name = format!(
                        "{} {}",
                        details.firstname.as_deref().unwrap_or_default(),
                        details.lastname.as_deref().unwrap_or_default()
                    );
                    println!("Name:     {}", name.trim());
                    if let Some(email) = &details.email {
                        println!("Email:    {}", email);
                    }
                    if let Some(birthdate) = details.birthdate {
                        println!("Born:     {}", birthdate);
                    }
                    if let Some(address) = &details.postal_address {
                        println!("Address:  {}", address);
                    }
                }
                (None, Some(error)) => eprintln!("{}", error),
                (None, None) => {}
            }
        }
        ProfileAction::ChangePassword {
            current,
            new,
            confirm,
        } => {
            let mut form = ChangePasswordForm {
                current_password: current,
                new_password: new,
                confirm_password: confirm,
            };
            if view.change_password(&mut form).await.is_err() {
                bail!("{}", view.error().unwrap_or("Password change failed"));
            }
            println!("{}", view.success().unwrap_or_default());
        }
    }
    Ok(())
}

// =============================================================================
// Agent console
// =============================================================================

fn list_state(paging: &Paging) -> ListState {
    let mut list = ListState::new(paging.size);
    list.go_to(paging.page);
    list
}

async fn run_customers(app: &PortalApp, action: CustomerAction) -> Result<()> {
    let mut console = app.agent_console();
    match action {
        CustomerAction::List {
            paging,
            sort_by,
            sort_dir,
        } => {
            let direction: SortDir = sort_dir.parse()?;
            let list = console.list_mut();
            *list = list_state(&paging);
            if sort_by != list.sort_by() {
                list.sort(&sort_by);
            }
            if list.sort_dir() != direction {
                list.sort(&sort_by);
            }
            list.go_to(paging.page);

            if console.load().await.is_err() {
                bail!("{}", console.error().unwrap_or("Failed to load customers"));
            }
            for customer in console.customers() {
                println!(
                    "{:>5}  {:<28} user {:<5} {}",
                    customer.id,
                    customer.full_name(),
                    customer.user_id,
                    if customer.has_bank_account { "has account" } else { "no account" }
                );
            }
            let list = console.list();
            match list.range() {
                Some((start, end)) => println!(
                    "Showing {} to {} of {} (page {}/{})",
                    start,
                    end,
                    list.total_elements(),
                    list.page() + 1,
                    list.total_pages()
                ),
                None => println!("No customers"),
            }
        }
        CustomerAction::Show { id } => {
            let customer = app.clients().get_by_id(id).await?;
            println!("{:#?}", customer);
        }
        CustomerAction::Create(fields) => {
            let form = CreateCustomerForm {
                username: fields.username,
                password: fields.password,
                email: fields.email,
                firstname: fields.firstname,
                lastname: fields.lastname,
                birthdate: fields.birthdate,
                postal_address: fields.address,
                identity_ref: fields.identity_ref,
            };
            let created = console
                .create_customer(&form)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Customer creation failed")))?;
            match created.customer {
                Some(customer) => println!("Created customer {} ({})", customer.id, customer.full_name()),
                None => println!("{}", created.message.unwrap_or_else(|| "Customer created".to_string())),
            }
            warn_stale(&console);
        }
        CustomerAction::Delete { user_id } => {
            console
                .delete_customer(user_id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Customer deletion failed")))?;
            println!("Deleted customer of user {}", user_id);
            warn_stale(&console);
        }
        CustomerAction::Accounts {
            customer_id,
            paging,
        } => {
            let page = console
                .customer_accounts(customer_id, &PageRequest::new(paging.page, paging.size))
                .await?;
            if page.is_empty() {
                println!("No bank accounts");
            }
            for account in &page.content {
                print_account(account);
            }
        }
    }
    Ok(())
}

/// The change went through but the listing could not be reloaded
fn warn_stale(console: &AgentConsole) {
    if let Some(error) = console.error() {
        eprintln!("Listing not refreshed: {}", error);
    }
}

fn print_account(account: &bankportal::api::BankAccount) {
    println!(
        "{:>5}  {:<27} {:>12.2}  {}",
        account.id,
        account.rib,
        account.amount,
        account.account_status.label()
    );
}

async fn run_accounts(app: &PortalApp, action: AccountAction) -> Result<()> {
    let mut console = app.agent_console();
    match action {
        AccountAction::Show { id, rib } => {
            let account = match (id, rib) {
                (Some(id), _) => app.accounts().get_by_id(id).await?,
                (None, Some(rib)) => app.accounts().get_by_rib(&rib).await?,
                (None, None) => bail!("Give an account id or --rib"),
            };
            print_account(&account);
        }
        AccountAction::Create {
            customer,
            rib,
            amount,
        } => {
            let form = CreateAccountForm { rib, amount };
            let account = console
                .create_account(customer, &form)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Account creation failed")))?;
            print_account(&account);
            warn_stale(&console);
        }
        AccountAction::Status { id, status } => {
            let status: AccountStatus = status.parse()?;
            let account = console
                .set_account_status(id, status)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Status change failed")))?;
            print_account(&account);
        }
        AccountAction::Delete { id } => {
            console
                .delete_account(id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Account deletion failed")))?;
            println!("Deleted account {}", id);
            warn_stale(&console);
        }
    }
    Ok(())
}

// =============================================================================
// Client dashboard
// =============================================================================

async fn dashboard(app: &PortalApp, session: &Session) -> Result<()> {
    let mut view = app.client_dashboard(session.user_id);
    if view.load().await.is_err() {
        bail!("{}", view.error().unwrap_or("Failed to load data"));
    }
    if let Some(customer) = view.customer() {
        println!("{}", customer.full_name());
    }
    for account in view.accounts() {
        print_account(account);
    }
    println!("Total balance: {:.2}", view.total_balance());
    Ok(())
}

async fn transactions(
    app: &PortalApp,
    session: &Session,
    rib: Option<&str>,
    paging: &Paging,
) -> Result<()> {
    let mut view = app.client_dashboard(session.user_id);
    if view.load().await.is_err() {
        bail!("{}", view.error().unwrap_or("Failed to load data"));
    }
    if let Some(rib) = rib {
        if !view.select_account(rib) {
            bail!("No account with RIB {}", rib);
        }
    }
    *view.history_state_mut() = list_state(paging);
    if view.load_transactions().await.is_err() {
        bail!("{}", view.error().unwrap_or("Failed to load transactions"));
    }

    if view.transactions().is_empty() {
        println!("No transactions");
    }
    for tx in view.transactions() {
        let date = tx
            .date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{:<16}  {:<30} {:>+12.2}", date, tx.label, tx.signed_amount());
    }
    if let Some((start, end)) = view.history_state().range() {
        println!(
            "Showing {} to {} of {}",
            start,
            end,
            view.history_state().total_elements()
        );
    }
    Ok(())
}

async fn transfer(app: &PortalApp, session: &Session, form: &TransferForm) -> Result<()> {
    let mut view = app.client_dashboard(session.user_id);
    if view.load().await.is_err() {
        bail!("{}", view.error().unwrap_or("Failed to load data"));
    }
    let response = view
        .transfer(form)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Transfer failed")))?;
    println!(
        "{}",
        response.message.as_deref().unwrap_or("Transfer completed")
    );
    if let Some(warning) = view.error() {
        eprintln!("{}", warning);
    }
    if let Some(account) = view.accounts().iter().find(|a| a.rib == form.source_rib.trim()) {
        print_account(account);
    }
    Ok(())
}
