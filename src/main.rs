//! ledgersync main entry point

use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use ledgersync_config::{Config, ConfigError};
use ledgersync_core::{
    CoreError, FormField, LedgerView, MutationForm, RowState, StoreRef, SyncCoordinator,
    Transaction,
};
use ledgersync_http::HttpStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "ledgersync")]
#[command(version = "0.1.0")]
#[command(about = "Browse and edit transactions held by a remote ledger store", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "ledgersync.yaml")]
    config: PathBuf,

    /// Print the ledger view as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show accounts and one page of transactions
    Show {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Create a transaction
    Create {
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Edit a mutable transaction
    Edit {
        id: i64,
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Delete a mutable transaction
    Delete {
        id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct FieldArgs {
    /// TRANSFER, DEPOSIT or WITHDRAWAL
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Source account number
    #[arg(long)]
    from: Option<String>,
    /// Destination account number
    #[arg(long)]
    to: Option<String>,
}

impl FieldArgs {
    /// Type goes first so that fields it hides are cleared before the rest
    fn apply(&self, form: &mut MutationForm) -> Result<(), CoreError> {
        let fields = [
            (FormField::Type, &self.kind),
            (FormField::Amount, &self.amount),
            (FormField::Description, &self.description),
            (FormField::Source, &self.from),
            (FormField::Destination, &self.to),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                form.set_field(field, value)?;
            }
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { force } = args.command {
        return init_config(&args.config, force);
    }

    let (config, missing) = match Config::load(&args.config) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound { .. }) => (Config::default(), true),
        Err(e) => bail!("{}\n{}", e, e.suggestions().join("\n")),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level))
        .init();
    if missing {
        log::warn!(
            "Config file {} not found, using defaults",
            args.config.display()
        );
    }
    log::info!("Using store at {}", config.base_url());

    let store: StoreRef = Arc::new(HttpStore::new(&config.store)?);
    let sync = SyncCoordinator::new(store, &config.pagination);

    let rt = Runtime::new()?;
    let view = rt.block_on(run(&sync, args.command))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }
    Ok(())
}

async fn run(sync: &SyncCoordinator, command: Command) -> anyhow::Result<LedgerView> {
    let page = match &command {
        Command::Show { page }
        | Command::Create { page, .. }
        | Command::Edit { page, .. }
        | Command::Delete { page, .. } => *page,
        Command::InitConfig { .. } => 1,
    };

    sync.initialize().await;
    if page != 1 {
        sync.change_page(page).await.map_err(report)?;
    }

    match command {
        Command::Show { .. } | Command::InitConfig { .. } => {}
        Command::Create { fields, .. } => {
            let mut form = MutationForm::new();
            form.open(None).map_err(report)?;
            fields.apply(&mut form).map_err(report)?;
            if let Some(saved) = accepted(sync.submit(&mut form).await)? {
                log::info!("Created transaction {}", saved.id);
            }
        }
        Command::Edit { id, fields, .. } => {
            let mut form = MutationForm::new();
            sync.edit(&mut form, id).await.map_err(report)?;
            fields.apply(&mut form).map_err(report)?;
            accepted(sync.submit(&mut form).await)?;
        }
        Command::Delete { id, .. } => {
            sync.delete(id).await.map_err(report)?;
        }
    }

    Ok(sync.view())
}

/// Treat a write the store accepted as success even if its reply was unreadable
fn accepted(result: Result<Transaction, CoreError>) -> anyhow::Result<Option<Transaction>> {
    match result {
        Ok(saved) => Ok(Some(saved)),
        Err(e) if e.is_acknowledged() => {
            log::warn!("{}", e);
            Ok(None)
        }
        Err(e) => Err(report(e)),
    }
}

fn report(e: CoreError) -> anyhow::Error {
    anyhow::anyhow!("{}", e.to_details())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    std::fs::write(path, Config::generate_default())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn print_view(view: &LedgerView) {
    println!("Accounts");
    if let Some(error) = &view.directory_error {
        println!("  unavailable: {}", error.message);
    }
    for account in &view.accounts {
        println!(
            "  {:<10} {:<24} {:>14}",
            account.account_number,
            account.account_holder,
            account.balance.round_dp(2).to_string()
        );
    }

    let page = &view.page;
    println!();
    println!("Transactions (page {} of {})", page.page, page.total_pages);
    if let Some(error) = &page.error {
        println!("  unavailable: {}", error.message);
    }
    let form = MutationForm::new();
    for tx in &page.transactions {
        println!("  {}", format_row(tx, form.row_state(tx)));
    }
}

fn format_row(tx: &Transaction, state: RowState) -> String {
    let route = format!(
        "{} -> {}",
        tx.from_account_number.as_deref().unwrap_or("-"),
        tx.to_account_number.as_deref().unwrap_or("-")
    );
    let marker = match state {
        RowState::Locked => " [locked]",
        _ => "",
    };
    format!(
        "#{:<6} {:<10} {:>12} {:<16} {} {}{}",
        tx.id,
        tx.kind.to_string(),
        tx.amount.round_dp(2).to_string(),
        route,
        tx.timestamp.format("%Y-%m-%d %H:%M"),
        tx.description,
        marker
    )
}
