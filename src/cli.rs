use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use tariff_engine::billing::{self, BillingRequest};
use tariff_engine::config::Config;
use tariff_engine::error::{Error, Result};
use tariff_engine::replay::replay_to_tip;
use tariff_engine::storage::FileStorage;
use tariff_engine::store::TariffStore;
use tariff_engine::tariff::{
    Category, StoreCommand, TariffCommand, TariffConfiguration, TariffDraft, TariffId, TariffPatch,
    TariffState, Transition,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "tariff-engine")]
#[command(about = "Water tariff configuration store and bill calculator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: "human" or "json"
    #[arg(short, long, global = true)]
    pub format: Option<String>,

    /// Data directory path
    #[arg(short, long, global = true)]
    pub data_dir: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Actor recorded in the audit trail
    #[arg(long, global = true, default_value = "cli")]
    pub actor: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the data directory
    Init,

    /// Create a Draft configuration from a JSON file
    Create {
        /// TariffDraft JSON file
        #[arg(long)]
        file: String,
    },

    /// Edit a Draft or Paused configuration with a JSON patch file
    Update {
        id: u64,

        /// TariffPatch JSON file
        #[arg(long)]
        file: String,
    },

    /// Activate a configuration (pauses the currently Active one)
    Activate { id: u64 },

    /// Pause the Active configuration
    Pause { id: u64 },

    /// Resume a Paused configuration
    Resume { id: u64 },

    /// Finalize an Active or Paused configuration (irreversible)
    Finalize { id: u64 },

    /// Delete a configuration that is not Active
    Delete { id: u64 },

    /// List all configurations
    List,

    /// Show one configuration in full
    Show { id: u64 },

    /// Show the configuration that governs billing at a given time
    Resolve {
        /// RFC 3339 timestamp (default: now)
        #[arg(long)]
        date: Option<DateTime<Utc>>,
    },

    /// Preview a bill without recording anything
    Simulate {
        #[arg(long)]
        category: Category,

        /// Metered consumption in m³ (0 to 1e9)
        #[arg(long)]
        consumption: Decimal,

        /// Billing period date (YYYY-MM-DD)
        #[arg(long)]
        period: NaiveDate,

        #[arg(long, default_value_t = 0)]
        days_overdue: u32,

        #[arg(long)]
        early_payment: bool,
    },
}

impl Commands {
    /// Commands that append to the command log.
    fn is_write(&self) -> bool {
        matches!(
            self,
            Commands::Create { .. }
                | Commands::Update { .. }
                | Commands::Activate { .. }
                | Commands::Pause { .. }
                | Commands::Resume { .. }
                | Commands::Finalize { .. }
                | Commands::Delete { .. }
        )
    }
}

/// Read a JSON file into `T`
fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let json = fs::read_to_string(path)
        .map_err(|e| Error::Storage(format!("Failed to read file {}: {}", path, e)))?;
    serde_json::from_str(&json)
        .map_err(|e| Error::Validation(format!("Failed to parse {}: {}", path, e)))
}

/// Format output based on format type
fn format_output<T: serde::Serialize + std::fmt::Debug>(data: &T, format: &str) -> Result<String> {
    match format {
        "json" => serde_json::to_string_pretty(data)
            .map_err(|e| Error::Storage(format!("Failed to serialize JSON: {}", e))),
        _ => Ok(format!("{:#?}", data)),
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.set_data_dir(PathBuf::from(dir));
    }
    if let Some(format) = cli.format {
        config.set_output_format(format);
    }
    if let Some(level) = cli.log_level {
        config.set_log_level(level);
    }
    tariff_engine::logger::init(config.get_log_level());

    let format = config.get_output_format().to_string();
    let mut storage = FileStorage::new(&config);

    // held until this function returns, covering replay through snapshot
    let _lock = if cli.command.is_write() {
        Some(storage.lock()?)
    } else {
        None
    };

    let (book, next_command_id) = replay_to_tip(&storage)?;
    info!(configurations = book.len(), "tariff book loaded");
    let store = TariffStore::from_book(book);
    let stamp = |kind: TariffCommand| StoreCommand::new(cli.actor.clone(), tariff_engine::now(), kind);

    let kind = match cli.command {
        Commands::Init => {
            fs::create_dir_all(config.get_data_dir())
                .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
            println!("Initialized data directory at: {}", config.get_data_dir().display());
            return Ok(());
        }
        Commands::Create { file } => {
            let draft: TariffDraft = read_json(&file)?;
            TariffCommand::Create { draft }
        }
        Commands::Update { id, file } => {
            let patch: TariffPatch = read_json(&file)?;
            TariffCommand::Update {
                id: TariffId(id),
                patch,
            }
        }
        Commands::Activate { id } => TariffCommand::Activate { id: TariffId(id) },
        Commands::Pause { id } => TariffCommand::Pause { id: TariffId(id) },
        Commands::Resume { id } => TariffCommand::Resume { id: TariffId(id) },
        Commands::Finalize { id } => TariffCommand::Finalize { id: TariffId(id) },
        Commands::Delete { id } => TariffCommand::Delete { id: TariffId(id) },

        Commands::List => {
            let summaries: Vec<ConfigurationSummary> =
                store.list().iter().map(ConfigurationSummary::from).collect();
            println!("{}", format_output(&summaries, &format)?);
            return Ok(());
        }
        Commands::Show { id } => {
            let id = TariffId(id);
            let configuration = store.get(id).ok_or(Error::NotFound(id))?;
            println!("{}", format_output(&configuration, &format)?);
            return Ok(());
        }
        Commands::Resolve { date } => {
            let at = date.unwrap_or_else(tariff_engine::now);
            let configuration = store.resolve(at)?;
            println!(
                "{}",
                format_output(&ConfigurationSummary::from(&configuration), &format)?
            );
            return Ok(());
        }
        Commands::Simulate {
            category,
            consumption,
            period,
            days_overdue,
            early_payment,
        } => {
            let request = BillingRequest::new(category, consumption, period)
                .days_overdue(days_overdue)
                .early_payment(early_payment);
            let result = billing::simulate(&store.snapshot(), &request)?;
            println!("{}", format_output(&result, &format)?);
            return Ok(());
        }
    };

    let transition = store.execute_durable(&mut storage, next_command_id, &stamp(kind))?;
    match transition {
        Transition::Deleted(removed) => {
            println!("✓ Deleted tariff {} ({})", removed.id, removed.name);
        }
        other => {
            let id = other.id();
            let configuration = store.get(id).ok_or(Error::NotFound(id))?;
            println!(
                "{}",
                format_output(&ConfigurationSummary::from(&configuration), &format)?
            );
        }
    }
    Ok(())
}

#[derive(Debug, serde::Serialize)]
struct ConfigurationSummary {
    id: TariffId,
    name: String,
    state: TariffState,
    effective_from: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    tiers: usize,
    modified_by: String,
    modified_at: DateTime<Utc>,
}

impl From<&TariffConfiguration> for ConfigurationSummary {
    fn from(c: &TariffConfiguration) -> Self {
        ConfigurationSummary {
            id: c.id,
            name: c.name.clone(),
            state: c.state,
            effective_from: c.effective_from,
            expires_at: c.expires_at,
            paused_at: c.paused_at,
            tiers: c.tiers.len(),
            modified_by: c.audit.modified_by.clone(),
            modified_at: c.audit.modified_at,
        }
    }
}
