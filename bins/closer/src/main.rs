//! Frostbook closer
//!
//! Loads a ledger snapshot and validates it, freezes periods, derives
//! exchange rates or prints financial statements.

mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use frostbook_core::{
    ClosingService, CurrencyService, LedgerContext, LedgerStore, ReportService, TimeGroupManager,
};
use frostbook_db::{MemoryStore, Snapshot};
use frostbook_shared::types::{CurrencyId, UserId};
use frostbook_shared::{AppConfig, ExchangeRateBasis, Rational};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "closer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Ledger snapshot to read (also read from `FROSTBOOK_SNAPSHOT`).
    #[arg(long, env = "FROSTBOOK_SNAPSHOT", global = true, default_value = "ledger.json")]
    snapshot: PathBuf,

    /// Instant treated as now, RFC 3339. Defaults to the system clock.
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    /// Exchange rate basis. Defaults to `ledger.exchange_rate_basis`.
    #[arg(long, global = true)]
    basis: Option<Basis>,

    /// Output format.
    #[arg(short = 'f', long, global = true, default_value = "json")]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Basis {
    Periodic,
    Latest,
}

impl From<Basis> for ExchangeRateBasis {
    fn from(basis: Basis) -> Self {
        match basis {
            Basis::Periodic => Self::Periodic,
            Basis::Latest => Self::Latest,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum Format {
    #[default]
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay every record of the snapshot through the ledger rules
    Validate,
    /// Freeze the next period, or compute it without saving
    Freeze(FreezeArgs),
    /// Derive the rate between two currencies
    Rate(RateArgs),
    /// Print statements for every time group, or for a candidate period
    Statements(StatementArgs),
}

#[derive(Args, Debug)]
struct Window {
    /// Inclusive start, RFC 3339.
    #[arg(long)]
    from: DateTime<Utc>,
    /// Exclusive end, RFC 3339.
    #[arg(long)]
    to: DateTime<Utc>,
}

#[derive(Args, Debug)]
struct FreezeArgs {
    #[command(flatten)]
    window: Window,
    /// Compute the period without persisting it.
    #[arg(long)]
    dry_run: bool,
    /// Where to write the updated snapshot. Defaults to the input.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RateArgs {
    /// Currency given up.
    #[arg(long)]
    source: u64,
    /// Currency received.
    #[arg(long)]
    destination: u64,
    /// Instant the rate is taken at. Defaults to now.
    #[arg(long)]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
struct StatementArgs {
    /// Currency the statements are reported in.
    #[arg(long)]
    currency: u64,
    /// Inclusive start of a candidate period, RFC 3339.
    #[arg(long, requires = "to")]
    from: Option<DateTime<Utc>>,
    /// Exclusive end of a candidate period, RFC 3339.
    #[arg(long, requires = "from")]
    to: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ValidationReport {
    owner_id: UserId,
    currencies: usize,
    accounts: usize,
    modifiers: usize,
    financial_entries: usize,
    frozen_periods: usize,
}

#[derive(Serialize)]
struct RateReport {
    source_currency_id: CurrencyId,
    destination_currency_id: CurrencyId,
    as_of: DateTime<Utc>,
    basis: ExchangeRateBasis,
    rate: Rational,
    display: String,
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let json = config.log.json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config);

    let cli = Cli::parse();
    run(cli, &config)
}

fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    let snapshot = Snapshot::load(&cli.snapshot)
        .with_context(|| format!("failed to read {}", cli.snapshot.display()))?;
    let owner_id = snapshot.owner_id;
    let report = ValidationReport {
        owner_id,
        currencies: snapshot.currencies.len(),
        accounts: snapshot.accounts.len(),
        modifiers: snapshot.modifiers.len(),
        financial_entries: snapshot.financial_entries.len(),
        frozen_periods: snapshot.frozen_periods.len(),
    };
    let mut store = snapshot
        .into_store()
        .context("snapshot breaks the ledger rules")?;

    let basis = cli
        .basis
        .map_or(config.ledger.exchange_rate_basis, ExchangeRateBasis::from);
    let ctx = LedgerContext::new(owner_id, cli.now.unwrap_or_else(Utc::now)).with_basis(basis);
    let scale = config.ledger.display_scale;

    match cli.command {
        Command::Validate => {
            info!(owner_id = %owner_id, entries = report.financial_entries, "snapshot is valid");
            print_json(&report)
        }
        Command::Freeze(args) => freeze(&mut store, &ctx, &cli.snapshot, args),
        Command::Rate(args) => {
            let source = CurrencyId::new(args.source);
            let destination = CurrencyId::new(args.destination);
            let as_of = args.as_of.unwrap_or(ctx.now);
            let rate = CurrencyService::derive_exchange_rate(
                &store,
                &ctx,
                source,
                destination,
                as_of,
                basis,
            )?;
            let display = CurrencyService::render(&rate, scale);
            match cli.format {
                Format::Json => print_json(&RateReport {
                    source_currency_id: source,
                    destination_currency_id: destination,
                    as_of: CurrencyService::effective_as_of(basis, as_of, ctx.now),
                    basis,
                    rate,
                    display,
                }),
                Format::Text => {
                    println!("1 {} = {display} {}", args.source, args.destination);
                    Ok(())
                }
            }
        }
        Command::Statements(args) => {
            let destination = CurrencyId::new(args.currency);
            let periods = match (args.from, args.to) {
                (Some(from), Some(to)) => vec![ClosingService::dry_run_statements(
                    &store,
                    &ctx,
                    from,
                    to,
                    destination,
                )?],
                _ => {
                    let mut manager = TimeGroupManager::new(&store, ctx)?;
                    ReportService::generate_statements(&mut manager, destination)?
                }
            };
            match cli.format {
                Format::Json => print_json(&periods),
                Format::Text => {
                    let currencies = store.load_currencies(owner_id)?;
                    print!("{}", render::statements(&periods, &currencies, scale)?);
                    Ok(())
                }
            }
        }
    }
}

fn freeze(
    store: &mut MemoryStore,
    ctx: &LedgerContext,
    snapshot_path: &Path,
    args: FreezeArgs,
) -> Result<()> {
    let Window { from, to } = args.window;
    if args.dry_run {
        let computation = ClosingService::compute_frozen_period(&*store, ctx, from, to)?;
        return print_json(&computation);
    }

    let period = ClosingService::freeze_period(store, ctx, from, to)?;
    let output = args.output.as_deref().unwrap_or(snapshot_path);
    Snapshot::capture(store, ctx.user_id)
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(period_id = %period.id, path = %output.display(), "snapshot updated");
    print_json(&period)
}
