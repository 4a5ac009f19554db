//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::adapters::csv_adapter::{CsvLedger, WriteMode};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::static_price_adapter::StaticPriceAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::error::FolioError;
use crate::domain::store::{CorruptPolicy, TransactionStore};
use crate::domain::transaction::{Transaction, TransactionDraft};
use crate::domain::valuation::{PortfolioView, PositionMark, composition};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

pub const DEFAULT_LEDGER_PATH: &str = "transactions.csv";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Personal portfolio tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Record a buy or deposit
    Add {
        #[arg(short, long)]
        config: PathBuf,
        /// buy or deposit
        #[arg(long)]
        kind: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        quantity: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        cash: Option<String>,
    },
    /// Print portfolio value and positions
    Summary {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the transaction log
    Transactions {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the portfolio composition
    Composition {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::Add {
            config,
            kind,
            date,
            symbol,
            quantity,
            price,
            cash,
        } => {
            let draft = TransactionDraft {
                date: date.unwrap_or_else(today),
                kind,
                symbol,
                quantity,
                price,
                cash,
            };
            run_add(&config, &draft)
        }
        Command::Summary { config } => run_summary(&config),
        Command::Transactions { config } => run_transactions(&config),
        Command::Composition { config } => run_composition(&config),
        Command::CheckConfig { config } => run_check_config(&config),
    }
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Loads and validates the config, then installs the tracing subscriber.
fn setup(path: &Path, default_level: &str) -> Result<FileConfigAdapter, ExitCode> {
    let config = load_config(path)?;
    if let Err(e) = validate_config(&config) {
        eprintln!("error: {e}");
        return Err((&e).into());
    }
    init_logging(&config, default_level);
    Ok(config)
}

/// `RUST_LOG` overrides `default_level`; `[log] format = json` switches to JSON lines.
pub fn init_logging(config: &dyn ConfigPort, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = config
        .get_string("log", "format")
        .is_some_and(|f| f.trim().eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if result.is_err() {
        eprintln!("warning: a tracing subscriber is already installed");
    }
}

pub fn ledger_path(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_string("storage", "path")
        .map(|p| PathBuf::from(p.trim()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH))
}

fn parse_setting<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<T, FolioError>
where
    T: std::str::FromStr<Err = String> + Default,
{
    match config.get_string(section, key) {
        Some(value) => value.parse().map_err(|reason| FolioError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason,
        }),
        None => Ok(T::default()),
    }
}

pub fn build_store(config: &dyn ConfigPort) -> Result<TransactionStore, FolioError> {
    let mode: WriteMode = parse_setting(config, "storage", "write_mode")?;
    let policy: CorruptPolicy = parse_setting(config, "storage", "on_corrupt")?;
    let ledger = CsvLedger::new(ledger_path(config), mode);
    TransactionStore::open(Box::new(ledger), policy)
}

pub fn build_price_port(
    config: &dyn ConfigPort,
) -> Result<Arc<dyn PricePort + Send + Sync>, FolioError> {
    let provider = config
        .get_string("prices", "provider")
        .unwrap_or_else(|| "yahoo".to_string())
        .trim()
        .to_ascii_lowercase();

    match provider.as_str() {
        "static" => Ok(Arc::new(StaticPriceAdapter::from_config(config)?)),
        #[cfg(feature = "yahoo")]
        "yahoo" => Ok(Arc::new(
            crate::adapters::yahoo_adapter::YahooPriceAdapter::from_config(config)?,
        )),
        #[cfg(not(feature = "yahoo"))]
        "yahoo" => Err(FolioError::ConfigInvalid {
            section: "prices".into(),
            key: "provider".into(),
            reason: "yahoo feature is required for the yahoo provider".into(),
        }),
        other => Err(FolioError::ConfigInvalid {
            section: "prices".into(),
            key: "provider".into(),
            reason: format!("unknown provider '{other}'"),
        }),
    }
}

pub fn listen_addr(config: &dyn ConfigPort) -> Result<SocketAddr, FolioError> {
    let listen = config
        .get_string("web", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    listen
        .trim()
        .parse()
        .map_err(|_| FolioError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: format!("'{listen}' is not a socket address"),
        })
}

fn fail(err: FolioError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn run_add(config_path: &Path, draft: &TransactionDraft) -> ExitCode {
    let config = match setup(config_path, "warn") {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match build_store(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    match store.append(draft) {
        Ok(tx) => {
            println!("recorded: {}", format_transaction(&tx));
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_summary(config_path: &Path) -> ExitCode {
    let config = match setup(config_path, "warn") {
        Ok(c) => c,
        Err(code) => return code,
    };
    let log = match build_store(&config).and_then(|s| s.snapshot()) {
        Ok(l) => l,
        Err(e) => return fail(e),
    };
    let prices = match build_price_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let view = PortfolioView::compute(&log, &*prices);
    print!("{}", format_summary(&view));
    ExitCode::SUCCESS
}

fn run_transactions(config_path: &Path) -> ExitCode {
    let config = match setup(config_path, "warn") {
        Ok(c) => c,
        Err(code) => return code,
    };
    let log = match build_store(&config).and_then(|s| s.snapshot()) {
        Ok(l) => l,
        Err(e) => return fail(e),
    };
    if log.is_empty() {
        eprintln!("No transactions recorded");
    }
    for tx in &log {
        println!("{}", format_transaction(tx));
    }
    ExitCode::SUCCESS
}

fn run_composition(config_path: &Path) -> ExitCode {
    let config = match setup(config_path, "warn") {
        Ok(c) => c,
        Err(code) => return code,
    };
    let log = match build_store(&config).and_then(|s| s.snapshot()) {
        Ok(l) => l,
        Err(e) => return fail(e),
    };
    println!("{:<10} {:>12} {:>12} {:>14}", "SYMBOL", "QUANTITY", "MEAN PRICE", "TOTAL VALUE");
    for row in composition(&log) {
        println!(
            "{:<10} {:>12} {:>12} {:>14}",
            row.symbol, row.total_quantity, row.mean_price, row.total_value
        );
    }
    ExitCode::SUCCESS
}

fn run_check_config(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Ledger: {}", ledger_path(&config).display());
    eprintln!(
        "Price provider: {}",
        config
            .get_string("prices", "provider")
            .unwrap_or_else(|| "yahoo".to_string())
    );
    eprintln!("Configuration is valid.");
    ExitCode::SUCCESS
}

pub fn format_transaction(tx: &Transaction) -> String {
    match tx {
        Transaction::Buy(b) => format!(
            "{} buy {} {} @ {}",
            b.date, b.symbol, b.quantity, b.price
        ),
        Transaction::Deposit(d) => format!("{} deposit {}", d.date, d.cash),
    }
}

pub fn format_summary(view: &PortfolioView) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total value:    {}\n", view.summary.value));
    out.push_str(&format!("Cash deposited: {}\n", view.summary.cash));

    if !view.positions.is_empty() {
        out.push_str(&format!(
            "\n{:<10} {:>10} {:>12} {:>10} {:>10} {:>12} {:>10} {:>9}\n",
            "SYMBOL", "QUANTITY", "COST", "AVG COST", "PRICE", "VALUE", "P/L", "P/L %"
        ));
        for pos in view.positions.values() {
            let priced = match &pos.mark {
                PositionMark::Priced {
                    current_price,
                    market_value,
                    profit_loss,
                    profit_loss_percent,
                } => format!(
                    "{:>10} {:>12} {:>10} {:>9}",
                    current_price,
                    market_value,
                    profit_loss,
                    format!("{profit_loss_percent}%")
                ),
                PositionMark::Unavailable { .. } => format!("{:>10}", "n/a"),
            };
            out.push_str(&format!(
                "{:<10} {:>10} {:>12} {:>10} {}\n",
                pos.symbol, pos.total_quantity, pos.total_cost, pos.average_cost, priced
            ));
        }
    }

    for u in &view.summary.unavailable {
        out.push_str(&format!(
            "warning: {} excluded from total ({})\n",
            u.symbol, u.reason
        ));
    }
    out
}

fn run_serve(config_path: &Path) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};

        let config = match setup(config_path, "info") {
            Ok(c) => c,
            Err(code) => return code,
        };

        let store = match build_store(&config) {
            Ok(s) => Arc::new(s),
            Err(e) => return fail(e),
        };
        let prices = match build_price_port(&config) {
            Ok(p) => p,
            Err(e) => return fail(e),
        };
        let addr = match listen_addr(&config) {
            Ok(a) => a,
            Err(e) => return fail(e),
        };

        if store.is_read_only() {
            tracing::warn!("serving a read-only ledger; new transactions will be rejected");
        }

        // The blocking HTTP client inside the price port must be dropped
        // outside the async runtime, so keep one handle out here.
        let prices_handle = prices.clone();
        let router = build_router(AppState { store, prices });

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => return fail(FolioError::Io(e)),
        };

        let price_source = prices_handle.name().to_string();
        let result: Result<(), std::io::Error> = runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, %price_source, "listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("shutting down");
                })
                .await
        });

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(FolioError::Io(e)),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
