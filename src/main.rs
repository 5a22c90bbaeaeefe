// Main function for the stock price tracker.
mod marketdata {
    // Client for fetching quotes.
    pub mod api_caller;
    // Response structures for the quote API.
    pub mod response;
}
// HTTP client module.
mod http {
    // HTTP client implementation.
    pub mod client;
}
// Data models.
mod model;
// Price refresh engine.
mod refresh;
// Roster maintenance (add/import).
mod roster;
// History CSV export.
mod export;
// Database snapshot transport (Dropbox).
mod snapshot;
// Symbol file reading and normalization.
mod symbols;
// Data storage module.
mod store {
    /// Current-value table.
    pub mod stocks;
    /// Append-only price history table.
    pub mod history;
    /// SQLite database interaction.
    pub mod sqlite;
}
// module storing defaults
mod constants;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tokio::time::Duration;

use crate::model::Market;

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

// Subcommands for the application.
#[derive(Subcommand, Debug)]
enum Commands {
    // Refresh prices for every registered stock.
    UpdateAll {
        #[arg(long, value_enum)]
        market: Option<Market>,
        // Extra fetch attempts after a transport failure.
        #[arg(long, default_value_t = 0)]
        retries: u32,
        #[arg(long, default_value_t = 1)]
        retry_delay_secs: u64,
    },
    // Register one stock and fetch its first quote.
    AddStock {
        symbol: String,
        #[arg(value_enum)]
        market: Market,
    },
    // Register every symbol in a newline-delimited file.
    ImportSymbols {
        symbols_file_path: String,
        #[arg(value_enum)]
        market: Market,
    },
    // List the roster with current prices.
    ListStocks {
        #[arg(long, value_enum)]
        market: Option<Market>,
    },
    // Show price history, newest first.
    History {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, value_enum)]
        market: Option<Market>,
        #[arg(long, default_value_t = constants::HISTORY_PAGE_SIZE)]
        limit: u32,
    },
    // Export price history to a CSV file.
    ExportCsv {
        output_path: String,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, value_enum)]
        market: Option<Market>,
        #[arg(long, default_value_t = u32::MAX)]
        limit: u32,
    },
    // Upload the SQLite file to Dropbox.
    PushDb {
        #[arg(long, default_value = constants::DEFAULT_SNAPSHOT_PATH)]
        dropbox_path: String,
    },
    // Download the SQLite file from Dropbox.
    PullDb {
        #[arg(long, default_value = constants::DEFAULT_SNAPSHOT_PATH)]
        dropbox_path: String,
    },
}

#[tokio::main]
// Main function entry point.
async fn main() {
    dotenv().ok();

    env_logger::init();

    let args = Args::parse();

    // Snapshot commands work on the file itself, before any connection.
    match &args.command {
        Commands::PushDb { dropbox_path } => {
            match snapshot::push_database(dropbox_path).await {
                Ok(size) => log::info!("Successfully pushed database ({} bytes)", size),
                Err(err) => log::error!("Error pushing database: {}", err),
            }
            return;
        }
        Commands::PullDb { dropbox_path } => {
            match snapshot::pull_database(dropbox_path).await {
                Ok(size) => log::info!("Successfully pulled database ({} bytes)", size),
                Err(err) => log::error!("Error pulling database: {}", err),
            }
            return;
        }
        _ => {}
    }

    let conn = store::sqlite::init_connection();
    if let Err(err) = conn {
        log::error!("Error initializing database connection: {}", err);
        return;
    }
    let mut conn = conn.unwrap();

    match args.command {
        Commands::UpdateAll {
            market,
            retries,
            retry_delay_secs,
        } => {
            let config = refresh::RefreshConfig {
                market,
                max_retries: retries,
                retry_delay: Duration::from_secs(retry_delay_secs),
            };
            match refresh::run_pass(&mut conn, &refresh::ApiQuoteSource, &config).await {
                Ok(tally) => {
                    for outcome in &tally.outcomes {
                        match &outcome.result {
                            Ok(price) => {
                                println!("✓ {} ({}): {}", outcome.symbol, outcome.market, price)
                            }
                            Err(reason) => {
                                println!("✗ {} ({}): {}", outcome.symbol, outcome.market, reason)
                            }
                        }
                    }
                    println!(
                        "Update complete! {} attempted, {} succeeded, {} failed.",
                        tally.attempted, tally.succeeded, tally.failed
                    );
                }
                Err(err) => log::error!("Error refreshing prices: {}", err),
            }
        }

        Commands::AddStock { symbol, market } => {
            match roster::add_stock(&mut conn, &refresh::ApiQuoteSource, &symbol, market).await {
                Ok(stock) => println!(
                    "Added {} ({}) {}: {}",
                    stock.symbol,
                    stock.market,
                    stock.name,
                    stock.price.unwrap_or(0.0)
                ),
                Err(err) => log::error!("Error adding stock: {}", err),
            }
        }

        Commands::ImportSymbols {
            symbols_file_path,
            market,
        } => match roster::import_symbols(&conn, &symbols_file_path, market) {
            Ok(count) => log::info!("Successfully imported {} symbols", count),
            Err(err) => log::error!("Error importing symbols: {}", err),
        },

        Commands::ListStocks { market } => match list_stocks(&conn, market) {
            Ok(_) => {}
            Err(err) => log::error!("Error listing stocks: {}", err),
        },

        Commands::History {
            symbol,
            market,
            limit,
        } => match list_history(&conn, symbol.as_deref(), market, limit) {
            Ok(_) => {}
            Err(err) => log::error!("Error listing history: {}", err),
        },

        Commands::ExportCsv {
            output_path,
            symbol,
            market,
            limit,
        } => match export::export_history_to_csv(
            &conn,
            &output_path,
            symbol.as_deref(),
            market,
            limit,
        ) {
            Ok(count) => log::info!("Exported {} history rows to {}", count, output_path),
            Err(err) => log::error!("Error exporting history: {}", err),
        },

        Commands::PushDb { .. } | Commands::PullDb { .. } => unreachable!(),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    match chrono::DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}

fn list_stocks(conn: &rusqlite::Connection, market: Option<Market>) -> model::Result<()> {
    store::stocks::create_table(conn)?;
    store::history::create_table(conn)?;
    let stocks = store::stocks::list_stocks_with_history_counts(conn, market)?;
    if stocks.is_empty() {
        println!("No stocks found in the database.");
        return Ok(());
    }

    println!(
        "{:<6} {:<7} {:<30} {:>10}  {:<19}  {:>7}",
        "Symbol", "Market", "Company Name", "Price", "Last Updated", "History"
    );
    println!("{}", "-".repeat(90));
    for (stock, count) in stocks {
        let price = match stock.price {
            Some(price) => format!("${:.2}", price),
            None => "-".to_string(),
        };
        let updated = match stock.updated_at {
            Some(ts) => format_timestamp(ts),
            None => "-".to_string(),
        };
        println!(
            "{:<6} {:<7} {:<30} {:>10}  {:<19}  {:>7}",
            stock.symbol,
            stock.market,
            stock.name.chars().take(30).collect::<String>(),
            price,
            updated,
            count
        );
    }
    Ok(())
}

fn list_history(
    conn: &rusqlite::Connection,
    symbol: Option<&str>,
    market: Option<Market>,
    limit: u32,
) -> model::Result<()> {
    store::history::create_table(conn)?;
    let entries = store::history::list_history(conn, symbol, market, limit)?;
    if entries.is_empty() {
        println!("No price history found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<7} {:<30} {:>10}  {:<19}",
        "Symbol", "Market", "Company Name", "Price", "Timestamp"
    );
    println!("{}", "-".repeat(75));
    for entry in entries {
        println!(
            "{:<6} {:<7} {:<30} {:>10}  {:<19}",
            entry.symbol,
            entry.market,
            entry.name.chars().take(30).collect::<String>(),
            format!("${:.2}", entry.price),
            format_timestamp(entry.timestamp)
        );
    }
    Ok(())
}
