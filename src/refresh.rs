use chrono::Local;
use rusqlite::Connection;
use tokio::time::{Duration, sleep};

use crate::{
    marketdata::api_caller,
    model::{self, PassTally, QuoteError, TickerOutcome},
    store::{history, stocks},
};

/// Where the engine gets its quotes from. The production source is the
/// market data API; tests substitute a canned one.
pub trait QuoteSource {
    async fn latest_quote(
        &self,
        symbol: &str,
        market: model::Market,
    ) -> Result<model::Quote, QuoteError>;
}

/// Quote source backed by the market data API.
pub struct ApiQuoteSource;

impl QuoteSource for ApiQuoteSource {
    async fn latest_quote(
        &self,
        symbol: &str,
        market: model::Market,
    ) -> Result<model::Quote, QuoteError> {
        api_caller::latest_quote(symbol, market).await
    }
}

/// Settings for one refresh pass.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Restrict the pass to one market; None refreshes the whole roster.
    pub market: Option<model::Market>,
    /// Extra fetch attempts after a transport failure. NotFound is never
    /// retried; a symbol with no data will not grow data on a retry.
    pub max_retries: u32,
    /// Delay between fetch attempts.
    pub retry_delay: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            market: None,
            max_retries: 0,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Runs one refresh pass over the roster: fetch each ticker's latest quote
/// and apply it to the store. Tickers are processed one at a time; a
/// failing ticker is tallied and the pass moves on. Only a roster-load
/// failure aborts the pass.
pub async fn run_pass<S: QuoteSource>(
    conn: &mut Connection,
    source: &S,
    config: &RefreshConfig,
) -> model::Result<PassTally> {
    stocks::create_table(conn)?;
    history::create_table(conn)?;

    let roster = stocks::list_stocks(conn, config.market)?;
    if roster.is_empty() {
        log::info!("no stocks registered, nothing to refresh");
        return Ok(PassTally::default());
    }

    log::info!("refreshing {} stocks", roster.len());
    let mut tally = PassTally::default();

    for stock in roster {
        tally.attempted += 1;

        let quote = fetch_with_retry(source, &stock, config).await;
        let quote = match quote {
            Ok(quote) => quote,
            Err(err) => {
                log::warn!("{} ({}): {}", stock.symbol, stock.market, err);
                tally.failed += 1;
                tally.outcomes.push(TickerOutcome {
                    symbol: stock.symbol,
                    market: stock.market,
                    result: Err(err.to_string()),
                });
                continue;
            }
        };

        // One timestamp shared by the history row and the current-row
        // update, so the two stay equal whenever the refresh applies.
        let timestamp = Local::now().timestamp();
        let entry = model::HistoryEntry {
            stock_id: stock.id,
            symbol: stock.symbol.clone(),
            name: quote.name,
            price: quote.price,
            timestamp,
            market: stock.market,
        };

        match history::apply_refresh(conn, &entry) {
            Ok(()) => {
                log::info!(
                    "{} ({}) {}: {}",
                    entry.symbol,
                    entry.market,
                    entry.name,
                    entry.price
                );
                tally.succeeded += 1;
                tally.outcomes.push(TickerOutcome {
                    symbol: entry.symbol,
                    market: entry.market,
                    result: Ok(entry.price),
                });
            }
            Err(err) => {
                log::warn!("{} ({}): write failed: {}", entry.symbol, entry.market, err);
                tally.failed += 1;
                tally.outcomes.push(TickerOutcome {
                    symbol: entry.symbol,
                    market: entry.market,
                    result: Err(err.to_string()),
                });
            }
        }
    }

    log::info!(
        "pass complete: {} attempted, {} succeeded, {} failed",
        tally.attempted,
        tally.succeeded,
        tally.failed
    );
    Ok(tally)
}

async fn fetch_with_retry<S: QuoteSource>(
    source: &S,
    stock: &model::StockRecord,
    config: &RefreshConfig,
) -> Result<model::Quote, QuoteError> {
    let mut attempt = 0;
    loop {
        match source.latest_quote(&stock.symbol, stock.market).await {
            Ok(quote) => return Ok(quote),
            Err(QuoteError::NotFound(s)) => return Err(QuoteError::NotFound(s)),
            Err(err) => {
                if attempt >= config.max_retries {
                    return Err(err);
                }
                attempt += 1;
                log::warn!(
                    "{} ({}): fetch attempt {} failed, retrying: {}",
                    stock.symbol,
                    stock.market,
                    attempt,
                    err
                );
                sleep(config.retry_delay).await;
            }
        }
    }
}
