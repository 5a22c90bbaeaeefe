use std::{env::VarError, error::Error, fmt::Display, io};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::http::client;

/// Market a ticker is listed on. Affects how the quote query key is built:
/// HK symbols get a ".HK" suffix, US symbols are used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Market {
    Us,
    Hk,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Us => "US",
            Market::Hk => "HK",
        }
    }

    /// Symbol as the quote provider expects it.
    pub fn query_symbol(&self, symbol: &str) -> String {
        match self {
            Market::Us => symbol.to_string(),
            Market::Hk => format!("{}.HK", symbol),
        }
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Market {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(rusqlite::types::Value::Text(
            self.as_str().to_string(),
        )))
    }
}

impl FromSql for Market {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(s) => match std::str::from_utf8(s) {
                Ok("US") => Ok(Market::Us),
                Ok("HK") => Ok(Market::Hk),
                _ => Err(FromSqlError::InvalidType),
            },
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// One row of the current-value table.
#[derive(Debug, Clone)]
pub struct StockRecord {
    pub id: i64,                 // Stable ticker id, assigned at registration.
    pub symbol: String,          // Ticker symbol as registered.
    pub market: Market,          // Listing market.
    pub name: String,            // Issuer display name, refreshed on each pass.
    pub price: Option<f64>,      // Latest close; None until first refresh.
    pub updated_at: Option<i64>, // Unix seconds of the latest refresh.
}

/// One append-only history row. Symbol and name are snapshots taken at
/// write time and are never rewritten when the stock record changes later.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub stock_id: i64,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub timestamp: i64, // Unix seconds, shared with the current-row update.
    pub market: Market,
}

/// Latest quote for a ticker as returned by the price source.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,   // Last close, rounded to 2 decimal places.
    pub name: String, // Issuer display name; empty when unavailable.
}

/// Why a quote could not be produced for a ticker.
#[derive(Debug)]
pub enum QuoteError {
    /// Symbol unknown to the provider or no trading data in the window.
    NotFound(String),
    /// Transport or provider-side failure.
    Request(client::RequestError),
}

impl Display for QuoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteError::NotFound(symbol) => write!(f, "no data for {}", symbol),
            QuoteError::Request(err) => write!(f, "{}", err),
        }
    }
}

impl Error for QuoteError {}

impl From<client::RequestError> for QuoteError {
    fn from(value: client::RequestError) -> Self {
        Self::Request(value)
    }
}

/// Outcome of one ticker within a refresh pass.
#[derive(Debug)]
pub struct TickerOutcome {
    pub symbol: String,
    pub market: Market,
    // Price on success, failure reason otherwise.
    pub result: std::result::Result<f64, String>,
}

/// Aggregate result of one refresh pass.
#[derive(Debug, Default)]
pub struct PassTally {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub outcomes: Vec<TickerOutcome>,
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug)]
pub enum TrackerError {
    FileNotFound(String),
    CouldNotOpenFile(io::Error),
    CouldNotReadLine,
    EmptySymbolFile(String),
    InvalidSymbol(String),
    NoData(String),
    DatabaseError(rusqlite::Error),
    HttpError(client::RequestError),
    CsvError(csv::Error),
    EnvVarNotSet(VarError),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for TrackerError {}

impl From<VarError> for TrackerError {
    fn from(value: VarError) -> Self {
        Self::EnvVarNotSet(value)
    }
}

impl From<io::Error> for TrackerError {
    fn from(value: io::Error) -> Self {
        Self::CouldNotOpenFile(value)
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl From<client::RequestError> for TrackerError {
    fn from(value: client::RequestError) -> Self {
        Self::HttpError(value)
    }
}

impl From<csv::Error> for TrackerError {
    fn from(value: csv::Error) -> Self {
        Self::CsvError(value)
    }
}

impl From<QuoteError> for TrackerError {
    fn from(value: QuoteError) -> Self {
        match value {
            QuoteError::NotFound(symbol) => Self::NoData(symbol),
            QuoteError::Request(err) => Self::HttpError(err),
        }
    }
}
