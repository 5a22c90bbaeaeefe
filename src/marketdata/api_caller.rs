use std::{collections::HashMap, env};

use crate::constants;
use crate::http::client::{self, RequestError};
use crate::model::{self, QuoteError};

use super::response;

// Base URL for the market data API.
const BASE_URL: &str = "https://api.marketdata.app/";

// Checks the status returned from the API. "no_data" is reported
// separately so callers can tell an unknown symbol from a broken request.
fn check_status(s: &str, err: &Option<String>, symbol: &str) -> Result<(), QuoteError> {
    match s {
        "ok" => Ok(()),
        "no_data" => Err(QuoteError::NotFound(symbol.into())),
        "error" => Err(QuoteError::Request(RequestError::Other(
            err.clone().unwrap_or_else(|| "Unknown error".into()),
        ))),
        _ => Err(QuoteError::Request(RequestError::Other(
            "Unknown status".into(),
        ))),
    }
}

fn token() -> Result<String, RequestError> {
    env::var(constants::MARKETDATA_TOKEN_VAR)
        .map_err(|_| RequestError::TokenNotSet(constants::MARKETDATA_TOKEN_VAR))
}

/// Fetches the latest close and issuer name for a ticker. The query key is
/// built from the symbol and market (HK symbols get a ".HK" suffix). A
/// missing issuer profile is not an error; the name comes back empty.
pub async fn latest_quote(symbol: &str, market: model::Market) -> Result<model::Quote, QuoteError> {
    let query_symbol = market.query_symbol(symbol);

    let price = last_close(&query_symbol).await?;

    let name = match issuer_name(&query_symbol).await {
        Ok(name) => name,
        Err(err) => {
            log::warn!("no issuer profile for {}: {}", query_symbol, err);
            String::new()
        }
    };

    Ok(model::Quote { price, name })
}

// Fetches a one-day candle window and returns the last close, rounded
// half-up to 2 decimal places.
async fn last_close(query_symbol: &str) -> Result<f64, QuoteError> {
    let token = token()?;

    let count = constants::QUOTE_CANDLE_COUNT.to_string();
    let resp = client::request::<response::DailyCandles>(
        client::Method::Get,
        format!("{}v1/stocks/candles/daily/{}", BASE_URL, query_symbol).as_str(),
        HashMap::from([("countback", count.as_str())]),
        HashMap::new(),
        Some(&token),
    )
    .await?;
    check_status(&resp.s, &resp.errmsg, query_symbol)?;

    match resp.c.last() {
        Some(close) => Ok((close * 100.0).round() / 100.0),
        None => Err(QuoteError::NotFound(query_symbol.into())),
    }
}

// Fetches the issuer display name from the profile endpoint.
async fn issuer_name(query_symbol: &str) -> Result<String, QuoteError> {
    let token = token()?;

    let resp = client::request::<response::IssuerProfile>(
        client::Method::Get,
        format!("{}v1/stocks/profiles/{}", BASE_URL, query_symbol).as_str(),
        HashMap::new(),
        HashMap::new(),
        Some(&token),
    )
    .await?;
    check_status(&resp.s, &resp.errmsg, query_symbol)?;

    Ok(resp.name.first().cloned().unwrap_or_default())
}
