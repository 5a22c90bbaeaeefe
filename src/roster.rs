use chrono::Local;
use rusqlite::Connection;

use crate::{
    model,
    refresh::QuoteSource,
    store::{history, stocks},
    symbols,
};

/// Registers one ticker and seeds it with its first quote: the stock gets a
/// current price and an initial history row in the same call. Fails when
/// the provider has no data for the symbol.
pub async fn add_stock<S: QuoteSource>(
    conn: &mut Connection,
    source: &S,
    symbol: &str,
    market: model::Market,
) -> model::Result<model::StockRecord> {
    let symbol = symbols::normalize_symbol(symbol, market)?;

    stocks::create_table(conn)?;
    history::create_table(conn)?;

    let quote = source.latest_quote(&symbol, market).await?;

    let id = stocks::register_stock(conn, &symbol, market)?;
    let entry = model::HistoryEntry {
        stock_id: id,
        symbol: symbol.clone(),
        name: quote.name,
        price: quote.price,
        timestamp: Local::now().timestamp(),
        market,
    };
    history::apply_refresh(conn, &entry)?;

    match stocks::get_stock(conn, id)? {
        Some(stock) => Ok(stock),
        None => Err(model::TrackerError::DatabaseError(
            rusqlite::Error::QueryReturnedNoRows,
        )),
    }
}

/// Registers every symbol in a newline-delimited file. Prices are not
/// fetched here; the next refresh pass fills them in. Returns how many
/// symbols were processed.
pub fn import_symbols(
    conn: &Connection,
    symbols_file_path: &str,
    market: model::Market,
) -> model::Result<u32> {
    let lines = symbols::read_symbols_from_file(symbols_file_path)?;

    stocks::create_table(conn)?;

    let mut imported = 0;
    let mut i = 0;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            log::warn!("line {i} is empty");
            i += 1;
            continue;
        }
        let symbol = symbols::normalize_symbol(&line, market)?;
        stocks::register_stock(conn, &symbol, market)?;
        imported += 1;
        i += 1;
    }
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::model::{Market, Quote, QuoteError};
    use crate::refresh::QuoteSource;

    struct OneQuote;

    impl QuoteSource for OneQuote {
        async fn latest_quote(
            &self,
            symbol: &str,
            _market: Market,
        ) -> Result<Quote, QuoteError> {
            if symbol == "AAPL" {
                Ok(Quote {
                    price: 150.25,
                    name: "Apple Inc".into(),
                })
            } else {
                Err(QuoteError::NotFound(symbol.into()))
            }
        }
    }

    fn test_conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn add_stock_registers_and_seeds_history() {
        let mut conn = test_conn();
        let stock = add_stock(&mut conn, &OneQuote, "aapl", Market::Us)
            .await
            .unwrap();
        assert_eq!(stock.symbol, "AAPL");
        assert_eq!(stock.price, Some(150.25));
        assert_eq!(stock.name, "Apple Inc");
        assert_eq!(
            crate::store::history::history_count(&conn, stock.id).unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn add_stock_unknown_symbol_registers_nothing() {
        let mut conn = test_conn();
        assert!(
            add_stock(&mut conn, &OneQuote, "ZZZZ", Market::Us)
                .await
                .is_err()
        );
        let stocks = crate::store::stocks::list_stocks(&conn, None).unwrap();
        assert!(stocks.is_empty());
    }

    #[test]
    fn import_symbols_registers_each_line_once() {
        let conn = test_conn();
        let path = std::env::temp_dir().join("stock_track_import_test.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "aapl\n\nmsft").unwrap();

        let imported = import_symbols(&conn, path.to_str().unwrap(), Market::Us).unwrap();
        assert_eq!(imported, 2);

        // Importing again does not duplicate.
        import_symbols(&conn, path.to_str().unwrap(), Market::Us).unwrap();
        let stocks = crate::store::stocks::list_stocks(&conn, None).unwrap();
        assert_eq!(stocks.len(), 2);

        std::fs::remove_file(path).ok();
    }
}
