use rusqlite::{Connection, OptionalExtension, Result, params};

use crate::model;

/// Initializes the current-value table in the SQLite database.
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS stocks (
            id INTEGER PRIMARY KEY,
            symbol TEXT NOT NULL,
            market TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            price REAL,
            updated_at INTEGER
        );",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_stocks_symbol_market ON stocks (symbol, market);",
        [],
    )?;
    Ok(())
}

/// Registers a ticker. Returns the existing id when (symbol, market) is
/// already present, so repeated registration never duplicates a row.
pub fn register_stock(conn: &Connection, symbol: &str, market: model::Market) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM stocks WHERE symbol = ?1 AND market = ?2",
            params![symbol, market],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO stocks (symbol, market) VALUES (?1, ?2)",
        params![symbol, market],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists tickers, optionally filtered by market, ordered by
/// (market, symbol) so listings and passes are deterministic.
pub fn list_stocks(
    conn: &Connection,
    market: Option<model::Market>,
) -> Result<Vec<model::StockRecord>> {
    let mut stmt = match market {
        Some(_) => conn.prepare(
            "SELECT id, symbol, market, name, price, updated_at
             FROM stocks WHERE market = ?1 ORDER BY market, symbol",
        )?,
        None => conn.prepare(
            "SELECT id, symbol, market, name, price, updated_at
             FROM stocks ORDER BY market, symbol",
        )?,
    };

    let mut rows = match market {
        Some(market) => stmt.query(params![market])?,
        None => stmt.query([])?,
    };

    let mut stocks = Vec::new();
    while let Some(row) = rows.next()? {
        stocks.push(model::StockRecord {
            id: row.get(0)?,
            symbol: row.get(1)?,
            market: row.get(2)?,
            name: row.get(3)?,
            price: row.get(4)?,
            updated_at: row.get(5)?,
        });
    }
    Ok(stocks)
}

/// Lists tickers with their history row counts in one query, for listing
/// consumers. Same filter and ordering as `list_stocks`.
pub fn list_stocks_with_history_counts(
    conn: &Connection,
    market: Option<model::Market>,
) -> Result<Vec<(model::StockRecord, u32)>> {
    let mut stmt = match market {
        Some(_) => conn.prepare(
            "SELECT id, symbol, market, name, price, updated_at,
                    (SELECT COUNT(*) FROM price_history h WHERE h.stock_id = stocks.id)
             FROM stocks WHERE market = ?1 ORDER BY market, symbol",
        )?,
        None => conn.prepare(
            "SELECT id, symbol, market, name, price, updated_at,
                    (SELECT COUNT(*) FROM price_history h WHERE h.stock_id = stocks.id)
             FROM stocks ORDER BY market, symbol",
        )?,
    };

    let mut rows = match market {
        Some(market) => stmt.query(params![market])?,
        None => stmt.query([])?,
    };

    let mut stocks = Vec::new();
    while let Some(row) = rows.next()? {
        stocks.push((
            model::StockRecord {
                id: row.get(0)?,
                symbol: row.get(1)?,
                market: row.get(2)?,
                name: row.get(3)?,
                price: row.get(4)?,
                updated_at: row.get(5)?,
            },
            row.get(6)?,
        ));
    }
    Ok(stocks)
}

/// Fetches a single ticker by id.
pub fn get_stock(conn: &Connection, id: i64) -> Result<Option<model::StockRecord>> {
    conn.query_row(
        "SELECT id, symbol, market, name, price, updated_at FROM stocks WHERE id = ?1",
        params![id],
        |row| {
            Ok(model::StockRecord {
                id: row.get(0)?,
                symbol: row.get(1)?,
                market: row.get(2)?,
                name: row.get(3)?,
                price: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )
    .optional()
}

/// Updates the current price, name and timestamp for a ticker. Returns the
/// number of rows touched; zero means the id is unknown and the caller
/// decides whether that is worth a warning.
pub fn update_current(
    conn: &Connection,
    id: i64,
    price: f64,
    name: &str,
    timestamp: i64,
) -> Result<usize> {
    conn.execute(
        "UPDATE stocks SET price = ?1, updated_at = ?2, name = ?3 WHERE id = ?4",
        params![price, timestamp, name, id],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Market;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        conn
    }

    #[test]
    fn register_is_idempotent() {
        let conn = test_conn();
        let first = register_stock(&conn, "AAPL", Market::Us).unwrap();
        let second = register_stock(&conn, "AAPL", Market::Us).unwrap();
        assert_eq!(first, second);

        let stocks = list_stocks(&conn, None).unwrap();
        assert_eq!(stocks.len(), 1);
    }

    #[test]
    fn same_symbol_different_market_gets_own_id() {
        let conn = test_conn();
        let us = register_stock(&conn, "0005", Market::Us).unwrap();
        let hk = register_stock(&conn, "0005", Market::Hk).unwrap();
        assert_ne!(us, hk);
    }

    #[test]
    fn list_orders_by_market_then_symbol() {
        let conn = test_conn();
        register_stock(&conn, "MSFT", Market::Us).unwrap();
        register_stock(&conn, "0005", Market::Hk).unwrap();
        register_stock(&conn, "AAPL", Market::Us).unwrap();

        let all = list_stocks(&conn, None).unwrap();
        let keys: Vec<_> = all
            .iter()
            .map(|s| (s.market.as_str(), s.symbol.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("HK", "0005"), ("US", "AAPL"), ("US", "MSFT")]
        );

        let us_only = list_stocks(&conn, Some(Market::Us)).unwrap();
        assert!(us_only.iter().all(|s| s.market == Market::Us));
        assert_eq!(us_only.len(), 2);
    }

    #[test]
    fn listing_with_counts_reports_history_per_ticker() {
        use crate::model::HistoryEntry;
        use crate::store::history;

        let mut conn = test_conn();
        history::create_table(&conn).unwrap();
        let aapl = register_stock(&conn, "AAPL", Market::Us).unwrap();
        register_stock(&conn, "MSFT", Market::Us).unwrap();

        for (price, timestamp) in [(150.25, 100), (151.00, 200)] {
            history::apply_refresh(
                &mut conn,
                &HistoryEntry {
                    stock_id: aapl,
                    symbol: "AAPL".into(),
                    name: "Apple Inc".into(),
                    price,
                    timestamp,
                    market: Market::Us,
                },
            )
            .unwrap();
        }

        let listed = list_stocks_with_history_counts(&conn, None).unwrap();
        let counts: Vec<_> = listed
            .iter()
            .map(|(stock, count)| (stock.symbol.as_str(), *count))
            .collect();
        assert_eq!(counts, vec![("AAPL", 2), ("MSFT", 0)]);
    }

    #[test]
    fn update_current_unknown_id_touches_no_rows() {
        let conn = test_conn();
        let rows = update_current(&conn, 999, 1.0, "Nobody", 0).unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn update_current_sets_price_name_timestamp() {
        let conn = test_conn();
        let id = register_stock(&conn, "AAPL", Market::Us).unwrap();
        let rows = update_current(&conn, id, 150.25, "Apple Inc", 1_700_000_000).unwrap();
        assert_eq!(rows, 1);

        let stock = get_stock(&conn, id).unwrap().unwrap();
        assert_eq!(stock.price, Some(150.25));
        assert_eq!(stock.name, "Apple Inc");
        assert_eq!(stock.updated_at, Some(1_700_000_000));
    }
}
