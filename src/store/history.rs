use rusqlite::{Connection, Result, params};

use crate::model;
use crate::store::stocks;

/// Initializes the append-only price history table.
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS price_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stock_id INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            timestamp INTEGER NOT NULL,
            market TEXT NOT NULL
        );",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_stock_timestamp
         ON price_history (stock_id, timestamp);",
        [],
    )?;
    Ok(())
}

/// Appends one history row. History rows are never updated or deleted.
pub fn append_history(conn: &Connection, entry: &model::HistoryEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO price_history (stock_id, symbol, name, price, timestamp, market)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.stock_id,
            entry.symbol,
            entry.name,
            entry.price,
            entry.timestamp,
            entry.market,
        ],
    )?;
    Ok(())
}

/// Applies one refresh: history insert plus current-row update under a
/// single transaction, so a ticker's refresh fully applies or fully fails.
pub fn apply_refresh(conn: &mut Connection, entry: &model::HistoryEntry) -> Result<()> {
    let transaction = conn.transaction()?;
    append_history(&transaction, entry)?;
    let rows = stocks::update_current(
        &transaction,
        entry.stock_id,
        entry.price,
        &entry.name,
        entry.timestamp,
    )?;
    if rows == 0 {
        log::warn!(
            "no current row for stock id {} ({}), history appended anyway",
            entry.stock_id,
            entry.symbol
        );
    }
    transaction.commit()
}

/// Returns history rows newest first, optionally filtered by symbol and/or
/// market.
pub fn list_history(
    conn: &Connection,
    symbol: Option<&str>,
    market: Option<model::Market>,
    limit: u32,
) -> Result<Vec<model::HistoryEntry>> {
    let mut sql = String::from(
        "SELECT stock_id, symbol, name, price, timestamp, market FROM price_history",
    );
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(symbol) = symbol {
        clauses.push("symbol = ?");
        args.push(Box::new(symbol.to_string()));
    }
    if let Some(market) = market {
        clauses.push("market = ?");
        args.push(Box::new(market));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");
    args.push(Box::new(limit));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())))?;

    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(model::HistoryEntry {
            stock_id: row.get(0)?,
            symbol: row.get(1)?,
            name: row.get(2)?,
            price: row.get(3)?,
            timestamp: row.get(4)?,
            market: row.get(5)?,
        });
    }
    Ok(entries)
}

/// Number of history rows recorded for a ticker.
pub fn history_count(conn: &Connection, stock_id: i64) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM price_history WHERE stock_id = ?1",
        params![stock_id],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HistoryEntry, Market};
    use crate::store::stocks;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        stocks::create_table(&conn).unwrap();
        create_table(&conn).unwrap();
        conn
    }

    fn entry(stock_id: i64, price: f64, timestamp: i64) -> HistoryEntry {
        HistoryEntry {
            stock_id,
            symbol: "AAPL".into(),
            name: "Apple Inc".into(),
            price,
            timestamp,
            market: Market::Us,
        }
    }

    #[test]
    fn apply_refresh_writes_both_tables_with_one_timestamp() {
        let mut conn = test_conn();
        let id = stocks::register_stock(&conn, "AAPL", Market::Us).unwrap();

        apply_refresh(&mut conn, &entry(id, 150.25, 1_700_000_000)).unwrap();

        let stock = stocks::get_stock(&conn, id).unwrap().unwrap();
        let newest = &list_history(&conn, Some("AAPL"), None, 1).unwrap()[0];
        assert_eq!(stock.price, Some(newest.price));
        assert_eq!(stock.updated_at, Some(newest.timestamp));
        assert_eq!(newest.price, 150.25);
        assert_eq!(newest.timestamp, 1_700_000_000);
    }

    #[test]
    fn failed_update_rolls_back_history_insert() {
        let mut conn = test_conn();
        let id = stocks::register_stock(&conn, "AAPL", Market::Us).unwrap();

        // Make the current-row update fail after the history insert by
        // taking the stocks table away.
        conn.execute("ALTER TABLE stocks RENAME TO stocks_gone", [])
            .unwrap();

        let result = apply_refresh(&mut conn, &entry(id, 150.25, 1_700_000_000));
        assert!(result.is_err());

        // The insert must not survive the failed update.
        assert_eq!(history_count(&conn, id).unwrap(), 0);
    }

    #[test]
    fn history_is_append_only_across_refreshes() {
        let mut conn = test_conn();
        let id = stocks::register_stock(&conn, "AAPL", Market::Us).unwrap();

        apply_refresh(&mut conn, &entry(id, 150.25, 100)).unwrap();
        apply_refresh(&mut conn, &entry(id, 151.00, 200)).unwrap();

        assert_eq!(history_count(&conn, id).unwrap(), 2);
        let newest = &list_history(&conn, None, None, 10).unwrap()[0];
        assert_eq!(newest.price, 151.00);

        // The older snapshot is untouched.
        let all = list_history(&conn, None, None, 10).unwrap();
        assert_eq!(all[1].price, 150.25);
    }

    #[test]
    fn history_name_snapshot_survives_rename() {
        let mut conn = test_conn();
        let id = stocks::register_stock(&conn, "AAPL", Market::Us).unwrap();
        apply_refresh(&mut conn, &entry(id, 150.25, 100)).unwrap();

        let mut renamed = entry(id, 151.00, 200);
        renamed.name = "Apple Computer".into();
        apply_refresh(&mut conn, &renamed).unwrap();

        let all = list_history(&conn, None, None, 10).unwrap();
        assert_eq!(all[0].name, "Apple Computer");
        assert_eq!(all[1].name, "Apple Inc");
    }

    #[test]
    fn list_history_filters_by_market() {
        let mut conn = test_conn();
        let us = stocks::register_stock(&conn, "AAPL", Market::Us).unwrap();
        let hk = stocks::register_stock(&conn, "0005", Market::Hk).unwrap();
        apply_refresh(&mut conn, &entry(us, 150.25, 100)).unwrap();
        let mut hk_entry = entry(hk, 39.15, 100);
        hk_entry.symbol = "0005".into();
        hk_entry.market = Market::Hk;
        apply_refresh(&mut conn, &hk_entry).unwrap();

        let hk_rows = list_history(&conn, None, Some(Market::Hk), 10).unwrap();
        assert_eq!(hk_rows.len(), 1);
        assert_eq!(hk_rows[0].symbol, "0005");
    }
}
