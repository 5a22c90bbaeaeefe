use std::{fs::File, io::BufWriter};

use csv::Writer;
use rusqlite::Connection;

use crate::{model, store::history};

/// Writes history rows to a CSV file, newest first, optionally filtered by
/// market and/or symbol. Returns the number of rows written.
pub fn export_history_to_csv(
    conn: &Connection,
    output_path: &str,
    symbol: Option<&str>,
    market: Option<model::Market>,
    limit: u32,
) -> model::Result<u32> {
    let entries = history::list_history(conn, symbol, market, limit)?;

    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(BufWriter::new(file));

    // Write header row
    writer.write_record([
        "stock_id", "symbol", "name", "price", "timestamp", "market",
    ])?;

    // Write the data rows.
    for entry in &entries {
        writer.write_record([
            entry.stock_id.to_string(),
            entry.symbol.clone(),
            entry.name.clone(),
            format!("{:.2}", entry.price),
            entry.timestamp.to_string(),
            entry.market.as_str().to_string(),
        ])?;
    }
    writer.flush().map_err(model::TrackerError::CouldNotOpenFile)?;

    Ok(entries.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HistoryEntry, Market};
    use crate::store::{history, stocks};

    #[test]
    fn export_writes_header_and_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        stocks::create_table(&conn).unwrap();
        history::create_table(&conn).unwrap();
        let id = stocks::register_stock(&conn, "AAPL", Market::Us).unwrap();
        history::apply_refresh(
            &mut conn,
            &HistoryEntry {
                stock_id: id,
                symbol: "AAPL".into(),
                name: "Apple Inc".into(),
                price: 150.25,
                timestamp: 1_700_000_000,
                market: Market::Us,
            },
        )
        .unwrap();

        let path = std::env::temp_dir().join("stock_track_export_test.csv");
        let written =
            export_history_to_csv(&conn, path.to_str().unwrap(), None, None, 100).unwrap();
        assert_eq!(written, 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "stock_id,symbol,name,price,timestamp,market"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("AAPL"));
        assert!(row.contains("150.25"));
        assert!(row.contains("US"));

        std::fs::remove_file(path).ok();
    }
}
