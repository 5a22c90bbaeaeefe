use std::{
    fs::OpenOptions,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::model;

pub fn read_symbols_from_file(
    symbols_file_path: &str,
) -> model::Result<Vec<model::Result<String>>> {
    // Validate symbols file path
    let path = Path::new(symbols_file_path);
    if !path.exists() {
        return Err(model::TrackerError::FileNotFound(symbols_file_path.into()));
    }

    let file = OpenOptions::new().read(true).open(path)?;

    let symbols: Vec<_> = BufReader::new(file)
        .lines()
        .map(|line| line.map_err(|_e| model::TrackerError::CouldNotReadLine))
        .collect();

    if symbols.is_empty() {
        return Err(model::TrackerError::EmptySymbolFile(
            symbols_file_path.into(),
        ));
    }
    Ok(symbols)
}

/// Normalizes a symbol the way the roster stores it: HK stock numbers are
/// 1-4 digits, zero-padded to 4; US symbols are uppercased.
pub fn normalize_symbol(symbol: &str, market: model::Market) -> model::Result<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(model::TrackerError::InvalidSymbol(symbol.into()));
    }
    match market {
        model::Market::Hk => {
            if symbol.len() > 4 || !symbol.chars().all(|c| c.is_ascii_digit()) {
                return Err(model::TrackerError::InvalidSymbol(symbol.into()));
            }
            Ok(format!("{:0>4}", symbol))
        }
        model::Market::Us => Ok(symbol.to_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Market;

    #[test]
    fn hk_symbols_are_zero_padded() {
        assert_eq!(normalize_symbol("5", Market::Hk).unwrap(), "0005");
        assert_eq!(normalize_symbol("23", Market::Hk).unwrap(), "0023");
        assert_eq!(normalize_symbol("0005", Market::Hk).unwrap(), "0005");
    }

    #[test]
    fn hk_symbols_must_be_short_numeric() {
        assert!(normalize_symbol("AAPL", Market::Hk).is_err());
        assert!(normalize_symbol("12345", Market::Hk).is_err());
        assert!(normalize_symbol("", Market::Hk).is_err());
    }

    #[test]
    fn us_symbols_are_uppercased() {
        assert_eq!(normalize_symbol("aapl", Market::Us).unwrap(), "AAPL");
        assert_eq!(normalize_symbol(" msft ", Market::Us).unwrap(), "MSFT");
    }
}
