// Defaults shared across modules.

/// Environment variable holding the quote API token.
pub const MARKETDATA_TOKEN_VAR: &str = "marketdata_token";

/// Environment variable holding the Dropbox access token.
pub const DROPBOX_TOKEN_VAR: &str = "dropbox_token";

/// Environment variable holding the SQLite file path.
pub const SQLITE_FILE_VAR: &str = "sqlite_file";

/// SQLite file used when `sqlite_file` is not set.
pub const DEFAULT_SQLITE_FILE: &str = "stock_data.db";

/// Dropbox path the database snapshot is stored under.
pub const DEFAULT_SNAPSHOT_PATH: &str = "/stock-data/stock_data.db";

/// Candles requested per quote; one trading day is enough for a close.
pub const QUOTE_CANDLE_COUNT: u32 = 1;

/// Default history rows shown by the history listing.
pub const HISTORY_PAGE_SIZE: u32 = 10;
