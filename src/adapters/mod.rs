pub mod postgres;

pub use postgres::{parse_date, validate_table_name, OhlcvQuery, PostgresStore};
