use crate::domain::MarketBar;
use crate::error::{Result, TraderError};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};

/// Table and optional date range for an OHLCV fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OhlcvQuery {
    pub table: String,
    /// Inclusive lower bound (midnight UTC)
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound (midnight UTC)
    pub end_date: Option<NaiveDate>,
}

impl OhlcvQuery {
    /// Build a query, validating the table name and parsing `YYYY-MM-DD` bounds
    pub fn new(table: &str, start_date: Option<&str>, end_date: Option<&str>) -> Result<Self> {
        validate_table_name(table)?;

        let query = Self {
            table: table.to_string(),
            start_date: start_date.map(parse_date).transpose()?,
            end_date: end_date.map(parse_date).transpose()?,
        };

        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(TraderError::InvalidConfig(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
        }

        Ok(query)
    }

    /// SQL text with `$n` placeholders numbered by the bounds present
    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            r#"SELECT "timestamp"::timestamp AS ts, open::float8 AS open, high::float8 AS high, low::float8 AS low, close::float8 AS close, volume::float8 AS volume FROM {}"#,
            self.table
        );

        let mut conditions = Vec::new();
        if self.start_date.is_some() {
            conditions.push(format!(r#""timestamp" >= ${}"#, conditions.len() + 1));
        }
        if self.end_date.is_some() {
            conditions.push(format!(r#""timestamp" <= ${}"#, conditions.len() + 1));
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(r#" ORDER BY "timestamp" ASC"#);
        sql
    }

    /// Bound values, in placeholder order
    pub fn bounds(&self) -> Vec<NaiveDateTime> {
        [self.start_date, self.end_date]
            .into_iter()
            .flatten()
            .map(|d| d.and_time(chrono::NaiveTime::MIN))
            .collect()
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        TraderError::InvalidConfig(format!("invalid date '{}', expected YYYY-MM-DD: {}", value, e))
    })
}

/// Accept `name` or `schema.name`, each part `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_table_name(table: &str) -> Result<()> {
    let parts: Vec<&str> = table.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(TraderError::InvalidConfig(format!(
            "invalid table name '{}'",
            table
        )))
    }
}

fn column(row: &PgRow, index: usize, name: &str) -> Result<f64> {
    let value: Option<f64> = row.try_get(name)?;
    value.ok_or_else(|| {
        TraderError::InvalidMarketData(format!("row {} has NULL {}", index, name))
    })
}

fn row_to_bar(index: usize, row: &PgRow) -> Result<MarketBar> {
    let timestamp: NaiveDateTime = row.try_get("ts")?;

    Ok(MarketBar {
        step_index: index,
        timestamp: timestamp.and_utc(),
        open: column(row, index, "open")?,
        high: column(row, index, "high")?,
        low: column(row, index, "low")?,
        close: column(row, index, "close")?,
        volume: column(row, index, "volume")?,
    })
}

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store.
    ///
    /// Credentials travel as separate fields, so passwords need no URL
    /// escaping.
    pub async fn new(options: PgConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed PostgreSQL pool");
    }

    /// Fetch bars in ascending time order with step indices 0..n
    #[instrument(skip(self))]
    pub async fn fetch_ohlcv(&self, query: &OhlcvQuery) -> Result<Vec<MarketBar>> {
        let sql = query.to_sql();
        debug!(%sql, "fetching OHLCV rows");

        let mut q = sqlx::query(&sql);
        for bound in query.bounds() {
            q = q.bind(bound);
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.iter()
            .enumerate()
            .map(|(i, row)| row_to_bar(i, row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_without_bounds() {
        let query = OhlcvQuery::new("ohlcv_data", None, None).unwrap();
        let sql = query.to_sql();

        assert!(sql.contains("FROM ohlcv_data ORDER BY"));
        assert!(!sql.contains("WHERE"));
        assert!(query.bounds().is_empty());
    }

    #[test]
    fn test_sql_placeholders_follow_bounds() {
        let both = OhlcvQuery::new("ohlcv_data", Some("2024-01-01"), Some("2024-02-01")).unwrap();
        assert!(both
            .to_sql()
            .contains(r#"WHERE "timestamp" >= $1 AND "timestamp" <= $2"#));
        assert_eq!(both.bounds().len(), 2);

        let end_only = OhlcvQuery::new("ohlcv_data", None, Some("2024-02-01")).unwrap();
        assert!(end_only.to_sql().contains(r#"WHERE "timestamp" <= $1 ORDER"#));
        assert_eq!(
            end_only.bounds(),
            vec![NaiveDate::from_ymd_opt(2024, 2, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()]
        );
    }

    #[test]
    fn test_sql_casts_numeric_columns() {
        let sql = OhlcvQuery::new("market.bars", None, None).unwrap().to_sql();
        assert!(sql.contains("close::float8 AS close"));
        assert!(sql.contains("FROM market.bars"));
        assert!(sql.ends_with(r#"ORDER BY "timestamp" ASC"#));
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("ohlcv_data").is_ok());
        assert!(validate_table_name("public.ohlcv_1m").is_ok());
        assert!(validate_table_name("_bars").is_ok());

        for bad in ["", "1bars", "bars; DROP TABLE x", "a.b.c", "bars--", "a."] {
            assert!(validate_table_name(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_date_parsing() {
        assert_eq!(
            parse_date("2024-03-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert!(parse_date("05/03/2024").is_err());
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = OhlcvQuery::new("ohlcv_data", Some("2024-02-01"), Some("2024-01-01"));
        assert!(matches!(err, Err(TraderError::InvalidConfig(_))));
    }
}
