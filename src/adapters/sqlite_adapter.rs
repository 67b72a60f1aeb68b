//! SQLite data adapter.

use crate::domain::error::NavlensError;
use crate::domain::nav::{NavRow, select_nav};
use crate::domain::series::TimeSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, SeriesKind};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> NavlensError {
    NavlensError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> NavlensError {
    NavlensError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(date_str: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            date_str.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, NavlensError> {
        let db_path =
            config
                .get_string("data", "sqlite_path")
                .ok_or_else(|| NavlensError::ConfigMissing {
                    section: "data".into(),
                    key: "sqlite_path".into(),
                })?;

        let pool_size = config.get_int("data", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, NavlensError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, NavlensError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), NavlensError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS fund_daily_data (
                    fund_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    nav REAL,
                    cumulative_nav REAL,
                    PRIMARY KEY (fund_id, date)
                );
                CREATE TABLE IF NOT EXISTS index_daily_data (
                    index_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    close REAL,
                    PRIMARY KEY (index_id, date)
                );
                CREATE INDEX IF NOT EXISTS idx_fund_daily_date ON fund_daily_data(date);
                CREATE INDEX IF NOT EXISTS idx_index_daily_date ON index_daily_data(date);",
            )
            .map_err(query_err)
    }

    pub fn insert_fund_rows(&self, fund_id: &str, rows: &[NavRow]) -> Result<(), NavlensError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for row in rows {
            tx.execute(
                "INSERT OR REPLACE INTO fund_daily_data (fund_id, date, nav, cumulative_nav)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    fund_id,
                    row.date.format("%Y-%m-%d").to_string(),
                    row.nav,
                    row.cumulative_nav
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    pub fn insert_index_closes(
        &self,
        index_id: &str,
        closes: &[(NaiveDate, f64)],
    ) -> Result<(), NavlensError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for (date, close) in closes {
            tx.execute(
                "INSERT OR REPLACE INTO index_daily_data (index_id, date, close)
                 VALUES (?1, ?2, ?3)",
                params![index_id, date.format("%Y-%m-%d").to_string(), close],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    fn fetch_fund(&self, fund_id: &str) -> Result<Vec<NavRow>, NavlensError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, nav, cumulative_nav FROM fund_daily_data
                 WHERE fund_id = ?1 ORDER BY date ASC",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![fund_id], |row| {
                let date_str: String = row.get(0)?;
                Ok(NavRow {
                    date: parse_date(&date_str)?,
                    nav: row.get(1)?,
                    cumulative_nav: row.get(2)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn fetch_index(&self, index_id: &str) -> Result<Vec<(NaiveDate, Option<f64>)>, NavlensError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, close FROM index_daily_data
                 WHERE index_id = ?1 ORDER BY date ASC",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![index_id], |row| {
                let date_str: String = row.get(0)?;
                Ok((parse_date(&date_str)?, row.get(1)?))
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_series(&self, id: &str, kind: SeriesKind) -> Result<TimeSeries, NavlensError> {
        let series = match kind {
            SeriesKind::Fund => {
                let rows = self.fetch_fund(id)?;
                if rows.is_empty() {
                    return Err(NavlensError::NoData { id: id.to_string() });
                }
                select_nav(id, &rows).0
            }
            SeriesKind::Index => {
                let rows = self.fetch_index(id)?;
                if rows.is_empty() {
                    return Err(NavlensError::NoData { id: id.to_string() });
                }
                TimeSeries::from_pairs(rows.into_iter().filter_map(|(d, c)| c.map(|v| (d, v))))
            }
        };
        Ok(series)
    }

    fn list_series(&self, kind: SeriesKind) -> Result<Vec<String>, NavlensError> {
        let query = match kind {
            SeriesKind::Fund => "SELECT DISTINCT fund_id FROM fund_daily_data ORDER BY fund_id",
            SeriesKind::Index => "SELECT DISTINCT index_id FROM index_daily_data ORDER BY index_id",
        };
        let conn = self.conn()?;
        let mut stmt = conn.prepare(query).map_err(query_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(query_err)
    }

    fn get_data_range(
        &self,
        id: &str,
        kind: SeriesKind,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, NavlensError> {
        let query = match kind {
            SeriesKind::Fund => {
                "SELECT MIN(date), MAX(date), COUNT(*) FROM fund_daily_data WHERE fund_id = ?1"
            }
            SeriesKind::Index => {
                "SELECT MIN(date), MAX(date), COUNT(*) FROM index_daily_data WHERE index_id = ?1"
            }
        };
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(query, params![id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(query_err)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = parse_date(&min_str).map_err(query_err)?;
                let max = parse_date(&max_str).map_err(query_err)?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
