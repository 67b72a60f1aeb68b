//! PostgreSQL data adapter.
//!
//! Reads the same `fund_daily_data` / `index_daily_data` layout as the
//! SQLite adapter, with `date` stored as a SQL `date`.

use crate::domain::error::NavlensError;
use crate::domain::nav::{NavRow, select_nav};
use crate::domain::series::TimeSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, SeriesKind};
use chrono::NaiveDate;
use postgres::NoTls;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;

type Manager = PostgresConnectionManager<NoTls>;

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

fn db_err(e: impl std::fmt::Display) -> NavlensError {
    NavlensError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: postgres::Error) -> NavlensError {
    NavlensError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, NavlensError> {
        let connection_string = config.get_string("data", "postgres_conninfo").ok_or_else(|| {
            NavlensError::ConfigMissing {
                section: "data".into(),
                key: "postgres_conninfo".into(),
            }
        })?;

        let pg_config: postgres::Config = connection_string.parse().map_err(db_err)?;
        let pool_size = config.get_int("data", "pool_size", 4).max(1) as u32;
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(PostgresConnectionManager::new(pg_config, NoTls))
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, NavlensError> {
        self.pool.get().map_err(db_err)
    }
}

impl DataPort for PostgresAdapter {
    fn fetch_series(&self, id: &str, kind: SeriesKind) -> Result<TimeSeries, NavlensError> {
        match kind {
            SeriesKind::Fund => {
                let rows = self
                    .conn()?
                    .query(
                        "SELECT date, nav::double precision, cumulative_nav::double precision \
                         FROM public.fund_daily_data WHERE fund_id = $1 ORDER BY date ASC",
                        &[&id],
                    )
                    .map_err(query_err)?;
                if rows.is_empty() {
                    return Err(NavlensError::NoData { id: id.to_string() });
                }
                let nav_rows: Vec<NavRow> = rows
                    .iter()
                    .map(|row| NavRow {
                        date: row.get(0),
                        nav: row.get(1),
                        cumulative_nav: row.get(2),
                    })
                    .collect();
                Ok(select_nav(id, &nav_rows).0)
            }
            SeriesKind::Index => {
                let rows = self
                    .conn()?
                    .query(
                        "SELECT date, close::double precision \
                         FROM public.index_daily_data WHERE index_id = $1 ORDER BY date ASC",
                        &[&id],
                    )
                    .map_err(query_err)?;
                if rows.is_empty() {
                    return Err(NavlensError::NoData { id: id.to_string() });
                }
                Ok(TimeSeries::from_pairs(rows.iter().filter_map(|row| {
                    let date: NaiveDate = row.get(0);
                    let close: Option<f64> = row.get(1);
                    close.map(|v| (date, v))
                })))
            }
        }
    }

    fn list_series(&self, kind: SeriesKind) -> Result<Vec<String>, NavlensError> {
        let query = match kind {
            SeriesKind::Fund => {
                "SELECT DISTINCT fund_id FROM public.fund_daily_data ORDER BY fund_id"
            }
            SeriesKind::Index => {
                "SELECT DISTINCT index_id FROM public.index_daily_data ORDER BY index_id"
            }
        };
        let rows = self.conn()?.query(query, &[]).map_err(query_err)?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }
}
