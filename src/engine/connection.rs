use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::quote_identifier;
use super::relation::{Field, Relation};
use crate::config::{EngineConfig, IN_MEMORY};
use crate::error::{DuckPlusError, Result};

/// Shared handle to one DuckDB database connection.
///
/// Clones refer to the same underlying connection; the database is closed when
/// the last clone is dropped. A DuckDB connection is `Send` but not `Sync`, so
/// access is serialized through a mutex owned by the handle.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Mutex<duckdb::Connection>>,
    path: Arc<str>,
}

impl Connection {
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with(&EngineConfig::in_memory())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = EngineConfig {
            database: path.as_ref().to_string_lossy().into_owned(),
            ..EngineConfig::default()
        };
        Self::open_with(&config)
    }

    pub fn open_with(config: &EngineConfig) -> Result<Self> {
        let flags = config.to_duckdb()?;
        let conn = if config.is_in_memory() {
            duckdb::Connection::open_in_memory_with_flags(flags)?
        } else {
            duckdb::Connection::open_with_flags(&config.database, flags)?
        };
        info!("Opened DuckDB connection: {}", config.database);

        Ok(Self {
            inner: Arc::new(Mutex::new(conn)),
            path: Arc::from(config.database.as_str()),
        })
    }

    /// Database path this connection was opened with (`:memory:` for in-memory).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_in_memory(&self) -> bool {
        &*self.path == IN_MEMORY
    }

    /// True when both handles refer to the same underlying connection.
    pub fn same_as(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run one or more statements that produce no relation (DDL, inserts).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.with_connection(|conn| Ok(conn.execute_batch(sql)?))
    }

    /// Bind `query` into a new lazy relation. The engine only describes the
    /// query here; rows are produced when the relation is fetched.
    pub fn sql(&self, query: &str) -> Result<Relation> {
        let plan = normalize_plan(query);
        let fields = self.describe(&plan)?;
        debug!("Bound relation with {} columns", fields.len());
        Ok(Relation::new(self.clone(), plan, fields))
    }

    /// Relation over a table or view in this database.
    pub fn table(&self, name: &str) -> Result<Relation> {
        self.sql(&format!("SELECT * FROM {}", quote_identifier(name)))
    }

    pub(crate) fn describe(&self, plan: &str) -> Result<Vec<Field>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "DESCRIBE SELECT * FROM ({}) AS {}",
                plan,
                quote_identifier("described")
            ))?;
            let fields = stmt
                .query_map([], |row| {
                    Ok(Field {
                        name: row.get::<_, String>(0)?,
                        data_type: row.get::<_, String>(1)?,
                    })
                })?
                .collect::<duckdb::Result<Vec<_>>>()?;
            Ok(fields)
        })
    }

    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&duckdb::Connection) -> Result<T>,
    ) -> Result<T> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| DuckPlusError::Engine("connection lock poisoned".to_string()))?;
        f(&guard)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("path", &self.path).finish()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connection({})", self.path)
    }
}

/// Strip surrounding whitespace and trailing semicolons so the text can be
/// embedded as a subquery.
fn normalize_plan(query: &str) -> String {
    query.trim().trim_end_matches(';').trim_end().to_string()
}
