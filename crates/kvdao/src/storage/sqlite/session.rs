//! SQLite session implementation.
//!
//! Implements `kvdao_core::storage::Session` on a `tokio_rusqlite::Connection`.
//! Every call runs on the connection's worker thread; writes run inside one
//! transaction per call.

use async_trait::async_trait;
use rusqlite::params_from_iter;
use tokio_rusqlite::Connection;
use tracing::{Instrument, Span};

use kvdao_core::storage::{Execution, Record, RepositoryError, Result, Session, Statement};

use crate::config::Config;

use super::conversions::{row_to_record, to_sql_value};
use super::error::map_tokio_rusqlite_error;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

fn bind(statement: Statement) -> (String, Vec<rusqlite::types::Value>) {
    let params = statement.params.into_iter().map(to_sql_value).collect();
    (statement.sql, params)
}

/// SQLite-backed session.
pub struct SqliteSession {
    conn: Connection,
    span: Span,
}

impl SqliteSession {
    /// Opens a file-based database, creating the file if it doesn't exist.
    pub async fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Ok(Self::from_connection(conn))
    }

    /// Opens the database at `SQLITE_PATH`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.sqlite_path).await
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing - data is lost when the session is dropped.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            span: tracing::info_span!("sqlite_session"),
        }
    }

    /// Replaces the span log events are attached to.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Runs a batch of semicolon-separated statements outside any transaction.
    ///
    /// Meant for schema setup.
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| conn.execute_batch(&sql).map_err(wrap_err))
            .instrument(self.span.clone())
            .await
            .map_err(map_tokio_rusqlite_error)
    }
}

#[async_trait]
impl Session for SqliteSession {
    async fn query(&self, statement: Statement) -> Result<Vec<Record>> {
        tracing::trace!(parent: &self.span, sql = %statement.sql, "query");
        let (sql, params) = bind(statement);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                let columns: Vec<String> = stmt
                    .column_names()
                    .into_iter()
                    .map(String::from)
                    .collect();
                let rows = stmt
                    .query_map(params_from_iter(params), |row| row_to_record(row, &columns))
                    .map_err(wrap_err)?;

                let mut records = Vec::new();
                for row_result in rows {
                    records.push(row_result.map_err(wrap_err)?);
                }
                Ok(records)
            })
            .instrument(self.span.clone())
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    async fn execute(&self, statements: Vec<Statement>) -> Result<Execution> {
        let count = statements.len();
        let bound: Vec<_> = statements.into_iter().map(bind).collect();

        let result = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let mut execution = Execution::default();

                for (sql, params) in bound {
                    match tx.execute(&sql, params_from_iter(params)) {
                        Ok(rows) => {
                            execution.rows_affected += rows;
                            if sql.starts_with("INSERT") {
                                execution.last_insert_id = Some(tx.last_insert_rowid());
                            }
                        }
                        Err(e) => {
                            // A failed rollback still leaves `e` as the error.
                            let _ = tx.rollback();
                            return Err(wrap_err(e));
                        }
                    }
                }

                tx.commit().map_err(wrap_err)?;
                Ok(execution)
            })
            .instrument(self.span.clone())
            .await;

        match result {
            Ok(execution) => {
                tracing::debug!(
                    parent: &self.span,
                    statements = count,
                    rows_affected = execution.rows_affected,
                    "Committed transaction"
                );
                Ok(execution)
            }
            Err(e) => {
                let e = map_tokio_rusqlite_error(e);
                tracing::warn!(parent: &self.span, error = %e, "Rolled back transaction");
                Err(e)
            }
        }
    }
}
