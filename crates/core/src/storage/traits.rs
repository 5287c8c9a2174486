use async_trait::async_trait;

use super::{Record, Result, Statement};

/// Outcome of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Execution {
    /// Rows changed, summed over every statement.
    pub rows_affected: usize,
    /// Row id assigned by the last insert, if any statement inserted.
    pub last_insert_id: Option<i64>,
}

/// A database session: reads, and transactional writes.
///
/// Sessions are single-flight; callers must not issue overlapping calls that
/// expect isolation from each other.
#[async_trait]
pub trait Session: Send + Sync {
    /// Runs a read statement, returning each row keyed by column name.
    async fn query(&self, statement: Statement) -> Result<Vec<Record>>;

    /// Runs write statements in one transaction.
    ///
    /// Commits when every statement succeeds. On the first error the
    /// transaction is rolled back and the error returned, so no partial
    /// writes remain.
    async fn execute(&self, statements: Vec<Statement>) -> Result<Execution>;
}
