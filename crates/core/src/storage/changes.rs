//! Change-tracked updates.
//!
//! [`ChangeTrackedUpdate`] applies requested field values to an entity in
//! memory, remembering the old and new value of every field that actually
//! changed, and then writes only those columns. When nothing differs the
//! session is never touched.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{statements, Entity, FieldValue, Predicate, Record, RepositoryError, Result, Session};

/// Old and new value of one changed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Changed fields keyed by name.
pub type Changes = BTreeMap<String, FieldChange>;

/// An update of `target` that records what it changes.
#[derive(Debug)]
pub struct ChangeTrackedUpdate<'a, E: Entity> {
    target: &'a mut E,
    field_updates: Record,
    changes: Changes,
}

impl<'a, E: Entity> ChangeTrackedUpdate<'a, E> {
    pub fn new(target: &'a mut E, field_updates: Record) -> Self {
        Self {
            target,
            field_updates,
            changes: Changes::new(),
        }
    }

    /// Changes recorded so far.
    pub fn changes(&self) -> &Changes {
        &self.changes
    }

    /// Applies every requested value that differs from the current one.
    ///
    /// Names the entity does not have are logged and skipped. A value that
    /// cannot be stored in its field is logged and returned as an error; fields
    /// processed before it stay applied.
    pub fn compute_changes(&mut self) -> Result<&Changes> {
        let registry = E::fields();

        for (name, new) in self.field_updates.iter() {
            let Some(field) = registry.get(name) else {
                tracing::error!(
                    entity = E::TABLE,
                    field = name,
                    "Field not found on entity, skipping"
                );
                continue;
            };

            let old = field.get(self.target);
            if old == *new {
                continue;
            }

            if let Err(e) = field.set(self.target, new.clone()) {
                tracing::error!(entity = E::TABLE, field = name, error = %e, "Failed to apply field update");
                return Err(e);
            }

            // Compare what was stored, so `1` written to a bool field that
            // already holds `true` is not a change.
            let stored = field.get(self.target);
            if stored != old {
                self.changes
                    .insert(name.to_string(), FieldChange { old, new: stored });
            }
        }

        Ok(&self.changes)
    }

    /// Computes the changes and writes the changed columns.
    ///
    /// Returns the changes on success. With no changes the session is not
    /// called at all. The write is keyed by the entity's primary key and runs
    /// in one transaction, rolled back on error.
    pub async fn persist<S>(mut self, session: &S) -> Result<Changes>
    where
        S: Session + ?Sized,
    {
        self.compute_changes()?;
        if self.changes.is_empty() {
            tracing::debug!(entity = E::TABLE, "No field changed, skipping write");
            return Ok(self.changes);
        }

        let key = E::fields().require(E::PRIMARY_KEY)?.get(self.target);
        if key.is_null() {
            return Err(RepositoryError::InvalidData(format!(
                "{} has no primary key value; it was never saved",
                E::TABLE
            )));
        }

        let assignments: Record = self
            .changes
            .iter()
            .map(|(name, change)| (name.as_str(), change.new.clone()))
            .collect();
        let filter = Predicate::eq(E::PRIMARY_KEY, key);
        let statement = statements::update::<E>(&assignments, &filter)?;

        let execution = session.execute(vec![statement]).await.inspect_err(|e| {
            tracing::error!(entity = E::TABLE, error = %e, "Failed to persist changes");
        })?;

        if execution.rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: E::TABLE,
                filter: filter.to_string(),
            });
        }

        tracing::debug!(
            entity = E::TABLE,
            changed = self.changes.len(),
            "Persisted change-tracked update"
        );
        Ok(self.changes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::super::entity::fixtures::{account, Account};
    use super::super::{Execution, Statement};
    use super::*;

    /// Session double that records writes and can be told to fail.
    #[derive(Default)]
    struct RecordingSession {
        executed: Mutex<Vec<Statement>>,
        fail_with: Option<RepositoryError>,
        rows_affected: usize,
    }

    impl RecordingSession {
        fn affecting(rows_affected: usize) -> Self {
            Self {
                rows_affected,
                ..Self::default()
            }
        }

        fn writes(&self) -> Vec<Statement> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Session for RecordingSession {
        async fn query(&self, _statement: Statement) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }

        async fn execute(&self, statements: Vec<Statement>) -> Result<Execution> {
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            self.executed.lock().unwrap().extend(statements);
            Ok(Execution {
                rows_affected: self.rows_affected,
                last_insert_id: None,
            })
        }
    }

    #[test]
    fn test_equal_values_produce_no_changes() {
        let mut target = account(1, "a@x");
        let updates = Record::new().with("email", "a@x").with("active", true);

        let mut update = ChangeTrackedUpdate::new(&mut target, updates);

        assert!(update.compute_changes().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_field_is_skipped_and_known_field_applied() {
        let mut target = account(1, "a@x");
        let updates = Record::new().with("email", "b@x").with("nickname", "ace");

        let mut update = ChangeTrackedUpdate::new(&mut target, updates);
        let changes = update.compute_changes().unwrap().clone();

        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes["email"],
            FieldChange {
                old: FieldValue::from("a@x"),
                new: FieldValue::from("b@x"),
            }
        );
        assert_eq!(target.email, "b@x");
    }

    #[test]
    fn test_coerced_equal_value_is_not_a_change() {
        let mut target = account(1, "a@x");
        let updates = Record::new().with("active", 1);

        let mut update = ChangeTrackedUpdate::new(&mut target, updates);

        assert!(update.compute_changes().unwrap().is_empty());
    }

    #[test]
    fn test_type_mismatch_propagates() {
        let mut target = account(1, "a@x");
        let updates = Record::new().with("active", "yes");

        let mut update = ChangeTrackedUpdate::new(&mut target, updates);
        let result = update.compute_changes();

        assert!(matches!(
            result,
            Err(RepositoryError::InvalidField { ref field, .. }) if field == "active"
        ));
    }

    #[tokio::test]
    async fn test_persist_without_changes_skips_session() {
        let session = RecordingSession::affecting(1);
        let mut target = account(1, "a@x");

        let changes = ChangeTrackedUpdate::new(&mut target, Record::new().with("email", "a@x"))
            .persist(&session)
            .await
            .unwrap();

        assert!(changes.is_empty());
        assert!(session.writes().is_empty());
    }

    #[tokio::test]
    async fn test_persist_writes_only_changed_columns() {
        let session = RecordingSession::affecting(1);
        let mut target = account(7, "a@x");
        let updates = Record::new()
            .with("email", "a@x")
            .with("display_name", "Ada");

        let changes = ChangeTrackedUpdate::new(&mut target, updates)
            .persist(&session)
            .await
            .unwrap();

        assert_eq!(changes.len(), 1);
        let writes = session.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].sql,
            "UPDATE \"accounts\" SET \"display_name\" = ? WHERE \"id\" = ?"
        );
        assert_eq!(
            writes[0].params,
            vec![FieldValue::from("Ada"), FieldValue::Integer(7)]
        );
    }

    #[tokio::test]
    async fn test_persist_surfaces_session_failure() {
        let session = RecordingSession {
            fail_with: Some(RepositoryError::QueryFailed("disk I/O error".to_string())),
            ..RecordingSession::default()
        };
        let mut target = account(7, "a@x");

        let result = ChangeTrackedUpdate::new(&mut target, Record::new().with("email", "b@x"))
            .persist(&session)
            .await;

        assert_eq!(
            result,
            Err(RepositoryError::QueryFailed("disk I/O error".to_string()))
        );
    }

    #[tokio::test]
    async fn test_persist_zero_rows_is_not_found() {
        let session = RecordingSession::affecting(0);
        let mut target = account(7, "a@x");

        let result = ChangeTrackedUpdate::new(&mut target, Record::new().with("email", "b@x"))
            .persist(&session)
            .await;

        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_persist_requires_primary_key() {
        let session = RecordingSession::affecting(1);
        let mut target = Account::default();

        let result = ChangeTrackedUpdate::new(&mut target, Record::new().with("email", "b@x"))
            .persist(&session)
            .await;

        assert!(matches!(result, Err(RepositoryError::InvalidData(_))));
        assert!(session.writes().is_empty());
    }
}
