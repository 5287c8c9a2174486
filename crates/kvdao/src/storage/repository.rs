//! Generic CRUD over any [`Entity`] and [`Session`].
//!
//! Each operation has a `try_*` form returning [`Result`] and a degrading form
//! that logs the failure under the repository's span and returns a default
//! (`None`, `false`, an empty vector). The degrading forms cannot tell "no
//! row" from "query failed"; use the `try_*` forms when that matters.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{Instrument, Span};

use kvdao_core::storage::{
    statements, ChangeTrackedUpdate, Changes, Entity, FieldValue, Predicate, Record,
    RepositoryError, Result, Session, Statement,
};

/// Repository for entities of type `E` over session `S`.
pub struct EntityRepository<E, S: ?Sized> {
    session: Arc<S>,
    span: Span,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S> EntityRepository<E, S>
where
    E: Entity,
    S: Session + ?Sized,
{
    pub fn new(session: Arc<S>) -> Self {
        Self {
            session,
            span: tracing::info_span!("entity_repository", entity = E::TABLE),
            _entity: PhantomData,
        }
    }

    /// Replaces the span log events are attached to.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    async fn query(&self, statement: Statement) -> Result<Vec<Record>> {
        self.session
            .query(statement)
            .instrument(self.span.clone())
            .await
    }

    async fn execute(&self, statement: Statement) -> Result<usize> {
        self.session
            .execute(vec![statement])
            .instrument(self.span.clone())
            .await
            .map(|execution| execution.rows_affected)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// The single row matching `predicate`, if any.
    ///
    /// More than one match is a [`RepositoryError::MultipleRows`].
    pub async fn try_get_one(&self, predicate: &Predicate) -> Result<Option<E>> {
        let statement = statements::select::<E>(predicate, Some(2))?;
        let mut rows = self.query(statement).await?;

        match rows.len() {
            0 => Ok(None),
            1 => E::fields().build(rows.remove(0)).map(Some),
            _ => Err(RepositoryError::MultipleRows {
                entity_type: E::TABLE,
                filter: predicate.to_string(),
            }),
        }
    }

    pub async fn get_one(&self, predicate: &Predicate) -> Option<E> {
        match self.try_get_one(predicate).await {
            Ok(found) => {
                if found.is_none() {
                    tracing::debug!(parent: &self.span, filter = %predicate, "No row matched");
                }
                found
            }
            Err(e) => {
                tracing::error!(parent: &self.span, filter = %predicate, error = %e, "Failed to fetch row");
                None
            }
        }
    }

    /// Every value of one column, in table order.
    pub async fn try_all_column_values(&self, column: &str) -> Result<Vec<FieldValue>> {
        let statement = statements::select_column::<E>(column)?;
        let rows = self.query(statement).await?;

        Ok(rows
            .into_iter()
            .map(|mut row| row.remove(column).unwrap_or_default())
            .collect())
    }

    pub async fn all_column_values(&self, column: &str) -> Vec<FieldValue> {
        self.try_all_column_values(column)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(parent: &self.span, column, error = %e, "Failed to read column");
                Vec::new()
            })
    }

    pub async fn try_get_all(&self) -> Result<Vec<E>> {
        let statement = statements::select::<E>(&Predicate::All, None)?;
        let rows = self.query(statement).await?;

        rows.into_iter().map(|row| E::fields().build(row)).collect()
    }

    pub async fn get_all(&self) -> Vec<E> {
        self.try_get_all().await.unwrap_or_else(|e| {
            tracing::error!(parent: &self.span, error = %e, "Failed to read rows");
            Vec::new()
        })
    }

    pub async fn try_count(&self, predicate: &Predicate) -> Result<u64> {
        let statement = statements::count::<E>(predicate)?;
        let rows = self.query(statement).await?;

        match rows.first().and_then(|row| row.get("count")) {
            Some(FieldValue::Integer(n)) => Ok((*n).max(0) as u64),
            other => Err(RepositoryError::InvalidData(format!(
                "COUNT returned {}",
                other.map_or("no row", FieldValue::type_name)
            ))),
        }
    }

    pub async fn count(&self, predicate: &Predicate) -> u64 {
        self.try_count(predicate).await.unwrap_or_else(|e| {
            tracing::error!(parent: &self.span, filter = %predicate, error = %e, "Failed to count rows");
            0
        })
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Builds an entity from `values`, inserts it, and returns it.
    ///
    /// An unset primary key is filled from the row id the database assigned.
    pub async fn try_create(&self, values: Record) -> Result<E> {
        let registry = E::fields();
        let mut entity = registry.build(values)?;
        let statement = statements::insert::<E>(&registry.read(&entity))?;

        let execution = self
            .session
            .execute(vec![statement])
            .instrument(self.span.clone())
            .await?;

        let key = registry.require(E::PRIMARY_KEY)?;
        let missing_key = key.get(&entity).is_null();
        if let Some(id) = execution.last_insert_id.filter(|_| missing_key) {
            if let Err(e) = key.set(&mut entity, FieldValue::Integer(id)) {
                tracing::warn!(parent: &self.span, error = %e, "Could not back-fill primary key");
            }
        }

        Ok(entity)
    }

    pub async fn create(&self, values: Record) -> Option<E> {
        self.try_create(values)
            .await
            .inspect_err(|e| {
                tracing::error!(parent: &self.span, error = %e, "Failed to create row");
            })
            .ok()
    }

    /// Applies `values` to the row matching `predicate`, writing only the
    /// fields that changed.
    ///
    /// Fails with [`RepositoryError::NotFound`] when nothing matches.
    pub async fn try_update(&self, predicate: &Predicate, values: Record) -> Result<Changes> {
        let Some(mut entity) = self.try_get_one(predicate).await? else {
            return Err(RepositoryError::NotFound {
                entity_type: E::TABLE,
                filter: predicate.to_string(),
            });
        };

        ChangeTrackedUpdate::new(&mut entity, values)
            .persist(self.session.as_ref())
            .instrument(self.span.clone())
            .await
    }

    pub async fn update(&self, predicate: &Predicate, values: Record) -> bool {
        match self.try_update(predicate, values).await {
            Ok(_) => true,
            Err(RepositoryError::NotFound { .. }) => {
                tracing::warn!(parent: &self.span, filter = %predicate, "No row to update");
                false
            }
            Err(e) => {
                tracing::error!(parent: &self.span, filter = %predicate, error = %e, "Failed to update row");
                false
            }
        }
    }

    /// Deletes every row matching `predicate`, returning how many went.
    pub async fn try_delete(&self, predicate: &Predicate) -> Result<usize> {
        let statement = statements::delete::<E>(predicate)?;
        self.execute(statement).await
    }

    pub async fn delete(&self, predicate: &Predicate) -> bool {
        match self.try_delete(predicate).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(parent: &self.span, filter = %predicate, error = %e, "Failed to delete rows");
                false
            }
        }
    }

    /// Sets each named field to NULL on every matching row.
    ///
    /// Fails with [`RepositoryError::InvalidField`] before touching the session
    /// when a field cannot hold NULL.
    pub async fn try_null_fields(&self, fields: &[&str], predicate: &Predicate) -> Result<usize> {
        let registry = E::fields();
        let mut scratch = E::default();
        for name in fields {
            registry.require(name)?.set(&mut scratch, FieldValue::Null)?;
        }

        let statement = statements::null_columns::<E>(fields, predicate)?;
        self.execute(statement).await
    }

    /// True when at least one row was changed.
    pub async fn null_fields(&self, fields: &[&str], predicate: &Predicate) -> bool {
        match self.try_null_fields(fields, predicate).await {
            Ok(rows) => rows > 0,
            Err(e) => {
                tracing::error!(parent: &self.span, ?fields, filter = %predicate, error = %e, "Failed to null fields");
                false
            }
        }
    }
}

impl<E, S: ?Sized> Clone for EntityRepository<E, S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            span: self.span.clone(),
            _entity: PhantomData,
        }
    }
}
