//! SQL statement builders.
//!
//! Pure functions from an entity type plus inputs to a [`Statement`]. Every
//! column name is validated against the entity's field registry and quoted.

use super::predicate::quote;
use super::{Entity, FieldValue, Predicate, Record, Result};

/// A SQL string with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<FieldValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

fn column_list<E: Entity>() -> String {
    E::fields()
        .columns()
        .map(quote)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <all columns> FROM <table> WHERE <predicate> [LIMIT n]`.
pub fn select<E: Entity>(predicate: &Predicate, limit: Option<usize>) -> Result<Statement> {
    let mut params = Vec::new();
    let filter = predicate.to_sql::<E>(&mut params)?;
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {filter}",
        column_list::<E>(),
        quote(E::TABLE)
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(Statement::new(sql, params))
}

/// `SELECT <column> FROM <table>`.
pub fn select_column<E: Entity>(column: &str) -> Result<Statement> {
    E::fields().require(column)?;
    Ok(Statement::new(
        format!("SELECT {} FROM {}", quote(column), quote(E::TABLE)),
        Vec::new(),
    ))
}

/// `SELECT COUNT(*) ...`, returned in a column named `count`.
pub fn count<E: Entity>(predicate: &Predicate) -> Result<Statement> {
    let mut params = Vec::new();
    let filter = predicate.to_sql::<E>(&mut params)?;
    Ok(Statement::new(
        format!(
            "SELECT COUNT(*) AS \"count\" FROM {} WHERE {filter}",
            quote(E::TABLE)
        ),
        params,
    ))
}

/// `INSERT` of every column in `values`.
///
/// A null primary key is left out so the database can assign one.
pub fn insert<E: Entity>(values: &Record) -> Result<Statement> {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (column, value) in values.iter() {
        E::fields().require(column)?;
        if column == E::PRIMARY_KEY && value.is_null() {
            continue;
        }
        columns.push(quote(column));
        params.push(value.clone());
    }

    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote(E::TABLE))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(E::TABLE),
            columns.join(", "),
            vec!["?"; params.len()].join(", ")
        )
    };
    Ok(Statement::new(sql, params))
}

/// `UPDATE <table> SET <assignments> WHERE <predicate>`.
pub fn update<E: Entity>(assignments: &Record, predicate: &Predicate) -> Result<Statement> {
    let mut params = Vec::new();
    let mut sets = Vec::new();
    for (column, value) in assignments.iter() {
        E::fields().require(column)?;
        sets.push(format!("{} = ?", quote(column)));
        params.push(value.clone());
    }
    if sets.is_empty() {
        return Err(super::RepositoryError::InvalidData(
            "update requires at least one assignment".to_string(),
        ));
    }

    let filter = predicate.to_sql::<E>(&mut params)?;
    Ok(Statement::new(
        format!(
            "UPDATE {} SET {} WHERE {filter}",
            quote(E::TABLE),
            sets.join(", ")
        ),
        params,
    ))
}

/// `UPDATE` setting each named column to NULL.
pub fn null_columns<E: Entity>(columns: &[&str], predicate: &Predicate) -> Result<Statement> {
    let assignments: Record = columns
        .iter()
        .map(|&column| (column, FieldValue::Null))
        .collect();
    update::<E>(&assignments, predicate)
}

/// `DELETE FROM <table> WHERE <predicate>`.
pub fn delete<E: Entity>(predicate: &Predicate) -> Result<Statement> {
    let mut params = Vec::new();
    let filter = predicate.to_sql::<E>(&mut params)?;
    Ok(Statement::new(
        format!("DELETE FROM {} WHERE {filter}", quote(E::TABLE)),
        params,
    ))
}

#[cfg(test)]
mod tests {
    use super::super::entity::fixtures::Account;
    use super::super::RepositoryError;
    use super::*;

    #[test]
    fn test_select_lists_registered_columns() {
        let stmt = select::<Account>(&Predicate::eq("id", 1), Some(2)).unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"email\", \"display_name\", \"active\" FROM \"accounts\" WHERE \"id\" = ? LIMIT 2"
        );
        assert_eq!(stmt.params, vec![FieldValue::Integer(1)]);
    }

    #[test]
    fn test_select_column_rejects_unknown_column() {
        let result = select_column::<Account>("password");
        assert!(matches!(result, Err(RepositoryError::UnknownField { .. })));
    }

    #[test]
    fn test_insert_skips_null_primary_key() {
        let values = Record::new()
            .with("id", FieldValue::Null)
            .with("email", "a@x")
            .with("active", true);

        let stmt = insert::<Account>(&values).unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO \"accounts\" (\"active\", \"email\") VALUES (?, ?)"
        );
        assert_eq!(
            stmt.params,
            vec![FieldValue::Bool(true), FieldValue::from("a@x")]
        );
    }

    #[test]
    fn test_update_puts_assignments_before_filter_params() {
        let assignments = Record::new().with("email", "new@x");

        let stmt = update::<Account>(&assignments, &Predicate::eq("id", 9)).unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE \"accounts\" SET \"email\" = ? WHERE \"id\" = ?"
        );
        assert_eq!(
            stmt.params,
            vec![FieldValue::from("new@x"), FieldValue::Integer(9)]
        );
    }

    #[test]
    fn test_update_without_assignments_is_rejected() {
        let result = update::<Account>(&Record::new(), &Predicate::All);
        assert!(matches!(result, Err(RepositoryError::InvalidData(_))));
    }

    #[test]
    fn test_null_columns_binds_nulls() {
        let stmt =
            null_columns::<Account>(&["display_name"], &Predicate::eq("active", false)).unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE \"accounts\" SET \"display_name\" = ? WHERE \"active\" = ?"
        );
        assert_eq!(stmt.params, vec![FieldValue::Null, FieldValue::Bool(false)]);
    }

    #[test]
    fn test_null_columns_rejects_unknown_field() {
        let result = null_columns::<Account>(&["nickname"], &Predicate::All);
        assert!(matches!(result, Err(RepositoryError::UnknownField { .. })));
    }

    #[test]
    fn test_delete_and_count() {
        let stmt = delete::<Account>(&Predicate::lt("id", 5)).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"accounts\" WHERE \"id\" < ?");

        let stmt = count::<Account>(&Predicate::All).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS \"count\" FROM \"accounts\" WHERE 1 = 1"
        );
    }
}
