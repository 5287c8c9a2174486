//! Table-mapped entities and their field registries.
//!
//! A [`FieldRegistry`] is the schema of an entity type: a typed getter and
//! setter per column, built once and shared by every repository for that type.
//! Looking up a name the registry does not know returns `None` instead of
//! touching the entity.

use std::collections::HashMap;
use std::fmt;

use super::{FieldError, FieldValue, Record, RepositoryError, Result};

/// A Rust type whose values correspond to rows of one table.
///
/// # Example
///
/// ```
/// use std::sync::OnceLock;
/// use kvdao_core::storage::{Entity, FieldRegistry};
///
/// #[derive(Debug, Default)]
/// struct Tag {
///     id: Option<i64>,
///     label: String,
/// }
///
/// impl Entity for Tag {
///     const TABLE: &'static str = "tags";
///     const PRIMARY_KEY: &'static str = "id";
///
///     fn fields() -> &'static FieldRegistry<Self> {
///         static FIELDS: OnceLock<FieldRegistry<Tag>> = OnceLock::new();
///         FIELDS.get_or_init(|| {
///             FieldRegistry::<Tag>::builder()
///                 .field("id", |t| t.id.into(), |t, v| {
///                     t.id = v.into_typed()?;
///                     Ok(())
///                 })
///                 .field("label", |t| t.label.as_str().into(), |t, v| {
///                     t.label = v.into_typed()?;
///                     Ok(())
///                 })
///                 .build()
///         })
///     }
/// }
///
/// assert!(Tag::fields().get("label").is_some());
/// assert!(Tag::fields().get("colour").is_none());
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    /// Table name.
    const TABLE: &'static str;

    /// Primary key column. Must be registered in [`Entity::fields`].
    const PRIMARY_KEY: &'static str;

    /// The field registry for this type.
    fn fields() -> &'static FieldRegistry<Self>;
}

type Getter<E> = fn(&E) -> FieldValue;
type Setter<E> = fn(&mut E, FieldValue) -> std::result::Result<(), FieldError>;

/// Accessor pair for one column.
pub struct Field<E> {
    name: &'static str,
    getter: Getter<E>,
    setter: Setter<E>,
}

impl<E> Field<E> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Reads the current value of this field.
    pub fn get(&self, entity: &E) -> FieldValue {
        (self.getter)(entity)
    }

    /// Writes a value into this field, converting it to the field's type.
    pub fn set(&self, entity: &mut E, value: FieldValue) -> Result<()> {
        (self.setter)(entity, value).map_err(|source| RepositoryError::InvalidField {
            field: self.name.to_string(),
            source,
        })
    }
}

/// Schema of an entity type: fields in declaration order, indexed by name.
pub struct FieldRegistry<E> {
    fields: Vec<Field<E>>,
    index: HashMap<&'static str, usize>,
}

impl<E: Entity> FieldRegistry<E> {
    pub fn builder() -> FieldRegistryBuilder<E> {
        FieldRegistryBuilder { fields: Vec::new() }
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Field<E>> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Looks up a field, failing with `UnknownField` if it is not registered.
    pub fn require(&self, name: &str) -> Result<&Field<E>> {
        self.get(name).ok_or_else(|| RepositoryError::UnknownField {
            entity_type: E::TABLE,
            field: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Column names in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Snapshot of every field of an entity.
    pub fn read(&self, entity: &E) -> Record {
        self.fields
            .iter()
            .map(|f| (f.name, f.get(entity)))
            .collect()
    }

    /// Builds an entity from defaults plus every value in `record`.
    ///
    /// Every name in the record must be a registered field.
    pub fn build(&self, record: Record) -> Result<E> {
        let mut entity = E::default();
        for (name, value) in record {
            self.require(&name)?.set(&mut entity, value)?;
        }
        Ok(entity)
    }
}

impl<E> fmt::Debug for FieldRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.fields.iter().map(|field| field.name))
            .finish()
    }
}

/// Builder for [`FieldRegistry`].
pub struct FieldRegistryBuilder<E> {
    fields: Vec<Field<E>>,
}

impl<E: Entity> FieldRegistryBuilder<E> {
    /// Registers a field. Registering a name twice replaces the earlier accessors.
    pub fn field(mut self, name: &'static str, getter: Getter<E>, setter: Setter<E>) -> Self {
        let field = Field {
            name,
            getter,
            setter,
        };
        match self.fields.iter().position(|f| f.name == name) {
            Some(i) => self.fields[i] = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn build(self) -> FieldRegistry<E> {
        let index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name, i))
            .collect();
        FieldRegistry {
            fields: self.fields,
            index,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::OnceLock;

    use super::*;

    /// Entity used across the storage tests.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Account {
        pub id: Option<i64>,
        pub email: String,
        pub display_name: Option<String>,
        pub active: bool,
    }

    impl Entity for Account {
        const TABLE: &'static str = "accounts";
        const PRIMARY_KEY: &'static str = "id";

        fn fields() -> &'static FieldRegistry<Self> {
            static FIELDS: OnceLock<FieldRegistry<Account>> = OnceLock::new();
            FIELDS.get_or_init(|| {
                FieldRegistry::<Account>::builder()
                    .field(
                        "id",
                        |a| a.id.into(),
                        |a, v| {
                            a.id = v.into_typed()?;
                            Ok(())
                        },
                    )
                    .field(
                        "email",
                        |a| a.email.as_str().into(),
                        |a, v| {
                            a.email = v.into_typed()?;
                            Ok(())
                        },
                    )
                    .field(
                        "display_name",
                        |a| a.display_name.clone().into(),
                        |a, v| {
                            a.display_name = v.into_typed()?;
                            Ok(())
                        },
                    )
                    .field(
                        "active",
                        |a| a.active.into(),
                        |a, v| {
                            a.active = v.into_typed()?;
                            Ok(())
                        },
                    )
                    .build()
            })
        }
    }

    pub fn account(id: i64, email: &str) -> Account {
        Account {
            id: Some(id),
            email: email.to_string(),
            display_name: None,
            active: true,
        }
    }
}
