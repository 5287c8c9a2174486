mod changes;
mod entity;
mod error;
mod predicate;
pub mod statements;
mod traits;
mod value;

pub use changes::{ChangeTrackedUpdate, Changes, FieldChange};
pub use entity::{Entity, Field, FieldRegistry, FieldRegistryBuilder};
pub use error::{FieldError, RepositoryError, Result};
pub use predicate::{Comparison, Predicate};
pub use statements::Statement;
pub use traits::{Execution, Session};
pub use value::{FieldValue, FromFieldValue, Record};
