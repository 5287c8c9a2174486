mod error;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use serialization::{decode_text, decode_value, encode_value, ValueShape};
pub use traits::{CacheClient, KeyType};
