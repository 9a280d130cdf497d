//! Site settings: a flat `namespace.name` key-value store.

mod sqlite;
mod store;
mod types;

pub use sqlite::*;
pub use store::*;
pub use types::*;
