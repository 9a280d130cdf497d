//! Knowledge-base categories and docs, and their drag-and-drop ordering.

mod reorder;
mod sqlite;
mod store;
mod types;

pub use reorder::*;
pub use sqlite::*;
pub use store::*;
pub use types::*;
