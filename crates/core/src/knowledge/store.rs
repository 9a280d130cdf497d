use super::{Category, Doc, NewDoc, RankedKind};
use crate::error::DeskError;

/// Storage for knowledge-base categories and docs.
pub trait KnowledgeStore: Send + Sync {
    /// Append a category after the current last one.
    fn create_category(&self, name: &str) -> Result<Category, DeskError>;

    fn get_category(&self, id: i64) -> Result<Option<Category>, DeskError>;

    /// Categories in rank order.
    fn list_categories(&self) -> Result<Vec<Category>, DeskError>;

    /// Append a doc after the last doc of its category.
    fn create_doc(&self, doc: NewDoc) -> Result<Doc, DeskError>;

    /// Docs of one category in rank order.
    fn list_docs(&self, category_id: i64) -> Result<Vec<Doc>, DeskError>;

    /// Move a record to `position` within its sibling scope and rewrite the
    /// ranks of the whole scope in one transaction.
    ///
    /// Returns the sibling ids in their new order.
    fn reorder(&self, kind: RankedKind, id: i64, position: i64) -> Result<Vec<i64>, DeskError>;
}
