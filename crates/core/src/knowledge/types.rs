use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeskError;

/// A knowledge-base category. All categories are siblings of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub rank: i64,
}

/// A knowledge-base article. Docs are ranked within their category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doc {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub body: String,
    pub rank: i64,
}

#[derive(Debug, Clone)]
pub struct NewDoc {
    pub category_id: i64,
    pub title: String,
    pub body: String,
}

/// Which ranked collection a reorder request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankedKind {
    Doc,
    Category,
}

impl RankedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankedKind::Doc => "doc",
            RankedKind::Category => "category",
        }
    }

    /// Record kind used in not-found errors.
    pub fn label(&self) -> &'static str {
        match self {
            RankedKind::Doc => "Doc",
            RankedKind::Category => "Category",
        }
    }
}

impl fmt::Display for RankedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankedKind {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doc" => Ok(RankedKind::Doc),
            "category" => Ok(RankedKind::Category),
            other => Err(DeskError::not_found("Object type", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_kind_parse() {
        assert_eq!("doc".parse::<RankedKind>().unwrap(), RankedKind::Doc);
        assert_eq!("Category".parse::<RankedKind>().unwrap(), RankedKind::Category);
    }

    #[test]
    fn test_unknown_kind_is_not_found() {
        let err = "forum".parse::<RankedKind>().unwrap_err();
        assert!(matches!(err, DeskError::NotFound { .. }));
    }
}
