//! Rank recomputation after a drag-and-drop move.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReorderError {
    #[error("record {0} is not in the sibling set")]
    NotFound(i64),
}

/// Move `id` to zero-based `position` among `siblings` and return the new
/// `(id, rank)` pairs for the whole set.
///
/// `siblings` must already be in rank order. Ranks in the result are
/// contiguous from 0. Positions past the end clamp to the last slot. Every
/// other sibling keeps its relative order.
pub fn reorder(
    siblings: &[i64],
    id: i64,
    position: usize,
) -> Result<Vec<(i64, i64)>, ReorderError> {
    let current = siblings
        .iter()
        .position(|&s| s == id)
        .ok_or(ReorderError::NotFound(id))?;

    let mut order = siblings.to_vec();
    let moved = order.remove(current);
    let target = position.min(order.len());
    order.insert(target, moved);

    Ok(order
        .into_iter()
        .enumerate()
        .map(|(rank, id)| (id, rank as i64))
        .collect())
}
