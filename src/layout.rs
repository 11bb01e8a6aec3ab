//! Dashboard widget layout on a 12-column grid

use std::collections::HashSet;
use thiserror::Error;

use crate::storage::{Database, StorageError, StorageResult, WidgetPosition};

pub const GRID_COLUMNS: u32 = 12;

/// Most widgets a layout may hold
pub const MAX_WIDGETS: usize = 64;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayoutError {
    #[error("Widget id must not be empty")]
    EmptyId,

    #[error("Duplicate widget '{0}'")]
    DuplicateId(String),

    #[error("Widget '{0}' must be at least 1x1")]
    ZeroSize(String),

    #[error("Widget '{0}' extends past the 12-column grid")]
    OutOfBounds(String),

    #[error("Widgets '{0}' and '{1}' overlap")]
    Overlap(String, String),

    #[error("Too many widgets ({0})")]
    TooMany(usize),
}

fn overlaps(a: &WidgetPosition, b: &WidgetPosition) -> bool {
    a.column < b.column.saturating_add(b.width)
        && b.column < a.column.saturating_add(a.width)
        && a.row < b.row.saturating_add(b.height)
        && b.row < a.row.saturating_add(a.height)
}

/// Check a layout: unique non-empty ids, sizes of at least 1x1, inside the
/// grid, no overlapping widgets
pub fn validate_layout(positions: &[WidgetPosition]) -> Result<(), LayoutError> {
    if positions.len() > MAX_WIDGETS {
        return Err(LayoutError::TooMany(positions.len()));
    }

    let mut seen = HashSet::new();
    for p in positions {
        if p.widget_id.trim().is_empty() {
            return Err(LayoutError::EmptyId);
        }
        if !seen.insert(p.widget_id.as_str()) {
            return Err(LayoutError::DuplicateId(p.widget_id.clone()));
        }
        if p.width == 0 || p.height == 0 {
            return Err(LayoutError::ZeroSize(p.widget_id.clone()));
        }
        if p.column.saturating_add(p.width) > GRID_COLUMNS {
            return Err(LayoutError::OutOfBounds(p.widget_id.clone()));
        }
    }

    for (i, a) in positions.iter().enumerate() {
        if let Some(b) = positions[i + 1..].iter().find(|b| overlaps(a, b)) {
            return Err(LayoutError::Overlap(a.widget_id.clone(), b.widget_id.clone()));
        }
    }

    Ok(())
}

/// Dashboard shown before a user arranges anything
pub fn default_layout() -> Vec<WidgetPosition> {
    vec![
        WidgetPosition::new("level-progress", 0, 0, 4, 2),
        WidgetPosition::new("streak", 4, 0, 4, 2),
        WidgetPosition::new("daily-challenges", 8, 0, 4, 4),
        WidgetPosition::new("pnl-chart", 0, 2, 8, 4),
        WidgetPosition::new("recent-trades", 0, 6, 8, 4),
        WidgetPosition::new("leaderboard", 8, 4, 4, 6),
    ]
}

/// Saved layout, or the default when nothing was saved
pub fn load_layout(db: &Database, user_id: &str) -> StorageResult<Vec<WidgetPosition>> {
    let saved = db.load_layout(user_id)?;
    Ok(if saved.is_empty() { default_layout() } else { saved })
}

/// Validate and atomically replace a user's layout
pub fn save_layout(db: &Database, user_id: &str, positions: &[WidgetPosition]) -> StorageResult<()> {
    validate_layout(positions).map_err(|e| StorageError::InvalidInput(e.to_string()))?;
    db.replace_layout(user_id, positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_default_layout_is_valid() {
        assert!(validate_layout(&default_layout()).is_ok());
    }

    #[test]
    fn test_rejections() {
        let w = WidgetPosition::new;
        assert_eq!(validate_layout(&[w("", 0, 0, 1, 1)]), Err(LayoutError::EmptyId));
        assert_eq!(
            validate_layout(&[w("a", 0, 0, 1, 1), w("a", 5, 5, 1, 1)]),
            Err(LayoutError::DuplicateId("a".to_string()))
        );
        assert_eq!(
            validate_layout(&[w("a", 0, 0, 0, 1)]),
            Err(LayoutError::ZeroSize("a".to_string()))
        );
        assert_eq!(
            validate_layout(&[w("a", 10, 0, 3, 1)]),
            Err(LayoutError::OutOfBounds("a".to_string()))
        );
        assert_eq!(
            validate_layout(&[w("a", 0, 0, 4, 2), w("b", 3, 1, 2, 2)]),
            Err(LayoutError::Overlap("a".to_string(), "b".to_string()))
        );
    }

    #[test]
    fn test_edge_touching_is_allowed() {
        let w = WidgetPosition::new;
        assert!(validate_layout(&[w("a", 0, 0, 6, 2), w("b", 6, 0, 6, 2), w("c", 0, 2, 12, 1)]).is_ok());
    }

    #[test]
    fn test_load_falls_back_to_default_and_save_replaces() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("designer", None, 0, Utc::now()).unwrap();

        assert_eq!(load_layout(&db, &user.id).unwrap(), default_layout());

        let custom = vec![WidgetPosition::new("pnl-chart", 0, 0, 12, 3)];
        save_layout(&db, &user.id, &custom).unwrap();
        assert_eq!(load_layout(&db, &user.id).unwrap(), custom);

        let bad = vec![WidgetPosition::new("x", 11, 0, 2, 1)];
        assert!(matches!(
            save_layout(&db, &user.id, &bad),
            Err(StorageError::InvalidInput(_))
        ));
        assert_eq!(load_layout(&db, &user.id).unwrap(), custom);
    }
}
