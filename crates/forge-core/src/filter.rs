//! Filter types for querying work items (spec.md §4.1, `findByFilters`).

use chrono::{DateTime, Utc};

use crate::enums::{Priority, Role, SortBy, SortOrder};

/// Conjunctive filter surface shared by `findByFilters` and
/// `countByFilters`. All present fields AND-combine; `tags` OR-combines
/// internally per spec.md §4.1's tag-filter semantics.
#[derive(Debug, Clone, Default)]
pub struct WorkItemFilter {
    pub parent_id: Option<String>,
    pub depth: Option<i32>,
    pub role: Option<Role>,
    pub priority: Option<Priority>,

    /// OR-combined: an item matches if it has at least one of these tags.
    pub tags: Vec<String>,

    /// Case-insensitive substring search over `title ∪ summary`.
    pub query: Option<String>,

    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub modified_after: Option<DateTime<Utc>>,
    pub modified_before: Option<DateTime<Utc>>,
    pub role_changed_after: Option<DateTime<Utc>>,
    pub role_changed_before: Option<DateTime<Utc>>,

    pub sort_by: SortBy,
    pub sort_order: SortOrder,

    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_defaults() {
        let f = WorkItemFilter::default();
        assert!(f.role.is_none());
        assert!(f.tags.is_empty());
        assert_eq!(f.sort_by, SortBy::Created);
        assert_eq!(f.sort_order, SortOrder::Desc);
    }
}
