//! WorkItem struct -- the central domain model for the orchestration tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Priority, Role};

/// A node of the work-item tree and a vertex in the dependency graph.
///
/// Fields are organised into logical groups for maintainability, in the
/// same spirit as this codebase's other central domain structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    // ===== Content =====
    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,

    // ===== Workflow state =====
    #[serde(default)]
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_role: Option<Role>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_label: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<i32>,

    #[serde(default)]
    pub requires_verification: bool,

    #[serde(default)]
    pub depth: i32,

    // ===== Extension point =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,

    /// Comma-separated lowercase identifiers matching `[a-z0-9][a-z0-9-]*`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tags: String,

    // ===== Timestamps =====
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub role_changed_at: DateTime<Utc>,

    /// Incremented on every successful optimistic-locking update; starts at 1.
    #[serde(default = "one")]
    pub version: i64,
}

fn one() -> i64 {
    1
}

impl WorkItem {
    /// Splits `tags` into its constituent normalized identifiers.
    pub fn tag_list(&self) -> Vec<&str> {
        if self.tags.is_empty() {
            Vec::new()
        } else {
            self.tags.split(',').collect()
        }
    }

    /// `true` iff this item's comma-joined tags contain `tag` as a whole
    /// element, per spec.md §4.1's tag-filter semantics: an exact match, a
    /// prefix before a comma, a suffix after a comma, or a middle element
    /// between two commas.
    pub fn has_tag(&self, tag: &str) -> bool {
        if self.tags == tag {
            return true;
        }
        if self.tags.starts_with(&format!("{tag},")) {
            return true;
        }
        if self.tags.ends_with(&format!(",{tag}")) {
            return true;
        }
        self.tags.contains(&format!(",{tag},"))
    }
}

/// Builder for tests and programmatic construction, mirroring this
/// codebase's `IssueBuilder` convention.
pub struct WorkItemBuilder {
    item: WorkItem,
}

impl WorkItemBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            item: WorkItem {
                id: String::new(),
                parent_id: None,
                title: title.into(),
                description: None,
                summary: String::new(),
                role: Role::Queue,
                previous_role: None,
                status_label: None,
                priority: Priority::Medium,
                complexity: None,
                requires_verification: false,
                depth: 0,
                metadata: None,
                tags: String::new(),
                created_at: now,
                modified_at: now,
                role_changed_at: now,
                version: 1,
            },
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.item.id = id.into();
        self
    }

    pub fn parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.item.parent_id = Some(parent_id.into());
        self
    }

    pub fn depth(mut self, depth: i32) -> Self {
        self.item.depth = depth;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.item.role = role;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.item.priority = priority;
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.item.tags = tags.into();
        self
    }

    pub fn build(self) -> WorkItem {
        self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_filter_matches_exact_and_boundaries() {
        let item = WorkItemBuilder::new("t").tags("bug").build();
        assert!(item.has_tag("bug"));
        assert!(!item.has_tag("debug"));
        assert!(!item.has_tag("bugs"));

        let item = WorkItemBuilder::new("t").tags("bug,feature").build();
        assert!(item.has_tag("bug"));
        assert!(item.has_tag("feature"));

        let item = WorkItemBuilder::new("t").tags("alpha,bug").build();
        assert!(item.has_tag("bug"));

        let item = WorkItemBuilder::new("t").tags("alpha,bug,beta").build();
        assert!(item.has_tag("bug"));
    }

    #[test]
    fn builder_defaults() {
        let item = WorkItemBuilder::new("Plan the thing").build();
        assert_eq!(item.role, Role::Queue);
        assert_eq!(item.version, 1);
        assert_eq!(item.depth, 0);
        assert!(item.parent_id.is_none());
    }
}
