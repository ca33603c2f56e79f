//! Dependency types -- typed edges between work items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{DependencyType, Role};

/// A directed, typed edge `fromItemId -> toItemId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(default)]
    pub id: String,

    pub from_item_id: String,

    pub to_item_id: String,

    #[serde(rename = "type")]
    pub dep_type: DependencyType,

    /// Minimum role of the blocker at which a gated transition becomes
    /// permissible. `None` for `RelatesTo` edges, which never gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unblock_at: Option<Role>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Dependency {
    /// `unblockAt` or, for gating edges with a `None` threshold, `Terminal`.
    /// `None` for `RelatesTo`, which never gates (spec.md §3.1, GLOSSARY).
    pub fn effective_unblock_role(&self) -> Option<Role> {
        if self.dep_type == DependencyType::RelatesTo {
            None
        } else {
            Some(self.unblock_at.unwrap_or(Role::Terminal))
        }
    }
}
