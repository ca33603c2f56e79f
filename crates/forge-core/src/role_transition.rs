//! RoleTransition -- an append-only audit record of role changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Role, Trigger};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleTransition {
    #[serde(default)]
    pub id: i64,

    pub item_id: String,

    pub from_role: Role,

    pub to_role: Role,

    pub trigger: Trigger,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_label: Option<String>,

    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_transition_serde_roundtrip() {
        let t = RoleTransition {
            id: 1,
            item_id: "item-a".into(),
            from_role: Role::Queue,
            to_role: Role::Work,
            trigger: Trigger::Start,
            summary: None,
            status_label: None,
            occurred_at: Utc::now(),
        };

        let json = serde_json::to_string(&t).unwrap();
        let back: RoleTransition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.from_role, Role::Queue);
        assert_eq!(back.to_role, Role::Work);
        assert_eq!(back.trigger, Trigger::Start);
    }
}
