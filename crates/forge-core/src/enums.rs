//! Closed enum types for the work-item domain model.
//!
//! Unlike a federation-facing system that must tolerate unknown strings from
//! other writers, every enum here has a fixed, spec-defined variant set, so
//! none of them carries a `Custom(String)` catch-all: an unrecognised string
//! is a parse error, not a value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error returned when a string does not name a known variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// ===========================================================================
// Role
// ===========================================================================

/// Lifecycle stage of a work item.
///
/// `Queue < Work < Review < Terminal` forms the total order the workflow
/// engine gates against; `Blocked` is orthogonal and never compares above or
/// below any other role (see `Role::is_at_or_beyond`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Queue,
    Work,
    Review,
    Terminal,
    Blocked,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Work => "work",
            Self::Review => "review",
            Self::Terminal => "terminal",
            Self::Blocked => "blocked",
        }
    }

    /// Ordinal in the linear lifecycle; `None` for `Blocked`, which is not
    /// part of the total order.
    fn ordinal(&self) -> Option<u8> {
        match self {
            Self::Queue => Some(0),
            Self::Work => Some(1),
            Self::Review => Some(2),
            Self::Terminal => Some(3),
            Self::Blocked => None,
        }
    }

    /// `true` iff `self` has reached or passed `threshold` in the linear
    /// lifecycle. `Blocked` is always strictly below any threshold.
    pub fn is_at_or_beyond(&self, threshold: Role) -> bool {
        match (self.ordinal(), threshold.ordinal()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Queue
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Role::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&str> for Role {
    type Error = UnknownVariant;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "queue" => Ok(Self::Queue),
            "work" => Ok(Self::Work),
            "review" => Ok(Self::Review),
            "terminal" => Ok(Self::Terminal),
            "blocked" => Ok(Self::Blocked),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_owned(),
            }),
        }
    }
}

// ===========================================================================
// Priority
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort rank for "quick wins first" ordering: lower sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Priority::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&str> for Priority {
    type Error = UnknownVariant;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(UnknownVariant {
                kind: "priority",
                value: other.to_owned(),
            }),
        }
    }
}

// ===========================================================================
// DependencyType
// ===========================================================================

/// Edge type between two work items. Serializes uppercase per spec.md §6,
/// unlike every other enum in this module (which serializes lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    Blocks,
    IsBlockedBy,
    RelatesTo,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocks => "BLOCKS",
            Self::IsBlockedBy => "IS_BLOCKED_BY",
            Self::RelatesTo => "RELATES_TO",
        }
    }

    /// `RELATES_TO` edges never gate a role transition.
    pub fn affects_ready_work(&self) -> bool {
        !matches!(self, Self::RelatesTo)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DependencyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DependencyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DependencyType::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&str> for DependencyType {
    type Error = UnknownVariant;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "BLOCKS" => Ok(Self::Blocks),
            "IS_BLOCKED_BY" => Ok(Self::IsBlockedBy),
            "RELATES_TO" => Ok(Self::RelatesTo),
            other => Err(UnknownVariant {
                kind: "dependency type",
                value: other.to_owned(),
            }),
        }
    }
}

// ===========================================================================
// Trigger
// ===========================================================================

/// Symbolic input to the workflow state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Start,
    Complete,
    Block,
    Hold,
    Resume,
    Cancel,
    Cascade,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Block => "block",
            Self::Hold => "hold",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::Cascade => "cascade",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Trigger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Trigger::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&str> for Trigger {
    type Error = UnknownVariant;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "start" => Ok(Self::Start),
            "complete" => Ok(Self::Complete),
            "block" => Ok(Self::Block),
            "hold" => Ok(Self::Hold),
            "resume" => Ok(Self::Resume),
            "cancel" => Ok(Self::Cancel),
            "cascade" => Ok(Self::Cascade),
            other => Err(UnknownVariant {
                kind: "trigger",
                value: other.to_owned(),
            }),
        }
    }
}

// ===========================================================================
// NoteRole
// ===========================================================================

/// The subset of `Role` a note can be keyed to (`BLOCKED`/`TERMINAL` notes
/// have no meaning in the note schema per spec.md §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteRole {
    Queue,
    Work,
    Review,
}

impl NoteRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Work => "work",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for NoteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NoteRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NoteRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NoteRole::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&str> for NoteRole {
    type Error = UnknownVariant;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "queue" => Ok(Self::Queue),
            "work" => Ok(Self::Work),
            "review" => Ok(Self::Review),
            other => Err(UnknownVariant {
                kind: "note role",
                value: other.to_owned(),
            }),
        }
    }
}

impl From<NoteRole> for Role {
    fn from(value: NoteRole) -> Self {
        match value {
            NoteRole::Queue => Role::Queue,
            NoteRole::Work => Role::Work,
            NoteRole::Review => Role::Review,
        }
    }
}

// ===========================================================================
// SortBy / SortOrder (query surface, spec.md §4.1 findByFilters)
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortBy {
    Created,
    Modified,
    Priority,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Priority => "priority",
        }
    }
}

impl Default for SortBy {
    fn default() -> Self {
        Self::Created
    }
}

/// Falls back to `created` for any unrecognised string, per spec.md §4.1
/// ("Unknown sortBy falls back to createdAt").
impl From<&str> for SortBy {
    fn from(s: &str) -> Self {
        match s {
            "modified" => Self::Modified,
            "priority" => Self::Priority,
            "created" => Self::Created,
            _ => Self::Created,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Desc
    }
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering() {
        assert!(Role::Work.is_at_or_beyond(Role::Queue));
        assert!(Role::Terminal.is_at_or_beyond(Role::Terminal));
        assert!(!Role::Queue.is_at_or_beyond(Role::Work));
    }

    #[test]
    fn blocked_is_below_any_threshold() {
        assert!(!Role::Blocked.is_at_or_beyond(Role::Queue));
        assert!(!Role::Queue.is_at_or_beyond(Role::Blocked));
    }

    #[test]
    fn role_serde_roundtrip() {
        let json = serde_json::to_string(&Role::Review).unwrap();
        assert_eq!(json, "\"review\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Review);
    }

    #[test]
    fn dependency_type_serializes_uppercase() {
        let json = serde_json::to_string(&DependencyType::Blocks).unwrap();
        assert_eq!(json, "\"BLOCKS\"");
    }

    #[test]
    fn unknown_role_rejected() {
        assert!(Role::try_from("bogus").is_err());
    }

    #[test]
    fn sort_by_unknown_falls_back_to_created() {
        assert_eq!(SortBy::from("bogus"), SortBy::Created);
    }

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }
}
