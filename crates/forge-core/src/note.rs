//! Note -- a structured annotation keyed per item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::NoteRole;

/// Unique on `(item_id, key)`; deleted with the item (cascade).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: String,

    pub item_id: String,

    pub key: String,

    pub role: NoteRole,

    #[serde(default)]
    pub body: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}
