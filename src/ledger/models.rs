// Data models for ledger rows.
//
// These are separate from the CSV backend so the workflow and reporting code
// can use them without depending on the storage format.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used in the persisted log (local time).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Presentation metadata attached to a comment. Opaque to moderation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub display_name: String,
    /// CSS colour string, e.g. `rgb(120,180,150)`
    pub color: String,
    /// May be empty
    pub avatar: String,
}

/// A comment about to be written. The ledger assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub text: String,
    pub author: Author,
    pub is_toxic: bool,
}

/// A stored ledger row with its label resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub text: String,
    pub author: Author,
    /// None when the stored value could not be parsed
    pub submitted_at: Option<NaiveDateTime>,
    pub is_toxic: bool,
}
