//! Entity trait and soft-delete lifecycle shared by every catalog row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Housekeeping timestamps of the row.
    fn lifecycle(&self) -> &Lifecycle;

    /// A row is live until it carries an archive timestamp.
    fn is_live(&self) -> bool {
        self.lifecycle().archived_on.is_none()
    }
}

/// Housekeeping timestamps.
///
/// Archival is logical: rows are never removed, `archived_on` is stamped once
/// and never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub created_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_on: Option<DateTime<Utc>>,
}

impl Lifecycle {
    pub fn created(at: DateTime<Utc>) -> Self {
        Self {
            created_on: at,
            updated_on: None,
            archived_on: None,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived_on.is_some()
    }

    /// Stamp the archive timestamp if the row is still live.
    ///
    /// Returns `true` when the stamp was applied.
    pub fn archive(&mut self, at: DateTime<Utc>) -> bool {
        if self.archived_on.is_some() {
            return false;
        }
        self.archived_on = Some(at);
        true
    }
}
