//! Core type definitions for sessions and the classification taxonomy.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generates an integer ID newtype with common trait implementations.
///
/// IDs are assigned by the store on insert (SQLite rowids), so the newtypes
/// carry no validation beyond the type distinction itself.
macro_rules! define_entity_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an ID from its raw database value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw database value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a [`Category`].
    CategoryId
);

define_entity_id!(
    /// Identifier of a [`Subcategory`].
    SubcategoryId
);

define_entity_id!(
    /// Identifier of a [`Tag`].
    TagId
);

define_entity_id!(
    /// Identifier of a [`Session`].
    SessionId
);

/// A top-level activity category (e.g., "Work").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A subcategory nested under a parent [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub name: String,
    pub category_id: CategoryId,
}

/// A free-form label that can be attached to any session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// A completed, timestamped block of tracked activity.
///
/// Sessions are immutable once created and owned by the store. `duration_ms`
/// is the wall-clock duration precomputed at creation time; the aggregator
/// never reads it because a session may only partially overlap the queried
/// window, in which case the clamped overlap is what counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub category_id: CategoryId,
    pub subcategory_id: Option<SubcategoryId>,
    /// Order-insignificant; duplicates should not occur but are tolerated
    /// (the grouping key normalizes them away).
    pub tag_ids: Vec<TagId>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
}

/// The single in-flight session, if a timer is running.
///
/// At most one exists at a time. Starting a new timer converts any existing
/// one to a [`Session`] first; stopping converts and clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTimer {
    pub category_id: CategoryId,
    pub subcategory_id: Option<SubcategoryId>,
    pub tag_ids: Vec<TagId>,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrips_raw_value() {
        let id = CategoryId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(CategoryId::from(42), id);
    }

    #[test]
    fn id_serde_is_transparent() {
        let id = TagId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let parsed: TagId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn id_display_shows_raw_value() {
        assert_eq!(SessionId::new(3).to_string(), "3");
    }
}
