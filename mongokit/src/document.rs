//! Base document fields and id helpers.

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::{MongoError, MongoResult};

/// Creation timestamp field.
pub const CREATED_AT: &str = "created_at";
/// Last modification timestamp field.
pub const UPDATED_AT: &str = "updated_at";
/// Soft-delete timestamp field.
pub const DELETED_AT: &str = "deleted_at";

/// Fields shared by every stored document.
///
/// Embed it with `#[serde(flatten)]` and call the hooks before writing:
///
/// ```rust
/// use mongokit::Table;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Order {
///     #[serde(flatten)]
///     table: Table,
///     total: i64,
/// }
///
/// let mut order = Order { table: Table::default(), total: 42 };
/// order.table.before_insert();
/// assert!(order.table.deleted_at.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Document id.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// When the document was inserted.
    pub created_at: DateTime,
    /// When the document last changed.
    pub updated_at: DateTime,
    /// When the document was soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
}

impl Default for Table {
    fn default() -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

impl Table {
    /// Assign a fresh id and stamp creation.
    pub fn before_insert(&mut self) {
        let now = DateTime::now();
        self.id = ObjectId::new();
        self.created_at = now;
        self.updated_at = now;
        self.deleted_at = None;
    }

    /// Stamp a modification.
    pub fn before_update(&mut self) {
        self.updated_at = DateTime::now();
    }

    /// Stamp a soft delete.
    pub fn before_delete(&mut self) {
        let now = DateTime::now();
        self.updated_at = now;
        self.deleted_at = Some(now);
    }

    /// Check if the document is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Parse an ObjectId from a hex string.
pub fn parse_object_id(s: &str) -> MongoResult<ObjectId> {
    ObjectId::parse_str(s).map_err(|e| MongoError::invalid_object_id(format!("{}: {}", s, e)))
}

/// Parse every valid hex id, skipping the rest.
pub fn object_ids_from_hex<S: AsRef<str>>(ids: &[S]) -> Vec<ObjectId> {
    ids.iter()
        .filter_map(|id| ObjectId::parse_str(id.as_ref()).ok())
        .collect()
}
