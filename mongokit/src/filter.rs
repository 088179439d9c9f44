//! Filter document building.

use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use chrono::NaiveDateTime;

use crate::document::{CREATED_AT, DELETED_AT, object_ids_from_hex};

/// Format accepted by [`FilterBuilder::time_frame`].
pub const TIME_FRAME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Builder for MongoDB filter documents.
///
/// # Example
///
/// ```rust
/// use mongokit::FilterBuilder;
///
/// let filter = FilterBuilder::new()
///     .eq("status", "active")
///     .ids(&["65a1f0c2e4b0a1b2c3d4e5f6", "not-an-id"])
///     .time_frame("2024-01-01 00:00:00", "2024-01-31 23:59:59")
///     .not_deleted()
///     .build();
///
/// assert_eq!(filter.get_document("_id").unwrap().get_array("$in").unwrap().len(), 1);
/// assert!(filter.contains_key("created_at"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    doc: Document,
}

impl FilterBuilder {
    /// Create a new empty filter builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn from_doc(doc: Document) -> Self {
        Self { doc }
    }

    /// Add an equality condition.
    pub fn eq(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, value.into());
        self
    }

    /// Add a not-equal condition.
    pub fn ne(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, doc! { "$ne": value.into() });
        self
    }

    /// Add a greater-than-or-equal condition.
    pub fn gte(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, doc! { "$gte": value.into() });
        self
    }

    /// Add a less-than-or-equal condition.
    pub fn lte(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, doc! { "$lte": value.into() });
        self
    }

    /// Add an "in" condition.
    pub fn in_array(mut self, field: &str, values: Vec<impl Into<Bson>>) -> Self {
        let bson_values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.doc.insert(field, doc! { "$in": bson_values });
        self
    }

    /// Add an exists condition.
    pub fn exists(mut self, field: &str, exists: bool) -> Self {
        self.doc.insert(field, doc! { "$exists": exists });
        self
    }

    /// Match a single `_id`.
    pub fn by_id(mut self, id: ObjectId) -> Self {
        self.doc.insert("_id", id);
        self
    }

    /// Match any of the given hex ids.
    ///
    /// Strings that are not valid ids are skipped. An empty list adds nothing.
    pub fn ids<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        if ids.is_empty() {
            return self;
        }
        let oids: Vec<Bson> = object_ids_from_hex(ids)
            .into_iter()
            .map(Bson::ObjectId)
            .collect();
        self.doc.insert("_id", doc! { "$in": oids });
        self
    }

    /// Restrict `created_at` to `[start, end]`.
    ///
    /// Both bounds use [`TIME_FRAME_FORMAT`] and are read as UTC. The
    /// condition is added only when both parse.
    pub fn time_frame(mut self, start: &str, end: &str) -> Self {
        if let (Some(start), Some(end)) = (parse_time(start), parse_time(end)) {
            self.doc
                .insert(CREATED_AT, doc! { "$gte": start, "$lte": end });
        }
        self
    }

    /// Skip soft-deleted documents.
    pub fn not_deleted(self) -> Self {
        self.exists(DELETED_AT, false)
    }

    /// Combine with AND ($and).
    pub fn and(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$and", conditions);
        self
    }

    /// Combine with OR ($or).
    pub fn or(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$or", conditions);
        self
    }

    /// Merge another filter into this one.
    pub fn merge(mut self, other: Document) -> Self {
        for (k, v) in other {
            self.doc.insert(k, v);
        }
        self
    }

    /// Build the filter document.
    pub fn build(self) -> Document {
        self.doc
    }

    /// Check if the filter is empty.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }
}

fn parse_time(value: &str) -> Option<DateTime> {
    if value.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(value, TIME_FRAME_FORMAT)
        .ok()
        .map(|naive| DateTime::from_chrono(naive.and_utc()))
}
