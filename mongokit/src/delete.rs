//! Hard and soft delete helpers keyed by hex ids.
//!
//! A single invalid id is an error. Invalid ids inside a list are skipped, and
//! a list with no valid id touches nothing.

use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use mongodb::Collection;
use tracing::debug;

use crate::document::{DELETED_AT, UPDATED_AT, object_ids_from_hex, parse_object_id};
use crate::error::MongoResult;

/// Remove one document. Returns the number of documents deleted.
pub async fn delete<T>(collection: &Collection<T>, id: &str) -> MongoResult<u64>
where
    T: Send + Sync,
{
    let filter = id_filter(id)?;
    let result = collection.delete_one(filter, None).await?;
    debug!(collection = %collection.name(), id, deleted = result.deleted_count, "Deleted document");
    Ok(result.deleted_count)
}

/// Remove every document whose id is listed.
pub async fn delete_many<T, S>(collection: &Collection<T>, ids: &[S]) -> MongoResult<u64>
where
    T: Send + Sync,
    S: AsRef<str>,
{
    let Some(filter) = ids_filter(ids) else {
        return Ok(0);
    };
    let result = collection.delete_many(filter, None).await?;
    debug!(collection = %collection.name(), deleted = result.deleted_count, "Deleted documents");
    Ok(result.deleted_count)
}

/// Mark one document deleted. Returns the number of documents modified.
pub async fn soft_delete<T>(collection: &Collection<T>, id: &str) -> MongoResult<u64>
where
    T: Send + Sync,
{
    let filter = id_filter(id)?;
    let result = collection
        .update_one(filter, soft_delete_update(DateTime::now()), None)
        .await?;
    Ok(result.modified_count)
}

/// Mark every listed document deleted.
pub async fn soft_delete_many<T, S>(collection: &Collection<T>, ids: &[S]) -> MongoResult<u64>
where
    T: Send + Sync,
    S: AsRef<str>,
{
    let Some(filter) = ids_filter(ids) else {
        return Ok(0);
    };
    let result = collection
        .update_many(filter, soft_delete_update(DateTime::now()), None)
        .await?;
    Ok(result.modified_count)
}

/// `{ _id: <id> }`
pub fn id_filter(id: &str) -> MongoResult<Document> {
    Ok(doc! { "_id": parse_object_id(id)? })
}

/// `{ _id: { $in: [..] } }`, or `None` when no id is valid.
pub fn ids_filter<S: AsRef<str>>(ids: &[S]) -> Option<Document> {
    let oids: Vec<ObjectId> = object_ids_from_hex(ids);
    if oids.is_empty() {
        return None;
    }
    let oids: Vec<Bson> = oids.into_iter().map(Bson::ObjectId).collect();
    Some(doc! { "_id": { "$in": oids } })
}

/// `$set` of both timestamps to `at`.
pub fn soft_delete_update(at: DateTime) -> Document {
    let mut set = Document::new();
    set.insert(UPDATED_AT, at);
    set.insert(DELETED_AT, at);
    doc! { "$set": set }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MongoError;

    #[test]
    fn test_id_filter() {
        let oid = ObjectId::new();
        assert_eq!(id_filter(&oid.to_hex()).unwrap(), doc! { "_id": oid });
        assert!(matches!(id_filter("bogus"), Err(MongoError::InvalidObjectId(_))));
    }

    #[test]
    fn test_ids_filter_skips_invalid() {
        let oid = ObjectId::new();
        let filter = ids_filter(&[oid.to_hex().as_str(), "bogus"]).unwrap();
        assert_eq!(filter, doc! { "_id": { "$in": [oid] } });
    }

    #[test]
    fn test_ids_filter_none_when_nothing_valid() {
        assert!(ids_filter(&["bogus", ""]).is_none());
        assert!(ids_filter::<&str>(&[]).is_none());
    }

    #[test]
    fn test_soft_delete_update_sets_both_stamps() {
        let at = DateTime::from_millis(1_700_000_000_000);
        let update = soft_delete_update(at);
        let set = update.get_document("$set").unwrap();

        assert_eq!(set.get_datetime(UPDATED_AT).unwrap(), &at);
        assert_eq!(set.get_datetime(DELETED_AT).unwrap(), &at);
    }
}
