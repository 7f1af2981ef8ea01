//! MongoDB adapter
//!
//! Users live in one collection as documents keyed by an `ObjectId`. The id
//! leaves the adapter as its 24-character hex form.
//!
//! Password updates are a single conditional `findOneAndUpdate` on
//! `{_id, password}`. When nothing matches, a count on `_id` alone tells a
//! missing user from a wrong password.

use crate::error::{Result as StorageResult, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Client, Collection};
use persona_core::{
    CreateUser, PasswordUpdate, PasswordUpdated, Result, User, UserError, UserId, UserRepository,
};

/// Default database name
pub const DEFAULT_DATABASE: &str = "admin";

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "users";

/// User repository backed by a MongoDB collection
#[derive(Debug, Clone)]
pub struct MongoUserRepository {
    collection: Collection<Document>,
}

impl MongoUserRepository {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    pub fn from_client(client: &Client, database: &str, collection: &str) -> Self {
        Self::new(client.database(database).collection(collection))
    }

    async fn find_document(&self, oid: ObjectId) -> StorageResult<Option<Document>> {
        Ok(self.collection.find_one(doc! { "_id": oid }).await?)
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn get_by_id(&self, id: &UserId) -> Result<User> {
        let Some(oid) = object_id(id) else {
            return Err(UserError::UserNotFound(id.clone()));
        };

        let Some(document) = self.find_document(oid).await? else {
            return Err(UserError::UserNotFound(id.clone()));
        };
        Ok(document_to_user(&document)?)
    }

    async fn create(&self, user: CreateUser) -> Result<User> {
        let document = new_user_document(&user, Utc::now());
        let inserted = self
            .collection
            .insert_one(document)
            .await
            .map_err(StorageError::from)?;

        let oid = inserted.inserted_id.as_object_id().ok_or_else(|| {
            StorageError::invalid_data(format!(
                "inserted id is not an ObjectId: {}",
                inserted.inserted_id
            ))
        })?;

        // Read back so the caller gets exactly what the store holds
        let stored = self.find_document(oid).await?.ok_or_else(|| {
            StorageError::invalid_data(format!("user {} vanished after insert", oid.to_hex()))
        })?;
        let created = document_to_user(&stored)?;

        tracing::debug!(backend = "mongodb", user_id = %created.id, "Created user");
        Ok(created)
    }

    async fn update_password(&self, update: PasswordUpdate) -> Result<PasswordUpdated> {
        let Some(oid) = object_id(&update.id) else {
            return Err(UserError::UserNotFound(update.id.clone()));
        };

        let filter = doc! { "_id": oid, "password": update.password.as_str() };
        let matched = self
            .collection
            .find_one_and_update(filter, password_update_pipeline(&update.new_password))
            .await
            .map_err(StorageError::from)?;

        if matched.is_none() {
            let exists = self
                .collection
                .count_documents(doc! { "_id": oid })
                .await
                .map_err(StorageError::from)?;

            return Err(if exists == 0 {
                UserError::UserNotFound(update.id.clone())
            } else {
                UserError::PasswordMismatch(update.id.clone())
            });
        }

        tracing::debug!(backend = "mongodb", user_id = %update.id, "Updated password");
        Ok(PasswordUpdated {
            id: UserId::Opaque(oid.to_hex()),
        })
    }
}

fn object_id(id: &UserId) -> Option<ObjectId> {
    match id {
        UserId::Opaque(raw) => ObjectId::parse_str(raw).ok(),
        UserId::Numeric(_) => None,
    }
}

/// Update pipeline that sets the password and moves `updatedAt` forward
///
/// The new timestamp is the later of now and one millisecond past the stored
/// value, so it is strictly greater even when two writes share a millisecond.
/// The password goes through `$literal` since pipeline strings starting with
/// `$` are field paths.
fn password_update_pipeline(new_password: &str) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "password": { "$literal": new_password },
            "updatedAt": { "$max": [to_bson_datetime(Utc::now()), { "$add": ["$updatedAt", 1_i64] }] },
        }
    }]
}

fn new_user_document(user: &CreateUser, now: DateTime<Utc>) -> Document {
    let now = to_bson_datetime(now);
    doc! {
        "username": user.username.as_str(),
        "name": user.name.as_str(),
        "surname": user.surname.as_str(),
        "password": user.password.as_str(),
        "age": user.age,
        "createdAt": now,
        "updatedAt": now,
    }
}

fn document_to_user(document: &Document) -> StorageResult<User> {
    Ok(User {
        id: UserId::Opaque(document.get_object_id("_id")?.to_hex()),
        username: document.get_str("username")?.to_string(),
        name: document.get_str("name")?.to_string(),
        surname: document.get_str("surname")?.to_string(),
        password: document.get_str("password")?.to_string(),
        age: read_age(document)?,
        created_at: from_bson_datetime(*document.get_datetime("createdAt")?)?,
        updated_at: from_bson_datetime(*document.get_datetime("updatedAt")?)?,
    })
}

// Documents written by other clients may store numbers as int64 or double
fn read_age(document: &Document) -> StorageResult<i32> {
    let age = match document.get("age") {
        Some(Bson::Int32(value)) => Some(*value),
        Some(Bson::Int64(value)) => i32::try_from(*value).ok(),
        Some(Bson::Double(value)) => integral_i32(*value),
        _ => None,
    };
    age.ok_or_else(|| StorageError::invalid_data("age is missing or not an integer"))
}

fn integral_i32(value: f64) -> Option<i32> {
    let in_range = (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&value);
    (in_range && value.fract() == 0.0).then_some(value as i32)
}

fn to_bson_datetime(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(value.timestamp_millis())
}

fn from_bson_datetime(value: bson::DateTime) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value.timestamp_millis())
        .ok_or_else(|| StorageError::invalid_data(format!("timestamp out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> CreateUser {
        CreateUser {
            username: "alice".to_string(),
            name: "Alice".to_string(),
            surname: "A".to_string(),
            age: 30,
            password: "p1".to_string(),
        }
    }

    #[test]
    fn new_document_maps_back_to_user() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let oid = ObjectId::new();
        let mut document = new_user_document(&sample(), now);
        document.insert("_id", oid);

        let user = document_to_user(&document).unwrap();
        assert_eq!(user.id, UserId::Opaque(oid.to_hex()));
        assert_eq!(user.username, "alice");
        assert_eq!(user.age, 30);
        assert_eq!(user.created_at, now);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn timestamps_are_stored_at_millisecond_precision() {
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let stored = from_bson_datetime(to_bson_datetime(precise)).unwrap();
        assert_eq!(stored.timestamp_subsec_millis(), 123);
        assert_eq!(stored.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn age_accepts_wider_numeric_types() {
        let mut document = doc! { "age": 41_i64 };
        assert_eq!(read_age(&document).unwrap(), 41);

        document.insert("age", 41.0_f64);
        assert_eq!(read_age(&document).unwrap(), 41);

        document.insert("age", "forty");
        assert!(read_age(&document).is_err());
    }

    #[test]
    fn out_of_range_age_is_invalid_data() {
        for age in [1e12_f64, -1e12_f64, 41.5, f64::NAN, f64::INFINITY] {
            let document = doc! { "age": age };
            assert!(
                matches!(read_age(&document), Err(StorageError::InvalidData(_))),
                "{age} accepted"
            );
        }

        let document = doc! { "age": i64::from(i32::MAX) + 1 };
        assert!(matches!(
            read_age(&document),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn missing_fields_are_invalid_data() {
        let document = doc! { "_id": ObjectId::new(), "username": "bob" };
        assert!(matches!(
            document_to_user(&document),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn only_hex_object_ids_are_addressable() {
        let oid = ObjectId::new();
        assert_eq!(object_id(&UserId::Opaque(oid.to_hex())), Some(oid));
        assert_eq!(object_id(&UserId::Opaque("not-an-id".to_string())), None);
        assert_eq!(object_id(&UserId::Numeric(5)), None);
    }
}
