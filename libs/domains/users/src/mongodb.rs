//! MongoDB implementation of UserRepository

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Cursor, Database,
    bson::{Document, doc, from_document, oid::ObjectId, to_document},
};
use tracing::instrument;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, User};
use crate::repository::UserRepository;

/// MongoDB implementation of the UserRepository.
///
/// The collection is untyped so that a stored document missing a field
/// surfaces as [`UserError::Projection`] rather than a driver error.
#[derive(Clone)]
pub struct MongoUserRepository {
    collection: Collection<Document>,
}

impl MongoUserRepository {
    /// Use the default `users` collection of `db`.
    ///
    /// # Example
    /// ```ignore
    /// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
    /// let repo = MongoUserRepository::new(&client.database("fastapi-mongodb"));
    /// ```
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, database::mongodb::DEFAULT_COLLECTION)
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<Document>(collection_name),
        }
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    fn search_filter(search: &str) -> Document {
        doc! {
            "$or": [
                { "email": search },
                { "username": search },
            ]
        }
    }

    fn email_filter(email: &str) -> Document {
        doc! { "email": email }
    }

    fn decode(document: Document) -> UserResult<User> {
        Ok(from_document(document)?)
    }

    async fn collect(cursor: Cursor<Document>) -> UserResult<Vec<User>> {
        let documents: Vec<Document> = cursor.try_collect().await?;
        documents.into_iter().map(Self::decode).collect()
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn insert(&self, input: &CreateUser) -> UserResult<ObjectId> {
        let document = to_document(input)?;
        let result = self.collection.insert_one(document).await?;

        result.inserted_id.as_object_id().ok_or_else(|| {
            UserError::Database(format!(
                "inserted id is not an ObjectId: {}",
                result.inserted_id
            ))
        })
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: ObjectId) -> UserResult<Option<User>> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .map(Self::decode)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self) -> UserResult<Vec<User>> {
        let cursor = self.collection.find(doc! {}).await?;
        Self::collect(cursor).await
    }

    #[instrument(skip(self))]
    async fn find_by_email_or_username(&self, search: &str) -> UserResult<Vec<User>> {
        let cursor = self.collection.find(Self::search_filter(search)).await?;
        Self::collect(cursor).await
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> UserResult<Vec<User>> {
        let cursor = self.collection.find(Self::email_filter(email)).await?;
        Self::collect(cursor).await
    }

    #[instrument(skip(self))]
    async fn delete_by_email(&self, email: &str) -> UserResult<u64> {
        let result = self.collection.delete_one(Self::email_filter(email)).await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;
    use mongodb::bson::{Bson, DateTime};

    #[test]
    fn test_search_filter_matches_email_or_username() {
        let filter = MongoUserRepository::search_filter("alice01");
        let clauses = filter.get_array("$or").unwrap();

        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0], Bson::Document(doc! { "email": "alice01" }));
        assert_eq!(clauses[1], Bson::Document(doc! { "username": "alice01" }));
    }

    #[test]
    fn test_email_filter() {
        assert_eq!(
            MongoUserRepository::email_filter("a@example.com"),
            doc! { "email": "a@example.com" }
        );
    }

    #[test]
    fn test_stored_form_has_no_id_or_unknown_fields() {
        let input = CreateUser::new("alice01", "alice@example.com").with_roles(["admin"]);
        let document = to_document(&input).unwrap();

        assert!(!document.contains_key("_id"));
        assert!(!document.contains_key("password"));
        assert_eq!(document.get_str("username").unwrap(), "alice01");
        assert!(document.get_bool("is_active").unwrap());
        assert_eq!(document.get("signup_ts"), Some(&Bson::Null));
    }

    #[test]
    fn test_stored_signup_ts_is_a_date() {
        let signup_ts = parse_timestamp("2023-01-01T00:00:00").unwrap();
        let input = CreateUser::new("johndoe", "john.doe@example.com").with_signup_ts(signup_ts);
        let document = to_document(&input).unwrap();

        assert_eq!(
            document.get_datetime("signup_ts").unwrap(),
            &DateTime::from_millis(signup_ts.timestamp_millis())
        );
    }

    #[test]
    fn test_decode_reads_signup_ts_date() {
        let user = MongoUserRepository::decode(doc! {
            "_id": ObjectId::new(),
            "username": "johndoe",
            "email": "john.doe@example.com",
            "full_name": "John Doe",
            "signup_ts": DateTime::from_millis(1_672_531_200_000),
            "roles": ["user", "editor"],
        })
        .unwrap();

        assert_eq!(user.signup_ts, parse_timestamp("2023-01-01T00:00:00Z"));
    }

    #[test]
    fn test_decode_complete_document() {
        let id = ObjectId::new();
        let user = MongoUserRepository::decode(doc! {
            "_id": id,
            "username": "bob",
            "email": "bob@example.com",
            "full_name": "Bob",
            "roles": ["viewer"],
        })
        .unwrap();

        assert_eq!(user.id, id);
        assert!(user.is_active);
        assert_eq!(user.roles, vec!["viewer".to_string()]);
    }

    #[test]
    fn test_decode_missing_field_is_projection_error() {
        let result = MongoUserRepository::decode(doc! {
            "_id": ObjectId::new(),
            "username": "bob",
            "full_name": "Bob",
            "roles": [],
        });

        assert!(matches!(result, Err(UserError::Projection(_))));
    }

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_insert_and_find_round_trip() {
        let url = std::env::var("MONGODB_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let client = mongodb::Client::with_uri_str(url).await.unwrap();
        let repo =
            MongoUserRepository::with_collection(&client.database("users_test"), "users");

        let input = CreateUser::new("round_trip", "round_trip@example.com");
        let id = repo.insert(&input).await.unwrap();
        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.username, "round_trip");

        let found = repo
            .find_by_email_or_username("round_trip@example.com")
            .await
            .unwrap();
        assert!(!found.is_empty());

        assert_eq!(
            repo.delete_by_email("round_trip@example.com").await.unwrap(),
            1
        );
    }
}
