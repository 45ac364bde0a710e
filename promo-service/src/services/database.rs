use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};

use super::error::ServiceError;
use super::store::{
    EventStore, Page, Paginated, PromoCodeChanges, PromoCodeFilter, PromoCodeStore, StoreHealth,
    TokenFilter, TokenStore, TokenUsage,
};
use crate::models::{PromoCode, RedemptionEvent, Token};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct PromoDb {
    client: MongoClient,
    db: Database,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    ) || matches!(
        err.kind.as_ref(),
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY_CODE
    )
}

fn after_update() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

impl PromoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, ServiceError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            ServiceError::Database(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), ServiceError> {
        tracing::info!("Creating MongoDB indexes for promo-service");

        let promo_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "code": 1 })
                .options(
                    IndexOptions::builder()
                        .name("code_unique_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "is_active": 1, "created_at": -1 })
                .options(
                    IndexOptions::builder()
                        .name("active_created_idx".to_string())
                        .build(),
                )
                .build(),
        ];
        self.promo_codes()
            .create_indexes(promo_indexes, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create promo_codes indexes: {}", e);
                ServiceError::Database(e)
            })?;

        let token_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "token": 1 })
                .options(
                    IndexOptions::builder()
                        .name("token_unique_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "promo_code_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("promo_code_id_idx".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "is_used": 1 })
                .options(IndexOptions::builder().name("is_used_idx".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "expires_at": 1 })
                .options(
                    IndexOptions::builder()
                        .name("expires_at_idx".to_string())
                        .sparse(true)
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "created_at": -1 })
                .options(
                    IndexOptions::builder()
                        .name("created_at_idx".to_string())
                        .build(),
                )
                .build(),
        ];
        self.tokens()
            .create_indexes(token_indexes, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create tokens indexes: {}", e);
                ServiceError::Database(e)
            })?;

        let event_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "timestamp": -1 })
                .options(
                    IndexOptions::builder()
                        .name("timestamp_idx".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "token": 1 })
                .options(IndexOptions::builder().name("token_idx".to_string()).build())
                .build(),
        ];
        self.events()
            .create_indexes(event_indexes, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create token_events indexes: {}", e);
                ServiceError::Database(e)
            })?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub fn promo_codes(&self) -> Collection<PromoCode> {
        self.db.collection("promo_codes")
    }

    pub fn tokens(&self) -> Collection<Token> {
        self.db.collection("tokens")
    }

    pub fn events(&self) -> Collection<RedemptionEvent> {
        self.db.collection("token_events")
    }

    async fn paginate<T>(
        &self,
        collection: Collection<T>,
        filter: Document,
        sort: Document,
        page: Page,
    ) -> Result<Paginated<T>, ServiceError>
    where
        T: serde::de::DeserializeOwned + Unpin + Send + Sync,
    {
        let total = collection.count_documents(filter.clone(), None).await?;

        let find_options = FindOptions::builder()
            .sort(sort)
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();

        let items: Vec<T> = collection
            .find(filter, find_options)
            .await?
            .try_collect()
            .await?;

        Ok(Paginated { items, total, page })
    }
}

#[async_trait]
impl PromoCodeStore for PromoDb {
    async fn insert_promo_code(&self, promo: &PromoCode) -> Result<(), ServiceError> {
        self.promo_codes()
            .insert_one(promo, None)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    ServiceError::DuplicateCode
                } else {
                    tracing::error!("Failed to insert promo code: {}", e);
                    ServiceError::Database(e)
                }
            })?;
        Ok(())
    }

    async fn find_promo_code(&self, id: &str) -> Result<Option<PromoCode>, ServiceError> {
        Ok(self.promo_codes().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_promo_codes(
        &self,
        filter: &PromoCodeFilter,
        page: Page,
    ) -> Result<Paginated<PromoCode>, ServiceError> {
        let mut query = doc! {};
        if let Some(active) = filter.is_active {
            query.insert("is_active", active);
        }
        self.paginate(
            self.promo_codes(),
            query,
            doc! { "created_at": -1, "_id": -1 },
            page,
        )
        .await
    }

    async fn update_promo_code(
        &self,
        id: &str,
        changes: &PromoCodeChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<PromoCode>, ServiceError> {
        let mut set = doc! { "updated_at": BsonDateTime::from_chrono(updated_at) };
        if let Some(code) = &changes.code {
            set.insert("code", code.as_str());
        }
        if let Some(description) = &changes.description {
            set.insert("description", description.as_str());
        }
        if let Some(is_active) = changes.is_active {
            set.insert("is_active", is_active);
        }
        if let Some(max_usage) = changes.max_usage {
            set.insert("max_usage", max_usage.map(Bson::Int64).unwrap_or(Bson::Null));
        }

        self.promo_codes()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, after_update())
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    ServiceError::DuplicateCode
                } else {
                    tracing::error!(promo_code_id = %id, "Failed to update promo code: {}", e);
                    ServiceError::Database(e)
                }
            })
    }

    async fn delete_promo_code(&self, id: &str) -> Result<bool, ServiceError> {
        let result = self
            .promo_codes()
            .delete_one(doc! { "_id": id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn increment_usage(
        &self,
        id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<PromoCode>, ServiceError> {
        Ok(self
            .promo_codes()
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$inc": { "usage_count": 1_i64 },
                    "$set": { "updated_at": BsonDateTime::from_chrono(updated_at) },
                },
                after_update(),
            )
            .await?)
    }
}

#[async_trait]
impl TokenStore for PromoDb {
    async fn insert_token(&self, token: &Token) -> Result<(), ServiceError> {
        self.tokens().insert_one(token, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                ServiceError::DuplicateToken
            } else {
                tracing::error!("Failed to insert token: {}", e);
                ServiceError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<Token>, ServiceError> {
        Ok(self.tokens().find_one(doc! { "token": token }, None).await?)
    }

    async fn list_tokens(
        &self,
        filter: &TokenFilter,
        page: Page,
    ) -> Result<Paginated<Token>, ServiceError> {
        let mut query = doc! {};
        if let Some(used) = filter.is_used {
            query.insert("is_used", used);
        }
        if let Some(promo_code_id) = &filter.promo_code_id {
            query.insert("promo_code_id", promo_code_id.as_str());
        }
        self.paginate(
            self.tokens(),
            query,
            doc! { "created_at": -1, "_id": -1 },
            page,
        )
        .await
    }

    async fn mark_token_used(
        &self,
        token: &str,
        usage: &TokenUsage,
    ) -> Result<Option<Token>, ServiceError> {
        // The is_used predicate makes this a compare-and-set: only one writer matches.
        Ok(self
            .tokens()
            .find_one_and_update(
                doc! { "token": token, "is_used": false },
                doc! {
                    "$set": {
                        "is_used": true,
                        "used_at": BsonDateTime::from_chrono(usage.used_at),
                        "ip_address": usage.ip_address.clone(),
                        "user_agent": usage.user_agent.clone(),
                    }
                },
                after_update(),
            )
            .await?)
    }

    async fn delete_token(&self, token: &str) -> Result<bool, ServiceError> {
        let result = self
            .tokens()
            .delete_one(doc! { "token": token }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl EventStore for PromoDb {
    async fn append_event(&self, event: &RedemptionEvent) -> Result<(), ServiceError> {
        self.events().insert_one(event, None).await?;
        Ok(())
    }

    async fn recent_events(&self, limit: u64) -> Result<Vec<RedemptionEvent>, ServiceError> {
        let find_options = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .limit(limit as i64)
            .build();

        let events = self
            .events()
            .find(doc! {}, find_options)
            .await?
            .try_collect()
            .await?;
        Ok(events)
    }
}

#[async_trait]
impl StoreHealth for PromoDb {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                ServiceError::Database(e)
            })?;
        Ok(())
    }
}
