// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, points, roles)
//! - Tasks (redeemable codes and their redeemers)
//! - Sessions (HTTP session records)

use crate::db::{apply_redemption, collections, RedeemOutcome, Store};
use crate::error::AppError;
use crate::models::{Role, SessionDoc, Task, User, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::{FirestoreConsistencySelector, FirestoreQueryDirection, FirestoreTimestamp};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes no credentials; avoid picking up local ones.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    async fn get_doc<T>(
        db: &firestore::FirestoreDb,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        db.fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Begin a transaction and return a client whose reads run inside it,
    /// so documents read through it are checked for conflicts at commit.
    async fn begin_read_write(
        &self,
    ) -> Result<(firestore::FirestoreDb, firestore::FirestoreTransaction<'_>), AppError> {
        let transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let tx_db = self.client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );
        Ok((tx_db, transaction))
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Self::get_doc(&self.client, collections::USERS, user_id).await
    }

    async fn upsert_user(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let (tx_db, mut transaction) = self.begin_read_write().await?;

        let existing: Option<User> = Self::get_doc(&tx_db, collections::USERS, &profile.id).await?;
        let user = match existing {
            Some(mut user) => {
                user.refresh_profile(profile);
                user
            }
            None => {
                tracing::info!(user_id = %profile.id, role = %profile.initial_role, "Creating new user");
                User::from_profile(profile, now)
            }
        };

        self.client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(user)
    }

    /// Read and write inside one transaction so a concurrent redemption
    /// cannot be overwritten with stale points.
    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<Option<User>, AppError> {
        let (tx_db, mut transaction) = self.begin_read_write().await?;

        let Some(mut user) = Self::get_doc::<User>(&tx_db, collections::USERS, user_id).await?
        else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };
        user.role = role;

        self.client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(Some(user))
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<User>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("points", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Task Operations ─────────────────────────────────────────

    async fn get_task(&self, code: &str) -> Result<Option<Task>, AppError> {
        Self::get_doc(&self.client, collections::TASKS, code).await
    }

    async fn create_task(&self, task: &Task) -> Result<(), AppError> {
        let (tx_db, mut transaction) = self.begin_read_write().await?;

        let existing: Option<Task> = Self::get_doc(&tx_db, collections::TASKS, &task.code).await?;
        if existing.is_some() {
            let _ = transaction.rollback().await;
            return Err(AppError::Conflict(format!(
                "Task code '{}' already exists",
                task.code
            )));
        }

        self.client
            .fluent()
            .update()
            .in_col(collections::TASKS)
            .document_id(&task.code)
            .object(task)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add task to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    async fn list_active_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::TASKS)
            .filter(move |q| q.field("expires_at").greater_than_or_equal(FirestoreTimestamp(now)))
            .order_by([("expires_at", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reads the task and the user inside one transaction; a concurrent
    /// redemption of the same task makes one of the commits fail instead of
    /// awarding points twice.
    async fn redeem_task(
        &self,
        code: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, AppError> {
        let (tx_db, mut transaction) = self.begin_read_write().await?;

        let mut task: Option<Task> = Self::get_doc(&tx_db, collections::TASKS, code).await?;
        let mut user: Option<User> = Self::get_doc(&tx_db, collections::USERS, user_id).await?;

        let outcome = apply_redemption(task.as_mut(), user.as_mut(), user_id, now);

        let (Some(task), Some(user), RedeemOutcome::Redeemed { .. }) = (task, user, &outcome)
        else {
            let _ = transaction.rollback().await;
            tracing::debug!(code, user_id, outcome = ?outcome, "Redemption rejected");
            return Ok(outcome);
        };

        let client = &self.client;
        client
            .fluent()
            .update()
            .in_col(collections::TASKS)
            .document_id(&task.code)
            .object(&task)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add task to transaction: {}", e)))?;
        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(code, user_id, total_points = user.points, "Task redeemed");
        Ok(outcome)
    }

    // ─── Session Operations ──────────────────────────────────────

    async fn load_session(&self, session_id: &str) -> Result<Option<SessionDoc>, AppError> {
        Self::get_doc(&self.client, collections::SESSIONS, session_id).await
    }

    async fn save_session(&self, session: &SessionDoc) -> Result<(), AppError> {
        self.set_doc(collections::SESSIONS, &session.id, session).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::SESSIONS)
            .document_id(session_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let expired: Vec<SessionDoc> = self
            .client
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(move |q| q.field("expires_at").less_than_or_equal(FirestoreTimestamp(now)))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for doc in &expired {
            self.delete_session(&doc.id).await?;
        }
        Ok(expired.len())
    }
}
