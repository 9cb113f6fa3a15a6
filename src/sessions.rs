// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP sessions persisted in the document store.
//!
//! The session cookie carries only an opaque ID; the record holds the
//! authenticated user ID and, during login, the pending OAuth nonce.

use crate::db::Store;
use crate::error::AppError;
use crate::models::SessionDoc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::sync::Arc;
use time::OffsetDateTime;
use tower_sessions::cookie::SameSite;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "newgame_session";
/// Session key holding the authenticated user ID.
pub const USER_ID_KEY: &str = "user_id";
/// Session key holding the OAuth nonce between redirect and callback.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";

const SESSION_INACTIVITY_DAYS: i64 = 7;

/// How often stale session records are swept.
pub const EXPIRED_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15 * 60);

/// [`SessionStore`] backed by the application's [`Store`].
#[derive(Clone)]
pub struct DocumentSessionStore {
    db: Arc<dyn Store>,
}

impl std::fmt::Debug for DocumentSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSessionStore").finish_non_exhaustive()
    }
}

impl DocumentSessionStore {
    pub fn new(db: Arc<dyn Store>) -> Self {
        Self { db }
    }
}

fn backend_error(err: AppError) -> session_store::Error {
    session_store::Error::Backend(err.to_string())
}

fn to_chrono(at: OffsetDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(at.unix_timestamp(), at.nanosecond()).unwrap_or_default()
}

fn to_offset(at: DateTime<Utc>) -> session_store::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| session_store::Error::Decode(e.to_string()))
}

/// Encode a session record as a stored document.
pub fn record_to_doc(record: &Record) -> session_store::Result<SessionDoc> {
    let data = serde_json::to_string(&record.data)
        .map_err(|e| session_store::Error::Encode(e.to_string()))?;
    Ok(SessionDoc {
        id: record.id.to_string(),
        data,
        expires_at: to_chrono(record.expiry_date),
    })
}

fn doc_to_record(doc: &SessionDoc) -> session_store::Result<Record> {
    let id = Id::from_str(&doc.id).map_err(|e| session_store::Error::Decode(e.to_string()))?;
    let data =
        serde_json::from_str(&doc.data).map_err(|e| session_store::Error::Decode(e.to_string()))?;
    Ok(Record {
        id,
        data,
        expiry_date: to_offset(doc.expires_at)?,
    })
}

#[async_trait]
impl SessionStore for DocumentSessionStore {
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let doc = record_to_doc(record)?;
        self.db.save_session(&doc).await.map_err(backend_error)
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let Some(doc) = self
            .db
            .load_session(&session_id.to_string())
            .await
            .map_err(backend_error)?
        else {
            return Ok(None);
        };

        if doc.is_expired(Utc::now()) {
            tracing::debug!("Dropping expired session record");
            self.db.delete_session(&doc.id).await.map_err(backend_error)?;
            return Ok(None);
        }

        doc_to_record(&doc).map(Some)
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.db
            .delete_session(&session_id.to_string())
            .await
            .map_err(backend_error)
    }
}

#[async_trait]
impl ExpiredDeletion for DocumentSessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let removed = self
            .db
            .delete_expired_sessions(Utc::now())
            .await
            .map_err(backend_error)?;
        if removed > 0 {
            tracing::info!(removed, "Deleted expired sessions");
        }
        Ok(())
    }
}

/// Periodically delete expired session records until the runtime stops.
pub fn spawn_expired_deletion(
    store: DocumentSessionStore,
    period: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = store.delete_expired().await {
                tracing::warn!(error = %e, "Expired session sweep failed");
            }
        }
    })
}

/// Build the session middleware layer.
pub fn session_layer(
    db: Arc<dyn Store>,
    secure: bool,
) -> SessionManagerLayer<DocumentSessionStore> {
    SessionManagerLayer::new(DocumentSessionStore::new(db))
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(secure)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(
            SESSION_INACTIVITY_DAYS,
        )))
}
