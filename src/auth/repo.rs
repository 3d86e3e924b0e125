use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use crate::{auth::repo_types::User, error::AccountError};

/// Persistence of user records. Implementations enforce email uniqueness
/// atomically at the storage layer.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AccountError>;
    async fn find_by_email(&self, email: &str) -> Result<User, AccountError>;
    async fn find_by_id(&self, id: i64) -> Result<User, AccountError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    /// Relies on the partial unique index `users_email_live_key`.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AccountError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at, updated_at, deleted_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(email = %email, "insert hit unique email constraint");
                Err(AccountError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<User, AccountError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AccountError::NotFound)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, AccountError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AccountError::NotFound)
    }
}

/// In-memory store for tests. Uniqueness is checked and the row inserted
/// under one lock, mirroring the database constraint.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use time::OffsetDateTime;

    #[derive(Default)]
    struct Tables {
        next_id: i64,
        rows: HashMap<i64, User>,
        live_emails: HashMap<String, i64>, // key: email of non-deleted rows
        writes: usize,
    }

    #[derive(Default)]
    pub struct InMemoryUserRepository {
        tables: Mutex<Tables>,
        fail_with_storage: AtomicBool,
    }

    impl InMemoryUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of successful inserts so far.
        pub fn writes(&self) -> usize {
            self.lock().writes
        }

        /// Makes every subsequent call fail with a storage error.
        pub fn fail_storage(&self) {
            self.fail_with_storage.store(true, Ordering::SeqCst);
        }

        pub fn soft_delete(&self, id: i64) -> Result<(), AccountError> {
            let mut t = self.lock();
            let user = t.rows.get_mut(&id).ok_or(AccountError::NotFound)?;
            if user.deleted_at.is_none() {
                let now = OffsetDateTime::now_utc();
                user.deleted_at = Some(now);
                user.updated_at = now;
                let email = user.email.clone();
                t.live_emails.remove(&email);
            }
            Ok(())
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
            self.tables.lock().unwrap_or_else(|p| p.into_inner())
        }

        fn check_available(&self) -> Result<(), AccountError> {
            if self.fail_with_storage.load(Ordering::SeqCst) {
                return Err(AccountError::Storage(anyhow::anyhow!("connection closed")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepository {
        async fn create(&self, email: &str, password_hash: &str) -> Result<User, AccountError> {
            self.check_available()?;
            let mut t = self.lock();
            if t.live_emails.contains_key(email) {
                return Err(AccountError::DuplicateEmail);
            }
            t.next_id += 1;
            let now = OffsetDateTime::now_utc();
            let user = User {
                id: t.next_id,
                email: email.to_owned(),
                password_hash: password_hash.to_owned(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            t.live_emails.insert(user.email.clone(), user.id);
            t.rows.insert(user.id, user.clone());
            t.writes += 1;
            Ok(user)
        }

        async fn find_by_email(&self, email: &str) -> Result<User, AccountError> {
            self.check_available()?;
            let t = self.lock();
            t.live_emails
                .get(email)
                .and_then(|id| t.rows.get(id))
                .cloned()
                .ok_or(AccountError::NotFound)
        }

        async fn find_by_id(&self, id: i64) -> Result<User, AccountError> {
            self.check_available()?;
            self.lock()
                .rows
                .get(&id)
                .filter(|u| !u.is_deleted())
                .cloned()
                .ok_or(AccountError::NotFound)
        }
    }
}
