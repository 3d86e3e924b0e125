use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::{
    auth::{
        email,
        password::PasswordHasher,
        repo::UserRepository,
        repo_types::User,
        token::TokenCodec,
    },
    error::AccountError,
};

/// A user together with a freshly signed token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Registration and authentication over a repository, a hasher and a token codec.
pub struct AccountService {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: TokenCodec,
}

fn normalize(email: &str) -> &str {
    email.trim()
}

impl AccountService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: TokenCodec,
    ) -> Self {
        Self { repo, hasher, tokens }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let email = normalize(email);
        if let Err(e) = email::validate(email) {
            warn!(email = %email, "invalid email");
            return Err(e);
        }

        // Fast path only; the storage constraint decides races.
        match self.repo.find_by_email(email).await {
            Ok(_) => {
                warn!(email = %email, "email already registered");
                return Err(AccountError::DuplicateEmail);
            }
            Err(AccountError::NotFound) => {}
            Err(e) => {
                error!(error = ?e, "find_by_email failed");
                return Err(e);
            }
        }

        let hash = self.hash(password).await?;
        let user = self.repo.create(email, &hash).await?;
        let token = self.tokens.sign(user.id, &user.email)?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(Session { user, token })
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let email = normalize(email);
        let user = match self.repo.find_by_email(email).await {
            Ok(u) => u,
            Err(AccountError::NotFound) => {
                warn!(email = %email, "login unknown email");
                return Err(AccountError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = ?e, "find_by_email failed");
                return Err(e);
            }
        };

        if !self.verify(&user.password_hash, password).await? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.tokens.sign(user.id, &user.email)?;
        info!(user_id = user.id, "user logged in");
        Ok(Session { user, token })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, AccountError> {
        self.repo.find_by_email(normalize(email)).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<User, AccountError> {
        self.repo.find_by_id(id).await
    }

    // Argon2 is deliberately slow; keep it off the async workers.
    async fn hash(&self, password: &str) -> Result<String, AccountError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?
    }

    async fn verify(&self, hash: &str, password: &str) -> Result<bool, AccountError> {
        let hasher = self.hasher.clone();
        let (hash, password) = (hash.to_owned(), password.to_owned());
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&hash, &password))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))??;
        debug!(ok, "password verified");
        Ok(ok)
    }
}

#[cfg(test)]
pub(crate) fn test_service(repo: Arc<dyn UserRepository>) -> AccountService {
    AccountService::new(
        repo,
        Arc::new(crate::auth::password::test_hasher(11)),
        TokenCodec::new(b"test-secret", "test", time::Duration::minutes(5)),
    )
}
