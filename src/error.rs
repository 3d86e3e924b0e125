use thiserror::Error;

/// Failures of the account core. Each one is scoped to a single request.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("a user is already using that email")]
    DuplicateEmail,
    /// Shared by "no such user" and "wrong password".
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("user not found")]
    NotFound,
    #[error("failed to process password")]
    Hashing(String),
    #[error("malformed or invalid authorization token")]
    InvalidToken,
    #[error("failed to issue token")]
    TokenSigning(String),
    #[error("storage error")]
    Storage(#[source] anyhow::Error),
}

impl AccountError {
    /// True for infrastructure failures whose detail must stay server-side.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AccountError::Hashing(_) | AccountError::TokenSigning(_) | AccountError::Storage(_)
        )
    }
}

impl From<sqlx::Error> for AccountError {
    fn from(e: sqlx::Error) -> Self {
        AccountError::Storage(e.into())
    }
}
