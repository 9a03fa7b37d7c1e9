//! Repository interfaces and their Postgres implementations
//!
//! Persistence is kept behind explicit traits returning plain data
//! structures. The store-level unique constraints stay authoritative: a
//! unique violation surfaces as [`StoreError::Duplicate`] and is mapped to
//! the same validation response as the service-layer pre-check.

pub mod mahasiswa;
pub mod token;
pub mod user;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Mahasiswa, MahasiswaFields, NewToken, NewUser, StudentListQuery, Token, User};

pub use mahasiswa::PgStudentRepository;
pub use token::PgTokenRepository;
pub use user::PgUserRepository;

/// Error from a repository write
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the value of the named field
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new_user: &NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn create(&self, new_token: &NewToken) -> anyhow::Result<Token>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Token>>;
    /// Returns whether a row was actually deleted.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Returns the page of matching students plus the total match count.
    /// Soft-deleted rows are always excluded.
    async fn list(&self, query: &StudentListQuery) -> anyhow::Result<(Vec<Mahasiswa>, i64)>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Mahasiswa>>;
    async fn create(&self, fields: &MahasiswaFields) -> Result<Mahasiswa, StoreError>;
    /// Full replace of the listed fields. `Ok(None)` when the row is absent
    /// or soft-deleted.
    async fn update(
        &self,
        id: i64,
        fields: &MahasiswaFields,
    ) -> Result<Option<Mahasiswa>, StoreError>;
    /// Sets `deleted_at`; returns whether a live row was found.
    async fn soft_delete(&self, id: i64) -> anyhow::Result<bool>;
    async fn nim_exists(&self, nim: &str, exclude_id: Option<i64>) -> anyhow::Result<bool>;
    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> anyhow::Result<bool>;
}

/// Inspect an sqlx error for a unique-constraint violation and report the
/// offending constraint name.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.is_unique_violation() {
            return db_err.constraint().map(str::to_string);
        }
    }
    None
}
