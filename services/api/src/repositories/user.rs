//! User repository for database operations

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;

use super::{StoreError, UserRepository, unique_violation};
use crate::models::{NewUser, User};

/// Postgres-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        email_verified_at: row.get("email_verified_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: &NewUser) -> Result<User, StoreError> {
        info!(email = %new_user.email, "Creating new user");

        let row = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, email_verified_at, created_at, updated_at
            "#,
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if unique_violation(&e).is_some() {
                StoreError::Duplicate("email")
            } else {
                StoreError::Other(anyhow::Error::new(e).context("failed to insert user"))
            }
        })?;

        Ok(row_to_user(&row))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, email_verified_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query user by email")?;

        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, email_verified_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query user by id")?;

        Ok(row.as_ref().map(row_to_user))
    }
}
