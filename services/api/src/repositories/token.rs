//! Token repository for database operations

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};

use super::TokenRepository;
use crate::models::{NewToken, Token};

/// Postgres-backed token repository
#[derive(Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_token(row: &PgRow) -> Token {
    let abilities: Json<Vec<String>> = row.get("abilities");
    Token {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        token_hash: row.get("token_hash"),
        abilities: abilities.0,
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn create(&self, new_token: &NewToken) -> anyhow::Result<Token> {
        let row = sqlx::query(
            r#"
            INSERT INTO auth_tokens (user_id, name, token_hash, abilities, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, name, token_hash, abilities, created_at, expires_at
            "#,
        )
        .bind(new_token.user_id)
        .bind(&new_token.name)
        .bind(&new_token.token_hash)
        .bind(Json(&new_token.abilities))
        .bind(new_token.expires_at)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert token")?;

        Ok(row_to_token(&row))
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Token>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, token_hash, abilities, created_at, expires_at
            FROM auth_tokens
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query token by id")?;

        Ok(row.as_ref().map(row_to_token))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete token")?;

        Ok(result.rows_affected() > 0)
    }
}
