//! Student repository: filtered listing, CRUD and soft deletion
//!
//! Every read carries the explicit `deleted_at IS NULL` predicate; soft
//! deletion only stamps the timestamp and leaves the row in place.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use super::{StoreError, StudentRepository, unique_violation};
use crate::models::{Mahasiswa, MahasiswaFields, StudentListQuery, StudentStatus};

/// Postgres-backed student repository
#[derive(Clone)]
pub struct PgStudentRepository {
    pool: PgPool,
}

impl PgStudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str =
    "id, nim, nama, email, prodi, angkatan, status, created_at, updated_at, deleted_at";

fn row_to_student(row: &PgRow) -> anyhow::Result<Mahasiswa> {
    let status: String = row.get("status");
    let status = status
        .parse::<StudentStatus>()
        .map_err(|_| anyhow::anyhow!("unexpected status value in store: {status}"))?;

    Ok(Mahasiswa {
        id: row.get("id"),
        nim: row.get("nim"),
        nama: row.get("nama"),
        email: row.get("email"),
        prodi: row.get("prodi"),
        angkatan: row.get("angkatan"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

/// Append the search and exact-match filters shared by the page query and
/// the count query.
fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a StudentListQuery) {
    if let Some(search) = &query.search {
        let pattern = format!("%{search}%");
        builder.push(" AND (nama ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR nim ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(prodi) = &query.prodi {
        builder.push(" AND prodi = ");
        builder.push_bind(prodi);
    }
    if let Some(status) = &query.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(angkatan) = query.angkatan {
        builder.push(" AND angkatan = ");
        builder.push_bind(angkatan);
    }
}

#[async_trait]
impl StudentRepository for PgStudentRepository {
    async fn list(&self, query: &StudentListQuery) -> anyhow::Result<(Vec<Mahasiswa>, i64)> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM mahasiswas WHERE deleted_at IS NULL"
        ));
        push_filters(&mut builder, query);

        // sort_column is allow-listed during query normalization, never
        // client-controlled text.
        builder.push(format!(
            " ORDER BY {} {}",
            query.sort_column,
            if query.sort_desc { "DESC" } else { "ASC" }
        ));
        builder.push(" LIMIT ");
        builder.push_bind(query.per_page);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset());

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .context("failed to list students")?;

        let students = rows
            .iter()
            .map(row_to_student)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut count_builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM mahasiswas WHERE deleted_at IS NULL",
        );
        push_filters(&mut count_builder, query);

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("failed to count students")?;

        Ok((students, total))
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Mahasiswa>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM mahasiswas WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query student by id")?;

        row.as_ref().map(row_to_student).transpose()
    }

    async fn create(&self, fields: &MahasiswaFields) -> Result<Mahasiswa, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO mahasiswas (nim, nama, email, prodi, angkatan, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&fields.nim)
        .bind(&fields.nama)
        .bind(&fields.email)
        .bind(&fields.prodi)
        .bind(fields.angkatan)
        .bind(fields.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_student_write_error)?;

        Ok(row_to_student(&row)?)
    }

    async fn update(
        &self,
        id: i64,
        fields: &MahasiswaFields,
    ) -> Result<Option<Mahasiswa>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE mahasiswas
            SET nim = $1, nama = $2, email = $3, prodi = $4, angkatan = $5,
                status = $6, updated_at = now()
            WHERE id = $7 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&fields.nim)
        .bind(&fields.nama)
        .bind(&fields.email)
        .bind(&fields.prodi)
        .bind(fields.angkatan)
        .bind(fields.status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_student_write_error)?;

        Ok(row.as_ref().map(row_to_student).transpose()?)
    }

    async fn soft_delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE mahasiswas SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("failed to soft-delete student")?;

        Ok(result.rows_affected() > 0)
    }

    async fn nim_exists(&self, nim: &str, exclude_id: Option<i64>) -> anyhow::Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM mahasiswas
            WHERE nim = $1 AND deleted_at IS NULL AND ($2::bigint IS NULL OR id <> $2)
            "#,
        )
        .bind(nim)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to check nim uniqueness")?;

        Ok(count > 0)
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> anyhow::Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM mahasiswas
            WHERE email = $1 AND deleted_at IS NULL AND ($2::bigint IS NULL OR id <> $2)
            "#,
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to check email uniqueness")?;

        Ok(count > 0)
    }
}

fn map_student_write_error(err: sqlx::Error) -> StoreError {
    match unique_violation(&err).as_deref() {
        Some("mahasiswas_nim_key") => StoreError::Duplicate("nim"),
        Some("mahasiswas_email_key") => StoreError::Duplicate("email"),
        _ => StoreError::Other(anyhow::Error::new(err).context("failed to write student")),
    }
}
