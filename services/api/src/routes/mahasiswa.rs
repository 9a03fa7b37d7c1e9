//! Mahasiswa (student) CRUD handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult, NotFoundKind};
use crate::models::{Mahasiswa, MahasiswaFields, StudentListParams, StudentListQuery};
use crate::repositories::StoreError;
use crate::state::AppState;
use crate::validation::{
    ValidationErrors, validate_angkatan, validate_nama, validate_nim, validate_prodi,
    validate_status, validate_student_email,
};

/// Write payload shared by create and update. Every field is optional at
/// the deserialization layer so that missing fields produce per-field
/// validation messages instead of a bare body rejection.
#[derive(Debug, Deserialize)]
pub struct MahasiswaPayload {
    #[serde(default)]
    pub nim: Option<String>,
    #[serde(default)]
    pub nama: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub prodi: Option<String>,
    #[serde(default)]
    pub angkatan: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
}

fn validate_payload(payload: &MahasiswaPayload) -> Result<MahasiswaFields, ApiError> {
    let nim = payload.nim.as_deref().unwrap_or("").trim().to_string();
    let nama = payload.nama.as_deref().unwrap_or("").trim().to_string();
    let email = payload
        .email
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let prodi = payload.prodi.as_deref().unwrap_or("").trim().to_string();
    let status = payload.status.as_deref().unwrap_or("").trim().to_string();

    let mut errors = ValidationErrors::new();
    errors.check("nim", validate_nim(&nim));
    errors.check("nama", validate_nama(&nama));
    errors.check("email", validate_student_email(&email));
    errors.check("prodi", validate_prodi(&prodi));
    match payload.angkatan {
        Some(angkatan) => errors.check("angkatan", validate_angkatan(angkatan)),
        None => errors.add("angkatan", "Angkatan wajib diisi"),
    }
    errors.check("status", validate_status(&status));

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    Ok(MahasiswaFields {
        nim,
        nama,
        email,
        prodi,
        // Both unwraps are guarded by the checks above.
        angkatan: payload.angkatan.unwrap_or_default(),
        status: status.parse().unwrap_or(crate::models::StudentStatus::Aktif),
    })
}

/// Reject values already taken by another live row, using the same
/// messages as the store-constraint mapping.
async fn check_uniqueness(
    state: &AppState,
    fields: &MahasiswaFields,
    exclude_id: Option<i64>,
) -> ApiResult<()> {
    let mut errors = ValidationErrors::new();
    if state.students.nim_exists(&fields.nim, exclude_id).await? {
        errors.add("nim", "NIM sudah terdaftar");
    }
    if state.students.email_exists(&fields.email, exclude_id).await? {
        errors.add("email", "Email sudah terdaftar");
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn map_write_error(err: StoreError) -> ApiError {
    match err {
        // Lost the race against a concurrent write; same response as the
        // pre-check.
        StoreError::Duplicate("nim") => {
            ApiError::Validation(ValidationErrors::single("nim", "NIM sudah terdaftar"))
        }
        StoreError::Duplicate("email") => {
            ApiError::Validation(ValidationErrors::single("email", "Email sudah terdaftar"))
        }
        StoreError::Duplicate(field) => ApiError::Internal(anyhow::anyhow!(
            "unexpected unique violation on {field}"
        )),
        StoreError::Other(e) => ApiError::Internal(e),
    }
}

fn pagination_meta(query: &StudentListQuery, items: &[Mahasiswa], total: i64) -> serde_json::Value {
    let last_page = if total == 0 {
        1
    } else {
        (total + query.per_page - 1) / query.per_page
    };
    let from = (!items.is_empty()).then(|| query.offset() + 1);
    let to = (!items.is_empty()).then(|| query.offset() + items.len() as i64);

    json!({
        "current_page": query.page,
        "last_page": last_page,
        "per_page": query.per_page,
        "total": total,
        "from": from,
        "to": to,
    })
}

/// GET /mahasiswa
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<StudentListParams>,
) -> ApiResult<Response> {
    let query = params.normalized();
    let (items, total) = state.students.list(&query).await?;

    Ok(crate::response::ok(
        "Daftar mahasiswa berhasil diambil",
        json!({
            "items": items,
            "pagination": pagination_meta(&query, &items, total),
        }),
    ))
}

/// POST /mahasiswa
pub async fn store(
    State(state): State<AppState>,
    Json(payload): Json<MahasiswaPayload>,
) -> ApiResult<Response> {
    let fields = validate_payload(&payload)?;
    check_uniqueness(&state, &fields, None).await?;

    let student = state
        .students
        .create(&fields)
        .await
        .map_err(map_write_error)?;

    info!(id = student.id, nim = %student.nim, "mahasiswa created");

    Ok(crate::response::created(
        "Mahasiswa berhasil ditambahkan",
        json!(student),
    ))
}

/// GET /mahasiswa/:id
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let Some(student) = state.students.find_by_id(id).await? else {
        return Err(ApiError::NotFound(NotFoundKind::Resource));
    };

    Ok(crate::response::ok(
        "Data mahasiswa berhasil diambil",
        json!(student),
    ))
}

/// PUT /mahasiswa/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MahasiswaPayload>,
) -> ApiResult<Response> {
    let fields = validate_payload(&payload)?;
    check_uniqueness(&state, &fields, Some(id)).await?;

    let Some(student) = state
        .students
        .update(id, &fields)
        .await
        .map_err(map_write_error)?
    else {
        return Err(ApiError::NotFound(NotFoundKind::Resource));
    };

    info!(id = student.id, nim = %student.nim, "mahasiswa updated");

    Ok(crate::response::ok(
        "Mahasiswa berhasil diperbarui",
        json!(student),
    ))
}

/// DELETE /mahasiswa/:id
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    if !state.students.soft_delete(id).await? {
        return Err(ApiError::NotFound(NotFoundKind::Resource));
    }

    info!(id, "mahasiswa soft deleted");

    Ok(crate::response::ok_empty("Mahasiswa berhasil dihapus"))
}
