//! Mahasiswa (student) model and list query types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enrollment status, stored with the original wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Aktif,
    Cuti,
    Lulus,
    Dropout,
}

impl StudentStatus {
    pub const ALL: [StudentStatus; 4] = [
        StudentStatus::Aktif,
        StudentStatus::Cuti,
        StudentStatus::Lulus,
        StudentStatus::Dropout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Aktif => "aktif",
            StudentStatus::Cuti => "cuti",
            StudentStatus::Lulus => "lulus",
            StudentStatus::Dropout => "dropout",
        }
    }
}

impl FromStr for StudentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aktif" => Ok(StudentStatus::Aktif),
            "cuti" => Ok(StudentStatus::Cuti),
            "lulus" => Ok(StudentStatus::Lulus),
            "dropout" => Ok(StudentStatus::Dropout),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mahasiswa entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mahasiswa {
    pub id: i64,
    pub nim: String,
    pub nama: String,
    pub email: String,
    pub prodi: String,
    pub angkatan: i32,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Validated field set used for both create and update (full replace).
#[derive(Debug, Clone)]
pub struct MahasiswaFields {
    pub nim: String,
    pub nama: String,
    pub email: String,
    pub prodi: String,
    pub angkatan: i32,
    pub status: StudentStatus,
}

/// Raw query parameters for the student listing. Everything is accepted as
/// an optional string so that empty or malformed values degrade to "absent"
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentListParams {
    pub q: Option<String>,
    pub prodi: Option<String>,
    pub status: Option<String>,
    pub angkatan: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortDir")]
    pub sort_dir: Option<String>,
    pub per_page: Option<String>,
    pub page: Option<String>,
}

/// Normalized listing query handed to the repository.
#[derive(Debug, Clone)]
pub struct StudentListQuery {
    pub search: Option<String>,
    pub prodi: Option<String>,
    pub status: Option<String>,
    pub angkatan: Option<i32>,
    pub sort_column: &'static str,
    pub sort_desc: bool,
    pub per_page: i64,
    pub page: i64,
}

impl StudentListQuery {
    /// Page numbers are client-controlled and only floored at 1, so the
    /// multiplication must not overflow.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

pub const DEFAULT_PER_PAGE: i64 = 15;
pub const MAX_PER_PAGE: i64 = 100;

const SORTABLE_COLUMNS: [&str; 8] = [
    "nim",
    "nama",
    "email",
    "prodi",
    "angkatan",
    "status",
    "created_at",
    "updated_at",
];

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl StudentListParams {
    /// Apply defaults, the sort allow-list and the page-size cap.
    ///
    /// An unrecognized `sortBy` falls back to newest-first by creation time;
    /// `sortDir` is descending unless it is exactly `asc`.
    pub fn normalized(&self) -> StudentListQuery {
        let sort_column = non_empty(&self.sort_by)
            .and_then(|s| SORTABLE_COLUMNS.iter().find(|c| **c == s).copied());

        let sort_desc = match (&sort_column, non_empty(&self.sort_dir).as_deref()) {
            (Some(_), Some("asc")) => false,
            (Some(_), _) => true,
            // Default ordering is always newest-first.
            (None, _) => true,
        };

        let per_page = non_empty(&self.per_page)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);

        let page = non_empty(&self.page)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(1)
            .max(1);

        StudentListQuery {
            search: non_empty(&self.q),
            prodi: non_empty(&self.prodi),
            status: non_empty(&self.status),
            angkatan: non_empty(&self.angkatan).and_then(|s| s.parse().ok()),
            sort_column: sort_column.unwrap_or("created_at"),
            sort_desc,
            per_page,
            page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_newest_first() {
        let q = StudentListParams::default().normalized();
        assert_eq!(q.sort_column, "created_at");
        assert!(q.sort_desc);
        assert_eq!(q.per_page, DEFAULT_PER_PAGE);
        assert_eq!(q.page, 1);
    }

    #[test]
    fn per_page_is_clamped_to_max() {
        let params = StudentListParams {
            per_page: Some("500".to_string()),
            ..Default::default()
        };
        assert_eq!(params.normalized().per_page, MAX_PER_PAGE);

        let params = StudentListParams {
            per_page: Some("0".to_string()),
            ..Default::default()
        };
        assert_eq!(params.normalized().per_page, 1);
    }

    #[test]
    fn unknown_sort_field_falls_back_to_default() {
        let params = StudentListParams {
            sort_by: Some("password_hash".to_string()),
            sort_dir: Some("asc".to_string()),
            ..Default::default()
        };
        let q = params.normalized();
        assert_eq!(q.sort_column, "created_at");
        assert!(q.sort_desc);
    }

    #[test]
    fn allow_listed_sort_field_is_used() {
        let params = StudentListParams {
            sort_by: Some("nama".to_string()),
            sort_dir: Some("asc".to_string()),
            ..Default::default()
        };
        let q = params.normalized();
        assert_eq!(q.sort_column, "nama");
        assert!(!q.sort_desc);
    }

    #[test]
    fn empty_and_malformed_filters_are_ignored() {
        let params = StudentListParams {
            q: Some("   ".to_string()),
            prodi: Some(String::new()),
            angkatan: Some("abc".to_string()),
            page: Some("-3".to_string()),
            ..Default::default()
        };
        let q = params.normalized();
        assert!(q.search.is_none());
        assert!(q.prodi.is_none());
        assert!(q.angkatan.is_none());
        assert_eq!(q.page, 1);
    }

    #[test]
    fn offset_saturates_on_huge_page_numbers() {
        let params = StudentListParams {
            page: Some(i64::MAX.to_string()),
            per_page: Some("100".to_string()),
            ..Default::default()
        };
        let q = params.normalized();
        assert_eq!(q.page, i64::MAX);
        assert_eq!(q.offset(), i64::MAX);

        let params = StudentListParams {
            page: Some("3".to_string()),
            per_page: Some("10".to_string()),
            ..Default::default()
        };
        assert_eq!(params.normalized().offset(), 20);
    }

    #[test]
    fn status_round_trips_through_wire_values() {
        for status in StudentStatus::ALL {
            assert_eq!(status.as_str().parse::<StudentStatus>(), Ok(status));
        }
        assert!("active".parse::<StudentStatus>().is_err());
    }
}
