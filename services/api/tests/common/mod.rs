//! Shared test harness: the full router wired to in-memory repositories.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use api::auth::AuthService;
use api::config::Environment;
use api::models::{Mahasiswa, MahasiswaFields, NewToken, NewUser, StudentListQuery, Token, User};
use api::rate_limiter::{RateLimiter, RateLimits};
use api::repositories::{StoreError, StudentRepository, TokenRepository, UserRepository};
use api::state::AppState;

#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
    next_id: AtomicI64,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn create(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let now = Utc::now();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryTokens {
    rows: Mutex<Vec<Token>>,
    next_id: AtomicI64,
}

impl InMemoryTokens {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Backdate every stored token past its lifetime.
    pub fn expire_all(&self) {
        let past = Utc::now() - chrono::Duration::hours(1);
        for token in self.rows.lock().unwrap().iter_mut() {
            token.expires_at = Some(past);
        }
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokens {
    async fn create(&self, new_token: &NewToken) -> anyhow::Result<Token> {
        let token = Token {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id: new_token.user_id,
            name: new_token.name.clone(),
            token_hash: new_token.token_hash.clone(),
            abilities: new_token.abilities.clone(),
            created_at: Utc::now(),
            expires_at: new_token.expires_at,
        };
        self.rows.lock().unwrap().push(token.clone());
        Ok(token)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Token>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| t.id != id);
        Ok(rows.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryStudents {
    rows: Mutex<Vec<Mahasiswa>>,
    next_id: AtomicI64,
}

impl InMemoryStudents {
    /// Raw row lookup including soft-deleted entries.
    pub fn raw(&self, id: i64) -> Option<Mahasiswa> {
        self.rows.lock().unwrap().iter().find(|m| m.id == id).cloned()
    }

    fn live_conflict(&self, f: impl Fn(&Mahasiswa) -> bool, exclude_id: Option<i64>) -> bool {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| Some(m.id) != exclude_id)
            .any(f)
    }
}

fn matches_query(m: &Mahasiswa, query: &StudentListQuery) -> bool {
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        let hit = m.nim.to_lowercase().contains(&needle)
            || m.nama.to_lowercase().contains(&needle)
            || m.email.to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
    }
    if let Some(prodi) = &query.prodi {
        if &m.prodi != prodi {
            return false;
        }
    }
    if let Some(status) = &query.status {
        if m.status.as_str() != status {
            return false;
        }
    }
    if let Some(angkatan) = query.angkatan {
        if m.angkatan != angkatan {
            return false;
        }
    }
    true
}

fn sort_key(m: &Mahasiswa, column: &str) -> String {
    match column {
        "nim" => m.nim.clone(),
        "nama" => m.nama.clone(),
        "email" => m.email.clone(),
        "prodi" => m.prodi.clone(),
        "angkatan" => format!("{:04}", m.angkatan),
        "status" => m.status.as_str().to_string(),
        "updated_at" => m.updated_at.to_rfc3339(),
        _ => m.created_at.to_rfc3339(),
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudents {
    async fn list(&self, query: &StudentListQuery) -> anyhow::Result<(Vec<Mahasiswa>, i64)> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<Mahasiswa> = rows
            .iter()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| matches_query(m, query))
            .cloned()
            .collect();
        drop(rows);

        matched.sort_by(|a, b| {
            let ord = sort_key(a, query.sort_column)
                .cmp(&sort_key(b, query.sort_column))
                .then(a.id.cmp(&b.id));
            if query.sort_desc { ord.reverse() } else { ord }
        });

        let total = matched.len() as i64;
        let page: Vec<Mahasiswa> = matched
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Mahasiswa>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id && m.deleted_at.is_none())
            .cloned())
    }

    async fn create(&self, fields: &MahasiswaFields) -> Result<Mahasiswa, StoreError> {
        if self.live_conflict(|m| m.nim == fields.nim, None) {
            return Err(StoreError::Duplicate("nim"));
        }
        if self.live_conflict(|m| m.email == fields.email, None) {
            return Err(StoreError::Duplicate("email"));
        }
        let now = Utc::now();
        let student = Mahasiswa {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            nim: fields.nim.clone(),
            nama: fields.nama.clone(),
            email: fields.email.clone(),
            prodi: fields.prodi.clone(),
            angkatan: fields.angkatan,
            status: fields.status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.rows.lock().unwrap().push(student.clone());
        Ok(student)
    }

    async fn update(
        &self,
        id: i64,
        fields: &MahasiswaFields,
    ) -> Result<Option<Mahasiswa>, StoreError> {
        if self.live_conflict(|m| m.nim == fields.nim, Some(id)) {
            return Err(StoreError::Duplicate("nim"));
        }
        if self.live_conflict(|m| m.email == fields.email, Some(id)) {
            return Err(StoreError::Duplicate("email"));
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|m| m.id == id && m.deleted_at.is_none())
        else {
            return Ok(None);
        };
        row.nim = fields.nim.clone();
        row.nama = fields.nama.clone();
        row.email = fields.email.clone();
        row.prodi = fields.prodi.clone();
        row.angkatan = fields.angkatan;
        row.status = fields.status;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn soft_delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|m| m.id == id && m.deleted_at.is_none())
        else {
            return Ok(false);
        };
        row.deleted_at = Some(Utc::now());
        Ok(true)
    }

    async fn nim_exists(&self, nim: &str, exclude_id: Option<i64>) -> anyhow::Result<bool> {
        Ok(self.live_conflict(|m| m.nim == nim, exclude_id))
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> anyhow::Result<bool> {
        Ok(self.live_conflict(|m| m.email == email, exclude_id))
    }
}

pub struct TestApp {
    pub router: Router,
    pub users: Arc<InMemoryUsers>,
    pub tokens: Arc<InMemoryTokens>,
    pub students: Arc<InMemoryStudents>,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(RateLimits::default(), Environment::Development)
}

pub fn spawn_app_with_limits(limits: RateLimits) -> TestApp {
    spawn_app_with(limits, Environment::Development)
}

pub fn spawn_production_app() -> TestApp {
    spawn_app_with(RateLimits::default(), Environment::Production)
}

fn spawn_app_with(limits: RateLimits, environment: Environment) -> TestApp {
    let users = Arc::new(InMemoryUsers::default());
    let tokens = Arc::new(InMemoryTokens::default());
    let students = Arc::new(InMemoryStudents::default());

    let state = AppState {
        auth: AuthService::new(users.clone(), tokens.clone(), 30),
        students: students.clone(),
        rate_limiter: RateLimiter::new(),
        limits,
        environment,
    };

    TestApp {
        router: api::routes::create_router(state),
        users,
        tokens,
        students,
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn read_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
