//! Input validation utilities
//!
//! Field validators return `Result<(), String>`; handlers collect failures
//! into a [`ValidationErrors`] map keyed by field name.

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Per-field validation messages, serialized as `{field: [message, ...]}`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record the outcome of a single field validator.
    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a one-field error map in one step.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    })
}

/// Validate a person name (registration)
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required.".to_string());
    }
    if name.len() > 255 {
        return Err("Name must not exceed 255 characters.".to_string());
    }
    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email address is required.".to_string());
    }
    if email.len() > 255 {
        return Err("Email address must not exceed 255 characters.".to_string());
    }
    if !email_regex().is_match(email) {
        return Err("Please provide a valid email address.".to_string());
    }
    Ok(())
}

/// Validate password length bounds
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required.".to_string());
    }
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long.".to_string());
    }
    if password.len() > 255 {
        return Err("Password must not exceed 255 characters.".to_string());
    }
    Ok(())
}

/// Validate that the confirmation matches the password
pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<(), String> {
    if password != confirmation {
        return Err("The password confirmation does not match.".to_string());
    }
    Ok(())
}

/// Validate a student NIM (id code)
pub fn validate_nim(nim: &str) -> Result<(), String> {
    if nim.trim().is_empty() {
        return Err("NIM wajib diisi".to_string());
    }
    if nim.len() > 20 {
        return Err("NIM maksimal 20 karakter".to_string());
    }
    Ok(())
}

/// Validate a student name
pub fn validate_nama(nama: &str) -> Result<(), String> {
    if nama.trim().is_empty() {
        return Err("Nama wajib diisi".to_string());
    }
    if nama.len() > 255 {
        return Err("Nama maksimal 255 karakter".to_string());
    }
    Ok(())
}

/// Validate a student email
pub fn validate_student_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email wajib diisi".to_string());
    }
    if email.len() > 255 || !email_regex().is_match(email) {
        return Err("Format email tidak valid".to_string());
    }
    Ok(())
}

/// Validate a study program
pub fn validate_prodi(prodi: &str) -> Result<(), String> {
    if prodi.trim().is_empty() {
        return Err("Program studi wajib diisi".to_string());
    }
    if prodi.len() > 255 {
        return Err("Program studi maksimal 255 karakter".to_string());
    }
    Ok(())
}

/// Validate an intake year: 4 digits, within the last 10 years.
pub fn validate_angkatan(angkatan: i32) -> Result<(), String> {
    if !(1000..=9999).contains(&angkatan) {
        return Err("Angkatan harus 4 digit".to_string());
    }
    let current_year = Utc::now().year();
    if angkatan < current_year - 10 || angkatan > current_year {
        return Err("Angkatan tidak valid".to_string());
    }
    Ok(())
}

/// Validate a raw status value
pub fn validate_status(status: &str) -> Result<(), String> {
    if status.is_empty() {
        return Err("Status wajib diisi".to_string());
    }
    if status.parse::<crate::models::StudentStatus>().is_err() {
        return Err("Status harus salah satu dari: aktif, cuti, lulus, dropout".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("john@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(256)).is_err());
    }

    #[test]
    fn password_confirmation_must_match() {
        assert!(validate_password_confirmation("secret123", "secret123").is_ok());
        assert!(validate_password_confirmation("secret123", "secret124").is_err());
    }

    #[test]
    fn angkatan_window_is_ten_years() {
        let year = Utc::now().year();
        assert!(validate_angkatan(year).is_ok());
        assert!(validate_angkatan(year - 10).is_ok());
        assert!(validate_angkatan(year - 11).is_err());
        assert!(validate_angkatan(year + 1).is_err());
        assert!(validate_angkatan(99).is_err());
    }

    #[test]
    fn status_values() {
        assert!(validate_status("aktif").is_ok());
        assert!(validate_status("dropout").is_ok());
        assert!(validate_status("graduated").is_err());
        assert!(validate_status("").is_err());
    }

    #[test]
    fn errors_collect_per_field() {
        let mut errors = ValidationErrors::new();
        errors.check("email", validate_email(""));
        errors.check("email", Err("second problem".to_string()));
        errors.check("nama", validate_nama("ok"));
        assert!(!errors.is_empty());

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["email"].as_array().unwrap().len(), 2);
        assert!(json.get("nama").is_none());
    }
}
