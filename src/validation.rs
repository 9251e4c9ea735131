use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::errors::{ApiError, FieldError};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static UF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("valid uf regex"));

/// Implemented by every create/update payload.
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Collects field-level failures and turns them into a single
/// [`ApiError::Validation`].
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{} is required", field));
        }
    }

    /// Same as [`FieldErrors::required`] but only checks values that were sent.
    pub fn not_blank(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.required(field, value);
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<f64>) {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                self.add(field, format!("{} must be a non-negative number", field));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            if !EMAIL_RE.is_match(value.trim()) {
                self.add(field, format!("{} must be a valid email address", field));
            }
        }
    }

    pub fn uf(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            if !UF_RE.is_match(value.trim()) {
                self.add(field, format!("{} must be a two-letter state code", field));
            }
        }
    }

    pub fn date_order(
        &mut self,
        from_field: &str,
        from: Option<DateTime<Utc>>,
        until_field: &str,
        until: Option<DateTime<Utc>>,
    ) {
        if let (Some(from), Some(until)) = (from, until) {
            if from >= until {
                self.add(until_field, format!("{} must be later than {}", until_field, from_field));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}
