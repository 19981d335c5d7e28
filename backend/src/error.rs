use std::collections::BTreeMap;

use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::{Display, Error};
use serde::Serialize;

#[derive(Debug, Display, Error)]
pub enum Error {
    #[display("An internal error occured. Please try again later")]
    InternalError,
    #[display("Not found")]
    NotFound,
}

impl error::ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        match self {
            // The recovery endpoints answer lookup failures with an empty
            // body so callers cannot probe which part of the lookup failed.
            Self::NotFound => HttpResponse::build(self.status_code()).finish(),
            _ => HttpResponse::build(self.status_code())
                .insert_header(ContentType::plaintext())
                .body(self.to_string()),
        }
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

/// Per-field validation errors, serialized as `{"errors": {field: reason}}`.
///
/// Reasons are short codes (`required`, `invalid`, `mismatch`, ...) the
/// frontend maps to messages.
#[derive(Debug, Default, Serialize)]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, reason: &str) {
        self.errors.insert(field.to_string(), reason.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn take(&mut self, field: &str) -> Option<String> {
        self.errors.remove(field)
    }

    /// Drop an entry only when it carries the given reason.
    pub fn remove_if(&mut self, field: &str, reason: &str) {
        if self.get(field) == Some(reason) {
            self.errors.remove(field);
        }
    }

    /// Move an entry to a new key. An existing entry under `to` wins.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(reason) = self.errors.remove(from) {
            self.errors.entry(to.to_string()).or_insert(reason);
        }
    }

    /// Merge `other` into `self`; entries of `other` win on conflict.
    pub fn merge(&mut self, other: FieldErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn unprocessable(self) -> HttpResponse {
        HttpResponse::UnprocessableEntity().json(self)
    }

    pub fn unauthorized(self) -> HttpResponse {
        HttpResponse::Unauthorized().json(self)
    }
}
