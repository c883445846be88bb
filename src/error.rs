//! Application error type shared by the handlers and services.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};

use crate::database::DbError;
use crate::model::MediaKind;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("username {0:?} is already taken")]
    DuplicateUsername(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user {0} not found")]
    NotFound(String),

    /// The lookup service found nothing, or a title of another kind.
    #[error("no {kind} matches {query:?}")]
    LookupMiss { query: String, kind: MediaKind },

    #[error("metadata service unavailable: {0}")]
    TransportFailure(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("OAuth login failed: {0}")]
    OAuth(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),
}

pub type AppResult<T> = Result<T, AppError>;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::FOUND,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TransportFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidCredentials | AppError::OAuth(_) => StatusCode::UNAUTHORIZED,
            AppError::DuplicateUsername(_) => StatusCode::CONFLICT,
            AppError::LookupMiss { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Session(_)
            | AppError::Database(_)
            | AppError::Template(_)
            | AppError::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if let AppError::Unauthenticated = self {
            return HttpResponse::Found()
                .insert_header((header::LOCATION, "/login"))
                .finish();
        }
        if status.is_server_error() {
            log::error!("{}", self);
        }
        let message = match self {
            AppError::Session(_)
            | AppError::Database(_)
            | AppError::Template(_)
            | AppError::Password(_) => "Internal server error".to_owned(),
            other => other.to_string(),
        };
        HttpResponse::build(status)
            .content_type("text/plain; charset=utf-8")
            .body(message)
    }
}

/// Plain `302 Found` redirect, the response to nearly every form post.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}
