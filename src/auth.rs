//! Local accounts and the per-request session principal.

use actix_identity::{Identity, IdentityExt};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::database::UserDb;
use crate::error::{AppError, AppResult};
use crate::model::User;

/// Username/password accounts hashed with bcrypt.
#[derive(Debug, Clone)]
pub struct LocalAuth {
    cost: u32,
}

impl LocalAuth {
    pub fn new(cost: u32) -> Self {
        LocalAuth { cost }
    }

    /// Creates a local account and returns its id.
    pub fn register(&self, db: &sled::Db, username: &str, password: &str) -> AppResult<u64> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::InvalidCredentials);
        }
        if db.get_user_by_username(username)?.is_some() {
            return Err(AppError::DuplicateUsername(username.to_owned()));
        }
        let password_hash = bcrypt::hash(password, self.cost)?;
        db.add_user(&User::local(username.to_owned(), password_hash))?
            .ok_or_else(|| AppError::DuplicateUsername(username.to_owned()))
    }

    /// Checks a username/password pair and returns the account id.
    pub fn authenticate(&self, db: &sled::Db, username: &str, password: &str) -> AppResult<u64> {
        let (id, user) = db
            .get_user_by_username(username)?
            .ok_or(AppError::InvalidCredentials)?;
        // Accounts created through Google have no password to check against.
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::InvalidCredentials)?;
        if bcrypt::verify(password, hash)? {
            Ok(id)
        } else {
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Attaches user `id` to the current session.
pub fn start_session(req: &HttpRequest, id: u64) -> AppResult<()> {
    Identity::login(&req.extensions(), id.to_string())
        .map(|_| ())
        .map_err(|err| AppError::Session(err.to_string()))
}

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: u64,
    pub user: User,
}

/// Resolves the session's user id to a stored user.
///
/// Returns `None` for anonymous requests and for sessions whose user no
/// longer resolves; store errors are logged and treated as anonymous.
pub fn resolve_principal(req: &HttpRequest) -> Option<SessionUser> {
    let identity = req.get_identity().ok()?;
    let id = match identity.id() {
        Ok(id) => id,
        Err(err) => {
            log::warn!("unreadable session identity: {}", err);
            return None;
        }
    };
    let id: u64 = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            log::warn!("session carries a malformed user id: {:?}", id);
            return None;
        }
    };
    let db = req.app_data::<web::Data<sled::Db>>()?;
    match db.get_user(id) {
        Ok(Some(user)) => Some(SessionUser { id, user }),
        Ok(None) => {
            log::warn!("session refers to missing user {}", id);
            None
        }
        Err(err) => {
            log::error!("failed to load session user {}: {}", id, err);
            None
        }
    }
}

/// Extractor for gated routes; anonymous requests are redirected to `/login`.
impl FromRequest for SessionUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve_principal(req).ok_or(AppError::Unauthenticated))
    }
}
