//! Personal TV series and movie lists, filled in from OMDb, behind local or
//! Google sign-in.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod google;
pub mod lists;
pub mod model;
pub mod omdb;
pub mod routes;
pub mod session_store;
pub mod views;

use actix_session::SessionMiddleware;
use actix_web::cookie::Key;

use crate::session_store::SledSessionStore;

pub const SESSION_COOKIE: &str = "watchlists-session";

/// Session layer used by the server and the integration tests. Register it
/// after `IdentityMiddleware` so that it runs first.
pub fn session_middleware(
    store: SledSessionStore,
    key: Key,
    secure: bool,
) -> SessionMiddleware<SledSessionStore> {
    SessionMiddleware::builder(store, key)
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_secure(secure)
        .build()
}
